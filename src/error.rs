// src/error.rs

//! Error types for AIP to DIP conversion
//!
//! Every variant is fatal for the conversion that raised it. There is no
//! partial-success mode, and retrying without fixing the input will fail the
//! same way.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while converting a package
#[derive(Error, Debug)]
pub enum Error {
    /// An identifier has no prefix separator and cannot be remapped
    #[error("malformed identifier '{0}': missing '-' separator")]
    MalformedIdentifier(String),

    /// The METS document is not well-formed or lacks a required element/attribute
    #[error("malformed METS document: {0}")]
    MalformedDocument(String),

    /// The input directory is not a usable AIP
    #[error("invalid AIP at {}: {reason}", path.display())]
    InvalidInputPackage { path: PathBuf, reason: String },

    /// The output location cannot hold packages
    #[error("invalid output directory {}: {reason}", path.display())]
    InvalidOutputDirectory { path: PathBuf, reason: String },

    /// The destination directory is occupied and could not be cleared
    #[error("output directory {} already exists and could not be replaced", .0.display())]
    OutputCollision(PathBuf),

    /// I/O failure while reading, copying or writing a file
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// XML serializer failure (parse failures are `MalformedDocument`)
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl Error {
    /// Wrap an I/O error together with the path it concerns
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for a missing-element/attribute document error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedDocument(msg.into())
    }

    /// Process exit code the CLI reports for this error
    ///
    /// Input validation failures share the code used for bad invocations.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidInputPackage { .. } | Self::InvalidOutputDirectory { .. } => 2,
            _ => 1,
        }
    }
}
