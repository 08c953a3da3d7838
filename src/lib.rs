// src/lib.rs

//! AIP to DIP conversion
//!
//! Turns an E-ARK Archival Information Package into a Dissemination
//! Information Package: the package tree is copied without its submission or
//! preservation substructures, and the package-root METS document is
//! rewritten under a fresh package identity.
//!
//! # Architecture
//!
//! - `identifier`: one remap table per run keeps every IDREF consistent
//! - `mets`: lossless element tree plus the namespace-aware rewrite
//! - `filter`: the two exclusion modes (submission / representation)
//! - `replicate`: parallel tree copy with exclusions
//! - `package`: ordering, validation and rollback of a conversion

pub mod config;
mod error;
pub mod filter;
pub mod identifier;
pub mod mets;
pub mod package;
pub mod replicate;

pub use config::Config;
pub use error::{Error, Result};
pub use filter::ExclusionMode;
pub use identifier::{new_package_id, IdRemapper};
pub use mets::{transform, TransformOptions, TransformReport, XmlDocument};
pub use package::{ConversionOptions, ConversionResult, PackageAssembler};
pub use replicate::{Exclusion, ReplicationStats, TreeReplicator};
