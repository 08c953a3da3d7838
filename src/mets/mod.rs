// src/mets/mod.rs

//! METS document handling
//!
//! - [`namespace`]: prefix → URI bindings and qualified names
//! - [`tree`]: lossless element tree, parse and indented serialization
//! - [`transform`]: the AIP → DIP rewrite

pub mod namespace;
pub mod transform;
pub mod tree;

pub use namespace::{NamespaceTable, QName, CSIP_NS, METS_NS, XLINK_NS};
pub use transform::{
    transform, TransformOptions, TransformReport, DIP_PACKAGE_TYPE, DIP_PROFILE,
    RECORD_STATUS_CURRENT,
};
pub use tree::{Element, Node, XmlDocument, DEFAULT_INDENT};

/// File name of the package-root METS document
pub const METS_FILE_NAME: &str = "METS.xml";
