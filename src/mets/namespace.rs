// src/mets/namespace.rs

//! Namespace binding table for METS documents
//!
//! The table is captured from the raw text before the editable tree is
//! built. Element and attribute names touched by the transform are then
//! qualified with the prefixes the document itself uses, so the output keeps
//! the original prefixes (`mets:` or the default namespace, `csip:`,
//! `xlink:`, ...).

use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::fmt;

/// METS structural namespace
pub const METS_NS: &str = "http://www.loc.gov/METS/";
/// E-ARK CSIP extension namespace (header package type)
pub const CSIP_NS: &str = "https://DILCIS.eu/XML/METS/CSIPExtensionMETS";
/// XLink namespace (pointer attributes)
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// A namespace-qualified name resolved against a document's bindings
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Prefix used by the document; `None` for the default namespace
    pub prefix: Option<String>,
    /// Local part
    pub local: String,
    /// Namespace URI
    pub uri: String,
    /// Every prefix the document binds to `uri` (`""` for the default)
    bound: Vec<String>,
}

impl QName {
    /// Name as written in the document (`prefix:local` or `local`)
    pub fn raw(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local),
            None => self.local.clone(),
        }
    }

    /// Whether a name as written in the document denotes this name
    ///
    /// Compares namespace and local part, so `mets:fileSec` and `fileSec`
    /// match alike when both spellings are bound to the METS namespace.
    pub fn matches(&self, raw: &str) -> bool {
        let (prefix, local) = raw.split_once(':').unwrap_or(("", raw));
        local == self.local && self.bound.iter().any(|bound| bound == prefix)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.uri, self.local)
    }
}

/// Prefix → URI bindings declared in a document
///
/// The empty string is the default namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceTable {
    bindings: BTreeMap<String, String>,
}

impl NamespaceTable {
    /// Scan every namespace declaration in `xml`
    ///
    /// The first binding seen for a prefix wins; METS packages declare their
    /// namespaces once on the root element.
    pub fn resolve(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut table = Self::default();

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    table.collect_declarations(e)?;
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(Error::malformed(format!(
                        "not well-formed at byte {}: {}",
                        reader.buffer_position(),
                        e
                    )));
                }
            }
        }

        Ok(table)
    }

    fn collect_declarations(&mut self, start: &BytesStart<'_>) -> Result<()> {
        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::malformed(format!("bad attribute: {}", e)))?;
            let key = attr.key.as_ref();
            let prefix = if key == b"xmlns" {
                String::new()
            } else if let Some(name) = key.strip_prefix(b"xmlns:") {
                String::from_utf8_lossy(name).into_owned()
            } else {
                continue;
            };
            let uri = attr
                .unescape_value()
                .map_err(|e| Error::malformed(format!("bad namespace URI: {}", e)))?
                .into_owned();
            self.bindings.entry(prefix).or_insert(uri);
        }
        Ok(())
    }

    /// URI bound to `prefix` (`""` for the default namespace)
    pub fn uri(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    /// Prefixes bound to `uri`, the default namespace first
    fn prefixes_for(&self, uri: &str) -> Vec<String> {
        // BTreeMap order puts "" first
        self.bindings
            .iter()
            .filter(|(_, bound)| bound.as_str() == uri)
            .map(|(prefix, _)| prefix.clone())
            .collect()
    }

    /// Qualified element name for `local` in namespace `uri`
    ///
    /// New names are written with the default namespace when `uri` is bound
    /// to it, otherwise with the first bound prefix.
    pub fn element(&self, uri: &str, local: &str) -> Option<QName> {
        let bound = self.prefixes_for(uri);
        let prefix = bound.first()?.clone();
        Some(QName {
            prefix: (!prefix.is_empty()).then_some(prefix),
            local: local.to_string(),
            uri: uri.to_string(),
            bound,
        })
    }

    /// Qualified attribute name for `local` in namespace `uri`
    ///
    /// Unprefixed attributes never belong to the default namespace, so only
    /// an explicit prefix qualifies.
    pub fn attribute(&self, uri: &str, local: &str) -> Option<QName> {
        let mut bound = self.prefixes_for(uri);
        bound.retain(|prefix| !prefix.is_empty());
        let prefix = bound.first()?.clone();
        Some(QName {
            prefix: Some(prefix),
            local: local.to_string(),
            uri: uri.to_string(),
            bound,
        })
    }

    /// Like [`element`](Self::element) but a missing binding is a document error
    pub fn require_element(&self, uri: &str, local: &str) -> Result<QName> {
        self.element(uri, local)
            .ok_or_else(|| Error::malformed(format!("namespace {} is not declared", uri)))
    }

    /// Like [`attribute`](Self::attribute) but a missing binding is a document error
    pub fn require_attribute(&self, uri: &str, local: &str) -> Result<QName> {
        self.attribute(uri, local).ok_or_else(|| {
            Error::malformed(format!("namespace prefix for {} is not declared", uri))
        })
    }
}
