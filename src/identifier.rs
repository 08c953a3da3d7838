// src/identifier.rs

//! Identifier remapping
//!
//! METS identifiers have the form `prefix-suffix`, e.g. `file-3b1c...` or
//! `uuid-8f0e...`. When a package changes role every identifier gets a fresh
//! suffix while the prefix (up to and including the first `-`) is kept.
//!
//! The remapper holds one map for a whole conversion run. An id that was
//! already remapped always yields the same new value, which is what keeps
//! IDREF attributes (`FILEID`, `DMDID`, `ADMID`, `xlink:title`) pointing at
//! the right element after their targets have been renamed.

use crate::error::{Error, Result};
use std::collections::HashMap;
use uuid::Uuid;

/// Separator terminating the structural prefix of an identifier
pub const ID_SEPARATOR: char = '-';

/// Prefix of generated package identifiers
pub const PACKAGE_ID_PREFIX: &str = "uuid-";

/// Generate a fresh package identifier (`uuid-<v4 uuid>`)
pub fn new_package_id() -> String {
    format!("{}{}", PACKAGE_ID_PREFIX, Uuid::new_v4())
}

/// Split an identifier into its structural prefix (including the separator)
/// and the remainder
pub fn split_prefix(id: &str) -> Result<(&str, &str)> {
    let pos = id
        .find(ID_SEPARATOR)
        .ok_or_else(|| Error::MalformedIdentifier(id.to_string()))?;
    Ok(id.split_at(pos + ID_SEPARATOR.len_utf8()))
}

/// Map of original identifiers to their regenerated values
#[derive(Debug, Clone, Default)]
pub struct IdRemapper {
    updates: HashMap<String, String>,
}

impl IdRemapper {
    /// Create an empty remapper
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a remapper pre-seeded with one known mapping
    pub fn seeded(old: impl Into<String>, new: impl Into<String>) -> Self {
        let mut remapper = Self::new();
        remapper.seed(old, new);
        remapper
    }

    /// Record a mapping without generating anything
    ///
    /// An existing mapping for `old` is left untouched.
    pub fn seed(&mut self, old: impl Into<String>, new: impl Into<String>) {
        self.updates.entry(old.into()).or_insert_with(|| new.into());
    }

    /// Return the new identifier for `id`, generating one on first sight
    pub fn remap(&mut self, id: &str) -> Result<String> {
        if let Some(existing) = self.updates.get(id) {
            return Ok(existing.clone());
        }

        let (prefix, _) = split_prefix(id)?;
        let new_id = format!("{}{}", prefix, Uuid::new_v4());
        self.updates.insert(id.to_string(), new_id.clone());
        Ok(new_id)
    }

    /// Remap every token of a whitespace-separated IDREFS value
    pub fn remap_refs(&mut self, refs: &str) -> Result<String> {
        let mut remapped = Vec::new();
        for token in refs.split_whitespace() {
            remapped.push(self.remap(token)?);
        }
        Ok(remapped.join(" "))
    }

    /// Look up an existing mapping
    pub fn get(&self, id: &str) -> Option<&str> {
        self.updates.get(id).map(String::as_str)
    }

    /// Number of recorded mappings
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    /// Whether no mapping has been recorded
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Iterate over `(original, new)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.updates.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
