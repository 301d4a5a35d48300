//! Import identifiers
//!
//! An import ID is a colon-separated string whose components map one-to-one
//! onto the lookup keys a resource needs for its first Read.

use crate::error::{Error, Result};

/// Key schema for one resource kind's import ID
#[derive(Debug, Clone, Copy)]
pub struct ImportKeys {
    keys: &'static [&'static str],
}

impl ImportKeys {
    pub const fn new(keys: &'static [&'static str]) -> Self {
        Self { keys }
    }

    /// Expected format, e.g. `group_uuid:account_key`
    pub fn format_hint(&self) -> String {
        self.keys.join(":")
    }

    /// Split an import ID into one value per key
    ///
    /// A single-key schema takes the whole string, so values such as URLs may
    /// contain colons.
    pub fn parse(&self, id: &str) -> Result<Vec<(&'static str, String)>> {
        let parts: Vec<&str> = if self.keys.len() == 1 {
            vec![id]
        } else {
            id.split(':').collect()
        };

        if parts.len() != self.keys.len() || parts.iter().any(|p| p.trim().is_empty()) {
            return Err(Error::ImportId {
                expected: self.format_hint(),
            });
        }

        Ok(self
            .keys
            .iter()
            .zip(parts)
            .map(|(k, v)| (*k, v.to_string()))
            .collect())
    }

    /// Like [`parse`](Self::parse) but returns just the values, in key order
    pub fn values(&self, id: &str) -> Result<Vec<String>> {
        Ok(self.parse(id)?.into_iter().map(|(_, v)| v).collect())
    }

    /// Inverse of [`parse`](Self::parse)
    pub fn format(&self, values: &[&str]) -> String {
        values.join(":")
    }
}
