//! Local storage
//!
//! String key/value store with JSON helpers, mirroring the browser's
//! `localStorage` surface.

use crate::error::DomError;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Page-scoped key/value store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalStorage {
    items: IndexMap<String, String>,
}

impl LocalStorage {
    /// Create empty storage
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value
    #[inline]
    #[must_use]
    pub fn get_item(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(String::as_str)
    }

    /// Store a raw value
    #[inline]
    pub fn set_item(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.items.insert(key.into(), value.into());
    }

    /// Remove a value, returning it
    #[inline]
    pub fn remove_item(&mut self, key: &str) -> Option<String> {
        self.items.shift_remove(key)
    }

    /// Drop every value
    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    /// Number of stored items
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if storage is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Deserialize a JSON value
    ///
    /// Returns `Ok(None)` when the key is absent.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DomError> {
        self.get_item(key)
            .map(|raw| {
                serde_json::from_str(raw).map_err(|e| DomError::Storage {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    /// Serialize and store a JSON value
    pub fn set_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), DomError> {
        let raw = serde_json::to_string(value).map_err(|e| DomError::Storage {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.set_item(key, raw);
        Ok(())
    }
}
