//! # Business-Key Map
//!
//! Orchestrations carry arbitrary business references ("bill of lading
//! number", "customs declaration id"). These are modelled as an explicit,
//! validated mapping from key to string value — not an open-ended JSON
//! blob.
//!
//! ## Key namespace
//!
//! - keys: lowercase `snake_case` ASCII (`[a-z][a-z0-9_]*`), ≤ 64 chars
//! - values: non-empty strings, ≤ 512 chars
//! - at most 32 entries per map

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum number of entries in a business-key map.
pub const MAX_ENTRIES: usize = 32;

/// Maximum length of a business key.
pub const MAX_KEY_LEN: usize = 64;

/// Maximum length of a business-key value.
pub const MAX_VALUE_LEN: usize = 512;

/// A validated flat map of business references attached to an
/// orchestration.
///
/// Keys are sorted (BTreeMap) so the map canonicalizes deterministically
/// when embedded in signed or digested documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct BusinessKeys(BTreeMap<String, String>);

impl BusinessKeys {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an existing map, validating every entry.
    pub fn from_map(map: BTreeMap<String, String>) -> Result<Self, ValidationError> {
        if map.len() > MAX_ENTRIES {
            return Err(ValidationError::TooManyBusinessKeys(map.len()));
        }
        for (key, value) in &map {
            validate_key(key)?;
            validate_value(key, value)?;
        }
        Ok(Self(map))
    }

    /// Insert a validated entry. Replaces any existing value for the key.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ValidationError> {
        let key = key.into();
        let value = value.into();
        validate_key(&key)?;
        validate_value(&key, &value)?;
        if !self.0.contains_key(&key) && self.0.len() >= MAX_ENTRIES {
            return Err(ValidationError::TooManyBusinessKeys(self.0.len() + 1));
        }
        self.0.insert(key, value);
        Ok(())
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl TryFrom<BTreeMap<String, String>> for BusinessKeys {
    type Error = ValidationError;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        Self::from_map(map)
    }
}

impl From<BusinessKeys> for BTreeMap<String, String> {
    fn from(keys: BusinessKeys) -> Self {
        keys.0
    }
}

fn validate_key(key: &str) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidBusinessKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };
    if key.is_empty() {
        return Err(invalid("key must not be empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(invalid("key exceeds 64 characters"));
    }
    let mut chars = key.chars();
    let first = chars.next().unwrap_or('_');
    if !first.is_ascii_lowercase() {
        return Err(invalid("key must start with a lowercase letter"));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(invalid("key must be lowercase snake_case"));
    }
    Ok(())
}

fn validate_value(key: &str, value: &str) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidBusinessValue {
        key: key.to_string(),
        reason: reason.to_string(),
    };
    if value.is_empty() {
        return Err(invalid("value must not be empty"));
    }
    if value.len() > MAX_VALUE_LEN {
        return Err(invalid("value exceeds 512 characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut keys = BusinessKeys::new();
        keys.insert("bill_of_lading", "BOL-2031-4471").unwrap();
        assert_eq!(keys.get("bill_of_lading"), Some("BOL-2031-4471"));
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn uppercase_key_rejected() {
        let mut keys = BusinessKeys::new();
        let err = keys.insert("BillOfLading", "x").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidBusinessKey { .. }));
    }

    #[test]
    fn key_with_spaces_rejected() {
        let mut keys = BusinessKeys::new();
        assert!(keys.insert("bill of lading", "x").is_err());
    }

    #[test]
    fn key_starting_with_digit_rejected() {
        let mut keys = BusinessKeys::new();
        assert!(keys.insert("1bol", "x").is_err());
    }

    #[test]
    fn empty_value_rejected() {
        let mut keys = BusinessKeys::new();
        let err = keys.insert("bol", "").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidBusinessValue { .. }));
    }

    #[test]
    fn overlong_value_rejected() {
        let mut keys = BusinessKeys::new();
        assert!(keys.insert("bol", "v".repeat(513)).is_err());
    }

    #[test]
    fn entry_ceiling_enforced() {
        let mut keys = BusinessKeys::new();
        for i in 0..MAX_ENTRIES {
            keys.insert(format!("key_{i}"), "v").unwrap();
        }
        let err = keys.insert("one_more", "v").unwrap_err();
        assert!(matches!(err, ValidationError::TooManyBusinessKeys(_)));

        // Replacing an existing key is still allowed at the ceiling.
        keys.insert("key_0", "replaced").unwrap();
        assert_eq!(keys.get("key_0"), Some("replaced"));
    }

    #[test]
    fn deserialization_validates_entries() {
        let ok: Result<BusinessKeys, _> =
            serde_json::from_str(r#"{"bill_of_lading": "BOL-1"}"#);
        assert!(ok.is_ok());

        let bad: Result<BusinessKeys, _> =
            serde_json::from_str(r#"{"Bill of Lading": "BOL-1"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn serializes_as_plain_map() {
        let mut keys = BusinessKeys::new();
        keys.insert("container", "MSKU-883").unwrap();
        let json = serde_json::to_string(&keys).unwrap();
        assert_eq!(json, r#"{"container":"MSKU-883"}"#);
    }
}
