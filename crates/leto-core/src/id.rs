//! # Identifier Newtypes
//!
//! Domain-primitive newtypes for identifiers throughout the LETO Stack.
//! Each identifier is a distinct type — you cannot pass an [`EntityId`]
//! where an [`OrchestrationId`] is expected.
//!
//! UUID-based identifiers are always valid by construction. [`DomainName`]
//! validates its format at construction time and at deserialization.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Implements `Deserialize` for string newtypes that must validate their
/// contents. Deserializes as a plain `String`, then routes through the
/// type's `new()` constructor so invalid values are rejected at
/// deserialization time.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Implements the shared surface of a UUID-backed identifier newtype.
macro_rules! impl_uuid_id {
    ($ty:ident) => {
        impl $ty {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $ty {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $ty {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::from_str(s).map(Self)
            }
        }
    };
}

/// Unique identifier for a registered legal entity (organization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(Uuid);
impl_uuid_id!(EntityId);

/// Unique identifier for an issued claims token. This is the `jti` claim
/// of the signed token and the primary key of its issuance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId(Uuid);
impl_uuid_id!(TokenId);

/// Unique identifier for an orchestration (one multi-party business
/// transaction instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrchestrationId(Uuid);
impl_uuid_id!(OrchestrationId);

/// Unique identifier for a declared orchestration participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantId(Uuid);
impl_uuid_id!(ParticipantId);

/// A validated DNS domain name identifying an organization or calling
/// system (e.g. `carrier.example.com`).
///
/// # Validation
///
/// - lowercase ASCII, at most 253 characters
/// - at least two labels separated by dots
/// - labels are non-empty, alphanumeric plus interior hyphens, ≤ 63 chars
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DomainName(String);

impl_validating_deserialize!(DomainName);

impl DomainName {
    /// Create a domain name from a string, validating format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDomain`] if the string is not a
    /// well-formed lowercase DNS name.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    fn validate(s: &str) -> Result<(), ValidationError> {
        if s.is_empty() || s.len() > 253 {
            return Err(ValidationError::InvalidDomain(s.to_string()));
        }
        let labels: Vec<&str> = s.split('.').collect();
        if labels.len() < 2 {
            return Err(ValidationError::InvalidDomain(s.to_string()));
        }
        for label in labels {
            if label.is_empty()
                || label.len() > 63
                || label.starts_with('-')
                || label.ends_with('-')
                || !label
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            {
                return Err(ValidationError::InvalidDomain(s.to_string()));
            }
        }
        Ok(())
    }

    /// Access the domain as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DomainName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_ids_are_unique() {
        assert_ne!(EntityId::new(), EntityId::new());
    }

    #[test]
    fn token_id_display_roundtrip() {
        let id = TokenId::new();
        let parsed: TokenId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn orchestration_id_from_uuid() {
        let raw = Uuid::new_v4();
        let id = OrchestrationId::from_uuid(raw);
        assert_eq!(id.as_uuid(), &raw);
    }

    #[test]
    fn valid_domains_accepted() {
        for d in [
            "example.com",
            "carrier.example.com",
            "a-b.example.co.uk",
            "x1.y2.z3",
        ] {
            assert!(DomainName::new(d).is_ok(), "expected valid: {d}");
        }
    }

    #[test]
    fn invalid_domains_rejected() {
        for d in [
            "",
            "nodots",
            "Example.com",
            "-leading.example.com",
            "trailing-.example.com",
            "spa ce.example.com",
            ".example.com",
            "example..com",
        ] {
            assert!(DomainName::new(d).is_err(), "expected invalid: {d}");
        }
    }

    #[test]
    fn domain_rejects_overlong() {
        let long = format!("{}.com", "a".repeat(254));
        assert!(DomainName::new(long).is_err());

        let long_label = format!("{}.com", "a".repeat(64));
        assert!(DomainName::new(long_label).is_err());
    }

    #[test]
    fn domain_deserialization_validates() {
        let ok: Result<DomainName, _> = serde_json::from_str(r#""port.example.com""#);
        assert!(ok.is_ok());

        let bad: Result<DomainName, _> = serde_json::from_str(r#""NOT A DOMAIN""#);
        assert!(bad.is_err());
    }

    #[test]
    fn domain_serializes_as_plain_string() {
        let d = DomainName::new("carrier.example.com").unwrap();
        assert_eq!(
            serde_json::to_string(&d).unwrap(),
            r#""carrier.example.com""#
        );
    }
}
