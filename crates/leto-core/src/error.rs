//! # Structured Validation Errors
//!
//! Boundary-validation errors shared across the workspace. Uses `thiserror`
//! for ergonomic error definitions with diagnostic context.

use thiserror::Error;

/// Errors from validating inputs at the subsystem boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The string is not a well-formed lowercase DNS domain name.
    #[error("invalid domain name: {0:?}")]
    InvalidDomain(String),

    /// A business key violates the key namespace rules.
    #[error("invalid business key {key:?}: {reason}")]
    InvalidBusinessKey { key: String, reason: String },

    /// A business-key value violates the value rules.
    #[error("invalid value for business key {key:?}: {reason}")]
    InvalidBusinessValue { key: String, reason: String },

    /// The business-key map exceeds the entry ceiling.
    #[error("too many business keys: {0} (max {max})", max = crate::keys::MAX_ENTRIES)]
    TooManyBusinessKeys(usize),

    /// A required field is empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_domain_display() {
        let err = ValidationError::InvalidDomain("Bad Domain".to_string());
        assert!(format!("{err}").contains("Bad Domain"));
    }

    #[test]
    fn business_key_display_includes_key_and_reason() {
        let err = ValidationError::InvalidBusinessKey {
            key: "Bill of Lading".to_string(),
            reason: "must be lowercase snake_case".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("Bill of Lading"));
        assert!(msg.contains("snake_case"));
    }

    #[test]
    fn too_many_keys_display_includes_ceiling() {
        let err = ValidationError::TooManyBusinessKeys(40);
        let msg = format!("{err}");
        assert!(msg.contains("40"));
        assert!(msg.contains("32"));
    }
}
