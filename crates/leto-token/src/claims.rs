//! # Token Claims
//!
//! The claims body of a signed token. Standard registered fields use
//! their JWT names on the wire (`jti`, `iss`, `sub`, `aud`, `iat`, `nbf`,
//! `exp`); LETO-specific claims live under `leto:`-prefixed keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use leto_core::{OrchestrationId, TokenId};
use leto_trust::Tier;

/// The two token classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Asserts the subject's current trust tier.
    Assurance,
    /// Asserts the subject's involvement in one orchestration.
    Orchestration,
}

impl TokenKind {
    /// Stable string form used in persistence.
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Assurance => "assurance",
            TokenKind::Orchestration => "orchestration",
        }
    }

    /// Parse the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "assurance" => Some(TokenKind::Assurance),
            "orchestration" => Some(TokenKind::Orchestration),
            _ => None,
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trust-state claims carried by assurance tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssuranceClaims {
    /// The subject's authentication tier at mint time.
    pub tier: Tier,
    /// How the tier was established (`eherkenning`, `dns_txt`,
    /// `email_registry`), when the entity has been verified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
}

/// Involvement claims carried by orchestration tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestrationClaims {
    /// The orchestration the subject claims involvement in.
    pub orchestration_id: OrchestrationId,
    /// The role claimed, e.g. "Carrier". Optional — a token without a
    /// role claim asserts involvement in any role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// The claims body of a signed token.
///
/// The envelope is rigid (`deny_unknown_fields`); extensibility lives in
/// the typed `assurance`/`orchestration` sections, not in free-form keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenClaims {
    /// Unique token identifier; primary key of the issuance record.
    #[serde(rename = "jti")]
    pub token_id: TokenId,

    /// Issuer identity (the registry authority's domain).
    #[serde(rename = "iss")]
    pub issuer: String,

    /// Subject — the entity domain the claims speak for.
    #[serde(rename = "sub")]
    pub subject: String,

    /// Intended audiences (caller domains).
    #[serde(rename = "aud")]
    pub audience: Vec<String>,

    #[serde(rename = "iat")]
    pub issued_at: DateTime<Utc>,

    #[serde(rename = "nbf")]
    pub not_before: DateTime<Utc>,

    #[serde(rename = "exp")]
    pub expires_at: DateTime<Utc>,

    /// Token class.
    #[serde(rename = "leto:kind")]
    pub kind: TokenKind,

    /// Present on assurance tokens.
    #[serde(
        rename = "leto:assurance",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub assurance: Option<AssuranceClaims>,

    /// Present on orchestration tokens.
    #[serde(
        rename = "leto:orchestration",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub orchestration: Option<OrchestrationClaims>,
}

impl TokenClaims {
    /// Whether `instant` falls inside the token's validity window.
    pub fn window_contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.not_before && instant <= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_claims() -> TokenClaims {
        let iat = Utc.with_ymd_and_hms(2031, 3, 14, 9, 0, 0).unwrap();
        TokenClaims {
            token_id: TokenId::new(),
            issuer: "registry.example.com".to_string(),
            subject: "carrier.example.com".to_string(),
            audience: vec!["booking.example.com".to_string()],
            issued_at: iat,
            not_before: iat,
            expires_at: iat + chrono::Duration::hours(1),
            kind: TokenKind::Orchestration,
            assurance: None,
            orchestration: Some(OrchestrationClaims {
                orchestration_id: OrchestrationId::new(),
                role: Some("Carrier".to_string()),
            }),
        }
    }

    #[test]
    fn wire_field_names_are_jwt_style() {
        let value = serde_json::to_value(sample_claims()).unwrap();
        for key in ["jti", "iss", "sub", "aud", "iat", "nbf", "exp", "leto:kind"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert!(value.get("token_id").is_none());
        assert!(value.get("expires_at").is_none());
    }

    #[test]
    fn claims_serde_roundtrip() {
        let claims = sample_claims();
        let json = serde_json::to_string(&claims).unwrap();
        let back: TokenClaims = serde_json::from_str(&json).unwrap();
        assert_eq!(claims, back);
    }

    #[test]
    fn unknown_fields_rejected() {
        let mut value = serde_json::to_value(sample_claims()).unwrap();
        value["x-custom"] = serde_json::json!("smuggled");
        let result: Result<TokenClaims, _> = serde_json::from_value(value);
        assert!(result.is_err());
    }

    #[test]
    fn window_contains_bounds_inclusive() {
        let claims = sample_claims();
        assert!(claims.window_contains(claims.not_before));
        assert!(claims.window_contains(claims.expires_at));
        assert!(!claims.window_contains(claims.not_before - chrono::Duration::seconds(1)));
        assert!(!claims.window_contains(claims.expires_at + chrono::Duration::seconds(1)));
    }

    #[test]
    fn kind_string_roundtrip() {
        for kind in [TokenKind::Assurance, TokenKind::Orchestration] {
            assert_eq!(TokenKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(TokenKind::parse("session"), None);
    }
}
