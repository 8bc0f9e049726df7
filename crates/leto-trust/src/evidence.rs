//! # Verification Evidence
//!
//! The payloads an organization submits to establish or renew its
//! authentication tier. Each variant validates its own shape at the
//! boundary; malformed evidence is rejected before any entity state is
//! touched.

use serde::{Deserialize, Serialize};

use crate::error::TrustError;
use crate::tier::VerificationMethod;

/// Levels of assurance accepted from the eHerkenning broker.
const ACCEPTED_EHERKENNING_LEVELS: &[&str] = &["EH3", "EH4"];

/// Evidence supporting a tier transition.
///
/// Tagged serialization so API payloads name the evidence kind explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerificationEvidence {
    /// A broker-validated eHerkenning assertion (establishes Tier 1).
    EHerkenning {
        /// Broker assertion identifier.
        assertion_id: String,
        /// Level of assurance reported by the broker (EH3 or EH4).
        level_of_assurance: String,
        /// Company-registry number the assertion was issued for.
        registry_number: String,
    },

    /// A DNS TXT-record domain-ownership proof (establishes Tier 2).
    DnsTxt {
        /// The domain the proof was performed against.
        domain: String,
        /// The challenge value this service asked the entity to publish.
        challenge: String,
        /// The TXT record values observed at `_leto-challenge.<domain>`.
        observed_records: Vec<String>,
    },

    /// Email-address confirmation plus a company-registry number
    /// (establishes Tier 3).
    EmailRegistry {
        /// Confirmed contact address.
        email: String,
        /// National company-registry number (8 digits).
        registry_number: String,
    },
}

impl VerificationEvidence {
    /// The verification method this evidence establishes when valid.
    pub fn method(&self) -> VerificationMethod {
        match self {
            VerificationEvidence::EHerkenning { .. } => VerificationMethod::EHerkenning,
            VerificationEvidence::DnsTxt { .. } => VerificationMethod::DnsTxt,
            VerificationEvidence::EmailRegistry { .. } => VerificationMethod::EmailRegistry,
        }
    }

    /// Validate the evidence shape and internal consistency.
    ///
    /// This is a local check only — broker signatures and live DNS
    /// lookups happen upstream; what arrives here is their recorded
    /// outcome, which must still be coherent.
    pub fn validate(&self) -> Result<(), TrustError> {
        match self {
            VerificationEvidence::EHerkenning {
                assertion_id,
                level_of_assurance,
                registry_number,
            } => {
                if assertion_id.trim().is_empty() {
                    return Err(TrustError::InvalidEvidence(
                        "eHerkenning assertion id is empty".to_string(),
                    ));
                }
                if !ACCEPTED_EHERKENNING_LEVELS.contains(&level_of_assurance.as_str()) {
                    return Err(TrustError::InvalidEvidence(format!(
                        "unacceptable eHerkenning level of assurance: {level_of_assurance:?}"
                    )));
                }
                validate_registry_number(registry_number)?;
                Ok(())
            }
            VerificationEvidence::DnsTxt {
                domain,
                challenge,
                observed_records,
            } => {
                if domain.trim().is_empty() {
                    return Err(TrustError::InvalidEvidence(
                        "DNS proof domain is empty".to_string(),
                    ));
                }
                if challenge.trim().is_empty() {
                    return Err(TrustError::InvalidEvidence(
                        "DNS challenge value is empty".to_string(),
                    ));
                }
                if !observed_records.iter().any(|r| r == challenge) {
                    return Err(TrustError::InvalidEvidence(
                        "observed TXT records do not contain the challenge value".to_string(),
                    ));
                }
                Ok(())
            }
            VerificationEvidence::EmailRegistry {
                email,
                registry_number,
            } => {
                let at = email.find('@');
                let well_formed = matches!(at, Some(pos) if pos > 0 && email[pos + 1..].contains('.'));
                if !well_formed {
                    return Err(TrustError::InvalidEvidence(format!(
                        "malformed email address: {email:?}"
                    )));
                }
                validate_registry_number(registry_number)?;
                Ok(())
            }
        }
    }

    /// The domain this evidence speaks for, when it names one.
    pub fn domain(&self) -> Option<&str> {
        match self {
            VerificationEvidence::DnsTxt { domain, .. } => Some(domain.as_str()),
            _ => None,
        }
    }
}

fn validate_registry_number(registry_number: &str) -> Result<(), TrustError> {
    if registry_number.len() != 8 || !registry_number.chars().all(|c| c.is_ascii_digit()) {
        return Err(TrustError::InvalidEvidence(format!(
            "registry number must be 8 digits, got {registry_number:?}"
        )));
    }
    Ok(())
}
