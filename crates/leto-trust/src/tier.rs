//! # Authentication Tiers
//!
//! The tier is an entity's current authentication/trust strength
//! classification. Serialized as its numeric rank (1 strongest,
//! 3 weakest) to match the wire format of token claims.

use serde::{Deserialize, Serialize};

/// An entity's authentication tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tier {
    /// Verified via the national eID scheme. No expiry.
    Tier1,
    /// DNS domain-ownership proof. Expires 90 days after verification.
    Tier2,
    /// Email plus company-registry number. The registration default.
    Tier3,
}

impl Tier {
    /// Numeric rank: 1 is strongest, 3 is weakest.
    pub fn rank(self) -> u8 {
        match self {
            Tier::Tier1 => 1,
            Tier::Tier2 => 2,
            Tier::Tier3 => 3,
        }
    }

    /// Parse from a numeric rank.
    pub fn from_rank(rank: u8) -> Option<Self> {
        match rank {
            1 => Some(Tier::Tier1),
            2 => Some(Tier::Tier2),
            3 => Some(Tier::Tier3),
            _ => None,
        }
    }

    /// Whether this tier carries a reverification deadline.
    pub fn requires_reverification(self) -> bool {
        matches!(self, Tier::Tier2)
    }
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(rank: u8) -> Result<Self, Self::Error> {
        Self::from_rank(rank).ok_or_else(|| format!("tier rank out of range: {rank}"))
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        tier.rank()
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tier{}", self.rank())
    }
}

/// How an entity's current tier was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    /// National eID scheme assertion (Tier 1).
    EHerkenning,
    /// DNS TXT-record domain-ownership proof (Tier 2).
    DnsTxt,
    /// Email address plus company-registry number (Tier 3).
    EmailRegistry,
}

impl VerificationMethod {
    /// The tier this method establishes.
    pub fn tier(self) -> Tier {
        match self {
            VerificationMethod::EHerkenning => Tier::Tier1,
            VerificationMethod::DnsTxt => Tier::Tier2,
            VerificationMethod::EmailRegistry => Tier::Tier3,
        }
    }

    /// Stable string form used in persistence and token claims.
    pub fn as_str(self) -> &'static str {
        match self {
            VerificationMethod::EHerkenning => "eherkenning",
            VerificationMethod::DnsTxt => "dns_txt",
            VerificationMethod::EmailRegistry => "email_registry",
        }
    }

    /// Parse the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "eherkenning" => Some(VerificationMethod::EHerkenning),
            "dns_txt" => Some(VerificationMethod::DnsTxt),
            "email_registry" => Some(VerificationMethod::EmailRegistry),
            _ => None,
        }
    }
}

impl std::fmt::Display for VerificationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
