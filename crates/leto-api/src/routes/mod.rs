//! # Route modules
//!
//! | Prefix | Module | Domain |
//! |---|---|---|
//! | `/v1/entities/*` | [`entities`] | Registration, evidence, sweep |
//! | `/v1/tokens/*` | [`tokens`] | Issuance, revocation, usage, lookup |
//! | `/v1/validations` | [`validations`] | Orchestration-token validation + log |
//! | `/v1/orchestrations/*` | [`orchestrations`] | Orchestrations and participants |
//! | `/v1/systems/*` | [`systems`] | External-system administration |

pub mod entities;
pub mod orchestrations;
pub mod systems;
pub mod tokens;
pub mod validations;
