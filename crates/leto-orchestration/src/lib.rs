//! # leto-orchestration — Orchestration Registry
//!
//! The authoritative list of orchestrations (multi-party business
//! transaction instances, e.g. one shipment) and their declared
//! participants.
//!
//! ## Invariants
//!
//! - At most one **active** participant per (orchestration, domain, role)
//!   triple — concurrent duplicate declarations yield exactly one success
//!   and one conflict.
//! - `completed` and `cancelled` are terminal: no participant changes are
//!   accepted once an orchestration leaves `active`.
//! - Participants and orchestrations are never physically deleted;
//!   removal flips the participant's status and keeps the row for audit.

pub mod orchestration;
pub mod registry;

// Re-export primary types.
pub use orchestration::{
    Orchestration, OrchestrationStatus, Participant, ParticipantStatus,
};
pub use registry::{OrchestrationError, OrchestrationRegistry};
