//! # API middleware
//!
//! HTTP-level middleware for the authenticated router. Auth lives in
//! [`crate::auth`]; this module carries the Prometheus metrics layer.

pub mod metrics;
