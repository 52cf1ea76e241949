//! Netpulse Common - Shared types and schemas for the netpulse daemon and client
//!
//! Wire payloads, endpoint names and timestamp handling live here so the
//! daemon and `netpulsectl` agree on the JSON they exchange.

pub mod schemas;
pub mod types;

pub use schemas::*;
pub use types::*;
