//! netpulsed library - exposes modules for testing.

pub mod config;
pub mod freshness;
pub mod instrumentation;
pub mod metrics;
pub mod poller;
pub mod query;
pub mod routes;
pub mod server;
pub mod snapshot;
pub mod store;
