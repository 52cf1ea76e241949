//! Netpulsectl library - exposes modules for testing

pub mod client;
pub mod output;
