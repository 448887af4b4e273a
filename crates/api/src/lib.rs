//! HTTP API: token issuance/verification endpoints and the policy gate.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
