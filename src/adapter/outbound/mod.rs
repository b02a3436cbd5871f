//! Outbound adapters (driven side).

pub mod github;
