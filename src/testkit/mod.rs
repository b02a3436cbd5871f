//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`api`]: `ScriptedApi`, an in-memory [`GraphApi`](crate::port::GraphApi)
//!   with scripted listings and mutation replies that records every call.
//! - [`domain`]: builders for entities, handles and relationship sets.

pub mod api;
pub mod domain;
