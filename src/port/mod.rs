//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! # Architecture
//!
//! ```text
//!                  ┌──────────────────────────┐
//!                  │       Application        │
//!                  │ governor, fetcher, batch │
//!                  └────────────┬─────────────┘
//!                               │ GraphApi
//!                               ▼
//!                      ┌─────────────────┐
//!                      │  GitHub adapter │
//!                      └─────────────────┘
//! ```

pub mod outbound;

pub use outbound::graph::{
    list_resource, mutation_resource, ApiResponse, GraphApi, RateSnapshot,
};
