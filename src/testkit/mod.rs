//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`exchange`] - Mock exchange collaborators that record every request:
//!   `MockExchange`, `MockStreaming`, `MockClients`, `MockDirectory`.
//! - [`domain`] - Builders for domain primitives: markets, subscriptions, events.
//! - [`config`] - Canonical test configurations.

pub mod config;
pub mod domain;
pub mod exchange;
