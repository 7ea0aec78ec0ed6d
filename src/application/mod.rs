//! Application services.
//!
//! - [`bus`] - per-feed-kind event distribution with latest-value replay
//! - [`desired`] - per-exchange pending subscription slots
//! - [`selector`] - streaming/polling split
//! - [`session`] - native streaming connection lifecycle
//! - [`schedule`] - rate-aware poll pacing
//! - [`worker`] - per-exchange control loop
//! - [`registry`] - consumer interest union
//! - [`engine`] - ties the above together

pub mod bus;
pub mod desired;
pub mod engine;
pub mod registry;
pub mod schedule;
pub mod selector;
pub mod session;
pub mod worker;

pub use bus::{BusStats, EventBus, FeedReceiver};
pub use desired::DesiredStateStore;
pub use engine::Engine;
pub use registry::InterestRegistry;
pub use selector::TransportPlan;
pub use worker::{ExchangeWorker, WorkerSettings, WorkerState};
