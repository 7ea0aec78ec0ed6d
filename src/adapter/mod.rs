//! Adapters at the edges of the engine.
//!
//! - [`paper`] - simulated exchanges implementing the exchange ports
//! - [`cli`] - the `marketbus` command line

pub mod cli;
pub mod paper;
