//! Infrastructure layer.
//!
//! Technical concerns that support the application without containing
//! engine logic.
//!
//! - [`config`] - configuration loading, validation and logging setup

pub mod config;
