//! Configuration modules.

pub mod engine;
pub mod exchange;
pub mod logging;
pub mod settings;

pub use engine::EngineConfig;
pub use exchange::ExchangeConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use settings::Config;
