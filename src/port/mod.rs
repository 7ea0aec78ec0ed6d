//! Ports to external collaborators.

pub mod exchange;

pub use exchange::{
    AccountClient, Capabilities, ClientFactory, ExchangeDirectory, ExchangeHandle,
    MarketDataService, PayloadStream, RateLimit, StreamChannel, StreamPayload,
    StreamingMarketData, TradeClient,
};
