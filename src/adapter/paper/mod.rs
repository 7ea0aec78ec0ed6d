//! Simulated exchanges.
//!
//! Each `[[exchanges]]` entry becomes a [`PaperExchange`] with random-walk
//! prices, synthetic order books and a fixed wallet. Exchanges marked
//! `streaming` also push tickers, books and trades on a timer. Lets the
//! engine run end to end without exchange credentials.

mod account;
mod market;
mod streaming;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::domain::CurrencyPair;
use crate::error::{ExchangeError, Result};
use crate::infrastructure::config::ExchangeConfig;
use crate::port::exchange::{
    AccountClient, Capabilities, ClientFactory, ExchangeDirectory, ExchangeHandle,
    MarketDataService, RateLimit, StreamingMarketData, TradeClient,
};

pub use account::PaperAccount;
pub use market::PaperMarket;
pub use streaming::PaperStreaming;

/// One simulated exchange.
pub struct PaperExchange {
    name: String,
    market: Arc<PaperMarket>,
    streaming: Option<Arc<PaperStreaming>>,
    rate_limit: Option<RateLimit>,
    account: Arc<PaperAccount>,
}

impl PaperExchange {
    /// Build from a validated config entry.
    pub fn from_config(config: &ExchangeConfig, book_depth: usize) -> Result<Self> {
        let pairs = config
            .markets
            .iter()
            .map(|m| m.parse::<CurrencyPair>())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let market = Arc::new(PaperMarket::new(&config.name, pairs, config.start_price));
        let streaming = config.streaming.then(|| {
            Arc::new(PaperStreaming::new(
                &config.name,
                Arc::clone(&market),
                Duration::from_millis(config.tick_ms),
                book_depth,
            ))
        });
        let rate_limit = config
            .rate_limit_calls
            .map(|calls| RateLimit::new(calls, Duration::from_millis(config.rate_limit_period_ms)));

        Ok(Self {
            name: config.name.clone(),
            market,
            streaming,
            rate_limit,
            account: Arc::new(PaperAccount::new(&config.balances)),
        })
    }
}

impl ExchangeHandle for PaperExchange {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        match &self.streaming {
            Some(s) => Capabilities::with_streaming(Arc::clone(s) as Arc<dyn StreamingMarketData>),
            None => Capabilities::polling_only(),
        }
    }

    fn market_data(&self) -> Arc<dyn MarketDataService> {
        Arc::clone(&self.market) as Arc<dyn MarketDataService>
    }

    fn rate_limits(&self) -> std::result::Result<Option<Vec<RateLimit>>, ExchangeError> {
        Ok(self.rate_limit.map(|limit| vec![limit]))
    }
}

/// Directory and client factory over the configured paper exchanges.
pub struct PaperDirectory {
    exchanges: BTreeMap<String, Arc<PaperExchange>>,
}

impl PaperDirectory {
    /// # Errors
    ///
    /// Returns an error if a market in `configs` does not parse.
    pub fn from_config(configs: &[ExchangeConfig], book_depth: usize) -> Result<Self> {
        let mut exchanges = BTreeMap::new();
        for config in configs {
            let exchange = PaperExchange::from_config(config, book_depth)?;
            info!(
                exchange = %config.name,
                markets = config.markets.len(),
                streaming = config.streaming,
                "Paper exchange ready"
            );
            exchanges.insert(config.name.clone(), Arc::new(exchange));
        }
        Ok(Self { exchanges })
    }

    fn exchange(&self, name: &str) -> std::result::Result<&Arc<PaperExchange>, ExchangeError> {
        self.exchanges
            .get(name)
            .ok_or_else(|| ExchangeError::UnknownExchange(name.to_string()))
    }
}

impl ExchangeDirectory for PaperDirectory {
    fn exchanges(&self) -> Vec<String> {
        self.exchanges.keys().cloned().collect()
    }

    fn get(&self, name: &str) -> std::result::Result<Arc<dyn ExchangeHandle>, ExchangeError> {
        self.exchange(name)
            .map(|e| Arc::clone(e) as Arc<dyn ExchangeHandle>)
    }
}

impl ClientFactory for PaperDirectory {
    fn trade(&self, exchange: &str) -> std::result::Result<Arc<dyn TradeClient>, ExchangeError> {
        self.exchange(exchange)
            .map(|e| Arc::clone(&e.account) as Arc<dyn TradeClient>)
    }

    fn account(
        &self,
        exchange: &str,
    ) -> std::result::Result<Arc<dyn AccountClient>, ExchangeError> {
        self.exchange(exchange)
            .map(|e| Arc::clone(&e.account) as Arc<dyn AccountClient>)
    }
}
