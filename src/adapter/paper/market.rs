//! Random-walk market data.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rand::Rng;
use rust_decimal::Decimal;

use crate::domain::{CurrencyPair, OrderBook, PriceLevel, Side, Ticker, Trade};
use crate::error::ExchangeError;
use crate::port::exchange::MarketDataService;

/// Largest single price step, in basis points.
const MAX_STEP_BPS: i64 = 25;

/// Prices for every listed pair of one paper exchange.
pub struct PaperMarket {
    exchange: String,
    prices: Mutex<HashMap<CurrencyPair, Decimal>>,
}

impl PaperMarket {
    pub fn new(exchange: &str, pairs: impl IntoIterator<Item = CurrencyPair>, start: Decimal) -> Self {
        Self {
            exchange: exchange.to_string(),
            prices: Mutex::new(pairs.into_iter().map(|p| (p, start)).collect()),
        }
    }

    /// Move the price of `pair` one random step and return it.
    pub fn step(&self, pair: &CurrencyPair) -> Result<Decimal, ExchangeError> {
        let mut prices = self.prices.lock();
        let price = prices.get_mut(pair).ok_or_else(|| self.unlisted())?;
        let bps = rand::thread_rng().gen_range(-MAX_STEP_BPS..=MAX_STEP_BPS);
        let next = (*price * (Decimal::ONE + Decimal::new(bps, 4))).round_dp(8);
        if next > Decimal::ZERO {
            *price = next;
        }
        Ok(*price)
    }

    fn price(&self, pair: &CurrencyPair) -> Result<Decimal, ExchangeError> {
        self.prices.lock().get(pair).copied().ok_or_else(|| self.unlisted())
    }

    fn unlisted(&self) -> ExchangeError {
        ExchangeError::NotAvailable {
            exchange: self.exchange.clone(),
            feature: "market",
        }
    }

    pub fn ticker_now(&self, pair: &CurrencyPair) -> Result<Ticker, ExchangeError> {
        let last = self.step(pair)?;
        let half_spread = (last * Decimal::new(5, 4)).round_dp(8);
        Ok(Ticker {
            last,
            bid: Some(last - half_spread),
            ask: Some(last + half_spread),
            volume: None,
            timestamp: Some(Utc::now()),
        })
    }

    pub fn book_now(&self, pair: &CurrencyPair, depth: usize) -> Result<OrderBook, ExchangeError> {
        let mid = self.price(pair)?;
        let tick = (mid * Decimal::new(1, 4)).max(Decimal::new(1, 8));
        let mut rng = rand::thread_rng();
        let mut level = |i: usize, sign: Decimal| {
            let offset = tick * Decimal::from(i as u64 + 1);
            let amount = Decimal::new(rng.gen_range(1..=500), 2);
            PriceLevel::new((mid + sign * offset).round_dp(8), amount)
        };
        let bids = (0..depth).map(|i| level(i, Decimal::NEGATIVE_ONE)).collect();
        let asks = (0..depth).map(|i| level(i, Decimal::ONE)).collect();
        Ok(OrderBook::new(bids, asks).with_timestamp(Utc::now()))
    }

    pub fn trade_now(&self, pair: &CurrencyPair) -> Result<Trade, ExchangeError> {
        let price = self.step(pair)?;
        let mut rng = rand::thread_rng();
        Ok(Trade {
            id: format!("paper-{}", rng.gen::<u32>()),
            side: if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell },
            price,
            amount: Decimal::new(rng.gen_range(1..=1000), 3),
            timestamp: Utc::now(),
        })
    }
}

#[async_trait]
impl MarketDataService for PaperMarket {
    async fn ticker(&self, pair: &CurrencyPair) -> Result<Ticker, ExchangeError> {
        self.ticker_now(pair)
    }

    async fn order_book(
        &self,
        pair: &CurrencyPair,
        depth: usize,
    ) -> Result<OrderBook, ExchangeError> {
        self.book_now(pair, depth)
    }

    async fn trades(&self, pair: &CurrencyPair) -> Result<Vec<Trade>, ExchangeError> {
        (0..3).map(|_| self.trade_now(pair)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market() -> PaperMarket {
        PaperMarket::new("paper", [CurrencyPair::new("BTC", "USD")], Decimal::ONE_HUNDRED)
    }

    #[test]
    fn step_stays_within_bounds() {
        let market = market();
        let pair = CurrencyPair::new("BTC", "USD");

        let price = market.step(&pair).unwrap();

        assert!(price >= Decimal::new(9975, 2) && price <= Decimal::new(10025, 2));
    }

    #[test]
    fn unlisted_pair_is_not_available() {
        let err = market().step(&CurrencyPair::new("ETH", "USD")).unwrap_err();
        assert!(err.is_not_available());
    }

    #[test]
    fn book_is_sorted_and_sized() {
        let book = market().book_now(&CurrencyPair::new("BTC", "USD"), 5).unwrap();

        assert_eq!(book.bids().len(), 5);
        assert_eq!(book.asks().len(), 5);
        assert!(book.bids().windows(2).all(|w| w[0].price() > w[1].price()));
        assert!(book.asks().windows(2).all(|w| w[0].price() < w[1].price()));
        assert!(book.spread().unwrap() > Decimal::ZERO);
    }
}
