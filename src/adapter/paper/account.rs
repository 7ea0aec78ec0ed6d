//! Paper wallet and order book of the user.

use std::collections::BTreeMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{Balance, CurrencyPair, Order, Trade};
use crate::error::ExchangeError;
use crate::port::exchange::{AccountClient, TradeClient};

/// A fixed wallet with no open orders and no trade history.
pub struct PaperAccount {
    balances: Vec<Balance>,
}

impl PaperAccount {
    pub fn new(balances: &BTreeMap<String, Decimal>) -> Self {
        Self {
            balances: balances
                .iter()
                .map(|(currency, amount)| Balance::new(currency.as_str(), *amount, *amount))
                .collect(),
        }
    }
}

#[async_trait]
impl AccountClient for PaperAccount {
    async fn balances(&self) -> Result<Vec<Balance>, ExchangeError> {
        Ok(self.balances.clone())
    }
}

#[async_trait]
impl TradeClient for PaperAccount {
    async fn open_orders(&self, _pair: &CurrencyPair) -> Result<Vec<Order>, ExchangeError> {
        Ok(Vec::new())
    }

    async fn trade_history(
        &self,
        _pair: &CurrencyPair,
        _limit: usize,
    ) -> Result<Vec<Trade>, ExchangeError> {
        Ok(Vec::new())
    }
}
