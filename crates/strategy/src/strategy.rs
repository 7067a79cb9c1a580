//! Strategy Trait and Context
//!
//! The control loop calls a strategy once per cycle with the data collected
//! from every venue and acts on the returned orders.

use crate::error::Result;
use crate::params::{ParamValue, ParameterSpec};
use meridian_core::{Balance, BridgeParams, Order, Ticker, Venue, free_balance};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Snapshot handed to the strategy on each cycle
pub struct StrategyContext<'a> {
    /// Balances per venue
    pub portfolio: &'a BTreeMap<Venue, Vec<Balance>>,
    /// Tickers per venue
    pub prices: &'a BTreeMap<Venue, Vec<Ticker>>,
    /// Orders already resting on each venue
    pub open_orders: &'a BTreeMap<Venue, Vec<Order>>,
}

impl StrategyContext<'_> {
    /// Ticker for `symbol` on `venue`
    pub fn ticker(&self, venue: &Venue, symbol: &str) -> Option<&Ticker> {
        self.prices.get(venue)?.iter().find(|t| t.symbol == symbol)
    }

    /// Free balance of `asset` on `venue` (zero if unknown)
    pub fn free(&self, venue: &Venue, asset: &str) -> Decimal {
        self.portfolio
            .get(venue)
            .map(|balances| free_balance(balances, asset))
            .unwrap_or(Decimal::ZERO)
    }

    pub fn open_order_count(&self) -> usize {
        self.open_orders.values().map(Vec::len).sum()
    }

    /// Venues with a price for `symbol`
    pub fn venues_quoting<'s>(
        &'s self,
        symbol: &str,
    ) -> impl Iterator<Item = (&'s Venue, &'s Ticker)> {
        self.prices.iter().filter_map(move |(venue, tickers)| {
            tickers
                .iter()
                .find(|t| t.symbol == symbol)
                .map(|ticker| (venue, ticker))
        })
    }
}

/// What a strategy decided this cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyOutcome {
    /// Orders to place; the first is the entry leg, the rest are exits
    pub orders: Vec<Order>,
    /// An opportunity existed but the portfolio could not fund it
    pub unaffordable_opportunity: bool,
    /// Cross-chain transfers the strategy wants started
    pub bridge_requests: Vec<BridgeParams>,
}

impl StrategyOutcome {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn has_orders(&self) -> bool {
        !self.orders.is_empty()
    }
}

/// Strategy trait - implement this for an arbitrage strategy
pub trait Strategy: Send {
    /// Strategy name for logging
    fn name(&self) -> &str;

    /// Parameters that may be overridden at runtime
    fn parameters(&self) -> Vec<ParameterSpec>;

    /// Apply one override. Values arrive already converted to the declared kind.
    fn apply_parameter(&mut self, name: &str, value: ParamValue) -> Result<()>;

    /// Decide what to trade given the current snapshot
    fn get_orders(&mut self, ctx: &StrategyContext<'_>) -> StrategyOutcome;
}
