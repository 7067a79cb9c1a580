//! Cross-Venue Spread Arbitrage
//!
//! Buys on the venue with the lowest ask and sells on the venue with the
//! highest bid when the gap between them exceeds a threshold:
//! - Entry leg: limit buy at the cheap venue's ask
//! - Exit leg: limit sell at the rich venue's bid
//! - Skips the cycle when either leg cannot be funded, flagging the
//!   opportunity as unaffordable and optionally asking for a bridge transfer
//!   of the missing quote asset

use crate::error::{Result, StrategyError};
use crate::params::{ParamKind, ParamValue, ParameterSpec};
use crate::strategy::{Strategy, StrategyContext, StrategyOutcome};
use log::{debug, info};
use meridian_core::{BridgeParams, Order, OrderSide, Ticker, Venue};
use rust_decimal::Decimal;

/// Configuration for the cross-venue strategy
#[derive(Debug, Clone)]
pub struct CrossVenueConfig {
    /// `BASE/QUOTE` symbol traded on every venue
    pub symbol: String,
    /// Minimum bid-over-ask gap, in basis points of the ask
    pub min_spread_bps: Decimal,
    /// Base quantity per leg
    pub order_size: Decimal,
    pub enabled: bool,
    /// No new trades while this many orders rest across venues
    pub max_open_orders: i64,
    /// Request a bridge transfer when the buy venue lacks quote funds
    pub bridge_rebalance: bool,
}

impl Default for CrossVenueConfig {
    fn default() -> Self {
        Self {
            symbol: "ETH/USDC".to_string(),
            min_spread_bps: Decimal::from(20),
            order_size: Decimal::ONE,
            enabled: true,
            max_open_orders: 4,
            bridge_rebalance: false,
        }
    }
}

pub struct CrossVenueArbitrage {
    config: CrossVenueConfig,
}

impl CrossVenueArbitrage {
    pub fn new(config: CrossVenueConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CrossVenueConfig {
        &self.config
    }

    /// Cheapest ask and richest bid, on different venues
    fn best_pair<'c>(&self, ctx: &'c StrategyContext<'_>) -> Option<((&'c Venue, &'c Ticker), (&'c Venue, &'c Ticker))> {
        let quotes: Vec<_> = ctx.venues_quoting(&self.config.symbol).collect();
        let buy = quotes.iter().min_by_key(|(_, t)| t.ask).copied()?;
        let sell = quotes
            .iter()
            .filter(|(venue, _)| *venue != buy.0)
            .max_by_key(|(_, t)| t.bid)
            .copied()?;
        Some((buy, sell))
    }

    /// Transfer of the missing quote from a venue on another ledger that holds enough
    fn rebalance(&self, ctx: &StrategyContext<'_>, buy_venue: &Venue, quote: &str, needed: Decimal) -> Option<BridgeParams> {
        let shortfall = needed - ctx.free(buy_venue, quote);
        ctx.portfolio
            .keys()
            .filter(|venue| venue.ledger_id != buy_venue.ledger_id)
            .find(|venue| ctx.free(venue, quote) >= shortfall)
            .map(|source| BridgeParams {
                source_chain: source.ledger_id.clone(),
                target_chain: buy_venue.ledger_id.clone(),
                token: quote.to_string(),
                amount: shortfall,
                receiver: None,
            })
    }
}

impl Strategy for CrossVenueArbitrage {
    fn name(&self) -> &str {
        "cross_venue_arbitrage"
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::new("min_spread_bps", ParamKind::Decimal),
            ParameterSpec::new("order_size", ParamKind::Decimal),
            ParameterSpec::new("enabled", ParamKind::Bool),
            ParameterSpec::new("max_open_orders", ParamKind::Integer),
            ParameterSpec::new("bridge_rebalance", ParamKind::Bool),
        ]
    }

    fn apply_parameter(&mut self, name: &str, value: ParamValue) -> Result<()> {
        let mismatch = |expected| StrategyError::TypeMismatch {
            name: name.to_string(),
            expected,
        };
        match (name, value) {
            ("min_spread_bps", ParamValue::Decimal(v)) => self.config.min_spread_bps = v,
            ("order_size", ParamValue::Decimal(v)) if v <= Decimal::ZERO => {
                return Err(StrategyError::InvalidValue {
                    name: name.to_string(),
                    reason: "must be positive".to_string(),
                });
            }
            ("order_size", ParamValue::Decimal(v)) => self.config.order_size = v,
            ("enabled", ParamValue::Bool(v)) => self.config.enabled = v,
            ("max_open_orders", ParamValue::Integer(v)) => self.config.max_open_orders = v,
            ("bridge_rebalance", ParamValue::Bool(v)) => self.config.bridge_rebalance = v,
            ("min_spread_bps" | "order_size", _) => return Err(mismatch(ParamKind::Decimal)),
            ("enabled" | "bridge_rebalance", _) => return Err(mismatch(ParamKind::Bool)),
            ("max_open_orders", _) => return Err(mismatch(ParamKind::Integer)),
            _ => return Err(StrategyError::UnknownParameter(name.to_string())),
        }
        info!("[STRATEGY] {} set to new value", name);
        Ok(())
    }

    fn get_orders(&mut self, ctx: &StrategyContext<'_>) -> StrategyOutcome {
        if !self.config.enabled {
            return StrategyOutcome::none();
        }
        let open = ctx.open_order_count();
        if i64::try_from(open).unwrap_or(i64::MAX) >= self.config.max_open_orders {
            debug!("[STRATEGY] {} open orders, skipping cycle", open);
            return StrategyOutcome::none();
        }

        let Some(((buy_venue, buy), (sell_venue, sell))) = self.best_pair(ctx) else {
            return StrategyOutcome::none();
        };
        if buy.ask.is_zero() || sell.bid <= buy.ask {
            return StrategyOutcome::none();
        }
        let spread_bps = (sell.bid - buy.ask) / buy.ask * Decimal::from(10_000);
        if spread_bps < self.config.min_spread_bps {
            debug!(
                "[STRATEGY] Spread {} bps below threshold {}",
                spread_bps.round_dp(2),
                self.config.min_spread_bps
            );
            return StrategyOutcome::none();
        }

        let Some((base, quote)) = self.config.symbol.split_once('/') else {
            return StrategyOutcome::none();
        };
        let size = self.config.order_size;
        let cost = size * buy.ask;
        let quote_ok = ctx.free(buy_venue, quote) >= cost;
        let base_ok = ctx.free(sell_venue, base) >= size;

        if !(quote_ok && base_ok) {
            info!(
                "[STRATEGY] Opportunity {} -> {} ({} bps) not affordable",
                buy_venue.key(),
                sell_venue.key(),
                spread_bps.round_dp(2)
            );
            let bridge_requests = match (quote_ok, self.config.bridge_rebalance) {
                (false, true) => self.rebalance(ctx, buy_venue, quote, cost).into_iter().collect(),
                _ => Vec::new(),
            };
            return StrategyOutcome {
                orders: Vec::new(),
                unaffordable_opportunity: true,
                bridge_requests,
            };
        }

        info!(
            "[STRATEGY] Buy {} {} on {} @ {}, sell on {} @ {} ({} bps)",
            size,
            self.config.symbol,
            buy_venue.key(),
            buy.ask,
            sell_venue.key(),
            sell.bid,
            spread_bps.round_dp(2)
        );
        let entry = Order::limit(buy_venue.clone(), &self.config.symbol, OrderSide::Buy, size, buy.ask);
        let exit = Order::limit(sell_venue.clone(), &self.config.symbol, OrderSide::Sell, size, sell.bid);
        StrategyOutcome {
            orders: vec![entry, exit],
            unaffordable_opportunity: false,
            bridge_requests: Vec::new(),
        }
    }
}
