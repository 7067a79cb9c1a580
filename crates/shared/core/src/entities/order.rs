use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{OrderSide, OrderStatus, OrderType};
use crate::values::{Price, Quantity, Symbol, Timestamp, Venue};

/// Client-side order identifier
pub type OrderId = Uuid;

/// Order as tracked by the agent, before and after submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Assigned by the venue once accepted
    pub exchange_order_id: Option<String>,
    pub venue: Venue,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub amount: Quantity,
    /// Required for limit orders
    pub price: Option<Price>,
    pub filled: Quantity,
    pub status: OrderStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    /// Create a new limit order
    pub fn limit(
        venue: Venue,
        symbol: impl Into<Symbol>,
        side: OrderSide,
        amount: Quantity,
        price: Price,
    ) -> Self {
        Self::build(venue, symbol.into(), side, OrderType::Limit, amount, Some(price))
    }

    /// Create a new market order
    pub fn market(venue: Venue, symbol: impl Into<Symbol>, side: OrderSide, amount: Quantity) -> Self {
        Self::build(venue, symbol.into(), side, OrderType::Market, amount, None)
    }

    fn build(
        venue: Venue,
        symbol: Symbol,
        side: OrderSide,
        order_type: OrderType,
        amount: Quantity,
        price: Option<Price>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            exchange_order_id: None,
            venue,
            symbol,
            side,
            order_type,
            amount,
            price,
            filled: Decimal::ZERO,
            status: OrderStatus::New,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate the order based on order type requirements
    pub fn validate(&self) -> bool {
        if self.amount <= Decimal::ZERO {
            return false;
        }
        match self.order_type {
            OrderType::Market => true,
            OrderType::Limit => self.price.is_some_and(|p| p > Decimal::ZERO),
        }
    }

    /// Quote value of the order at its limit price
    pub fn notional(&self) -> Option<Decimal> {
        self.price.map(|p| p * self.amount)
    }

    /// Returns remaining quantity to be filled
    pub fn remaining(&self) -> Decimal {
        self.amount - self.filled
    }

    /// Returns true if the order is completely filled
    pub fn is_filled(&self) -> bool {
        self.filled >= self.amount
    }

    /// Base and quote assets for a `BASE/QUOTE` symbol
    pub fn assets(&self) -> Option<(&str, &str)> {
        self.symbol.split_once('/')
    }
}
