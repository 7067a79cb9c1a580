use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Balance of a single asset on a venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub asset_id: String,
    /// Available for trading
    pub free: Decimal,
    /// Locked in open orders
    pub used: Decimal,
    pub total: Decimal,
}

impl Balance {
    pub fn new(asset_id: impl Into<String>, free: Decimal, used: Decimal) -> Self {
        Self {
            asset_id: asset_id.into(),
            free,
            used,
            total: free + used,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_zero()
    }
}

/// Find the free amount of `asset_id` in a balance list
pub fn free_balance(balances: &[Balance], asset_id: &str) -> Decimal {
    balances
        .iter()
        .find(|b| b.asset_id == asset_id)
        .map(|b| b.free)
        .unwrap_or(Decimal::ZERO)
}
