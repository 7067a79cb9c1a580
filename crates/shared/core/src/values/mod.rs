use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

mod venue;

pub use venue::{ExchangeId, LedgerId, Venue};

/// Price value - uses Decimal for precision
pub type Price = Decimal;

/// Quantity value - uses Decimal for precision
pub type Quantity = Decimal;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;

/// Market symbol, e.g. `ETH/USDC`
pub type Symbol = String;
