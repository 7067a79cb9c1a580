//! In-memory paper venues
//!
//! `PaperExchange` fills marketable orders immediately against its own
//! tickers and balances; `PaperBridge` walks a transfer through the pending
//! states one status query at a time. Both support fault injection.

mod bridge;
mod exchange;

pub use bridge::PaperBridge;
pub use exchange::{PaperCall, PaperExchange};
