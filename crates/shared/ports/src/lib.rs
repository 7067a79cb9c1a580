//! Meridian Ports
//!
//! Port definitions (traits) for the Meridian arbitrage agent.
//! These define the boundary between the gateway and the concrete
//! exchange and bridge clients.

mod bridge;
mod error;
mod exchange;

pub use bridge::BridgeAdapter;
pub use error::{AdapterError, AdapterResult};
pub use exchange::ExchangeAdapter;
