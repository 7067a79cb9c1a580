//! Meridian Strategy Framework
//!
//! Provides the pieces the control loop needs from a trading strategy:
//! - Strategy trait: snapshot of portfolio, prices and open orders in, orders out
//! - Declared, typed parameters that can be overridden at runtime
//! - A cross-venue spread strategy
//!
//! ## Architecture
//!
//! ```text
//!   CollectData ──► StrategyContext (portfolio, prices, open orders)
//!                          │
//!                          ▼
//!                   ┌──────────────┐
//!                   │   Strategy   │◄── staged parameter overrides (CoolDown)
//!                   └──────┬───────┘
//!                          │ StrategyOutcome
//!                          ▼
//!        orders (entry first, then exits), unaffordable flag, bridge requests
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meridian_strategy::{CrossVenueArbitrage, CrossVenueConfig, Strategy};
//!
//! let mut strategy = CrossVenueArbitrage::new(CrossVenueConfig {
//!     symbol: "ETH/USDC".to_string(),
//!     min_spread_bps: dec!(25),
//!     ..Default::default()
//! });
//! let outcome = strategy.get_orders(&ctx);
//! ```

pub mod cross_venue;
pub mod error;
pub mod params;
pub mod strategy;

pub use cross_venue::{CrossVenueArbitrage, CrossVenueConfig};
pub use error::{Result, StrategyError};
pub use params::{ParamKind, ParamValue, ParameterSpec};
pub use strategy::{Strategy, StrategyContext, StrategyOutcome};
