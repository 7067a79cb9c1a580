//! Meridian Runner - Trading Control Loop
//!
//! Drives one arbitrage agent through its trading cycle. The loop never calls
//! an exchange itself: every venue interaction is a request submitted to the
//! gateway, answered asynchronously on the gateway's delivery queue.
//!
//! ## Architecture
//!
//! ```text
//!            ┌────────────────────────────────────────────┐
//!            │                ControlLoop                 │
//!            │                                            │
//!            │   Setup ──► CollectData ──► Identify ──►   │
//!            │     ▲                         │   Execute  │
//!            │     │                         ▼      │     │
//!            │     └──── PostTrade / NoOpportunity ◄┘     │
//!            │                                            │
//!            │  AgentState  ParameterInbox   BridgeTracker │
//!            └─────────┬───────────────────────▲──────────┘
//!                      │ RequestEnvelope       │ ResponseEnvelope
//!                      ▼                       │
//!            ┌────────────────────────────────────────────┐
//!            │             GatewayTaskManager             │
//!            └────────────────────────────────────────────┘
//! ```
//!
//! Snapshots of the agent state are published on a watch channel after
//! every transition; outcome notifications go out through a
//! [`meridian_gateway::Publisher`].

pub mod agent_state;
pub mod config;
pub mod context;
pub mod control_loop;
pub mod error;
pub mod inbox;
pub mod states;
pub mod transitions;

pub use agent_state::{AgentSnapshot, AgentState, ORDER_HISTORY_LIMIT, SnapshotPublisher};
pub use config::{AgentConfigFile, DEFAULT_RETRIES, LoopConfig, TickerConfig, VenueConfig};
pub use control_loop::{ControlLoop, Transition};
pub use error::{ConfigError, LoopError, Result};
pub use inbox::ParameterInbox;
pub use transitions::{Event, StateName, transition};
