//! Meridian Gateway
//!
//! Task manager between the control loop and the venues. Provides:
//! - A dispatch table from operation tags to adapter calls
//! - One tracked tokio task per request, with replies delivered in completion order
//! - Streaming subscriptions (order book watch, candle polling) with local retry
//! - Paper exchange and bridge adapters for dry runs and tests
//! - A notification transport for outcome reports
//!
//! ## Architecture
//!
//! ```text
//!  Control loop ── RequestEnvelope ──► GatewayTaskManager
//!       ▲                                  │ dispatch table
//!       │                                  ▼
//!       │                            spawned task ──► ExchangeAdapter / BridgeAdapter
//!       │                                  │
//!       └──── ResponseEnvelope ◄── delivery queue
//! ```
//!
//! Adapter failures never cross a task boundary: they come back as ERROR
//! responses carrying an [`meridian_core::ErrorCode`].

pub mod adapters;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod manager;
pub mod registry;
mod subscription;
pub mod transport;

pub use adapters::{PaperBridge, PaperCall, PaperExchange};
pub use config::GatewayConfig;
pub use dispatch::DispatchTable;
pub use error::{GatewayError, TransportError};
pub use manager::{GatewayTaskManager, SubscriptionId, TaskId};
pub use registry::AdapterRegistry;
pub use transport::{
    Addresses, Publisher, Subscriber,
    channel::{ChannelPublisher, ChannelSubscriber},
};
