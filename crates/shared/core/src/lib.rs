//! Meridian Core Domain
//!
//! Pure domain types for the Meridian arbitrage agent: venues, balances,
//! tickers, orders, bridge transfers, and the request/response envelopes
//! exchanged with the gateway.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod messages;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{
    ApprovalRequest, Balance, BookLevel, BridgeParams, BridgeRequestId, BridgeStatus,
    BridgeStatusCode, Candle, Order, OrderBook, OrderId, OrderSide, OrderStatus, OrderType,
    Position, PositionSide, Ticker, free_balance,
};
pub use messages::{
    Address, Envelope, ErrorCode, Notification, Operation, OperationTag, Params, ReplyMode,
    Request, RequestEnvelope, RequestId, Response, ResponseEnvelope, ResponseKind, ResponseTag,
};
pub use values::{ExchangeId, LedgerId, Price, Quantity, Symbol, Timestamp, Venue};
