use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::entities::{ApprovalRequest, BridgeParams, BridgeRequestId, Order, OrderId};
use crate::values::{ExchangeId, Symbol, Venue};

/// Correlation id shared by a request and its response
pub type RequestId = Uuid;

/// Free-form exchange call parameters, passed through to the adapter
pub type Params = BTreeMap<String, String>;

/// Whether a successful result is delivered back to the sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReplyMode {
    /// Always answer
    #[default]
    Always,
    /// Answer only when the call fails
    ErrorsOnly,
}

/// Identifies which exchange capability a request invokes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationTag {
    GetAllBalances,
    GetBalance,
    GetAllTickers,
    GetTicker,
    GetAllPositions,
    GetPosition,
    GetOrders,
    CreateOrder,
    CancelOrder,
    GetOrderBook,
    WatchOrderBook,
    PollCandles,
    SetApproval,
    RequestBridge,
    GetBridgeStatus,
}

impl OperationTag {
    pub const ALL: [OperationTag; 15] = [
        OperationTag::GetAllBalances,
        OperationTag::GetBalance,
        OperationTag::GetAllTickers,
        OperationTag::GetTicker,
        OperationTag::GetAllPositions,
        OperationTag::GetPosition,
        OperationTag::GetOrders,
        OperationTag::CreateOrder,
        OperationTag::CancelOrder,
        OperationTag::GetOrderBook,
        OperationTag::WatchOrderBook,
        OperationTag::PollCandles,
        OperationTag::SetApproval,
        OperationTag::RequestBridge,
        OperationTag::GetBridgeStatus,
    ];

    /// Streaming operations run as subscriptions rather than one-shot requests
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::WatchOrderBook | Self::PollCandles)
    }

    /// Operations served by the bridge adapter rather than an exchange adapter
    pub fn is_bridge(&self) -> bool {
        matches!(self, Self::RequestBridge | Self::GetBridgeStatus)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetAllBalances => "get_all_balances",
            Self::GetBalance => "get_balance",
            Self::GetAllTickers => "get_all_tickers",
            Self::GetTicker => "get_ticker",
            Self::GetAllPositions => "get_all_positions",
            Self::GetPosition => "get_position",
            Self::GetOrders => "get_orders",
            Self::CreateOrder => "create_order",
            Self::CancelOrder => "cancel_order",
            Self::GetOrderBook => "get_order_book",
            Self::WatchOrderBook => "watch_order_book",
            Self::PollCandles => "poll_candles",
            Self::SetApproval => "set_approval",
            Self::RequestBridge => "request_bridge",
            Self::GetBridgeStatus => "get_bridge_status",
        }
    }
}

impl fmt::Display for OperationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation with its operation-specific fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    GetAllBalances {
        venue: Venue,
        params: Params,
    },
    GetBalance {
        venue: Venue,
        asset_id: String,
    },
    GetAllTickers {
        venue: Venue,
        params: Params,
    },
    GetTicker {
        venue: Venue,
        symbol: Symbol,
    },
    GetAllPositions {
        venue: Venue,
        params: Params,
    },
    GetPosition {
        venue: Venue,
        symbol: Symbol,
    },
    GetOrders {
        venue: Venue,
        symbol: Option<Symbol>,
    },
    CreateOrder {
        order: Order,
    },
    CancelOrder {
        venue: Venue,
        order_id: OrderId,
        exchange_order_id: Option<String>,
        symbol: Symbol,
    },
    GetOrderBook {
        venue: Venue,
        symbol: Symbol,
        depth: Option<usize>,
    },
    WatchOrderBook {
        venue: Venue,
        symbol: Symbol,
    },
    PollCandles {
        venue: Venue,
        symbol: Symbol,
        timeframe: String,
        interval_ms: u64,
    },
    SetApproval {
        approval: ApprovalRequest,
    },
    RequestBridge {
        bridge_request_id: BridgeRequestId,
        params: BridgeParams,
    },
    GetBridgeStatus {
        bridge_request_id: BridgeRequestId,
    },
}

impl Operation {
    pub fn tag(&self) -> OperationTag {
        match self {
            Operation::GetAllBalances { .. } => OperationTag::GetAllBalances,
            Operation::GetBalance { .. } => OperationTag::GetBalance,
            Operation::GetAllTickers { .. } => OperationTag::GetAllTickers,
            Operation::GetTicker { .. } => OperationTag::GetTicker,
            Operation::GetAllPositions { .. } => OperationTag::GetAllPositions,
            Operation::GetPosition { .. } => OperationTag::GetPosition,
            Operation::GetOrders { .. } => OperationTag::GetOrders,
            Operation::CreateOrder { .. } => OperationTag::CreateOrder,
            Operation::CancelOrder { .. } => OperationTag::CancelOrder,
            Operation::GetOrderBook { .. } => OperationTag::GetOrderBook,
            Operation::WatchOrderBook { .. } => OperationTag::WatchOrderBook,
            Operation::PollCandles { .. } => OperationTag::PollCandles,
            Operation::SetApproval { .. } => OperationTag::SetApproval,
            Operation::RequestBridge { .. } => OperationTag::RequestBridge,
            Operation::GetBridgeStatus { .. } => OperationTag::GetBridgeStatus,
        }
    }

    /// Venue targeted by the operation, if it targets an exchange
    pub fn venue(&self) -> Option<&Venue> {
        match self {
            Operation::GetAllBalances { venue, .. }
            | Operation::GetBalance { venue, .. }
            | Operation::GetAllTickers { venue, .. }
            | Operation::GetTicker { venue, .. }
            | Operation::GetAllPositions { venue, .. }
            | Operation::GetPosition { venue, .. }
            | Operation::GetOrders { venue, .. }
            | Operation::CancelOrder { venue, .. }
            | Operation::GetOrderBook { venue, .. }
            | Operation::WatchOrderBook { venue, .. }
            | Operation::PollCandles { venue, .. } => Some(venue),
            Operation::CreateOrder { order } => Some(&order.venue),
            Operation::SetApproval { approval } => Some(&approval.venue),
            Operation::RequestBridge { .. }
            | Operation::GetBridgeStatus { .. } => None,
        }
    }

    pub fn exchange_id(&self) -> Option<&ExchangeId> {
        self.venue().map(|v| &v.exchange_id)
    }
}

/// Request payload: operation plus correlation id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub operation: Operation,
    #[serde(default)]
    pub reply: ReplyMode,
}

impl Request {
    pub fn new(operation: Operation) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation,
            reply: ReplyMode::Always,
        }
    }

    /// Suppress the reply on success
    pub fn errors_only(mut self) -> Self {
        self.reply = ReplyMode::ErrorsOnly;
        self
    }

    pub fn tag(&self) -> OperationTag {
        self.operation.tag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_cover_all_operations() {
        let venue = Venue::new("x", "cex");
        let op = Operation::GetAllBalances {
            venue: venue.clone(),
            params: Params::new(),
        };
        assert_eq!(op.tag(), OperationTag::GetAllBalances);
        assert_eq!(op.exchange_id(), Some(&ExchangeId::new("x")));

        let bridge = Operation::GetBridgeStatus {
            bridge_request_id: Uuid::new_v4(),
        };
        assert!(bridge.tag().is_bridge());
        assert!(bridge.venue().is_none());

        let watch = Operation::WatchOrderBook {
            venue,
            symbol: "ETH/USDC".to_string(),
        };
        assert!(watch.tag().is_streaming());
        assert_eq!(OperationTag::ALL.len(), 15);
    }

    #[test]
    fn test_request_reply_mode() {
        let req = Request::new(Operation::GetBridgeStatus {
            bridge_request_id: Uuid::new_v4(),
        });
        assert_eq!(req.reply, ReplyMode::Always);
        assert_eq!(req.errors_only().reply, ReplyMode::ErrorsOnly);
    }
}
