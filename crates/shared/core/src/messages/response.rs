use serde::{Deserialize, Serialize};

use super::{ErrorCode, RequestId};
use crate::entities::{
    ApprovalRequest, Balance, BridgeRequestId, BridgeStatus, Candle, Order, OrderBook, OrderId,
    Position, Ticker,
};
use crate::values::{ExchangeId, Symbol, Venue};

/// Result kinds, one success variant per operation plus a generic error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResponseKind {
    AllBalances {
        venue: Venue,
        balances: Vec<Balance>,
    },
    Balance {
        venue: Venue,
        balance: Balance,
    },
    AllTickers {
        venue: Venue,
        tickers: Vec<Ticker>,
    },
    Ticker {
        venue: Venue,
        ticker: Ticker,
    },
    AllPositions {
        venue: Venue,
        positions: Vec<Position>,
    },
    Position {
        venue: Venue,
        position: Position,
    },
    Orders {
        venue: Venue,
        orders: Vec<Order>,
    },
    Order {
        order: Order,
    },
    OrderCancelled {
        venue: Venue,
        order_id: OrderId,
    },
    OrderBook {
        venue: Venue,
        book: OrderBook,
    },
    Candles {
        venue: Venue,
        symbol: Symbol,
        candles: Vec<Candle>,
    },
    ApprovalSet {
        approval: ApprovalRequest,
        tx_hash: String,
    },
    BridgeStatus {
        bridge_request_id: BridgeRequestId,
        status: BridgeStatus,
    },
    Error {
        code: ErrorCode,
        message: String,
        exchange_id: Option<ExchangeId>,
    },
}

/// Fieldless mirror of [`ResponseKind`] for matching and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseTag {
    AllBalances,
    Balance,
    AllTickers,
    Ticker,
    AllPositions,
    Position,
    Orders,
    Order,
    OrderCancelled,
    OrderBook,
    Candles,
    ApprovalSet,
    BridgeStatus,
    Error,
}

impl ResponseKind {
    pub fn tag(&self) -> ResponseTag {
        match self {
            ResponseKind::AllBalances { .. } => ResponseTag::AllBalances,
            ResponseKind::Balance { .. } => ResponseTag::Balance,
            ResponseKind::AllTickers { .. } => ResponseTag::AllTickers,
            ResponseKind::Ticker { .. } => ResponseTag::Ticker,
            ResponseKind::AllPositions { .. } => ResponseTag::AllPositions,
            ResponseKind::Position { .. } => ResponseTag::Position,
            ResponseKind::Orders { .. } => ResponseTag::Orders,
            ResponseKind::Order { .. } => ResponseTag::Order,
            ResponseKind::OrderCancelled { .. } => ResponseTag::OrderCancelled,
            ResponseKind::OrderBook { .. } => ResponseTag::OrderBook,
            ResponseKind::Candles { .. } => ResponseTag::Candles,
            ResponseKind::ApprovalSet { .. } => ResponseTag::ApprovalSet,
            ResponseKind::BridgeStatus { .. } => ResponseTag::BridgeStatus,
            ResponseKind::Error { .. } => ResponseTag::Error,
        }
    }
}

/// Response payload, correlated to its request by `request_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub request_id: RequestId,
    pub kind: ResponseKind,
}

impl Response {
    pub fn new(request_id: RequestId, kind: ResponseKind) -> Self {
        Self { request_id, kind }
    }

    pub fn error(
        request_id: RequestId,
        code: ErrorCode,
        message: impl Into<String>,
        exchange_id: Option<ExchangeId>,
    ) -> Self {
        Self {
            request_id,
            kind: ResponseKind::Error {
                code,
                message: message.into(),
                exchange_id,
            },
        }
    }

    pub fn tag(&self) -> ResponseTag {
        self.kind.tag()
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, ResponseKind::Error { .. })
    }

    /// Error code and message, if this is an ERROR response
    pub fn error_details(&self) -> Option<(ErrorCode, &str)> {
        match &self.kind {
            ResponseKind::Error { code, message, .. } => Some((*code, message.as_str())),
            _ => None,
        }
    }
}
