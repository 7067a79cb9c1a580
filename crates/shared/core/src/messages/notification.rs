use serde::{Deserialize, Serialize};

use crate::entities::{BridgeParams, BridgeRequestId, BridgeStatus, Order};

/// Outcome reports published for external consumers (alerts, dashboards)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Notification {
    TradeExecuted {
        period: u64,
        orders: Vec<Order>,
    },
    EntryFailed {
        order: Order,
        reason: String,
    },
    BridgeCompleted {
        bridge_request_id: BridgeRequestId,
        params: BridgeParams,
    },
    BridgeFailed {
        bridge_request_id: BridgeRequestId,
        params: BridgeParams,
        status: BridgeStatus,
    },
    Error {
        state: String,
        message: String,
    },
}
