use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::values::{LedgerId, Quantity};

/// Identifier assigned to a bridge transfer when it is requested
pub type BridgeRequestId = Uuid;

/// Parameters of a cross-chain transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeParams {
    pub source_chain: LedgerId,
    pub target_chain: LedgerId,
    pub token: String,
    pub amount: Quantity,
    /// Receiving address on the target chain (defaults to the agent's own)
    pub receiver: Option<String>,
}

/// Status codes reported by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeStatusCode {
    PendingTxReceipt,
    AwaitingTargetFinality,
    Claimable,
    Completed,
    Failed,
    Error,
}

impl BridgeStatusCode {
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            Self::PendingTxReceipt | Self::AwaitingTargetFinality | Self::Claimable
        )
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingTxReceipt => "PENDING_TX_RECEIPT",
            Self::AwaitingTargetFinality => "AWAITING_TARGET_FINALITY",
            Self::Claimable => "CLAIMABLE",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Error => "ERROR",
        }
    }
}

/// Status payload returned for a bridge transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeStatus {
    pub code: BridgeStatusCode,
    pub source_tx_hash: Option<String>,
    pub target_tx_hash: Option<String>,
    pub message: Option<String>,
}

impl BridgeStatus {
    pub fn new(code: BridgeStatusCode) -> Self {
        Self {
            code,
            source_tx_hash: None,
            target_tx_hash: None,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
