//! Paper bridge

use async_trait::async_trait;
use log::debug;
use meridian_core::{BridgeParams, BridgeRequestId, BridgeStatus, BridgeStatusCode};
use meridian_ports::{AdapterError, AdapterResult, BridgeAdapter};
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

#[derive(Default)]
struct Transfers {
    codes: HashMap<BridgeRequestId, BridgeStatusCode>,
    faults: VecDeque<AdapterError>,
}

/// Bridge that advances each transfer by one state per status query:
/// `PENDING_TX_RECEIPT` -> `AWAITING_TARGET_FINALITY` -> `COMPLETED` (or `FAILED`)
#[derive(Default)]
pub struct PaperBridge {
    transfers: Mutex<Transfers>,
    fail_transfers: bool,
}

impl PaperBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// End every transfer in `FAILED` instead of `COMPLETED`
    pub fn with_failure(mut self) -> Self {
        self.fail_transfers = true;
        self
    }

    /// Make the next bridge or status call fail with `error`
    pub async fn fail_next(&self, error: AdapterError) {
        self.transfers.lock().await.faults.push_back(error);
    }

    fn status_for(id: BridgeRequestId, code: BridgeStatusCode) -> BridgeStatus {
        let mut status = BridgeStatus::new(code);
        status.source_tx_hash = Some(format!("0xsrc-{}", id.simple()));
        if code == BridgeStatusCode::Completed {
            status.target_tx_hash = Some(format!("0xdst-{}", id.simple()));
        }
        status
    }
}

#[async_trait]
impl BridgeAdapter for PaperBridge {
    async fn bridge(
        &self,
        bridge_request_id: BridgeRequestId,
        params: &BridgeParams,
    ) -> AdapterResult<BridgeStatus> {
        let mut transfers = self.transfers.lock().await;
        if let Some(err) = transfers.faults.pop_front() {
            return Err(err);
        }
        debug!(
            "[PAPER] Bridge {} {} {} -> {}",
            params.amount, params.token, params.source_chain, params.target_chain
        );
        transfers
            .codes
            .insert(bridge_request_id, BridgeStatusCode::PendingTxReceipt);
        Ok(Self::status_for(
            bridge_request_id,
            BridgeStatusCode::PendingTxReceipt,
        ))
    }

    async fn status(&self, bridge_request_id: BridgeRequestId) -> AdapterResult<BridgeStatus> {
        let mut transfers = self.transfers.lock().await;
        if let Some(err) = transfers.faults.pop_front() {
            return Err(err);
        }
        let fail = self.fail_transfers;
        let code = transfers.codes.get_mut(&bridge_request_id).ok_or_else(|| {
            AdapterError::Exchange(format!("Unknown bridge request {}", bridge_request_id))
        })?;

        *code = match *code {
            BridgeStatusCode::PendingTxReceipt => BridgeStatusCode::AwaitingTargetFinality,
            BridgeStatusCode::AwaitingTargetFinality | BridgeStatusCode::Claimable if fail => {
                BridgeStatusCode::Failed
            }
            BridgeStatusCode::AwaitingTargetFinality | BridgeStatusCode::Claimable => {
                BridgeStatusCode::Completed
            }
            terminal => terminal,
        };
        Ok(Self::status_for(bridge_request_id, *code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn params() -> BridgeParams {
        BridgeParams {
            source_chain: "ethereum".into(),
            target_chain: "base".into(),
            token: "USDC".into(),
            amount: dec!(500),
            receiver: None,
        }
    }

    #[tokio::test]
    async fn test_transfer_walks_to_completed() {
        let bridge = PaperBridge::new();
        let id = Uuid::new_v4();

        let initial = bridge.bridge(id, &params()).await.unwrap();
        assert_eq!(initial.code, BridgeStatusCode::PendingTxReceipt);

        let codes: Vec<_> = [
            bridge.status(id).await.unwrap().code,
            bridge.status(id).await.unwrap().code,
            bridge.status(id).await.unwrap().code,
        ]
        .into();
        assert_eq!(
            codes,
            vec![
                BridgeStatusCode::AwaitingTargetFinality,
                BridgeStatusCode::Completed,
                BridgeStatusCode::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_bridge_ends_failed() {
        let bridge = PaperBridge::new().with_failure();
        let id = Uuid::new_v4();
        bridge.bridge(id, &params()).await.unwrap();
        bridge.status(id).await.unwrap();

        assert_eq!(bridge.status(id).await.unwrap().code, BridgeStatusCode::Failed);
    }

    #[tokio::test]
    async fn test_unknown_transfer() {
        let bridge = PaperBridge::new();
        assert!(bridge.status(Uuid::new_v4()).await.is_err());
    }
}
