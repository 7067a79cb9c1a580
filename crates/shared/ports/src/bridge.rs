use async_trait::async_trait;
use meridian_core::{BridgeParams, BridgeRequestId, BridgeStatus};

use crate::error::AdapterResult;

/// Cross-chain bridge client
#[async_trait]
pub trait BridgeAdapter: Send + Sync {
    /// Start a transfer; returns the initial status
    async fn bridge(
        &self,
        bridge_request_id: BridgeRequestId,
        params: &BridgeParams,
    ) -> AdapterResult<BridgeStatus>;

    /// Current status of a previously started transfer
    async fn status(&self, bridge_request_id: BridgeRequestId) -> AdapterResult<BridgeStatus>;

    async fn close(&self) -> AdapterResult<()> {
        Ok(())
    }
}
