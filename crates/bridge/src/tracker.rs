//! Bridge Request Tracker
//!
//! One record per transfer, removed once the bridge reports a terminal
//! status. Status checks are rate-limited per record: a new check is sent
//! only when the last accepted status is at least `check_interval` old and no
//! check is already waiting for an answer.

use crate::error::Result;
use log::{debug, info, warn};
use meridian_core::{
    Address, BridgeParams, BridgeRequestId, BridgeStatus, BridgeStatusCode, Operation, Request,
    RequestEnvelope, RequestId, ResponseEnvelope, ResponseKind,
};
use meridian_gateway::{GatewayError, GatewayTaskManager};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Lifecycle of a tracked transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    AwaitingInitialResult,
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeRecord {
    pub id: BridgeRequestId,
    pub params: BridgeParams,
    pub state: TransferState,
    pub last_status: Option<BridgeStatus>,
    /// When the last status was accepted
    pub last_update: Option<Instant>,
    /// A request or status check is waiting for its answer
    pub check_in_flight: bool,
}

/// What a status update did to the tracker
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    /// Unknown or finalized id, or an unsolicited update inside the check interval
    Ignored,
    /// Still pending; payload and timestamp refreshed
    Updated,
    /// A status check failed; the next poll asks again
    CheckFailed(String),
    /// Transfer finished; the record has been removed
    Completed(BridgeRecord),
    /// Transfer failed; the record has been removed
    Failed(BridgeRecord),
}

pub struct BridgeRequestTracker {
    origin: Address,
    check_interval: Duration,
    records: HashMap<BridgeRequestId, BridgeRecord>,
    /// Gateway request id -> transfer it belongs to
    awaiting: HashMap<RequestId, BridgeRequestId>,
}

impl BridgeRequestTracker {
    /// `origin` is the address gateway replies are sent back to
    pub fn new(origin: Address, check_interval: Duration) -> Self {
        Self {
            origin,
            check_interval,
            records: HashMap::new(),
            awaiting: HashMap::new(),
        }
    }

    /// Record a new transfer and build its RequestBridge envelope
    pub fn prepare(&mut self, params: BridgeParams, destination: Address) -> (BridgeRequestId, RequestEnvelope) {
        let id = Uuid::new_v4();
        let request = Request::new(Operation::RequestBridge {
            bridge_request_id: id,
            params: params.clone(),
        });
        self.awaiting.insert(request.id, id);
        self.records.insert(
            id,
            BridgeRecord {
                id,
                params,
                state: TransferState::AwaitingInitialResult,
                last_status: None,
                last_update: None,
                check_in_flight: true,
            },
        );
        (id, RequestEnvelope::new(destination, self.origin.clone(), request))
    }

    /// Start a transfer through the gateway
    ///
    /// A refused request still yields an id: the gateway answers it with an
    /// ERROR envelope, which fails the record in [`Self::on_response`]. Only a
    /// shut down gateway is an error here.
    pub fn request(&mut self, params: BridgeParams, gateway: &GatewayTaskManager) -> Result<BridgeRequestId> {
        info!(
            "[BRIDGE] Requesting {} {} from {} to {}",
            params.amount, params.token, params.source_chain, params.target_chain
        );
        let (id, envelope) = self.prepare(params, gateway.config().address.clone());
        let request_id = envelope.payload.id;
        match gateway.submit(envelope) {
            Ok(_) => Ok(id),
            Err(GatewayError::ShutDown) => {
                self.awaiting.remove(&request_id);
                self.records.remove(&id);
                Err(GatewayError::ShutDown.into())
            }
            Err(e) => {
                warn!("[BRIDGE] Gateway refused transfer {}: {}", id, e);
                Ok(id)
            }
        }
    }

    /// Apply a status reported for `id`
    pub fn on_status(&mut self, id: BridgeRequestId, status: BridgeStatus, now: Instant) -> StatusUpdate {
        let Some(record) = self.records.get_mut(&id) else {
            debug!("[BRIDGE] Ignoring status {} for unknown or finished {}", status.code.as_str(), id);
            return StatusUpdate::Ignored;
        };

        if status.code.is_pending() {
            let recent = record
                .last_update
                .is_some_and(|last| now.saturating_duration_since(last) < self.check_interval);
            if !record.check_in_flight && recent {
                debug!("[BRIDGE] Ignoring unsolicited {} for {}", status.code.as_str(), id);
                return StatusUpdate::Ignored;
            }
            debug!("[BRIDGE] {} is {}", id, status.code.as_str());
            record.state = TransferState::Pending;
            record.last_status = Some(status);
            record.last_update = Some(now);
            record.check_in_flight = false;
            return StatusUpdate::Updated;
        }

        let Some(mut record) = self.records.remove(&id) else {
            return StatusUpdate::Ignored;
        };
        self.awaiting.retain(|_, transfer| *transfer != id);
        record.check_in_flight = false;
        record.last_update = Some(now);
        let success = status.code.is_success();
        record.last_status = Some(status);

        if success {
            info!("[BRIDGE] {} completed", id);
            record.state = TransferState::Completed;
            StatusUpdate::Completed(record)
        } else {
            warn!("[BRIDGE] {} failed: {:?}", id, record.last_status);
            record.state = TransferState::Failed;
            StatusUpdate::Failed(record)
        }
    }

    /// Send status checks for records that are due. Returns how many were sent.
    pub fn poll(&mut self, gateway: &GatewayTaskManager, now: Instant) -> Result<usize> {
        let interval = self.check_interval;
        let due: Vec<BridgeRequestId> = self
            .records
            .values()
            .filter(|r| r.state == TransferState::Pending && !r.check_in_flight)
            .filter(|r| r.last_update.is_none_or(|last| now.saturating_duration_since(last) >= interval))
            .map(|r| r.id)
            .collect();

        for id in &due {
            let request = Request::new(Operation::GetBridgeStatus {
                bridge_request_id: *id,
            });
            let request_id = request.id;
            let envelope = RequestEnvelope::new(gateway.config().address.clone(), self.origin.clone(), request);
            match gateway.submit(envelope) {
                Ok(_) => {}
                Err(GatewayError::ShutDown) => return Err(GatewayError::ShutDown.into()),
                Err(e) => warn!("[BRIDGE] Gateway refused status check for {}: {}", id, e),
            }
            self.awaiting.insert(request_id, *id);
            if let Some(record) = self.records.get_mut(id) {
                record.check_in_flight = true;
            }
        }
        if !due.is_empty() {
            debug!("[BRIDGE] Sent {} status checks", due.len());
        }
        Ok(due.len())
    }

    /// True if `envelope` answers a request this tracker sent
    pub fn handles(&self, envelope: &ResponseEnvelope) -> bool {
        self.awaiting.contains_key(&envelope.payload.request_id)
    }

    /// Route a gateway response. `None` if it was not a bridge response of ours.
    pub fn on_response(&mut self, envelope: &ResponseEnvelope, now: Instant) -> Option<StatusUpdate> {
        let id = self.awaiting.remove(&envelope.payload.request_id)?;
        let update = match &envelope.payload.kind {
            ResponseKind::BridgeStatus { status, .. } => self.on_status(id, status.clone(), now),
            ResponseKind::Error { code, message, .. } => self.on_error(id, format!("{}: {}", code, message), now),
            other => {
                warn!("[BRIDGE] Unexpected response {:?} for {}", other.tag(), id);
                self.on_error(id, format!("Unexpected response {:?}", other.tag()), now)
            }
        };
        Some(update)
    }

    fn on_error(&mut self, id: BridgeRequestId, message: String, now: Instant) -> StatusUpdate {
        let Some(record) = self.records.get_mut(&id) else {
            return StatusUpdate::Ignored;
        };
        if record.state == TransferState::AwaitingInitialResult {
            let status = BridgeStatus::new(BridgeStatusCode::Error).with_message(message);
            return self.on_status(id, status, now);
        }
        warn!("[BRIDGE] Status check for {} failed: {}", id, message);
        record.check_in_flight = false;
        record.last_update = Some(now);
        StatusUpdate::CheckFailed(message)
    }

    pub fn record(&self, id: BridgeRequestId) -> Option<&BridgeRecord> {
        self.records.get(&id)
    }

    /// Transfers not yet terminal
    pub fn outstanding(&self) -> usize {
        self.records.len()
    }

    pub fn is_idle(&self) -> bool {
        self.records.is_empty()
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn params() -> BridgeParams {
        BridgeParams {
            source_chain: "ethereum".into(),
            target_chain: "base".into(),
            token: "USDC".into(),
            amount: dec!(100),
            receiver: None,
        }
    }

    fn tracker() -> BridgeRequestTracker {
        BridgeRequestTracker::new(Address::new("agent/test"), Duration::from_secs(10))
    }

    fn pending() -> BridgeStatus {
        BridgeStatus::new(BridgeStatusCode::PendingTxReceipt)
    }

    #[test]
    fn test_initial_result_accepted() {
        let mut tracker = tracker();
        let (id, envelope) = tracker.prepare(params(), Address::new("gateway/dcxt"));
        assert_eq!(envelope.payload.tag(), meridian_core::OperationTag::RequestBridge);

        let now = Instant::now();
        assert_eq!(tracker.on_status(id, pending(), now), StatusUpdate::Updated);

        let record = tracker.record(id).unwrap();
        assert_eq!(record.state, TransferState::Pending);
        assert_eq!(record.last_update, Some(now));
        assert!(!record.check_in_flight);
    }

    #[test]
    fn test_unsolicited_pending_inside_interval_ignored() {
        let mut tracker = tracker();
        let (id, _) = tracker.prepare(params(), Address::new("gateway/dcxt"));
        let start = Instant::now();
        tracker.on_status(id, pending(), start);

        let first = start + Duration::from_secs(11);
        assert_eq!(tracker.on_status(id, pending(), first), StatusUpdate::Updated);

        let second = first + Duration::from_secs(2);
        let awaiting = BridgeStatus::new(BridgeStatusCode::AwaitingTargetFinality);
        assert_eq!(tracker.on_status(id, awaiting, second), StatusUpdate::Ignored);

        let record = tracker.record(id).unwrap();
        assert_eq!(record.last_update, Some(first));
        assert_eq!(
            record.last_status.as_ref().map(|s| s.code),
            Some(BridgeStatusCode::PendingTxReceipt)
        );
    }

    #[test]
    fn test_finalized_id_is_noop() {
        let mut tracker = tracker();
        let (id, _) = tracker.prepare(params(), Address::new("gateway/dcxt"));
        let now = Instant::now();

        let done = BridgeStatus::new(BridgeStatusCode::Completed);
        match tracker.on_status(id, done.clone(), now) {
            StatusUpdate::Completed(record) => {
                assert_eq!(record.state, TransferState::Completed);
                assert_eq!(record.params, params());
            }
            other => panic!("expected completion, got {:?}", other),
        }
        assert!(tracker.is_idle());

        assert_eq!(tracker.on_status(id, done, now), StatusUpdate::Ignored);
        assert_eq!(tracker.on_status(id, pending(), now), StatusUpdate::Ignored);
        assert!(tracker.is_idle());
    }

    #[test]
    fn test_failure_removes_record() {
        let mut tracker = tracker();
        let (id, _) = tracker.prepare(params(), Address::new("gateway/dcxt"));

        let failed = BridgeStatus::new(BridgeStatusCode::Failed).with_message("reverted");
        match tracker.on_status(id, failed, Instant::now()) {
            StatusUpdate::Failed(record) => {
                assert_eq!(record.state, TransferState::Failed);
                assert_eq!(
                    record.last_status.and_then(|s| s.message),
                    Some("reverted".to_string())
                );
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(tracker.outstanding(), 0);
    }

    #[test]
    fn test_unknown_id_ignored() {
        let mut tracker = tracker();
        assert_eq!(
            tracker.on_status(Uuid::new_v4(), pending(), Instant::now()),
            StatusUpdate::Ignored
        );
    }
}
