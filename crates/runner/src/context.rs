//! Shared context handed to every state on each tick
//!
//! Owns the agent state, the strategy and the bridge tracker, and correlates
//! gateway responses with the requests the current state is waiting for.
//! A response nobody waits for any more (the state gave up on it) is counted
//! as late and dropped.

use crate::agent_state::AgentState;
use crate::config::LoopConfig;
use crate::error::Result;
use crate::inbox::ParameterInbox;
use crate::transitions::StateName;
use log::{debug, info, warn};
use meridian_bridge::{BridgeRequestTracker, StatusUpdate};
use meridian_core::{
    Address, BridgeParams, BridgeStatus, BridgeStatusCode, Notification, Operation, Request,
    RequestEnvelope, RequestId, ResponseEnvelope,
};
use meridian_gateway::{GatewayError, GatewayTaskManager, Publisher};
use meridian_strategy::Strategy;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub struct StateContext {
    pub gateway: Arc<GatewayTaskManager>,
    /// Address gateway replies come back to
    pub address: Address,
    pub config: LoopConfig,
    pub agent: AgentState,
    pub strategy: Box<dyn Strategy>,
    pub inbox: ParameterInbox,
    pub tracker: BridgeRequestTracker,
    /// Transfers waiting to be handed to the tracker
    pub bridge_queue: VecDeque<BridgeParams>,
    /// State the loop left when it entered the current one
    pub previous: StateName,
    notifier: Box<dyn Publisher<Notification>>,
    expected: HashSet<RequestId>,
    arrived: HashMap<RequestId, ResponseEnvelope>,
    late_responses: u64,
}

impl StateContext {
    pub fn new(
        config: LoopConfig,
        gateway: Arc<GatewayTaskManager>,
        strategy: Box<dyn Strategy>,
        notifier: Box<dyn Publisher<Notification>>,
        address: Address,
    ) -> Self {
        let tracker = BridgeRequestTracker::new(address.clone(), config.bridge_status_check_interval);
        let inbox = ParameterInbox::new(&strategy.parameters());
        let agent = AgentState::new(config.approvals.clone());
        Self {
            gateway,
            address,
            config,
            agent,
            strategy,
            inbox,
            tracker,
            bridge_queue: VecDeque::new(),
            previous: StateName::Setup,
            notifier,
            expected: HashSet::new(),
            arrived: HashMap::new(),
            late_responses: 0,
        }
    }

    /// Send `operation` to the gateway and start waiting for its answer.
    ///
    /// Request-shape errors still yield an id: the gateway answers them with
    /// an ERROR envelope. Only a shut down gateway is an error here.
    pub fn submit(&mut self, operation: Operation) -> Result<RequestId> {
        let request = Request::new(operation);
        let id = request.id;
        let tag = request.tag();
        let envelope = RequestEnvelope::new(
            self.gateway.config().address.clone(),
            self.address.clone(),
            request,
        );
        self.expected.insert(id);
        match self.gateway.submit(envelope) {
            Ok(_) => {
                debug!("[LOOP] Submitted {} as {}", tag, id);
                Ok(id)
            }
            Err(GatewayError::ShutDown) => {
                self.expected.remove(&id);
                Err(GatewayError::ShutDown.into())
            }
            Err(e) => {
                warn!("[LOOP] Gateway refused {}: {}", tag, e);
                Ok(id)
            }
        }
    }

    /// Route responses: wait at most `wait` for the first, then take whatever
    /// else is already queued
    pub async fn pump(&mut self, wait: Duration) {
        if let Some(envelope) = self.gateway.receive_timeout(wait).await {
            self.route(envelope).await;
        }
        while let Some(envelope) = self.gateway.try_receive() {
            self.route(envelope).await;
        }
    }

    /// Pump until `deadline`, for at most one tick. `true` once the deadline has passed.
    pub async fn idle_until(&mut self, deadline: Instant) -> bool {
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        let wait = (deadline - now).min(self.config.tick_interval);
        self.pump(wait).await;
        Instant::now() >= deadline
    }

    async fn route(&mut self, envelope: ResponseEnvelope) {
        if self.tracker.handles(&envelope) {
            if let Some(update) = self.tracker.on_response(&envelope, Instant::now()) {
                self.handle_bridge_update(update).await;
            }
            return;
        }

        let id = envelope.payload.request_id;
        if self.expected.contains(&id) {
            self.arrived.insert(id, envelope);
        } else {
            self.late_responses += 1;
            info!(
                "[LOOP] Discarding late {:?} response for {}",
                envelope.payload.tag(),
                id
            );
        }
    }

    async fn handle_bridge_update(&mut self, update: StatusUpdate) {
        match update {
            StatusUpdate::Completed(record) => {
                self.notify(Notification::BridgeCompleted {
                    bridge_request_id: record.id,
                    params: record.params,
                })
                .await;
            }
            StatusUpdate::Failed(record) => {
                let status = record
                    .last_status
                    .unwrap_or_else(|| BridgeStatus::new(BridgeStatusCode::Error));
                self.agent.last_error = Some(format!(
                    "Bridge transfer {} failed: {}",
                    record.id,
                    status.message.as_deref().unwrap_or(status.code.as_str())
                ));
                self.notify(Notification::BridgeFailed {
                    bridge_request_id: record.id,
                    params: record.params,
                    status,
                })
                .await;
            }
            StatusUpdate::CheckFailed(message) => {
                debug!("[LOOP] Bridge status check failed: {}", message);
            }
            StatusUpdate::Updated | StatusUpdate::Ignored => {}
        }
    }

    /// Take the response to `id` if it has arrived
    pub fn take(&mut self, id: &RequestId) -> Option<ResponseEnvelope> {
        let envelope = self.arrived.remove(id)?;
        self.expected.remove(id);
        Some(envelope)
    }

    /// Stop waiting for these requests; their responses will count as late
    pub fn forget<'a>(&mut self, ids: impl IntoIterator<Item = &'a RequestId>) {
        for id in ids {
            self.expected.remove(id);
            self.arrived.remove(id);
        }
    }

    /// Publish a notification; a closed channel is logged, not fatal
    pub async fn notify(&self, notification: Notification) {
        if let Err(e) = self.notifier.publish(&notification).await {
            warn!(
                "[LOOP] Failed to publish notification on {}: {}",
                self.notifier.topic(),
                e
            );
        }
    }

    pub fn late_responses(&self) -> u64 {
        self.late_responses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::{ErrorCode, Response, Venue};
    use meridian_gateway::{AdapterRegistry, Addresses, ChannelPublisher, GatewayConfig};
    use meridian_strategy::{CrossVenueArbitrage, CrossVenueConfig};
    use uuid::Uuid;

    fn context() -> StateContext {
        let gateway = GatewayTaskManager::new(GatewayConfig::default(), AdapterRegistry::new()).unwrap();
        let (notifier, _) = ChannelPublisher::<Notification>::pair("notifications.test", 8);
        StateContext::new(
            LoopConfig::default(),
            Arc::new(gateway),
            Box::new(CrossVenueArbitrage::new(CrossVenueConfig::default())),
            Box::new(notifier),
            Addresses::agent("test"),
        )
    }

    #[tokio::test]
    async fn test_refused_request_still_answered() {
        let mut ctx = context();
        let id = ctx
            .submit(Operation::WatchOrderBook {
                venue: Venue::new("x", "cex"),
                symbol: "ETH/USDC".into(),
            })
            .unwrap();

        ctx.pump(Duration::from_millis(100)).await;
        let envelope = ctx.take(&id).unwrap();
        assert_eq!(envelope.destination, Addresses::agent("test"));
        assert!(envelope.payload.is_error());
        assert_eq!(ctx.late_responses(), 0);
    }

    #[tokio::test]
    async fn test_unexpected_response_counted_late() {
        let mut ctx = context();
        let stray = ResponseEnvelope::new(
            Addresses::agent("test"),
            Addresses::gateway(),
            Response::error(Uuid::new_v4(), ErrorCode::ApiError, "Request timeout", None),
        );
        ctx.route(stray).await;
        assert_eq!(ctx.late_responses(), 1);

        let unknown_exchange = ctx
            .submit(Operation::GetOrders {
                venue: Venue::new("missing", "cex"),
                symbol: None,
            })
            .unwrap();
        ctx.forget([&unknown_exchange]);
        ctx.pump(Duration::from_millis(100)).await;
        assert_eq!(ctx.late_responses(), 2);
        assert!(ctx.take(&unknown_exchange).is_none());
    }
}
