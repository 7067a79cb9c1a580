//! Gateway Task Manager
//!
//! Turns request envelopes into tracked tokio tasks. Each task runs one
//! adapter call; on completion its record is removed from the in-flight set
//! and the result is placed on the delivery queue as a response envelope
//! addressed to the original sender. Errors never escape a task: they become
//! ERROR responses.

use crate::config::GatewayConfig;
use crate::dispatch::{CallResult, DispatchTable, Handler};
use crate::error::{CallError, GatewayError, Result, TransportError};
use crate::registry::AdapterRegistry;
use crate::subscription;
use dashmap::DashMap;
use futures::FutureExt;
use log::{debug, error, info, warn};
use meridian_core::{
    ErrorCode, Operation, ReplyMode, RequestEnvelope, Response, ResponseEnvelope,
};
use meridian_ports::AdapterError;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::AbortHandle;

/// Identifier of a one-shot request task
pub type TaskId = u64;

/// Identifier of a streaming subscription task
pub type SubscriptionId = u64;

/// In-flight task record: the task handle and the request that started it
pub(crate) struct TaskRecord {
    pub(crate) handle: AbortHandle,
    pub(crate) envelope: RequestEnvelope,
}

/// State shared between the manager and its tasks
pub(crate) struct Shared {
    pub(crate) config: GatewayConfig,
    pub(crate) registry: Arc<AdapterRegistry>,
    dispatch: DispatchTable,
    in_flight: DashMap<TaskId, TaskRecord>,
    pub(crate) subscriptions: DashMap<SubscriptionId, TaskRecord>,
    delivery_tx: mpsc::UnboundedSender<ResponseEnvelope>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl Shared {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Place a response on the delivery queue
    pub(crate) fn deliver(&self, envelope: ResponseEnvelope) {
        if self.delivery_tx.send(envelope).is_err() {
            error!("[GATEWAY] Delivery queue closed, dropping response");
        }
    }

    /// Run a handler with the configured call timeout, catching panics
    async fn execute(&self, handler: Handler, operation: Operation) -> CallResult {
        let call = AssertUnwindSafe(handler(Arc::clone(&self.registry), operation)).catch_unwind();
        let outcome = match self.config.call_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => return Err(CallError::Adapter(AdapterError::Timeout)),
            },
            None => call.await,
        };
        outcome.unwrap_or(Err(CallError::Panicked))
    }

    /// Completion callback: pop the task record, then queue the response
    pub(crate) fn on_completion(&self, task_id: TaskId, outcome: CallResult) {
        let Some((_, record)) = self.in_flight.remove(&task_id) else {
            debug!("[GATEWAY] Task {} finished after cancellation, result dropped", task_id);
            return;
        };

        let request = &record.envelope.payload;
        let response = match outcome {
            Ok(_) if request.reply == ReplyMode::ErrorsOnly => {
                debug!(
                    "[GATEWAY] Task {} ({}) succeeded, reply suppressed",
                    task_id,
                    request.tag()
                );
                return;
            }
            Ok(kind) => {
                debug!("[GATEWAY] Task {} ({}) -> {:?}", task_id, request.tag(), kind.tag());
                Response::new(request.id, kind)
            }
            Err(err) => {
                warn!("[GATEWAY] Task {} ({}) failed: {}", task_id, request.tag(), err);
                let exchange_id = request.operation.exchange_id().cloned();
                Response::new(request.id, err.into_kind(exchange_id))
            }
        };

        self.deliver(record.envelope.reply(response));
    }

    /// Answer a request that never reached a task
    fn reject(&self, envelope: &RequestEnvelope, code: ErrorCode, message: String) {
        let request = &envelope.payload;
        let response = Response::error(
            request.id,
            code,
            message,
            request.operation.exchange_id().cloned(),
        );
        self.deliver(envelope.reply(response));
    }
}

/// Gateway Task Manager
///
/// `submit` and `subscribe` never block. Responses are consumed with
/// `receive`, in completion order; callers correlate on the request id.
pub struct GatewayTaskManager {
    shared: Arc<Shared>,
    delivery_rx: Mutex<mpsc::UnboundedReceiver<ResponseEnvelope>>,
}

impl GatewayTaskManager {
    /// Create a manager with the standard dispatch table
    pub fn new(config: GatewayConfig, registry: AdapterRegistry) -> Result<Self> {
        Self::with_dispatch(config, registry, DispatchTable::standard())
    }

    /// Create a manager with a custom dispatch table, validated against the required operations
    pub fn with_dispatch(
        config: GatewayConfig,
        registry: AdapterRegistry,
        dispatch: DispatchTable,
    ) -> Result<Self> {
        dispatch.validate(&config.required_operations)?;

        let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();
        info!(
            "[GATEWAY] Started at {} with exchanges {:?}",
            config.address,
            registry.exchange_ids()
        );

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                registry: Arc::new(registry),
                dispatch,
                in_flight: DashMap::new(),
                subscriptions: DashMap::new(),
                delivery_tx,
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
            }),
            delivery_rx: Mutex::new(delivery_rx),
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.shared.config
    }

    /// Submit a one-shot request
    ///
    /// Request-shape errors (streaming or unsupported operations) are answered
    /// with an ERROR envelope on the delivery queue and also returned here.
    pub fn submit(&self, envelope: RequestEnvelope) -> Result<TaskId> {
        self.ensure_open()?;

        let tag = envelope.payload.tag();
        if tag.is_streaming() {
            self.shared.reject(
                &envelope,
                ErrorCode::InvalidMessage,
                format!("{} is a streaming operation; subscribe instead", tag),
            );
            return Err(GatewayError::StreamingOperation(tag));
        }
        let Some(handler) = self.shared.dispatch.get(tag) else {
            self.shared.reject(
                &envelope,
                ErrorCode::UnsupportedProtocol,
                format!("Operation not supported: {}", tag),
            );
            return Err(GatewayError::UnsupportedOperation(tag));
        };

        let task_id = self.shared.next_id();
        let operation = envelope.payload.operation.clone();
        let shared = Arc::clone(&self.shared);
        let (armed_tx, armed_rx) = oneshot::channel::<()>();

        let join = tokio::spawn(async move {
            // Wait until the record is registered so completion always finds it
            if armed_rx.await.is_err() {
                return;
            }
            let outcome = shared.execute(handler, operation).await;
            shared.on_completion(task_id, outcome);
        });

        debug!(
            "[GATEWAY] Task {} submitted: {} from {}",
            task_id, tag, envelope.origin
        );
        self.shared.in_flight.insert(
            task_id,
            TaskRecord {
                handle: join.abort_handle(),
                envelope,
            },
        );
        let _ = armed_tx.send(());

        Ok(task_id)
    }

    /// Start a streaming subscription (order book watch, candle polling)
    pub fn subscribe(&self, envelope: RequestEnvelope) -> Result<SubscriptionId> {
        self.ensure_open()?;

        let tag = envelope.payload.tag();
        if !tag.is_streaming() {
            return Err(GatewayError::NotStreaming(tag));
        }

        let subscription_id = self.shared.next_id();
        let shared = Arc::clone(&self.shared);
        let request_envelope = envelope.clone();
        let (armed_tx, armed_rx) = oneshot::channel::<()>();

        let join = tokio::spawn(async move {
            if armed_rx.await.is_err() {
                return;
            }
            subscription::run(Arc::clone(&shared), request_envelope).await;
            shared.subscriptions.remove(&subscription_id);
        });

        info!(
            "[GATEWAY] Subscription {} started: {} from {}",
            subscription_id, tag, envelope.origin
        );
        self.shared.subscriptions.insert(
            subscription_id,
            TaskRecord {
                handle: join.abort_handle(),
                envelope,
            },
        );
        let _ = armed_tx.send(());

        Ok(subscription_id)
    }

    /// Cancel one subscription. Returns false if it is unknown or already finished.
    pub fn unsubscribe(&self, subscription_id: SubscriptionId) -> bool {
        match self.shared.subscriptions.remove(&subscription_id) {
            Some((_, record)) if !record.handle.is_finished() => {
                record.handle.abort();
                info!("[GATEWAY] Subscription {} cancelled", subscription_id);
                true
            }
            _ => false,
        }
    }

    /// Wait for the next response envelope
    pub async fn receive(&self) -> Result<ResponseEnvelope> {
        let mut rx = self.delivery_rx.lock().await;
        rx.recv()
            .await
            .ok_or(GatewayError::Transport(TransportError::ChannelClosed))
    }

    /// Wait at most `timeout` for the next response envelope
    pub async fn receive_timeout(&self, timeout: Duration) -> Option<ResponseEnvelope> {
        tokio::time::timeout(timeout, self.receive())
            .await
            .ok()
            .and_then(|r| r.ok())
    }

    /// Take a response if one is already queued
    pub fn try_receive(&self) -> Option<ResponseEnvelope> {
        let mut rx = self.delivery_rx.try_lock().ok()?;
        rx.try_recv().ok()
    }

    /// Number of one-shot tasks still running
    pub fn in_flight_count(&self) -> usize {
        self.shared.in_flight.len()
    }

    /// Number of live subscriptions
    pub fn subscription_count(&self) -> usize {
        self.shared.subscriptions.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Cancel every in-flight and subscription task, then close the adapters.
    /// Returns the number of tasks cancelled; finished tasks are skipped.
    pub async fn shutdown(&self) -> usize {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return 0;
        }

        let mut cancelled = 0;
        for tasks in [&self.shared.in_flight, &self.shared.subscriptions] {
            let ids: Vec<u64> = tasks.iter().map(|entry| *entry.key()).collect();
            for id in ids {
                if let Some((_, record)) = tasks.remove(&id) {
                    if record.handle.is_finished() {
                        continue;
                    }
                    record.handle.abort();
                    cancelled += 1;
                }
            }
        }

        info!("[GATEWAY] Shutdown: cancelled {} tasks", cancelled);
        self.shared.registry.close_all().await;
        cancelled
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_shut_down() {
            return Err(GatewayError::ShutDown);
        }
        Ok(())
    }
}
