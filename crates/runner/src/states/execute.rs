//! ExecuteOrders
//!
//! Orders are placed one after another. The first is the entry leg: if it
//! fails the batch is abandoned and the cycle restarts. A failed exit leg
//! leaves an unhedged position and stops the loop.

use super::State;
use crate::context::StateContext;
use crate::error::{LoopError, Result};
use crate::transitions::Event;
use log::{error, info, warn};
use meridian_core::{Notification, Operation, Order, RequestId, ResponseKind};
use tokio::time::Instant;

#[derive(Debug)]
struct Pending {
    id: RequestId,
    order: Order,
    entry: bool,
    deadline: Instant,
}

#[derive(Debug, Default)]
pub struct ExecuteOrders {
    placed: usize,
    pending: Option<Pending>,
}

impl ExecuteOrders {
    /// Venue answer for `order`; `Err` carries the failure reason
    fn outcome(kind: ResponseKind) -> std::result::Result<Order, String> {
        match kind {
            ResponseKind::Order { order } if order.status.is_failure() => {
                Err(format!("order {:?} by venue", order.status))
            }
            ResponseKind::Order { order } => Ok(order),
            ResponseKind::Error { code, message, .. } => Err(format!("{}: {}", code, message)),
            other => Err(format!("unexpected {:?} response", other.tag())),
        }
    }

    async fn failed(&mut self, ctx: &mut StateContext, pending: Pending, reason: String) -> Result<Option<Event>> {
        ctx.agent.record_failed(pending.order.clone());

        if pending.entry {
            warn!("[LOOP] Entry order on {} failed: {}", pending.order.venue, reason);
            ctx.agent.new_orders.clear();
            ctx.notify(Notification::EntryFailed {
                order: pending.order,
                reason,
            })
            .await;
            return Ok(Some(Event::EntryExitError));
        }

        let message = format!(
            "Exit order {} on {} failed: {}",
            pending.order.id, pending.order.venue, reason
        );
        error!("[LOOP] {}", message);
        ctx.agent.last_error = Some(message.clone());
        Err(LoopError::UnexpectedState(message))
    }
}

impl State for ExecuteOrders {
    fn setup(&mut self) {
        self.placed = 0;
        self.pending = None;
    }

    async fn tick(&mut self, ctx: &mut StateContext) -> Result<Option<Event>> {
        if self.pending.is_none() {
            let Some(order) = ctx.agent.new_orders.pop_front() else {
                return Ok(Some(Event::Done));
            };
            let id = ctx.submit(Operation::CreateOrder {
                order: order.clone(),
            })?;
            self.pending = Some(Pending {
                id,
                order,
                entry: self.placed == 0,
                deadline: Instant::now() + ctx.config.timeout,
            });
        }
        let Some(pending) = self.pending.take() else {
            return Ok(None);
        };

        let wait = pending
            .deadline
            .saturating_duration_since(Instant::now())
            .min(ctx.config.tick_interval);
        ctx.pump(wait).await;

        if let Some(envelope) = ctx.take(&pending.id) {
            return match Self::outcome(envelope.payload.kind) {
                Ok(placed) => {
                    info!(
                        "[LOOP] {:?} {} {} on {} placed ({:?})",
                        placed.side, placed.amount, placed.symbol, placed.venue, placed.status
                    );
                    ctx.agent.submitted_orders.push(placed);
                    self.placed += 1;
                    Ok(None)
                }
                Err(reason) => self.failed(ctx, pending, reason).await,
            };
        }

        if Instant::now() >= pending.deadline {
            ctx.forget([&pending.id]);
            return self.failed(ctx, pending, "Request timeout".to_string()).await;
        }
        self.pending = Some(pending);
        Ok(None)
    }
}
