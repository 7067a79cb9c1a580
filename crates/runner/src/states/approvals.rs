//! SetApprovals
//!
//! Submits every queued approval at once. A failed approval is retried after
//! `poll_interval`; once any approval has failed `max_retries` times the
//! state gives up and the unfinished approvals go back on the queue.

use super::State;
use crate::context::StateContext;
use crate::error::Result;
use crate::transitions::Event;
use log::{info, warn};
use meridian_core::{ApprovalRequest, Operation, RequestId, ResponseKind};
use std::collections::VecDeque;
use tokio::time::Instant;

#[derive(Debug)]
struct Attempt {
    approval: ApprovalRequest,
    failures: u32,
}

#[derive(Debug)]
struct InFlight {
    id: RequestId,
    attempt: Attempt,
    deadline: Instant,
}

#[derive(Debug, Default)]
pub struct SetApprovals {
    started: bool,
    queued: VecDeque<Attempt>,
    in_flight: Vec<InFlight>,
    retry_at: Option<Instant>,
}

impl SetApprovals {
    fn give_up(&mut self, ctx: &mut StateContext, reason: String) -> Option<Event> {
        let ids: Vec<RequestId> = self.in_flight.iter().map(|f| f.id).collect();
        ctx.forget(&ids);
        let unfinished = self
            .in_flight
            .drain(..)
            .map(|f| f.attempt)
            .chain(self.queued.drain(..))
            .map(|a| a.approval);
        ctx.agent.approvals_queue.extend(unfinished);
        ctx.agent.last_error = Some(reason);
        Some(Event::Timeout)
    }
}

impl State for SetApprovals {
    fn setup(&mut self) {
        *self = Self::default();
    }

    async fn tick(&mut self, ctx: &mut StateContext) -> Result<Option<Event>> {
        if !self.started {
            self.started = true;
            self.queued = ctx
                .agent
                .approvals_queue
                .drain(..)
                .map(|approval| Attempt {
                    approval,
                    failures: 0,
                })
                .collect();
        }

        let due = self.retry_at.is_none_or(|at| Instant::now() >= at);
        if due {
            self.retry_at = None;
            while let Some(attempt) = self.queued.pop_front() {
                let id = ctx.submit(Operation::SetApproval {
                    approval: attempt.approval.clone(),
                })?;
                self.in_flight.push(InFlight {
                    id,
                    attempt,
                    deadline: Instant::now() + ctx.config.timeout,
                });
            }
        }

        if self.in_flight.is_empty() && self.queued.is_empty() {
            return Ok(Some(Event::Done));
        }

        let next_wake = self.in_flight.iter().map(|f| f.deadline).chain(self.retry_at).min();
        if let Some(wake) = next_wake {
            let wait = wake
                .saturating_duration_since(Instant::now())
                .min(ctx.config.tick_interval);
            ctx.pump(wait).await;
        }

        let now = Instant::now();
        let mut exhausted = None;
        for flight in std::mem::take(&mut self.in_flight) {
            let failure = match ctx.take(&flight.id) {
                Some(envelope) => match envelope.payload.kind {
                    ResponseKind::ApprovalSet { approval, tx_hash } => {
                        info!(
                            "[LOOP] Approved {} {} for {} on {} ({})",
                            approval.amount, approval.token, approval.spender, approval.venue, tx_hash
                        );
                        None
                    }
                    ResponseKind::Error { code, message, .. } => Some(format!("{}: {}", code, message)),
                    other => Some(format!("unexpected {:?} response", other.tag())),
                },
                None if now >= flight.deadline => {
                    ctx.forget([&flight.id]);
                    Some("Request timeout".to_string())
                }
                None => {
                    self.in_flight.push(flight);
                    continue;
                }
            };

            let Some(reason) = failure else {
                continue;
            };
            let mut attempt = flight.attempt;
            attempt.failures += 1;
            warn!(
                "[LOOP] Approval of {} on {} failed ({}/{}): {}",
                attempt.approval.token,
                attempt.approval.venue,
                attempt.failures,
                ctx.config.max_retries,
                reason
            );
            if attempt.failures >= ctx.config.max_retries {
                exhausted.get_or_insert(reason);
            }
            self.queued.push_back(attempt);
            self.retry_at = Some(now + ctx.config.poll_interval);
        }

        if let Some(reason) = exhausted {
            return Ok(self.give_up(ctx, format!("Approval failed: {}", reason)));
        }
        if self.in_flight.is_empty() && self.queued.is_empty() {
            return Ok(Some(Event::Done));
        }
        Ok(None)
    }
}
