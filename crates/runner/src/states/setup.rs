use super::State;
use crate::context::StateContext;
use crate::error::Result;
use crate::transitions::Event;
use log::debug;

/// Start of a cycle: clears per-cycle data and decides what needs doing first
#[derive(Debug, Default)]
pub struct Setup;

impl State for Setup {
    fn setup(&mut self) {}

    async fn tick(&mut self, ctx: &mut StateContext) -> Result<Option<Event>> {
        ctx.agent.new_orders.clear();
        ctx.agent.submitted_orders.clear();

        let staged: Vec<_> = ctx.agent.staged_bridge_requests.drain(..).collect();
        if !staged.is_empty() {
            debug!("[LOOP] Queuing {} bridge requests", staged.len());
            ctx.bridge_queue.extend(staged);
        }

        if !ctx.agent.approvals_queue.is_empty() {
            return Ok(Some(Event::ApprovalsPending));
        }
        if !ctx.bridge_queue.is_empty() || !ctx.tracker.is_idle() {
            return Ok(Some(Event::BridgePending));
        }
        Ok(Some(Event::Done))
    }
}
