use super::State;
use crate::context::StateContext;
use crate::error::Result;
use crate::transitions::Event;
use log::{debug, info};
use tokio::time::Instant;

/// Hands queued transfers to the tracker and waits for every outstanding
/// transfer to reach a terminal status
#[derive(Debug, Default)]
pub struct CheckBridgeRequest {
    started: bool,
    polls: u32,
}

impl State for CheckBridgeRequest {
    fn setup(&mut self) {
        self.started = false;
        self.polls = 0;
    }

    async fn tick(&mut self, ctx: &mut StateContext) -> Result<Option<Event>> {
        if !self.started {
            self.started = true;
            while let Some(params) = ctx.bridge_queue.pop_front() {
                let id = ctx.tracker.request(params, &ctx.gateway)?;
                info!("[LOOP] Bridge transfer {} requested", id);
            }
        }

        let sent = ctx.tracker.poll(&ctx.gateway, Instant::now())?;
        if sent > 0 {
            debug!("[LOOP] {} bridge status checks sent", sent);
        }
        let tick = ctx.config.tick_interval;
        ctx.pump(tick).await;

        if ctx.tracker.is_idle() {
            return Ok(Some(Event::Done));
        }

        self.polls += 1;
        if self.polls >= ctx.config.max_bridge_polls {
            ctx.agent.last_error = Some(format!(
                "{} bridge transfers still pending after {} polls",
                ctx.tracker.outstanding(),
                self.polls
            ));
            return Ok(Some(Event::Timeout));
        }
        Ok(None)
    }
}
