//! States that pause the loop: NoOpportunity and CoolDown

use super::State;
use crate::context::StateContext;
use crate::error::Result;
use crate::transitions::Event;
use log::{info, warn};
use tokio::time::Instant;

/// Nothing to trade this period; wait `cycle_interval`
#[derive(Debug, Default)]
pub struct NoOpportunity {
    until: Option<Instant>,
}

impl State for NoOpportunity {
    fn setup(&mut self) {
        self.until = None;
    }

    async fn tick(&mut self, ctx: &mut StateContext) -> Result<Option<Event>> {
        let until = match self.until {
            Some(until) => until,
            None => {
                ctx.agent.current_period += 1;
                let until = Instant::now() + ctx.config.cycle_interval;
                self.until = Some(until);
                until
            }
        };
        if ctx.idle_until(until).await {
            return Ok(Some(Event::Done));
        }
        Ok(None)
    }
}

/// Recovery pause; staged strategy overrides are applied on entry
#[derive(Debug, Default)]
pub struct CoolDown {
    until: Option<Instant>,
}

impl State for CoolDown {
    fn setup(&mut self) {
        self.until = None;
    }

    async fn tick(&mut self, ctx: &mut StateContext) -> Result<Option<Event>> {
        let until = match self.until {
            Some(until) => until,
            None => {
                for (name, value) in ctx.inbox.drain() {
                    match ctx.strategy.apply_parameter(&name, value) {
                        Ok(()) => info!("[LOOP] Applied parameter {} to {}", name, ctx.strategy.name()),
                        Err(e) => warn!("[LOOP] Parameter {} refused: {}", name, e),
                    }
                }
                let until = Instant::now() + ctx.config.cooldown_period;
                self.until = Some(until);
                until
            }
        };
        if ctx.idle_until(until).await {
            return Ok(Some(Event::Done));
        }
        Ok(None)
    }
}
