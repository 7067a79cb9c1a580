use super::State;
use crate::context::StateContext;
use crate::error::Result;
use crate::transitions::Event;
use log::info;
use meridian_core::Notification;

/// Books the orders placed this cycle as a trade
#[derive(Debug, Default)]
pub struct PostTrade;

impl State for PostTrade {
    fn setup(&mut self) {}

    async fn tick(&mut self, ctx: &mut StateContext) -> Result<Option<Event>> {
        let orders: Vec<_> = ctx.agent.submitted_orders.drain(..).collect();
        ctx.agent.record_trade(orders.iter().cloned());
        ctx.agent.new_orders.clear();
        ctx.agent.current_period += 1;

        let period = ctx.agent.current_period;
        info!("[LOOP] Period {} traded {} orders", period, orders.len());
        ctx.notify(Notification::TradeExecuted { period, orders }).await;
        Ok(Some(Event::Done))
    }
}
