use super::State;
use crate::context::StateContext;
use crate::error::Result;
use crate::transitions::Event;
use log::{debug, info};
use meridian_strategy::StrategyContext;
use tokio::time::Instant;

/// Asks the strategy what to trade
#[derive(Debug, Default)]
pub struct IdentifyOpportunity;

impl State for IdentifyOpportunity {
    fn setup(&mut self) {}

    async fn tick(&mut self, ctx: &mut StateContext) -> Result<Option<Event>> {
        if ctx.agent.prices_stale(Instant::now(), ctx.config.max_price_age) {
            debug!("[LOOP] Prices older than {:?}", ctx.config.max_price_age);
            return Ok(Some(Event::PricesStale));
        }

        let strategy_ctx = StrategyContext {
            portfolio: &ctx.agent.portfolio,
            prices: &ctx.agent.prices,
            open_orders: &ctx.agent.open_orders,
        };
        let outcome = ctx.strategy.get_orders(&strategy_ctx);

        ctx.agent.unaffordable_opportunity = outcome.unaffordable_opportunity;
        if !outcome.bridge_requests.is_empty() {
            info!(
                "[LOOP] {} requested {} bridge transfers",
                ctx.strategy.name(),
                outcome.bridge_requests.len()
            );
            ctx.agent.staged_bridge_requests.extend(outcome.bridge_requests);
        }

        if outcome.orders.is_empty() {
            if outcome.unaffordable_opportunity {
                info!("[LOOP] Opportunity found but not affordable");
            }
            return Ok(Some(Event::Done));
        }

        info!("[LOOP] {} proposed {} orders", ctx.strategy.name(), outcome.orders.len());
        ctx.agent.new_orders = outcome.orders.into();
        Ok(Some(Event::OpportunityFound))
    }
}
