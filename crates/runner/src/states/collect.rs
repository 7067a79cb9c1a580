//! CollectData and CollectTicker
//!
//! Venues are collected one at a time. Every request of a venue must be
//! answered within `timeout`; a missing or ERROR answer fails the attempt.
//! A failed attempt backs off `timeout * attempts` and restarts from the
//! first venue. After `max_retries` failed attempts the state gives up with
//! TIMEOUT. Nothing is written to the agent state until every venue
//! succeeded.

use super::State;
use crate::context::StateContext;
use crate::error::Result;
use crate::transitions::Event;
use log::{debug, info, warn};
use meridian_core::{
    Balance, Operation, OperationTag, Order, Params, RequestId, ResponseKind, Ticker, Venue,
};
use std::collections::BTreeMap;
use tokio::time::Instant;

/// What a collection state fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectScope {
    /// Balances, tickers and open orders
    Full,
    /// Tickers only
    Tickers,
}

impl CollectScope {
    fn operations(&self, venue: &Venue) -> Vec<Operation> {
        let tickers = Operation::GetAllTickers {
            venue: venue.clone(),
            params: Params::new(),
        };
        match self {
            CollectScope::Tickers => vec![tickers],
            CollectScope::Full => vec![
                Operation::GetAllBalances {
                    venue: venue.clone(),
                    params: Params::new(),
                },
                tickers,
                Operation::GetOrders {
                    venue: venue.clone(),
                    symbol: None,
                },
            ],
        }
    }
}

#[derive(Debug, Default)]
struct Collected {
    portfolio: BTreeMap<Venue, Vec<Balance>>,
    prices: BTreeMap<Venue, Vec<Ticker>>,
    open_orders: BTreeMap<Venue, Vec<Order>>,
}

#[derive(Debug)]
pub struct Collect {
    scope: CollectScope,
    venue_index: usize,
    attempts: u32,
    in_flight: Vec<(RequestId, OperationTag)>,
    deadline: Option<Instant>,
    backoff_until: Option<Instant>,
    /// Start of the current attempt; the collected prices are this old
    attempt_started: Option<Instant>,
    collected: Collected,
}

impl Collect {
    pub fn new(scope: CollectScope) -> Self {
        Self {
            scope,
            venue_index: 0,
            attempts: 0,
            in_flight: Vec::new(),
            deadline: None,
            backoff_until: None,
            attempt_started: None,
            collected: Collected::default(),
        }
    }

    fn start_venue(&mut self, ctx: &mut StateContext, venue: &Venue) -> Result<()> {
        debug!("[LOOP] Collecting {:?} from {}", self.scope, venue);
        for operation in self.scope.operations(venue) {
            let tag = operation.tag();
            let id = ctx.submit(operation)?;
            self.in_flight.push((id, tag));
        }
        let now = Instant::now();
        self.attempt_started.get_or_insert(now);
        self.deadline = Some(now + ctx.config.timeout);
        Ok(())
    }

    /// Store an answer. `Err` carries the failure reason.
    fn accept(&mut self, venue: &Venue, kind: ResponseKind) -> std::result::Result<(), String> {
        match kind {
            ResponseKind::AllBalances { balances, .. } => {
                self.collected.portfolio.insert(venue.clone(), balances);
            }
            ResponseKind::AllTickers { tickers, .. } => {
                self.collected.prices.insert(venue.clone(), tickers);
            }
            ResponseKind::Orders { orders, .. } => {
                self.collected.open_orders.insert(venue.clone(), orders);
            }
            ResponseKind::Error { code, message, .. } => {
                return Err(format!("{}: {}", code, message));
            }
            other => return Err(format!("unexpected {:?} response", other.tag())),
        }
        Ok(())
    }

    fn fail(&mut self, ctx: &mut StateContext, venue: &Venue, reason: String) -> Option<Event> {
        let ids: Vec<RequestId> = self.in_flight.drain(..).map(|(id, _)| id).collect();
        ctx.forget(&ids);
        self.deadline = None;
        self.venue_index = 0;
        self.attempt_started = None;
        self.collected = Collected::default();
        self.attempts += 1;

        warn!(
            "[LOOP] Collection from {} failed (attempt {}/{}): {}",
            venue, self.attempts, ctx.config.max_retries, reason
        );
        if self.attempts >= ctx.config.max_retries {
            ctx.agent.last_error = Some(format!("Collection from {} failed: {}", venue, reason));
            return Some(Event::Timeout);
        }
        self.backoff_until = Some(Instant::now() + ctx.config.timeout * self.attempts);
        None
    }

    fn commit(&mut self, ctx: &mut StateContext) {
        let collected = std::mem::take(&mut self.collected);
        if self.scope == CollectScope::Full {
            ctx.agent.portfolio = collected.portfolio;
            ctx.agent.open_orders = collected.open_orders;
        }
        ctx.agent.prices = collected.prices;
        ctx.agent.prices_updated = Some(self.attempt_started.take().unwrap_or_else(Instant::now));
        info!(
            "[LOOP] Collected {:?} from {} venues",
            self.scope,
            ctx.config.venues.len()
        );
    }
}

impl State for Collect {
    fn setup(&mut self) {
        let scope = self.scope;
        *self = Self::new(scope);
    }

    async fn tick(&mut self, ctx: &mut StateContext) -> Result<Option<Event>> {
        if let Some(until) = self.backoff_until {
            if !ctx.idle_until(until).await {
                return Ok(None);
            }
            self.backoff_until = None;
        }

        let Some(venue) = ctx.config.venues.get(self.venue_index).cloned() else {
            self.commit(ctx);
            return Ok(Some(Event::Done));
        };

        if self.in_flight.is_empty() {
            self.start_venue(ctx, &venue)?;
        }
        let Some(deadline) = self.deadline else {
            return Ok(None);
        };

        let wait = deadline
            .saturating_duration_since(Instant::now())
            .min(ctx.config.tick_interval);
        ctx.pump(wait).await;

        let mut failure = None;
        let mut waiting = Vec::new();
        for (id, tag) in std::mem::take(&mut self.in_flight) {
            match ctx.take(&id) {
                Some(envelope) => {
                    if let Err(reason) = self.accept(&venue, envelope.payload.kind) {
                        failure.get_or_insert(format!("{}: {}", tag, reason));
                    }
                }
                None => waiting.push((id, tag)),
            }
        }
        self.in_flight = waiting;

        if let Some(reason) = failure {
            return Ok(self.fail(ctx, &venue, reason));
        }
        if self.in_flight.is_empty() {
            self.venue_index += 1;
            self.deadline = None;
            return Ok(None);
        }
        if Instant::now() >= deadline {
            let missing: Vec<String> = self.in_flight.iter().map(|(_, tag)| tag.to_string()).collect();
            return Ok(self.fail(ctx, &venue, format!("no response to {}", missing.join(", "))));
        }
        Ok(None)
    }
}
