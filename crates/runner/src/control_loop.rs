//! Control Loop scheduler
//!
//! Ticks the current state until it raises an event, looks the event up in
//! the transition table, re-enters the next state and publishes a snapshot.

use crate::agent_state::{AgentSnapshot, AgentState, SnapshotPublisher};
use crate::config::LoopConfig;
use crate::context::StateContext;
use crate::error::Result;
use crate::inbox::ParameterInbox;
use crate::states::{
    CheckBridgeRequest, Collect, CollectScope, CoolDown, ErrorState, ExecuteOrders,
    IdentifyOpportunity, NoOpportunity, PostTrade, SetApprovals, Setup, State,
};
use crate::transitions::{Event, StateName, transition};
use log::{info, warn};
use meridian_core::Notification;
use meridian_gateway::{Addresses, GatewayTaskManager, Publisher};
use meridian_strategy::Strategy;
use std::sync::Arc;
use tokio::sync::watch;

/// One edge taken by the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: StateName,
    pub event: Event,
    pub to: StateName,
}

struct States {
    setup: Setup,
    set_approvals: SetApprovals,
    check_bridge: CheckBridgeRequest,
    collect_data: Collect,
    collect_ticker: Collect,
    identify: IdentifyOpportunity,
    execute: ExecuteOrders,
    post_trade: PostTrade,
    no_opportunity: NoOpportunity,
    cool_down: CoolDown,
    error: ErrorState,
}

impl States {
    fn new() -> Self {
        Self {
            setup: Setup,
            set_approvals: SetApprovals::default(),
            check_bridge: CheckBridgeRequest::default(),
            collect_data: Collect::new(CollectScope::Full),
            collect_ticker: Collect::new(CollectScope::Tickers),
            identify: IdentifyOpportunity,
            execute: ExecuteOrders::default(),
            post_trade: PostTrade,
            no_opportunity: NoOpportunity::default(),
            cool_down: CoolDown::default(),
            error: ErrorState,
        }
    }

    fn enter(&mut self, name: StateName) {
        match name {
            StateName::Setup => self.setup.setup(),
            StateName::SetApprovals => self.set_approvals.setup(),
            StateName::CheckBridgeRequest => self.check_bridge.setup(),
            StateName::CollectData => self.collect_data.setup(),
            StateName::CollectTicker => self.collect_ticker.setup(),
            StateName::IdentifyOpportunity => self.identify.setup(),
            StateName::ExecuteOrders => self.execute.setup(),
            StateName::PostTrade => self.post_trade.setup(),
            StateName::NoOpportunity => self.no_opportunity.setup(),
            StateName::CoolDown => self.cool_down.setup(),
            StateName::Error => self.error.setup(),
        }
    }

    async fn tick(&mut self, name: StateName, ctx: &mut StateContext) -> Result<Option<Event>> {
        match name {
            StateName::Setup => self.setup.tick(ctx).await,
            StateName::SetApprovals => self.set_approvals.tick(ctx).await,
            StateName::CheckBridgeRequest => self.check_bridge.tick(ctx).await,
            StateName::CollectData => self.collect_data.tick(ctx).await,
            StateName::CollectTicker => self.collect_ticker.tick(ctx).await,
            StateName::IdentifyOpportunity => self.identify.tick(ctx).await,
            StateName::ExecuteOrders => self.execute.tick(ctx).await,
            StateName::PostTrade => self.post_trade.tick(ctx).await,
            StateName::NoOpportunity => self.no_opportunity.tick(ctx).await,
            StateName::CoolDown => self.cool_down.tick(ctx).await,
            StateName::Error => self.error.tick(ctx).await,
        }
    }
}

pub struct ControlLoop {
    current: StateName,
    states: States,
    ctx: StateContext,
    snapshots: SnapshotPublisher,
}

impl ControlLoop {
    /// Build a loop starting in Setup; replies are addressed to `agent/{config.name}`
    pub fn new(
        config: LoopConfig,
        gateway: Arc<GatewayTaskManager>,
        strategy: Box<dyn Strategy>,
        notifier: Box<dyn Publisher<Notification>>,
    ) -> Self {
        let address = Addresses::agent(&config.name);
        let snapshots = SnapshotPublisher::new(config.snapshot_path.clone());
        info!(
            "[LOOP] {} trading {} venues with {}",
            address,
            config.venues.len(),
            strategy.name()
        );
        let mut states = States::new();
        states.enter(StateName::Setup);
        Self {
            current: StateName::Setup,
            states,
            ctx: StateContext::new(config, gateway, strategy, notifier, address),
            snapshots,
        }
    }

    /// Tick the current state once. Returns the transition taken, if any.
    pub async fn step(&mut self) -> Result<Option<Transition>> {
        let from = self.current;
        let Some(event) = self.states.tick(from, &mut self.ctx).await? else {
            return Ok(None);
        };
        let to = transition(from, event)?;
        info!("[LOOP] {} --{}--> {}", from, event, to);

        self.ctx.previous = from;
        self.current = to;
        self.ctx.agent.current_state = to;
        self.states.enter(to);
        self.snapshots.publish(self.ctx.agent.snapshot());

        Ok(Some(Transition { from, event, to }))
    }

    /// Step until `target` is entered. Gives up after `max_steps` ticks and
    /// returns the transitions taken so far.
    pub async fn run_until(&mut self, target: StateName, max_steps: usize) -> Result<Vec<Transition>> {
        let mut taken = Vec::new();
        for _ in 0..max_steps {
            if let Some(t) = self.step().await? {
                taken.push(t);
                if t.to == target {
                    break;
                }
            }
        }
        Ok(taken)
    }

    /// Run until `shutdown` turns true or a state fails fatally
    pub async fn run(&mut self, shutdown: watch::Receiver<bool>) -> Result<()> {
        while !*shutdown.borrow() {
            if let Err(e) = self.step().await {
                warn!("[LOOP] Stopping in {}: {}", self.current, e);
                return Err(e);
            }
        }
        info!("[LOOP] Shutdown requested in {}", self.current);
        Ok(())
    }

    pub fn current_state(&self) -> StateName {
        self.current
    }

    pub fn agent(&self) -> &AgentState {
        &self.ctx.agent
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        self.ctx.agent.snapshot()
    }

    /// Watch the snapshot published after every transition
    pub fn snapshots(&self) -> watch::Receiver<Option<AgentSnapshot>> {
        self.snapshots.subscribe()
    }

    /// Handle for staging strategy parameter overrides from other tasks
    pub fn parameter_inbox(&self) -> ParameterInbox {
        self.ctx.inbox.clone()
    }

    pub fn late_responses(&self) -> u64 {
        self.ctx.late_responses()
    }

    pub fn outstanding_bridge_requests(&self) -> usize {
        self.ctx.tracker.outstanding()
    }
}
