//! Integration tests: the control loop against paper venues
//!
//! Every test runs with a paused clock, so waits and timeouts elapse as soon
//! as the runtime is idle.

use meridian_core::{
    ApprovalRequest, BridgeParams, BridgeStatusCode, Notification, OperationTag, Order, OrderSide,
    Venue,
};
use meridian_gateway::{
    AdapterRegistry, Addresses, ChannelPublisher, ChannelSubscriber, DispatchTable, GatewayConfig,
    GatewayTaskManager, PaperBridge, PaperCall, PaperExchange, Subscriber,
};
use meridian_ports::AdapterError;
use meridian_runner::{
    AgentSnapshot, ControlLoop, Event, LoopConfig, LoopError, StateName, Transition,
};
use meridian_strategy::{
    CrossVenueArbitrage, CrossVenueConfig, ParamKind, ParamValue, ParameterSpec,
    Result as StrategyResult, Strategy, StrategyContext, StrategyOutcome,
};
use rust_decimal_macros::dec;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Returns prepared outcomes in order, then nothing
struct Scripted {
    outcomes: VecDeque<StrategyOutcome>,
    applied: Arc<Mutex<Vec<(String, ParamValue)>>>,
}

impl Scripted {
    fn new(outcomes: Vec<StrategyOutcome>) -> Self {
        Self {
            outcomes: outcomes.into(),
            applied: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Strategy for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::new("threshold", ParamKind::Decimal)]
    }

    fn apply_parameter(&mut self, name: &str, value: ParamValue) -> StrategyResult<()> {
        self.applied.lock().unwrap().push((name.to_string(), value));
        Ok(())
    }

    fn get_orders(&mut self, _ctx: &StrategyContext<'_>) -> StrategyOutcome {
        self.outcomes.pop_front().unwrap_or_default()
    }
}

struct Harness {
    control: ControlLoop,
    notifications: ChannelSubscriber<Notification>,
}

impl Harness {
    fn notifications(&mut self) -> Vec<Notification> {
        let mut received = Vec::new();
        while let Ok(Some(notification)) = self.notifications.try_next() {
            received.push(notification);
        }
        received
    }
}

fn venue(id: &str) -> Venue {
    Venue::new(id, "cex")
}

fn paper(id: &str, bid: rust_decimal::Decimal, ask: rust_decimal::Decimal) -> PaperExchange {
    PaperExchange::new(id)
        .with_balance("ETH", dec!(5))
        .with_balance("USDC", dec!(20000))
        .with_ticker("ETH/USDC", bid, ask)
}

fn config(venues: Vec<Venue>) -> LoopConfig {
    LoopConfig::default()
        .with_name("test")
        .with_venues(venues)
        .with_timeout(Duration::from_secs(1))
        .with_cycle_interval(Duration::from_secs(1))
        .with_cooldown_period(Duration::from_secs(2))
        .with_bridge_status_check_interval(Duration::from_secs(1))
}

fn registry(exchanges: &[Arc<PaperExchange>], bridge: Option<PaperBridge>) -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    if let Some(bridge) = bridge {
        registry = registry.with_bridge(Arc::new(bridge));
    }
    for exchange in exchanges {
        registry.register(exchange.clone()).unwrap();
    }
    registry
}

fn harness(
    exchanges: &[Arc<PaperExchange>],
    bridge: Option<PaperBridge>,
    config: LoopConfig,
    strategy: Box<dyn Strategy>,
) -> Harness {
    let registry = registry(exchanges, bridge);
    let gateway = GatewayTaskManager::new(GatewayConfig::default(), registry).unwrap();
    harness_on(gateway, config, strategy)
}

fn harness_on(gateway: GatewayTaskManager, config: LoopConfig, strategy: Box<dyn Strategy>) -> Harness {
    let _ = env_logger::try_init();

    let gateway = Arc::new(gateway);
    let (notifier, notifications) =
        ChannelPublisher::<Notification>::pair(Addresses::notifications("test"), 64);

    Harness {
        control: ControlLoop::new(config, gateway, strategy, Box::new(notifier)),
        notifications,
    }
}

fn edge(t: &Transition) -> (StateName, Event, StateName) {
    (t.from, t.event, t.to)
}

fn arbitrage(buy: &str, sell: &str) -> Vec<Order> {
    vec![
        Order::limit(venue(buy), "ETH/USDC", OrderSide::Buy, dec!(1), dec!(2000)),
        Order::limit(venue(sell), "ETH/USDC", OrderSide::Sell, dec!(1), dec!(2010)),
    ]
}

#[tokio::test(start_paused = true)]
async fn test_no_opportunity_records_unaffordable_flag() {
    let a = Arc::new(paper("a", dec!(1999), dec!(2000)));
    let b = Arc::new(paper("b", dec!(2004), dec!(2005)));
    let strategy = Scripted::new(vec![StrategyOutcome {
        orders: Vec::new(),
        unaffordable_opportunity: true,
        bridge_requests: Vec::new(),
    }]);
    let mut h = harness(
        &[a, b],
        None,
        config(vec![venue("a"), venue("b")]),
        Box::new(strategy),
    );

    let taken = h.control.run_until(StateName::NoOpportunity, 100).await.unwrap();
    assert_eq!(
        taken.iter().map(edge).collect::<Vec<_>>(),
        vec![
            (StateName::Setup, Event::Done, StateName::CollectData),
            (StateName::CollectData, Event::Done, StateName::IdentifyOpportunity),
            (StateName::IdentifyOpportunity, Event::Done, StateName::NoOpportunity),
        ]
    );
    assert!(h.control.agent().unaffordable_opportunity);
    assert_eq!(h.control.agent().prices.len(), 2);
    assert_eq!(h.control.agent().portfolio.len(), 2);

    let taken = h.control.run_until(StateName::Setup, 100).await.unwrap();
    assert_eq!(taken.len(), 1);
    assert_eq!(h.control.agent().current_period, 1);
    assert!(h.control.agent().trades.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_entry_failure_abandons_batch() {
    let a = Arc::new(paper("a", dec!(1999), dec!(2000)));
    let b = Arc::new(paper("b", dec!(2010), dec!(2011)));
    a.reject_orders(true).await;

    let orders = arbitrage("a", "b");
    let entry_id = orders[0].id;
    let strategy = Scripted::new(vec![StrategyOutcome {
        orders,
        ..StrategyOutcome::default()
    }]);
    let mut h = harness(
        &[a.clone(), b.clone()],
        None,
        config(vec![venue("a"), venue("b")]),
        Box::new(strategy),
    );

    h.control.run_until(StateName::ExecuteOrders, 100).await.unwrap();
    let taken = h.control.run_until(StateName::Setup, 100).await.unwrap();
    assert_eq!(
        taken.iter().map(edge).last(),
        Some((StateName::ExecuteOrders, Event::EntryExitError, StateName::Setup))
    );

    assert_eq!(a.call_count(PaperCall::CreateOrder).await, 1);
    assert_eq!(b.call_count(PaperCall::CreateOrder).await, 0);

    let agent = h.control.agent();
    assert_eq!(agent.failed_orders.len(), 1);
    assert_eq!(agent.failed_orders[0].id, entry_id);
    assert!(agent.submitted_orders.is_empty());
    assert_eq!(agent.current_period, 0);

    let failed = h
        .notifications()
        .into_iter()
        .find_map(|n| match n {
            Notification::EntryFailed { order, reason } => Some((order.id, reason)),
            _ => None,
        })
        .expect("entry failure notified");
    assert_eq!(failed.0, entry_id);
    assert!(failed.1.contains("Rejected by venue"));
}

#[tokio::test(start_paused = true)]
async fn test_collect_data_gives_up_after_max_retries() {
    let a = Arc::new(paper("a", dec!(1999), dec!(2000)));
    for _ in 0..3 {
        a.fail_next(PaperCall::FetchBalance, AdapterError::Network("reset".into()))
            .await;
    }
    let mut h = harness(
        &[a.clone()],
        None,
        config(vec![venue("a")]),
        Box::new(Scripted::new(Vec::new())),
    );

    let start = Instant::now();
    let taken = h.control.run_until(StateName::CoolDown, 200).await.unwrap();
    assert_eq!(
        taken.iter().map(edge).last(),
        Some((StateName::CollectData, Event::Timeout, StateName::CoolDown))
    );
    assert_eq!(a.call_count(PaperCall::FetchBalance).await, 3);
    assert!(h.control.agent().portfolio.is_empty());
    assert!(h.control.agent().last_error.is_some());

    // Backoff of one timeout after the first failure, two after the second
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(3), "gave up after {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(4), "gave up after {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_collect_waits_for_responses_in_any_order() {
    let a = Arc::new(
        paper("a", dec!(1999), dec!(2000))
            .with_call_latency(PaperCall::FetchBalance, Duration::from_millis(600))
            .with_call_latency(PaperCall::FetchTickers, Duration::from_millis(300)),
    );
    let mut h = harness(
        &[a.clone()],
        None,
        config(vec![venue("a")]),
        Box::new(Scripted::new(Vec::new())),
    );

    let start = Instant::now();
    let taken = h.control.run_until(StateName::IdentifyOpportunity, 200).await.unwrap();
    assert_eq!(
        taken.iter().map(edge).collect::<Vec<_>>(),
        vec![
            (StateName::Setup, Event::Done, StateName::CollectData),
            (StateName::CollectData, Event::Done, StateName::IdentifyOpportunity),
        ]
    );
    assert!(start.elapsed() >= Duration::from_millis(600));

    // Orders answered first and balances last, all in one attempt
    assert_eq!(a.call_count(PaperCall::FetchBalance).await, 1);
    assert_eq!(a.call_count(PaperCall::FetchTickers).await, 1);
    assert_eq!(a.call_count(PaperCall::FetchOpenOrders).await, 1);

    let agent = h.control.agent();
    assert!(!agent.portfolio[&venue("a")].is_empty());
    assert_eq!(agent.prices[&venue("a")].len(), 1);
    assert!(agent.open_orders.contains_key(&venue("a")));
    assert_eq!(h.control.late_responses(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_full_cycle_trades_and_publishes() {
    let cheap = Arc::new(paper("cheap", dec!(1999), dec!(2000)));
    let rich = Arc::new(paper("rich", dec!(2010), dec!(2011)));
    let path = std::env::temp_dir().join(format!("meridian-cycle-{}.json", std::process::id()));

    let mut h = harness(
        &[cheap.clone(), rich.clone()],
        None,
        config(vec![venue("cheap"), venue("rich")]).with_snapshot_path(path.clone()),
        Box::new(CrossVenueArbitrage::new(CrossVenueConfig::default())),
    );
    let snapshots = h.control.snapshots();

    h.control.run_until(StateName::PostTrade, 200).await.unwrap();
    let taken = h.control.run_until(StateName::Setup, 10).await.unwrap();
    assert_eq!(
        taken.iter().map(edge).collect::<Vec<_>>(),
        vec![(StateName::PostTrade, Event::Done, StateName::Setup)]
    );

    let agent = h.control.agent();
    assert_eq!(agent.current_period, 1);
    assert_eq!(agent.trades.len(), 2);
    assert!(agent.failed_orders.is_empty());
    assert_eq!(cheap.balance("ETH").await, dec!(6));
    assert_eq!(rich.balance("ETH").await, dec!(4));

    let traded = h.notifications().into_iter().find_map(|n| match n {
        Notification::TradeExecuted { period, orders } => Some((period, orders.len())),
        _ => None,
    });
    assert_eq!(traded, Some((1, 2)));

    let published = snapshots.borrow().clone().unwrap();
    assert_eq!(published.current_state, StateName::Setup);
    assert_eq!(published.current_period, 1);

    let written: AgentSnapshot =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written.current_state, StateName::Setup);
    assert!(written.portfolio.contains_key("cheap@cex"));
    let _ = std::fs::remove_file(path);
}

#[tokio::test(start_paused = true)]
async fn test_exit_failure_stops_the_loop() {
    let a = Arc::new(paper("a", dec!(1999), dec!(2000)));
    let b = Arc::new(paper("b", dec!(2010), dec!(2011)));
    b.reject_orders(true).await;

    let strategy = Scripted::new(vec![StrategyOutcome {
        orders: arbitrage("a", "b"),
        ..StrategyOutcome::default()
    }]);
    let mut h = harness(
        &[a.clone(), b.clone()],
        None,
        config(vec![venue("a"), venue("b")]),
        Box::new(strategy),
    );

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let err = h.control.run(shutdown_rx).await.unwrap_err();
    assert!(matches!(err, LoopError::UnexpectedState(_)));
    assert_eq!(h.control.current_state(), StateName::ExecuteOrders);

    let agent = h.control.agent();
    assert_eq!(agent.submitted_orders.len(), 1);
    assert_eq!(agent.failed_orders.len(), 1);
    assert_eq!(agent.failed_orders[0].side, OrderSide::Sell);
    assert_eq!(a.call_count(PaperCall::CreateOrder).await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_stale_prices_refresh_tickers_only() {
    let slow = Arc::new(paper("slow", dec!(1999), dec!(2000)).with_latency(Duration::from_secs(2)));
    let fast = Arc::new(paper("fast", dec!(2004), dec!(2005)));
    let config = config(vec![venue("slow"), venue("fast")])
        .with_timeout(Duration::from_secs(5))
        .with_max_price_age(Duration::from_secs(1));
    let mut h = harness(
        &[slow.clone(), fast],
        None,
        config,
        Box::new(Scripted::new(Vec::new())),
    );

    let taken = h.control.run_until(StateName::CollectTicker, 200).await.unwrap();
    assert_eq!(
        taken.iter().map(edge).last(),
        Some((StateName::IdentifyOpportunity, Event::PricesStale, StateName::CollectTicker))
    );

    let taken = h.control.run_until(StateName::IdentifyOpportunity, 200).await.unwrap();
    assert_eq!(
        taken.iter().map(edge).last(),
        Some((StateName::CollectTicker, Event::Done, StateName::IdentifyOpportunity))
    );
    assert_eq!(slow.call_count(PaperCall::FetchBalance).await, 1);
    assert_eq!(slow.call_count(PaperCall::FetchTickers).await, 2);
}

fn bridge_outcome() -> StrategyOutcome {
    StrategyOutcome {
        orders: Vec::new(),
        unaffordable_opportunity: true,
        bridge_requests: vec![BridgeParams {
            source_chain: "base".into(),
            target_chain: "ethereum".into(),
            token: "USDC".into(),
            amount: dec!(2000),
            receiver: None,
        }],
    }
}

#[tokio::test(start_paused = true)]
async fn test_bridge_request_tracked_to_completion() {
    let a = Arc::new(paper("a", dec!(1999), dec!(2000)));
    let mut h = harness(
        &[a],
        Some(PaperBridge::new()),
        config(vec![venue("a")]),
        Box::new(Scripted::new(vec![bridge_outcome()])),
    );

    let taken = h.control.run_until(StateName::CheckBridgeRequest, 200).await.unwrap();
    assert_eq!(
        taken.iter().map(edge).last(),
        Some((StateName::Setup, Event::BridgePending, StateName::CheckBridgeRequest))
    );

    let taken = h.control.run_until(StateName::Setup, 200).await.unwrap();
    assert_eq!(
        taken.iter().map(edge).last(),
        Some((StateName::CheckBridgeRequest, Event::Done, StateName::Setup))
    );
    assert_eq!(h.control.outstanding_bridge_requests(), 0);
    assert!(h.notifications().iter().any(|n| matches!(
        n,
        Notification::BridgeCompleted { params, .. } if params.amount == dec!(2000)
    )));

    let next = h.control.step().await.unwrap().unwrap();
    assert_eq!(edge(&next), (StateName::Setup, Event::Done, StateName::CollectData));
}

#[tokio::test(start_paused = true)]
async fn test_failed_bridge_is_reported() {
    let a = Arc::new(paper("a", dec!(1999), dec!(2000)));
    let mut h = harness(
        &[a],
        Some(PaperBridge::new().with_failure()),
        config(vec![venue("a")]),
        Box::new(Scripted::new(vec![bridge_outcome()])),
    );

    h.control.run_until(StateName::CheckBridgeRequest, 200).await.unwrap();
    let taken = h.control.run_until(StateName::Setup, 200).await.unwrap();
    assert_eq!(
        taken.iter().map(edge).last(),
        Some((StateName::CheckBridgeRequest, Event::Done, StateName::Setup))
    );

    assert!(h.notifications().iter().any(|n| matches!(
        n,
        Notification::BridgeFailed { status, .. } if status.code == BridgeStatusCode::Failed
    )));
    assert!(h.control.agent().last_error.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_refused_bridge_request_fails_transfer() {
    let a = Arc::new(paper("a", dec!(1999), dec!(2000)));
    let mut dispatch = DispatchTable::standard();
    dispatch.remove(OperationTag::RequestBridge);
    let gateway = GatewayTaskManager::with_dispatch(
        GatewayConfig::default(),
        registry(&[a], Some(PaperBridge::new())),
        dispatch,
    )
    .unwrap();
    let mut h = harness_on(
        gateway,
        config(vec![venue("a")]),
        Box::new(Scripted::new(vec![bridge_outcome()])),
    );

    h.control.run_until(StateName::CheckBridgeRequest, 200).await.unwrap();
    let taken = h.control.run_until(StateName::Setup, 200).await.unwrap();
    assert_eq!(
        taken.iter().map(edge).last(),
        Some((StateName::CheckBridgeRequest, Event::Done, StateName::Setup))
    );
    assert_eq!(h.control.outstanding_bridge_requests(), 0);
    assert_eq!(h.control.late_responses(), 0);

    let failed = h
        .notifications()
        .into_iter()
        .find_map(|n| match n {
            Notification::BridgeFailed { status, .. } => Some(status),
            _ => None,
        })
        .expect("refused transfer notified");
    assert_eq!(failed.code, BridgeStatusCode::Error);
    assert!(failed.message.unwrap().starts_with("UNSUPPORTED_PROTOCOL"));
    assert!(h.control.agent().last_error.is_some());

    let next = h.control.step().await.unwrap().unwrap();
    assert_eq!(edge(&next), (StateName::Setup, Event::Done, StateName::CollectData));
}

fn approval() -> ApprovalRequest {
    ApprovalRequest {
        venue: venue("a"),
        token: "USDC".into(),
        spender: "0xrouter".into(),
        amount: dec!(1000000),
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_approval_is_retried() {
    let a = Arc::new(paper("a", dec!(1999), dec!(2000)));
    a.fail_next(PaperCall::Approve, AdapterError::Network("reset".into()))
        .await;
    let mut h = harness(
        &[a.clone()],
        None,
        config(vec![venue("a")]).with_approvals(vec![approval()]),
        Box::new(Scripted::new(Vec::new())),
    );

    let taken = h.control.run_until(StateName::CollectData, 200).await.unwrap();
    assert_eq!(
        taken.iter().map(edge).collect::<Vec<_>>(),
        vec![
            (StateName::Setup, Event::ApprovalsPending, StateName::SetApprovals),
            (StateName::SetApprovals, Event::Done, StateName::Setup),
            (StateName::Setup, Event::Done, StateName::CollectData),
        ]
    );
    assert_eq!(a.call_count(PaperCall::Approve).await, 2);
    assert!(h.control.agent().approvals_queue.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_approval_goes_through_error() {
    let a = Arc::new(paper("a", dec!(1999), dec!(2000)));
    for _ in 0..3 {
        a.fail_next(PaperCall::Approve, AdapterError::Network("reset".into()))
            .await;
    }
    let mut h = harness(
        &[a.clone()],
        None,
        config(vec![venue("a")]).with_approvals(vec![approval()]),
        Box::new(Scripted::new(Vec::new())),
    );

    let taken = h.control.run_until(StateName::CoolDown, 200).await.unwrap();
    assert_eq!(
        taken.iter().map(edge).skip(1).collect::<Vec<_>>(),
        vec![
            (StateName::SetApprovals, Event::Timeout, StateName::Error),
            (StateName::Error, Event::Done, StateName::CoolDown),
        ]
    );
    assert_eq!(a.call_count(PaperCall::Approve).await, 3);
    assert_eq!(h.control.agent().approvals_queue.len(), 1);
    assert!(h.notifications().iter().any(|n| matches!(
        n,
        Notification::Error { state, .. } if state == "SetApprovals"
    )));
}

#[tokio::test(start_paused = true)]
async fn test_late_responses_are_discarded() {
    let slow = Arc::new(paper("slow", dec!(1999), dec!(2000)).with_latency(Duration::from_secs(2)));
    let config = config(vec![venue("slow")])
        .with_max_retries(1)
        .with_cooldown_period(Duration::from_secs(5));
    let mut h = harness(&[slow], None, config, Box::new(Scripted::new(Vec::new())));

    let taken = h.control.run_until(StateName::CoolDown, 200).await.unwrap();
    assert_eq!(
        taken.iter().map(edge).last(),
        Some((StateName::CollectData, Event::Timeout, StateName::CoolDown))
    );
    assert_eq!(h.control.late_responses(), 0);

    h.control.run_until(StateName::CollectData, 200).await.unwrap();
    assert_eq!(h.control.late_responses(), 3);
    assert!(h.control.agent().portfolio.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_parameter_override_applied_in_cool_down() {
    let a = Arc::new(paper("a", dec!(1999), dec!(2000)));
    a.fail_next(PaperCall::FetchTickers, AdapterError::Network("reset".into()))
        .await;
    let strategy = Scripted::new(Vec::new());
    let applied = strategy.applied.clone();
    let mut h = harness(
        &[a],
        None,
        config(vec![venue("a")]).with_max_retries(1),
        Box::new(strategy),
    );

    let overrides = json!({ "threshold": "12.5", "unknown": 1 });
    let staged = h
        .control
        .parameter_inbox()
        .stage_json(overrides.as_object().unwrap());
    assert_eq!(staged, 1);

    h.control.run_until(StateName::CoolDown, 200).await.unwrap();
    assert!(applied.lock().unwrap().is_empty());

    h.control.step().await.unwrap();
    assert_eq!(
        *applied.lock().unwrap(),
        vec![("threshold".to_string(), ParamValue::Decimal(dec!(12.5)))]
    );
    assert!(h.control.parameter_inbox().is_empty());
}
