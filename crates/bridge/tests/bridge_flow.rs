//! Integration test: tracker driving a paper bridge through the gateway

use meridian_bridge::{BridgeRequestTracker, StatusUpdate, TransferState};
use meridian_core::{BridgeParams, BridgeStatusCode, OperationTag};
use meridian_gateway::{
    AdapterRegistry, Addresses, DispatchTable, GatewayConfig, GatewayTaskManager, PaperBridge,
};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn params() -> BridgeParams {
    BridgeParams {
        source_chain: "ethereum".into(),
        target_chain: "base".into(),
        token: "USDC".into(),
        amount: dec!(1000),
        receiver: None,
    }
}

async fn next_update(gateway: &GatewayTaskManager, tracker: &mut BridgeRequestTracker) -> StatusUpdate {
    let response = gateway.receive().await.unwrap();
    assert!(tracker.handles(&response));
    tracker.on_response(&response, Instant::now()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_transfer_tracked_to_completion() {
    let _ = env_logger::try_init();

    let registry = AdapterRegistry::new().with_bridge(Arc::new(PaperBridge::new()));
    let gateway = GatewayTaskManager::new(GatewayConfig::default(), registry).unwrap();
    let interval = Duration::from_secs(5);
    let mut tracker = BridgeRequestTracker::new(Addresses::agent("arb"), interval);

    let id = tracker.request(params(), &gateway).unwrap();
    assert_eq!(next_update(&gateway, &mut tracker).await, StatusUpdate::Updated);
    assert_eq!(tracker.record(id).map(|r| r.state), Some(TransferState::Pending));

    // Fresh status: nothing due yet
    assert_eq!(tracker.poll(&gateway, Instant::now()).unwrap(), 0);

    tokio::time::advance(interval).await;
    assert_eq!(tracker.poll(&gateway, Instant::now()).unwrap(), 1);
    // Check in flight: not sent twice
    assert_eq!(tracker.poll(&gateway, Instant::now()).unwrap(), 0);

    assert_eq!(next_update(&gateway, &mut tracker).await, StatusUpdate::Updated);
    assert_eq!(
        tracker
            .record(id)
            .and_then(|r| r.last_status.as_ref())
            .map(|s| s.code),
        Some(BridgeStatusCode::AwaitingTargetFinality)
    );

    tokio::time::advance(interval).await;
    assert_eq!(tracker.poll(&gateway, Instant::now()).unwrap(), 1);
    match next_update(&gateway, &mut tracker).await {
        StatusUpdate::Completed(record) => {
            assert_eq!(record.id, id);
            assert!(record.last_status.is_some_and(|s| s.target_tx_hash.is_some()));
        }
        other => panic!("expected completion, got {:?}", other),
    }
    assert!(tracker.is_idle());
}

#[tokio::test(start_paused = true)]
async fn test_failed_transfer_reported() {
    let registry = AdapterRegistry::new().with_bridge(Arc::new(PaperBridge::new().with_failure()));
    let gateway = GatewayTaskManager::new(GatewayConfig::default(), registry).unwrap();
    let mut tracker = BridgeRequestTracker::new(Addresses::agent("arb"), Duration::ZERO);

    tracker.request(params(), &gateway).unwrap();
    next_update(&gateway, &mut tracker).await;

    let mut outcome = StatusUpdate::Ignored;
    for _ in 0..3 {
        tracker.poll(&gateway, Instant::now()).unwrap();
        outcome = next_update(&gateway, &mut tracker).await;
        if matches!(outcome, StatusUpdate::Failed(_)) {
            break;
        }
    }
    match outcome {
        StatusUpdate::Failed(record) => {
            assert_eq!(record.state, TransferState::Failed);
            assert_eq!(record.last_status.map(|s| s.code), Some(BridgeStatusCode::Failed));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(tracker.outstanding(), 0);
}

#[tokio::test]
async fn test_error_on_initial_request_fails_transfer() {
    let gateway = GatewayTaskManager::new(GatewayConfig::default(), AdapterRegistry::new()).unwrap();
    let mut tracker = BridgeRequestTracker::new(Addresses::agent("arb"), Duration::from_secs(1));

    let id = tracker.request(params(), &gateway).unwrap();
    match next_update(&gateway, &mut tracker).await {
        StatusUpdate::Failed(record) => {
            assert_eq!(record.id, id);
            let status = record.last_status.unwrap();
            assert_eq!(status.code, BridgeStatusCode::Error);
            assert!(status.message.unwrap().starts_with("UNSUPPORTED_PROTOCOL"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

fn gateway_without(tag: OperationTag) -> GatewayTaskManager {
    let registry = AdapterRegistry::new().with_bridge(Arc::new(PaperBridge::new()));
    let mut dispatch = DispatchTable::standard();
    dispatch.remove(tag);
    GatewayTaskManager::with_dispatch(GatewayConfig::default(), registry, dispatch).unwrap()
}

#[tokio::test]
async fn test_refused_request_fails_through_error_envelope() {
    let gateway = gateway_without(OperationTag::RequestBridge);
    let mut tracker = BridgeRequestTracker::new(Addresses::agent("arb"), Duration::from_secs(1));

    let id = tracker.request(params(), &gateway).unwrap();
    assert_eq!(tracker.outstanding(), 1);

    match next_update(&gateway, &mut tracker).await {
        StatusUpdate::Failed(record) => {
            assert_eq!(record.id, id);
            assert_eq!(record.last_status.map(|s| s.code), Some(BridgeStatusCode::Error));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(tracker.is_idle());
}

#[tokio::test(start_paused = true)]
async fn test_refused_status_check_is_retried() {
    let gateway = gateway_without(OperationTag::GetBridgeStatus);
    let interval = Duration::from_secs(1);
    let mut tracker = BridgeRequestTracker::new(Addresses::agent("arb"), interval);

    let id = tracker.request(params(), &gateway).unwrap();
    assert_eq!(next_update(&gateway, &mut tracker).await, StatusUpdate::Updated);

    tokio::time::advance(interval).await;
    assert_eq!(tracker.poll(&gateway, Instant::now()).unwrap(), 1);
    assert!(matches!(
        next_update(&gateway, &mut tracker).await,
        StatusUpdate::CheckFailed(_)
    ));
    assert_eq!(tracker.record(id).map(|r| r.state), Some(TransferState::Pending));

    tokio::time::advance(interval).await;
    assert_eq!(tracker.poll(&gateway, Instant::now()).unwrap(), 1);
}

#[tokio::test]
async fn test_request_after_shutdown_is_an_error() {
    let gateway = gateway_without(OperationTag::RequestBridge);
    gateway.shutdown().await;
    let mut tracker = BridgeRequestTracker::new(Addresses::agent("arb"), Duration::from_secs(1));

    assert!(tracker.request(params(), &gateway).is_err());
    assert!(tracker.is_idle());
}
