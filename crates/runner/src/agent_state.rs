//! Agent State
//!
//! Everything the control loop knows about its venues, orders and bridge
//! work. The loop is the only writer; observers read serialized snapshots
//! published on a watch channel.

use crate::transitions::StateName;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use meridian_core::{ApprovalRequest, Balance, BridgeParams, Order, Ticker, Venue};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use tokio::sync::watch;
use tokio::time::Instant;

/// Most failed orders and traded orders kept in memory; older ones are dropped
pub const ORDER_HISTORY_LIMIT: usize = 500;

#[derive(Debug)]
pub struct AgentState {
    /// Balances per venue from the last collection
    pub portfolio: BTreeMap<Venue, Vec<Balance>>,
    /// Tickers per venue from the last collection
    pub prices: BTreeMap<Venue, Vec<Ticker>>,
    /// When `prices` was last refreshed
    pub prices_updated: Option<Instant>,
    /// Orders resting on each venue
    pub open_orders: BTreeMap<Venue, Vec<Order>>,
    /// Orders decided this cycle, not yet submitted
    pub new_orders: VecDeque<Order>,
    /// Orders accepted by a venue this cycle
    pub submitted_orders: Vec<Order>,
    /// Most recent failed orders, oldest first
    pub failed_orders: Vec<Order>,
    /// Orders of the most recent trades, oldest first
    pub trades: Vec<Order>,
    pub unaffordable_opportunity: bool,
    pub current_state: StateName,
    pub current_period: u64,
    pub last_error: Option<String>,
    pub approvals_queue: VecDeque<ApprovalRequest>,
    /// Bridge transfers decided by the strategy, moved to the tracker in Setup
    pub staged_bridge_requests: Vec<BridgeParams>,
}

impl AgentState {
    pub fn new(approvals: Vec<ApprovalRequest>) -> Self {
        Self {
            portfolio: BTreeMap::new(),
            prices: BTreeMap::new(),
            prices_updated: None,
            open_orders: BTreeMap::new(),
            new_orders: VecDeque::new(),
            submitted_orders: Vec::new(),
            failed_orders: Vec::new(),
            trades: Vec::new(),
            unaffordable_opportunity: false,
            current_state: StateName::Setup,
            current_period: 0,
            last_error: None,
            approvals_queue: approvals.into(),
            staged_bridge_requests: Vec::new(),
        }
    }

    pub fn record_failed(&mut self, order: Order) {
        self.failed_orders.push(order);
        trim_history(&mut self.failed_orders);
    }

    pub fn record_trade(&mut self, orders: impl IntoIterator<Item = Order>) {
        self.trades.extend(orders);
        trim_history(&mut self.trades);
    }

    pub fn total_open_orders(&self) -> usize {
        self.open_orders.values().map(Vec::len).sum()
    }

    /// True if prices were never collected or are older than `max_age`
    pub fn prices_stale(&self, now: Instant, max_age: std::time::Duration) -> bool {
        self.prices_updated
            .is_none_or(|updated| now.saturating_duration_since(updated) > max_age)
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        fn by_key<T: Clone>(map: &BTreeMap<Venue, Vec<T>>) -> BTreeMap<String, Vec<T>> {
            map.iter()
                .map(|(venue, items)| (venue.key(), items.clone()))
                .collect()
        }
        AgentSnapshot {
            portfolio: by_key(&self.portfolio),
            prices: by_key(&self.prices),
            open_orders: by_key(&self.open_orders),
            new_orders: self.new_orders.iter().cloned().collect(),
            submitted_orders: self.submitted_orders.clone(),
            failed_orders: self.failed_orders.clone(),
            unaffordable_opportunity: self.unaffordable_opportunity,
            total_open_orders: self.total_open_orders(),
            current_state: self.current_state,
            current_period: self.current_period,
            last_error: self.last_error.clone(),
            timestamp: Utc::now(),
        }
    }
}

fn trim_history(orders: &mut Vec<Order>) {
    if orders.len() > ORDER_HISTORY_LIMIT {
        let excess = orders.len() - ORDER_HISTORY_LIMIT;
        orders.drain(..excess);
    }
}

/// Serializable view of [`AgentState`]; venue maps are keyed by `exchange@ledger`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub portfolio: BTreeMap<String, Vec<Balance>>,
    pub prices: BTreeMap<String, Vec<Ticker>>,
    pub open_orders: BTreeMap<String, Vec<Order>>,
    pub new_orders: Vec<Order>,
    pub submitted_orders: Vec<Order>,
    pub failed_orders: Vec<Order>,
    pub unaffordable_opportunity: bool,
    pub total_open_orders: usize,
    pub current_state: StateName,
    pub current_period: u64,
    pub last_error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Publishes snapshots to watchers and, optionally, to a JSON file
pub struct SnapshotPublisher {
    tx: watch::Sender<Option<AgentSnapshot>>,
    path: Option<PathBuf>,
}

impl SnapshotPublisher {
    pub fn new(path: Option<PathBuf>) -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx, path }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<AgentSnapshot>> {
        self.tx.subscribe()
    }

    /// Failures to write the file are logged; the loop keeps running
    pub fn publish(&self, snapshot: AgentSnapshot) {
        if let Some(path) = &self.path {
            match serde_json::to_string_pretty(&snapshot) {
                Ok(json) => {
                    if let Err(e) = std::fs::write(path, json) {
                        warn!("[LOOP] Failed to write snapshot to {}: {}", path.display(), e);
                    }
                }
                Err(e) => warn!("[LOOP] Failed to serialize snapshot: {}", e),
            }
        }
        debug!(
            "[LOOP] Snapshot: state={} period={}",
            snapshot.current_state, snapshot.current_period
        );
        self.tx.send_replace(Some(snapshot));
    }
}
