//! State names, events and the transition table

use crate::error::{LoopError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateName {
    Setup,
    SetApprovals,
    CheckBridgeRequest,
    CollectData,
    CollectTicker,
    IdentifyOpportunity,
    ExecuteOrders,
    PostTrade,
    NoOpportunity,
    CoolDown,
    Error,
}

impl StateName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateName::Setup => "Setup",
            StateName::SetApprovals => "SetApprovals",
            StateName::CheckBridgeRequest => "CheckBridgeRequest",
            StateName::CollectData => "CollectData",
            StateName::CollectTicker => "CollectTicker",
            StateName::IdentifyOpportunity => "IdentifyOpportunity",
            StateName::ExecuteOrders => "ExecuteOrders",
            StateName::PostTrade => "PostTrade",
            StateName::NoOpportunity => "NoOpportunity",
            StateName::CoolDown => "CoolDown",
            StateName::Error => "Error",
        }
    }
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome a state reports when it finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    Done,
    Timeout,
    ApprovalsPending,
    BridgePending,
    OpportunityFound,
    PricesStale,
    EntryExitError,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Event::Done => "DONE",
            Event::Timeout => "TIMEOUT",
            Event::ApprovalsPending => "APPROVALS_PENDING",
            Event::BridgePending => "BRIDGE_PENDING",
            Event::OpportunityFound => "OPPORTUNITY_FOUND",
            Event::PricesStale => "PRICES_STALE",
            Event::EntryExitError => "ENTRY_EXIT_ERROR",
        };
        f.write_str(name)
    }
}

/// Next state for `event` raised in `state`
pub fn transition(state: StateName, event: Event) -> Result<StateName> {
    use Event::*;
    use StateName as S;

    let next = match (state, event) {
        (S::Setup, Done) => S::CollectData,
        (S::Setup, ApprovalsPending) => S::SetApprovals,
        (S::Setup, BridgePending) => S::CheckBridgeRequest,
        (S::SetApprovals, Done) => S::Setup,
        (S::SetApprovals, Timeout) => S::Error,
        (S::CheckBridgeRequest, Done) => S::Setup,
        (S::CheckBridgeRequest, Timeout) => S::Error,
        (S::CollectData, Done) => S::IdentifyOpportunity,
        (S::CollectData, Timeout) => S::CoolDown,
        (S::CollectTicker, Done) => S::IdentifyOpportunity,
        (S::CollectTicker, Timeout) => S::CoolDown,
        (S::IdentifyOpportunity, OpportunityFound) => S::ExecuteOrders,
        (S::IdentifyOpportunity, Done) => S::NoOpportunity,
        (S::IdentifyOpportunity, PricesStale) => S::CollectTicker,
        (S::ExecuteOrders, Done) => S::PostTrade,
        (S::ExecuteOrders, EntryExitError) => S::Setup,
        (S::PostTrade, Done) => S::Setup,
        (S::NoOpportunity, Done) => S::Setup,
        (S::CoolDown, Done) => S::CollectData,
        (S::Error, Done) => S::CoolDown,
        (state, event) => return Err(LoopError::InvalidTransition { state, event }),
    };
    Ok(next)
}
