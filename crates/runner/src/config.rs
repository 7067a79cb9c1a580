//! Agent configuration
//!
//! `AgentConfigFile` is the JSON document given on the command line;
//! durations are in milliseconds there. `LoopConfig` is what the control loop
//! runs with.

use crate::error::ConfigError;
use meridian_core::{ApprovalRequest, Venue};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Failed attempts before a collection state gives up
pub const DEFAULT_RETRIES: u32 = 3;

/// Runtime configuration of the control loop
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Agent name; replies are addressed to `agent/{name}`
    pub name: String,
    pub venues: Vec<Venue>,
    /// Bound on waiting for a gateway response
    pub timeout: Duration,
    pub max_retries: u32,
    /// Delay before retrying a failed approval
    pub poll_interval: Duration,
    /// Pause after a cycle without opportunity
    pub cycle_interval: Duration,
    pub cooldown_period: Duration,
    /// Prices older than this are refreshed before trading
    pub max_price_age: Duration,
    pub bridge_status_check_interval: Duration,
    /// Ticks `CheckBridgeRequest` waits for outstanding transfers
    pub max_bridge_polls: u32,
    /// Longest a single tick blocks waiting for responses
    pub tick_interval: Duration,
    pub snapshot_path: Option<PathBuf>,
    /// Allowances set before the first cycle
    pub approvals: Vec<ApprovalRequest>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            venues: Vec::new(),
            timeout: Duration::from_millis(default_timeout_ms()),
            max_retries: DEFAULT_RETRIES,
            poll_interval: Duration::from_millis(default_poll_interval_ms()),
            cycle_interval: Duration::from_millis(default_cycle_interval_ms()),
            cooldown_period: Duration::from_millis(default_cooldown_period_ms()),
            max_price_age: Duration::from_millis(default_max_price_age_ms()),
            bridge_status_check_interval: Duration::from_millis(default_bridge_check_ms()),
            max_bridge_polls: default_max_bridge_polls(),
            tick_interval: Duration::from_millis(default_tick_interval_ms()),
            snapshot_path: None,
            approvals: Vec::new(),
        }
    }
}

impl LoopConfig {
    pub fn with_venues(mut self, venues: Vec<Venue>) -> Self {
        self.venues = venues;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_cycle_interval(mut self, interval: Duration) -> Self {
        self.cycle_interval = interval;
        self
    }

    pub fn with_cooldown_period(mut self, period: Duration) -> Self {
        self.cooldown_period = period;
        self
    }

    pub fn with_max_price_age(mut self, age: Duration) -> Self {
        self.max_price_age = age;
        self
    }

    pub fn with_bridge_status_check_interval(mut self, interval: Duration) -> Self {
        self.bridge_status_check_interval = interval;
        self
    }

    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    pub fn with_approvals(mut self, approvals: Vec<ApprovalRequest>) -> Self {
        self.approvals = approvals;
        self
    }
}

/// Quote seeded into a paper venue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerConfig {
    pub symbol: String,
    pub bid: Decimal,
    pub ask: Decimal,
}

/// One venue in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    pub exchange_id: String,
    #[serde(default = "default_ledger")]
    pub ledger_id: String,

    /// Starting balances of the paper venue
    #[serde(default)]
    pub balances: BTreeMap<String, Decimal>,

    /// Starting quotes of the paper venue
    #[serde(default)]
    pub tickers: Vec<TickerConfig>,

    /// Random price walk per read, in basis points
    #[serde(default)]
    pub random_walk_bps: Option<u32>,
}

impl VenueConfig {
    pub fn venue(&self) -> Venue {
        Venue::new(self.exchange_id.as_str(), self.ledger_id.as_str())
    }
}

/// Agent configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfigFile {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default)]
    pub venues: Vec<VenueConfig>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,

    #[serde(default = "default_cooldown_period_ms")]
    pub cooldown_period_ms: u64,

    #[serde(default = "default_max_price_age_ms")]
    pub max_price_age_ms: u64,

    #[serde(default = "default_bridge_check_ms")]
    pub bridge_status_check_interval_ms: u64,

    #[serde(default = "default_max_bridge_polls")]
    pub max_bridge_polls: u32,

    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Per-call adapter timeout inside the gateway; 0 disables it
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,

    #[serde(default)]
    pub approvals: Vec<ApprovalRequest>,

    /// Symbol traded by the strategy
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Strategy parameter overrides, staged at startup
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

fn default_name() -> String {
    "meridian".to_string()
}

fn default_ledger() -> String {
    "cex".to_string()
}

fn default_symbol() -> String {
    "ETH/USDC".to_string()
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_max_retries() -> u32 {
    DEFAULT_RETRIES
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_cycle_interval_ms() -> u64 {
    5_000
}

fn default_cooldown_period_ms() -> u64 {
    10_000
}

fn default_max_price_age_ms() -> u64 {
    30_000
}

fn default_bridge_check_ms() -> u64 {
    10_000
}

fn default_max_bridge_polls() -> u32 {
    1_200
}

fn default_tick_interval_ms() -> u64 {
    250
}

fn default_call_timeout_ms() -> u64 {
    30_000
}

impl Default for AgentConfigFile {
    fn default() -> Self {
        Self {
            name: default_name(),
            venues: Vec::new(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            poll_interval_ms: default_poll_interval_ms(),
            cycle_interval_ms: default_cycle_interval_ms(),
            cooldown_period_ms: default_cooldown_period_ms(),
            max_price_age_ms: default_max_price_age_ms(),
            bridge_status_check_interval_ms: default_bridge_check_ms(),
            max_bridge_polls: default_max_bridge_polls(),
            tick_interval_ms: default_tick_interval_ms(),
            call_timeout_ms: default_call_timeout_ms(),
            snapshot_path: None,
            approvals: Vec::new(),
            symbol: default_symbol(),
            parameters: Map::new(),
        }
    }
}

impl AgentConfigFile {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Two paper venues quoting ETH/USDC on different chains
    pub fn demo() -> Self {
        let venue = |exchange_id: &str, ledger_id: &str, bid: i64, ask: i64| VenueConfig {
            exchange_id: exchange_id.to_string(),
            ledger_id: ledger_id.to_string(),
            balances: BTreeMap::from([
                ("ETH".to_string(), Decimal::from(5)),
                ("USDC".to_string(), Decimal::from(20_000)),
            ]),
            tickers: vec![TickerConfig {
                symbol: default_symbol(),
                bid: Decimal::from(bid),
                ask: Decimal::from(ask),
            }],
            random_walk_bps: Some(15),
        };
        Self {
            venues: vec![
                venue("paper-eth", "ethereum", 1999, 2000),
                venue("paper-base", "base", 2004, 2005),
            ],
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.venues.is_empty() {
            return Err(ConfigError::Invalid("at least one venue is required".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be positive".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for venue in &self.venues {
            if !seen.insert(venue.exchange_id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate exchange id {}",
                    venue.exchange_id
                )));
            }
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_ms > 0).then(|| Duration::from_millis(self.call_timeout_ms))
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            name: self.name.clone(),
            venues: self.venues.iter().map(VenueConfig::venue).collect(),
            timeout: Duration::from_millis(self.timeout_ms),
            max_retries: self.max_retries,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            cycle_interval: Duration::from_millis(self.cycle_interval_ms),
            cooldown_period: Duration::from_millis(self.cooldown_period_ms),
            max_price_age: Duration::from_millis(self.max_price_age_ms),
            bridge_status_check_interval: Duration::from_millis(self.bridge_status_check_interval_ms),
            max_bridge_polls: self.max_bridge_polls,
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            snapshot_path: self.snapshot_path.clone(),
            approvals: self.approvals.clone(),
        }
    }
}
