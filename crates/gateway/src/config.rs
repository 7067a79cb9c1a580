//! Gateway configuration

use crate::transport::Addresses;
use meridian_core::{Address, OperationTag};
use std::time::Duration;

/// Configuration for the gateway task manager
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address responses are sent from
    pub address: Address,
    /// Upper bound on a single adapter call; `None` lets calls run until the adapter returns
    pub call_timeout: Option<Duration>,
    /// Pause before retrying a streaming call after a transient error
    pub stream_retry_delay: Duration,
    /// Operations that must have a handler; construction fails otherwise
    pub required_operations: Vec<OperationTag>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            address: Addresses::gateway(),
            call_timeout: Some(Duration::from_secs(30)),
            stream_retry_delay: Duration::from_millis(100),
            required_operations: vec![
                OperationTag::GetAllBalances,
                OperationTag::GetAllTickers,
                OperationTag::GetOrders,
                OperationTag::CreateOrder,
            ],
        }
    }
}

impl GatewayConfig {
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_stream_retry_delay(mut self, delay: Duration) -> Self {
        self.stream_retry_delay = delay;
        self
    }

    pub fn with_required_operations(mut self, operations: Vec<OperationTag>) -> Self {
        self.required_operations = operations;
        self
    }
}
