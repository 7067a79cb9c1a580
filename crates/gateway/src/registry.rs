//! Adapter registry keyed by exchange id

use crate::error::{CallError, GatewayError};
use log::{info, warn};
use meridian_core::ExchangeId;
use meridian_ports::{BridgeAdapter, ExchangeAdapter};
use std::collections::HashMap;
use std::sync::Arc;

/// Exchange adapters by exchange id, plus the optional bridge client
#[derive(Default)]
pub struct AdapterRegistry {
    exchanges: HashMap<ExchangeId, Arc<dyn ExchangeAdapter>>,
    bridge: Option<Arc<dyn BridgeAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own exchange id
    pub fn register(&mut self, adapter: Arc<dyn ExchangeAdapter>) -> Result<(), GatewayError> {
        let id = adapter.exchange_id().clone();
        if self.exchanges.contains_key(&id) {
            return Err(GatewayError::DuplicateAdapter(id));
        }
        info!("[GATEWAY] Registered adapter for {}", id);
        self.exchanges.insert(id, adapter);
        Ok(())
    }

    pub fn with_exchange(mut self, adapter: Arc<dyn ExchangeAdapter>) -> Result<Self, GatewayError> {
        self.register(adapter)?;
        Ok(self)
    }

    pub fn with_bridge(mut self, bridge: Arc<dyn BridgeAdapter>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn exchange_ids(&self) -> Vec<ExchangeId> {
        let mut ids: Vec<_> = self.exchanges.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn has_bridge(&self) -> bool {
        self.bridge.is_some()
    }

    pub(crate) fn exchange(&self, id: &ExchangeId) -> Result<Arc<dyn ExchangeAdapter>, CallError> {
        self.exchanges
            .get(id)
            .cloned()
            .ok_or_else(|| CallError::UnknownExchange(id.clone()))
    }

    pub(crate) fn bridge(&self) -> Result<Arc<dyn BridgeAdapter>, CallError> {
        self.bridge.clone().ok_or(CallError::NoBridge)
    }

    /// Close every adapter; failures are logged, not propagated
    pub async fn close_all(&self) {
        for (id, adapter) in &self.exchanges {
            if let Err(e) = adapter.close().await {
                warn!("[GATEWAY] Failed to close adapter {}: {}", id, e);
            }
        }
        if let Some(bridge) = &self.bridge
            && let Err(e) = bridge.close().await
        {
            warn!("[GATEWAY] Failed to close bridge adapter: {}", e);
        }
    }
}
