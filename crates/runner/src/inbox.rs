//! Parameter Inbox
//!
//! Strategy parameter overrides are staged here from any task and applied by
//! the control loop during CoolDown.

use dashmap::DashMap;
use log::{debug, warn};
use meridian_strategy::{ParamKind, ParamValue, ParameterSpec};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

struct Inner {
    kinds: HashMap<String, ParamKind>,
    staged: DashMap<String, ParamValue>,
}

/// Cloneable handle to staged overrides
#[derive(Clone)]
pub struct ParameterInbox {
    inner: Arc<Inner>,
}

impl ParameterInbox {
    pub fn new(parameters: &[ParameterSpec]) -> Self {
        let kinds = parameters
            .iter()
            .map(|spec| (spec.name.clone(), spec.kind))
            .collect();
        Self {
            inner: Arc::new(Inner {
                kinds,
                staged: DashMap::new(),
            }),
        }
    }

    /// Stage every key that names a declared parameter and converts to its
    /// kind. Other keys are dropped. Returns how many were staged.
    pub fn stage_json(&self, overrides: &Map<String, Value>) -> usize {
        let mut staged = 0;
        for (name, raw) in overrides {
            let Some(kind) = self.inner.kinds.get(name) else {
                debug!("[LOOP] Dropping unknown parameter {}", name);
                continue;
            };
            match kind.parse(raw) {
                Some(value) => {
                    self.inner.staged.insert(name.clone(), value);
                    staged += 1;
                }
                None => warn!("[LOOP] Dropping parameter {}: expected {}, got {}", name, kind, raw),
            }
        }
        staged
    }

    /// Stage one typed value. `false` if the name is unknown or the kind differs.
    pub fn stage(&self, name: &str, value: ParamValue) -> bool {
        match self.inner.kinds.get(name) {
            Some(kind) if *kind == value.kind() => {
                self.inner.staged.insert(name.to_string(), value);
                true
            }
            _ => false,
        }
    }

    /// Take every staged override
    pub fn drain(&self) -> Vec<(String, ParamValue)> {
        let names: Vec<String> = self.inner.staged.iter().map(|e| e.key().clone()).collect();
        names
            .into_iter()
            .filter_map(|name| self.inner.staged.remove(&name))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.staged.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.staged.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn inbox() -> ParameterInbox {
        ParameterInbox::new(&[
            ParameterSpec::new("min_spread_bps", ParamKind::Decimal),
            ParameterSpec::new("enabled", ParamKind::Bool),
            ParameterSpec::new("max_open_orders", ParamKind::Integer),
        ])
    }

    #[test]
    fn test_stage_json_filters() {
        let inbox = inbox();
        let overrides = json!({
            "min_spread_bps": "35.5",
            "enabled": "yes",
            "max_open_orders": 2,
            "unknown": 1
        });

        let staged = inbox.stage_json(overrides.as_object().unwrap());
        assert_eq!(staged, 2);

        let mut drained = inbox.drain();
        drained.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            drained,
            vec![
                ("max_open_orders".to_string(), ParamValue::Integer(2)),
                ("min_spread_bps".to_string(), ParamValue::Decimal(dec!(35.5))),
            ]
        );
        assert!(inbox.is_empty());
    }

    #[test]
    fn test_later_value_replaces_earlier() {
        let inbox = inbox();
        let handle = inbox.clone();
        assert!(handle.stage("enabled", ParamValue::Bool(false)));
        assert!(inbox.stage("enabled", ParamValue::Bool(true)));
        assert!(!inbox.stage("enabled", ParamValue::Integer(1)));

        assert_eq!(inbox.len(), 1);
        assert_eq!(
            handle.drain(),
            vec![("enabled".to_string(), ParamValue::Bool(true))]
        );
    }
}
