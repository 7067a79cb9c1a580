use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange identifier (e.g. "binance", "derive", "balancer")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeId(String);

impl ExchangeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ExchangeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ExchangeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ledger (chain) identifier. Centralized exchanges use a nominal ledger such as "cex".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerId(String);

impl LedgerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LedgerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for LedgerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for LedgerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A venue is an exchange reached through a specific ledger
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Venue {
    pub exchange_id: ExchangeId,
    pub ledger_id: LedgerId,
}

impl Venue {
    pub fn new(exchange_id: impl Into<ExchangeId>, ledger_id: impl Into<LedgerId>) -> Self {
        Self {
            exchange_id: exchange_id.into(),
            ledger_id: ledger_id.into(),
        }
    }

    /// Stable key used for snapshot maps: `exchange@ledger`
    pub fn key(&self) -> String {
        format!("{}@{}", self.exchange_id, self.ledger_id)
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.exchange_id, self.ledger_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_venue_key() {
        let venue = Venue::new("derive", "ethereum");
        assert_eq!(venue.key(), "derive@ethereum");
        assert_eq!(venue.to_string(), "derive@ethereum");
    }

    #[test]
    fn test_exchange_id_serializes_transparently() {
        let id = ExchangeId::new("binance");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"binance\"");
    }
}
