use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Request, Response};

/// Logical address of a component (e.g. `gateway/dcxt`, `agent/arbitrage`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Addressed container for a request or response payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<P> {
    pub destination: Address,
    pub origin: Address,
    pub payload: P,
}

impl<P> Envelope<P> {
    pub fn new(destination: impl Into<Address>, origin: impl Into<Address>, payload: P) -> Self {
        Self {
            destination: destination.into(),
            origin: origin.into(),
            payload,
        }
    }

    /// Build the envelope answering this one: addresses swapped
    pub fn reply<Q>(&self, payload: Q) -> Envelope<Q> {
        Envelope {
            destination: self.origin.clone(),
            origin: self.destination.clone(),
            payload,
        }
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self(s)
    }
}

pub type RequestEnvelope = Envelope<Request>;
pub type ResponseEnvelope = Envelope<Response>;
