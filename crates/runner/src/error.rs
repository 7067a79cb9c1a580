//! Error types for the control loop

use crate::transitions::{Event, StateName};
use meridian_bridge::BridgeError;
use meridian_gateway::GatewayError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoopError {
    /// The loop reached a state it cannot recover from (an exit leg failed)
    #[error("Unexpected state: {0}")]
    UnexpectedState(String),

    #[error("No transition from {state} on {event}")]
    InvalidTransition { state: StateName, event: Event },

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, LoopError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
