//! Error types for the bridge tracker

use meridian_gateway::GatewayError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
