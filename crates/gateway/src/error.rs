//! Error types for the gateway crate

use meridian_core::{ErrorCode, ExchangeId, OperationTag, ResponseKind};
use meridian_ports::AdapterError;
use thiserror::Error;

/// Transport-level errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Send failed: {0}")]
    Send(String),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Timeout waiting for message")]
    Timeout,
}

/// Gateway-level errors (manager operations)
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Operation not supported: {0}")]
    UnsupportedOperation(OperationTag),

    #[error("Operation {0} is streaming; use subscribe")]
    StreamingOperation(OperationTag),

    #[error("Operation {0} is not a streaming operation")]
    NotStreaming(OperationTag),

    #[error("Adapter already registered for exchange {0}")]
    DuplicateAdapter(ExchangeId),

    #[error("Gateway is shut down")]
    ShutDown,
}

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Failure of a single request task, converted to an ERROR response at the task boundary
#[derive(Error, Debug)]
pub(crate) enum CallError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("Unknown exchange: {0}")]
    UnknownExchange(ExchangeId),

    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("No bridge adapter registered")]
    NoBridge,

    #[error("Payload does not match operation {0}")]
    Mismatch(OperationTag),

    #[error("Internal error")]
    Panicked,
}

impl CallError {
    pub(crate) fn code(&self) -> ErrorCode {
        match self {
            CallError::Adapter(err) => match err {
                AdapterError::BadSymbol(_) => ErrorCode::UnknownAsset,
                AdapterError::UnknownPosition(_) => ErrorCode::UnknownPosition,
                AdapterError::Decoding(_) => ErrorCode::DecodingError,
                AdapterError::NotSupported(_) => ErrorCode::UnsupportedProtocol,
                AdapterError::Timeout
                | AdapterError::RateLimited(_)
                | AdapterError::Network(_)
                | AdapterError::OutOfOrder(_)
                | AdapterError::Authentication(_)
                | AdapterError::OrderRejected(_)
                | AdapterError::Exchange(_)
                | AdapterError::Closed => ErrorCode::ApiError,
            },
            CallError::UnknownExchange(_) => ErrorCode::UnknownExchange,
            CallError::UnknownAsset(_) => ErrorCode::UnknownAsset,
            CallError::NoBridge => ErrorCode::UnsupportedProtocol,
            CallError::Mismatch(_) => ErrorCode::InvalidMessage,
            CallError::Panicked => ErrorCode::ApiError,
        }
    }

    pub(crate) fn into_kind(self, exchange_id: Option<ExchangeId>) -> ResponseKind {
        ResponseKind::Error {
            code: self.code(),
            message: self.to_string(),
            exchange_id,
        }
    }
}
