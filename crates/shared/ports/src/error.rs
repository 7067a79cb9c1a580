use thiserror::Error;

/// Errors raised by exchange and bridge clients
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("Request timeout")]
    Timeout,

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Network error: {0}")]
    Network(String),

    /// Stream update arrived with a sequence older than the last one seen
    #[error("Out of order update: {0}")]
    OutOfOrder(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Unknown symbol: {0}")]
    BadSymbol(String),

    #[error("Unknown position: {0}")]
    UnknownPosition(String),

    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("Order rejected: {0}")]
    OrderRejected(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("Exchange error: {0}")]
    Exchange(String),

    #[error("Adapter closed")]
    Closed,
}

impl AdapterError {
    /// Transient errors are retried locally and never surfaced as a fatal transition
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AdapterError::Timeout
                | AdapterError::RateLimited(_)
                | AdapterError::Network(_)
                | AdapterError::OutOfOrder(_)
        )
    }
}

pub type AdapterResult<T> = std::result::Result<T, AdapterError>;
