//! Strategy errors

use crate::params::ParamKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Parameter {name} expects a {expected} value")]
    TypeMismatch { name: String, expected: ParamKind },

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, StrategyError>;
