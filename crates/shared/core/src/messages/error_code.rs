use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes carried by ERROR responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ApiError,
    UnknownExchange,
    UnknownAsset,
    UnknownPosition,
    DecodingError,
    InvalidMessage,
    InvalidDialogue,
    UnsupportedProtocol,
    UnsupportedSkill,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiError => "API_ERROR",
            Self::UnknownExchange => "UNKNOWN_EXCHANGE",
            Self::UnknownAsset => "UNKNOWN_ASSET",
            Self::UnknownPosition => "UNKNOWN_POSITION",
            Self::DecodingError => "DECODING_ERROR",
            Self::InvalidMessage => "INVALID_MESSAGE",
            Self::InvalidDialogue => "INVALID_DIALOGUE",
            Self::UnsupportedProtocol => "UNSUPPORTED_PROTOCOL",
            Self::UnsupportedSkill => "UNSUPPORTED_SKILL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
