//! Message types exchanged between the control loop and the gateway

mod envelope;
mod error_code;
mod notification;
mod request;
mod response;

pub use envelope::{Address, Envelope, RequestEnvelope, ResponseEnvelope};
pub use error_code::ErrorCode;
pub use notification::Notification;
pub use request::{Operation, OperationTag, Params, ReplyMode, Request, RequestId};
pub use response::{Response, ResponseKind, ResponseTag};
