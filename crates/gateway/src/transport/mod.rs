//! Notification transport
//!
//! Outcome notifications (trades executed, bridge results, errors) leave the
//! agent through a [`Publisher`]. The in-process implementation is a tokio
//! broadcast channel; other sinks (webhooks, message buses) implement the
//! same trait.

pub mod channel;
pub mod config;

pub use config::Addresses;

use crate::error::TransportError;
use async_trait::async_trait;
use serde::Serialize;

/// Publisher - pushes messages to every listener of a topic
#[async_trait]
pub trait Publisher<M>: Send + Sync
where
    M: Serialize + Send + Sync,
{
    async fn publish(&self, msg: &M) -> Result<(), TransportError>;

    /// Topic this publisher writes to
    fn topic(&self) -> &str;
}

/// Subscriber - receives messages published on a topic
#[async_trait]
pub trait Subscriber<M>: Send
where
    M: Send,
{
    /// Wait for the next message
    async fn next(&mut self) -> Result<M, TransportError>;

    /// Take a message if one is queued (`None` when empty)
    fn try_next(&mut self) -> Result<Option<M>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::Notification;

    fn _assert_publisher_object_safe(_: &dyn Publisher<Notification>) {}
    fn _assert_subscriber_object_safe(_: &mut dyn Subscriber<Notification>) {}
}
