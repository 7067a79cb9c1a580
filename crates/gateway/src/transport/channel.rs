//! Tokio broadcast transport for single-process mode
//!
//! Messages are passed by value; no serialization happens in-process.

use crate::error::TransportError;
use crate::transport::{Publisher, Subscriber};
use async_trait::async_trait;
use log::warn;
use serde::Serialize;
use tokio::sync::broadcast;

/// Default capacity of a notification channel
pub const DEFAULT_CAPACITY: usize = 256;

/// Broadcast publisher for a single topic
pub struct ChannelPublisher<M> {
    topic: String,
    tx: broadcast::Sender<M>,
}

impl<M: Clone> ChannelPublisher<M> {
    /// Create a publisher/subscriber pair for `topic`
    pub fn pair(topic: impl Into<String>, capacity: usize) -> (Self, ChannelSubscriber<M>) {
        let (tx, rx) = broadcast::channel(capacity);
        let subscriber = ChannelSubscriber { rx, _tx: tx.clone() };
        (
            Self {
                topic: topic.into(),
                tx,
            },
            subscriber,
        )
    }

    /// Attach another listener
    pub fn subscribe(&self) -> ChannelSubscriber<M> {
        ChannelSubscriber {
            rx: self.tx.subscribe(),
            _tx: self.tx.clone(),
        }
    }
}

#[async_trait]
impl<M> Publisher<M> for ChannelPublisher<M>
where
    M: Serialize + Clone + Send + Sync + 'static,
{
    async fn publish(&self, msg: &M) -> Result<(), TransportError> {
        self.tx
            .send(msg.clone())
            .map_err(|_| TransportError::ChannelClosed)?;
        Ok(())
    }

    fn topic(&self) -> &str {
        &self.topic
    }
}

/// Broadcast listener
pub struct ChannelSubscriber<M> {
    rx: broadcast::Receiver<M>,
    // Keeps the channel open while a listener exists
    _tx: broadcast::Sender<M>,
}

#[async_trait]
impl<M> Subscriber<M> for ChannelSubscriber<M>
where
    M: Clone + Send + 'static,
{
    async fn next(&mut self) -> Result<M, TransportError> {
        loop {
            match self.rx.recv().await {
                Ok(msg) => return Ok(msg),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("[TRANSPORT] Listener lagged, skipped {} messages", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(TransportError::ChannelClosed);
                }
            }
        }
    }

    fn try_next(&mut self) -> Result<Option<M>, TransportError> {
        match self.rx.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Lagged(_)) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(TransportError::ChannelClosed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::Notification;

    #[tokio::test]
    async fn test_notification_reaches_every_listener() {
        let (publisher, mut first) = ChannelPublisher::<Notification>::pair("notifications.arb", 8);
        let mut second = publisher.subscribe();

        let note = Notification::Error {
            state: "CollectData".into(),
            message: "boom".into(),
        };
        publisher.publish(&note).await.unwrap();

        assert_eq!(first.next().await.unwrap(), note);
        assert_eq!(second.next().await.unwrap(), note);
        assert_eq!(publisher.topic(), "notifications.arb");
    }

    #[tokio::test]
    async fn test_try_next_empty() {
        let (_publisher, mut subscriber) = ChannelPublisher::<Notification>::pair("t", 8);
        assert!(subscriber.try_next().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_publish_without_listeners_fails() {
        let (publisher, subscriber) = ChannelPublisher::<u32>::pair("t", 8);
        drop(subscriber);
        assert!(matches!(
            publisher.publish(&1).await,
            Err(TransportError::ChannelClosed)
        ));
    }
}
