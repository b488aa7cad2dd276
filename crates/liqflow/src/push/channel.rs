use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::push::events::PushEvent;

/// Broadcast capacity for push events.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("invalid push channel url: {0}")]
    InvalidUrl(String),

    #[error("push channel connection failed: {0}")]
    Connection(String),
}

/// A server-push connection keyed by the initiating user.
///
/// Events from every connection made through one handle are delivered to
/// the same broadcast channel, so a subscription survives reconnects.
#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn connect(&self, user_id: &str) -> Result<(), ChannelError>;

    fn subscribe(&self) -> broadcast::Receiver<PushEvent>;

    async fn disconnect(&self);

    fn is_connected(&self) -> bool;
}
