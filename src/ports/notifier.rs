use async_trait::async_trait;
use crate::domain::ChatId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotifyError {
    #[error("Delivery to {chat} failed: {reason}")]
    Delivery { chat: ChatId, reason: String },
}

pub type NotifyResult<T> = Result<T, NotifyError>;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, chat: ChatId, text: &str) -> NotifyResult<()>;

    /// Best effort fan-out: a failed chat is logged and the rest still get the message.
    async fn broadcast(&self, chats: &[ChatId], text: &str) {
        for chat in chats {
            if let Err(e) = self.send(*chat, text).await {
                tracing::warn!("Failed to deliver notification to chat {}: {}", chat, e);
            }
        }
    }
}
