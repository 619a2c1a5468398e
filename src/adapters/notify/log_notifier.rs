use crate::domain::ChatId;
use crate::ports::{Notifier, NotifyResult};
use async_trait::async_trait;

/// Delivers notifications to the terminal and the log. Used when no chat
/// front end is attached.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, chat: ChatId, text: &str) -> NotifyResult<()> {
        tracing::info!("Notification for chat {}: {}", chat, text);
        println!("[chat {chat}]\n{text}\n");
        Ok(())
    }
}
