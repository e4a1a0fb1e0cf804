use async_trait::async_trait;
use bot_core::bot::TgBot;
use eyre::Error;
use teloxide::types::ChatId;

/// Message transport used by the delivery worker.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns true when the message reached Telegram.
    async fn send(&self, tg_id: i64, text: &str) -> bool;
}

#[async_trait]
impl Notifier for TgBot {
    async fn send(&self, tg_id: i64, text: &str) -> bool {
        self.notify(ChatId(tg_id), text).await.0 != 0
    }
}

/// Paid channel access control used by the expiry sweep. Both calls
/// treat "not currently a member" as success.
#[async_trait]
pub trait ChannelMembership: Send + Sync {
    async fn revoke(&self, tg_id: i64) -> Result<(), Error>;
    async fn restore(&self, tg_id: i64) -> Result<(), Error>;
}

#[async_trait]
impl ChannelMembership for TgBot {
    async fn revoke(&self, tg_id: i64) -> Result<(), Error> {
        self.kick_from_channel(tg_id).await
    }

    async fn restore(&self, tg_id: i64) -> Result<(), Error> {
        self.readmit_to_channel(tg_id).await
    }
}
