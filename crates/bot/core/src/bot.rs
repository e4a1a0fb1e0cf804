use std::ops::Deref;

use eyre::Context as _;
use teloxide::{
    payloads::SendMessageSetters as _,
    prelude::Requester as _,
    types::{ChatId, InlineKeyboardMarkup, MessageId, ParseMode, True, UserId},
    utils::markdown::escape,
    ApiError, Bot, RequestError,
};

/// Thin wrapper over the Telegram API. Holds the private channel the club
/// sells access to, so membership changes go through one place.
pub struct TgBot {
    bot: Bot,
    channel_id: ChatId,
}

impl TgBot {
    pub fn new(bot: Bot, channel_id: ChatId) -> Self {
        TgBot { bot, channel_id }
    }

    pub async fn send_msg(&self, chat_id: ChatId, text: &str) -> Result<MessageId, eyre::Error> {
        Ok(self
            .bot
            .send_message(chat_id, text)
            .parse_mode(ParseMode::MarkdownV2)
            .await
            .context(format!("Failed to send message: {}", text))?
            .id)
    }

    pub async fn send_msg_with_markup(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: InlineKeyboardMarkup,
    ) -> Result<MessageId, eyre::Error> {
        Ok(self
            .bot
            .send_message(chat_id, text)
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(markup)
            .await
            .context(format!("Failed to send message: {}", text))?
            .id)
    }

    /// Best-effort send that never fails. Tries MarkdownV2, then the
    /// escaped text, then plain. Returns `MessageId(0)` when all three
    /// attempts were rejected.
    pub async fn notify(&self, chat_id: ChatId, text: &str) -> MessageId {
        if chat_id.0 == 0 {
            return MessageId(0);
        }

        let result = self
            .bot
            .send_message(chat_id, text)
            .parse_mode(ParseMode::MarkdownV2)
            .await;
        let id = match result {
            Ok(msg) => Some(msg.id),
            Err(err) => {
                log::warn!("Failed to send notification: {}. Msg:[{}]", err, text);
                let escaped = self
                    .bot
                    .send_message(chat_id, escape(text))
                    .parse_mode(ParseMode::MarkdownV2)
                    .await;
                match escaped {
                    Ok(msg) => Some(msg.id),
                    Err(_) => self.bot.send_message(chat_id, text).await.ok().map(|m| m.id),
                }
            }
        };

        match id {
            Some(id) => id,
            None => {
                log::error!("Failed to send notification. Msg:[{}]", text);
                MessageId(0)
            }
        }
    }

    pub async fn delete_msg(&self, chat_id: ChatId, id: MessageId) -> Result<(), eyre::Error> {
        self.bot.delete_message(chat_id, id).await?;
        Ok(())
    }

    pub async fn answer_callback_query<C: Into<String>>(
        &self,
        id: C,
    ) -> Result<True, RequestError> {
        self.bot.answer_callback_query(id).await
    }

    /// Removes the user from the paid channel. Banning someone who already
    /// left is treated as success.
    pub async fn kick_from_channel(&self, tg_id: i64) -> Result<(), eyre::Error> {
        let result = self
            .bot
            .ban_chat_member(self.channel_id, UserId(tg_id as u64))
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(err) if membership_gone(&err) => Ok(()),
            Err(err) => Err(err).context(format!("Failed to kick {} from channel", tg_id)),
        }
    }

    /// Lifts the channel ban so the user can join again by invite link.
    pub async fn readmit_to_channel(&self, tg_id: i64) -> Result<(), eyre::Error> {
        let result = self
            .bot
            .unban_chat_member(self.channel_id, UserId(tg_id as u64))
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(err) if membership_gone(&err) => Ok(()),
            Err(err) => Err(err).context(format!("Failed to readmit {} to channel", tg_id)),
        }
    }
}

fn membership_gone(err: &RequestError) -> bool {
    match err {
        RequestError::Api(ApiError::UserNotFound) => true,
        RequestError::Api(ApiError::Unknown(text)) => {
            text.contains("USER_NOT_PARTICIPANT") || text.contains("PARTICIPANT_ID_INVALID")
        }
        _ => false,
    }
}

impl Deref for TgBot {
    type Target = Bot;

    fn deref(&self) -> &Self::Target {
        &self.bot
    }
}
