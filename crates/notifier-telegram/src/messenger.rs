//! [`Messenger`] over the Telegram Bot API.

use async_trait::async_trait;
use notifier_core::messenger::Result;
use notifier_core::{Keyboard, Messenger, MessengerError, SentMessage};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode};

/// Convert a platform-neutral keyboard to Telegram inline markup.
pub fn to_markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.data.clone()))
            .collect::<Vec<_>>()
    }))
}

/// Sends HTML messages through a teloxide [`Bot`].
#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<SentMessage> {
        let mut req = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html);
        if let Some(kb) = keyboard.filter(|kb| !kb.is_empty()) {
            req = req.reply_markup(to_markup(kb));
        }
        let sent = req.await.map_err(|e| MessengerError::Send(e.to_string()))?;
        Ok(SentMessage {
            chat_id,
            message_id: sent.id.0,
        })
    }

    async fn edit(
        &self,
        message: SentMessage,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()> {
        let mut req = self
            .bot
            .edit_message_text(ChatId(message.chat_id), MessageId(message.message_id), text)
            .parse_mode(ParseMode::Html);
        if let Some(kb) = keyboard.filter(|kb| !kb.is_empty()) {
            req = req.reply_markup(to_markup(kb));
        }
        req.await.map_err(|e| MessengerError::Edit(e.to_string()))?;
        Ok(())
    }
}
