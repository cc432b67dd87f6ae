use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{KeyboardButton, KeyboardMarkup, KeyboardRemove, ReplyMarkup};

use crate::error::BotError;

/// Abstract chat transport. The engine never touches teloxide directly;
/// replies arrive through the dispatcher, which routes the next inbound
/// text from a recipient to the wizard registry or the answer collector.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Sends a question or wizard prompt. A non-empty `options` list is
    /// rendered as a one-time reply keyboard; an empty list removes any
    /// keyboard left from a previous prompt.
    async fn send_prompt(
        &self,
        recipient: i64,
        text: &str,
        options: &[String],
    ) -> Result<(), BotError>;

    /// Sends a plain notice without touching the current keyboard.
    async fn send_notice(&self, recipient: i64, text: &str) -> Result<(), BotError>;
}

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
    async fn send_prompt(
        &self,
        recipient: i64,
        text: &str,
        options: &[String],
    ) -> Result<(), BotError> {
        let markup = if options.is_empty() {
            ReplyMarkup::KeyboardRemove(KeyboardRemove::new())
        } else {
            ReplyMarkup::Keyboard(options_keyboard(options))
        };
        self.bot
            .send_message(ChatId(recipient), text)
            .reply_markup(markup)
            .await?;
        Ok(())
    }

    async fn send_notice(&self, recipient: i64, text: &str) -> Result<(), BotError> {
        self.bot.send_message(ChatId(recipient), text).await?;
        Ok(())
    }
}

/// One button per row so long answer texts stay readable.
fn options_keyboard(options: &[String]) -> KeyboardMarkup {
    let rows: Vec<Vec<KeyboardButton>> = options
        .iter()
        .map(|o| vec![KeyboardButton::new(o.clone())])
        .collect();
    KeyboardMarkup::new(rows)
        .resize_keyboard(true)
        .one_time_keyboard(true)
}
