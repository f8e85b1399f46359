//! Outbound chat seam used by the engine and the chat surface.

use async_trait::async_trait;
use thiserror::Error;

use crate::callback::CallbackAction;

/// Messenger errors.
#[derive(Debug, Error)]
pub enum MessengerError {
    #[error("failed to send message: {0}")]
    Send(String),

    #[error("failed to edit message: {0}")]
    Edit(String),

    #[error("timed out talking to the chat platform")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, MessengerError>;

/// One inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    /// Button for `action`; `None` when its callback data cannot fit.
    pub fn new(label: impl Into<String>, action: &CallbackAction) -> Option<Self> {
        Some(Self {
            label: label.into(),
            data: action.encode_or_overflow()?,
        })
    }
}

/// Inline keyboard, row by row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row, dropping buttons that could not be encoded.
    pub fn row(mut self, buttons: impl IntoIterator<Item = Option<Button>>) -> Self {
        let row: Vec<Button> = buttons.into_iter().flatten().collect();
        if !row.is_empty() {
            self.rows.push(row);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every callback string, in order.
    pub fn callback_data(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(|b| b.data.as_str())
    }
}

/// Handle of a sent message, for later edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub message_id: i32,
}

/// Sends and edits HTML-formatted chat messages.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<SentMessage>;

    async fn edit(
        &self,
        message: SentMessage,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()>;
}
