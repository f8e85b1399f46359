//! Fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use notifier_core::completion::{
    Completion, CompletionError, Result as CompletionResult, ToolReply, ToolSpec,
};
use notifier_core::messenger::{Keyboard, Messenger, Result as MessengerResult, SentMessage};

/// Completion service that is always down, counting how often it was asked.
#[derive(Default)]
pub struct DownCompletion {
    calls: AtomicUsize,
}

impl DownCompletion {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Completion for DownCompletion {
    async fn complete(&self, _system: &str, _user: &str) -> CompletionResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CompletionError::Http("connection refused".into()))
    }

    async fn complete_with_tools(
        &self,
        _system: &str,
        _user: &str,
        _tools: &[ToolSpec],
    ) -> CompletionResult<ToolReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CompletionError::Http("connection refused".into()))
    }

    async fn read_image(&self, _image: &[u8], _prompt: &str) -> CompletionResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CompletionError::Http("connection refused".into()))
    }
}

/// Completion service that answers plain prompts from a queue and fails
/// once the queue is empty. Tool calls and images are always unavailable.
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// System instructions of every plain completion, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completion for ScriptedCompletion {
    async fn complete(&self, system: &str, _user: &str) -> CompletionResult<String> {
        self.prompts.lock().unwrap().push(system.to_string());
        self.replies.lock().unwrap().pop_front().ok_or(CompletionError::Empty)
    }

    async fn complete_with_tools(
        &self,
        _system: &str,
        _user: &str,
        _tools: &[ToolSpec],
    ) -> CompletionResult<ToolReply> {
        Err(CompletionError::Unavailable)
    }

    async fn read_image(&self, _image: &[u8], _prompt: &str) -> CompletionResult<String> {
        Err(CompletionError::Unavailable)
    }
}

/// One delivered message.
#[derive(Debug, Clone)]
pub struct Delivered {
    pub chat_id: i64,
    pub text: String,
    pub callbacks: Vec<String>,
}

/// Messenger that records every send.
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<Delivered>>,
}

impl RecordingMessenger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<Delivered> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> MessengerResult<SentMessage> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(Delivered {
            chat_id,
            text: text.to_string(),
            callbacks: keyboard
                .map(|k| k.callback_data().map(str::to_string).collect())
                .unwrap_or_default(),
        });
        Ok(SentMessage {
            chat_id,
            message_id: sent.len() as i32,
        })
    }

    async fn edit(
        &self,
        _message: SentMessage,
        _text: &str,
        _keyboard: Option<&Keyboard>,
    ) -> MessengerResult<()> {
        Ok(())
    }
}
