pub mod ws;

use crate::errors::BotError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// One button the user can press, carried as a (label, token) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub token: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            token: token.into(),
        }
    }
}

/// Opaque reference to a previously sent message, consumed by `edit_text`.
/// The core never owns transport internals beyond this handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHandle {
    pub conversation: Uuid,
    pub message_id: u64,
}

/// Outbound half of the chat seam. The chat network itself (delivery,
/// keyboards, callback dispatch) lives behind an implementation of this
/// trait; the flow controller only ever talks to it.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, conversation: Uuid, text: &str) -> Result<MessageHandle, BotError>;

    async fn edit_text(&self, message: &MessageHandle, text: &str) -> Result<(), BotError>;

    /// Deliver a local file into the conversation. Implementations must read
    /// the file before returning; the caller is free to delete it afterwards.
    async fn send_file(&self, conversation: Uuid, path: &Path) -> Result<(), BotError>;

    async fn present_choices(
        &self,
        conversation: Uuid,
        text: &str,
        choices: &[Choice],
    ) -> Result<MessageHandle, BotError>;
}
