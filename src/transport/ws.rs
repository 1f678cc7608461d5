use crate::errors::BotError;
use crate::transport::{ChatTransport, Choice, MessageHandle};
use async_trait::async_trait;
use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// JSON frames pushed to a connected client. A `file` frame is immediately
/// followed by one binary frame carrying the file bytes.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    Session {
        conversation: Uuid,
    },
    Text {
        message_id: u64,
        text: String,
    },
    Edit {
        message_id: u64,
        text: String,
    },
    Choices {
        message_id: u64,
        text: String,
        options: Vec<Choice>,
    },
    File {
        name: String,
        size: u64,
    },
}

/// Frames accepted from a connected client.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    Select { token: String },
}

/// Registry of live sockets, keyed by conversation id. Shared between the
/// upgrade handler (which registers/unregisters) and the transport adapter
/// (which pushes outbound traffic).
#[derive(Clone, Default)]
pub struct PeerMap {
    inner: Arc<RwLock<HashMap<Uuid, mpsc::UnboundedSender<Message>>>>,
}

impl PeerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, conversation: Uuid) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.write().unwrap().insert(conversation, tx);
        info!(%conversation, "conversation connected");
        rx
    }

    pub fn unregister(&self, conversation: Uuid) {
        self.inner.write().unwrap().remove(&conversation);
        info!(%conversation, "conversation disconnected");
    }

    fn push(&self, conversation: Uuid, message: Message) -> Result<(), BotError> {
        let peers = self.inner.read().unwrap();
        let tx = peers
            .get(&conversation)
            .ok_or_else(|| BotError::Transport(format!("conversation {} not connected", conversation)))?;
        tx.send(message)
            .map_err(|_| BotError::Transport(format!("conversation {} hung up", conversation)))
    }
}

/// WebSocket implementation of the chat seam.
pub struct WsTransport {
    peers: PeerMap,
    next_message_id: AtomicU64,
}

impl WsTransport {
    pub fn new(peers: PeerMap) -> Self {
        Self {
            peers,
            next_message_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_message_id.fetch_add(1, Ordering::Relaxed)
    }

    fn push_frame(&self, conversation: Uuid, frame: &OutboundFrame) -> Result<(), BotError> {
        let json = serde_json::to_string(frame)
            .map_err(|e| BotError::Transport(format!("frame serialization failed: {}", e)))?;
        self.peers.push(conversation, Message::Text(json.into()))
    }
}

#[async_trait]
impl ChatTransport for WsTransport {
    async fn send_text(&self, conversation: Uuid, text: &str) -> Result<MessageHandle, BotError> {
        let message_id = self.next_id();
        self.push_frame(
            conversation,
            &OutboundFrame::Text {
                message_id,
                text: text.to_string(),
            },
        )?;
        Ok(MessageHandle {
            conversation,
            message_id,
        })
    }

    async fn edit_text(&self, message: &MessageHandle, text: &str) -> Result<(), BotError> {
        self.push_frame(
            message.conversation,
            &OutboundFrame::Edit {
                message_id: message.message_id,
                text: text.to_string(),
            },
        )
    }

    async fn send_file(&self, conversation: Uuid, path: &Path) -> Result<(), BotError> {
        // Read eagerly: the flow controller deletes the file right after this
        // call returns.
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video.mp4".to_string());
        self.push_frame(
            conversation,
            &OutboundFrame::File {
                name,
                size: bytes.len() as u64,
            },
        )?;
        self.peers
            .push(conversation, Message::Binary(bytes::Bytes::from(bytes)))
    }

    async fn present_choices(
        &self,
        conversation: Uuid,
        text: &str,
        choices: &[Choice],
    ) -> Result<MessageHandle, BotError> {
        let message_id = self.next_id();
        self.push_frame(
            conversation,
            &OutboundFrame::Choices {
                message_id,
                text: text.to_string(),
                options: choices.to_vec(),
            },
        )?;
        Ok(MessageHandle {
            conversation,
            message_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_text_requires_a_connected_peer() {
        let transport = WsTransport::new(PeerMap::new());
        let err = transport
            .send_text(Uuid::new_v4(), "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::Transport(_)));
    }

    #[tokio::test]
    async fn frames_arrive_in_order_with_fresh_message_ids() {
        let peers = PeerMap::new();
        let transport = WsTransport::new(peers.clone());
        let conversation = Uuid::new_v4();
        let mut rx = peers.register(conversation);

        let first = transport.send_text(conversation, "one").await.unwrap();
        let second = transport
            .present_choices(conversation, "pick", &[Choice::new("Enhance Quality", "enhance")])
            .await
            .unwrap();
        assert_ne!(first.message_id, second.message_id);

        let frame = rx.recv().await.unwrap();
        match frame {
            Message::Text(json) => {
                let v: serde_json::Value = serde_json::from_str(json.as_str()).unwrap();
                assert_eq!(v["type"], "text");
                assert_eq!(v["text"], "one");
            }
            other => panic!("unexpected frame: {:?}", other),
        }
        let frame = rx.recv().await.unwrap();
        match frame {
            Message::Text(json) => {
                let v: serde_json::Value = serde_json::from_str(json.as_str()).unwrap();
                assert_eq!(v["type"], "choices");
                assert_eq!(v["options"][0]["token"], "enhance");
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_file_emits_metadata_then_binary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        tokio::fs::write(&path, b"fake video bytes").await.unwrap();

        let peers = PeerMap::new();
        let transport = WsTransport::new(peers.clone());
        let conversation = Uuid::new_v4();
        let mut rx = peers.register(conversation);

        transport.send_file(conversation, &path).await.unwrap();

        match rx.recv().await.unwrap() {
            Message::Text(json) => {
                let v: serde_json::Value = serde_json::from_str(json.as_str()).unwrap();
                assert_eq!(v["type"], "file");
                assert_eq!(v["name"], "clip.mp4");
                assert_eq!(v["size"], 16);
            }
            other => panic!("unexpected frame: {:?}", other),
        }
        match rx.recv().await.unwrap() {
            Message::Binary(bytes) => assert_eq!(&bytes[..], b"fake video bytes"),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn inbound_select_frame_deserializes() {
        let frame: InboundFrame =
            serde_json::from_str(r#"{"type":"select","token":"1280x720"}"#).unwrap();
        let InboundFrame::Select { token } = frame;
        assert_eq!(token, "1280x720");
    }
}
