use crate::common::response::{ApiError, ApiResponse, ApiSuccess};
use crate::modules::chat::model::UploadedVideo;
use crate::modules::chat::service::ChatService;
use crate::state::AppState;
use crate::transport::ws::{InboundFrame, OutboundFrame};
use axum::{
    extract::{
        Multipart, Path, Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct WsQuery {
    /// Reconnect with a known id; otherwise the server assigns one.
    pub conversation: Option<Uuid>,
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let conversation = query.conversation.unwrap_or_else(Uuid::new_v4);
    ws.on_upgrade(move |socket| serve_socket(socket, state, conversation))
}

/// Pump one conversation's socket: outbound frames from the transport channel
/// go down the wire, inbound selections spawn flow tasks. A running encode
/// never blocks this loop.
async fn serve_socket(socket: WebSocket, state: AppState, conversation: Uuid) {
    let mut outbound = state.peers.register(conversation);
    let (mut sender, mut receiver) = socket.split();

    let hello = match serde_json::to_string(&OutboundFrame::Session { conversation }) {
        Ok(json) => json,
        Err(e) => {
            warn!(%conversation, "could not encode session frame: {}", e);
            state.peers.unregister(conversation);
            return;
        }
    };
    if sender.send(Message::Text(hello.into())).await.is_err() {
        state.peers.unregister(conversation);
        return;
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(inbound) = receiver.next().await {
            match inbound {
                Ok(Message::Text(text)) => {
                    match serde_json::from_str::<InboundFrame>(text.as_str()) {
                        Ok(InboundFrame::Select { token }) => {
                            let state = recv_state.clone();
                            tokio::spawn(async move {
                                ChatService::on_option_selected(state, conversation, &token).await;
                            });
                        }
                        Err(e) => {
                            warn!(%conversation, "ignoring malformed client frame: {}", e);
                        }
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {} // ping/pong/binary
                Err(e) => {
                    warn!(%conversation, "socket error: {}", e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.peers.unregister(conversation);
}

/// Stage a multipart upload on local disk, then hand it to the flow
/// controller. The staged path is unique per upload so concurrent
/// conversations can never collide.
pub async fn upload_video(
    State(state): State<AppState>,
    Path(conversation): Path<Uuid>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let field = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => break field,
            Ok(Some(_)) => continue,
            Ok(None) => {
                return ApiError(
                    "Missing multipart field 'file'".to_string(),
                    StatusCode::BAD_REQUEST,
                )
                .into_response();
            }
            Err(e) => {
                return ApiError(format!("Malformed upload: {}", e), StatusCode::BAD_REQUEST)
                    .into_response();
            }
        }
    };

    let file_name = field.file_name().unwrap_or("upload.mp4").to_string();
    let content_type = field.content_type().map(|ct| ct.to_string());
    let staged = staged_path(&state, conversation, &file_name);

    if let Err(e) = tokio::fs::create_dir_all(state.config.uploads_dir()).await {
        return ApiError(format!("Storage error: {}", e), StatusCode::INTERNAL_SERVER_ERROR)
            .into_response();
    }

    match write_field_to_disk(field, &staged).await {
        Ok(bytes) => {
            info!(%conversation, file = %staged.display(), bytes, "upload staged");
        }
        Err(e) => {
            crate::common::fs::remove_if_exists(&staged);
            return ApiError(format!("Upload interrupted: {}", e), StatusCode::BAD_REQUEST)
                .into_response();
        }
    }

    ChatService::on_video_uploaded(
        state,
        conversation,
        UploadedVideo {
            path: staged,
            file_name,
            content_type,
        },
    )
    .await;

    ApiSuccess(
        ApiResponse::success(conversation, "Upload received"),
        StatusCode::ACCEPTED,
    )
    .into_response()
}

fn staged_path(state: &AppState, conversation: Uuid, file_name: &str) -> PathBuf {
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp4");
    state
        .config
        .uploads_dir()
        .join(format!("{}-{}.{}", conversation, Uuid::new_v4(), ext))
}

async fn write_field_to_disk(
    mut field: axum::extract::multipart::Field<'_>,
    path: &std::path::Path,
) -> anyhow::Result<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written: u64 = 0;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}
