//! HTTP surface: websocket audio streaming plus the small JSON API for
//! frame descriptions and manual flushes.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use futures::stream::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::ingest::IngestionBuffer;
use crate::streaming::StreamSession;
use crate::stt::TranscriptionBoundary;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub boundary: TranscriptionBoundary,
    pub ingestion: Arc<IngestionBuffer>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(info_handler))
        .route("/ws", get(ws_handler))
        .route("/api/frame-description", post(frame_description_handler))
        .route("/api/flush", post(flush_handler))
        .with_state(state)
}

async fn info_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "service": "streamscribe",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.boundary.model_name(),
        "model_ready": state.boundary.is_ready(),
        "session_id": state.ingestion.session_id(),
        "endpoints": {
            "ws": "/ws",
            "frame_description": "POST /api/frame-description",
            "flush": "POST /api/flush",
        },
    }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| websocket_loop(socket, state))
}

/// One streaming pipeline per connection; the aggregation buffer is
/// shared across all of them.
async fn websocket_loop(mut socket: WebSocket, state: AppState) {
    info!("websocket connected");
    let mut session = StreamSession::new(&state.config, state.boundary.clone());

    while let Some(result) = socket.next().await {
        match result {
            Ok(Message::Binary(frame)) => {
                if let Some(delta) = session.ingest(&frame).await {
                    state.ingestion.append_transcript(delta.clone()).await;
                    if let Err(err) = send_result(&mut socket, &delta).await {
                        warn!(error = ?err, "failed to send transcript delta");
                        break;
                    }
                }
            }
            Ok(Message::Text(_)) => {
                warn!("text websocket frames are not supported, expecting f32 PCM");
            }
            Ok(Message::Ping(payload)) => {
                if let Err(err) = socket.send(Message::Pong(payload)).await {
                    warn!(error = ?err, "failed to reply to ping");
                    break;
                }
            }
            Ok(Message::Pong(_)) => {}
            Ok(Message::Close(frame)) => {
                info!(?frame, "websocket closed by client");
                break;
            }
            Err(err) => {
                error!(error = ?err, "websocket error");
                break;
            }
        }
    }
    debug!(rounds = session.rounds(), "websocket disconnected");
}

fn result_payload(text: &str) -> Result<String, serde_json::Error> {
    serde_json::to_string(&json!({ "type": "result", "text": text }))
}

async fn send_result(socket: &mut WebSocket, text: &str) -> Result<(), axum::Error> {
    let payload = result_payload(text).map_err(axum::Error::new)?;
    socket.send(Message::Text(payload.into())).await
}

#[derive(Debug, Deserialize)]
pub struct FrameDescriptionRequest {
    pub description: String,
}

#[derive(Debug, Serialize)]
struct ApiResponse {
    success: bool,
    message: &'static str,
}

async fn frame_description_handler(
    State(state): State<AppState>,
    Json(request): Json<FrameDescriptionRequest>,
) -> impl IntoResponse {
    let description = request.description.trim();
    if description.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse {
                success: false,
                message: "description must not be empty",
            }),
        )
            .into_response();
    }
    state.ingestion.append_frame_description(description).await;
    Json(ApiResponse {
        success: true,
        message: "frame description buffered",
    })
    .into_response()
}

async fn flush_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.ingestion.flush().await;
    Json(ApiResponse {
        success: true,
        message: "flushed",
    })
}
