use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use cam_grid_common::decode::{decode_frame, DecodeError};
use cam_grid_common::frame::{ClientId, FramePush};
use std::sync::atomic::Ordering;
use tracing::debug;

use crate::http::AppState;
use crate::store::FrameStore;

/// Why a push event was discarded. None of these are surfaced to the
/// producer; they exist so tests and logs can see what happened.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("event is not a valid push message: {0}")]
    InvalidMessage(#[from] serde_json::Error),
    #[error("event missing client id")]
    MissingClientId,
    #[error("event missing image payload")]
    EmptyImage,
    #[error("image payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Process one inbound push event: parse, validate, decode, store.
///
/// Two-outcome by design: either the frame lands in the store under its
/// client id, or the event is discarded with a reason. Never panics on
/// arbitrary input, and may run concurrently for any mix of clients.
pub fn ingest_event(store: &FrameStore, text: &str) -> Result<ClientId, IngestError> {
    let push: FramePush = serde_json::from_str(text)?;

    let id = match push.client_id {
        Some(id) if !id.is_falsy() => id,
        _ => return Err(IngestError::MissingClientId),
    };
    if push.image.is_empty() {
        return Err(IngestError::EmptyImage);
    }

    let bytes = BASE64.decode(push.image.as_bytes())?;
    let frame = decode_frame(&bytes)?;
    store.put(id.clone(), frame);
    Ok(id)
}

/// GET /ws — upgrade a producer connection.
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One task per producer socket. A bad event is dropped, not an excuse to
/// close the socket; the socket ends when the peer goes away.
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    debug!("producer socket connected");

    while let Some(msg) = socket.recv().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                debug!(error = %e, "producer socket error");
                break;
            }
        };

        match msg {
            Message::Text(text) => match ingest_event(&state.store, &text) {
                Ok(_) => {
                    let total = state.frames_total.fetch_add(1, Ordering::Relaxed) + 1;
                    if total % 100 == 0 {
                        debug!(total, clients = state.store.len(), "frames ingested");
                    }
                }
                Err(e) => debug!(error = %e, "discarding push event"),
            },
            Message::Close(_) => break,
            // Pings are answered by axum; binary and pong frames carry
            // nothing for us.
            _ => {}
        }
    }

    debug!("producer socket disconnected");
}
