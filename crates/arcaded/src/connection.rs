//! WebSocket connection handling
//!
//! One reader/writer task pair per socket. The reader decodes frames through
//! the codec and posts them to the session actor; the writer drains the
//! bounded outbound queue, emits heartbeat pings, and honors out-of-band
//! close requests so a close always reaches a slow consumer. Neither task
//! touches session state.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant};
use tokio_util::sync::CancellationToken;

use arcade_core::codec;
use arcade_core::protocol::{ClientMessage, CloseReason, ServerMessage, WsRole};

use crate::session::{conn_channel, ConnHandle, SessionCommand, SessionHandle};
use crate::state::AppState;

/// WebSocket upgrade for `/ws/reviewarcade/{code}`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(code): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(session) = state.registry.lookup(&code) else {
        return (StatusCode::NOT_FOUND, "unknown session").into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(socket, session, state))
}

async fn handle_socket(socket: WebSocket, session: SessionHandle, state: Arc<AppState>) {
    let conn_id = state.allocate_conn_id();
    let timings = state.timings;
    let (ws_tx, mut ws_rx) = socket.split();

    let (handle, msg_rx, close_rx) = conn_channel(conn_id, timings.outbound_queue_size);
    let cancel = CancellationToken::new();
    let writer = tokio::spawn(run_writer(
        ws_tx,
        msg_rx,
        close_rx,
        cancel.clone(),
        timings.heartbeat_interval,
    ));

    // Handshake: the first frame must be `init`, within the deadline
    let attach = match timeout(timings.init_deadline, read_text(&mut ws_rx)).await {
        Err(_) => {
            tracing::info!("Conn {}: no init within deadline", conn_id);
            handle.close(CloseReason::AuthRequired);
            let _ = writer.await;
            return;
        }
        Ok(None) => {
            cancel.cancel();
            let _ = writer.await;
            return;
        }
        Ok(Some(text)) => match codec::decode_client(&text) {
            Ok(ClientMessage::Init { role, token }) => match role {
                WsRole::Host => match state.auth.verify_token(&token) {
                    Ok(teacher_id) => SessionCommand::HostConnected {
                        conn: handle.clone(),
                        teacher_id,
                    },
                    Err(_) => {
                        tracing::info!("Conn {}: bad host credential", conn_id);
                        handle.close(CloseReason::AuthInvalid);
                        let _ = writer.await;
                        return;
                    }
                },
                WsRole::Player => SessionCommand::PlayerConnected {
                    conn: handle.clone(),
                    token,
                },
            },
            _ => {
                tracing::info!("Conn {}: first frame was not init", conn_id);
                handle.close(CloseReason::AuthRequired);
                let _ = writer.await;
                return;
            }
        },
    };

    if !session.send(attach).await {
        handle.close(CloseReason::SessionEnded);
        let _ = writer.await;
        return;
    }

    // Reader loop: decode and forward until the socket dies
    read_loop(&mut ws_rx, &session, &handle, conn_id).await;

    cancel.cancel();
    session.send(SessionCommand::Disconnect { conn_id }).await;
    let _ = writer.await;
    tracing::debug!("Conn {}: closed", conn_id);
}

async fn read_loop(
    ws_rx: &mut SplitStream<WebSocket>,
    session: &SessionHandle,
    handle: &ConnHandle,
    conn_id: u64,
) {
    while let Some(frame) = ws_rx.next().await {
        let message = match frame {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("Conn {}: socket error: {}", conn_id, e);
                break;
            }
        };
        match message {
            Message::Text(text) => match codec::decode_client(text.as_str()) {
                Ok(decoded) => {
                    if !session
                        .send(SessionCommand::Frame {
                            conn_id,
                            message: decoded,
                        })
                        .await
                    {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!("Conn {}: bad message: {}", conn_id, e);
                    handle.send(ServerMessage::error(
                        arcade_core::protocol::ErrorKind::BadMessage,
                        e.to_string(),
                    ));
                }
            },
            Message::Binary(_) => {
                handle.send(ServerMessage::error(
                    arcade_core::protocol::ErrorKind::BadMessage,
                    "binary frames are not supported",
                ));
            }
            Message::Close(_) => break,
            // Transport-level ping/pong is handled by the stack
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}

/// Wait for the next text frame, skipping transport frames
async fn read_text(ws_rx: &mut SplitStream<WebSocket>) -> Option<String> {
    while let Some(frame) = ws_rx.next().await {
        match frame {
            Ok(Message::Text(text)) => return Some(text.as_str().to_string()),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
    None
}

/// Writer task: drain the outbound queue, send heartbeat pings, and close
/// on request. The close channel is polled first so a slow consumer's close
/// does not wait behind its backlog.
async fn run_writer(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut msg_rx: mpsc::Receiver<ServerMessage>,
    mut close_rx: mpsc::Receiver<CloseReason>,
    cancel: CancellationToken,
    heartbeat_interval: Duration,
) {
    let mut ping = interval_at(
        Instant::now() + heartbeat_interval,
        heartbeat_interval,
    );
    let mut close_reason: Option<CloseReason> = None;

    loop {
        tokio::select! {
            biased;

            reason = close_rx.recv() => {
                close_reason = reason;
                break;
            }

            _ = cancel.cancelled() => break,

            message = msg_rx.recv() => match message {
                Some(message) => {
                    let Ok(text) = codec::encode_server(&message) else {
                        tracing::error!("Failed to encode outbound message");
                        continue;
                    };
                    if ws_tx.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },

            _ = ping.tick() => {
                let ping_msg = ServerMessage::Ping {
                    t: chrono::Utc::now().timestamp_millis() as u64,
                };
                let Ok(text) = codec::encode_server(&ping_msg) else {
                    continue;
                };
                if ws_tx.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    if let Some(reason) = close_reason {
        let frame = CloseFrame {
            code: reason.ws_code(),
            reason: reason.as_str().into(),
        };
        let _ = ws_tx.send(Message::Close(Some(frame))).await;
    }
    let _ = ws_tx.close().await;
}
