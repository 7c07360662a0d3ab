//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::arena::ArenaCommand;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    info!(conn_id = %conn_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    // Subscribe before registering so the roster update that announces this
    // connection is not missed
    let broadcast_rx = state.arena.subscribe();

    let Some(ack) = state.arena.connect(conn_id).await else {
        error!(conn_id = %conn_id, "Arena unavailable, closing socket");
        return;
    };

    // Tell the client its role and push the current authoritative state
    let assign = ServerMsg::AssignPlayer { role: ack.role };
    if let Err(e) = send_msg(&mut ws_sink, &assign).await {
        error!(conn_id = %conn_id, error = %e, "Failed to send role assignment");
        let _ = state.arena.send(ArenaCommand::Disconnect { conn_id }).await;
        return;
    }
    let initial = ServerMsg::GameStateUpdate(ack.snapshot);
    if let Err(e) = send_msg(&mut ws_sink, &initial).await {
        error!(conn_id = %conn_id, error = %e, "Failed to send initial state");
        let _ = state.arena.send(ArenaCommand::Disconnect { conn_id }).await;
        return;
    }

    run_session(conn_id, ws_sink, ws_stream, &state, broadcast_rx).await;

    // Release the slot (or spectator entry) on any exit path
    state.arena.send(ArenaCommand::Disconnect { conn_id }).await;

    info!(conn_id = %conn_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    conn_id: Uuid,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    state: &AppState,
    mut broadcast_rx: broadcast::Receiver<ServerMsg>,
) {
    let rate_limiter = ConnectionRateLimiter::new();

    // Writer task: arena broadcasts -> WebSocket
    let writer_conn_id = conn_id;
    let writer_handle = tokio::spawn(async move {
        loop {
            match broadcast_rx.recv().await {
                Ok(msg) => {
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(conn_id = %writer_conn_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        conn_id = %writer_conn_id,
                        lagged_count = n,
                        "Client lagged, skipping {} broadcasts", n
                    );
                    // Each broadcast is the full truth, so skipping is safe
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(conn_id = %writer_conn_id, "Broadcast channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> arena
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(conn_id = %conn_id, "Rate limited input message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(ClientMsg::PlayerAction { keys }) => {
                        state
                            .arena
                            .send(ArenaCommand::Input { conn_id, keys })
                            .await;
                    }
                    Ok(ClientMsg::StartGame) => {
                        state.arena.send(ArenaCommand::StartGame { conn_id }).await;
                    }
                    Err(e) => {
                        // Malformed input: no mutation, no error surfaced
                        warn!(conn_id = %conn_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(conn_id = %conn_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(conn_id = %conn_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(conn_id = %conn_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(conn_id = %conn_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
