//! Per-connection session gateway: translates inbound events into registry
//! operations and schedules outbound events through the fan-out hub.

use axum::{
    debug_handler,
    extract::{State, WebSocketUpgrade, ws::WebSocket},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::AppState;
use crate::events::{ClientEvent, ServerEvent};

/// Session lifecycle. `InRoom` means joined to at least one room; the
/// protocol never forces a session out of a room it already joined.
#[derive(Debug, Clone, Copy, PartialEq)]
enum SessionState {
    Roomless,
    InRoom,
    Terminated,
}

#[debug_handler]
pub async fn chat_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let session_id = Uuid::now_v7();
    let (tx, mut rx) = mpsc::unbounded_channel();
    state.hub.register(session_id, tx).await;
    tracing::debug!(%session_id, "session connected");

    let (mut sender, mut receiver) = socket.split();
    let forward = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(frame) = serde_json::to_string(&event) else {
                continue;
            };
            if sender.send(frame.into()).await.is_err() {
                break;
            }
        }
    });

    // the new session gets the current room list, nobody else
    let rooms = state.registry.lock().await.room_names();
    state.hub.send_to(session_id, ServerEvent::RoomList { rooms }).await;

    let mut session = SessionState::Roomless;
    while let Some(Ok(frame)) = receiver.next().await {
        let Ok(event) = serde_json::from_slice(&frame.into_data()) else {
            continue;
        };
        handle_event(&state, session_id, &mut session, event).await;
    }

    session = SessionState::Terminated;
    tracing::debug!(%session_id, state = ?session, "session closed");
    disconnect(&state, session_id).await;
    forward.abort();
}

async fn handle_event(
    state: &AppState,
    session_id: Uuid,
    session: &mut SessionState,
    event: ClientEvent,
) {
    match event {
        ClientEvent::CreateRoom { room } => {
            let result = {
                let mut registry = state.registry.lock().await;
                registry.create_room(&room).map(|()| {
                    // the creator is a member from the start
                    let _ = registry.join_room(session_id, &room);
                    registry.room_names()
                })
            };
            match result {
                Ok(rooms) => {
                    *session = SessionState::InRoom;
                    state
                        .hub
                        .send_to(session_id, ServerEvent::RoomCreated { room })
                        .await;
                    state.hub.send_to_all(ServerEvent::RoomList { rooms }).await;
                }
                Err(err) => {
                    state
                        .hub
                        .send_to(session_id, ServerEvent::Error { message: err.to_string() })
                        .await;
                }
            }
        }
        ClientEvent::JoinRoom { room } => {
            let result = {
                let mut registry = state.registry.lock().await;
                match registry.join_room(session_id, &room) {
                    Ok(log) => Ok((log.to_vec(), registry.members(&room))),
                    Err(err) => Err(err),
                }
            };
            match result {
                Ok((messages, members)) => {
                    *session = SessionState::InRoom;
                    state
                        .hub
                        .send_to(session_id, ServerEvent::RoomJoined { room })
                        .await;
                    state
                        .hub
                        .send_to(session_id, ServerEvent::PreviousMessages { messages })
                        .await;
                    let others: Vec<Uuid> =
                        members.into_iter().filter(|id| *id != session_id).collect();
                    state
                        .hub
                        .send_to_many(&others, ServerEvent::UserJoined { session_id })
                        .await;
                }
                Err(err) => {
                    state
                        .hub
                        .send_to(session_id, ServerEvent::Error { message: err.to_string() })
                        .await;
                }
            }
        }
        ClientEvent::SendMessage { room, message, username } => {
            // invalid payloads are dropped inside the registry, no error event
            let stored = {
                let mut registry = state.registry.lock().await;
                registry
                    .append_message(&room, &username, &message)
                    .map(|message| (message, registry.members(&room)))
            };
            if let Some((message, members)) = stored {
                state
                    .hub
                    .send_to_many(&members, ServerEvent::Message { message })
                    .await;
            }
        }
    }
}

/// Membership cleanup: tell every room the session was in, then refresh the
/// room list for everyone still connected.
async fn disconnect(state: &AppState, session_id: Uuid) {
    state.hub.unregister(session_id).await;

    let (left, rooms) = {
        let mut registry = state.registry.lock().await;
        let changed = registry.remove_session(session_id);
        let left: Vec<(String, Vec<Uuid>)> = changed
            .into_iter()
            .map(|room| {
                let members = registry.members(&room);
                (room, members)
            })
            .collect();
        (left, registry.room_names())
    };

    for (room, members) in left {
        tracing::debug!(%session_id, room, "session left room");
        state
            .hub
            .send_to_many(&members, ServerEvent::UserLeft { session_id })
            .await;
    }
    state.hub.send_to_all(ServerEvent::RoomList { rooms }).await;
}
