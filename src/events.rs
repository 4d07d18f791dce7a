//! Wire events exchanged over the websocket, tagged by an `event` field.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::registry::ChatMessage;

/// Client → server.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ClientEvent {
    CreateRoom {
        room: String,
    },
    JoinRoom {
        room: String,
    },
    SendMessage {
        room: String,
        message: String,
        username: String,
    },
}

/// Server → client. Delivery is addressed by the gateway: some of these go
/// to a single session, some to a room, `RoomList` to everyone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ServerEvent {
    RoomList {
        rooms: Vec<String>,
    },
    RoomCreated {
        room: String,
    },
    RoomJoined {
        room: String,
    },
    PreviousMessages {
        messages: Vec<ChatMessage>,
    },
    Error {
        message: String,
    },
    Message {
        #[serde(flatten)]
        message: ChatMessage,
    },
    #[serde(rename_all = "camelCase")]
    UserJoined {
        session_id: Uuid,
    },
    #[serde(rename_all = "camelCase")]
    UserLeft {
        session_id: Uuid,
    },
}
