//! In-memory room registry: room name → membership + ordered message log.
//! All mutation goes through here; every mutation persists synchronously
//! before returning. Rooms are never deleted once created.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::persist::Store;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub user: String,
    pub text: String,
    pub time: String,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("room \"{0}\" already exists")]
    AlreadyExists(String),
    #[error("room \"{0}\" does not exist")]
    NotFound(String),
    #[error("room name cannot be empty")]
    EmptyRoomName,
}

#[derive(Default)]
struct Room {
    sessions: HashSet<Uuid>,
    messages: Vec<ChatMessage>,
}

pub struct Registry {
    store: Store,
    // creation order, mirrored by the rooms map keys
    names: Vec<String>,
    rooms: HashMap<String, Room>,
}

impl Registry {
    /// Rebuild the registry from whatever the store last saved. Membership
    /// is transient and always starts empty.
    pub fn load(store: Store) -> Self {
        let names = store.load_room_names();
        let rooms = names
            .iter()
            .map(|name| {
                let room = Room {
                    sessions: HashSet::new(),
                    messages: store.load_room_messages(name),
                };
                (name.clone(), room)
            })
            .collect();

        Self { store, names, rooms }
    }

    pub fn create_room(&mut self, name: &str) -> Result<(), RegistryError> {
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyRoomName);
        }
        if self.rooms.contains_key(name) {
            return Err(RegistryError::AlreadyExists(name.to_owned()));
        }

        self.rooms.insert(name.to_owned(), Room::default());
        self.names.push(name.to_owned());
        self.store.save_room_names(&self.names);
        Ok(())
    }

    /// Adds the session to the room (idempotent) and hands back the full
    /// message log for replay to the joining client.
    pub fn join_room(&mut self, session_id: Uuid, name: &str) -> Result<&[ChatMessage], RegistryError> {
        let room = self
            .rooms
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_owned()))?;

        room.sessions.insert(session_id);
        Ok(&room.messages)
    }

    /// Appends a message with a server-generated timestamp and persists the
    /// room's log. Invalid payloads (unknown room, empty author or text) are
    /// dropped with a warning — the sender never sees an error.
    pub fn append_message(&mut self, name: &str, user: &str, text: &str) -> Option<ChatMessage> {
        if name.is_empty() || user.is_empty() || text.is_empty() {
            tracing::warn!(room = name, "dropping message with missing fields");
            return None;
        }
        let Some(room) = self.rooms.get_mut(name) else {
            tracing::warn!(room = name, "dropping message for unknown room");
            return None;
        };

        let message = ChatMessage {
            user: user.to_owned(),
            text: text.to_owned(),
            time: wall_clock(),
        };
        room.messages.push(message.clone());
        self.store.save_room_messages(name, &room.messages);
        Some(message)
    }

    /// Drops the session from every room it was part of; returns the rooms
    /// that changed so the gateway can notify their remaining members.
    pub fn remove_session(&mut self, session_id: Uuid) -> Vec<String> {
        let mut changed = Vec::new();
        for name in &self.names {
            if let Some(room) = self.rooms.get_mut(name)
                && room.sessions.remove(&session_id)
            {
                changed.push(name.clone());
            }
        }
        changed
    }

    pub fn room_names(&self) -> Vec<String> {
        self.names.clone()
    }

    /// Membership snapshot for fan-out addressing.
    pub fn members(&self, name: &str) -> Vec<Uuid> {
        self.rooms
            .get(name)
            .map(|room| room.sessions.iter().copied().collect())
            .unwrap_or_default()
    }
}

fn wall_clock() -> String {
    let now = time::OffsetDateTime::now_utc();
    now.format(&time::format_description::well_known::Rfc2822)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(dir: &tempfile::TempDir) -> Registry {
        Registry::load(Store::new(dir.path()))
    }

    #[test]
    fn create_room_succeeds_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = registry(&dir);

        assert_eq!(reg.create_room("general"), Ok(()));
        assert_eq!(
            reg.create_room("general"),
            Err(RegistryError::AlreadyExists("general".to_owned()))
        );
    }

    #[test]
    fn create_room_rejects_empty_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = registry(&dir);

        assert_eq!(reg.create_room(""), Err(RegistryError::EmptyRoomName));
        assert_eq!(reg.create_room("   "), Err(RegistryError::EmptyRoomName));
        assert!(reg.room_names().is_empty());
    }

    #[test]
    fn join_unknown_room_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = registry(&dir);

        assert_eq!(
            reg.join_room(Uuid::now_v7(), "nowhere").err(),
            Some(RegistryError::NotFound("nowhere".to_owned()))
        );
    }

    #[test]
    fn join_returns_full_log_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = registry(&dir);
        reg.create_room("general").unwrap();
        reg.append_message("general", "alice", "hi").unwrap();
        reg.append_message("general", "bob", "hey").unwrap();

        let session = Uuid::now_v7();
        let log = reg.join_room(session, "general").unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].text, "hi");
        assert_eq!(log[1].text, "hey");

        reg.join_room(session, "general").unwrap();
        assert_eq!(reg.members("general"), vec![session]);
    }

    #[test]
    fn append_stamps_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = registry(&dir);
        reg.create_room("general").unwrap();

        let stored = reg.append_message("general", "alice", "hi").unwrap();
        assert_eq!(stored.user, "alice");
        assert_eq!(stored.text, "hi");
        assert!(!stored.time.is_empty());

        let on_disk = Store::new(dir.path()).load_room_messages("general");
        assert_eq!(on_disk, vec![stored]);
    }

    #[test]
    fn append_drops_invalid_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = registry(&dir);
        reg.create_room("general").unwrap();

        assert_eq!(reg.append_message("general", "", "hi"), None);
        assert_eq!(reg.append_message("general", "alice", ""), None);
        assert_eq!(reg.append_message("", "alice", "hi"), None);
        assert_eq!(reg.append_message("nowhere", "alice", "hi"), None);
        assert!(reg.join_room(Uuid::now_v7(), "general").unwrap().is_empty());
    }

    #[test]
    fn remove_session_purges_every_room() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = registry(&dir);
        reg.create_room("general").unwrap();
        reg.create_room("random").unwrap();

        let gone = Uuid::now_v7();
        let stays = Uuid::now_v7();
        reg.join_room(gone, "general").unwrap();
        reg.join_room(gone, "random").unwrap();
        reg.join_room(stays, "general").unwrap();

        let mut changed = reg.remove_session(gone);
        changed.sort();
        assert_eq!(changed, vec!["general".to_owned(), "random".to_owned()]);
        assert_eq!(reg.members("general"), vec![stays]);
        assert!(reg.members("random").is_empty());

        // removing an unknown session changes nothing
        assert!(reg.remove_session(gone).is_empty());
    }

    #[test]
    fn restart_reloads_names_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut reg = registry(&dir);
            reg.create_room("general").unwrap();
            reg.create_room("random").unwrap();
            reg.join_room(Uuid::now_v7(), "general").unwrap();
            reg.append_message("general", "alice", "hi").unwrap();
        }

        let reloaded = registry(&dir);
        assert_eq!(
            reloaded.room_names(),
            vec!["general".to_owned(), "random".to_owned()]
        );
        let log = Store::new(dir.path()).load_room_messages("general");
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].user, "alice");
        // membership is transient
        assert!(reloaded.members("general").is_empty());
    }
}
