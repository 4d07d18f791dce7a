//! Flat-file persistence: one JSON array of room names, one JSON array of
//! messages per room. Every save is a full-file rewrite, every failure is
//! logged and swallowed — the service keeps running in-memory-only.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::registry::ChatMessage;

pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn names_path(&self) -> PathBuf {
        self.dir.join("rooms.json")
    }

    // room names double as file names, unsanitized
    fn messages_path(&self, room: &str) -> PathBuf {
        self.dir.join("messages").join(format!("{room}.json"))
    }

    pub fn save_room_names(&self, names: &[String]) {
        if let Err(err) = write_json(&self.names_path(), &names) {
            tracing::warn!(%err, "failed to save room list");
        }
    }

    pub fn save_room_messages(&self, room: &str, messages: &[ChatMessage]) {
        if let Err(err) = write_json(&self.messages_path(room), &messages) {
            tracing::warn!(room, %err, "failed to save room messages");
        }
    }

    pub fn load_room_names(&self) -> Vec<String> {
        read_json(&self.names_path())
    }

    pub fn load_room_messages(&self, room: &str) -> Vec<ChatMessage> {
        read_json(&self.messages_path(room))
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_vec_pretty(value)?)?;
    Ok(())
}

/// Missing file is an empty result; anything else that goes wrong is
/// logged and also treated as empty.
fn read_json<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "failed to read persisted file");
            return Vec::new();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "failed to parse persisted file");
            Vec::new()
        }
    }
}
