//! Event fan-out to connected sessions. Two addressing modes: a membership
//! snapshot from the registry (room-scoped) or every connected session
//! (room-list refreshes). Best-effort only — a send to a session whose
//! connection just closed is silently dropped.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

use crate::events::ServerEvent;

#[derive(Clone, Default)]
pub struct Hub {
    sessions: Arc<Mutex<HashMap<Uuid, mpsc::UnboundedSender<ServerEvent>>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, session_id: Uuid, tx: mpsc::UnboundedSender<ServerEvent>) {
        self.sessions.lock().await.insert(session_id, tx);
    }

    pub async fn unregister(&self, session_id: Uuid) {
        self.sessions.lock().await.remove(&session_id);
    }

    pub async fn send_to(&self, session_id: Uuid, event: ServerEvent) {
        if let Some(tx) = self.sessions.lock().await.get(&session_id) {
            let _ = tx.send(event);
        }
    }

    pub async fn send_to_many(&self, session_ids: &[Uuid], event: ServerEvent) {
        let sessions = self.sessions.lock().await;
        for id in session_ids {
            if let Some(tx) = sessions.get(id) {
                let _ = tx.send(event.clone());
            }
        }
    }

    pub async fn send_to_all(&self, event: ServerEvent) {
        for tx in self.sessions.lock().await.values() {
            let _ = tx.send(event.clone());
        }
    }
}
