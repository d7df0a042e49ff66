use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// Events a client may send over the websocket. Fields come in as options so
/// that a half-filled payload is answered with an error event instead of a
/// dropped frame.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinChat {
        chat_id: Option<String>,
    },
    SendMessage {
        chat_id: Option<String>,
        user_id: Option<String>,
        text: Option<String>,
    },
}

/// Events the server pushes to sessions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Status {
        message: String,
    },
    Error {
        message: String,
    },
    ReceiveMessage {
        chat_id: Uuid,
        sender_id: Uuid,
        text: String,
        username: String,
        timestamp: String,
    },
}

pub type SessionSender = UnboundedSender<ServerEvent>;

/// Live room membership: chat id to the sessions currently subscribed to it.
/// Process-local and ephemeral; nothing here survives a restart.
#[derive(Clone, Default)]
pub struct Rooms {
    inner: Arc<Mutex<HashMap<Uuid, HashMap<Uuid, SessionSender>>>>,
}

impl Rooms {
    /// Add a session to a room. Joining a room the session is already in has
    /// no effect.
    pub fn join(&self, chat_id: Uuid, session_id: Uuid, sender: SessionSender) {
        let mut rooms = self.inner.lock().unwrap();
        rooms
            .entry(chat_id)
            .or_default()
            .entry(session_id)
            .or_insert(sender);
    }

    pub fn leave(&self, chat_id: Uuid, session_id: Uuid) {
        let mut rooms = self.inner.lock().unwrap();
        if let Some(room) = rooms.get_mut(&chat_id) {
            room.remove(&session_id);
            if room.is_empty() {
                rooms.remove(&chat_id);
            }
        }
    }

    /// Drop a session from every room it joined. The connection layer calls
    /// this when the socket closes.
    pub fn leave_all(&self, session_id: Uuid) {
        let mut rooms = self.inner.lock().unwrap();
        rooms.retain(|_, room| {
            room.remove(&session_id);
            !room.is_empty()
        });
    }

    /// Queue `event` for every session in the room, the originator included.
    /// Sends are non-blocking handoffs to each session's forward task;
    /// sessions whose receiving end is gone are pruned on the way through.
    pub fn broadcast(&self, chat_id: Uuid, event: &ServerEvent) {
        let mut rooms = self.inner.lock().unwrap();
        if let Some(room) = rooms.get_mut(&chat_id) {
            room.retain(|_, sender| sender.send(event.clone()).is_ok());
            if room.is_empty() {
                rooms.remove(&chat_id);
            }
        }
    }
}
