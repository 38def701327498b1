//! Session management: each browser tab gets its own playground and chat

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use showcase_core::{ChatSession, ImageRef, Outcome, PlaygroundState, RenderIntent};

use crate::blobs;

/// Listing metadata for a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub request_count: u64,
}

/// One session's state
#[derive(Debug, Clone)]
pub struct Session {
    pub info: SessionInfo,
    pub playground: PlaygroundState,
    pub chat: ChatSession,
    /// Set while a chat turn is running outside the lock
    pub chat_in_flight: bool,
}

impl Session {
    fn new(id: String, name: String, chat: ChatSession) -> Self {
        let now = Utc::now();
        Self {
            info: SessionInfo {
                id,
                name,
                created_at: now,
                last_activity: now,
                request_count: 0,
            },
            playground: PlaygroundState::new(),
            chat,
            chat_in_flight: false,
        }
    }

    pub(crate) fn touch(&mut self) {
        self.info.last_activity = Utc::now();
        self.info.request_count += 1;
    }

    fn clear_in_flight(&mut self, lane: Lane) {
        match lane {
            Lane::Playground => self.playground.abandon(),
            Lane::Chat => self.chat_in_flight = false,
        }
    }
}

/// Which in-flight flag of a session a request holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Playground,
    Chat,
}

type SessionMap = Arc<RwLock<HashMap<String, Session>>>;

/// Clears a session's in-flight flag if the request holding it is dropped
/// before writing its result back.
///
/// Call [`InFlightGuard::disarm`] once the result has been recorded.
pub struct InFlightGuard {
    sessions: SessionMap,
    session_id: String,
    lane: Lane,
    armed: bool,
}

impl InFlightGuard {
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!(
            "Request on session '{}' was dropped before finishing; clearing {:?} in-flight flag",
            self.session_id, self.lane
        );
        let lane = self.lane;
        if let Ok(mut sessions) = self.sessions.try_write() {
            if let Some(session) = sessions.get_mut(&self.session_id) {
                session.clear_in_flight(lane);
            }
            return;
        }
        // Lock is busy; finish the cleanup on the runtime
        let sessions = Arc::clone(&self.sessions);
        let session_id = std::mem::take(&mut self.session_id);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Some(session) = sessions.write().await.get_mut(&session_id) {
                        session.clear_in_flight(lane);
                    }
                });
            }
            Err(_) => warn!("No runtime to clear in-flight flag of session '{}'", session_id),
        }
    }
}

/// Manages all active sessions
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    /// Chat settings every new session starts from
    chat_template: ChatSession,
}

impl SessionManager {
    /// Create a new session manager with a default "main" session
    pub fn new(chat_template: ChatSession) -> Self {
        let mut sessions = HashMap::new();
        sessions.insert(
            "main".to_string(),
            Session::new("main".to_string(), "Main".to_string(), chat_template.clone()),
        );
        Self {
            sessions: Arc::new(RwLock::new(sessions)),
            chat_template,
        }
    }

    /// List all sessions, most recently active first
    pub async fn list(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.read().await;
        let mut list: Vec<SessionInfo> = sessions.values().map(|s| s.info.clone()).collect();
        list.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        list
    }

    pub async fn get(&self, id: &str) -> Option<SessionInfo> {
        let sessions = self.sessions.read().await;
        sessions.get(id).map(|s| s.info.clone())
    }

    /// Create a new session, returns its info
    pub async fn create(&self, name: &str) -> SessionInfo {
        let id = uuid::Uuid::new_v4().to_string();
        let session = Session::new(id.clone(), name.to_string(), self.chat_template.clone());
        let info = session.info.clone();
        self.sessions.write().await.insert(id.clone(), session);
        info!("Created session '{}' ({})", name, id);
        info
    }

    /// Run `f` against a session under the write lock.
    ///
    /// Returns `None` if the session does not exist. `f` must not block.
    pub async fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut sessions = self.sessions.write().await;
        sessions.get_mut(id).map(f)
    }

    /// Record activity on a session
    pub async fn record_activity(&self, id: &str) {
        self.with_session(id, |session| {
            session.touch();
            debug!(
                "Session '{}' activity (requests: {})",
                id, session.info.request_count
            );
        })
        .await;
    }

    /// Guard for an in-flight flag that was just set on `id`
    pub fn guard(&self, id: &str, lane: Lane) -> InFlightGuard {
        InFlightGuard {
            sessions: Arc::clone(&self.sessions),
            session_id: id.to_string(),
            lane,
            armed: true,
        }
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Blob id of the image an outcome displays, if any
pub fn displayed_blob(outcome: &Outcome) -> Option<&str> {
    match outcome {
        Outcome::Success(RenderIntent::Image(image)) => match &image.image {
            ImageRef::Url(url) => blobs::blob_id(url),
            ImageRef::Inline(_) => None,
        },
        _ => None,
    }
}
