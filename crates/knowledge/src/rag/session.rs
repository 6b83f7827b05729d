//! Conversation sessions.
//!
//! Each session sits behind its own async mutex. A query holds that lock
//! for its whole duration, so queries in one session run one at a time
//! while different sessions proceed in parallel.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// One question and its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub query: String,
    pub answer: String,
}

/// Ordered prior turns of one conversation.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    turns: Vec<Turn>,
    max_history: usize,
}

impl Session {
    pub fn new(id: impl Into<String>, max_history: usize) -> Self {
        Self {
            id: id.into(),
            turns: Vec::new(),
            max_history,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Append a turn, keeping only the newest `max_history` turns.
    pub fn add_exchange(&mut self, query: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(Turn {
            query: query.into(),
            answer: answer.into(),
        });
        if self.turns.len() > self.max_history {
            let excess = self.turns.len() - self.max_history;
            self.turns.drain(..excess);
        }
    }

    /// History formatted for the prompt, oldest first.
    pub fn history(&self) -> Option<String> {
        if self.turns.is_empty() {
            return None;
        }
        Some(
            self.turns
                .iter()
                .map(|t| format!("User: {}\nAssistant: {}", t.query, t.answer))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }
}

fn new_session_id() -> String {
    format!("session_{}", Uuid::new_v4().simple())
}

/// In-memory sessions for the process lifetime.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
    max_history: usize,
}

impl SessionStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_history,
        }
    }

    /// Create an empty session and return its id.
    pub async fn create_session(&self) -> String {
        let id = new_session_id();
        tracing::debug!("Created session {}", id);
        self.insert_new(id).await.0
    }

    /// Look up a session, creating it when the id is absent or unknown.
    pub async fn get_or_create(&self, id: Option<&str>) -> (String, Arc<Mutex<Session>>) {
        let Some(id) = id.map(str::trim).filter(|id| !id.is_empty()) else {
            let id = new_session_id();
            tracing::debug!("Created session {}", id);
            return self.insert_new(id).await;
        };

        if let Some(session) = self.get(id).await {
            return (id.to_string(), session);
        }
        self.insert_new(id.to_string()).await
    }

    async fn insert_new(&self, id: String) -> (String, Arc<Mutex<Session>>) {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Session::new(&id, self.max_history))))
            .clone();
        (id, session)
    }

    async fn get(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn history(&self, id: &str) -> Option<String> {
        let session = self.get(id).await?;
        let session = session.lock().await;
        session.history()
    }

    pub async fn turns(&self, id: &str) -> Vec<Turn> {
        match self.get(id).await {
            Some(session) => session.lock().await.turns().to_vec(),
            None => Vec::new(),
        }
    }

    /// Record an exchange, creating the session if needed.
    pub async fn add_exchange(&self, id: &str, query: &str, answer: &str) {
        let (_, session) = self.get_or_create(Some(id)).await;
        session.lock().await.add_exchange(query, answer);
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
