use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

/// Upper bound on the retained tail of a session's last message
pub const MAX_LAST_MESSAGE_CHARS: usize = 3000;

pub const TASK_COMPLETED: &str = "task_completed";
pub const INPUT_NEEDED: &str = "input_needed";
pub const PERMISSION_REQUEST: &str = "permission_request";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Working,
    Idle,
    WaitingForInput,
}

/// One tracked run of the automation tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub status: SessionStatus,
    pub last_event_type: String,
    pub last_message: String,
    pub cwd: String,
    pub last_event_time: String,
}

impl Session {
    fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            status: SessionStatus::Working,
            last_event_type: String::new(),
            last_message: String::new(),
            cwd: String::new(),
            last_event_time: String::new(),
        }
    }

    /// Record an event against this session and apply the status transition.
    /// Unlisted event types leave the status as it was.
    pub fn apply_event(&mut self, event_type: &str, message: &str, cwd: &str, timestamp: &str) {
        self.last_event_type = event_type.to_string();
        self.last_message = tail_chars(message, MAX_LAST_MESSAGE_CHARS).to_string();
        self.cwd = cwd.to_string();
        self.last_event_time = timestamp.to_string();

        match event_type {
            TASK_COMPLETED => self.status = SessionStatus::Idle,
            INPUT_NEEDED | PERMISSION_REQUEST => self.status = SessionStatus::WaitingForInput,
            _ => {}
        }
    }
}

/// Aggregate view of every known session, computed on demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total: usize,
    pub sessions: Vec<Session>,
    pub waiting: usize,
    pub working: usize,
    pub idle: usize,
}

/// Sessions keyed by id, kept in creation order
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Vec<Session>,
    index: HashMap<String, usize>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, session_id: &str) -> &mut Session {
        let idx = match self.index.get(session_id) {
            Some(&idx) => idx,
            None => {
                let idx = self.sessions.len();
                self.sessions.push(Session::new(session_id));
                self.index.insert(session_id.to_string(), idx);
                info!(
                    session = short_id(session_id),
                    total = self.sessions.len(),
                    "new session"
                );
                idx
            }
        };
        &mut self.sessions[idx]
    }

    pub fn get(&self, session_id: &str) -> Option<&Session> {
        self.index.get(session_id).map(|&idx| &self.sessions[idx])
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn summary(&self) -> SessionSummary {
        let count = |status| self.sessions.iter().filter(|s| s.status == status).count();
        SessionSummary {
            total: self.sessions.len(),
            sessions: self.sessions.clone(),
            waiting: count(SessionStatus::WaitingForInput),
            working: count(SessionStatus::Working),
            idle: count(SessionStatus::Idle),
        }
    }
}

/// Last `max` chars of `s`, on a char boundary
pub fn tail_chars(s: &str, max: usize) -> &str {
    let count = s.chars().count();
    if count <= max {
        return s;
    }
    let start = s
        .char_indices()
        .nth(count - max)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &s[start..]
}

/// Session ids are long UUIDs; logs only need a prefix.
pub fn short_id(session_id: &str) -> &str {
    match session_id.char_indices().nth(12) {
        Some((i, _)) => &session_id[..i],
        None => session_id,
    }
}
