// Relay core: session bookkeeping, event history, the command mailbox and
// listener fan-out, all owned by one RelayState behind a single lock.

pub mod broadcast;
pub mod history;
pub mod mailbox;
pub mod session;

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::ingest::protocol::IngestRequest;

pub use broadcast::{ListenerGone, ListenerId, ListenerSet, ListenerSink};
pub use history::{Event, EventHistory, HISTORY_CAPACITY};
pub use mailbox::{Command, CommandFilter, CommandMailbox, CommandSource};
pub use session::{Session, SessionRegistry, SessionStatus, SessionSummary};

/// Every structure the relay mutates. Held under one lock so that a
/// registry update, history append and broadcast happen as one step.
#[derive(Default)]
pub struct RelayState {
    pub sessions: SessionRegistry,
    pub history: EventHistory,
    pub mailbox: CommandMailbox,
    pub listeners: ListenerSet,
}

impl RelayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an event to its session, append the enriched event to
    /// history and fan it out. Returns the stored event.
    pub fn publish(&mut self, event_type: &str, request: &IngestRequest, payload: Map<String, Value>) -> Event {
        info!(
            event_type,
            session = session::short_id(&request.session_id),
            project = %history::project_name(&request.cwd),
            "hook event"
        );

        self.sessions.get_or_create(&request.session_id).apply_event(
            event_type,
            &request.last_message,
            &request.cwd,
            &request.timestamp,
        );

        let event = Event::enrich(payload, &request.cwd, self.sessions.summary());
        self.history.append(event.clone());
        self.listeners.broadcast(&event);
        event
    }

    /// Take the oldest pending command accepted by `filter`
    pub fn poll(&mut self, filter: &CommandFilter) -> Option<Command> {
        let command = self.mailbox.pop(filter)?;
        info!(
            source = command.source.as_str(),
            text = %session::tail_chars(&command.text, 40),
            "delivered command to hook"
        );
        Some(command)
    }

    pub fn summary(&self) -> SessionSummary {
        self.sessions.summary()
    }
}

/// Shared handle to the relay state, cloned into every connection handler
#[derive(Clone, Default)]
pub struct Relay {
    state: Arc<Mutex<RelayState>>,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self) -> MutexGuard<'_, RelayState> {
        self.state.lock().await
    }
}
