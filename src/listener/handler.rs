use tracing::{error, info, warn};

use super::protocol::{ClientMessage, ServerMessage};
use crate::relay::session::tail_chars;
use crate::relay::{Command, CommandSource, ListenerId, ListenerSink, RelayState};

/// Events included in the catch-up sent to a newly admitted listener
pub const STATE_SYNC_EVENTS: usize = 5;

/// Events returned for a `history` request
pub const HISTORY_RESPONSE_EVENTS: usize = 10;

/// Add a listener to the set and queue its `state_sync` before any later
/// broadcast can reach it.
pub fn admit_listener(state: &mut RelayState, sink: Box<dyn ListenerSink>) -> ListenerId {
    let id = state.listeners.add(sink);
    let sync = ServerMessage::StateSync {
        sessions: state.summary(),
        recent_events: state.history.tail(STATE_SYNC_EVENTS),
    };
    reply(state, id, &sync);
    id
}

/// Dispatch one listener message and queue the reply, if any, on that
/// listener's connection.
pub fn handle_client_message(state: &mut RelayState, id: ListenerId, peer: &str, msg: ClientMessage) {
    if let Some(response) = dispatch(state, peer, msg) {
        reply(state, id, &response);
    }
}

fn dispatch(state: &mut RelayState, peer: &str, msg: ClientMessage) -> Option<ServerMessage> {
    match msg {
        ClientMessage::StatusQuery => {
            info!(peer, "status query");
            Some(ServerMessage::StatusResponse {
                sessions: state.summary(),
                pending_commands: state.mailbox.len(),
            })
        }
        ClientMessage::Approve => {
            state.mailbox.push(Command::new("y", CommandSource::Approve));
            info!(peer, "approve queued");
            Some(ServerMessage::queued("approve"))
        }
        ClientMessage::Deny => {
            state.mailbox.push(Command::new("n", CommandSource::Deny));
            info!(peer, "deny queued");
            Some(ServerMessage::queued("deny"))
        }
        ClientMessage::Command { text } => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Some(ServerMessage::error("empty command"));
            }
            state.mailbox.push(Command::new(trimmed, CommandSource::Voice));
            info!(peer, text = %tail_chars(trimmed, 80), "command queued");
            Some(ServerMessage::queued(trimmed))
        }
        ClientMessage::History => Some(ServerMessage::HistoryResponse {
            events: state.history.tail(HISTORY_RESPONSE_EVENTS),
        }),
        ClientMessage::Unknown => {
            warn!(peer, "unknown message type from listener");
            None
        }
    }
}

fn reply(state: &mut RelayState, id: ListenerId, message: &ServerMessage) {
    let frame = match message.to_frame() {
        Ok(frame) => frame,
        Err(e) => {
            error!("failed to serialize listener reply: {}", e);
            return;
        }
    };
    if state.listeners.send_to(id, frame).is_err() {
        info!(listener = id.raw(), "listener gone before reply");
    }
}
