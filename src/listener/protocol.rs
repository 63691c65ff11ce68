use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::relay::{Event, SessionSummary};

/// Messages a listener may send, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    StatusQuery,
    Approve,
    Deny,
    Command {
        #[serde(default)]
        text: String,
    },
    History,
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Replies and pushes sent to listeners. Broadcast events are sent as the
/// bare enriched event rather than through this enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    StateSync {
        sessions: SessionSummary,
        recent_events: Vec<Event>,
    },
    StatusResponse {
        sessions: SessionSummary,
        pending_commands: usize,
    },
    CommandAck {
        text: String,
        status: String,
    },
    HistoryResponse {
        events: Vec<Event>,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn queued(text: impl Into<String>) -> Self {
        ServerMessage::CommandAck {
            text: text.into(),
            status: "queued".to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    pub fn to_frame(&self) -> serde_json::Result<Arc<str>> {
        serde_json::to_string(self).map(Arc::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_client_type() {
        assert_eq!(
            ClientMessage::parse(r#"{"type":"status_query"}"#).unwrap(),
            ClientMessage::StatusQuery
        );
        assert_eq!(
            ClientMessage::parse(r#"{"type":"approve"}"#).unwrap(),
            ClientMessage::Approve
        );
        assert_eq!(
            ClientMessage::parse(r#"{"type":"deny","extra":true}"#).unwrap(),
            ClientMessage::Deny
        );
        assert_eq!(
            ClientMessage::parse(r#"{"type":"command","text":"add tests"}"#).unwrap(),
            ClientMessage::Command {
                text: "add tests".to_string()
            }
        );
        assert_eq!(
            ClientMessage::parse(r#"{"type":"history"}"#).unwrap(),
            ClientMessage::History
        );
    }

    #[test]
    fn command_without_text_defaults_empty() {
        assert_eq!(
            ClientMessage::parse(r#"{"type":"command"}"#).unwrap(),
            ClientMessage::Command {
                text: String::new()
            }
        );
    }

    #[test]
    fn unrecognized_type_is_unknown() {
        assert_eq!(
            ClientMessage::parse(r#"{"type":"dance"}"#).unwrap(),
            ClientMessage::Unknown
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(ClientMessage::parse("{nope").is_err());
        assert!(ClientMessage::parse(r#"{"text":"no type"}"#).is_err());
    }

    #[test]
    fn ack_wire_shape() {
        insta::assert_snapshot!(
            ServerMessage::queued("approve").to_frame().unwrap().to_string(),
            @r#"{"type":"command_ack","text":"approve","status":"queued"}"#
        );
    }

    #[test]
    fn error_wire_shape() {
        insta::assert_snapshot!(
            ServerMessage::error("empty command").to_frame().unwrap().to_string(),
            @r#"{"type":"error","message":"empty command"}"#
        );
    }
}
