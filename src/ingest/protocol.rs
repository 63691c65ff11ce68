use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::relay::{Command, CommandFilter};

/// What the hook wants back from this connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    #[default]
    Notify,
    PollCommand,
    #[serde(other)]
    Unknown,
}

/// One JSON object sent by a hook process per connection.
/// `event_type` present means publish; `request: poll_command` means poll.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub session_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub cwd: String,
    #[serde(deserialize_with = "null_as_default")]
    pub timestamp: String,
    #[serde(deserialize_with = "null_as_default")]
    pub transcript_path: String,
    #[serde(deserialize_with = "null_as_default")]
    pub last_message: String,
    #[serde(deserialize_with = "null_as_default")]
    pub notification_message: String,
    #[serde(deserialize_with = "null_as_default")]
    pub notification_title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub request: RequestKind,
    #[serde(
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub command_filter: Vec<String>,
}

/// Hooks send `null` for fields they have no value for; treat it as absent.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl IngestRequest {
    pub fn poll(filter: &[&str]) -> Self {
        Self {
            request: RequestKind::PollCommand,
            command_filter: filter.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    /// The event type, treating an empty string as absent
    pub fn publish_type(&self) -> Option<&str> {
        self.event_type.as_deref().filter(|t| !t.is_empty())
    }

    pub fn wants_command(&self) -> bool {
        self.request == RequestKind::PollCommand
    }

    pub fn filter(&self) -> CommandFilter {
        CommandFilter::from_tags(&self.command_filter)
    }
}

/// Why an ingestion payload was refused
#[derive(Debug)]
pub enum DecodeError {
    Json(serde_json::Error),
    NotAnObject,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Json(e) => write!(f, "bad JSON: {}", e),
            DecodeError::NotAnObject => write!(f, "payload is not a JSON object"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Parse raw bytes into the typed request plus the untouched object, which
/// becomes the body of the broadcast event.
pub fn decode(bytes: &[u8]) -> Result<(IngestRequest, Map<String, Value>), DecodeError> {
    let value: Value = serde_json::from_slice(bytes).map_err(DecodeError::Json)?;
    let Value::Object(map) = value else {
        return Err(DecodeError::NotAnObject);
    };
    let request = IngestRequest::deserialize(Value::Object(map.clone())).map_err(DecodeError::Json)?;
    Ok((request, map))
}

/// Reply to every successfully parsed request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestResponse {
    pub status: String,
    pub command: Option<Command>,
}

impl IngestResponse {
    pub fn ok(command: Option<Command>) -> Self {
        Self {
            status: "ok".to_string(),
            command,
        }
    }
}
