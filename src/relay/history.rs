use std::collections::VecDeque;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::session::SessionSummary;

/// Number of events retained for late-joining listeners
pub const HISTORY_CAPACITY: usize = 50;

/// An ingestion payload enriched with its project name and the session
/// summary at the moment it was published
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub payload: Map<String, Value>,
    pub project: String,
    pub active_sessions: SessionSummary,
}

impl Event {
    /// Build an event from the raw request object. Any `project` or
    /// `active_sessions` keys supplied by the client are overwritten.
    pub fn enrich(mut payload: Map<String, Value>, cwd: &str, active_sessions: SessionSummary) -> Self {
        payload.remove("project");
        payload.remove("active_sessions");
        Self {
            payload,
            project: project_name(cwd),
            active_sessions,
        }
    }
}

/// Final path component of `cwd`, or "unknown" when there is none
pub fn project_name(cwd: &str) -> String {
    if cwd.is_empty() {
        return "unknown".to_string();
    }
    Path::new(cwd)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

/// A ring buffer of recent events in arrival order
pub struct EventHistory {
    events: VecDeque<Event>,
    max_size: usize,
}

impl EventHistory {
    pub fn new(max_size: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Append an event, evicting the oldest if the buffer is full
    pub fn append(&mut self, event: Event) {
        if self.events.len() >= self.max_size {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// The last `n` events, oldest first
    pub fn tail(&self, n: usize) -> Vec<Event> {
        let skip = self.events.len().saturating_sub(n);
        self.events.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for EventHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::session::SessionRegistry;
    use serde_json::json;

    fn event(n: usize) -> Event {
        let payload = json!({"event_type": "task_completed", "seq": n});
        let Value::Object(map) = payload else { unreachable!() };
        Event::enrich(map, "/home/dev/proj", SessionRegistry::new().summary())
    }

    fn seqs(events: &[Event]) -> Vec<u64> {
        events
            .iter()
            .map(|e| e.payload["seq"].as_u64().unwrap())
            .collect()
    }

    #[test]
    fn test_history_evicts_oldest_at_capacity() {
        let mut history = EventHistory::default();
        for n in 0..=HISTORY_CAPACITY {
            history.append(event(n));
        }

        assert_eq!(history.len(), HISTORY_CAPACITY);
        let all = history.tail(HISTORY_CAPACITY);
        let expected: Vec<u64> = (1..=HISTORY_CAPACITY as u64).collect();
        assert_eq!(seqs(&all), expected);
    }

    #[test]
    fn test_tail_returns_last_in_arrival_order() {
        let mut history = EventHistory::new(5);
        for n in 0..4 {
            history.append(event(n));
        }

        assert_eq!(seqs(&history.tail(2)), vec![2, 3]);
        assert_eq!(seqs(&history.tail(10)), vec![0, 1, 2, 3]);
        assert!(history.tail(0).is_empty());
    }

    #[test]
    fn test_project_name_from_cwd() {
        assert_eq!(project_name("/home/dev/myproject"), "myproject");
        assert_eq!(project_name("/home/dev/myproject/"), "myproject");
        assert_eq!(project_name(""), "unknown");
        assert_eq!(project_name("/"), "unknown");
    }

    #[test]
    fn test_enrich_overrides_client_fields() {
        let Value::Object(map) = json!({"project": "spoofed", "active_sessions": 7, "cwd": "/x/real"})
        else {
            unreachable!()
        };
        let event = Event::enrich(map, "/x/real", SessionRegistry::new().summary());
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["project"], "real");
        assert_eq!(value["active_sessions"]["total"], 0);
        assert_eq!(value["cwd"], "/x/real");
    }
}
