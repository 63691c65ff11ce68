use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Unique identifier for a listener connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// The listener's outbound half has been dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerGone;

/// Somewhere a serialized frame can be queued for one listener
pub trait ListenerSink: Send + Sync {
    fn send(&self, frame: Arc<str>) -> Result<(), ListenerGone>;
}

impl ListenerSink for mpsc::UnboundedSender<Arc<str>> {
    fn send(&self, frame: Arc<str>) -> Result<(), ListenerGone> {
        mpsc::UnboundedSender::send(self, frame).map_err(|_| ListenerGone)
    }
}

/// Currently admitted listener connections
#[derive(Default)]
pub struct ListenerSet {
    listeners: HashMap<ListenerId, Box<dyn ListenerSink>>,
    next_id: u64,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sink: Box<dyn ListenerSink>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.insert(id, sink);
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.listeners.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Queue a frame for one listener, pruning it if it has gone away
    pub fn send_to(&mut self, id: ListenerId, frame: Arc<str>) -> Result<(), ListenerGone> {
        let sink = self.listeners.get(&id).ok_or(ListenerGone)?;
        let result = sink.send(frame);
        if result.is_err() {
            self.listeners.remove(&id);
        }
        result
    }

    /// Serialize `message` once and send it to every listener. Listeners
    /// whose send fails are removed after the pass. Returns how many
    /// listeners received it.
    pub fn broadcast<T: Serialize>(&mut self, message: &T) -> usize {
        if self.listeners.is_empty() {
            debug!("no listeners connected");
            return 0;
        }

        let frame: Arc<str> = match serde_json::to_string(message) {
            Ok(json) => json.into(),
            Err(e) => {
                error!("failed to serialize broadcast: {}", e);
                return 0;
            }
        };

        let mut gone = Vec::new();
        for (&id, sink) in &self.listeners {
            if sink.send(Arc::clone(&frame)).is_err() {
                gone.push(id);
            }
        }

        for id in &gone {
            self.listeners.remove(id);
        }
        if !gone.is_empty() {
            info!(pruned = gone.len(), "pruned dead listener connection(s)");
        }

        let delivered = self.listeners.len();
        info!(listeners = delivered, "broadcast event");
        delivered
    }
}
