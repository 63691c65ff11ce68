use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

/// Where a queued command came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandSource {
    #[serde(alias = "phone_voice")]
    Voice,
    #[serde(alias = "phone_approve")]
    Approve,
    #[serde(alias = "phone_deny")]
    Deny,
}

impl CommandSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandSource::Voice => "voice",
            CommandSource::Approve => "approve",
            CommandSource::Deny => "deny",
        }
    }

    /// Parse a wire tag, accepting the legacy `phone_*` spellings
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "voice" | "phone_voice" => Some(CommandSource::Voice),
            "approve" | "phone_approve" => Some(CommandSource::Approve),
            "deny" | "phone_deny" => Some(CommandSource::Deny),
            _ => None,
        }
    }
}

/// An instruction produced by a listener, waiting for the next poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub text: String,
    pub source: CommandSource,
    pub timestamp: String,
}

impl Command {
    pub fn new(text: impl Into<String>, source: CommandSource) -> Self {
        Self {
            text: text.into(),
            source,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Which commands a poll is willing to consume
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandFilter {
    Any,
    Only(HashSet<CommandSource>),
}

impl CommandFilter {
    /// An empty tag list matches anything. Unknown tags are dropped, so a
    /// list made only of unknown tags matches nothing.
    pub fn from_tags<S: AsRef<str>>(tags: &[S]) -> Self {
        if tags.is_empty() {
            return CommandFilter::Any;
        }
        CommandFilter::Only(
            tags.iter()
                .filter_map(|t| CommandSource::from_tag(t.as_ref()))
                .collect(),
        )
    }

    pub fn matches(&self, source: CommandSource) -> bool {
        match self {
            CommandFilter::Any => true,
            CommandFilter::Only(sources) => sources.contains(&source),
        }
    }
}

/// FIFO of pending commands with source-filtered consumption
#[derive(Debug, Default)]
pub struct CommandMailbox {
    queue: VecDeque<Command>,
}

impl CommandMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.queue.push_back(command);
    }

    /// Remove and return the oldest command accepted by `filter`. Commands
    /// that are skipped keep their relative order.
    pub fn pop(&mut self, filter: &CommandFilter) -> Option<Command> {
        let idx = self.queue.iter().position(|c| filter.matches(c.source))?;
        self.queue.remove(idx)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.queue.iter()
    }
}
