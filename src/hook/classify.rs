use serde::Deserialize;

use crate::relay::session::{INPUT_NEEDED, PERMISSION_REQUEST, TASK_COMPLETED};

/// The JSON object the automation tool pipes to a hook's stdin
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HookInput {
    pub hook_event_name: String,
    pub notification_type: String,
    pub session_id: String,
    pub cwd: String,
    pub transcript_path: String,
    pub message: String,
    pub title: String,
    /// Set by the tool when it re-invokes the stop hook because a previous
    /// invocation told it not to stop
    pub stop_hook_active: bool,
}

impl HookInput {
    /// Parse stdin contents; empty or invalid input yields `None`
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            return None;
        }
        serde_json::from_str(raw).ok()
    }
}

/// Relay event kinds a hook invocation can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    TaskCompleted,
    InputNeeded,
    PermissionRequest,
}

impl HookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookEvent::TaskCompleted => TASK_COMPLETED,
            HookEvent::InputNeeded => INPUT_NEEDED,
            HookEvent::PermissionRequest => PERMISSION_REQUEST,
        }
    }
}

/// Map a raw hook invocation to a relay event, or `None` for events the
/// relay does not care about.
pub fn classify(input: &HookInput) -> Option<HookEvent> {
    match input.hook_event_name.as_str() {
        "Stop" => Some(HookEvent::TaskCompleted),
        "PermissionRequest" => Some(HookEvent::PermissionRequest),
        "Notification" => match input.notification_type.as_str() {
            "idle_prompt" | "permission_prompt" | "elicitation_dialog" => Some(HookEvent::InputNeeded),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, notification_type: &str) -> HookInput {
        HookInput {
            hook_event_name: name.to_string(),
            notification_type: notification_type.to_string(),
            ..HookInput::default()
        }
    }

    #[test]
    fn stop_is_task_completed() {
        assert_eq!(classify(&input("Stop", "")), Some(HookEvent::TaskCompleted));
    }

    #[test]
    fn permission_request_hook() {
        assert_eq!(
            classify(&input("PermissionRequest", "")),
            Some(HookEvent::PermissionRequest)
        );
    }

    #[test]
    fn interesting_notifications_need_input() {
        for kind in ["idle_prompt", "permission_prompt", "elicitation_dialog"] {
            assert_eq!(
                classify(&input("Notification", kind)),
                Some(HookEvent::InputNeeded)
            );
        }
        assert_eq!(classify(&input("Notification", "auth_success")), None);
    }

    #[test]
    fn other_hooks_are_ignored() {
        assert_eq!(classify(&input("PreToolUse", "")), None);
        assert_eq!(classify(&input("", "")), None);
    }

    #[test]
    fn parse_reads_reentry_flag() {
        let parsed = HookInput::parse(
            r#"{"hook_event_name":"Stop","session_id":"s1","stop_hook_active":true,"unused":1}"#,
        )
        .unwrap();
        assert!(parsed.stop_hook_active);
        assert_eq!(parsed.session_id, "s1");
    }

    #[test]
    fn parse_rejects_empty_and_garbage() {
        assert!(HookInput::parse("").is_none());
        assert!(HookInput::parse("  \n").is_none());
        assert!(HookInput::parse("{oops").is_none());
    }
}
