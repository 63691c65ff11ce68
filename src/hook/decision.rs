use serde_json::{Value, json};

use super::classify::HookEvent;
use crate::relay::{Command, CommandSource};

/// Turn a retrieved command into the object the automation tool reads
/// from the hook's stdout. `None` means print nothing.
pub fn decide(event: HookEvent, command: &Command) -> Option<Value> {
    match event {
        HookEvent::TaskCompleted => Some(json!({
            "decision": "block",
            "reason": format!("Remote command received: {}", command.text),
        })),
        HookEvent::PermissionRequest => {
            let decision = if command.source == CommandSource::Approve {
                json!({"behavior": "allow"})
            } else {
                json!({"behavior": "deny", "message": "Denied from remote listener"})
            };
            Some(json!({
                "hookSpecificOutput": {
                    "hookEventName": "PermissionRequest",
                    "decision": decision,
                }
            }))
        }
        HookEvent::InputNeeded => None,
    }
}
