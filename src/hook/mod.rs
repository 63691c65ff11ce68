// Hook-side client. Runs as a short-lived process invoked by the automation
// tool: publishes one event, optionally waits for a listener's command, and
// prints the resulting decision. It must never fail or block its invoker
// beyond the fixed poll windows.

pub mod classify;
pub mod decision;
pub mod poller;
pub mod transcript;

use std::io::Write;

use serde_json::Value;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::config::HookConfig;
use crate::ingest::{IngestClient, IngestRequest, RequestKind};

pub use classify::{HookEvent, HookInput, classify};
pub use poller::{CommandPoller, PollPlan, PollSchedule, PollState};

/// Build the ingestion payload for a classified invocation
pub fn build_request(input: &HookInput, event: HookEvent, last_message: String) -> IngestRequest {
    let (request, filter) = match event {
        HookEvent::TaskCompleted => (RequestKind::PollCommand, vec!["voice"]),
        HookEvent::PermissionRequest => (RequestKind::PollCommand, vec!["approve", "deny"]),
        HookEvent::InputNeeded => (RequestKind::Notify, Vec::new()),
    };

    IngestRequest {
        event_type: Some(event.as_str().to_string()),
        session_id: input.session_id.clone(),
        cwd: input.cwd.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        transcript_path: input.transcript_path.clone(),
        last_message,
        notification_message: input.message.clone(),
        notification_title: input.title.clone(),
        request,
        command_filter: filter.into_iter().map(String::from).collect(),
    }
}

/// Publish the invocation and return the decision to print, if any
pub async fn process<P: CommandPoller>(input: &HookInput, poller: &mut P) -> Option<Value> {
    let event = classify(input)?;
    debug!(event = event.as_str(), "classified hook invocation");

    let last_message = transcript::last_assistant_message(&input.transcript_path);
    let initial = build_request(input, event, last_message);

    let schedule = match event {
        HookEvent::TaskCompleted => PollSchedule::completion(),
        HookEvent::PermissionRequest => PollSchedule::permission(),
        HookEvent::InputNeeded => {
            let _ = poller.poll(&initial).await;
            return None;
        }
    };

    let plan = PollPlan {
        retry: IngestRequest {
            session_id: initial.session_id.clone(),
            request: RequestKind::PollCommand,
            command_filter: initial.command_filter.clone(),
            ..IngestRequest::default()
        },
        initial,
        schedule,
        reentrant: input.stop_hook_active,
    };

    let command = poller::run(poller, &plan).await?;
    decision::decide(event, &command)
}

/// Entry point for the `hook` subcommand. Every failure ends quietly.
pub async fn run_from_stdin(config: &HookConfig) {
    let mut raw = String::new();
    if tokio::io::stdin().read_to_string(&mut raw).await.is_err() {
        return;
    }
    let Some(input) = HookInput::parse(&raw) else {
        debug!("stdin was empty or invalid JSON");
        return;
    };

    let mut client = IngestClient::new(config.server_addr.clone());
    if let Some(decision) = process(&input, &mut client).await {
        emit_decision(&mut std::io::stdout(), &decision);
    }
}

/// Print the decision line. A closed stdout is ignored.
fn emit_decision(out: &mut impl Write, decision: &Value) {
    if let Err(e) = writeln!(out, "{}", decision) {
        debug!("could not write hook decision: {}", e);
    }
}
