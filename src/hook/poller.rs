use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::ingest::{IngestClient, IngestRequest};
use crate::relay::Command;

/// Gap between retries while waiting for a listener
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long a finished task waits for a follow-up command
pub const COMPLETION_WINDOW: Duration = Duration::from_secs(10);

/// How long a permission prompt waits for a human decision
pub const PERMISSION_WINDOW: Duration = Duration::from_secs(110);

/// Anything that can ask the relay for a command. Failures are `None`.
pub trait CommandPoller {
    fn poll(&mut self, request: &IngestRequest) -> impl Future<Output = Option<Command>>;
}

impl CommandPoller for IngestClient {
    async fn poll(&mut self, request: &IngestRequest) -> Option<Command> {
        match self.call(request).await {
            Ok(response) => response.command,
            Err(e) => {
                debug!("relay unavailable: {}", e);
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval: Duration,
    pub window: Duration,
}

impl PollSchedule {
    pub fn completion() -> Self {
        Self {
            interval: POLL_INTERVAL,
            window: COMPLETION_WINDOW,
        }
    }

    pub fn permission() -> Self {
        Self {
            interval: POLL_INTERVAL,
            window: PERMISSION_WINDOW,
        }
    }
}

/// What to send and for how long to keep asking
#[derive(Debug, Clone)]
pub struct PollPlan {
    /// Sent once up front; carries the event and the first poll
    pub initial: IngestRequest,
    /// Poll-only request repeated while the window is open
    pub retry: IngestRequest,
    pub schedule: PollSchedule,
    /// The tool re-invoked the hook for the same turn
    pub reentrant: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    InitialCheck,
    ReentrantCheck,
    Polling { deadline: Instant },
    TimedOut,
}

/// Drive the plan to a command or to the end of its window. A re-entrant
/// invocation performs the single initial check and nothing more, so two
/// hook invocations never stack their waits.
pub async fn run<P: CommandPoller>(poller: &mut P, plan: &PollPlan) -> Option<Command> {
    let mut state = if plan.reentrant {
        PollState::ReentrantCheck
    } else {
        PollState::InitialCheck
    };

    loop {
        state = match state {
            PollState::ReentrantCheck => return poller.poll(&plan.initial).await,
            PollState::InitialCheck => match poller.poll(&plan.initial).await {
                Some(command) => return Some(command),
                None => PollState::Polling {
                    deadline: Instant::now() + plan.schedule.window,
                },
            },
            PollState::Polling { deadline } => {
                let now = Instant::now();
                if now >= deadline {
                    PollState::TimedOut
                } else {
                    tokio::time::sleep(plan.schedule.interval.min(deadline - now)).await;
                    match poller.poll(&plan.retry).await {
                        Some(command) => return Some(command),
                        None => PollState::Polling { deadline },
                    }
                }
            }
            PollState::TimedOut => {
                debug!("no command before poll window closed");
                return None;
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::CommandSource;

    /// Answers with a command on the Nth call, records every request
    struct ScriptedPoller {
        answer_on: Option<usize>,
        calls: Vec<IngestRequest>,
    }

    impl ScriptedPoller {
        fn new(answer_on: Option<usize>) -> Self {
            Self {
                answer_on,
                calls: Vec::new(),
            }
        }
    }

    impl CommandPoller for ScriptedPoller {
        async fn poll(&mut self, request: &IngestRequest) -> Option<Command> {
            self.calls.push(request.clone());
            if Some(self.calls.len()) == self.answer_on {
                Some(Command::new("go", CommandSource::Voice))
            } else {
                None
            }
        }
    }

    fn plan(reentrant: bool) -> PollPlan {
        let mut initial = IngestRequest::poll(&["voice"]);
        initial.event_type = Some("task_completed".to_string());
        PollPlan {
            initial,
            retry: IngestRequest::poll(&["voice"]),
            schedule: PollSchedule {
                interval: Duration::from_millis(10),
                window: Duration::from_millis(80),
            },
            reentrant,
        }
    }

    #[tokio::test]
    async fn immediate_command_stops_polling() {
        let mut poller = ScriptedPoller::new(Some(1));
        let cmd = run(&mut poller, &plan(false)).await;
        assert_eq!(cmd.unwrap().text, "go");
        assert_eq!(poller.calls.len(), 1);
    }

    #[tokio::test]
    async fn retries_until_command_arrives() {
        let mut poller = ScriptedPoller::new(Some(3));
        let cmd = run(&mut poller, &plan(false)).await;

        assert!(cmd.is_some());
        assert_eq!(poller.calls.len(), 3);
        assert!(poller.calls[0].event_type.is_some());
        assert!(poller.calls[1..].iter().all(|r| r.event_type.is_none()));
    }

    #[tokio::test]
    async fn gives_up_after_window() {
        let mut poller = ScriptedPoller::new(None);
        let started = Instant::now();
        let cmd = run(&mut poller, &plan(false)).await;

        assert!(cmd.is_none());
        assert!(started.elapsed() >= Duration::from_millis(80));
        assert!(poller.calls.len() > 1);
    }

    #[tokio::test]
    async fn reentrant_invocation_checks_once() {
        let mut poller = ScriptedPoller::new(None);
        let cmd = run(&mut poller, &plan(true)).await;

        assert!(cmd.is_none());
        assert_eq!(poller.calls.len(), 1);
    }

    #[tokio::test]
    async fn reentrant_invocation_still_takes_waiting_command() {
        let mut poller = ScriptedPoller::new(Some(1));
        assert!(run(&mut poller, &plan(true)).await.is_some());
    }

    #[test]
    fn schedules_use_fixed_windows() {
        assert_eq!(PollSchedule::completion().window, Duration::from_secs(10));
        assert_eq!(PollSchedule::permission().window, Duration::from_secs(110));
    }
}
