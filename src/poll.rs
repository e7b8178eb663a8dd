//! Readiness polling with a wall-clock deadline.
//!
//! The poller repeatedly asks the backend whether the test data for a build
//! exists, pausing a fixed interval between checks, until one of:
//!
//! - the backend answers `true` ([`PollOutcome::Ready`]),
//! - a check fails in any way ([`PollOutcome::CallFailed`], fatal),
//! - the deadline passes ([`PollOutcome::TimedOut`], not fatal).
//!
//! The deadline is only compared between checks, so a run can overshoot it
//! by up to one interval plus one call.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::rpc::{CallOutcome, CorrelationRequest, Invoker, READINESS_FUNCTION};
use crate::transport::{Session, Transport};

/// How a polling run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The backend reported the data as available.
    Ready,

    /// The deadline passed first. Expected, not an error.
    TimedOut,

    /// A readiness check failed (transport, remote or decode error).
    CallFailed,
}

impl PollOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready)
    }

    /// Returns `true` if polling stopped because a call failed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PollOutcome::CallFailed)
    }
}

struct PollState {
    deadline: Instant,
    results_ready: bool,
}

impl PollState {
    fn should_poll(&self) -> bool {
        Instant::now() < self.deadline && !self.results_ready
    }
}

/// Polls the readiness function through an [`Invoker`].
pub struct Poller<T: ?Sized> {
    invoker: Invoker<T>,
    interval: Duration,
}

impl<T: Transport + ?Sized> Poller<T> {
    pub fn new(invoker: Invoker<T>, interval: Duration) -> Self {
        Self { invoker, interval }
    }

    /// Polls until the data for `build_identifier` is ready or `deadline` passes.
    ///
    /// Makes no call at all if `deadline` has already passed.
    pub async fn wait_for_ready(
        &self,
        session: &Session,
        build_identifier: &str,
        deadline: Instant,
    ) -> PollOutcome {
        let request = CorrelationRequest::new(build_identifier);
        let mut state = PollState {
            deadline,
            results_ready: false,
        };
        let mut checks = 0usize;

        while state.should_poll() {
            checks += 1;

            let outcome: CallOutcome<bool> = self
                .invoker
                .invoke(session, READINESS_FUNCTION, &request)
                .await;

            match outcome {
                // null means the backend has nothing for this build yet
                CallOutcome::Success(ready) => state.results_ready = ready.unwrap_or(false),
                failed => {
                    error!("Readiness check {} failed: {}", checks, failed);
                    return PollOutcome::CallFailed;
                }
            }

            info!("Test results ready: {} (check {})", state.results_ready, checks);

            if !state.results_ready {
                tokio::time::sleep(self.interval).await;
            }
        }

        if state.results_ready {
            PollOutcome::Ready
        } else {
            warn!(
                "Timed out waiting for test results for {} after {} check(s)",
                build_identifier, checks
            );
            PollOutcome::TimedOut
        }
    }
}
