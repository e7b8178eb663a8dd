//! Run orchestration: log in, wait for the report, fetch it, write it.
//!
//! # Execution Flow
//!
//! ```text
//!   RunConfig
//!       │
//!       ▼
//!   session::establish ──── no session ────► SessionFailed
//!       │
//!       ▼
//!   Poller::wait_for_ready ─ deadline ─────► TimedOut
//!       │                 └─ call failed ──► PollFailed
//!       ▼
//!   Fetcher::fetch_and_write ─ error ──────► FetchFailed
//!       │
//!       ▼
//!   Completed { path, suites }
//! ```
//!
//! Steps run strictly one after the other; the first failure ends the run.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use reportpoll::config::{Options, RunConfig};
//! use reportpoll::orchestrator::Orchestrator;
//! use reportpoll::report::JUnitWriter;
//! use reportpoll::transport::http::HttpTransport;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let options = Options::new()
//!         .with("titleid", "6195")
//!         .with("buildidentifier", "jenkins-42");
//!     let config = RunConfig::from_options(&options)?;
//!
//!     let transport = Arc::new(HttpTransport::new(config.base_url.clone()));
//!     let orchestrator = Orchestrator::new(config, transport, JUnitWriter::new());
//!
//!     let outcome = orchestrator.run().await;
//!     std::process::exit(outcome.exit_code());
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info};

use crate::config::RunConfig;
use crate::fetch::Fetcher;
use crate::poll::{PollOutcome, Poller};
use crate::report::{ReportWriter, TestSuiteReport};
use crate::rpc::Invoker;
use crate::session;
use crate::transport::Transport;

/// Used when `now + timeout` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// How a run ended.
///
/// # Exit Codes
///
/// | Code | Meaning |
/// |------|---------|
/// | 0 | Report fetched and written |
/// | 1 | Any failure; the log says which step failed |
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The report was fetched and written to `path`.
    Completed {
        path: PathBuf,
        suites: Vec<TestSuiteReport>,
    },

    /// No session could be established.
    SessionFailed,

    /// The report did not become available before the deadline.
    TimedOut,

    /// A readiness check failed.
    PollFailed,

    /// Fetching or writing the report failed.
    FetchFailed(String),
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }

    /// Returns the process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        if self.success() { 0 } else { 1 }
    }
}

/// Sequences session establishment, polling and fetching for one build.
pub struct Orchestrator<T: ?Sized, W> {
    config: RunConfig,
    transport: Arc<T>,
    writer: W,
}

impl<T, W> Orchestrator<T, W>
where
    T: Transport + ?Sized,
    W: ReportWriter,
{
    /// Creates a new orchestrator.
    ///
    /// # Arguments
    ///
    /// * `config` - Resolved run settings
    /// * `transport` - Backend client
    /// * `writer` - Persists the fetched report
    pub fn new(config: RunConfig, transport: Arc<T>, writer: W) -> Self {
        Self {
            config,
            transport,
            writer,
        }
    }

    /// Runs all steps and reports how the run ended.
    ///
    /// Never returns an error; every failure is logged and mapped to a
    /// [`RunOutcome`] variant.
    pub async fn run(&self) -> RunOutcome {
        let identity = self.config.identity();
        let invoker = Invoker::new(Arc::clone(&self.transport), self.config.verbose);

        let Some(session) = session::establish(self.transport.as_ref(), &identity).await else {
            error!(
                "Run failed: could not establish a session for {} on {}",
                identity.build_identifier, identity.tenant_id
            );
            return RunOutcome::SessionFailed;
        };

        let now = Instant::now();
        let deadline = now
            .checked_add(self.config.timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);
        info!(
            "Waiting up to {:?} for test results for {} (checking every {:?})",
            self.config.timeout, identity.build_identifier, self.config.poll_interval
        );

        let poller = Poller::new(invoker.clone(), self.config.poll_interval);
        match poller
            .wait_for_ready(&session, &identity.build_identifier, deadline)
            .await
        {
            PollOutcome::Ready => {}
            PollOutcome::TimedOut => {
                error!(
                    "Run failed: test results for {} were not ready within {:?}",
                    identity.build_identifier, self.config.timeout
                );
                return RunOutcome::TimedOut;
            }
            PollOutcome::CallFailed => {
                error!(
                    "Run failed: could not check whether test results for {} are ready",
                    identity.build_identifier
                );
                return RunOutcome::PollFailed;
            }
        }

        let fetcher = Fetcher::new(invoker);
        match fetcher
            .fetch_and_write(
                &session,
                &identity.build_identifier,
                &self.config.workspace,
                &self.writer,
            )
            .await
        {
            Ok((path, suites)) => {
                info!("Test results for {} saved", identity.build_identifier);
                RunOutcome::Completed { path, suites }
            }
            Err(e) => {
                error!("Run failed: {}", e);
                RunOutcome::FetchFailed(e.to_string())
            }
        }
    }
}
