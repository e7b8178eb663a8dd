//! reportpoll: waits for an out-of-band test report and writes it as JUnit XML.
//!
//! A CI job starts a test run that reports its results to a remote backend
//! under a build identifier. reportpoll logs in with that identifier, polls
//! the backend until the report exists (or a deadline passes), fetches it and
//! writes `<workspace>/<buildIdentifier>.xml` for the CI system to pick up.
//!
//! # Architecture
//!
//! The main components are:
//!
//! - **Config**: Resolve `key=value` options from file, environment and CLI
//! - **Transport**: Login and remote function calls (HTTP/JSON)
//! - **Rpc**: Typed calls with a uniform success/remote-error/decode-error outcome
//! - **Poll / Fetch**: Wait for readiness, then retrieve the report
//! - **Report**: Report model, JUnit XML writer and console summary
//! - **Orchestrator**: Sequence the steps and map the result to an exit code
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
//!     let options = Options::from_args(["titleId=6195", "buildIdentifier=jenkins-42"])?;
//!     let config = RunConfig::from_options(&options)?;
//!     let transport = Arc::new(HttpTransport::new(config.base_url.clone()));
//!
//!     let outcome = Orchestrator::new(config, transport, JUnitWriter::new()).run().await;
//!     println!("exit code {}", outcome.exit_code());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod fetch;
pub mod orchestrator;
pub mod poll;
pub mod report;
pub mod rpc;
pub mod session;
pub mod transport;

// Re-export commonly used types
pub use config::{ConfigError, Options, RunConfig, load_config};
pub use orchestrator::{Orchestrator, RunOutcome};
pub use report::{JUnitWriter, ReportWriter, TestSuiteReport};
pub use rpc::{CallOutcome, Invoker};
pub use transport::{ApiError, Session, Transport};
