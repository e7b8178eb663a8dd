//! Fetching the finished report and handing it to a writer.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::config::report_path;
use crate::report::{ReportWriter, TestSuiteReport};
use crate::rpc::{CallOutcome, CorrelationRequest, FETCH_FUNCTION, Invoker};
use crate::transport::{Session, Transport};

/// Errors from the fetch step.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Fetching test data failed: {0}")]
    CallFailed(String),

    #[error("Backend returned no test data")]
    MissingData,

    #[error("Failed to write report: {0:#}")]
    Write(#[source] anyhow::Error),
}

/// Retrieves the report for a build with a single remote call.
pub struct Fetcher<T: ?Sized> {
    invoker: Invoker<T>,
}

impl<T: Transport + ?Sized> Fetcher<T> {
    pub fn new(invoker: Invoker<T>) -> Self {
        Self { invoker }
    }

    /// Fetches the test suites recorded for `build_identifier`.
    ///
    /// # Errors
    ///
    /// [`FetchError::CallFailed`] if the call did not succeed, and
    /// [`FetchError::MissingData`] if it succeeded with `null`.
    pub async fn fetch_report(
        &self,
        session: &Session,
        build_identifier: &str,
    ) -> Result<Vec<TestSuiteReport>, FetchError> {
        let request = CorrelationRequest::new(build_identifier);
        let outcome: CallOutcome<Vec<TestSuiteReport>> = self
            .invoker
            .invoke(session, FETCH_FUNCTION, &request)
            .await;

        match outcome {
            CallOutcome::Success(Some(suites)) => {
                info!(
                    "Fetched {} test suite(s) for {}",
                    suites.len(),
                    build_identifier
                );
                Ok(suites)
            }
            CallOutcome::Success(None) => {
                error!("{} returned null for {}", FETCH_FUNCTION, build_identifier);
                Err(FetchError::MissingData)
            }
            failed => Err(FetchError::CallFailed(failed.to_string())),
        }
    }

    /// Fetches the report and writes it to `<workspace>/<build_identifier>.xml`.
    ///
    /// Returns the path of the written file.
    pub async fn fetch_and_write<W>(
        &self,
        session: &Session,
        build_identifier: &str,
        workspace: &Path,
        writer: &W,
    ) -> Result<(PathBuf, Vec<TestSuiteReport>), FetchError>
    where
        W: ReportWriter + ?Sized,
    {
        let suites = self.fetch_report(session, build_identifier).await?;
        let path = report_path(workspace, build_identifier);

        info!(
            "Writing {} report to {}",
            writer.name(),
            path.display()
        );
        writer.write(&suites, &path).map_err(FetchError::Write)?;

        Ok((path, suites))
    }
}
