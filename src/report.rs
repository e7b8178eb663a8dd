//! Test report model, writers and console output.
//!
//! The backend returns the report as a list of [`TestSuiteReport`]s. The
//! [`ReportWriter`] trait turns that list into a durable file;
//! [`JUnitWriter`] is the standard implementation.

pub mod junit;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use junit::JUnitWriter;

/// Final state of a single test case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestFinishState {
    #[default]
    Passed,
    Failed,
    Skipped,
    Timedout,
}

impl TestFinishState {
    /// Failed and timed-out cases both count as failures.
    pub fn is_failure(&self) -> bool {
        matches!(self, TestFinishState::Failed | TestFinishState::Timedout)
    }
}

/// One test case as reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseReport {
    #[serde(default)]
    pub classname: String,

    pub name: String,

    /// Duration in seconds.
    #[serde(default)]
    pub time: f64,

    #[serde(default)]
    pub message: Option<String>,

    /// Details of a failure (assertion text, stack trace).
    #[serde(default)]
    pub failure_text: Option<String>,

    #[serde(default)]
    pub finish_state: TestFinishState,
}

/// One test suite as reported by the backend.
///
/// Counts are taken from the backend as-is; use [`counts`](Self::counts)
/// for values derived from the individual cases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuiteReport {
    pub name: String,

    #[serde(default)]
    pub tests: u32,

    #[serde(default)]
    pub failures: u32,

    #[serde(default)]
    pub errors: u32,

    #[serde(default)]
    pub skipped: u32,

    /// Duration in seconds.
    #[serde(default)]
    pub time: f64,

    /// When the suite ran, as sent by the backend.
    #[serde(default)]
    pub timestamp: Option<String>,

    #[serde(default)]
    pub test_results: Vec<TestCaseReport>,
}

/// Aggregated counts for a suite.
///
/// Counts come from the backend and saturate at `u32::MAX` when added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuiteCounts {
    pub tests: u32,
    pub failures: u32,
    pub errors: u32,
    pub skipped: u32,
}

impl SuiteCounts {
    pub fn passed(&self) -> u32 {
        let not_passed = self
            .failures
            .saturating_add(self.errors)
            .saturating_add(self.skipped);
        self.tests.saturating_sub(not_passed)
    }
}

impl std::ops::Add for SuiteCounts {
    type Output = SuiteCounts;

    fn add(self, other: SuiteCounts) -> SuiteCounts {
        SuiteCounts {
            tests: self.tests.saturating_add(other.tests),
            failures: self.failures.saturating_add(other.failures),
            errors: self.errors.saturating_add(other.errors),
            skipped: self.skipped.saturating_add(other.skipped),
        }
    }
}

impl TestSuiteReport {
    /// Counts for this suite.
    ///
    /// Derived from `test_results` when the suite lists its cases, otherwise
    /// the backend's own totals.
    pub fn counts(&self) -> SuiteCounts {
        if self.test_results.is_empty() {
            return SuiteCounts {
                tests: self.tests,
                failures: self.failures,
                errors: self.errors,
                skipped: self.skipped,
            };
        }

        let count = |pred: fn(&TestCaseReport) -> bool| {
            self.test_results.iter().filter(|c| pred(c)).count() as u32
        };
        SuiteCounts {
            tests: self.test_results.len() as u32,
            failures: count(|c| c.finish_state.is_failure()),
            errors: self.errors,
            skipped: count(|c| c.finish_state == TestFinishState::Skipped),
        }
    }
}

/// Totals across all suites.
pub fn total_counts(suites: &[TestSuiteReport]) -> SuiteCounts {
    suites
        .iter()
        .map(TestSuiteReport::counts)
        .fold(SuiteCounts::default(), |acc, c| acc + c)
}

/// Persists a fetched report.
pub trait ReportWriter: Send + Sync {
    /// Writes `suites` to `path`, replacing any existing file.
    fn write(&self, suites: &[TestSuiteReport], path: &Path) -> anyhow::Result<()>;

    /// Writer name (for logging).
    fn name(&self) -> &'static str;
}

/// Prints a summary of the fetched report to the console.
pub fn print_summary(suites: &[TestSuiteReport], path: &Path) {
    let totals = total_counts(suites);

    println!();
    println!("Test Results ({} suite(s)):", suites.len());
    println!("  Total:   {}", totals.tests);
    println!("  Passed:  {}", console::style(totals.passed()).green());
    println!("  Failed:  {}", console::style(totals.failures).red());
    if totals.errors > 0 {
        println!("  Errors:  {}", console::style(totals.errors).red().bold());
    }
    println!("  Skipped: {}", console::style(totals.skipped).yellow());
    println!("  Report:  {}", path.display());

    if totals.failures == 0 && totals.errors == 0 {
        println!();
        println!("{}", console::style("All tests passed!").green().bold());
    } else {
        println!();
        println!("{}", console::style("Some tests failed.").red().bold());

        println!();
        println!("Failed tests:");
        for suite in suites {
            for case in suite
                .test_results
                .iter()
                .filter(|c| c.finish_state.is_failure())
            {
                println!("  - {}.{}", case.classname, case.name);
                if let Some(msg) = &case.message {
                    println!("    {}", console::style(msg).dim());
                }
            }
        }
    }
}
