//! JUnit XML report generation.
//!
//! Writes the fetched report in the JUnit XML format understood by Jenkins,
//! GitLab CI, GitHub Actions and most other CI systems.
//!
//! # Format
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <testsuites name="reportpoll" tests="3" failures="1" errors="0" time="1.234">
//!   <testsuite name="PlayerTests" tests="3" failures="1" errors="0" skipped="1" time="1.234" timestamp="2024-01-01T00:00:00">
//!     <testcase classname="PlayerTests" name="Login" time="0.100"/>
//!     <testcase classname="PlayerTests" name="Logout" time="0.150">
//!       <failure message="expected true" type="AssertionError">stack trace</failure>
//!     </testcase>
//!     <testcase classname="PlayerTests" name="Purchase" time="0.000">
//!       <skipped/>
//!     </testcase>
//!   </testsuite>
//! </testsuites>
//! ```
//!
//! # Example
//!
//! ```
//! use reportpoll::report::JUnitWriter;
//!
//! let writer = JUnitWriter::new().with_testsuites_name("nightly");
//! ```

use std::path::Path;

use anyhow::Context;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use super::{ReportWriter, TestCaseReport, TestFinishState, TestSuiteReport, total_counts};

/// Writes reports as JUnit XML.
///
/// Parent directories of the output path are created automatically.
pub struct JUnitWriter {
    testsuites_name: String,
}

impl JUnitWriter {
    pub fn new() -> Self {
        Self {
            testsuites_name: "reportpoll".to_string(),
        }
    }

    /// Sets the `name` attribute of the `<testsuites>` root.
    pub fn with_testsuites_name(mut self, name: impl Into<String>) -> Self {
        self.testsuites_name = name.into();
        self
    }

    /// Generate JUnit XML content for `suites`.
    pub fn generate_xml(&self, suites: &[TestSuiteReport]) -> anyhow::Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let totals = total_counts(suites);
        let time: f64 = suites.iter().map(|s| s.time).sum();

        // <testsuites>
        let mut testsuites = BytesStart::new("testsuites");
        testsuites.push_attribute(("name", self.testsuites_name.as_str()));
        testsuites.push_attribute(("tests", totals.tests.to_string().as_str()));
        testsuites.push_attribute(("failures", totals.failures.to_string().as_str()));
        testsuites.push_attribute(("errors", totals.errors.to_string().as_str()));
        testsuites.push_attribute(("time", format!("{:.3}", time).as_str()));
        writer.write_event(Event::Start(testsuites))?;

        for suite in suites {
            self.write_testsuite(&mut writer, suite)?;
        }

        // </testsuites>
        writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

        let xml = String::from_utf8(writer.into_inner())?;
        Ok(xml)
    }

    fn write_testsuite<W: std::io::Write>(
        &self,
        writer: &mut Writer<W>,
        suite: &TestSuiteReport,
    ) -> anyhow::Result<()> {
        let counts = suite.counts();
        let timestamp = suite.timestamp.clone().unwrap_or_else(|| {
            chrono::Utc::now()
                .format("%Y-%m-%dT%H:%M:%S")
                .to_string()
        });

        let mut testsuite = BytesStart::new("testsuite");
        testsuite.push_attribute(("name", sanitize(&suite.name).as_str()));
        testsuite.push_attribute(("tests", counts.tests.to_string().as_str()));
        testsuite.push_attribute(("failures", counts.failures.to_string().as_str()));
        testsuite.push_attribute(("errors", counts.errors.to_string().as_str()));
        testsuite.push_attribute(("skipped", counts.skipped.to_string().as_str()));
        testsuite.push_attribute(("time", format!("{:.3}", suite.time).as_str()));
        testsuite.push_attribute(("timestamp", sanitize(&timestamp).as_str()));

        if suite.test_results.is_empty() {
            writer.write_event(Event::Empty(testsuite))?;
            return Ok(());
        }

        writer.write_event(Event::Start(testsuite))?;
        for case in &suite.test_results {
            self.write_testcase(writer, case)?;
        }
        writer.write_event(Event::End(BytesEnd::new("testsuite")))?;

        Ok(())
    }

    /// Write a single test case element.
    fn write_testcase<W: std::io::Write>(
        &self,
        writer: &mut Writer<W>,
        case: &TestCaseReport,
    ) -> anyhow::Result<()> {
        let mut testcase = BytesStart::new("testcase");
        testcase.push_attribute(("classname", sanitize(&case.classname).as_str()));
        testcase.push_attribute(("name", sanitize(&case.name).as_str()));
        testcase.push_attribute(("time", format!("{:.3}", case.time).as_str()));

        let (tag, kind) = match case.finish_state {
            TestFinishState::Passed => {
                writer.write_event(Event::Empty(testcase))?;
                return Ok(());
            }
            TestFinishState::Failed => ("failure", Some("AssertionError")),
            TestFinishState::Timedout => ("failure", Some("Timeout")),
            TestFinishState::Skipped => ("skipped", None),
        };

        writer.write_event(Event::Start(testcase))?;

        let mut element = BytesStart::new(tag);
        if let Some(msg) = &case.message {
            element.push_attribute(("message", sanitize(msg).as_str()));
        } else if case.finish_state == TestFinishState::Timedout {
            element.push_attribute(("message", "Test timed out"));
        }
        if let Some(kind) = kind {
            element.push_attribute(("type", kind));
        }

        match case.failure_text.as_deref().filter(|t| !t.is_empty()) {
            Some(text) if kind.is_some() => {
                writer.write_event(Event::Start(element))?;
                writer.write_event(Event::Text(BytesText::new(&sanitize(text))))?;
                writer.write_event(Event::End(BytesEnd::new(tag)))?;
            }
            _ => writer.write_event(Event::Empty(element))?,
        }

        writer.write_event(Event::End(BytesEnd::new("testcase")))?;

        Ok(())
    }
}

impl Default for JUnitWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportWriter for JUnitWriter {
    fn write(&self, suites: &[TestSuiteReport], path: &Path) -> anyhow::Result<()> {
        let xml = self.generate_xml(suites)?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }

        std::fs::write(path, xml)
            .with_context(|| format!("Failed to write JUnit XML: {}", path.display()))?;

        tracing::info!("JUnit XML written to: {}", path.display());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "junit"
    }
}

/// Drop characters that are not allowed in XML 1.0.
///
/// Escaping is left to quick-xml.
fn sanitize(s: &str) -> String {
    s.chars()
        .filter(|c| matches!(c, '\t' | '\n' | '\r' | ' '..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}'))
        .collect()
}
