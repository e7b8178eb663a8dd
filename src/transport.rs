//! Transport abstraction for talking to the remote backend.
//!
//! The core never opens sockets itself. Everything it needs from the
//! backend goes through the [`Transport`] trait:
//!
//! - [`Transport::login`] establishes a [`Session`] for a tenant and a
//!   stable client identity, creating the identity server-side if needed.
//! - [`Transport::call`] invokes a named remote function with a JSON payload
//!   and returns the function's raw result plus any error the function
//!   itself reported.
//!
//! Failures of the call mechanism (connectivity, HTTP errors, rejected
//! requests) come back as [`ApiError`]. Failures inside the remote function
//! come back inside a successful [`FunctionResponse`] as a [`ScriptError`].
//! Callers usually treat both the same way, but the diagnostics differ.

pub mod http;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, ApiError>;

/// Structured error returned by the backend or synthesized by the transport.
///
/// Mirrors the backend's error envelope. Transport-level failures that never
/// reached the backend use [`ApiError::connection`] with `code == 0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// HTTP status code, or 0 if the request never completed.
    #[serde(default)]
    pub code: u16,

    /// HTTP status text.
    #[serde(default)]
    pub status: String,

    /// Short error name, e.g. `InvalidTitleId`.
    #[serde(default)]
    pub error: String,

    /// Numeric backend error code.
    #[serde(default)]
    pub error_code: i64,

    /// Human readable message.
    #[serde(default)]
    pub error_message: String,

    /// Per-field validation messages.
    #[serde(default)]
    pub error_details: Option<BTreeMap<String, Vec<String>>>,
}

impl ApiError {
    /// An error for a request that did not produce a backend response.
    pub fn connection(message: impl Into<String>) -> Self {
        Self {
            code: 0,
            status: "ConnectionError".to_string(),
            error: "ConnectionError".to_string(),
            error_code: 0,
            error_message: message.into(),
            error_details: None,
        }
    }

    /// Returns `true` if the request never reached the backend.
    pub fn is_connection_error(&self) -> bool {
        self.code == 0
    }

    /// Renders a multi-line diagnostic for operator triage.
    ///
    /// The first line is the error message (or the error name if the message
    /// is empty). Each entry of `error_details` adds one `key: messages` line.
    ///
    /// # Example
    ///
    /// ```
    /// use reportpoll::transport::ApiError;
    /// use std::collections::BTreeMap;
    ///
    /// let mut details = BTreeMap::new();
    /// details.insert("CustomId".to_string(), vec!["must not be empty".to_string()]);
    /// let error = ApiError {
    ///     code: 400,
    ///     error: "InvalidParams".to_string(),
    ///     error_message: "Invalid input parameters".to_string(),
    ///     error_details: Some(details),
    ///     ..Default::default()
    /// };
    ///
    /// assert_eq!(error.report(), "Invalid input parameters\nCustomId: must not be empty");
    /// ```
    pub fn report(&self) -> String {
        let mut report = if self.error_message.is_empty() {
            self.error.clone()
        } else {
            self.error_message.clone()
        };

        if let Some(details) = &self.error_details {
            for (key, messages) in details {
                report.push('\n');
                report.push_str(key);
                report.push_str(": ");
                report.push_str(&messages.join(", "));
            }
        }

        report
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.error, self.code, self.report())
    }
}

impl std::error::Error for ApiError {}

/// An error reported by the remote function itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScriptError {
    /// Error category, e.g. `JavascriptException`.
    #[serde(default)]
    pub error: String,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub stack_trace: Option<String>,
}

impl ScriptError {
    /// Renders the error as `error: message`, followed by the stack trace.
    pub fn report(&self) -> String {
        let mut report = format!("{}: {}", self.error, self.message);
        if let Some(trace) = self.stack_trace.as_deref().filter(|t| !t.is_empty()) {
            report.push('\n');
            report.push_str(trace);
        }
        report
    }
}

/// What a remote function call returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionResponse {
    /// The function's return value. `None` when the function returned nothing.
    pub result: Option<Value>,

    /// Set when the function ran but failed.
    pub error: Option<ScriptError>,
}

impl FunctionResponse {
    /// A successful response carrying `value`.
    pub fn ok(value: Value) -> Self {
        Self {
            result: Some(value),
            error: None,
        }
    }

    /// A response whose function reported `error`.
    pub fn failed(error: ScriptError) -> Self {
        Self {
            result: None,
            error: Some(error),
        }
    }
}

/// An authenticated session with the backend.
///
/// Obtained from [`Transport::login`] and passed by reference to every
/// [`Transport::call`]. Never persisted.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    ticket: Option<String>,
    player_id: Option<String>,
    newly_created: bool,
}

impl Session {
    pub fn new(ticket: impl Into<String>, player_id: impl Into<String>) -> Self {
        Self {
            ticket: Some(ticket.into()),
            player_id: Some(player_id.into()),
            newly_created: false,
        }
    }

    /// A session value that carries no ticket.
    pub fn inactive() -> Self {
        Self::default()
    }

    /// Marks the identity as created by this login.
    pub fn with_newly_created(mut self, newly_created: bool) -> Self {
        self.newly_created = newly_created;
        self
    }

    /// Returns `true` if the session carries a usable ticket.
    pub fn is_active(&self) -> bool {
        self.ticket.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn ticket(&self) -> Option<&str> {
        self.ticket.as_deref()
    }

    pub fn player_id(&self) -> Option<&str> {
        self.player_id.as_deref()
    }

    pub fn newly_created(&self) -> bool {
        self.newly_created
    }
}

// The ticket is a credential; keep it out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("active", &self.is_active())
            .field("player_id", &self.player_id)
            .field("newly_created", &self.newly_created)
            .finish()
    }
}

/// A client able to authenticate and invoke remote functions.
///
/// Implementations must resolve each call exactly once; retrying is the
/// caller's decision.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Logs in to `tenant_id` as `identity`, creating the identity if it
    /// does not exist yet.
    async fn login(&self, tenant_id: &str, identity: &str) -> TransportResult<Session>;

    /// Invokes `function_name` with `payload`.
    async fn call(
        &self,
        session: &Session,
        function_name: &str,
        payload: Value,
    ) -> TransportResult<FunctionResponse>;

    /// Transport name (for logging).
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_falls_back_to_error_name() {
        let error = ApiError {
            code: 503,
            error: "ServiceUnavailable".to_string(),
            ..Default::default()
        };
        assert_eq!(error.report(), "ServiceUnavailable");
    }

    #[test]
    fn test_connection_error() {
        let error = ApiError::connection("dns failure");
        assert!(error.is_connection_error());
        assert_eq!(error.report(), "dns failure");
    }

    #[test]
    fn test_api_error_from_envelope() {
        let error: ApiError = serde_json::from_str(
            r#"{"code":400,"status":"BadRequest","error":"InvalidParams","errorCode":1000,
                "errorMessage":"Invalid input parameters",
                "errorDetails":{"TitleId":["required"]}}"#,
        )
        .unwrap();
        assert_eq!(error.code, 400);
        assert_eq!(error.error_code, 1000);
        assert_eq!(error.report(), "Invalid input parameters\nTitleId: required");
    }

    #[test]
    fn test_script_error_report() {
        let error = ScriptError {
            error: "JavascriptException".to_string(),
            message: "boom".to_string(),
            stack_trace: Some("at handlers.GetTestData".to_string()),
        };
        assert_eq!(
            error.report(),
            "JavascriptException: boom\nat handlers.GetTestData"
        );
    }

    #[test]
    fn test_session_activity() {
        assert!(Session::new("ticket", "player").is_active());
        assert!(!Session::inactive().is_active());
        assert!(!Session::new("", "player").is_active());
    }

    #[test]
    fn test_session_debug_hides_ticket() {
        let rendered = format!("{:?}", Session::new("secret-ticket", "player"));
        assert!(!rendered.contains("secret-ticket"));
        assert!(rendered.contains("active: true"));
    }
}
