//! Typed remote function invocation.
//!
//! [`Invoker::invoke`] sends a serializable request to a named remote
//! function and decodes the answer into a caller-chosen type. It never
//! fails with `Err`: every call yields a [`CallOutcome`] that says whether
//! the value arrived, the remote side failed, or the answer did not have
//! the expected shape.
//!
//! # Decoding
//!
//! The transport hands back a dynamically typed JSON value. The invoker
//! re-encodes it to its canonical text and decodes that text as `Option<T>`:
//!
//! | Canonical text | Decodes as `T` | Outcome |
//! |----------------|----------------|---------|
//! | `null` | — | `Success(None)` |
//! | `true`, `[..]`, ... | yes | `Success(Some(value))` |
//! | anything else | no | `DecodeError(text)` |
//!
//! Some remote functions return `null` to mean "no data yet", so the null
//! token is a success, never a decode error.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::transport::{Session, Transport};

/// Remote function that reports whether the test data for a build exists.
pub const READINESS_FUNCTION: &str = "TestDataExists";

/// Remote function that returns the test data for a build.
pub const FETCH_FUNCTION: &str = "GetTestData";

/// Canonical text of an absent value.
pub const NULL_TOKEN: &str = "null";

/// Payload of both remote calls: the build's correlation key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationRequest {
    pub custom_id: String,
}

impl CorrelationRequest {
    pub fn new(custom_id: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
        }
    }
}

/// Result of one remote call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome<T> {
    /// The call succeeded. `None` means the function returned `null`.
    Success(Option<T>),

    /// The transport or the remote function reported an error.
    RemoteError(String),

    /// The response did not match the expected type. Carries the raw text.
    DecodeError(String),
}

impl<T> CallOutcome<T> {
    /// Returns the decoded value of a successful, non-null call.
    pub fn into_value(self) -> Option<T> {
        match self {
            CallOutcome::Success(value) => value,
            _ => None,
        }
    }
}

impl<T> fmt::Display for CallOutcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallOutcome::Success(Some(_)) => write!(f, "success"),
            CallOutcome::Success(None) => write!(f, "success (null)"),
            CallOutcome::RemoteError(report) => write!(f, "remote error: {}", report),
            CallOutcome::DecodeError(raw) => write!(f, "unexpected response shape: {}", raw),
        }
    }
}

/// Calls remote functions through a [`Transport`] and decodes the results.
///
/// Each call is attempted exactly once.
pub struct Invoker<T: ?Sized> {
    transport: Arc<T>,
    verbose: bool,
}

impl<T: ?Sized> Clone for Invoker<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            verbose: self.verbose,
        }
    }
}

impl<T: Transport + ?Sized> Invoker<T> {
    /// Creates an invoker.
    ///
    /// With `verbose` set, the raw text of every response is logged at
    /// `info` instead of `debug`.
    pub fn new(transport: Arc<T>, verbose: bool) -> Self {
        Self { transport, verbose }
    }

    /// Calls `function_name` with `request` and decodes the result as `O`.
    pub async fn invoke<I, O>(
        &self,
        session: &Session,
        function_name: &str,
        request: &I,
    ) -> CallOutcome<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let payload = match serde_json::to_value(request) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to encode request for {}: {}", function_name, e);
                return CallOutcome::DecodeError(e.to_string());
            }
        };

        let response = match self.transport.call(session, function_name, payload).await {
            Ok(response) => response,
            Err(e) => {
                let report = e.report();
                error!("Call to {} failed: {}", function_name, report);
                return CallOutcome::RemoteError(report);
            }
        };

        if let Some(script_error) = response.error {
            let report = script_error.report();
            error!("{} reported an error: {}", function_name, report);
            return CallOutcome::RemoteError(report);
        }

        let raw = response.result.unwrap_or(Value::Null).to_string();
        self.trace(function_name, "raw response", &raw);

        let outcome = decode::<O>(&raw);
        match &outcome {
            CallOutcome::DecodeError(raw) => {
                error!(
                    "{} returned a response that does not match the expected type: {}",
                    function_name, raw
                );
            }
            _ => self.trace(function_name, "decoded response", &raw),
        }

        outcome
    }

    fn trace(&self, function_name: &str, stage: &str, raw: &str) {
        if self.verbose {
            info!("{} {}: {}", function_name, stage, raw);
        } else {
            debug!("{} {}: {}", function_name, stage, raw);
        }
    }
}

/// Decodes canonical response text.
///
/// Success requires a non-null decoded value, or text that is exactly the
/// null token.
pub fn decode<O: DeserializeOwned>(raw: &str) -> CallOutcome<O> {
    match serde_json::from_str::<Option<O>>(raw) {
        Ok(Some(value)) => CallOutcome::Success(Some(value)),
        Ok(None) if raw == NULL_TOKEN => CallOutcome::Success(None),
        Ok(None) | Err(_) => CallOutcome::DecodeError(raw.to_string()),
    }
}
