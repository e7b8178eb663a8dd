//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{ApiError, FunctionResponse, Session, Transport, TransportResult};

/// A transport that replays queued responses and records every call.
pub(crate) struct ScriptedTransport {
    login: Mutex<Option<TransportResult<Session>>>,
    responses: Mutex<VecDeque<TransportResult<FunctionResponse>>>,
    logins: Mutex<Vec<(String, String)>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedTransport {
    /// A transport whose login succeeds with an active session.
    pub(crate) fn new() -> Self {
        Self {
            login: Mutex::new(Some(Ok(Session::new("ticket", "player")))),
            responses: Mutex::new(VecDeque::new()),
            logins: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_login(self, result: TransportResult<Session>) -> Self {
        *self.login.lock().unwrap() = Some(result);
        self
    }

    /// Queues a raw call result.
    pub(crate) fn push(&self, response: TransportResult<FunctionResponse>) {
        self.responses.lock().unwrap().push_back(response);
    }

    /// Queues a successful call returning `value`.
    pub(crate) fn push_value(&self, value: Value) {
        self.push(Ok(FunctionResponse::ok(value)));
    }

    pub(crate) fn login_count(&self) -> usize {
        self.logins.lock().unwrap().len()
    }

    pub(crate) fn logins(&self) -> Vec<(String, String)> {
        self.logins.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Function names of every call, in order.
    pub(crate) fn called_functions(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub(crate) fn payloads(&self) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn login(&self, tenant_id: &str, identity: &str) -> TransportResult<Session> {
        self.logins
            .lock()
            .unwrap()
            .push((tenant_id.to_string(), identity.to_string()));
        self.login
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(ApiError::connection("login already used")))
    }

    async fn call(
        &self,
        _session: &Session,
        function_name: &str,
        payload: Value,
    ) -> TransportResult<FunctionResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((function_name.to_string(), payload));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::connection("no scripted response")))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
