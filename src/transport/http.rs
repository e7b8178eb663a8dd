//! HTTP transport for the backend's client API.
//!
//! Speaks the JSON-over-HTTPS protocol used by the backend:
//!
//! - `POST /Client/LoginWithCustomID` logs in (creating the account when
//!   needed) and returns a session ticket.
//! - `POST /Client/ExecuteCloudScript` runs a named server-side function.
//!   The session ticket goes in the `X-Authorization` header.
//!
//! Every response is wrapped in an envelope:
//!
//! ```json
//! {"code": 200, "status": "OK", "data": { ... }}
//! ```
//!
//! Error responses carry the fields of [`ApiError`] instead of `data`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{ApiError, FunctionResponse, ScriptError, Session, Transport, TransportResult};

/// Header carrying the session ticket.
const AUTH_HEADER: &str = "X-Authorization";

const LOGIN_PATH: &str = "/Client/LoginWithCustomID";
const EXECUTE_PATH: &str = "/Client/ExecuteCloudScript";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct LoginRequest<'a> {
    title_id: &'a str,
    custom_id: &'a str,
    create_account: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoginResult {
    session_ticket: Option<String>,
    play_fab_id: Option<String>,
    #[serde(default)]
    newly_created: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ExecuteRequest<'a> {
    function_name: &'a str,
    function_parameter: Value,
    generate_play_stream_event: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExecuteResult {
    #[serde(default)]
    function_result: Option<Value>,
    #[serde(default)]
    error: Option<ScriptError>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

/// [`Transport`] over HTTPS using reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Base URL of the backend (e.g., "https://6195.playfabapi.com")
    base_url: String,
    client: Client,
}

impl HttpTransport {
    /// Create a transport with a default HTTP client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a transport with a custom HTTP client.
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Create a transport whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (e.g. no TLS backend).
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, T>(&self, path: &str, ticket: Option<&str>, body: &B) -> TransportResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!("POST {}", url);

        let mut request = self.client.post(&url).json(body);
        if let Some(ticket) = ticket {
            request = request.header(AUTH_HEADER, ticket);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::connection(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            ApiError::connection(format!("Failed to read response from {}: {}", url, e))
        })?;

        parse_response(
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown"),
            &text,
        )
    }
}

/// Decode an envelope body into its `data` payload or an [`ApiError`].
fn parse_response<T: DeserializeOwned>(code: u16, reason: &str, body: &str) -> TransportResult<T> {
    if !(200..300).contains(&code) {
        let mut error = serde_json::from_str::<ApiError>(body).unwrap_or_else(|_| ApiError {
            code,
            status: reason.to_string(),
            error: "HttpError".to_string(),
            error_code: 0,
            error_message: body.to_string(),
            error_details: None,
        });
        if error.code == 0 {
            error.code = code;
        }
        if error.status.is_empty() {
            error.status = reason.to_string();
        }
        // JSON that is not the backend envelope, e.g. from a gateway
        if error.error.is_empty() && error.error_message.is_empty() {
            error.error = "HttpError".to_string();
            error.error_message = body.to_string();
        }
        return Err(error);
    }

    let envelope: Envelope<T> = serde_json::from_str(body).map_err(|e| ApiError {
        code,
        status: reason.to_string(),
        error: "MalformedResponse".to_string(),
        error_code: 0,
        error_message: format!("Failed to parse response envelope: {}", e),
        error_details: None,
    })?;

    envelope.data.ok_or_else(|| ApiError {
        code,
        status: reason.to_string(),
        error: "MalformedResponse".to_string(),
        error_code: 0,
        error_message: "Response envelope has no data".to_string(),
        error_details: None,
    })
}

impl From<LoginResult> for Session {
    fn from(result: LoginResult) -> Self {
        match result.session_ticket {
            Some(ticket) => Session::new(ticket, result.play_fab_id.unwrap_or_default())
                .with_newly_created(result.newly_created),
            None => Session::inactive(),
        }
    }
}

impl From<ExecuteResult> for FunctionResponse {
    fn from(result: ExecuteResult) -> Self {
        FunctionResponse {
            result: result.function_result,
            error: result.error,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn login(&self, tenant_id: &str, identity: &str) -> TransportResult<Session> {
        let request = LoginRequest {
            title_id: tenant_id,
            custom_id: identity,
            create_account: true,
        };
        let result: LoginResult = self.post(LOGIN_PATH, None, &request).await?;
        Ok(result.into())
    }

    async fn call(
        &self,
        session: &Session,
        function_name: &str,
        payload: Value,
    ) -> TransportResult<FunctionResponse> {
        let ticket = session
            .ticket()
            .ok_or_else(|| ApiError::connection("Not logged in: session has no ticket"))?;

        let request = ExecuteRequest {
            function_name,
            function_parameter: payload,
            generate_play_stream_event: false,
        };
        let result: ExecuteResult = self.post(EXECUTE_PATH, Some(ticket), &request).await?;
        Ok(result.into())
    }

    fn name(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transport_trims_trailing_slash() {
        let transport = HttpTransport::new("https://6195.playfabapi.com/");
        assert_eq!(transport.base_url(), "https://6195.playfabapi.com");
        assert_eq!(
            transport.url(LOGIN_PATH),
            "https://6195.playfabapi.com/Client/LoginWithCustomID"
        );
    }

    #[test]
    fn test_login_request_shape() {
        let request = LoginRequest {
            title_id: "6195",
            custom_id: "jenkins-42",
            create_account: true,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"TitleId": "6195", "CustomId": "jenkins-42", "CreateAccount": true})
        );
    }

    #[test]
    fn test_execute_request_shape() {
        let request = ExecuteRequest {
            function_name: "TestDataExists",
            function_parameter: json!({"customId": "jenkins-42"}),
            generate_play_stream_event: false,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "FunctionName": "TestDataExists",
                "FunctionParameter": {"customId": "jenkins-42"},
                "GeneratePlayStreamEvent": false
            })
        );
    }

    #[test]
    fn test_parse_login_response() {
        let body = r#"{"code":200,"status":"OK","data":{"SessionTicket":"T-1","PlayFabId":"P-1","NewlyCreated":true}}"#;
        let result: LoginResult = parse_response(200, "OK", body).unwrap();
        let session = Session::from(result);
        assert!(session.is_active());
        assert_eq!(session.ticket(), Some("T-1"));
        assert_eq!(session.player_id(), Some("P-1"));
        assert!(session.newly_created());
    }

    #[test]
    fn test_login_without_ticket_is_inactive() {
        let body = r#"{"code":200,"status":"OK","data":{"PlayFabId":"P-1"}}"#;
        let result: LoginResult = parse_response(200, "OK", body).unwrap();
        assert!(!Session::from(result).is_active());
    }

    #[test]
    fn test_parse_execute_response_with_script_error() {
        let body = r#"{"code":200,"status":"OK","data":{
            "FunctionName":"GetTestData",
            "Error":{"Error":"JavascriptException","Message":"oops","StackTrace":"at x"}}}"#;
        let result: ExecuteResult = parse_response(200, "OK", body).unwrap();
        let response = FunctionResponse::from(result);
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().message, "oops");
    }

    #[test]
    fn test_parse_execute_response_with_result() {
        let body = r#"{"code":200,"status":"OK","data":{"FunctionResult":true}}"#;
        let result: ExecuteResult = parse_response(200, "OK", body).unwrap();
        assert_eq!(FunctionResponse::from(result), FunctionResponse::ok(json!(true)));
    }

    #[test]
    fn test_parse_error_envelope() {
        let body = r#"{"code":400,"status":"BadRequest","error":"InvalidTitleId","errorCode":1004,"errorMessage":"Invalid title id"}"#;
        let err = parse_response::<LoginResult>(400, "Bad Request", body).unwrap_err();
        assert_eq!(err.error, "InvalidTitleId");
        assert_eq!(err.error_code, 1004);
        assert_eq!(err.report(), "Invalid title id");
    }

    #[test]
    fn test_parse_non_json_error_body() {
        let err = parse_response::<LoginResult>(502, "Bad Gateway", "upstream down").unwrap_err();
        assert_eq!(err.code, 502);
        assert_eq!(err.error, "HttpError");
        assert_eq!(err.report(), "upstream down");
    }

    #[test]
    fn test_parse_foreign_json_error_body_keeps_body() {
        let body = r#"{"message":"upstream timed out"}"#;
        let err = parse_response::<LoginResult>(502, "Bad Gateway", body).unwrap_err();
        assert_eq!(err.code, 502);
        assert_eq!(err.status, "Bad Gateway");
        assert_eq!(err.error, "HttpError");
        assert!(err.report().contains("upstream timed out"));
    }

    #[test]
    fn test_parse_envelope_without_data() {
        let err = parse_response::<LoginResult>(200, "OK", r#"{"code":200}"#).unwrap_err();
        assert_eq!(err.error, "MalformedResponse");
    }

    #[tokio::test]
    async fn test_call_without_ticket_fails_before_sending() {
        let transport = HttpTransport::new("http://127.0.0.1:9");
        let err = transport
            .call(&Session::inactive(), "TestDataExists", json!({}))
            .await
            .unwrap_err();
        assert!(err.is_connection_error());
        assert!(err.report().contains("Not logged in"));
    }
}
