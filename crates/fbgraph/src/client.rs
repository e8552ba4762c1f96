//! HTTP Gateway
//!
//! Every vendor request in the process flows through [`GraphClient`].
//! Centralizing host, version, and credential handling here is what makes
//! the production-host guardrail enforceable.

use bytes::Bytes;
use reqwest::multipart::Form;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Production Graph API host.
pub const GRAPH_HOST: &str = "https://graph.facebook.com";

/// Production video upload host (transfer phase posts go here).
pub const VIDEO_HOST: &str = "https://graph-video.facebook.com";

/// Fixed Graph API version tag. Dictated by the vendor; changing it
/// reshapes every URL the server emits.
pub const API_VERSION: &str = "v23.0";

/// Environment variable holding the access token.
pub const ACCESS_TOKEN_ENV: &str = "FACEBOOK_ACCESS_TOKEN";

/// When this variable is `"true"`, any request aimed at a production
/// facebook.com host panics before it is sent.
pub const TESTING_ENV: &str = "TESTING";

/// Query parameter list for GET/DELETE requests.
pub type Query = Vec<(String, String)>;

/// Structured vendor error extracted from the standard envelope
/// `{"error": {"message", "type", "code", "error_subcode", "fbtrace_id", ...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// HTTP status the vendor answered with.
    pub http_status: u16,
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_subcode: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fbtrace_id: Option<String>,
    /// Extra payload some errors carry (offset resync data, etc).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_data: Option<Value>,
    /// Vendor marks errors that are safe to retry.
    #[serde(default)]
    pub is_transient: bool,
}

impl ApiError {
    /// The single human-readable line surfaced to agents.
    pub fn summary(&self) -> String {
        format!(
            "{} (code: {}, type: {}, http_status: {})",
            self.message, self.code, self.error_type, self.http_status
        )
    }
}

/// Errors produced by the gateway and the helpers built on it.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The vendor answered >= 400 with a parseable error envelope.
    #[error("{}", .0.summary())]
    Api(ApiError),

    /// The vendor answered >= 400 with something other than the envelope.
    #[error("http status {status}: {body}")]
    Status { status: u16, body: String },

    /// Connection failure, decode failure, or other pre-status trouble.
    #[error("transport error: {0}")]
    Transport(String),

    /// No credential available at startup.
    #[error("missing credential: set {ACCESS_TOKEN_ENV}")]
    MissingCredential,

    /// The caller's cancellation token fired mid-request.
    #[error("request cancelled")]
    Cancelled,

    /// Caller-supplied input rejected before any network call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Video upload session failure.
    #[error("upload error: {0}")]
    Upload(String),
}

impl GraphError {
    /// Vendor error subcode, when this is an [`GraphError::Api`].
    pub fn subcode(&self) -> Option<i64> {
        match self {
            GraphError::Api(e) => e.error_subcode,
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: EnvelopeBody,
}

#[derive(Debug, Deserialize)]
struct EnvelopeBody {
    #[serde(default)]
    message: String,
    #[serde(rename = "type", default)]
    error_type: String,
    #[serde(default)]
    code: i64,
    error_subcode: Option<i64>,
    fbtrace_id: Option<String>,
    error_data: Option<Value>,
    #[serde(default)]
    is_transient: bool,
}

/// Process-wide issuer of vendor HTTP requests.
///
/// Host, version, and credential are fixed at construction; the
/// `with_*` setters exist for tests and are never called on the
/// production path.
#[derive(Debug, Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    host: String,
    video_host: String,
    version: String,
    access_token: String,
}

impl GraphClient {
    /// Create a client for the production hosts with the given credential.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            host: GRAPH_HOST.to_string(),
            video_host: VIDEO_HOST.to_string(),
            version: API_VERSION.to_string(),
            access_token: access_token.into(),
        }
    }

    /// Create a client from `FACEBOOK_ACCESS_TOKEN`.
    pub fn from_env() -> Result<Self, GraphError> {
        match std::env::var(ACCESS_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => Ok(Self::new(token)),
            _ => Err(GraphError::MissingCredential),
        }
    }

    /// Override the Graph host (tests only).
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Override the video upload host (tests only).
    pub fn with_video_host(mut self, host: impl Into<String>) -> Self {
        self.video_host = host.into();
        self
    }

    /// Override the API version tag (tests only).
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// The API version tag in use.
    pub fn version(&self) -> &str {
        &self.version
    }

    fn url(&self, host: &str, path: &str) -> String {
        if path.is_empty() {
            format!("{}/{}", host, self.version)
        } else if path.starts_with('/') {
            format!("{}/{}{}", host, self.version, path)
        } else {
            format!("{}/{}/{}", host, self.version, path)
        }
    }

    /// Panics when `TESTING=true` and the target host is a facebook.com
    /// domain. No request may leave the process in that state.
    fn guard(&self, host: &str) {
        let testing = std::env::var(TESTING_ENV)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if testing && host.contains("facebook.com") {
            panic!(
                "TESTING=true but request targets production host {}; refusing to send",
                host
            );
        }
    }

    /// GET `{host}/{version}{path}` with the given query parameters.
    pub async fn get(
        &self,
        path: &str,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<Bytes, GraphError> {
        self.guard(&self.host);
        let req = self
            .http
            .get(self.url(&self.host, path))
            .query(query)
            .query(&[("access_token", self.access_token.as_str())]);
        self.execute(req, cancel).await
    }

    /// DELETE with query parameters.
    pub async fn delete(
        &self,
        path: &str,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<Bytes, GraphError> {
        self.guard(&self.host);
        let req = self
            .http
            .delete(self.url(&self.host, path))
            .query(query)
            .query(&[("access_token", self.access_token.as_str())]);
        self.execute(req, cancel).await
    }

    /// POST with a JSON body.
    pub async fn post_json(
        &self,
        path: &str,
        body: &Value,
        cancel: &CancellationToken,
    ) -> Result<Bytes, GraphError> {
        self.guard(&self.host);
        let req = self
            .http
            .post(self.url(&self.host, path))
            .query(&[("access_token", self.access_token.as_str())])
            .json(body);
        self.execute(req, cancel).await
    }

    /// POST with a form-encoded body. The credential rides in the form,
    /// matching the vendor's batch wire format.
    pub async fn post_form(
        &self,
        path: &str,
        fields: &[(String, String)],
        cancel: &CancellationToken,
    ) -> Result<Bytes, GraphError> {
        self.guard(&self.host);
        let mut form: Vec<(String, String)> = fields.to_vec();
        form.push(("access_token".to_string(), self.access_token.clone()));
        let req = self.http.post(self.url(&self.host, path)).form(&form);
        self.execute(req, cancel).await
    }

    /// POST a multipart form to the video host (chunk transfer phase).
    pub async fn post_multipart_video(
        &self,
        path: &str,
        form: Form,
        cancel: &CancellationToken,
    ) -> Result<Bytes, GraphError> {
        self.guard(&self.video_host);
        let req = self
            .http
            .post(self.url(&self.video_host, path))
            .query(&[("access_token", self.access_token.as_str())])
            .multipart(form);
        self.execute(req, cancel).await
    }

    async fn execute(
        &self,
        req: reqwest::RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<Bytes, GraphError> {
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(GraphError::Cancelled),
            resp = req.send() => resp.map_err(|e| GraphError::Transport(e.to_string()))?,
        };
        let status = response.status().as_u16();
        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(GraphError::Cancelled),
            bytes = response.bytes() => bytes.map_err(|e| GraphError::Transport(e.to_string()))?,
        };
        if status >= 400 {
            return Err(extract_error(status, &body));
        }
        Ok(body)
    }
}

/// Parse the vendor error envelope out of an error response body,
/// falling back to raw status + body when the envelope is absent.
pub fn extract_error(status: u16, body: &[u8]) -> GraphError {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => GraphError::Api(ApiError {
            http_status: status,
            message: envelope.error.message,
            error_type: envelope.error.error_type,
            code: envelope.error.code,
            error_subcode: envelope.error.error_subcode,
            fbtrace_id: envelope.error.fbtrace_id,
            error_data: envelope.error.error_data,
            is_transient: envelope.error.is_transient,
        }),
        Err(_) => GraphError::Status {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_assembly() {
        let client = GraphClient::new("tok").with_host("http://127.0.0.1:9");
        assert_eq!(
            client.url("http://127.0.0.1:9", "/act_123/ads"),
            "http://127.0.0.1:9/v23.0/act_123/ads"
        );
        assert_eq!(client.url("http://127.0.0.1:9", ""), "http://127.0.0.1:9/v23.0");
        assert_eq!(
            client.url("http://127.0.0.1:9", "me"),
            "http://127.0.0.1:9/v23.0/me"
        );
    }

    #[test]
    fn test_extract_error_envelope() {
        let body = br#"{"error":{"message":"Invalid parameter","type":"OAuthException","code":100,"error_subcode":1363037,"fbtrace_id":"AbC","error_data":{"start_offset":"10"}}}"#;
        let err = extract_error(400, body);
        match &err {
            GraphError::Api(api) => {
                assert_eq!(api.code, 100);
                assert_eq!(api.error_subcode, Some(1363037));
                assert_eq!(api.fbtrace_id.as_deref(), Some("AbC"));
                assert!(!api.is_transient);
            }
            other => panic!("expected Api error, got {:?}", other),
        }
        assert_eq!(
            err.to_string(),
            "Invalid parameter (code: 100, type: OAuthException, http_status: 400)"
        );
    }

    #[test]
    fn test_extract_error_non_envelope() {
        let err = extract_error(502, b"Bad Gateway");
        match err {
            GraphError::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "Bad Gateway");
            }
            other => panic!("expected Status error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_env_missing_credential() {
        // Scoped env juggling; serialize with a lock if more env tests appear.
        let saved = std::env::var(ACCESS_TOKEN_ENV).ok();
        std::env::remove_var(ACCESS_TOKEN_ENV);
        assert!(matches!(
            GraphClient::from_env(),
            Err(GraphError::MissingCredential)
        ));
        if let Some(token) = saved {
            std::env::set_var(ACCESS_TOKEN_ENV, token);
        }
    }
}
