use std::error::Error as StdError;
use std::fmt;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::api::{
    first_field_error, ChatReply, ChatRequest, LoginRequest, ProfilePatch, RefreshRequest,
    RefreshResponse, RegisterRequest, RegisterResponse, TokenResponse, User,
};
use crate::core::message::PendingFile;
use crate::utils::url::construct_api_url;

const LOGIN_ENDPOINT: &str = "login/";
const REGISTER_ENDPOINT: &str = "register/";
const REFRESH_ENDPOINT: &str = "token/refresh/";
const PROFILE_ENDPOINT: &str = "profile/";
const CHAT_ENDPOINT: &str = "chat/";

#[derive(Debug)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, reset).
    Transport(reqwest::Error),
    Timeout,
    /// The backend answered with a non-success status.
    Status { status: u16, body: String },
    /// A success response did not match the expected JSON shape.
    Decode(reqwest::Error),
    /// A staged file could not be turned into a multipart part.
    InvalidUpload { name: String, source: reqwest::Error },
}

impl ApiError {
    fn from_send(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Transport(err)
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    /// Human-readable summary of a status error's body, if it carries one.
    pub fn body_message(&self, preferred: &[&str]) -> Option<String> {
        match self {
            ApiError::Status { body, .. } => first_field_error(body, preferred),
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Transport(err) => write!(f, "Could not reach the server: {err}"),
            ApiError::Timeout => write!(f, "The server took too long to respond"),
            ApiError::Status { status, body } => match first_field_error(body, &[]) {
                Some(message) => write!(f, "Server error ({status}): {message}"),
                None => write!(f, "Server error ({status})"),
            },
            ApiError::Decode(err) => write!(f, "Unexpected response from server: {err}"),
            ApiError::InvalidUpload { name, source } => {
                write!(f, "Cannot upload '{name}': {source}")
            }
        }
    }
}

impl StdError for ApiError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ApiError::Transport(err) | ApiError::Decode(err) => Some(err),
            ApiError::InvalidUpload { source, .. } => Some(source),
            ApiError::Timeout | ApiError::Status { .. } => None,
        }
    }
}

/// Seam between the chat controller and the network.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send_chat(&self, text: &str, files: &[PendingFile]) -> Result<ChatReply, ApiError>;
}

/// HTTP client for the backend, holding the shared bearer default.
///
/// Login, register and bootstrap install the access token here; every
/// authorized call made through the same instance then carries it.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    bearer: RwLock<Option<String>>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("has_bearer", &self.has_bearer())
            .finish()
    }
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Transport)?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            bearer: RwLock::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_bearer(&self, access_token: &str) {
        *self
            .bearer
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(access_token.to_string());
    }

    pub fn clear_bearer(&self) {
        *self
            .bearer
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    pub fn has_bearer(&self) -> bool {
        self.bearer
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    fn url(&self, endpoint: &str) -> String {
        construct_api_url(&self.base_url, endpoint)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self
            .bearer
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        match bearer {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        tracing::debug!(endpoint, "Sending backend request");
        let response = request.send().await.map_err(ApiError::from_send)?;
        decode_response(endpoint, response).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let request = self
            .http
            .post(self.url(LOGIN_ENDPOINT))
            .json(&LoginRequest { username, password });
        self.execute(LOGIN_ENDPOINT, request).await
    }

    pub async fn register(&self, fields: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        let request = self.http.post(self.url(REGISTER_ENDPOINT)).json(fields);
        self.execute(REGISTER_ENDPOINT, request).await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError> {
        let request = self
            .http
            .post(self.url(REFRESH_ENDPOINT))
            .json(&RefreshRequest {
                refresh: refresh_token,
            });
        self.execute(REFRESH_ENDPOINT, request).await
    }

    pub async fn profile(&self) -> Result<User, ApiError> {
        let request = self.authorize(self.http.get(self.url(PROFILE_ENDPOINT)));
        self.execute(PROFILE_ENDPOINT, request).await
    }

    pub async fn update_profile(&self, patch: &ProfilePatch) -> Result<User, ApiError> {
        let request = self
            .authorize(self.http.patch(self.url(PROFILE_ENDPOINT)))
            .json(patch);
        self.execute(PROFILE_ENDPOINT, request).await
    }

    /// Plain JSON when nothing is attached, multipart otherwise.
    pub async fn chat(&self, text: &str, files: &[PendingFile]) -> Result<ChatReply, ApiError> {
        let request = self.authorize(self.http.post(self.url(CHAT_ENDPOINT)));
        let request = if files.is_empty() {
            request.json(&ChatRequest { message: text })
        } else {
            request.multipart(build_chat_form(text, files)?)
        };
        self.execute(CHAT_ENDPOINT, request).await
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn send_chat(&self, text: &str, files: &[PendingFile]) -> Result<ChatReply, ApiError> {
        self.chat(text, files).await
    }
}

fn build_chat_form(text: &str, files: &[PendingFile]) -> Result<Form, ApiError> {
    let mut form = Form::new().text("message", text.to_string());
    for file in files {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|source| ApiError::InvalidUpload {
                name: file.name.clone(),
                source,
            })?;
        form = form.part("files", part);
    }
    Ok(form)
}

async fn decode_response<T: DeserializeOwned>(
    endpoint: &str,
    response: Response,
) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(endpoint, status = status.as_u16(), "Backend request failed");
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    response.json::<T>().await.map_err(ApiError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{MockBackend, MockResponse};

    #[tokio::test]
    async fn chat_without_files_posts_json_with_bearer() {
        let backend = MockBackend::start(vec![MockResponse::json(
            200,
            r#"{"response":"Echo: hi","artifacts":[{"type":"text","content":"note"}]}"#,
        )])
        .await;
        let client = backend.client();
        client.set_bearer("tok-1");

        let reply = client.chat("hi", &[]).await.expect("chat should succeed");
        assert_eq!(reply.response, "Echo: hi");
        assert_eq!(reply.artifacts.map(|a| a.len()), Some(1));

        let requests = backend.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/api/chat/");
        assert_eq!(requests[0].header("authorization"), Some("Bearer tok-1"));
        assert!(requests[0]
            .header("content-type")
            .unwrap_or_default()
            .starts_with("application/json"));
        assert_eq!(requests[0].json()["message"], "hi");
    }

    #[tokio::test]
    async fn slow_reply_maps_to_timeout() {
        let backend = MockBackend::start(vec![MockResponse::json(200, r#"{"response":"late"}"#)
            .delayed(Duration::from_millis(500))])
        .await;
        let http = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        let client = ApiClient::with_client(http, backend.base_url());
        assert_eq!(client.base_url(), backend.base_url());

        let err = client.chat("hello", &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout), "{err:?}");
    }

    #[tokio::test]
    async fn chat_with_files_uses_multipart() {
        let backend =
            MockBackend::start(vec![MockResponse::json(200, r#"{"response":"got it"}"#)]).await;
        let client = backend.client();
        let files = vec![PendingFile::new(
            "notes.txt",
            "text/plain",
            b"file body".to_vec(),
        )];

        client.chat("see file", &files).await.expect("chat should succeed");

        let requests = backend.requests().await;
        let content_type = requests[0].header("content-type").unwrap_or_default();
        assert!(content_type.starts_with("multipart/form-data"));
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"message\""));
        assert!(body.contains("see file"));
        assert!(body.contains("filename=\"notes.txt\""));
        assert!(body.contains("file body"));
    }

    #[tokio::test]
    async fn login_does_not_send_bearer() {
        let backend = MockBackend::start(vec![MockResponse::json(
            200,
            r#"{"access":"a","refresh":"r"}"#,
        )])
        .await;
        let client = backend.client();
        client.set_bearer("stale");

        let tokens = client.login("alice", "pw123").await.unwrap();
        assert_eq!(tokens.access, "a");

        let requests = backend.requests().await;
        assert_eq!(requests[0].path, "/api/login/");
        assert_eq!(requests[0].header("authorization"), None);
        assert_eq!(requests[0].json()["username"], "alice");
    }

    #[tokio::test]
    async fn status_errors_keep_body_for_messages() {
        let backend = MockBackend::start(vec![MockResponse::json(
            400,
            r#"{"error":"Message is required"}"#,
        )])
        .await;
        let client = backend.client();

        let err = client.chat("x", &[]).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(
            err.body_message(&[]).as_deref(),
            Some("Message is required")
        );
        assert_eq!(err.to_string(), "Server error (400): Message is required");
    }

    #[tokio::test]
    async fn clear_bearer_drops_authorization() {
        let backend = MockBackend::start(vec![MockResponse::json(
            401,
            r#"{"detail":"Authentication credentials were not provided."}"#,
        )])
        .await;
        let client = backend.client();
        client.set_bearer("tok");
        client.clear_bearer();
        assert!(!client.has_bearer());

        let err = client.profile().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(backend.requests().await[0].header("authorization"), None);
    }

    #[test]
    fn invalid_mime_type_is_reported() {
        let files = vec![PendingFile::new("bad.bin", "not a mime", vec![1, 2, 3])];
        let err = build_chat_form("x", &files).unwrap_err();
        assert!(matches!(err, ApiError::InvalidUpload { ref name, .. } if name == "bad.bin"));
    }
}
