use std::env;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::backend::ChatBackend;
use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::types::{
    ActiveSessions, AudioQuery, AudioQueryResponse, ChatHistory, ChatRequest, ChatResponse,
    ClearHistoryResponse, HealthStatus, NewSession, SessionId,
};

/// Base URL used when neither an explicit URL nor `BOLTCHAT_BASE_URL` is set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/";
/// Environment variable consulted for the backend base URL.
pub const BASE_URL_ENV: &str = "BOLTCHAT_BASE_URL";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client for the Bolt chat backend.
#[derive(Debug, Clone)]
pub struct BoltClient {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

impl BoltClient {
    /// Create a new client.
    ///
    /// The base URL is read from the BOLTCHAT_BASE_URL environment variable,
    /// falling back to `http://localhost:8000/`.
    pub fn new() -> Result<Self> {
        Self::with_options(None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = match base_url {
            Some(url) => url,
            None => env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        };
        let base_url = parse_base_url(&base_url)?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .default_headers(default_headers())
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// The backend base URL, always ending in `/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build an endpoint URL from path segments, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::url(format!("{} cannot be a base URL", self.base_url), None))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", e),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
        }
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response, resource_id: Option<&SessionId>) -> Error {
        let status_code = response.status().as_u16();

        // FastAPI reports failures as {"detail": "..."}
        #[derive(Deserialize)]
        struct ErrorResponse {
            detail: Option<serde_json::Value>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        let error_message = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.detail)
            .map(|detail| match detail {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .unwrap_or(error_body);

        match status_code {
            404 => Error::not_found(error_message, resource_id.map(|id| id.to_string())),
            408 => Error::timeout(error_message, None),
            _ => Error::api(status_code, error_message),
        }
    }

    /// Send a request, check its status, and decode the JSON body.
    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        resource_id: Option<&SessionId>,
    ) -> Result<T> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = self.execute_inner(request, resource_id).await;
        let elapsed = start.elapsed();
        CLIENT_REQUEST_DURATION.add(elapsed.as_secs_f64());
        match &result {
            Ok(_) => {
                tracing::debug!(operation, elapsed_ms = elapsed.as_millis() as u64, "request ok");
            }
            Err(err) => {
                CLIENT_REQUEST_ERRORS.click();
                tracing::debug!(operation, error = %err, "request failed");
            }
        }
        result
    }

    async fn execute_inner<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource_id: Option<&SessionId>,
    ) -> Result<T> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response, resource_id).await);
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_slice::<T>(&body).map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }
}

#[async_trait::async_trait]
impl ChatBackend for BoltClient {
    async fn send_chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = self.endpoint(&["chat"])?;
        let builder = self.client.post(url).json(&request);
        self.execute("send_chat", builder, request.session_id.as_ref())
            .await
    }

    async fn fetch_history(&self, session_id: &SessionId) -> Result<ChatHistory> {
        let url = self.endpoint(&["chat", "history", session_id.as_str()])?;
        self.execute("fetch_history", self.client.get(url), Some(session_id))
            .await
    }

    async fn clear_history(&self, session_id: &SessionId) -> Result<ClearHistoryResponse> {
        let url = self.endpoint(&["chat", "history", session_id.as_str()])?;
        self.execute("clear_history", self.client.delete(url), Some(session_id))
            .await
    }

    async fn list_sessions(&self) -> Result<ActiveSessions> {
        let url = self.endpoint(&["chat", "sessions"])?;
        self.execute("list_sessions", self.client.get(url), None)
            .await
    }

    async fn new_session(&self) -> Result<NewSession> {
        let url = self.endpoint(&["chat", "new"])?;
        self.execute("new_session", self.client.post(url), None)
            .await
    }

    async fn audio_query(&self, query: AudioQuery) -> Result<AudioQueryResponse> {
        let url = self.endpoint(&["audio", "query"])?;
        let mime = query.mime_type();
        let part = Part::bytes(query.bytes)
            .file_name(query.file_name)
            .mime_str(mime)
            .map_err(|e| {
                Error::http_client(format!("Invalid audio MIME type: {}", e), Some(Box::new(e)))
            })?;
        let form = Form::new().part("audio", part).text("prompt", query.prompt);
        self.execute("audio_query", self.client.post(url).multipart(form), None)
            .await
    }

    async fn health(&self) -> Result<HealthStatus> {
        let url = self.endpoint(&["health"])?;
        self.execute("health", self.client.get(url), None).await
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    let url = Url::parse(&raw)?;
    if url.cannot_be_a_base() {
        return Err(Error::url(format!("{raw} cannot be a base URL"), None));
    }
    Ok(url)
}
