//! Authenticated HTTP client for the chat backend
//!
//! [`ApiClient`] wraps a `reqwest::Client` with the backend base URL and a
//! [`TokenHandle`]. Every request reads the token handle at send time, so a
//! refresh through any handle clone is picked up by the next call without
//! rebuilding the client.
//!
//! REST calls carry a per-request timeout. The stream request deliberately
//! does not: a healthy answer stream can outlive any fixed request timeout,
//! and silence is bounded by the stream controller's idle timeout instead.

use std::path::Path;
use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use url::Url;

use crate::api::types::{
    ChatStreamRequest, PdfDocument, SessionDetail, SessionSummary, UserProfile,
};
use crate::auth::TokenHandle;
use crate::error::{AskdocError, Result};

/// Cap on error-body excerpts included in error messages.
const ERROR_BODY_EXCERPT: usize = 200;

/// HTTP client for the chat backend's REST and stream endpoints
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// Underlying reqwest HTTP client.
    http: reqwest::Client,
    /// Backend base URL, normalized to end with a slash.
    base_url: Url,
    /// Shared bearer token cell, read at request time.
    token: TokenHandle,
    /// Timeout applied to REST requests (not the answer stream).
    request_timeout: Duration,
}

impl ApiClient {
    /// Construct a new client for `base_url`
    ///
    /// No network I/O is performed at construction time.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Backend base URL; endpoint paths are joined under it.
    /// * `token` - Shared bearer token handle. An empty handle means guest
    ///   access.
    /// * `request_timeout` - Per-request timeout for REST calls.
    pub fn new(base_url: Url, token: TokenHandle, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(AskdocError::Http)?;

        Ok(Self {
            http,
            base_url,
            token,
            request_timeout,
        })
    }

    /// The shared token handle this client reads from
    pub fn token(&self) -> &TokenHandle {
        &self.token
    }

    /// Resolve an endpoint path against the base URL
    fn endpoint(&self, path: &str) -> Result<Url> {
        let url = self.base_url.join(path)?;
        Ok(url)
    }

    /// Attach the current bearer token, when one is held
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token.get() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Map a response's status to an error, or pass it through
    ///
    /// - `401` -> [`AskdocError::Authentication`]
    /// - `404` -> [`AskdocError::NotFound`]
    /// - other non-success -> [`AskdocError::Api`] with a body excerpt
    async fn check(response: Response, what: &str) -> Result<Response> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(anyhow::anyhow!(AskdocError::Authentication(format!(
                "{}: HTTP 401",
                what
            ))));
        }

        if status == StatusCode::NOT_FOUND {
            return Err(anyhow::anyhow!(AskdocError::NotFound(what.to_string())));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(ERROR_BODY_EXCERPT).collect();
            return Err(anyhow::anyhow!(AskdocError::Api(format!(
                "{}: HTTP {}: {}",
                what, status, excerpt
            ))));
        }

        Ok(response)
    }

    /// List the signed-in user's chat sessions
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let response = self
            .authorize(self.http.get(self.endpoint("chat/sessions")?))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(AskdocError::Http)?;

        let response = Self::check(response, "list chat sessions").await?;
        Ok(response.json().await.map_err(AskdocError::Http)?)
    }

    /// Fetch one session with its full message history
    pub async fn get_session(&self, session_id: i64) -> Result<SessionDetail> {
        let response = self
            .authorize(
                self.http
                    .get(self.endpoint(&format!("chat/sessions/{}", session_id))?),
            )
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(AskdocError::Http)?;

        let response = Self::check(response, &format!("chat session {}", session_id)).await?;
        Ok(response.json().await.map_err(AskdocError::Http)?)
    }

    /// Rename a session; returns the updated summary
    pub async fn rename_session(&self, session_id: i64, name: &str) -> Result<SessionSummary> {
        let response = self
            .authorize(
                self.http
                    .put(self.endpoint(&format!("chat/sessions/{}", session_id))?),
            )
            .timeout(self.request_timeout)
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await
            .map_err(AskdocError::Http)?;

        let response = Self::check(response, &format!("chat session {}", session_id)).await?;
        Ok(response.json().await.map_err(AskdocError::Http)?)
    }

    /// Delete a session and all its messages
    pub async fn delete_session(&self, session_id: i64) -> Result<()> {
        let response = self
            .authorize(
                self.http
                    .delete(self.endpoint(&format!("chat/sessions/{}", session_id))?),
            )
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(AskdocError::Http)?;

        Self::check(response, &format!("chat session {}", session_id)).await?;
        Ok(())
    }

    /// Start one chat exchange and return the raw streaming response
    ///
    /// The response body is a `text/event-stream` of answer frames; the
    /// stream controller owns parsing and lifecycle. No request timeout is
    /// applied here (see the module docs).
    pub async fn open_chat_stream(&self, request: &ChatStreamRequest) -> Result<Response> {
        let response = self
            .authorize(self.http.post(self.endpoint("chat/stream")?))
            .header("Accept", "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(AskdocError::Http)?;

        Self::check(response, "chat stream").await
    }

    /// Upload a PDF to use as retrieval context
    pub async fn upload_pdf(&self, file: &Path) -> Result<PdfDocument> {
        let bytes = tokio::fs::read(file).await.map_err(AskdocError::Io)?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(AskdocError::Http)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .authorize(self.http.post(self.endpoint("pdf/upload")?))
            .timeout(self.request_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(AskdocError::Http)?;

        let response = Self::check(response, "pdf upload").await?;
        Ok(response.json().await.map_err(AskdocError::Http)?)
    }

    /// List the signed-in user's uploaded PDFs
    pub async fn list_pdfs(&self) -> Result<Vec<PdfDocument>> {
        let response = self
            .authorize(self.http.get(self.endpoint("pdf/list")?))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(AskdocError::Http)?;

        let response = Self::check(response, "list pdfs").await?;
        Ok(response.json().await.map_err(AskdocError::Http)?)
    }

    /// Attach a PDF to a session on the server
    pub async fn attach_pdf(&self, session_id: i64, pdf_id: i64) -> Result<()> {
        let path = format!("pdf/sessions/{}/add_pdf/{}", session_id, pdf_id);
        let response = self
            .authorize(self.http.post(self.endpoint(&path)?))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(AskdocError::Http)?;

        Self::check(response, &format!("attach pdf {} to session {}", pdf_id, session_id)).await?;
        Ok(())
    }

    /// Detach a PDF from a session on the server
    pub async fn detach_pdf(&self, session_id: i64, pdf_id: i64) -> Result<()> {
        let path = format!("pdf/sessions/{}/remove_pdf/{}", session_id, pdf_id);
        let response = self
            .authorize(self.http.delete(self.endpoint(&path)?))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(AskdocError::Http)?;

        Self::check(
            response,
            &format!("detach pdf {} from session {}", pdf_id, session_id),
        )
        .await?;
        Ok(())
    }

    /// List the PDFs attached to a session
    pub async fn session_pdfs(&self, session_id: i64) -> Result<Vec<PdfDocument>> {
        let path = format!("pdf/sessions/{}/pdfs", session_id);
        let response = self
            .authorize(self.http.get(self.endpoint(&path)?))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(AskdocError::Http)?;

        let response = Self::check(response, &format!("pdfs for session {}", session_id)).await?;
        Ok(response.json().await.map_err(AskdocError::Http)?)
    }

    /// Fetch the signed-in user's profile
    pub async fn me(&self) -> Result<UserProfile> {
        let response = self
            .authorize(self.http.get(self.endpoint("auth/me")?))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(AskdocError::Http)?;

        let response = Self::check(response, "user profile").await?;
        Ok(response.json().await.map_err(AskdocError::Http)?)
    }
}
