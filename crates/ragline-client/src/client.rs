// SPDX-FileCopyrightText: 2026 Ragline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the chat service's versioned REST API.
//!
//! Provides [`ApiClient`] which handles request construction, bearer
//! authentication, session invalidation on 401/403, `detail` extraction
//! from error bodies, and the streaming endpoints.

use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use ragline_config::ApiConfig;
use ragline_core::{
    Conversation, ConversationId, Document, DocumentId, Message, MessageId, RaglineError,
    UploadReport,
};

use crate::session::Session;

/// Versioned prefix appended to the configured service root.
const API_PREFIX: &str = "/api/v1";

/// Raw byte stream of a streaming response, status-checked and ready for
/// frame decoding.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, RaglineError>> + Send>>;

/// A file handed to [`ApiClient::upload_documents`].
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Serialize)]
struct CreateConversationBody<'a> {
    title: &'a str,
}

#[derive(Serialize)]
struct RenameConversationBody<'a> {
    new_title: &'a str,
}

#[derive(Serialize)]
struct PromptBody<'a> {
    prompt: &'a str,
}

#[derive(Serialize)]
struct EditPromptBody<'a> {
    new_prompt: &'a str,
}

/// HTTP client for chat service communication.
///
/// Cheap to clone; all clones share the connection pool and the session.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    session: Session,
}

impl ApiClient {
    /// Creates a client against the configured service root.
    ///
    /// The timeout applies to non-streaming requests only; streams, uploads
    /// and downloads are bounded by the connect timeout alone.
    pub fn new(config: &ApiConfig, session: Session) -> Result<Self, RaglineError> {
        let mut headers = HeaderMap::new();
        headers.insert("accept", HeaderValue::from_static("application/json"));

        let timeout = Duration::from_secs(config.timeout_secs);
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| RaglineError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
            session,
        })
    }

    /// The session this client authenticates with.
    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.base_url)
    }

    /// Attaches the bearer token (when present), sends, and maps the status:
    /// 401/403 invalidate the session, other non-2xx become [`RaglineError::Api`]
    /// with the body's `detail` text.
    async fn send(&self, request: RequestBuilder) -> Result<Response, RaglineError> {
        let request = match self.session.token() {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        };

        let response = request.send().await.map_err(|e| RaglineError::Transport {
            message: format!("request failed: {e}"),
            source: Some(Box::new(e)),
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(status = %status, "request rejected; invalidating session");
            self.session.handle_unauthorized();
            return Err(RaglineError::Unauthorized);
        }

        let detail = extract_detail(response).await;
        Err(RaglineError::Api {
            status: status.as_u16(),
            detail,
        })
    }

    async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, RaglineError> {
        let body = response.text().await.map_err(|e| RaglineError::Transport {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        serde_json::from_str(&body)
            .map_err(|e| RaglineError::Internal(format!("unexpected service response: {e}")))
    }

    /// Lists the authenticated user's conversations.
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>, RaglineError> {
        let request = self
            .http
            .get(self.url("/conversations/"))
            .timeout(self.timeout);
        Self::parse_json(self.send(request).await?).await
    }

    /// Creates a conversation with the given title.
    pub async fn create_conversation(&self, title: &str) -> Result<Conversation, RaglineError> {
        let request = self
            .http
            .post(self.url("/conversations/"))
            .timeout(self.timeout)
            .json(&CreateConversationBody { title });
        let conversation: Conversation = Self::parse_json(self.send(request).await?).await?;
        debug!(conversation_id = %conversation.uid, "conversation created");
        Ok(conversation)
    }

    /// Renames a conversation; returns the updated record.
    pub async fn rename_conversation(
        &self,
        conversation: &ConversationId,
        new_title: &str,
    ) -> Result<Conversation, RaglineError> {
        let request = self
            .http
            .put(self.url(&format!("/conversations/{conversation}/rename")))
            .timeout(self.timeout)
            .json(&RenameConversationBody { new_title });
        Self::parse_json(self.send(request).await?).await
    }

    /// Deletes a conversation (204 on success).
    pub async fn delete_conversation(
        &self,
        conversation: &ConversationId,
    ) -> Result<(), RaglineError> {
        let request = self
            .http
            .delete(self.url(&format!("/conversations/{conversation}")))
            .timeout(self.timeout);
        self.send(request).await?;
        Ok(())
    }

    /// Fetches the full message history of a conversation.
    pub async fn list_messages(
        &self,
        conversation: &ConversationId,
    ) -> Result<Vec<Message>, RaglineError> {
        let request = self
            .http
            .get(self.url(&format!("/conversations/{conversation}/messages")))
            .timeout(self.timeout);
        Self::parse_json(self.send(request).await?).await
    }

    /// Opens the response stream for a new prompt.
    ///
    /// The returned bytes are undecoded; feed them to a
    /// [`crate::sse::FrameDecoder`]. A non-2xx initial response surfaces
    /// here as an ordinary request error.
    pub async fn stream_prompt(
        &self,
        conversation: &ConversationId,
        prompt: &str,
    ) -> Result<ByteStream, RaglineError> {
        let request = self
            .http
            .post(self.url(&format!("/conversations/{conversation}/messages/stream")))
            .json(&PromptBody { prompt });
        let response = self.send(request).await?;
        debug!(conversation_id = %conversation, "prompt stream opened");
        Ok(into_byte_stream(response))
    }

    /// Opens the regeneration stream for an edited message.
    pub async fn stream_edit(
        &self,
        conversation: &ConversationId,
        message: &MessageId,
        new_prompt: &str,
    ) -> Result<ByteStream, RaglineError> {
        let request = self
            .http
            .put(self.url(&format!(
                "/conversations/{conversation}/messages/{message}/edit/stream"
            )))
            .json(&EditPromptBody { new_prompt });
        let response = self.send(request).await?;
        debug!(conversation_id = %conversation, message_id = %message, "edit stream opened");
        Ok(into_byte_stream(response))
    }

    /// Lists the documents in a conversation's retrieval context.
    pub async fn list_documents(
        &self,
        conversation: &ConversationId,
    ) -> Result<Vec<Document>, RaglineError> {
        let request = self
            .http
            .get(self.url(&format!("/conversations/{conversation}/documents")))
            .timeout(self.timeout);
        Self::parse_json(self.send(request).await?).await
    }

    /// Uploads files into a conversation's retrieval context.
    pub async fn upload_documents(
        &self,
        conversation: &ConversationId,
        files: Vec<UploadFile>,
    ) -> Result<UploadReport, RaglineError> {
        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let part = reqwest::multipart::Part::bytes(file.bytes)
                .file_name(file.filename)
                .mime_str(&file.mime_type)
                .map_err(|e| RaglineError::Validation(format!("invalid mime type: {e}")))?;
            form = form.part("files", part);
        }

        let request = self
            .http
            .post(self.url(&format!("/conversations/{conversation}/upload")))
            .multipart(form);
        Self::parse_json(self.send(request).await?).await
    }

    /// Removes a document from the context (204 on success).
    pub async fn delete_document(
        &self,
        conversation: &ConversationId,
        document: &DocumentId,
    ) -> Result<(), RaglineError> {
        let request = self
            .http
            .delete(self.url(&format!(
                "/conversations/{conversation}/documents/{document}"
            )))
            .timeout(self.timeout);
        self.send(request).await?;
        Ok(())
    }

    /// Sets a document's retrieval participation flag.
    pub async fn toggle_document(
        &self,
        conversation: &ConversationId,
        document: &DocumentId,
        is_active: bool,
    ) -> Result<(), RaglineError> {
        let request = self
            .http
            .patch(self.url(&format!(
                "/conversations/{conversation}/documents/{document}/toggle-active"
            )))
            .query(&[("is_active", is_active)])
            .timeout(self.timeout);
        self.send(request).await?;
        Ok(())
    }

    /// Downloads a document's raw content.
    pub async fn download_document(
        &self,
        conversation: &ConversationId,
        document: &DocumentId,
    ) -> Result<Vec<u8>, RaglineError> {
        let request = self.http.get(self.url(&format!(
            "/conversations/{conversation}/documents/{document}/download"
        )));
        let response = self.send(request).await?;
        let bytes = response.bytes().await.map_err(|e| RaglineError::Transport {
            message: format!("failed to read document content: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(bytes.to_vec())
    }
}

fn into_byte_stream(response: Response) -> ByteStream {
    Box::pin(response.bytes_stream().map(|result| {
        result.map_err(|e| RaglineError::Stream {
            message: format!("stream read failed: {e}"),
            source: Some(Box::new(e)),
        })
    }))
}

/// Extracts the service's `detail` message from an error body, falling back
/// to the bare status line.
async fn extract_detail(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) {
        match value.get("detail") {
            Some(serde_json::Value::String(s)) => return s.clone(),
            Some(other) if !other.is_null() => return other.to_string(),
            _ => {}
        }
    }
    format!("HTTP {status}")
}
