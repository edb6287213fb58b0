// SPDX-FileCopyrightText: 2026 Ragline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiremock-backed chat service double.
//!
//! `MockBackend` wraps a [`MockServer`] with mount helpers for the
//! service's `/api/v1` routes. Tests that need unusual behavior (delays,
//! call-count expectations, bespoke matchers) can reach the underlying
//! server via [`MockBackend::server`].

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ragline_config::ApiConfig;

/// A wiremock stand-in for the chat service.
pub struct MockBackend {
    server: MockServer,
}

impl MockBackend {
    /// Starts a fresh mock service on a random local port.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URI of the mock service.
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// An [`ApiConfig`] pointing at the mock service, with a short timeout.
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.server.uri(),
            timeout_secs: 5,
        }
    }

    /// The underlying wiremock server, for custom mocks.
    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// GET `/conversations/` returning the given list.
    pub async fn mount_conversation_list(&self, conversations: Value) {
        Mock::given(method("GET"))
            .and(path("/api/v1/conversations/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(conversations))
            .mount(&self.server)
            .await;
    }

    /// POST `/conversations/` returning the given record with 201.
    pub async fn mount_create_conversation(&self, created: Value) {
        Mock::given(method("POST"))
            .and(path("/api/v1/conversations/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(created))
            .mount(&self.server)
            .await;
    }

    /// PUT `/conversations/{id}/rename` returning the updated record.
    pub async fn mount_rename(&self, conversation: &str, updated: Value) {
        Mock::given(method("PUT"))
            .and(path(format!("/api/v1/conversations/{conversation}/rename")))
            .respond_with(ResponseTemplate::new(200).set_body_json(updated))
            .mount(&self.server)
            .await;
    }

    /// DELETE `/conversations/{id}` answering 204.
    pub async fn mount_delete_conversation(&self, conversation: &str) {
        Mock::given(method("DELETE"))
            .and(path(format!("/api/v1/conversations/{conversation}")))
            .respond_with(ResponseTemplate::new(204))
            .mount(&self.server)
            .await;
    }

    /// GET `/conversations/{id}/messages` returning the given list.
    pub async fn mount_messages(&self, conversation: &str, messages: Value) {
        Mock::given(method("GET"))
            .and(path(format!(
                "/api/v1/conversations/{conversation}/messages"
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(messages))
            .mount(&self.server)
            .await;
    }

    /// GET `/conversations/{id}/documents` returning the given list.
    pub async fn mount_documents(&self, conversation: &str, documents: Value) {
        Mock::given(method("GET"))
            .and(path(format!(
                "/api/v1/conversations/{conversation}/documents"
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(documents))
            .mount(&self.server)
            .await;
    }

    /// POST `/conversations/{id}/messages/stream` answering with the given
    /// stream body (see [`sse_body`]).
    pub async fn mount_prompt_stream(&self, conversation: &str, body: &str) {
        Mock::given(method("POST"))
            .and(path(format!(
                "/api/v1/conversations/{conversation}/messages/stream"
            )))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body.to_string()),
            )
            .mount(&self.server)
            .await;
    }

    /// POST `/conversations/{id}/messages/stream` failing with a status and
    /// `detail` body before any frame is sent.
    pub async fn mount_prompt_stream_failure(&self, conversation: &str, status: u16, detail: &str) {
        Mock::given(method("POST"))
            .and(path(format!(
                "/api/v1/conversations/{conversation}/messages/stream"
            )))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({ "detail": detail })),
            )
            .mount(&self.server)
            .await;
    }

    /// PUT `/conversations/{id}/messages/{mid}/edit/stream` answering with
    /// the given stream body.
    pub async fn mount_edit_stream(&self, conversation: &str, message: &str, body: &str) {
        Mock::given(method("PUT"))
            .and(path(format!(
                "/api/v1/conversations/{conversation}/messages/{message}/edit/stream"
            )))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body.to_string()),
            )
            .mount(&self.server)
            .await;
    }

    /// PATCH toggle-active for a document, answering 200.
    pub async fn mount_toggle_document(&self, conversation: &str, document: &str) {
        Mock::given(method("PATCH"))
            .and(path(format!(
                "/api/v1/conversations/{conversation}/documents/{document}/toggle-active"
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&self.server)
            .await;
    }

    /// DELETE for a document, answering 204.
    pub async fn mount_delete_document(&self, conversation: &str, document: &str) {
        Mock::given(method("DELETE"))
            .and(path(format!(
                "/api/v1/conversations/{conversation}/documents/{document}"
            )))
            .respond_with(ResponseTemplate::new(204))
            .mount(&self.server)
            .await;
    }

    /// GET download for a document, answering with raw bytes.
    pub async fn mount_download(&self, conversation: &str, document: &str, content: &[u8]) {
        Mock::given(method("GET"))
            .and(path(format!(
                "/api/v1/conversations/{conversation}/documents/{document}/download"
            )))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
            .mount(&self.server)
            .await;
    }

    /// POST upload answering with the given report.
    pub async fn mount_upload(&self, conversation: &str, report: Value) {
        Mock::given(method("POST"))
            .and(path(format!("/api/v1/conversations/{conversation}/upload")))
            .respond_with(ResponseTemplate::new(200).set_body_json(report))
            .mount(&self.server)
            .await;
    }
}

/// Conversation record in the service's wire shape.
pub fn conversation_json(uid: &str, title: &str, created_at: &str, update_at: Option<&str>) -> Value {
    let mut value = json!({
        "uid": uid,
        "user_uid": "u-test",
        "title": title,
        "created_at": created_at,
    });
    if let Some(updated) = update_at {
        value["update_at"] = json!(updated);
    }
    value
}

/// Message record in the service's wire shape.
pub fn message_json(
    uid: &str,
    prompt: Option<&str>,
    response: Option<&str>,
    created_at: &str,
) -> Value {
    json!({
        "uid": uid,
        "conversation_uid": "c-test",
        "user_uid": "u-test",
        "prompt": prompt,
        "response": response,
        "created_at": created_at,
    })
}

/// Document record in the service's wire shape.
pub fn document_json(uid: &str, filename: &str, size: u64, mime_type: &str, is_active: bool) -> Value {
    json!({
        "uid": uid,
        "conversation_uid": "c-test",
        "filename": filename,
        "upload_date": "2025-03-10T09:30:00Z",
        "size": size,
        "mime_type": mime_type,
        "is_active": is_active,
    })
}

/// Builds a stream body: one `data: ` line per chunk, then the `[DONE]`
/// sentinel. Chunks must not contain newlines.
pub fn sse_body(chunks: &[&str]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str("data: ");
        body.push_str(chunk);
        body.push('\n');
    }
    body.push_str("data: [DONE]\n");
    body
}

/// Builds a stream body that fails mid-flight: the given chunks, then an
/// `[ERROR]` frame instead of `[DONE]`.
pub fn sse_body_with_error(chunks: &[&str], error: &str) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str("data: ");
        body.push_str(chunk);
        body.push('\n');
    }
    body.push_str("data: [ERROR] ");
    body.push_str(error);
    body.push('\n');
    body
}
