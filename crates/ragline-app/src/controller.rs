// SPDX-FileCopyrightText: 2026 Ragline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The chat controller: one object that owns the client-side state and
//! sequences every operation against the backend.
//!
//! All state lives behind a single mutex and is mutated in short critical
//! sections; the lock is never held across an await. Concurrent operations
//! are arbitrated by the flags in [`OpFlags`]: an operation that conflicts
//! with one already in flight is rejected with [`RaglineError::Busy`] and
//! an informational notice, never queued.
//!
//! The controller is cheap to clone and shareable across tasks, like the
//! HTTP client underneath it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::Utc;
use ragline_client::{ApiClient, Session, UploadFile};
use ragline_config::RaglineConfig;
use ragline_core::{
    Conversation, ConversationId, Document, DocumentId, DocumentPreview, MAX_TITLE_CHARS, Message,
    MessageId, RaglineError, UploadReport,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::documents::{ContextUsage, DocumentSortKey, SortOrder};
use crate::notify::{Notice, NoticeSink, log_sink};
use crate::reconciler::{EditTransaction, SendTransaction, StreamPhase, pump_stream};
use crate::state::{AppState, OpFlags, lock_app};

/// Text of the notice emitted when an operation is rejected as busy.
const BUSY_NOTICE: &str = "Please wait for the current operation to finish.";

/// Client-side orchestrator for one authenticated chat session.
#[derive(Clone)]
pub struct ChatController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    api: ApiClient,
    state: Mutex<AppState>,
    notices: RwLock<NoticeSink>,
    stream_cancel: Mutex<CancellationToken>,
    max_context_bytes: u64,
}

impl std::fmt::Debug for ChatController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatController")
            .field("api", &self.inner.api)
            .finish_non_exhaustive()
    }
}

impl ChatController {
    pub fn new(api: ApiClient, config: &RaglineConfig) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                api,
                state: Mutex::new(AppState::default()),
                notices: RwLock::new(log_sink()),
                stream_cancel: Mutex::new(CancellationToken::new()),
                max_context_bytes: config.context.max_bytes,
            }),
        }
    }

    /// Route notices somewhere other than the log, e.g. a UI snackbar.
    pub fn set_notice_sink(&self, sink: NoticeSink) {
        let mut slot = self
            .inner
            .notices
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = sink;
    }

    /// The session driving authentication, for token updates by the host.
    pub fn session(&self) -> &Session {
        self.inner.api.session()
    }

    // ----- snapshots -------------------------------------------------------

    pub fn conversations(&self) -> Vec<Conversation> {
        self.lock().store.all().to_vec()
    }

    pub fn active_conversation(&self) -> Option<Conversation> {
        self.lock().store.active().cloned()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock().transcript.messages().to_vec()
    }

    /// Documents in server order, unfiltered.
    pub fn documents(&self) -> Vec<Document> {
        self.lock().documents.documents().to_vec()
    }

    /// Documents as the panel shows them: filtered, then sorted.
    pub fn visible_documents(&self) -> Vec<Document> {
        self.lock().documents.visible()
    }

    pub fn context_usage(&self) -> ContextUsage {
        self.lock().documents.usage(self.inner.max_context_bytes)
    }

    pub fn preview_error(&self, document: &DocumentId) -> Option<String> {
        self.lock()
            .documents
            .preview_error(document)
            .map(str::to_owned)
    }

    pub fn flags(&self) -> OpFlags {
        self.lock().ops.clone()
    }

    pub fn phase(&self) -> StreamPhase {
        self.lock().ops.phase
    }

    // ----- conversation lifecycle ------------------------------------------

    /// Initial load: fetch the conversation list and open the most recent
    /// conversation, provided it has message history. An empty or
    /// unreachable one leaves the blank new-conversation state.
    pub async fn bootstrap(&self) -> Result<(), RaglineError> {
        let conversations = match self.inner.api.list_conversations().await {
            Ok(list) => list,
            Err(e) => {
                self.notify(Notice::error(format!("Failed to load conversations: {e}")));
                return Err(e);
            }
        };
        info!(count = conversations.len(), "conversations loaded");

        let head = {
            let mut state = self.lock();
            state.ops.editing = None;
            state.ops.renaming = None;
            state.store.replace_all(conversations);
            state.store.head().map(|c| c.uid.clone())
        };
        let Some(id) = head else {
            return Ok(());
        };

        {
            self.lock().ops.loading = true;
        }
        let fetched = futures::future::try_join(
            self.inner.api.list_messages(&id),
            self.inner.api.list_documents(&id),
        )
        .await;

        let mut state = self.lock();
        state.ops.loading = false;
        match fetched {
            Ok((messages, _)) if messages.is_empty() => {
                debug!(conversation_id = %id, "most recent conversation has no history; starting blank");
                Ok(())
            }
            Ok((messages, documents)) => {
                state.store.set_active(&id);
                state.transcript.replace_all(messages);
                state.documents.replace_all(documents);
                Ok(())
            }
            Err(e) => {
                warn!(conversation_id = %id, error = %e, "skipping the initial conversation load");
                Ok(())
            }
        }
    }

    /// Switch to another conversation and load its transcript and
    /// documents. Returns `false` when nothing changed: the conversation
    /// was already active, or a rename is in progress.
    pub async fn select_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<bool, RaglineError> {
        {
            let state = self.lock();
            if state.store.active_id() == Some(id) {
                return Ok(false);
            }
            if state.ops.renaming.is_some() || state.ops.saving_rename {
                debug!(conversation_id = %id, "selection ignored during rename");
                return Ok(false);
            }
            if !state.store.contains(id) {
                return Err(RaglineError::Validation(format!(
                    "unknown conversation: {id}"
                )));
            }
        }
        self.activate_and_load(id).await?;
        Ok(true)
    }

    /// Refetch the active conversation's messages and documents.
    pub async fn reload_active(&self) -> Result<(), RaglineError> {
        let id = self
            .lock()
            .store
            .active_id()
            .cloned()
            .ok_or_else(|| RaglineError::Validation("no active conversation".into()))?;
        let result = self.load_conversation_data(&id).await;
        if let Err(e) = &result {
            self.notify(Notice::error(format!("Failed to load the conversation: {e}")));
        }
        result
    }

    /// Deselect the active conversation and empty both panels, presenting
    /// the blank "new conversation" state. Refused while a send is running.
    pub fn clear_active_conversation(&self) -> bool {
        let mut state = self.lock();
        if state.ops.sending || state.ops.creating || state.ops.saving_edit {
            drop(state);
            self.notify(Notice::info(BUSY_NOTICE));
            return false;
        }
        state.ops.editing = None;
        state.ops.renaming = None;
        state.store.clear_active();
        state.transcript.clear();
        state.documents.clear();
        true
    }

    /// Create an empty conversation with an explicit title and select it.
    pub async fn create_conversation(
        &self,
        title: &str,
    ) -> Result<Conversation, RaglineError> {
        let title = title.trim();
        if title.is_empty() {
            self.notify(Notice::error("Title cannot be empty."));
            return Err(RaglineError::Validation("title must not be empty".into()));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            self.notify(Notice::error("Title is too long (100 characters max)."));
            return Err(RaglineError::Validation(format!(
                "title exceeds {MAX_TITLE_CHARS} characters"
            )));
        }
        {
            let mut state = self.lock();
            if state.ops.creating || state.ops.sending {
                drop(state);
                self.notify(Notice::info(BUSY_NOTICE));
                return Err(RaglineError::Busy {
                    operation: "create",
                });
            }
            state.ops.creating = true;
        }

        let result = self.inner.api.create_conversation(title).await;
        let mut state = self.lock();
        state.ops.creating = false;
        match result {
            Ok(conversation) => {
                state.store.insert_active(conversation.clone());
                state.transcript.clear();
                state.documents.clear();
                Ok(conversation)
            }
            Err(e) => {
                drop(state);
                self.notify(Notice::error(format!(
                    "Failed to create the conversation: {e}"
                )));
                Err(e)
            }
        }
    }

    /// Enter rename mode for a conversation. Returns `false` if another
    /// operation makes renaming unavailable right now.
    pub fn begin_rename(&self, id: &ConversationId) -> bool {
        let mut state = self.lock();
        if state.ops.sending
            || state.ops.creating
            || state.ops.saving_edit
            || state.ops.saving_rename
        {
            return false;
        }
        if !state.store.contains(id) {
            return false;
        }
        state.ops.editing = None;
        state.ops.renaming = Some(id.clone());
        true
    }

    pub fn cancel_rename(&self) {
        self.lock().ops.renaming = None;
    }

    /// Rename a conversation. Validation failures are reported as notices
    /// and leave rename mode untouched so the user can correct the title.
    pub async fn rename_conversation(
        &self,
        id: &ConversationId,
        new_title: &str,
    ) -> Result<(), RaglineError> {
        let title = new_title.trim();
        if title.is_empty() {
            self.notify(Notice::error("Title cannot be empty."));
            return Err(RaglineError::Validation("title must not be empty".into()));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            self.notify(Notice::error("Title is too long (100 characters max)."));
            return Err(RaglineError::Validation(format!(
                "title exceeds {MAX_TITLE_CHARS} characters"
            )));
        }
        {
            let mut state = self.lock();
            if state.ops.saving_rename {
                drop(state);
                self.notify(Notice::info(BUSY_NOTICE));
                return Err(RaglineError::Busy {
                    operation: "rename",
                });
            }
            state.ops.saving_rename = true;
        }

        let result = self.inner.api.rename_conversation(id, title).await;
        let mut state = self.lock();
        state.ops.saving_rename = false;
        match result {
            Ok(updated) => {
                state.store.apply_update(updated);
                state.ops.renaming = None;
                drop(state);
                self.notify(Notice::success("Conversation renamed."));
                Ok(())
            }
            Err(e) => {
                drop(state);
                self.notify(Notice::error(format!(
                    "Failed to rename the conversation: {e}"
                )));
                Err(e)
            }
        }
    }

    /// Delete a conversation. When the active conversation goes, the most
    /// recent remaining one is selected and loaded in its place.
    pub async fn delete_conversation(&self, id: &ConversationId) -> Result<(), RaglineError> {
        {
            let mut state = self.lock();
            if let Some(operation) = state.ops.delete_blocker() {
                drop(state);
                self.notify(Notice::info(BUSY_NOTICE));
                return Err(RaglineError::Busy { operation });
            }
            if !state.store.contains(id) {
                return Err(RaglineError::Validation(format!(
                    "unknown conversation: {id}"
                )));
            }
            state.ops.deleting = Some(id.clone());
        }

        let result = self.inner.api.delete_conversation(id).await;
        let next = {
            let mut state = self.lock();
            state.ops.deleting = None;
            if let Err(e) = result {
                drop(state);
                self.notify(Notice::error(format!(
                    "Failed to delete the conversation: {e}"
                )));
                return Err(e);
            }
            let was_active = state.store.active_id() == Some(id);
            state.store.remove(id);
            if was_active {
                state.ops.editing = None;
                state.transcript.clear();
                state.documents.clear();
                state.store.head().map(|c| c.uid.clone())
            } else {
                None
            }
        };

        if let Some(next) = next {
            if let Err(e) = self.activate_and_load(&next).await {
                warn!(conversation_id = %next, error = %e, "failed to open the next conversation after delete");
            }
        }
        self.notify(Notice::success("Conversation deleted."));
        Ok(())
    }

    // ----- messaging -------------------------------------------------------

    /// Send a prompt to the active conversation, creating one on the fly
    /// when nothing is selected, and stream the response into the
    /// transcript. On any failure the optimistic state is rolled back.
    pub async fn send_message(&self, prompt: &str) -> Result<(), RaglineError> {
        if prompt.trim().is_empty() {
            self.notify(Notice::error("Cannot send an empty prompt."));
            return Err(RaglineError::Validation("prompt must not be empty".into()));
        }

        let active = {
            let mut state = self.lock();
            if let Some(operation) = state.ops.send_blocker() {
                drop(state);
                self.notify(Notice::info(BUSY_NOTICE));
                return Err(RaglineError::Busy { operation });
            }
            // Starting a send abandons any message edit still being typed.
            state.ops.editing = None;
            state.ops.sending = true;
            state.ops.phase = StreamPhase::Sending;
            state.store.active_id().cloned()
        };
        let cancel = self.arm_stream_cancel();
        let mut tx = SendTransaction::begin(&self.inner.state);

        let conversation_id = match active {
            Some(id) => id,
            None => {
                {
                    self.lock().ops.creating = true;
                }
                let title = Conversation::title_from_prompt(prompt);
                let conversation = match self.inner.api.create_conversation(&title).await {
                    Ok(conversation) => conversation,
                    Err(e) => {
                        tx.roll_back();
                        self.notify(Notice::error(format!(
                            "Failed to create the conversation: {e}"
                        )));
                        return Err(e);
                    }
                };
                let id = conversation.uid.clone();
                {
                    let mut state = self.lock();
                    state.ops.creating = false;
                    state.store.insert_active(conversation);
                    state.transcript.clear();
                    state.documents.clear();
                }
                tx.record_created(id.clone());
                info!(conversation_id = %id, "conversation auto-created for first prompt");
                id
            }
        };

        let response_id = {
            let mut state = self.lock();
            let prompt_message = Message::optimistic_prompt(prompt);
            let response_message = Message::optimistic_response();
            let response_id = response_message.uid.clone();
            state.transcript.push(prompt_message);
            state.transcript.push(response_message);
            response_id
        };

        let stream = match self.inner.api.stream_prompt(&conversation_id, prompt).await {
            Ok(stream) => stream,
            Err(e) => {
                tx.roll_back();
                self.notify(Notice::error(format!("Failed to send the message: {e}")));
                return Err(e);
            }
        };
        {
            self.lock().ops.phase = StreamPhase::Streaming;
        }

        let pumped = pump_stream(stream, &cancel, |text| {
            let mut state = lock_app(&self.inner.state);
            state.transcript.append_chunk(&response_id, text);
        })
        .await;

        match pumped {
            Ok(_) => {
                {
                    let mut state = self.lock();
                    state.transcript.finish_streaming(&response_id);
                    state.ops.phase = StreamPhase::Finalizing;
                }
                if let Err(e) = self.load_conversation_data(&conversation_id).await {
                    tx.roll_back();
                    self.notify(Notice::error(format!("Failed to send the message: {e}")));
                    return Err(e);
                }
                {
                    let mut state = self.lock();
                    state.store.touch(&conversation_id, Utc::now());
                }
                tx.commit();
                info!(conversation_id = %conversation_id, "message exchange persisted");
                Ok(())
            }
            Err(e) => {
                tx.roll_back();
                match &e {
                    RaglineError::Cancelled => {
                        self.notify(Notice::info("Response cancelled."));
                    }
                    _ => {
                        self.notify(Notice::error(format!("Failed to send the message: {e}")));
                    }
                }
                Err(e)
            }
        }
    }

    /// Cancel the stream of the send or edit currently in flight, if any.
    /// The cancelled operation rolls its optimistic state back.
    pub fn cancel_streaming(&self) {
        let token = {
            let slot = self
                .inner
                .stream_cancel
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            slot.clone()
        };
        debug!("stream cancellation requested");
        token.cancel();
    }

    /// Enter edit mode for a persisted message. Returns `false` when the
    /// message cannot be edited right now.
    pub fn begin_edit(&self, id: &MessageId) -> bool {
        let mut state = self.lock();
        if state.ops.sending
            || state.ops.creating
            || state.ops.saving_edit
            || state.ops.renaming.is_some()
        {
            return false;
        }
        let editable = state
            .transcript
            .get(id)
            .is_some_and(|m| m.prompt.is_some() && !m.uid.is_temporary());
        if !editable {
            return false;
        }
        state.ops.renaming = None;
        state.ops.editing = Some(id.clone());
        true
    }

    pub fn cancel_edit(&self) {
        self.lock().ops.editing = None;
    }

    /// Replace a message's prompt and regenerate its response in place.
    ///
    /// The edited message keeps its position and identity; only its prompt
    /// and response change. On explicit failure the conversation is
    /// refetched so the transcript shows server truth; the pre-edit
    /// snapshot is restored locally only when that refetch fails too, or
    /// when the operation is dropped mid-flight.
    pub async fn edit_message(
        &self,
        id: &MessageId,
        new_prompt: &str,
    ) -> Result<(), RaglineError> {
        let trimmed = new_prompt.trim();
        if trimmed.is_empty() {
            self.notify(Notice::error("Cannot save an empty prompt."));
            return Err(RaglineError::Validation("prompt must not be empty".into()));
        }
        if id.is_temporary() {
            return Err(RaglineError::Validation(
                "cannot edit a message that is still sending".into(),
            ));
        }

        let (conversation_id, snapshot) = {
            let mut state = self.lock();
            if let Some(operation) = state.ops.edit_blocker() {
                drop(state);
                self.notify(Notice::info(BUSY_NOTICE));
                return Err(RaglineError::Busy { operation });
            }
            let Some(conversation_id) = state.store.active_id().cloned() else {
                return Err(RaglineError::Validation("no active conversation".into()));
            };
            let Some(snapshot) = state.transcript.replace_in_place(id, trimmed) else {
                return Err(RaglineError::Validation(format!("unknown message: {id}")));
            };
            state.ops.saving_edit = true;
            state.ops.phase = StreamPhase::Sending;
            (conversation_id, snapshot)
        };
        let cancel = self.arm_stream_cancel();
        let mut tx = EditTransaction::begin(&self.inner.state, snapshot);

        let stream = match self
            .inner
            .api
            .stream_edit(&conversation_id, id, trimmed)
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                self.resolve_failed_edit(&conversation_id, tx).await;
                self.notify(Notice::error(format!("Failed to update the message: {e}")));
                return Err(e);
            }
        };
        {
            self.lock().ops.phase = StreamPhase::Streaming;
        }

        let pumped = pump_stream(stream, &cancel, |text| {
            let mut state = lock_app(&self.inner.state);
            state.transcript.append_chunk(id, text);
        })
        .await;

        match pumped {
            Ok(_) => {
                {
                    let mut state = self.lock();
                    state.transcript.finish_streaming(id);
                    state.ops.phase = StreamPhase::Finalizing;
                }
                match self.load_conversation_data(&conversation_id).await {
                    Ok(()) => {
                        self.lock().ops.editing = None;
                        tx.commit();
                        self.notify(Notice::success(
                            "Message updated and response regenerated.",
                        ));
                        Ok(())
                    }
                    Err(e) => {
                        tx.roll_back();
                        self.notify(Notice::error(format!(
                            "Failed to update the message: {e}"
                        )));
                        Err(e)
                    }
                }
            }
            Err(e) => {
                {
                    self.lock().transcript.finish_streaming(id);
                }
                self.resolve_failed_edit(&conversation_id, tx).await;
                match &e {
                    RaglineError::Cancelled => self.notify(Notice::info("Edit cancelled.")),
                    _ => self.notify(Notice::error(format!(
                        "Failed to update the message: {e}"
                    ))),
                }
                Err(e)
            }
        }
    }

    /// After a failed edit, prefer refetching server truth over the local
    /// snapshot; fall back to the snapshot when the refetch fails too.
    async fn resolve_failed_edit(
        &self,
        conversation_id: &ConversationId,
        mut tx: EditTransaction<'_>,
    ) {
        match self.load_conversation_data(conversation_id).await {
            Ok(()) => tx.discard(),
            Err(reload) => {
                warn!(error = %reload, "refetch after failed edit also failed; restoring the local snapshot");
                tx.roll_back();
            }
        }
    }

    // ----- documents -------------------------------------------------------

    pub fn set_document_filter(&self, filter: impl Into<String>) {
        self.lock().documents.set_filter(filter);
    }

    pub fn set_document_sort(&self, key: DocumentSortKey, order: SortOrder) {
        self.lock().documents.set_sort(key, order);
    }

    /// Flip a document's retrieval participation. The flag flips locally
    /// first; if the server rejects the change, that one document reverts.
    pub async fn toggle_document(&self, id: &DocumentId) -> Result<bool, RaglineError> {
        let (conversation_id, new_state) = {
            let mut state = self.lock();
            let Some(conversation_id) = state.store.active_id().cloned() else {
                return Err(RaglineError::Validation("no active conversation".into()));
            };
            let Some(current) = state.documents.get(id).map(|d| d.is_active) else {
                return Err(RaglineError::Validation(format!("unknown document: {id}")));
            };
            state.documents.set_active_flag(id, !current);
            (conversation_id, !current)
        };

        match self
            .inner
            .api
            .toggle_document(&conversation_id, id, new_state)
            .await
        {
            Ok(()) => {
                let text = if new_state {
                    "Document enabled for retrieval."
                } else {
                    "Document disabled for retrieval."
                };
                self.notify(Notice::success(text));
                Ok(new_state)
            }
            Err(e) => {
                {
                    self.lock().documents.set_active_flag(id, !new_state);
                }
                self.notify(Notice::error(format!("Failed to update the document: {e}")));
                Err(e)
            }
        }
    }

    /// Remove a document from the conversation's retrieval context.
    pub async fn delete_document(&self, id: &DocumentId) -> Result<(), RaglineError> {
        let conversation_id = {
            let mut state = self.lock();
            let Some(conversation_id) = state.store.active_id().cloned() else {
                return Err(RaglineError::Validation("no active conversation".into()));
            };
            if state.documents.get(id).is_none() {
                return Err(RaglineError::Validation(format!("unknown document: {id}")));
            }
            if state.ops.deleting_document.is_some() {
                drop(state);
                self.notify(Notice::info(BUSY_NOTICE));
                return Err(RaglineError::Busy {
                    operation: "document delete",
                });
            }
            state.ops.deleting_document = Some(id.clone());
            conversation_id
        };

        let result = self.inner.api.delete_document(&conversation_id, id).await;
        let mut state = self.lock();
        state.ops.deleting_document = None;
        match result {
            Ok(()) => {
                state.documents.remove(id);
                drop(state);
                self.notify(Notice::success("Document removed from the context."));
                Ok(())
            }
            Err(e) => {
                drop(state);
                self.notify(Notice::error(format!("Failed to delete the document: {e}")));
                Err(e)
            }
        }
    }

    /// Fetch a document's content for preview, dispatched on its MIME
    /// type. Unsupported types return immediately without a download.
    /// Failures are recorded per document and do not emit a notice; the
    /// preview surface shows them inline.
    pub async fn preview_document(
        &self,
        id: &DocumentId,
    ) -> Result<DocumentPreview, RaglineError> {
        let (conversation_id, mime_type) = {
            let mut state = self.lock();
            let Some(conversation_id) = state.store.active_id().cloned() else {
                return Err(RaglineError::Validation("no active conversation".into()));
            };
            let Some(mime_type) = state.documents.get(id).map(|d| d.mime_type.clone()) else {
                return Err(RaglineError::Validation(format!("unknown document: {id}")));
            };
            state.documents.clear_preview_error(id);
            (conversation_id, mime_type)
        };

        let Some(kind) = PreviewKind::from_mime(&mime_type) else {
            return Ok(DocumentPreview::Unsupported { mime_type });
        };

        match self.inner.api.download_document(&conversation_id, id).await {
            Ok(bytes) => Ok(match kind {
                PreviewKind::Pdf => DocumentPreview::Pdf(bytes),
                PreviewKind::Image => DocumentPreview::Image(bytes),
                PreviewKind::Text => {
                    DocumentPreview::Text(String::from_utf8_lossy(&bytes).into_owned())
                }
            }),
            Err(e) => {
                self.lock().documents.set_preview_error(id, e.to_string());
                Err(e)
            }
        }
    }

    /// Upload files into the active conversation's context, then refetch
    /// the document list. Per-file processing failures reported by the
    /// server surface as a warning notice; they do not fail the upload.
    pub async fn upload_documents(
        &self,
        files: Vec<UploadFile>,
    ) -> Result<UploadReport, RaglineError> {
        if files.is_empty() {
            return Err(RaglineError::Validation("no files to upload".into()));
        }
        let conversation_id = {
            let mut state = self.lock();
            let Some(conversation_id) = state.store.active_id().cloned() else {
                return Err(RaglineError::Validation("no active conversation".into()));
            };
            if state.ops.uploading {
                drop(state);
                self.notify(Notice::info(BUSY_NOTICE));
                return Err(RaglineError::Busy {
                    operation: "upload",
                });
            }
            state.ops.uploading = true;
            conversation_id
        };

        let result = self.inner.api.upload_documents(&conversation_id, files).await;
        {
            self.lock().ops.uploading = false;
        }

        match result {
            Ok(report) => {
                if report.errors.is_empty() {
                    let text = if report.message.is_empty() {
                        "Documents uploaded.".to_owned()
                    } else {
                        report.message.clone()
                    };
                    self.notify(Notice::success(text));
                } else {
                    self.notify(Notice::warning(format!(
                        "{} file(s) failed to process.",
                        report.errors.len()
                    )));
                }
                if let Err(e) = self.load_conversation_data(&conversation_id).await {
                    self.notify(Notice::error(format!(
                        "Failed to load the conversation: {e}"
                    )));
                }
                Ok(report)
            }
            Err(e) => {
                self.notify(Notice::error(format!("Upload failed: {e}")));
                Err(e)
            }
        }
    }

    // ----- internals -------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, AppState> {
        lock_app(&self.inner.state)
    }

    fn notify(&self, notice: Notice) {
        let sink = {
            let slot = self
                .inner
                .notices
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            slot.clone()
        };
        sink(notice);
    }

    /// Replace the stream cancellation token so a previous, already
    /// cancelled token cannot abort the next operation.
    fn arm_stream_cancel(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let mut slot = self
            .inner
            .stream_cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = token.clone();
        token
    }

    async fn activate_and_load(&self, id: &ConversationId) -> Result<(), RaglineError> {
        {
            let mut state = self.lock();
            state.ops.editing = None;
            state.ops.renaming = None;
            if state.store.active_id() != Some(id) {
                state.transcript.clear();
                state.documents.clear();
            }
            state.store.set_active(id);
        }
        let result = self.load_conversation_data(id).await;
        if let Err(e) = &result {
            self.notify(Notice::error(format!("Failed to load the conversation: {e}")));
        }
        result
    }

    /// Fetch messages and documents together and apply them atomically.
    ///
    /// A fetched-empty message list does not overwrite a locally non-empty
    /// transcript of the active conversation; streamed content stays until
    /// real history arrives. If the active conversation changed while the
    /// fetch was in flight, the stale result is discarded entirely.
    async fn load_conversation_data(&self, id: &ConversationId) -> Result<(), RaglineError> {
        {
            let mut state = self.lock();
            state.ops.editing = None;
            state.ops.renaming = None;
            state.ops.loading = true;
        }

        let fetched = futures::future::try_join(
            self.inner.api.list_messages(id),
            self.inner.api.list_documents(id),
        )
        .await;

        let mut state = self.lock();
        state.ops.loading = false;
        let (messages, documents) = match fetched {
            Ok(pair) => pair,
            Err(e) => return Err(e),
        };

        if state.store.active_id() != Some(id) {
            debug!(conversation_id = %id, "discarding stale conversation data");
            return Ok(());
        }
        let keep_local =
            !state.transcript.is_empty() && messages.is_empty();
        if keep_local {
            debug!(conversation_id = %id, "server returned no messages; keeping local transcript");
        } else {
            state.transcript.replace_all(messages);
        }
        state.documents.replace_all(documents);
        Ok(())
    }
}

/// Preview rendering category derived from a MIME type. `None` means the
/// type has no preview renderer and must not be downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PreviewKind {
    Pdf,
    Text,
    Image,
}

impl PreviewKind {
    fn from_mime(mime_type: &str) -> Option<Self> {
        let mime = mime_type.to_ascii_lowercase();
        if mime.contains("pdf") {
            Some(Self::Pdf)
        } else if mime.starts_with("text/") {
            Some(Self::Text)
        } else if mime.starts_with("image/") {
            Some(Self::Image)
        } else {
            None
        }
    }
}
