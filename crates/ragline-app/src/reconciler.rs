// SPDX-FileCopyrightText: 2026 Ragline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stream reconciliation: pumping decoded frames into the transcript and
//! rolling optimistic state back when a send or edit does not complete.
//!
//! Each streaming operation is a transaction. [`SendTransaction`] and
//! [`EditTransaction`] are armed before the first network call and either
//! committed on success or compensated on every other exit, including
//! cancellation and the future being dropped mid-flight.

use std::sync::Mutex;

use futures::StreamExt;
use ragline_client::{ByteStream, Frame, FrameDecoder};
use ragline_core::{ConversationId, Message, RaglineError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::state::{AppState, lock_app};

/// Where the current send or edit stands. One streaming operation runs at
/// a time, so a single phase describes the whole controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamPhase {
    /// No send or edit in flight.
    #[default]
    Idle,
    /// Request submitted, stream not yet open.
    Sending,
    /// Frames are being applied to the transcript.
    Streaming,
    /// Stream ended; reconciling with server state.
    Finalizing,
}

impl std::fmt::Display for StreamPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StreamPhase::Idle => "idle",
            StreamPhase::Sending => "sending",
            StreamPhase::Streaming => "streaming",
            StreamPhase::Finalizing => "finalizing",
        };
        write!(f, "{name}")
    }
}

/// Counters for a completed pump, for logging.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StreamStats {
    pub frames: usize,
    pub bytes: usize,
}

/// Drain a response stream, forwarding each data frame's text to `on_text`.
///
/// Returns once the decoder reports a terminal frame or the stream ends;
/// an end without `[DONE]` still counts as success. An `[ERROR]` frame or
/// a transport failure aborts with the corresponding error, and a fired
/// `cancel` token aborts with [`RaglineError::Cancelled`].
pub(crate) async fn pump_stream(
    mut stream: ByteStream,
    cancel: &CancellationToken,
    mut on_text: impl FnMut(&str),
) -> Result<StreamStats, RaglineError> {
    let mut decoder = FrameDecoder::new();
    let mut stats = StreamStats::default();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RaglineError::Cancelled),
            next = stream.next() => next,
        };
        let Some(chunk) = next else {
            break;
        };
        let bytes = chunk?;
        stats.bytes += bytes.len();
        for frame in decoder.feed(&bytes) {
            match frame {
                Frame::Data(text) => {
                    stats.frames += 1;
                    on_text(&text);
                }
                Frame::Done => {}
                Frame::Error(message) => {
                    return Err(RaglineError::Stream {
                        message,
                        source: None,
                    });
                }
            }
        }
        if decoder.is_finished() {
            break;
        }
    }

    if decoder.has_partial() {
        warn!("discarding unterminated trailing bytes from response stream");
    }
    debug!(frames = stats.frames, bytes = stats.bytes, "stream drained");
    Ok(stats)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    Pending,
    Committed,
    RolledBack,
}

/// Rollback scope for a prompt send.
///
/// Armed right after the busy flags are set. Unless [`commit`] is called,
/// leaving the scope removes the optimistic placeholders and, when the
/// conversation itself was auto-created for this send, the conversation.
/// Dropping the guard also clears the send flags, so a cancelled future
/// cannot leave the controller stuck busy.
///
/// [`commit`]: SendTransaction::commit
pub(crate) struct SendTransaction<'a> {
    state: &'a Mutex<AppState>,
    created: Option<ConversationId>,
    tx: TxState,
}

impl<'a> SendTransaction<'a> {
    pub fn begin(state: &'a Mutex<AppState>) -> Self {
        Self {
            state,
            created: None,
            tx: TxState::Pending,
        }
    }

    /// Record that the target conversation was created for this send and
    /// must disappear again on rollback.
    pub fn record_created(&mut self, id: ConversationId) {
        self.created = Some(id);
    }

    /// Mark the exchange as persisted; leaving the scope only clears flags.
    pub fn commit(mut self) {
        self.tx = TxState::Committed;
    }

    /// Undo the optimistic mutations now. Idempotent.
    pub fn roll_back(&mut self) {
        if self.tx != TxState::Pending {
            return;
        }
        let mut state = lock_app(self.state);
        Self::compensate(&mut state, self.created.as_ref());
        self.tx = TxState::RolledBack;
    }

    fn compensate(state: &mut AppState, created: Option<&ConversationId>) {
        let removed = state.transcript.remove_temporary();
        if let Some(id) = created {
            // The user may have opened another conversation while the
            // stream was in flight; its panels are not ours to clear.
            let was_active = state.store.active_id() == Some(id);
            state.store.remove(id);
            if was_active {
                state.transcript.clear();
                state.documents.clear();
            }
        }
        debug!(
            removed_placeholders = removed,
            removed_conversation = created.is_some(),
            "optimistic send state rolled back"
        );
    }
}

impl Drop for SendTransaction<'_> {
    fn drop(&mut self) {
        let mut state = lock_app(self.state);
        if self.tx == TxState::Pending {
            warn!("send dropped mid-flight; rolling optimistic state back");
            Self::compensate(&mut state, self.created.as_ref());
        }
        state.ops.sending = false;
        state.ops.creating = false;
        state.ops.phase = StreamPhase::Idle;
    }
}

/// Rollback scope for an edit-and-regenerate.
///
/// Holds the pre-edit message. If the operation's future is dropped while
/// still pending, the snapshot is written back over the half-edited
/// message. Explicit failure paths prefer refetching server truth and
/// call [`discard`]; the snapshot restore is the fallback when that
/// refetch fails too.
///
/// [`discard`]: EditTransaction::discard
pub(crate) struct EditTransaction<'a> {
    state: &'a Mutex<AppState>,
    snapshot: Option<Message>,
    tx: TxState,
}

impl<'a> EditTransaction<'a> {
    pub fn begin(state: &'a Mutex<AppState>, snapshot: Message) -> Self {
        Self {
            state,
            snapshot: Some(snapshot),
            tx: TxState::Pending,
        }
    }

    /// The edit is persisted and the transcript reloaded.
    pub fn commit(mut self) {
        self.tx = TxState::Committed;
    }

    /// Restore the pre-edit message now. Idempotent.
    pub fn roll_back(&mut self) {
        if self.tx != TxState::Pending {
            return;
        }
        let mut state = lock_app(self.state);
        if let Some(snapshot) = self.snapshot.take() {
            state.transcript.restore(snapshot);
        }
        self.tx = TxState::RolledBack;
    }

    /// Server truth was refetched; the snapshot is stale and must not be
    /// written back.
    pub fn discard(mut self) {
        self.tx = TxState::RolledBack;
    }
}

impl Drop for EditTransaction<'_> {
    fn drop(&mut self) {
        let mut state = lock_app(self.state);
        if self.tx == TxState::Pending {
            warn!("edit dropped mid-flight; restoring the original message");
            if let Some(snapshot) = self.snapshot.take() {
                state.transcript.restore(snapshot);
            }
        }
        state.ops.saving_edit = false;
        state.ops.phase = StreamPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use ragline_core::{Conversation, Document, DocumentId, MessageId};

    fn byte_stream(chunks: Vec<Result<Bytes, RaglineError>>) -> ByteStream {
        Box::pin(futures::stream::iter(chunks))
    }

    fn collected() -> (std::sync::Arc<Mutex<String>>, impl FnMut(&str)) {
        let buffer = std::sync::Arc::new(Mutex::new(String::new()));
        let sink = buffer.clone();
        (buffer, move |text: &str| {
            sink.lock().unwrap().push_str(text);
        })
    }

    #[tokio::test]
    async fn pump_applies_frames_in_order_until_done() {
        let stream = byte_stream(vec![
            Ok(Bytes::from("data: Salat means ")),
            Ok(Bytes::from("prayer.\ndata: It is ")),
            Ok(Bytes::from("one of the pillars.\ndata: [DONE]\n")),
        ]);
        let (buffer, on_text) = collected();
        let cancel = CancellationToken::new();

        let stats = pump_stream(stream, &cancel, on_text).await.unwrap();
        assert_eq!(stats.frames, 2);
        assert_eq!(
            buffer.lock().unwrap().as_str(),
            "Salat means prayer.It is one of the pillars."
        );
    }

    #[tokio::test]
    async fn pump_surfaces_error_frames() {
        let stream = byte_stream(vec![Ok(Bytes::from(
            "data: partial\ndata: [ERROR] model unavailable\n",
        ))]);
        let (buffer, on_text) = collected();
        let cancel = CancellationToken::new();

        let err = pump_stream(stream, &cancel, on_text).await.unwrap_err();
        match err {
            RaglineError::Stream { message, .. } => assert_eq!(message, "model unavailable"),
            other => panic!("expected stream error, got {other:?}"),
        }
        // Text before the error frame was still applied.
        assert_eq!(buffer.lock().unwrap().as_str(), "partial");
    }

    #[tokio::test]
    async fn pump_propagates_transport_failures() {
        let stream = byte_stream(vec![
            Ok(Bytes::from("data: ok\n")),
            Err(RaglineError::Stream {
                message: "connection reset".into(),
                source: None,
            }),
        ]);
        let (_, on_text) = collected();
        let cancel = CancellationToken::new();

        let err = pump_stream(stream, &cancel, on_text).await.unwrap_err();
        assert!(matches!(err, RaglineError::Stream { .. }));
    }

    #[tokio::test]
    async fn pump_treats_eof_without_done_as_success() {
        let stream = byte_stream(vec![Ok(Bytes::from("data: only frame\n"))]);
        let (buffer, on_text) = collected();
        let cancel = CancellationToken::new();

        let stats = pump_stream(stream, &cancel, on_text).await.unwrap();
        assert_eq!(stats.frames, 1);
        assert_eq!(buffer.lock().unwrap().as_str(), "only frame");
    }

    #[tokio::test]
    async fn pump_aborts_on_cancellation() {
        let stream: ByteStream = Box::pin(futures::stream::pending());
        let (_, on_text) = collected();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = pump_stream(stream, &cancel, on_text).await.unwrap_err();
        assert!(matches!(err, RaglineError::Cancelled));
    }

    fn state_with_optimistic_pair() -> Mutex<AppState> {
        let state = Mutex::new(AppState::default());
        {
            let mut st = state.lock().unwrap();
            st.transcript.push(Message::optimistic_prompt("question"));
            st.transcript.push(Message::optimistic_response());
            st.ops.sending = true;
            st.ops.phase = StreamPhase::Streaming;
        }
        state
    }

    #[test]
    fn dropped_send_transaction_compensates_and_clears_flags() {
        let state = state_with_optimistic_pair();
        {
            let _tx = SendTransaction::begin(&state);
        }
        let st = state.lock().unwrap();
        assert!(st.transcript.is_empty());
        assert!(!st.ops.sending);
        assert_eq!(st.ops.phase, StreamPhase::Idle);
    }

    #[test]
    fn committed_send_transaction_keeps_the_transcript() {
        let state = state_with_optimistic_pair();
        {
            let tx = SendTransaction::begin(&state);
            tx.commit();
        }
        let st = state.lock().unwrap();
        assert_eq!(st.transcript.len(), 2);
        assert!(!st.ops.sending);
    }

    #[test]
    fn send_rollback_removes_an_auto_created_conversation() {
        let state = state_with_optimistic_pair();
        let conversation_id = ConversationId("c-created".into());
        {
            let mut st = state.lock().unwrap();
            st.store.insert_active(Conversation {
                uid: conversation_id.clone(),
                title: "question".into(),
                created_at: "2025-03-01T10:00:00Z".parse().unwrap(),
                update_at: None,
            });
        }
        {
            let mut tx = SendTransaction::begin(&state);
            tx.record_created(conversation_id);
            tx.roll_back();
            tx.roll_back(); // idempotent
        }
        let st = state.lock().unwrap();
        assert!(st.store.is_empty());
        assert!(st.store.active_id().is_none());
        assert!(st.transcript.is_empty());
    }

    #[test]
    fn send_rollback_spares_panels_after_switching_away() {
        let state = Mutex::new(AppState::default());
        let created = ConversationId("c-created".into());
        let other = ConversationId("c-other".into());
        {
            // The user switched to c-other mid-send: its data fills the
            // panels and c-created is no longer selected.
            let mut st = state.lock().unwrap();
            st.store.replace_all(vec![
                Conversation {
                    uid: created.clone(),
                    title: "Doomed".into(),
                    created_at: "2025-03-10T09:00:00Z".parse().unwrap(),
                    update_at: None,
                },
                Conversation {
                    uid: other.clone(),
                    title: "Kept".into(),
                    created_at: "2025-03-01T10:00:00Z".parse().unwrap(),
                    update_at: None,
                },
            ]);
            st.store.set_active(&other);
            st.transcript.push(Message {
                uid: MessageId("m-kept".into()),
                prompt: Some("kept question".into()),
                response: Some("kept answer".into()),
                created_at: "2025-03-01T10:05:00Z".parse().unwrap(),
                is_loading: false,
            });
            st.documents.replace_all(vec![Document {
                uid: DocumentId("d-kept".into()),
                filename: "tafsir.pdf".into(),
                upload_date: "2025-03-01T10:00:00Z".parse().unwrap(),
                size: 2_000,
                mime_type: "application/pdf".into(),
                is_active: true,
            }]);
            st.ops.sending = true;
        }
        {
            let mut tx = SendTransaction::begin(&state);
            tx.record_created(created.clone());
            tx.roll_back();
        }
        let st = state.lock().unwrap();
        assert!(!st.store.contains(&created));
        assert_eq!(st.store.active_id(), Some(&other));
        assert_eq!(st.transcript.len(), 1);
        assert_eq!(st.documents.documents().len(), 1);
        assert!(!st.ops.sending);
    }

    #[test]
    fn dropped_edit_transaction_restores_the_snapshot() {
        let state = Mutex::new(AppState::default());
        let id = MessageId("m-1".into());
        {
            let mut st = state.lock().unwrap();
            st.transcript.push(Message {
                uid: id.clone(),
                prompt: Some("original".into()),
                response: Some("answer".into()),
                created_at: "2025-03-01T10:00:00Z".parse().unwrap(),
                is_loading: false,
            });
            let snapshot = st.transcript.replace_in_place(&id, "edited").unwrap();
            st.ops.saving_edit = true;
            drop(st);
            let _tx = EditTransaction::begin(&state, snapshot);
        }
        let st = state.lock().unwrap();
        let message = st.transcript.get(&id).unwrap();
        assert_eq!(message.prompt.as_deref(), Some("original"));
        assert_eq!(message.response.as_deref(), Some("answer"));
        assert!(!st.ops.saving_edit);
    }

    #[test]
    fn discarded_edit_transaction_leaves_the_reloaded_message() {
        let state = Mutex::new(AppState::default());
        let id = MessageId("m-1".into());
        {
            let mut st = state.lock().unwrap();
            st.transcript.push(Message {
                uid: id.clone(),
                prompt: Some("reloaded from server".into()),
                response: Some("server answer".into()),
                created_at: "2025-03-01T10:00:00Z".parse().unwrap(),
                is_loading: false,
            });
            let snapshot = st.transcript.replace_in_place(&id, "edited").unwrap();
            st.transcript.restore(snapshot.clone());
            drop(st);
            let tx = EditTransaction::begin(&state, snapshot);
            tx.discard();
        }
        let st = state.lock().unwrap();
        assert_eq!(
            st.transcript.get(&id).unwrap().prompt.as_deref(),
            Some("reloaded from server")
        );
    }

    #[test]
    fn phase_renders_lowercase() {
        assert_eq!(StreamPhase::Idle.to_string(), "idle");
        assert_eq!(StreamPhase::Finalizing.to_string(), "finalizing");
    }
}
