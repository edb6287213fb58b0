// SPDX-FileCopyrightText: 2026 Ragline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared application state behind the controller's lock.

use std::sync::{Mutex, MutexGuard, PoisonError};

use ragline_core::{ConversationId, DocumentId, MessageId};

use crate::documents::DocumentPanel;
use crate::reconciler::StreamPhase;
use crate::store::ConversationStore;
use crate::transcript::Transcript;

/// Lock the state, tolerating poison. Critical sections only mutate plain
/// data, so state left by a panicking holder is still coherent.
pub(crate) fn lock_app(state: &Mutex<AppState>) -> MutexGuard<'_, AppState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything the controller guards with its mutex. Mutations happen in
/// short critical sections; the lock is never held across an await.
#[derive(Debug, Default)]
pub(crate) struct AppState {
    pub store: ConversationStore,
    pub transcript: Transcript,
    pub documents: DocumentPanel,
    pub ops: OpFlags,
}

/// In-flight operation markers and interaction modes.
///
/// Flags answer "is this running"; the `Option` fields are modes the user
/// is in ("renaming conversation X") that exist before any network call.
/// Snapshots of this struct are what hosts use to disable controls.
#[derive(Debug, Clone, Default)]
pub struct OpFlags {
    /// A prompt send is in flight.
    pub sending: bool,
    /// A conversation is being auto-created for a first prompt.
    pub creating: bool,
    /// An edit-and-regenerate request is in flight.
    pub saving_edit: bool,
    /// A rename request is in flight.
    pub saving_rename: bool,
    /// An upload request is in flight.
    pub uploading: bool,
    /// Messages and documents are being fetched.
    pub loading: bool,
    /// Message the user is editing, before the edit is submitted.
    pub editing: Option<MessageId>,
    /// Conversation the user is renaming, before the rename is submitted.
    pub renaming: Option<ConversationId>,
    /// Conversation with a delete in flight.
    pub deleting: Option<ConversationId>,
    /// Document with a delete in flight.
    pub deleting_document: Option<DocumentId>,
    /// Where the current send or edit stands.
    pub phase: StreamPhase,
}

impl OpFlags {
    /// What blocks a new send, if anything. Edit mode is deliberately
    /// absent: starting a send cancels it instead.
    pub(crate) fn send_blocker(&self) -> Option<&'static str> {
        if self.sending {
            Some("send")
        } else if self.creating {
            Some("create")
        } else if self.saving_rename || self.renaming.is_some() {
            Some("rename")
        } else if self.saving_edit {
            Some("edit")
        } else {
            None
        }
    }

    /// What blocks submitting an edit, if anything.
    pub(crate) fn edit_blocker(&self) -> Option<&'static str> {
        if self.saving_edit {
            Some("edit")
        } else if self.sending {
            Some("send")
        } else if self.creating {
            Some("create")
        } else if self.saving_rename || self.renaming.is_some() {
            Some("rename")
        } else {
            None
        }
    }

    /// What blocks deleting a conversation, if anything.
    pub(crate) fn delete_blocker(&self) -> Option<&'static str> {
        if self.saving_edit || self.editing.is_some() {
            Some("edit")
        } else if self.saving_rename || self.renaming.is_some() {
            Some("rename")
        } else if self.deleting.is_some() {
            Some("delete")
        } else {
            None
        }
    }
}
