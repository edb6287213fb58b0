// SPDX-FileCopyrightText: 2026 Ragline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client-side conversation list.
//!
//! Holds every conversation known to the client plus the active selection,
//! ordered by most recent activity. The store is pure state; networking and
//! sequencing live in [`crate::controller`].

use chrono::{DateTime, Utc};
use ragline_core::{Conversation, ConversationId};

/// Ordered conversation list with an optional active selection.
///
/// Invariants: the list is sorted by [`Conversation::last_activity`]
/// descending, and `active` always names a conversation present in the
/// list (or is `None`).
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    active: Option<ConversationId>,
}

impl ConversationStore {
    /// Replace the whole list, e.g. after the initial fetch. Re-sorts and
    /// drops the active selection if its conversation is gone.
    pub fn replace_all(&mut self, conversations: Vec<Conversation>) {
        self.conversations = conversations;
        self.sort();
        if self.active.as_ref().is_some_and(|id| !self.contains(id)) {
            self.active = None;
        }
    }

    /// Insert a freshly created conversation and select it.
    pub fn insert_active(&mut self, conversation: Conversation) {
        let id = conversation.uid.clone();
        self.conversations.push(conversation);
        self.sort();
        self.active = Some(id);
    }

    /// Remove a conversation. Clears the active selection if it pointed at
    /// the removed entry; promotion to a new selection is the caller's call.
    pub fn remove(&mut self, id: &ConversationId) -> Option<Conversation> {
        let index = self.conversations.iter().position(|c| &c.uid == id)?;
        let removed = self.conversations.remove(index);
        if self.active.as_ref() == Some(id) {
            self.active = None;
        }
        Some(removed)
    }

    /// Apply a server-updated conversation (rename result) in place.
    pub fn apply_update(&mut self, updated: Conversation) {
        if let Some(slot) = self.conversations.iter_mut().find(|c| c.uid == updated.uid) {
            *slot = updated;
            self.sort();
        }
    }

    /// Bump a conversation's `update_at` so it sorts to the top.
    pub fn touch(&mut self, id: &ConversationId, at: DateTime<Utc>) {
        if let Some(conversation) = self.conversations.iter_mut().find(|c| &c.uid == id) {
            conversation.update_at = Some(at);
            self.sort();
        }
    }

    /// Select a conversation. Returns `false` if it is not in the list.
    pub fn set_active(&mut self, id: &ConversationId) -> bool {
        if self.contains(id) {
            self.active = Some(id.clone());
            true
        } else {
            false
        }
    }

    pub fn clear_active(&mut self) {
        self.active = None;
    }

    pub fn active_id(&self) -> Option<&ConversationId> {
        self.active.as_ref()
    }

    pub fn active(&self) -> Option<&Conversation> {
        let id = self.active.as_ref()?;
        self.get(id)
    }

    pub fn get(&self, id: &ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| &c.uid == id)
    }

    pub fn contains(&self, id: &ConversationId) -> bool {
        self.get(id).is_some()
    }

    /// Most recently active conversation, if any.
    pub fn head(&self) -> Option<&Conversation> {
        self.conversations.first()
    }

    pub fn all(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    // Stable sort: ties keep their relative order.
    fn sort(&mut self) {
        self.conversations
            .sort_by(|a, b| b.last_activity().cmp(&a.last_activity()));
    }
}
