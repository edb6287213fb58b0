// SPDX-FileCopyrightText: 2026 Ragline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message transcript of the active conversation.
//!
//! The transcript is the mutation target of streaming: optimistic
//! placeholders are pushed here before the server acknowledges anything,
//! response text accumulates chunk by chunk, and rollback removes the
//! placeholders again. Pure state, like [`crate::store`].

use ragline_core::{Message, MessageId};

/// Chronological message list for the active conversation.
///
/// At most one message has `is_loading == true` at any time: the response
/// placeholder of the in-flight send or edit.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Replace the whole transcript with a server-fetched list.
    pub fn replace_all(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.uid == id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append streamed text to a message's response. Returns `false` if the
    /// message is gone, which callers treat as a stale stream to ignore.
    pub fn append_chunk(&mut self, id: &MessageId, text: &str) -> bool {
        match self.messages.iter_mut().find(|m| &m.uid == id) {
            Some(message) => {
                message.response.get_or_insert_with(String::new).push_str(text);
                true
            }
            None => false,
        }
    }

    /// Clear the loading marker once a stream has ended.
    pub fn finish_streaming(&mut self, id: &MessageId) -> bool {
        match self.messages.iter_mut().find(|m| &m.uid == id) {
            Some(message) => {
                message.is_loading = false;
                true
            }
            None => false,
        }
    }

    /// Rewrite a message in place for an edit-and-regenerate: new prompt,
    /// empty response, loading marker set. Position and `created_at` are
    /// kept. Returns the pre-edit message so the caller can restore it.
    pub fn replace_in_place(&mut self, id: &MessageId, new_prompt: &str) -> Option<Message> {
        let message = self.messages.iter_mut().find(|m| &m.uid == id)?;
        let snapshot = message.clone();
        message.prompt = Some(new_prompt.to_owned());
        message.response = Some(String::new());
        message.is_loading = true;
        Some(snapshot)
    }

    /// Put a previously captured message back, replacing the current entry
    /// with the same id. Returns `false` if the entry no longer exists.
    pub fn restore(&mut self, snapshot: Message) -> bool {
        match self.messages.iter_mut().find(|m| m.uid == snapshot.uid) {
            Some(slot) => {
                *slot = snapshot;
                true
            }
            None => false,
        }
    }

    /// Drop every optimistic placeholder. Returns how many were removed.
    pub fn remove_temporary(&mut self) -> usize {
        let before = self.messages.len();
        self.messages.retain(|m| !m.uid.is_temporary());
        before - self.messages.len()
    }

    pub fn has_temporary(&self) -> bool {
        self.messages.iter().any(|m| m.uid.is_temporary())
    }
}
