/**
 * Message Reconciler
 *
 * Merges fetched history, live message events, read receipts and the
 * session's own sends into one sequence per session.
 *
 * # Invariants
 *
 * - Ids are unique: a message that is already known is never inserted
 *   again, so bus echoes and history reloads are no-ops.
 * - Messages are sorted by timestamp; equal timestamps keep arrival order.
 * - The read flag only goes from `false` to `true`.
 *
 * # Order Independence
 *
 * A read receipt may arrive before the message it names. Such ids are
 * remembered and applied when the message shows up, so the final state
 * does not depend on the order events arrive in. The next history merge
 * drops whatever is still unmatched.
 */
use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::shared::{Message, MessageId, NewMessage, ParticipantId};

/// State of a send that has not been confirmed by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Sending,
    Failed,
}

/// Provisional message staged by the local participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    /// Session-local identifier, never sent to the store
    pub local_id: String,
    pub draft: NewMessage,
    pub status: SendStatus,
    pub staged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageReconciler {
    messages: Vec<Message>,
    ids: HashSet<MessageId>,
    early_reads: HashSet<MessageId>,
    pending: Vec<PendingSend>,
}

impl MessageReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a full history fetch
    pub fn from_history(history: Vec<Message>) -> Self {
        let mut reconciler = Self::new();
        reconciler.merge_history(history);
        reconciler
    }

    /// Reconciled messages, ascending by timestamp
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Merge a (re)fetched history; returns how many messages were new
    ///
    /// Known messages keep their position; their read flags are OR-ed.
    /// A receipt always follows the persist of its message, so receipts
    /// still unmatched after a full history name messages that will never
    /// arrive and are discarded.
    pub fn merge_history(&mut self, history: Vec<Message>) -> usize {
        let mut added = 0;
        for message in history {
            if self.apply_message(message) {
                added += 1;
            }
        }
        if !self.early_reads.is_empty() {
            tracing::debug!("[Session] Dropping {} unmatched read receipts", self.early_reads.len());
            self.early_reads.clear();
        }
        added
    }

    /// Apply a live message event; returns `true` if it was new
    pub fn apply_message(&mut self, mut message: Message) -> bool {
        if self.ids.contains(&message.id) {
            if message.read {
                self.mark_read(&message.id);
            }
            return false;
        }

        if self.early_reads.remove(&message.id) {
            message.read = true;
        }
        let index = self
            .messages
            .partition_point(|existing| existing.timestamp <= message.timestamp);
        self.ids.insert(message.id.clone());
        self.messages.insert(index, message);
        true
    }

    /// Apply a read receipt; returns how many known messages changed
    pub fn apply_read_receipt(&mut self, ids: &[MessageId]) -> usize {
        let mut changed = 0;
        for id in ids {
            if !self.ids.contains(id) {
                self.early_reads.insert(id.clone());
            } else if self.mark_read(id) {
                changed += 1;
            }
        }
        changed
    }

    /// Reconcile records confirmed by the store
    pub fn confirm(&mut self, records: Vec<Message>) {
        for record in records {
            self.apply_message(record);
        }
    }

    fn mark_read(&mut self, id: &MessageId) -> bool {
        match self.messages.iter_mut().find(|m| &m.id == id) {
            Some(message) if !message.read => {
                message.read = true;
                true
            }
            _ => false,
        }
    }

    /// Ids of unread messages sent by `sender`
    pub fn unread_from(&self, sender: ParticipantId) -> Vec<MessageId> {
        self.messages
            .iter()
            .filter(|m| m.sender == sender && !m.read)
            .map(|m| m.id.clone())
            .collect()
    }

    /// Sends not yet confirmed by the store, in staging order
    pub fn pending(&self) -> &[PendingSend] {
        &self.pending
    }

    /// Stage a provisional send
    pub fn stage(&mut self, local_id: impl Into<String>, draft: NewMessage) {
        self.pending.push(PendingSend {
            local_id: local_id.into(),
            draft,
            status: SendStatus::Sending,
            staged_at: Utc::now(),
        });
    }

    /// Replace a pending send with its canonical message
    pub fn resolve_pending(&mut self, local_id: &str, message: Message) -> bool {
        self.pending.retain(|p| p.local_id != local_id);
        self.apply_message(message)
    }

    pub fn fail_pending(&mut self, local_id: &str) {
        if let Some(pending) = self.pending.iter_mut().find(|p| p.local_id == local_id) {
            pending.status = SendStatus::Failed;
        }
    }

    /// Move a failed send back to `Sending` and return its draft
    pub fn take_for_retry(&mut self, local_id: &str) -> Option<NewMessage> {
        let pending = self
            .pending
            .iter_mut()
            .find(|p| p.local_id == local_id && p.status == SendStatus::Failed)?;
        pending.status = SendStatus::Sending;
        Some(pending.draft.clone())
    }
}
