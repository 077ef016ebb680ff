//! In-memory buffer with the same dedup and claim semantics as the SQLite store.
//!
//! One mutex guards the whole queue, so lookup-or-create in `save` and
//! select-and-flip in `claim` are each a single critical section.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::buffer::validate_save_args;
use crate::core::{Buffer, MessageId, MessengerError, QueuedMessage, Recipient};

#[derive(Default)]
struct BufferState {
    next_id: MessageId,
    messages: BTreeMap<MessageId, QueuedMessage>,
    /// Unclaimed ids; the first one is the claim candidate.
    pending: BTreeSet<MessageId>,
    /// Dedup index over unclaimed messages only.
    unclaimed: HashMap<(String, String), MessageId>,
    recipients: HashMap<MessageId, Vec<String>>,
}

/// Process-local buffer for development and testing.
#[derive(Default)]
pub struct InMemoryBuffer {
    state: Mutex<BufferState>,
}

impl InMemoryBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of messages, claimed or not.
    pub fn len(&self) -> usize {
        self.state.lock().messages.len()
    }

    /// Whether the buffer has never held a message.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of messages still waiting to be claimed.
    pub fn unclaimed_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Copy of every message in id order.
    pub fn snapshot(&self) -> Vec<QueuedMessage> {
        self.state.lock().messages.values().cloned().collect()
    }
}

#[async_trait]
impl Buffer for InMemoryBuffer {
    async fn save(
        &self,
        phone_number: &str,
        originator: &str,
        text: &str,
    ) -> Result<(), MessengerError> {
        validate_save_args(phone_number, originator, text)?;

        let mut state = self.state.lock();
        let key = (originator.to_string(), text.to_string());
        let existing = state.unclaimed.get(&key).copied();
        let id = if let Some(id) = existing {
            id
        } else {
            state.next_id += 1;
            let id = state.next_id;
            state.messages.insert(
                id,
                QueuedMessage {
                    id,
                    originator: key.0.clone(),
                    text: key.1.clone(),
                    claimed: false,
                },
            );
            state.unclaimed.insert(key, id);
            state.pending.insert(id);
            id
        };

        let numbers = state.recipients.entry(id).or_default();
        if !numbers.iter().any(|n| n == phone_number) {
            numbers.push(phone_number.to_string());
        }
        Ok(())
    }

    async fn claim(&self) -> Result<Option<QueuedMessage>, MessengerError> {
        let mut state = self.state.lock();
        let Some(id) = state.pending.pop_first() else {
            return Ok(None);
        };
        let Some(message) = state.messages.get_mut(&id) else {
            return Ok(None);
        };
        message.claimed = true;
        let claimed = message.clone();
        state
            .unclaimed
            .remove(&(claimed.originator.clone(), claimed.text.clone()));
        Ok(Some(claimed))
    }

    async fn recipients(&self, message_id: MessageId) -> Result<Vec<Recipient>, MessengerError> {
        let state = self.state.lock();
        Ok(state
            .recipients
            .get(&message_id)
            .map(|numbers| {
                numbers
                    .iter()
                    .map(|phone_number| Recipient {
                        message_id,
                        phone_number: phone_number.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}
