//! Append-only chat transcript.

use crate::error::ConversationError;
use crate::state::Message;

/// Ordered message history. Positions start at 0, only ever grow, and are
/// never reassigned; there is no way to edit or remove a message.
#[derive(Debug, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return its position
    pub fn append(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, position: usize) -> Result<&Message, ConversationError> {
        self.messages
            .get(position)
            .ok_or(ConversationError::UnknownPosition {
                position,
                len: self.messages.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
