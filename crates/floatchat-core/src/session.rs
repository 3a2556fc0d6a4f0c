//! Single owner of a conversation and its carousel state.
//!
//! Submissions are serialized here: a second one is rejected while the
//! first is still waiting for its reply.

use tracing::debug;
use crate::carousel::{CarouselStateManager, Direction};
use crate::conversation::ConversationStore;
use crate::dispatcher::QueryDispatcher;
use crate::error::{ConversationError, SessionError};
use crate::state::Message;

/// Ticket for a submission whose user message is already in the transcript
#[derive(Debug, PartialEq, Eq)]
pub struct PendingSubmission {
    position: usize,
    text: String,
}

impl PendingSubmission {
    /// Text to send to the dispatcher
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Position of the user message
    pub fn position(&self) -> usize {
        self.position
    }
}

#[derive(Debug, Default)]
pub struct ChatSession {
    conversation: ConversationStore,
    carousel: CarouselStateManager,
    pending: Option<usize>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.all()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Record the user's message and reserve the slot for the reply
    pub fn begin_submission(&mut self, raw_text: &str) -> Result<PendingSubmission, SessionError> {
        if self.pending.is_some() {
            return Err(SessionError::SubmissionPending);
        }
        let text = raw_text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        let position = self.conversation.append(Message::user(text));
        self.pending = Some(position);
        debug!(position, "submission started");

        Ok(PendingSubmission {
            position,
            text: text.to_string(),
        })
    }

    /// Append the reply for `ticket` and release the submission guard
    pub fn complete_submission(
        &mut self,
        ticket: PendingSubmission,
        reply: Message,
    ) -> Result<usize, SessionError> {
        if self.pending != Some(ticket.position) {
            return Err(SessionError::NoPendingSubmission);
        }

        let position = self.conversation.append(reply);
        self.pending = None;
        debug!(position, "submission completed");
        Ok(position)
    }

    /// Submit, dispatch and record the reply in one go
    pub async fn submit(
        &mut self,
        dispatcher: &QueryDispatcher,
        raw_text: &str,
    ) -> Result<usize, SessionError> {
        let ticket = self.begin_submission(raw_text)?;
        let reply = dispatcher.dispatch(ticket.text()).await;
        self.complete_submission(ticket, reply)
    }

    /// Displayed image index for the message at `position`.
    ///
    /// Creates the zero entry on first use for multi-image messages; returns
    /// `None` for messages with fewer than two images.
    pub fn carousel_index(&mut self, position: usize) -> Result<Option<usize>, ConversationError> {
        let message = self.conversation.get(position)?;
        if !message.is_carousel() {
            return Ok(None);
        }
        Ok(Some(self.carousel.ensure(position)))
    }

    pub fn navigate_carousel(
        &mut self,
        position: usize,
        direction: Direction,
    ) -> Result<usize, SessionError> {
        let total = self.conversation.get(position)?.images.len();
        Ok(self.carousel.navigate(position, direction, total))
    }

    /// Positions of messages that carry a carousel, oldest first
    pub fn carousel_positions(&self) -> Vec<usize> {
        self.messages()
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_carousel())
            .map(|(i, _)| i)
            .collect()
    }
}
