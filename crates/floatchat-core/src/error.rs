//! Error types for the FloatChat core.
//!
//! [`DispatchError`] never escapes the dispatcher: its `Display` text becomes
//! the diagnostic note on a fallback reply. The remaining enums signal caller
//! contract violations.

/// Why a request to the analysis service could not be used.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The request never reached the service.
    #[error("analysis service unavailable: {0}")]
    Transport(String),
    /// The service answered with a non-success status code.
    #[error("analysis service returned HTTP {status}{}", detail_suffix(.detail))]
    HttpStatus { status: u16, detail: Option<String> },
    /// The body could not be understood.
    #[error("analysis service sent a malformed response: {0}")]
    Malformed(String),
    /// A well-formed response that reports a failure.
    #[error("analysis service could not answer: {0}")]
    Application(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(detail) if !detail.is_empty() => format!(" ({})", detail),
        _ => String::new(),
    }
}

impl DispatchError {
    pub fn is_transport(&self) -> bool {
        matches!(self, DispatchError::Transport(_))
    }
}

impl From<reqwest::Error> for DispatchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DispatchError::Malformed(err.to_string())
        } else {
            DispatchError::Transport(err.to_string())
        }
    }
}

/// Misuse of the conversation store.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConversationError {
    #[error("no message at position {position} (conversation has {len})")]
    UnknownPosition { position: usize, len: usize },
}

/// Misuse of a chat session.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("a submission is already in flight")]
    SubmissionPending,
    #[error("no submission is in flight")]
    NoPendingSubmission,
    #[error(transparent)]
    Conversation(#[from] ConversationError),
}
