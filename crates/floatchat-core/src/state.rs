//! UI-agnostic conversation types
//!
//! These are shared by every front end and don't depend on any UI framework.
//! A [`Message`] is never mutated after it has been appended to a
//! [`ConversationStore`](crate::conversation::ConversationStore).

use serde::{Deserialize, Serialize};

const DIAGNOSTIC_SEPARATOR: &str = "\n\nService note: ";

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn label(&self) -> &'static str {
        match self {
            ChatRole::User => "You",
            ChatRole::Assistant => "FloatChat",
        }
    }
}

/// Reference to an image artifact (not the bytes themselves)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub caption: String,
}

impl ImageRef {
    pub fn new(url: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            caption: caption.into(),
        }
    }

    /// Last path segment of the URL, used when saving the image locally
    pub fn file_name(&self) -> &str {
        self.url
            .rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("plot.png")
    }
}

/// A single entry in the chat transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: ChatRole,
    pub text: String,
    pub images: Vec<ImageRef>,
    pub diagnostics: Option<String>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            images: Vec::new(),
            diagnostics: None,
        }
    }

    pub fn assistant(text: impl Into<String>, images: Vec<ImageRef>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
            images,
            diagnostics: None,
        }
    }

    /// Attach a diagnostic note, echoing it at the end of the text so a
    /// degraded reply is visible even where diagnostics aren't rendered.
    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        let diagnostic = diagnostic.into();
        self.text.push_str(DIAGNOSTIC_SEPARATOR);
        self.text.push_str(&diagnostic);
        self.diagnostics = Some(diagnostic);
        self
    }

    /// Text without the echoed diagnostic note
    pub fn body(&self) -> &str {
        match &self.diagnostics {
            Some(diagnostic) => self
                .text
                .strip_suffix(diagnostic.as_str())
                .and_then(|rest| rest.strip_suffix(DIAGNOSTIC_SEPARATOR))
                .unwrap_or(&self.text),
            None => &self.text,
        }
    }

    pub fn is_carousel(&self) -> bool {
        self.images.len() > 1
    }
}
