//! FloatChat core: sends questions to the ocean-data analysis service,
//! falls back to local answers when it can't, and keeps the conversation
//! and carousel state that front ends render.

pub mod carousel;
pub mod client;
pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod fallback;
pub mod session;
pub mod state;
pub mod status;

// Re-export main types for convenience
pub use carousel::{CarouselStateManager, Direction};
pub use client::FloatChatClient;
pub use config::Config;
pub use conversation::ConversationStore;
pub use dispatcher::QueryDispatcher;
pub use error::{ConversationError, DispatchError, SessionError};
pub use fallback::FallbackResponder;
pub use session::{ChatSession, PendingSubmission};
pub use state::{ChatRole, ImageRef, Message};
pub use status::{ServiceStatus, ServiceStatusMonitor, StatusHandle};
