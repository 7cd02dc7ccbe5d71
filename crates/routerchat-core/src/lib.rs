pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use client::{Completer, Completion, CompletionClient, NO_VALID_RESPONSE};
pub use config::{load_dotenv, Config, DEFAULT_MODEL};
pub use error::ConfigError;
pub use session::{ChatSession, TurnPhase};
pub use state::{ChatMessage, ChatRole, ConversationLog};
