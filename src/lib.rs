pub mod app;
pub mod bible;
pub mod config;
pub mod handler;
pub mod openai;
pub mod session;
pub mod tui;
pub mod ui;

// Re-export main types for convenience
pub use app::App;
pub use bible::{BibleClient, Translation, VerseError, VerseQuery, VerseResult};
pub use config::Config;
pub use openai::{ChatError, ChatEvent, OpenAIClient};
pub use session::{build_outbound_messages, ChatMessage, ChatRole, Session};
