pub mod ai;
pub mod config;
pub mod error;
pub mod logger;
pub mod protocol;
pub mod provider;
pub mod relay;
pub mod state;

// Re-export main types for convenience
pub use ai::{AiClient, ChatBackend, GeminiClient, HttpPromptClient};
pub use config::{ApiKey, Config, GenerationConfig, Settings};
pub use error::{AiError, ConfigError};
pub use protocol::{InboundMessage, OutboundMessage};
pub use provider::Provider;
pub use relay::{Panel, Relay};
pub use state::{ChatMessage, ChatRole, PanelState};
