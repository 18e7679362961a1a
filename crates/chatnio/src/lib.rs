//! Client library for the Chat Nio API: session state, REST calls for
//! conversations/quota/subscriptions, and the WebSocket chat stream.
//! Used by the `chatnio` CLI.

pub mod api;
pub mod blocking;
pub mod chat;
pub mod config;
pub mod error;
pub mod messages;
pub mod models;
pub mod session;

pub use api::Client;
pub use chat::{new_chat, Ask, Chat, DEFAULT_MODEL, NEW_CONVERSATION};
pub use config::{default_config_path, ApiSection, ChatSection, Config, ConfigError};
pub use error::{Error, Result, TransportError};
pub use messages::PartialMessage;
pub use models::{Conversation, Message, Package, Subscription};
pub use session::{Session, API_BASE, TOKEN_ENV};
