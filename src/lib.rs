//! Chatbridge
//!
//! Chat client for a practice website assistant. User text goes to a single
//! external webhook, the reply comes back into an in-memory transcript, and
//! the widget layer adds quick prompts, a typing indicator and a call-now
//! link.
//!
//! # Architecture
//!
//! - **Webhook**: POST with a per-attempt deadline, one GET fallback, JSON reply
//! - **Session**: transcript, busy flag and the send cycle
//! - **Widget**: prompts, texts and layout shared by every skin
//! - **REPL**: terminal front-end used by the binary
//!
//! # Modules
//!
//! - [`config`]: layered configuration (defaults, file, env, CLI)
//! - [`error`]: tagged exchange errors
//! - [`repl`]: terminal input parsing and rendering
//! - [`session`]: conversation management
//! - [`webhook`]: the webhook client
//! - [`widget`]: widget settings

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::default_trait_access)]

pub mod config;
pub mod error;
pub mod repl;
pub mod session;
pub mod webhook;
pub mod widget;

pub use error::ChatError;
pub use session::{ChatMessage, ChatSession, MessageRole, SendOutcome};
pub use webhook::WebhookClient;
