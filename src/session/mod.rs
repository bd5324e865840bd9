//! Conversation state and the send cycle.
//!
//! A [`ChatSession`] owns the transcript and the busy flag, and drives one
//! webhook exchange per accepted message. UIs render from
//! [`ChatSession::messages`] and follow changes through
//! [`ChatSession::subscribe`].
//!
//! # Example
//!
//! ```rust,no_run
//! use chatbridge::session::{ChatSession, SendOutcome};
//! use chatbridge::webhook::WebhookClient;
//! use chatbridge::widget::WidgetSettings;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = WebhookClient::new("https://hooks.example.com/webhook/abc".parse()?);
//! let chat = ChatSession::new(client, WidgetSettings::default());
//!
//! if let SendOutcome::Replied(reply) = chat.send_message("Hello!").await {
//!     println!("{}", reply.text);
//! }
//! # Ok(())
//! # }
//! ```

mod chat;
mod conversation;

pub use chat::{ChatSession, SendOutcome, TranscriptEvent};
pub use conversation::{ChatMessage, Conversation, MessageRole};
