//! Webhook chat client.
//!
//! The only wire contract of the crate: a user message goes out as
//! `POST <endpoint>` with `{"text": ...}`, falls back once to
//! `GET <endpoint>?text=...` when the POST gets no response, and the reply's
//! `message` field comes back as assistant text.
//!
//! # Modules
//!
//! - [`client`]: the exchange itself
//! - [`deadline`]: per-attempt timeout race
//! - [`transport`]: HTTP seam and its `reqwest` implementation

pub mod client;
pub mod deadline;
pub mod transport;

pub use client::{DEFAULT_EMPTY_REPLY, DEFAULT_TIMEOUT, WebhookClient};
pub use deadline::{Elapsed, with_deadline};
pub use transport::{
    HttpTransport, TransportError, WebhookRequest, WebhookResponse, WebhookTransport,
};
