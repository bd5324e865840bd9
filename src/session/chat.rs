//! The send cycle: user message, placeholder, webhook exchange, reply.

use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::conversation::{ChatMessage, Conversation};
use crate::error::ChatError;
use crate::webhook::WebhookClient;
use crate::widget::{DisplayMode, WidgetSettings};

/// Capacity of the transcript event channel.
const EVENT_CAPACITY: usize = 64;

/// Change to the visible transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    Appended(ChatMessage),
    /// Message with this ID was taken off the transcript.
    Removed(String),
    Cleared,
}

/// Result of a call to [`ChatSession::send_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input or a send already pending; nothing happened.
    Ignored,
    /// The webhook replied; carries the assistant message.
    Replied(ChatMessage),
    /// The exchange failed; carries the error message shown to the user.
    Failed {
        message: ChatMessage,
        error: ChatError,
    },
}

#[derive(Debug)]
struct SessionState {
    conversation: Conversation,
    busy: bool,
}

#[derive(Debug)]
struct SessionInner {
    client: WebhookClient,
    settings: WidgetSettings,
    state: RwLock<SessionState>,
    events: broadcast::Sender<TranscriptEvent>,
}

/// Accepted send, between placeholder and reply.
///
/// Dropped unsettled (the send future was cancelled mid-exchange), it takes
/// the placeholder down and returns the session to idle.
struct PendingSend<'a> {
    session: &'a ChatSession,
    text: String,
    placeholder_id: String,
    settled: bool,
}

impl PendingSend<'_> {
    /// Replace the placeholder with the terminal message for `result`.
    fn settle(mut self, result: Result<String, ChatError>) -> SendOutcome {
        self.settled = true;
        let mut state = self.session.state();

        if state.conversation.remove(&self.placeholder_id).is_some() {
            self.session
                .emit(TranscriptEvent::Removed(self.placeholder_id.clone()));
        }

        let outcome = match result {
            Ok(reply) => {
                info!(name: "chat.reply.received", chars = reply.len(), "Assistant replied");
                SendOutcome::Replied(ChatMessage::assistant(reply))
            }
            Err(error) => {
                warn!(name: "chat.reply.failed", error = %error, "Exchange failed");
                SendOutcome::Failed {
                    message: ChatMessage::error(error.user_message()),
                    error,
                }
            }
        };

        if let SendOutcome::Replied(msg) | SendOutcome::Failed { message: msg, .. } = &outcome {
            state.conversation.push(msg.clone());
            self.session.emit(TranscriptEvent::Appended(msg.clone()));
        }
        state.busy = false;

        outcome
    }
}

impl Drop for PendingSend<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let mut state = self.session.state();
        if state.conversation.remove(&self.placeholder_id).is_some() {
            self.session
                .emit(TranscriptEvent::Removed(self.placeholder_id.clone()));
        }
        state.busy = false;
        debug!(name: "chat.send.abandoned", "Send cancelled before a reply arrived");
    }
}

/// A chat conversation bound to one webhook.
///
/// Clones share the same conversation, so an input task and a render task
/// can each hold one. At most one send is in flight at a time.
#[derive(Debug, Clone)]
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

impl ChatSession {
    /// Create a session, seeding the welcome greeting if one is configured.
    ///
    /// The client's empty-reply text is taken from `settings`.
    #[must_use]
    pub fn new(client: WebhookClient, settings: WidgetSettings) -> Self {
        let client = client.empty_reply(settings.empty_reply_text.clone());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let mut conversation = Conversation::new();
        if let Some(welcome) = &settings.welcome_message {
            conversation.push(ChatMessage::assistant(welcome.clone()));
        }

        Self {
            inner: Arc::new(SessionInner {
                client,
                settings,
                state: RwLock::new(SessionState {
                    conversation,
                    busy: false,
                }),
                events,
            }),
        }
    }

    /// Widget settings this session was created with.
    pub fn settings(&self) -> &WidgetSettings {
        &self.inner.settings
    }

    /// Subscribe to transcript changes.
    pub fn subscribe(&self) -> broadcast::Receiver<TranscriptEvent> {
        self.inner.events.subscribe()
    }

    /// Snapshot of the transcript.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state().conversation.messages().to_vec()
    }

    /// Whether a send is in flight.
    pub fn is_busy(&self) -> bool {
        self.state().busy
    }

    /// Send one user message and wait for its terminal reply.
    ///
    /// Blank input, or a call while another send is pending, is a silent
    /// no-op. Otherwise the user message and a typing placeholder are
    /// appended, the webhook is called, and the placeholder is replaced by
    /// exactly one assistant or error message. Dropping the returned future
    /// early removes the placeholder and leaves the session idle.
    pub async fn send_message(&self, text: &str) -> SendOutcome {
        let Some(pending) = self.begin(text) else {
            debug!(name: "chat.send.ignored", "Send ignored (blank input or busy)");
            return SendOutcome::Ignored;
        };

        let result = self.inner.client.exchange(&pending.text).await;
        pending.settle(result)
    }

    /// Submit the quick prompt at `index`, exactly as if it were typed.
    pub async fn send_quick_prompt(&self, index: usize) -> SendOutcome {
        match self.inner.settings.quick_prompt(index) {
            Some(prompt) => {
                let prompt = prompt.to_string();
                self.send_message(&prompt).await
            }
            None => SendOutcome::Ignored,
        }
    }

    /// Go back to the main menu, discarding the conversation.
    ///
    /// Only the multi-screen layout has a menu. Refused while a send is
    /// pending so a late reply cannot land in a fresh conversation.
    pub fn return_to_menu(&self) -> bool {
        if self.inner.settings.display_mode != DisplayMode::MultiScreen {
            return false;
        }

        let mut state = self.state();
        if state.busy {
            return false;
        }

        state.conversation.clear();
        self.emit(TranscriptEvent::Cleared);
        if let Some(welcome) = &self.inner.settings.welcome_message {
            let msg = ChatMessage::assistant(welcome.clone());
            state.conversation.push(msg.clone());
            self.emit(TranscriptEvent::Appended(msg));
        }
        info!(name: "chat.menu.returned", "Conversation cleared");
        true
    }

    fn begin(&self, text: &str) -> Option<PendingSend<'_>> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let mut state = self.state();
        if state.busy {
            return None;
        }
        state.busy = true;

        let user = ChatMessage::user(text);
        state.conversation.push(user.clone());
        self.emit(TranscriptEvent::Appended(user));

        let typing = ChatMessage::typing(self.inner.settings.typing_text.clone());
        let placeholder_id = typing.id.clone();
        state.conversation.push(typing.clone());
        self.emit(TranscriptEvent::Appended(typing));

        Some(PendingSend {
            session: self,
            text: text.to_string(),
            placeholder_id,
            settled: false,
        })
    }

    fn emit(&self, event: TranscriptEvent) {
        // No subscribers is fine; the transcript itself is the source of truth.
        let _ = self.inner.events.send(event);
    }

    fn state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MessageRole;
    use crate::webhook::{TransportError, WebhookRequest, WebhookResponse, WebhookTransport};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;
    use url::Url;

    /// Replies with a fixed status/body once the gate is opened.
    struct GatedTransport {
        calls: AtomicUsize,
        gate: Notify,
        gated: bool,
        status: u16,
        body: String,
        seen: Mutex<Vec<WebhookRequest>>,
    }

    impl GatedTransport {
        fn build(gated: bool, status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                gate: Notify::new(),
                gated,
                status,
                body: body.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn open(status: u16, body: &str) -> Arc<Self> {
            Self::build(false, status, body)
        }

        fn gated(status: u16, body: &str) -> Arc<Self> {
            Self::build(true, status, body)
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl WebhookTransport for GatedTransport {
        async fn execute(
            &self,
            request: WebhookRequest,
        ) -> Result<WebhookResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.gated {
                self.gate.notified().await;
            }
            Ok(WebhookResponse {
                status: self.status,
                reason: String::new(),
                body: self.body.clone(),
            })
        }
    }

    fn session(transport: Arc<GatedTransport>, settings: WidgetSettings) -> ChatSession {
        let url = Url::parse("https://hooks.example.com/webhook/abc").unwrap();
        ChatSession::new(WebhookClient::with_transport(url, transport), settings)
    }

    fn quiet_settings() -> WidgetSettings {
        WidgetSettings {
            welcome_message: None,
            ..WidgetSettings::default()
        }
    }

    #[tokio::test]
    async fn test_send_appends_user_and_reply() {
        let transport = GatedTransport::open(200, r#"{"message":"Hello"}"#);
        let chat = session(Arc::clone(&transport), quiet_settings());

        let outcome = chat.send_message("  Hi there  ").await;
        assert!(matches!(outcome, SendOutcome::Replied(ref m) if m.text == "Hello"));

        let messages = chat.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].text, "Hi there");
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[1].text, "Hello");
        assert!(!chat.is_busy());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let transport = GatedTransport::open(200, r#"{"message":"Hello"}"#);
        let chat = session(Arc::clone(&transport), quiet_settings());

        assert_eq!(chat.send_message("").await, SendOutcome::Ignored);
        assert_eq!(chat.send_message(" \n\t ").await, SendOutcome::Ignored);
        assert!(chat.messages().is_empty());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_send_while_busy_is_ignored() {
        let transport = GatedTransport::gated(200, r#"{"message":"first"}"#);
        let chat = session(Arc::clone(&transport), quiet_settings());

        let first = tokio::spawn({
            let chat = chat.clone();
            async move { chat.send_message("one").await }
        });
        while transport.calls() == 0 {
            tokio::task::yield_now().await;
        }

        assert!(chat.is_busy());
        let during = chat.messages();
        assert_eq!(during.len(), 2);
        assert_eq!(during[1].role, MessageRole::Typing);

        assert_eq!(chat.send_message("two").await, SendOutcome::Ignored);
        assert_eq!(chat.messages().len(), 2);

        transport.gate.notify_one();
        let outcome = first.await.unwrap();
        assert!(matches!(outcome, SendOutcome::Replied(_)));

        let after = chat.messages();
        assert_eq!(after.len(), 2);
        assert!(after.iter().all(|m| m.role != MessageRole::Typing));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_send_returns_to_idle() {
        let transport = GatedTransport::gated(200, r#"{"message":"late"}"#);
        let chat = session(Arc::clone(&transport), quiet_settings());
        let mut rx = chat.subscribe();

        let cut_short =
            tokio::time::timeout(Duration::from_millis(100), chat.send_message("hi")).await;
        assert!(cut_short.is_err());

        assert!(!chat.is_busy());
        let messages = chat.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::User);

        let Ok(TranscriptEvent::Appended(_)) = rx.try_recv() else {
            panic!("expected user message");
        };
        let Ok(TranscriptEvent::Appended(typing)) = rx.try_recv() else {
            panic!("expected placeholder");
        };
        assert_eq!(rx.try_recv(), Ok(TranscriptEvent::Removed(typing.id)));

        // The stored permit lets the next exchange through.
        transport.gate.notify_one();
        let outcome = chat.send_message("again").await;
        assert!(matches!(outcome, SendOutcome::Replied(ref m) if m.text == "late"));
        assert_eq!(chat.messages().len(), 3);
        assert!(!chat.is_busy());
    }

    #[tokio::test]
    async fn test_aborted_send_task_returns_to_idle() {
        let transport = GatedTransport::gated(200, r#"{"message":"late"}"#);
        let chat = session(Arc::clone(&transport), quiet_settings());

        let task = tokio::spawn({
            let chat = chat.clone();
            async move { chat.send_message("one").await }
        });
        while transport.calls() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(chat.is_busy());

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        assert!(!chat.is_busy());
        assert!(chat.messages().iter().all(|m| m.role != MessageRole::Typing));
    }

    #[tokio::test]
    async fn test_http_error_becomes_error_message() {
        let transport = GatedTransport::open(500, "boom");
        let chat = session(transport, quiet_settings());

        let outcome = chat.send_message("Hi").await;
        let SendOutcome::Failed { message, error } = outcome else {
            panic!("expected failure");
        };
        assert_eq!(message.role, MessageRole::Error);
        assert!(message.text.contains("500"));
        assert!(matches!(error, ChatError::HttpStatus { status: 500, .. }));
        assert!(!chat.is_busy());

        // Idle again, next send goes through.
        assert!(!matches!(chat.send_message("again").await, SendOutcome::Ignored));
    }

    #[tokio::test]
    async fn test_events_follow_cycle() {
        let transport = GatedTransport::open(200, r#"{"message":"Hello"}"#);
        let chat = session(transport, quiet_settings());
        let mut rx = chat.subscribe();

        chat.send_message("Hi").await;

        let Ok(TranscriptEvent::Appended(user)) = rx.try_recv() else {
            panic!("expected user message");
        };
        assert_eq!(user.role, MessageRole::User);
        let Ok(TranscriptEvent::Appended(typing)) = rx.try_recv() else {
            panic!("expected placeholder");
        };
        assert_eq!(typing.role, MessageRole::Typing);
        assert_eq!(rx.try_recv(), Ok(TranscriptEvent::Removed(typing.id)));
        let Ok(TranscriptEvent::Appended(reply)) = rx.try_recv() else {
            panic!("expected reply");
        };
        assert_eq!(reply.text, "Hello");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_quick_prompt_sent_like_typed_text() {
        let transport = GatedTransport::open(200, r#"{"message":"We are open 9-5"}"#);
        let chat = session(Arc::clone(&transport), quiet_settings());

        let outcome = chat.send_quick_prompt(3).await;
        assert!(matches!(outcome, SendOutcome::Replied(_)));
        assert_eq!(chat.messages()[0].text, "📍 Locations & Hours");

        let seen = transport.seen.lock().unwrap().clone();
        assert_eq!(
            seen[0],
            WebhookRequest::Post {
                url: Url::parse("https://hooks.example.com/webhook/abc").unwrap(),
                body: serde_json::json!({ "text": "📍 Locations & Hours" }),
            }
        );

        assert_eq!(chat.send_quick_prompt(99).await, SendOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_welcome_and_menu_reset() {
        let transport = GatedTransport::open(200, r#"{"message":"Hello"}"#);
        let settings = WidgetSettings {
            display_mode: DisplayMode::MultiScreen,
            welcome_message: Some("Welcome!".to_string()),
            ..WidgetSettings::default()
        };
        let chat = session(transport, settings);
        assert_eq!(chat.messages().len(), 1);

        chat.send_message("Hi").await;
        assert_eq!(chat.messages().len(), 3);

        assert!(chat.return_to_menu());
        let messages = chat.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "Welcome!");
    }

    #[tokio::test]
    async fn test_inline_mode_has_no_menu() {
        let transport = GatedTransport::open(200, r#"{"message":"Hello"}"#);
        let chat = session(transport, quiet_settings());
        chat.send_message("Hi").await;

        assert!(!chat.return_to_menu());
        assert_eq!(chat.messages().len(), 2);
    }
}
