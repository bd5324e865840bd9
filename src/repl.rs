//! Terminal front-end: input parsing and transcript rendering.
//!
//! Enter submits the current line. A line ending in `\` continues onto the
//! next one, the terminal stand-in for Shift+Enter. Lines starting with `/`
//! are commands.

use crate::session::{ChatMessage, MessageRole, TranscriptEvent};
use crate::widget::{DisplayMode, WidgetSettings};

/// What the user asked for with one submitted input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Free text for the webhook.
    Send(String),
    /// Zero-based quick prompt index.
    QuickPrompt(usize),
    ListPrompts,
    Menu,
    Call,
    Help,
    Quit,
    /// Unrecognised slash command.
    Unknown(String),
}

/// Parse one submitted input.
#[must_use]
pub fn parse_command(input: &str) -> ReplCommand {
    let trimmed = input.trim();
    let Some(cmd) = trimmed.strip_prefix('/') else {
        return ReplCommand::Send(input.to_string());
    };

    match cmd.to_lowercase().as_str() {
        "prompts" | "p" => ReplCommand::ListPrompts,
        "menu" | "m" => ReplCommand::Menu,
        "call" | "c" => ReplCommand::Call,
        "help" | "h" | "?" => ReplCommand::Help,
        "quit" | "q" | "exit" => ReplCommand::Quit,
        other => match other.parse::<usize>() {
            Ok(n) if n >= 1 => ReplCommand::QuickPrompt(n - 1),
            _ => ReplCommand::Unknown(trimmed.to_string()),
        },
    }
}

/// Accumulates continued lines into one submission.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw line; returns the full input once it is submitted.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim_end_matches(['\r', '\n']);
        if let Some(head) = line.strip_suffix('\\') {
            self.pending.push_str(head);
            self.pending.push('\n');
            return None;
        }
        self.pending.push_str(line);
        Some(std::mem::take(&mut self.pending))
    }

    /// Whether a continued line is waiting for more input.
    #[must_use]
    pub fn is_continuing(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Render one transcript message for the terminal.
#[must_use]
pub fn render_message(message: &ChatMessage) -> String {
    let label = match message.role {
        MessageRole::User => "you",
        MessageRole::Assistant => "assistant",
        MessageRole::Typing => "…",
        MessageRole::Error => "error",
    };
    let indent = " ".repeat(label.len() + 3);
    let body = message.text.lines().collect::<Vec<_>>().join(&format!("\n{indent}"));
    format!("{label} › {body}")
}

/// Render a transcript event, or `None` if it has no visible output.
#[must_use]
pub fn render_event(event: &TranscriptEvent) -> Option<String> {
    match event {
        TranscriptEvent::Appended(message) => Some(render_message(message)),
        TranscriptEvent::Removed(_) => None,
        TranscriptEvent::Cleared => Some("── main menu ──".to_string()),
    }
}

/// Numbered quick prompt list.
#[must_use]
pub fn render_prompts(settings: &WidgetSettings) -> String {
    settings
        .quick_prompts
        .iter()
        .enumerate()
        .map(|(i, p)| format!("  /{} {p}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Help text for the current settings.
#[must_use]
pub fn help_text(settings: &WidgetSettings) -> String {
    let mut lines = vec![
        "Enter sends, end a line with \\ to continue it.".to_string(),
        "  /prompts     list quick prompts (/1, /2, ... to send one)".to_string(),
    ];
    if settings.display_mode == DisplayMode::MultiScreen {
        lines.push("  /menu        back to the main menu (clears the chat)".to_string());
    }
    if settings.call_link().is_some() {
        lines.push("  /call        show the call-now link".to_string());
    }
    lines.push("  /quit        leave".to_string());
    lines.join("\n")
}
