//! Chatbridge terminal client
//!
//! Entry point for the terminal skin of the chat widget.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::io::Write;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use chatbridge::config::{AppConfig, LoggingConfig};
use chatbridge::repl::{
    LineBuffer, ReplCommand, help_text, parse_command, render_event, render_message,
    render_prompts,
};
use chatbridge::{ChatSession, WebhookClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    let config = AppConfig::load().context("Configuration error")?;

    // Initialize tracing (M-LOG-STRUCTURED); stderr keeps the transcript clean
    let json = config.logging.json;
    tracing_subscriber::registry()
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_target(true).with_writer(std::io::stderr)))
        .with(LoggingConfig::env_filter())
        .init();

    let client = WebhookClient::from_config(&config.webhook);
    info!(
        name: "chatbridge.config.loaded",
        endpoint = %client.endpoint(),
        timeout_ms = config.webhook.timeout_ms,
        display_mode = config.widget.display_mode.as_str(),
        "Configuration loaded"
    );

    let session = ChatSession::new(client, config.widget);

    run(session).await
}

async fn run(session: ChatSession) -> anyhow::Result<()> {
    let settings = session.settings().clone();

    println!("{}", settings.title);
    println!("{}\n", help_text(&settings));
    for message in session.messages() {
        println!("{}", render_message(&message));
    }

    // Render task: follows the transcript while sends run in the background.
    let mut events = session.subscribe();
    let renderer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(line) = render_event(&event) {
                        println!("{line}");
                    }
                }
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut buffer = LineBuffer::new();

    while let Some(line) = lines.next_line().await? {
        let Some(input) = buffer.push_line(&line) else {
            if buffer.is_continuing() {
                print!("... ");
                std::io::stdout().flush()?;
            }
            continue;
        };

        match parse_command(&input) {
            ReplCommand::Send(text) => spawn_send(&session, Outgoing::Text(text)),
            ReplCommand::QuickPrompt(index) if settings.quick_prompt(index).is_some() => {
                spawn_send(&session, Outgoing::QuickPrompt(index));
            }
            ReplCommand::QuickPrompt(index) => {
                println!("No quick prompt /{}. Try /prompts.", index + 1);
            }
            ReplCommand::ListPrompts => println!("{}", render_prompts(&settings)),
            ReplCommand::Menu => {
                if !session.return_to_menu() {
                    println!("No menu to return to right now.");
                }
            }
            ReplCommand::Call => match settings.call_link() {
                Some(link) => println!("Call us: {link}"),
                None => println!("No phone number configured."),
            },
            ReplCommand::Help => println!("{}", help_text(&settings)),
            ReplCommand::Quit => break,
            ReplCommand::Unknown(cmd) => println!("Unknown command {cmd}. Try /help."),
        }
    }

    renderer.abort();
    Ok(())
}

/// Input bound for the webhook.
enum Outgoing {
    Text(String),
    QuickPrompt(usize),
}

/// Run one send cycle in the background so input stays responsive.
fn spawn_send(session: &ChatSession, outgoing: Outgoing) {
    if session.is_busy() {
        // Same as a disabled send button: the input is dropped, not queued.
        println!("Still waiting for the previous reply.");
        return;
    }
    let session = session.clone();
    tokio::spawn(async move {
        match outgoing {
            Outgoing::Text(text) => session.send_message(&text).await,
            Outgoing::QuickPrompt(index) => session.send_quick_prompt(index).await,
        };
    });
}
