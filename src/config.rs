use crate::widget::{DisplayMode, WidgetSettings};
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Config file picked up from the working directory when none is given.
const DEFAULT_CONFIG_FILE: &str = "chatbridge.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Webhook endpoint URL
    #[arg(long, env = "WEBHOOK_URL")]
    pub endpoint: Option<String>,

    /// Per-attempt timeout in milliseconds
    #[arg(long, env = "WEBHOOK_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Widget layout
    #[arg(long, value_enum)]
    pub display_mode: Option<DisplayMode>,

    /// Number for the call-now link
    #[arg(long, env = "PHONE_NUMBER")]
    pub phone: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON")]
    pub log_json: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub widget: WidgetSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookConfig {
    pub endpoint: Url,
    pub timeout_ms: u64,
}

impl WebhookConfig {
    /// Per-attempt deadline.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub json: bool,
}

/// Level used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_LOG_LEVEL: &str = "info";

impl LoggingConfig {
    /// Log filter from `RUST_LOG`, defaulting to [`DEFAULT_LOG_LEVEL`].
    #[must_use]
    pub fn env_filter() -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("webhook.timeout_ms", 15_000)?
            .set_default("logging.json", false)?;

        // Explicit file must exist; the working-directory default is optional.
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path).required(true));
        } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
            builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false));
        }

        // E.g. CHATBRIDGE__WEBHOOK__TIMEOUT_MS=5000
        builder = builder.add_source(
            Environment::with_prefix("CHATBRIDGE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        // Flags (and their clap env fallbacks) win over everything else.
        if let Some(endpoint) = cli.endpoint {
            builder = builder.set_override("webhook.endpoint", endpoint)?;
        }
        if let Some(timeout) = cli.timeout_ms {
            builder = builder.set_override("webhook.timeout_ms", timeout)?;
        }
        if let Some(mode) = cli.display_mode {
            builder = builder.set_override("widget.display_mode", mode.as_str())?;
        }
        if let Some(phone) = cli.phone {
            builder = builder.set_override("widget.phone_number", phone)?;
        }
        if let Some(json) = cli.log_json {
            builder = builder.set_override("logging.json", json)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        let endpoint = &self.webhook.endpoint;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(config::ConfigError::Message(format!(
                "webhook.endpoint must be http(s), got {}",
                endpoint.scheme()
            )));
        }
        if self.webhook.timeout_ms == 0 {
            return Err(config::ConfigError::Message(
                "webhook.timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
