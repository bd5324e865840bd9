//! Presentation settings shared by every widget skin.
//!
//! The inline and multi-screen widgets differ only in these values; the
//! exchange logic is the same for both.

use serde::Deserialize;

/// How the widget is laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Single chat pane, no menu.
    #[default]
    Inline,
    /// Menu screen plus chat screen; returning to the menu clears history.
    MultiScreen,
}

impl DisplayMode {
    /// Configuration value for this mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::MultiScreen => "multi_screen",
        }
    }
}

/// Widget texts, prompts and affordances.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WidgetSettings {
    pub display_mode: DisplayMode,
    pub title: String,
    /// Assistant greeting seeded into every fresh conversation.
    pub welcome_message: Option<String>,
    /// Text of the typing placeholder.
    pub typing_text: String,
    /// Reply text when the webhook sends no `message`.
    pub empty_reply_text: String,
    pub quick_prompts: Vec<String>,
    /// Number dialled by the call-now affordance.
    pub phone_number: Option<String>,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            display_mode: DisplayMode::Inline,
            title: "Restore AI Assistant".to_string(),
            welcome_message: Some(
                "Welcome to Restore Podiatry! I'm here to help you learn about our advanced, \
                 non-invasive laser treatments for foot and ankle conditions. Ask me about our \
                 services, schedule an appointment, or get information about your foot health."
                    .to_string(),
            ),
            typing_text: "Thinking...".to_string(),
            empty_reply_text: crate::webhook::DEFAULT_EMPTY_REPLY.to_string(),
            quick_prompts: [
                "🎯 Plantar Fasciitis Treatment Options",
                "🦶 Toenail Fungus Laser Therapy",
                "📅 Schedule an Appointment",
                "📍 Locations & Hours",
                "⚡ Non-Invasive Treatments",
                "💳 Insurance & Pricing",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            phone_number: None,
        }
    }
}

impl WidgetSettings {
    /// Quick prompt by zero-based index.
    #[must_use]
    pub fn quick_prompt(&self, index: usize) -> Option<&str> {
        self.quick_prompts.get(index).map(String::as_str)
    }

    /// `tel:` URI for the call-now affordance.
    ///
    /// Formatting characters are stripped; a leading `+` is kept. Returns
    /// `None` when no dialable number is configured.
    #[must_use]
    pub fn call_link(&self) -> Option<String> {
        let raw = self.phone_number.as_deref()?.trim();
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return None;
        }
        let plus = if raw.starts_with('+') { "+" } else { "" };
        Some(format!("tel:{plus}{digits}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = WidgetSettings::default();
        assert_eq!(settings.display_mode, DisplayMode::Inline);
        assert_eq!(settings.quick_prompts.len(), 6);
        assert_eq!(settings.quick_prompt(2), Some("📅 Schedule an Appointment"));
        assert_eq!(settings.quick_prompt(6), None);
        assert!(settings.call_link().is_none());
    }

    #[test]
    fn test_call_link() {
        let mut settings = WidgetSettings {
            phone_number: Some("(555) 123-4567".to_string()),
            ..WidgetSettings::default()
        };
        assert_eq!(settings.call_link().as_deref(), Some("tel:5551234567"));

        settings.phone_number = Some(" +1 555.123.4567 ".to_string());
        assert_eq!(settings.call_link().as_deref(), Some("tel:+15551234567"));

        settings.phone_number = Some("call us".to_string());
        assert!(settings.call_link().is_none());
    }

    #[test]
    fn test_partial_deserialize() {
        let settings: WidgetSettings =
            serde_json::from_str(r#"{"display_mode":"multi_screen","welcome_message":null}"#)
                .unwrap();
        assert_eq!(settings.display_mode, DisplayMode::MultiScreen);
        assert!(settings.welcome_message.is_none());
        assert_eq!(settings.typing_text, "Thinking...");
    }
}
