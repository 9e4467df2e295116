//! Morning gate message styles.

use serde::{Deserialize, Serialize};

/// Tone of the morning prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageStyle {
    #[default]
    Sassy,
    Chill,
    Meme,
}

/// Prompt copy for the given style.
pub fn morning_message(style: MessageStyle) -> &'static str {
    match style {
        MessageStyle::Sassy => "Scrolling first thing? Go touch some grass.",
        MessageStyle::Chill => "Easy morning. Maybe start with something slower than a feed.",
        MessageStyle::Meme => "POV: you opened the feed before your eyes opened.",
    }
}
