//! Webhook message payload
//!
//! Wire shape:
//! ```json
//! { "content": "", "embeds": [ { "title": "...", "color": 1127128, "description": "..." } ] }
//! ```

use serde::{Deserialize, Serialize};

/// One visual block of a chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    /// Packed RGB, decimal
    pub color: u32,
    pub description: String,
}

impl Embed {
    pub fn new(title: impl Into<String>, color: u32, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            color,
            description: description.into(),
        }
    }
}

/// Rendered notification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// Plain text above the embeds, serialized as `""` when empty
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub embeds: Vec<Embed>,
}

impl NotificationMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    /// JSON body for the webhook POST
    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
