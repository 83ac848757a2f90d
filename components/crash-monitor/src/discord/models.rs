// Local crates
use crate::store::models::Severity;

// External crates
use serde::{Deserialize, Serialize};

/// Title used on the embed of every incident alert.
pub const ALERT_EMBED_TITLE: &str = "Crash monitor alert";

/// Subset of the guild object returned by `GET /guilds/{id}?with_counts=true`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GuildInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub approximate_member_count: Option<u64>,
    #[serde(default)]
    pub approximate_presence_count: Option<u64>,
}

/// Body of an execute-webhook request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookPayload {
    pub content: String,
    pub embeds: Vec<Embed>,
}

/// A single rich embed attached to a webhook message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
}

impl WebhookPayload {
    /// Alert message for an incident: `[SEVERITY] title` as content, details
    /// in the embed body.
    pub fn incident_alert(severity: Severity, title: &str, details: &str) -> Self {
        Self {
            content: format!("[{}] {}", severity.as_str().to_uppercase(), title),
            embeds: vec![Embed {
                title: ALERT_EMBED_TITLE.to_string(),
                description: details.to_string(),
            }],
        }
    }
}
