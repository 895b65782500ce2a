use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kinds of user interaction reported to the telemetry endpoint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum InteractionType {
    Click,
    View,
    Like,
    Bookmark,
    Share,
    Purchase,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::Click => "click",
            InteractionType::View => "view",
            InteractionType::Like => "like",
            InteractionType::Bookmark => "bookmark",
            InteractionType::Share => "share",
            InteractionType::Purchase => "purchase",
        }
    }
}

impl std::fmt::Display for InteractionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InteractionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "click" => Ok(InteractionType::Click),
            "view" => Ok(InteractionType::View),
            "like" => Ok(InteractionType::Like),
            "bookmark" => Ok(InteractionType::Bookmark),
            "share" => Ok(InteractionType::Share),
            "purchase" => Ok(InteractionType::Purchase),
            other => Err(format!("unknown interaction type: {}", other)),
        }
    }
}

/// One write-once telemetry record
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InteractionEvent {
    pub user_id: String,
    pub item_id: String,
    #[serde(rename = "type")]
    pub interaction_type: InteractionType,
    pub dwell_seconds: u64,
    pub context: Map<String, Value>,
    #[serde(rename = "ts")]
    pub emitted_at: DateTime<Utc>,
}

impl InteractionEvent {
    pub fn new(
        user_id: impl Into<String>,
        item_id: impl Into<String>,
        interaction_type: InteractionType,
        context: Map<String, Value>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
            interaction_type,
            dwell_seconds: 0,
            context,
            emitted_at: Utc::now(),
        }
    }

    pub fn with_dwell(mut self, dwell_seconds: u64) -> Self {
        self.dwell_seconds = dwell_seconds;
        self
    }
}
