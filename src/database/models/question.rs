use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::BotError;
use crate::utils::datetime::from_storage;

/// A scheduled survey question. Immutable after creation except for the
/// two delivery-tracking fields (`sent`, `sent_to_json`), which only the
/// delivery loop touches.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub text: String,
    pub for_all: bool,
    pub roles_for_json: String,
    pub users_for_json: String,
    /// Empty array means a free-text question.
    pub answer_options_json: String,
    pub optional: bool,
    /// RFC3339 UTC.
    pub send_at: String,
    pub sent: bool,
    /// User ids already delivered to. Grows monotonically, never shrinks.
    pub sent_to_json: String,
}

impl Question {
    pub fn roles_for(&self) -> Vec<String> {
        serde_json::from_str(&self.roles_for_json).unwrap_or_default()
    }

    pub fn users_for(&self) -> Vec<i64> {
        serde_json::from_str(&self.users_for_json).unwrap_or_default()
    }

    pub fn answer_options(&self) -> Vec<String> {
        serde_json::from_str(&self.answer_options_json).unwrap_or_default()
    }

    pub fn sent_to(&self) -> Vec<i64> {
        serde_json::from_str(&self.sent_to_json).unwrap_or_default()
    }

    pub fn scheduled_at(&self) -> Result<DateTime<Utc>, BotError> {
        from_storage(&self.send_at)
    }
}

/// A fully specified question ready to be persisted by the repository,
/// which assigns the id and the delivery-tracking defaults.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub text: String,
    pub for_all: bool,
    pub roles_for: Vec<String>,
    pub users_for: Vec<i64>,
    pub answer_options: Vec<String>,
    pub optional: bool,
    pub send_at: DateTime<Utc>,
}
