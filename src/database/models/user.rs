use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered chat user. `roles_json` is a JSON array of role names,
/// kept symmetric with `Role::members_json` by the repository.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub tg_user_id: i64,
    pub username: Option<String>,
    pub display_name: String,
    pub roles_json: String,
    pub admin: bool,
    /// False while the user has an open question awaiting their reply.
    pub answered_last_question: bool,
    /// Nags sent for the currently open question; meaningful only while
    /// `answered_last_question` is false.
    pub reminder_count: i64,
}

impl User {
    pub fn role_names(&self) -> Vec<String> {
        serde_json::from_str(&self.roles_json).unwrap_or_default()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role_names().iter().any(|r| r == role)
    }
}
