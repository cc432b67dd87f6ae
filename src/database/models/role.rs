use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A named group of users. `members_json` is a JSON array of Telegram user
/// ids, kept symmetric with `User::roles_json` by the repository.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub members_json: String,
}

impl Role {
    pub fn member_ids(&self) -> Vec<i64> {
        serde_json::from_str(&self.members_json).unwrap_or_default()
    }
}
