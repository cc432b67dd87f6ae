use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One recorded reply. Append-only; never mutated or deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub user_id: i64,
    pub question_id: i64,
    pub text: String,
}
