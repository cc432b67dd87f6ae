use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use tracing::debug;

use crate::database::models::{Answer, NewQuestion, Question, Role, User};
use crate::error::BotError;
use crate::utils::datetime::to_storage;

const USER_COLUMNS: &str =
    "tg_user_id, username, display_name, roles_json, admin, answered_last_question, reminder_count";
const QUESTION_COLUMNS: &str = "id, text, for_all, roles_for_json, users_for_json, \
     answer_options_json, optional, send_at, sent, sent_to_json";

/// Sole owner of persisted state. Every caller works on snapshots and must
/// re-fetch before the next write; read-modify-write sequences that touch
/// two rows (role membership) run inside one transaction.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    admin_handles: Vec<String>,
}

impl Repository {
    pub fn new(pool: SqlitePool, admin_handles: Vec<String>) -> Self {
        Self {
            pool,
            admin_handles,
        }
    }

    pub fn is_admin_handle(&self, username: Option<&str>) -> bool {
        username.is_some_and(|u| self.admin_handles.iter().any(|a| a == u))
    }

    // --- users ---

    /// Registers a user. A second call with the same id is a no-op.
    pub async fn create_user(
        &self,
        tg_user_id: i64,
        username: Option<&str>,
        display_name: &str,
    ) -> Result<(), BotError> {
        let admin = self.is_admin_handle(username);
        debug!("registering user {} (admin: {})", tg_user_id, admin);
        sqlx::query(
            "INSERT OR IGNORE INTO users \
             (tg_user_id, username, display_name, roles_json, admin, answered_last_question, reminder_count) \
             VALUES (?, ?, ?, '[]', ?, TRUE, 0)",
        )
        .bind(tg_user_id)
        .bind(username)
        .bind(display_name)
        .bind(admin)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_user(&self, tg_user_id: i64) -> Result<User, BotError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE tg_user_id = ?");
        sqlx::query_as::<_, User>(&query)
            .bind(tg_user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| BotError::not_found("user", tg_user_id.to_string()))
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<User, BotError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| BotError::not_found("user", format!("@{username}")))
    }

    pub async fn all_users(&self) -> Result<Vec<User>, BotError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY tg_user_id");
        Ok(sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Overwrites both answer-tracking fields in one statement.
    pub async fn update_user_answer_state(
        &self,
        tg_user_id: i64,
        answered: bool,
        reminder_count: i64,
    ) -> Result<(), BotError> {
        let result = sqlx::query(
            "UPDATE users SET answered_last_question = ?, reminder_count = ? WHERE tg_user_id = ?",
        )
        .bind(answered)
        .bind(reminder_count)
        .bind(tg_user_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(BotError::not_found("user", tg_user_id.to_string()));
        }
        Ok(())
    }

    /// Adds one nag to the reminder counter, but only while the user is
    /// still unanswered. Returns false when an answer landed first, so
    /// the caller can stop its timer instead of clobbering fresh state.
    pub async fn increment_reminder_count(&self, tg_user_id: i64) -> Result<bool, BotError> {
        let result = sqlx::query(
            "UPDATE users SET reminder_count = reminder_count + 1 \
             WHERE tg_user_id = ? AND answered_last_question = FALSE",
        )
        .bind(tg_user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- roles ---

    pub async fn get_role(&self, name: &str) -> Result<Role, BotError> {
        sqlx::query_as::<_, Role>("SELECT name, members_json FROM roles WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| BotError::not_found("role", name))
    }

    pub async fn all_roles(&self) -> Result<Vec<Role>, BotError> {
        Ok(
            sqlx::query_as::<_, Role>("SELECT name, members_json FROM roles ORDER BY name")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    /// Assigns `role` to the user, creating the role row if this is its
    /// first member. Both sides of the membership are written in one
    /// transaction so they cannot diverge.
    pub async fn add_role(&self, username: &str, role: &str) -> Result<(), BotError> {
        let user = self.get_user_by_username(username).await?;

        let mut tx = self.pool.begin().await?;

        let mut roles = user.role_names();
        if !roles.iter().any(|r| r == role) {
            roles.push(role.to_string());
        }
        sqlx::query("UPDATE users SET roles_json = ? WHERE tg_user_id = ?")
            .bind(to_json(&roles)?)
            .bind(user.tg_user_id)
            .execute(&mut tx)
            .await?;

        let existing =
            sqlx::query_as::<_, Role>("SELECT name, members_json FROM roles WHERE name = ?")
                .bind(role)
                .fetch_optional(&mut tx)
                .await?;
        match existing {
            Some(row) => {
                let mut members = row.member_ids();
                if !members.contains(&user.tg_user_id) {
                    members.push(user.tg_user_id);
                }
                sqlx::query("UPDATE roles SET members_json = ? WHERE name = ?")
                    .bind(to_json(&members)?)
                    .bind(role)
                    .execute(&mut tx)
                    .await?;
            }
            None => {
                sqlx::query("INSERT INTO roles (name, members_json) VALUES (?, ?)")
                    .bind(role)
                    .bind(to_json(&vec![user.tg_user_id])?)
                    .execute(&mut tx)
                    .await?;
            }
        }

        tx.commit().await?;
        debug!("role {} assigned to @{}", role, username);
        Ok(())
    }

    /// Detaches `role` from the user, updating both sides transactionally.
    pub async fn remove_role(&self, username: &str, role: &str) -> Result<(), BotError> {
        let user = self.get_user_by_username(username).await?;

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, Role>("SELECT name, members_json FROM roles WHERE name = ?")
            .bind(role)
            .fetch_optional(&mut tx)
            .await?
            .ok_or_else(|| BotError::not_found("role", role))?;

        let roles: Vec<String> = user.role_names().into_iter().filter(|r| r != role).collect();
        sqlx::query("UPDATE users SET roles_json = ? WHERE tg_user_id = ?")
            .bind(to_json(&roles)?)
            .bind(user.tg_user_id)
            .execute(&mut tx)
            .await?;

        let members: Vec<i64> = row
            .member_ids()
            .into_iter()
            .filter(|id| *id != user.tg_user_id)
            .collect();
        sqlx::query("UPDATE roles SET members_json = ? WHERE name = ?")
            .bind(to_json(&members)?)
            .bind(role)
            .execute(&mut tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Deletes a role, detaching it from every member first.
    pub async fn delete_role(&self, name: &str) -> Result<(), BotError> {
        let role = self.get_role(name).await?;

        let mut tx = self.pool.begin().await?;

        for member_id in role.member_ids() {
            let query = format!("SELECT {USER_COLUMNS} FROM users WHERE tg_user_id = ?");
            let Some(user) = sqlx::query_as::<_, User>(&query)
                .bind(member_id)
                .fetch_optional(&mut tx)
                .await?
            else {
                continue;
            };
            let roles: Vec<String> =
                user.role_names().into_iter().filter(|r| r != name).collect();
            sqlx::query("UPDATE users SET roles_json = ? WHERE tg_user_id = ?")
                .bind(to_json(&roles)?)
                .bind(member_id)
                .execute(&mut tx)
                .await?;
        }

        sqlx::query("DELETE FROM roles WHERE name = ?")
            .bind(name)
            .execute(&mut tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    // --- questions ---

    pub async fn create_question(&self, new: &NewQuestion) -> Result<Question, BotError> {
        let result = sqlx::query(
            "INSERT INTO questions \
             (text, for_all, roles_for_json, users_for_json, answer_options_json, optional, send_at, sent, sent_to_json) \
             VALUES (?, ?, ?, ?, ?, ?, ?, FALSE, '[]')",
        )
        .bind(&new.text)
        .bind(new.for_all)
        .bind(to_json(&new.roles_for)?)
        .bind(to_json(&new.users_for)?)
        .bind(to_json(&new.answer_options)?)
        .bind(new.optional)
        .bind(to_storage(new.send_at))
        .execute(&self.pool)
        .await?;

        self.get_question(result.last_insert_rowid()).await
    }

    pub async fn get_question(&self, id: i64) -> Result<Question, BotError> {
        let query = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?");
        sqlx::query_as::<_, Question>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| BotError::not_found("question", id.to_string()))
    }

    pub async fn all_questions(&self) -> Result<Vec<Question>, BotError> {
        let query = format!("SELECT {QUESTION_COLUMNS} FROM questions ORDER BY send_at DESC, id DESC");
        Ok(sqlx::query_as::<_, Question>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    /// The next question due for delivery: unsent and scheduled at or
    /// before `now`. Deterministic tie-break: earliest schedule, lowest id.
    pub async fn next_due_question(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Option<Question>, BotError> {
        let query = format!(
            "SELECT {QUESTION_COLUMNS} FROM questions \
             WHERE sent = FALSE AND send_at <= ? \
             ORDER BY send_at ASC, id ASC LIMIT 1"
        );
        Ok(sqlx::query_as::<_, Question>(&query)
            .bind(to_storage(now))
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Overwrites both delivery-tracking fields in one statement.
    pub async fn update_delivery_progress(
        &self,
        question_id: i64,
        sent_to: &BTreeSet<i64>,
        sent: bool,
    ) -> Result<(), BotError> {
        let result = sqlx::query("UPDATE questions SET sent_to_json = ?, sent = ? WHERE id = ?")
            .bind(to_json(sent_to)?)
            .bind(sent)
            .bind(question_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BotError::not_found("question", question_id.to_string()));
        }
        Ok(())
    }

    // --- answers ---

    pub async fn record_answer(
        &self,
        user_id: i64,
        question_id: i64,
        text: &str,
    ) -> Result<(), BotError> {
        sqlx::query("INSERT INTO answers (user_id, question_id, text) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(question_id)
            .bind(text)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn answers_for_question(&self, question_id: i64) -> Result<Vec<Answer>, BotError> {
        Ok(sqlx::query_as::<_, Answer>(
            "SELECT id, user_id, question_id, text FROM answers WHERE question_id = ? ORDER BY id",
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn answers_for_user(&self, user_id: i64) -> Result<Vec<Answer>, BotError> {
        Ok(sqlx::query_as::<_, Answer>(
            "SELECT id, user_id, question_id, text FROM answers WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Answers to a question given by members of `role`. Membership is
    /// checked against the current roster, not the roster at answer time.
    pub async fn answers_for_question_role(
        &self,
        question_id: i64,
        role: &str,
    ) -> Result<Vec<Answer>, BotError> {
        let members: BTreeSet<i64> = self.get_role(role).await?.member_ids().into_iter().collect();
        let answers = self.answers_for_question(question_id).await?;
        Ok(answers
            .into_iter()
            .filter(|a| members.contains(&a.user_id))
            .collect())
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, BotError> {
    serde_json::to_string(value).map_err(|e| BotError::Invariant(format!("json encode: {e}")))
}
