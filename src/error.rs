//! Error taxonomy for the bot.
//!
//! [`BotError::NotFound`] and [`BotError::Format`] carry messages fit to
//! show the operator; everything else is logged and retried or dropped by
//! the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },

    /// Operator input that could not be parsed (schedule strings and the
    /// like).
    #[error("{0}")]
    Format(String),

    /// A send or receive against the chat transport failed. Skipped for
    /// the current tick and retried on the next one.
    #[error("transport error: {0}")]
    Transport(String),

    /// Persisted state that should be impossible: broken JSON columns,
    /// timestamps that fail to parse back.
    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl BotError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Whether the message is safe and useful to relay to the operator
    /// instead of only logging it.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Format(_))
    }
}

impl From<teloxide::RequestError> for BotError {
    fn from(err: teloxide::RequestError) -> Self {
        Self::Transport(err.to_string())
    }
}
