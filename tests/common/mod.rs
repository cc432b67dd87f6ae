#![allow(dead_code, clippy::unwrap_used)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;
use survey_bot::database::connection::DatabaseManager;
use survey_bot::database::repository::Repository;
use survey_bot::error::BotError;
use survey_bot::messenger::Messenger;
use tempfile::{tempdir, TempDir};

pub async fn setup_repo(admins: &[&str]) -> (Repository, TempDir) {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let db_url = format!("sqlite:{}", db_path.display());

    let db = DatabaseManager::new(&db_url).await.unwrap();
    db.run_migrations().await.unwrap();
    let repo = Repository::new(
        db.pool.clone(),
        admins.iter().map(|s| s.to_string()).collect(),
    );
    (repo, dir)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub recipient: i64,
    pub text: String,
    pub options: Vec<String>,
    pub is_prompt: bool,
}

/// Messenger double that records every send, can simulate a transport
/// outage for chosen recipients, and can stall notices in flight.
#[derive(Default)]
pub struct RecordingMessenger {
    pub sent: Mutex<Vec<Sent>>,
    pub failing: Mutex<HashSet<i64>>,
    pub notice_delay: Mutex<Duration>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every following notice sleeps this long before being recorded.
    pub fn delay_notices(&self, delay: Duration) {
        *self.notice_delay.lock().unwrap() = delay;
    }

    pub fn fail_recipient(&self, recipient: i64) {
        self.failing.lock().unwrap().insert(recipient);
    }

    pub fn restore_recipient(&self, recipient: i64) {
        self.failing.lock().unwrap().remove(&recipient);
    }

    pub fn sent_to(&self, recipient: i64) -> Vec<Sent> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.recipient == recipient)
            .cloned()
            .collect()
    }

    pub fn prompts_to(&self, recipient: i64) -> Vec<Sent> {
        self.sent_to(recipient)
            .into_iter()
            .filter(|s| s.is_prompt)
            .collect()
    }

    pub fn notices_to(&self, recipient: i64) -> Vec<Sent> {
        self.sent_to(recipient)
            .into_iter()
            .filter(|s| !s.is_prompt)
            .collect()
    }

    fn record(&self, message: Sent) -> Result<(), BotError> {
        if self.failing.lock().unwrap().contains(&message.recipient) {
            return Err(BotError::Transport("simulated outage".to_string()));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_prompt(
        &self,
        recipient: i64,
        text: &str,
        options: &[String],
    ) -> Result<(), BotError> {
        self.record(Sent {
            recipient,
            text: text.to_string(),
            options: options.to_vec(),
            is_prompt: true,
        })
    }

    async fn send_notice(&self, recipient: i64, text: &str) -> Result<(), BotError> {
        let delay = *self.notice_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.record(Sent {
            recipient,
            text: text.to_string(),
            options: vec![],
            is_prompt: false,
        })
    }
}
