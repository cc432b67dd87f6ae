//! Per-recipient answer collection: present a question, route the next
//! reply, validate it against the allowed options, and nag silent
//! recipients on a timer. Timers soft-cancel: they re-read persisted state
//! on every wake and stop as soon as the recipient has answered or a newer
//! prompt superseded them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::database::models::Question;
use crate::database::repository::Repository;
use crate::error::BotError;
use crate::messenger::Messenger;

/// Reply token that resolves an optional question without an answer.
pub const SKIP: &str = "Skip";

/// Nags sent before the collector gives up and treats silence as resolved.
pub const MAX_REMINDERS: i64 = 2;

const REMINDER_TEXT: &str = "A question is still waiting for your answer.";

#[derive(Debug, Clone, Copy)]
struct Pending {
    question_id: i64,
    generation: u64,
}

pub struct AnswerCollector {
    repo: Repository,
    messenger: Arc<dyn Messenger>,
    reminder_interval: Duration,
    /// recipient -> the question currently awaiting their reply. This is
    /// the in-memory continuation for the next inbound message; persisted
    /// state (`answered_last_question`) is the source of truth.
    pending: Mutex<HashMap<i64, Pending>>,
    generations: AtomicU64,
}

impl AnswerCollector {
    pub fn new(
        repo: Repository,
        messenger: Arc<dyn Messenger>,
        reminder_interval: Duration,
    ) -> Self {
        Self {
            repo,
            messenger,
            reminder_interval,
            pending: Mutex::new(HashMap::new()),
            generations: AtomicU64::new(0),
        }
    }

    /// Sends the question to one recipient and arms a reminder timer.
    /// A repeated `present` for the same recipient supersedes the previous
    /// timer: the old one finds its generation stale on wake and no-ops.
    pub async fn present(self: &Arc<Self>, user_id: i64, question: &Question) -> Result<(), BotError> {
        let mut options = question.answer_options();
        if question.optional {
            options.push(SKIP.to_string());
        }
        self.messenger
            .send_prompt(user_id, &question.text, &options)
            .await?;

        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        self.lock_pending().insert(
            user_id,
            Pending {
                question_id: question.id,
                generation,
            },
        );

        let collector = Arc::clone(self);
        tokio::spawn(async move {
            collector.reminder_loop(user_id, generation).await;
        });

        debug!("presented question {} to {}", question.id, user_id);
        Ok(())
    }

    /// Routes an inbound free-text message. Returns false when the sender
    /// has no open question, so the caller can fall through.
    pub async fn handle_reply(self: &Arc<Self>, user_id: i64, text: &str) -> Result<bool, BotError> {
        let Some(pending) = self.lock_pending().get(&user_id).copied() else {
            return Ok(false);
        };
        let question = self.repo.get_question(pending.question_id).await?;
        let text = text.trim();

        if question.optional && text == SKIP {
            self.lock_pending().remove(&user_id);
            self.repo.update_user_answer_state(user_id, true, 0).await?;
            self.messenger
                .send_prompt(user_id, "Okay, skipping this one.", &[])
                .await?;
            return Ok(true);
        }

        let options = question.answer_options();
        if !options.is_empty() && !options.iter().any(|o| o == text) {
            self.messenger
                .send_notice(user_id, "Please pick one of the offered answers.")
                .await?;
            self.present(user_id, &question).await?;
            return Ok(true);
        }

        self.repo.record_answer(user_id, question.id, text).await?;
        self.repo.update_user_answer_state(user_id, true, 0).await?;
        self.lock_pending().remove(&user_id);
        self.messenger
            .send_prompt(user_id, "Answer recorded, thank you!", &[])
            .await?;
        info!("recorded answer from {} to question {}", user_id, question.id);
        Ok(true)
    }

    /// True while `user_id` has an open question registered here.
    pub fn has_pending(&self, user_id: i64) -> bool {
        self.lock_pending().contains_key(&user_id)
    }

    async fn reminder_loop(self: Arc<Self>, user_id: i64, generation: u64) {
        loop {
            tokio::time::sleep(self.reminder_interval).await;
            match self.remind_once(user_id, generation).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    // transient failure: keep the timer alive and retry
                    // on the next wake
                    warn!("reminder for {} failed: {}", user_id, e);
                }
            }
        }
    }

    /// One reminder wake. Returns whether the timer should stay alive.
    async fn remind_once(&self, user_id: i64, generation: u64) -> Result<bool, BotError> {
        match self.lock_pending().get(&user_id) {
            Some(p) if p.generation == generation => {}
            // superseded by a newer prompt, or already resolved
            _ => return Ok(false),
        }

        let user = self.repo.get_user(user_id).await?;
        if user.answered_last_question {
            return Ok(false);
        }

        if user.reminder_count >= MAX_REMINDERS {
            // give up: treat silence as resolved so later questions can
            // still reach this recipient
            self.repo.update_user_answer_state(user_id, true, 0).await?;
            self.lock_pending().remove(&user_id);
            info!("giving up on {} after {} reminders", user_id, MAX_REMINDERS);
            return Ok(false);
        }

        self.messenger.send_notice(user_id, REMINDER_TEXT).await?;
        // the answer may have landed while the notice was in flight; the
        // increment only touches a row that is still unanswered, so a
        // concurrent reply is never overwritten
        if !self.repo.increment_reminder_count(user_id).await? {
            return Ok(false);
        }
        Ok(true)
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<i64, Pending>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
