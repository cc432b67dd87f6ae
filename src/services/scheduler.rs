//! The delivery loop: poll for the next due question, resolve its
//! audience against the current roster, deliver to everyone not already
//! reached, and persist progress after every tick so a restart resumes
//! mid-broadcast without re-notifying anyone.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::database::models::Question;
use crate::database::repository::Repository;
use crate::error::BotError;
use crate::services::audience::resolve_audience;
use crate::services::collector::AnswerCollector;

pub struct DeliveryService {
    repo: Repository,
    collector: Arc<AnswerCollector>,
    poll_interval: Duration,
}

impl DeliveryService {
    pub fn new(repo: Repository, collector: Arc<AnswerCollector>, poll_interval: Duration) -> Self {
        Self {
            repo,
            collector,
            poll_interval,
        }
    }

    /// Runs forever. Any tick failure (transport outage, database error)
    /// is logged and the next tick retried; nothing terminates the loop.
    pub async fn run(self) {
        info!(
            "delivery loop started, polling every {:?}",
            self.poll_interval
        );
        loop {
            if let Err(e) = self.tick(Utc::now()).await {
                error!("delivery tick failed: {}", e);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// One delivery pass. A recipient that is mid-answer on an earlier
    /// question is skipped this tick and retried on the next, which keeps
    /// at most one open question per recipient globally. `sent` flips to
    /// true only once a tick finds every resolved recipient delivered and
    /// skips no one.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<(), BotError> {
        let Some(question) = self.repo.next_due_question(now).await? else {
            return Ok(());
        };
        debug!("question {} is due", question.id);

        let roster = self.repo.all_users().await?;
        let audience = resolve_audience(&question, &roster);
        let mut sent_to: BTreeSet<i64> = question.sent_to().into_iter().collect();
        let mut skipped = false;

        for user_id in &audience {
            if sent_to.contains(user_id) {
                continue;
            }
            match self.deliver_to(*user_id, &question).await {
                Ok(true) => {
                    sent_to.insert(*user_id);
                }
                Ok(false) => {
                    // busy with a still-open question; retry next tick
                    skipped = true;
                }
                Err(e) => {
                    // skip this recipient for the tick, retry next tick
                    warn!(
                        "delivery of question {} to {} failed: {}",
                        question.id, user_id, e
                    );
                    skipped = true;
                }
            }
        }

        let sent = !skipped && audience.iter().all(|u| sent_to.contains(u));
        self.repo
            .update_delivery_progress(question.id, &sent_to, sent)
            .await?;
        if sent {
            info!(
                "question {} fully sent to {} recipients",
                question.id,
                sent_to.len()
            );
        }
        Ok(())
    }

    /// Delivers to one recipient. Returns false when the recipient still
    /// has an open question. The recipient's row is re-fetched here: any
    /// earlier snapshot may be stale by the time we write.
    async fn deliver_to(&self, user_id: i64, question: &Question) -> Result<bool, BotError> {
        let user = self.repo.get_user(user_id).await?;
        if !user.answered_last_question {
            return Ok(false);
        }
        self.collector.present(user_id, question).await?;
        self.repo.update_user_answer_state(user_id, false, 0).await?;
        Ok(true)
    }
}
