use chrono::Utc;

use crate::bot::wizard::{StepResult, Wizard};
use crate::bot::AppState;
use crate::error::BotError;
use crate::utils::datetime::format_datetime;

/// `/quest` — starts (or restarts) the draft wizard for this operator.
pub async fn handle_quest(state: &AppState, chat_id: i64) -> Result<(), BotError> {
    let wizard = Wizard::new();
    let first = wizard.state();
    state.lock_wizards().insert(chat_id, wizard);
    state
        .messenger
        .send_prompt(chat_id, first.prompt(), &first.buttons())
        .await?;
    Ok(())
}

/// Feeds one operator reply into their in-progress wizard. Returns false
/// when the chat has no active wizard.
pub async fn handle_wizard_reply(
    state: &AppState,
    chat_id: i64,
    text: &str,
) -> Result<bool, BotError> {
    let Some(mut wizard) = state.lock_wizards().remove(&chat_id) else {
        return Ok(false);
    };

    let roster = state.repo.all_users().await?;
    match wizard.advance(text, &roster, Utc::now()) {
        StepResult::Prompt { notices } => {
            for notice in notices {
                state.messenger.send_notice(chat_id, &notice).await?;
            }
            let next = wizard.state();
            state
                .messenger
                .send_prompt(chat_id, next.prompt(), &next.buttons())
                .await?;
            state.lock_wizards().insert(chat_id, wizard);
        }
        StepResult::Cancelled => {
            state
                .messenger
                .send_prompt(chat_id, "Question draft cancelled.", &[])
                .await?;
        }
        StepResult::Completed(draft) => {
            let question = state.repo.create_question(&draft).await?;
            state
                .messenger
                .send_prompt(
                    chat_id,
                    &format!(
                        "Question #{} scheduled for {}.",
                        question.id,
                        format_datetime(&draft.send_at)
                    ),
                    &[],
                )
                .await?;
        }
    }
    Ok(true)
}

/// `/questions` — newest first, with delivery state.
pub async fn handle_questions(state: &AppState, chat_id: i64) -> Result<(), BotError> {
    let questions = state.repo.all_questions().await?;
    let text = if questions.is_empty() {
        "No questions yet".to_string()
    } else {
        let mut lines = Vec::with_capacity(questions.len());
        for q in questions {
            let when = q
                .scheduled_at()
                .map(|dt| format_datetime(&dt))
                .unwrap_or_else(|_| q.send_at.clone());
            let status = if q.sent { "sent" } else { "scheduled" };
            lines.push(format!("#{} [{} {}] {}", q.id, status, when, q.text));
        }
        lines.join("\n")
    };
    state.messenger.send_notice(chat_id, &text).await?;
    Ok(())
}
