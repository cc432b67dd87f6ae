use crate::bot::AppState;
use crate::error::BotError;
use crate::services::stats;

/// `/queststats id` — delivery and answer totals for one question.
pub async fn handle_question_stats(
    state: &AppState,
    chat_id: i64,
    question_id: i64,
) -> Result<(), BotError> {
    let summary = match stats::question_summary(&state.repo, question_id).await {
        Ok(s) => s,
        Err(e) if e.is_user_visible() => {
            state.messenger.send_notice(chat_id, &e.to_string()).await?;
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let mut text = format!(
        "#{} {}\nDelivered to {} of {} recipients, {} answers",
        summary.question.id,
        summary.question.text,
        summary.delivered,
        summary.audience_size,
        summary.total_answers,
    );
    for (option, count) in &summary.option_counts {
        text.push_str(&format!("\n  {option}: {count}"));
    }
    state.messenger.send_notice(chat_id, &text).await?;
    Ok(())
}

/// `/userstats @user` — every answer a user has given.
pub async fn handle_user_stats(
    state: &AppState,
    chat_id: i64,
    username: &str,
) -> Result<(), BotError> {
    let username = username.trim_start_matches('@');
    let user = match state.repo.get_user_by_username(username).await {
        Ok(u) => u,
        Err(e) if e.is_user_visible() => {
            state.messenger.send_notice(chat_id, &e.to_string()).await?;
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let answers = stats::user_answers(&state.repo, user.tg_user_id).await?;
    let text = if answers.is_empty() {
        format!("{} has not answered anything yet", user.display_name)
    } else {
        let mut lines = vec![format!("Answers from {}:", user.display_name)];
        for (question_text, answer) in answers {
            lines.push(format!("{question_text} — {}", answer.text));
        }
        lines.join("\n")
    };
    state.messenger.send_notice(chat_id, &text).await?;
    Ok(())
}

/// `/rolestats id role` — answers to a question from one role's members.
pub async fn handle_role_stats(
    state: &AppState,
    chat_id: i64,
    question_id: i64,
    role: &str,
) -> Result<(), BotError> {
    let summary = match stats::role_summary(&state.repo, question_id, role.trim()).await {
        Ok(s) => s,
        Err(e) if e.is_user_visible() => {
            state.messenger.send_notice(chat_id, &e.to_string()).await?;
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let mut text = format!(
        "#{} {} — {} answers from role {}",
        summary.question.id, summary.question.text, summary.total_answers, summary.role,
    );
    for (option, count) in &summary.option_counts {
        text.push_str(&format!("\n  {option}: {count}"));
    }
    state.messenger.send_notice(chat_id, &text).await?;
    Ok(())
}
