//! Read-only reducers over recorded answers, consumed by the stats
//! command handlers.

use crate::database::models::{Answer, Question};
use crate::database::repository::Repository;
use crate::error::BotError;
use crate::services::audience::resolve_audience;

pub struct QuestionSummary {
    pub question: Question,
    pub total_answers: usize,
    /// Per-option tallies, in option order; empty for free-text questions.
    pub option_counts: Vec<(String, usize)>,
    pub audience_size: usize,
    pub delivered: usize,
}

pub async fn question_summary(
    repo: &Repository,
    question_id: i64,
) -> Result<QuestionSummary, BotError> {
    let question = repo.get_question(question_id).await?;
    let answers = repo.answers_for_question(question_id).await?;
    let roster = repo.all_users().await?;
    let audience = resolve_audience(&question, &roster);

    let option_counts = tally_options(&question, &answers);

    Ok(QuestionSummary {
        delivered: question.sent_to().len(),
        audience_size: audience.len(),
        total_answers: answers.len(),
        option_counts,
        question,
    })
}

pub struct RoleSummary {
    pub question: Question,
    pub role: String,
    pub total_answers: usize,
    pub option_counts: Vec<(String, usize)>,
}

pub async fn role_summary(
    repo: &Repository,
    question_id: i64,
    role: &str,
) -> Result<RoleSummary, BotError> {
    let question = repo.get_question(question_id).await?;
    let answers = repo.answers_for_question_role(question_id, role).await?;

    let option_counts = tally_options(&question, &answers);

    Ok(RoleSummary {
        total_answers: answers.len(),
        option_counts,
        role: role.to_string(),
        question,
    })
}

/// Every answer a user has given, each paired with its question text.
pub async fn user_answers(
    repo: &Repository,
    user_id: i64,
) -> Result<Vec<(String, Answer)>, BotError> {
    let answers = repo.answers_for_user(user_id).await?;
    let mut out = Vec::with_capacity(answers.len());
    for answer in answers {
        let text = match repo.get_question(answer.question_id).await {
            Ok(q) => q.text,
            Err(BotError::NotFound { .. }) => format!("question #{}", answer.question_id),
            Err(e) => return Err(e),
        };
        out.push((text, answer));
    }
    Ok(out)
}

fn tally_options(question: &Question, answers: &[Answer]) -> Vec<(String, usize)> {
    question
        .answer_options()
        .into_iter()
        .map(|option| {
            let count = answers.iter().filter(|a| a.text == option).count();
            (option, count)
        })
        .collect()
}
