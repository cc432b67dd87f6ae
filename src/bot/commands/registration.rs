use crate::bot::AppState;
use crate::error::BotError;

/// `/join` — idempotent self-registration.
pub async fn handle_join(
    state: &AppState,
    chat_id: i64,
    username: Option<&str>,
    display_name: &str,
) -> Result<(), BotError> {
    state
        .repo
        .create_user(chat_id, username, display_name)
        .await?;
    state
        .messenger
        .send_notice(chat_id, "You are registered and will receive surveys.")
        .await?;
    Ok(())
}

/// `/status` — show the caller's roles and admin flag.
pub async fn handle_status(state: &AppState, chat_id: i64) -> Result<(), BotError> {
    let text = match state.repo.get_user(chat_id).await {
        Ok(user) => {
            let roles = user.role_names();
            let roles_part = if roles.is_empty() {
                "No roles".to_string()
            } else {
                format!("Roles: {}", roles.join(", "))
            };
            if user.admin {
                format!("{roles_part}; administrator")
            } else {
                roles_part
            }
        }
        Err(BotError::NotFound { .. }) => "You are not registered yet. Use /join.".to_string(),
        Err(e) => return Err(e),
    };
    state.messenger.send_notice(chat_id, &text).await?;
    Ok(())
}

/// Display string shown in rosters and stats: "First Last (@username)".
pub fn display_name(first: &str, last: Option<&str>, username: Option<&str>) -> String {
    let mut name = first.to_string();
    if let Some(last) = last {
        name.push(' ');
        name.push_str(last);
    }
    if let Some(username) = username {
        name.push_str(&format!(" (@{username})"));
    }
    name
}
