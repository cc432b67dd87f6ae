use crate::bot::AppState;
use crate::error::BotError;

/// `/users` — every registered user with their roles.
pub async fn handle_users(state: &AppState, chat_id: i64) -> Result<(), BotError> {
    let users = state.repo.all_users().await?;
    let text = if users.is_empty() {
        "No registered users".to_string()
    } else {
        users
            .iter()
            .map(|u| {
                let roles = u.role_names();
                if roles.is_empty() {
                    u.display_name.clone()
                } else {
                    format!("{}: {}", u.display_name, roles.join(", "))
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    state.messenger.send_notice(chat_id, &text).await?;
    Ok(())
}

/// `/roles` — every role with its member list.
pub async fn handle_roles(state: &AppState, chat_id: i64) -> Result<(), BotError> {
    let roles = state.repo.all_roles().await?;
    if roles.is_empty() {
        state.messenger.send_notice(chat_id, "No roles").await?;
        return Ok(());
    }

    let mut lines = Vec::with_capacity(roles.len());
    for role in roles {
        let mut members = vec![];
        for member_id in role.member_ids() {
            match state.repo.get_user(member_id).await {
                Ok(user) => members.push(user.display_name),
                Err(BotError::NotFound { .. }) => members.push(format!("#{member_id}")),
                Err(e) => return Err(e),
            }
        }
        lines.push(format!("{}: {}", role.name, members.join(", ")));
    }
    state
        .messenger
        .send_notice(chat_id, &lines.join("\n"))
        .await?;
    Ok(())
}

/// `/mkrole @user role` — creates the role on first use.
pub async fn handle_mkrole(
    state: &AppState,
    chat_id: i64,
    username: &str,
    role: &str,
) -> Result<(), BotError> {
    let username = username.trim_start_matches('@');
    let role = role.trim();
    if username.is_empty() || role.is_empty() {
        state
            .messenger
            .send_notice(chat_id, "Usage: /mkrole @user role")
            .await?;
        return Ok(());
    }
    match state.repo.add_role(username, role).await {
        Ok(()) => state.messenger.send_notice(chat_id, "Role assigned.").await?,
        Err(e) if e.is_user_visible() => {
            state.messenger.send_notice(chat_id, &e.to_string()).await?;
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

/// `/rmrole @user role`
pub async fn handle_rmrole(
    state: &AppState,
    chat_id: i64,
    username: &str,
    role: &str,
) -> Result<(), BotError> {
    let username = username.trim_start_matches('@');
    match state.repo.remove_role(username, role.trim()).await {
        Ok(()) => state.messenger.send_notice(chat_id, "Role removed.").await?,
        Err(e) if e.is_user_visible() => {
            state.messenger.send_notice(chat_id, &e.to_string()).await?;
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

/// `/delrole role` — cascade-detaches from every member.
pub async fn handle_delrole(state: &AppState, chat_id: i64, role: &str) -> Result<(), BotError> {
    match state.repo.delete_role(role.trim()).await {
        Ok(()) => state.messenger.send_notice(chat_id, "Role deleted.").await?,
        Err(e) if e.is_user_visible() => {
            state.messenger.send_notice(chat_id, &e.to_string()).await?;
        }
        Err(e) => return Err(e),
    }
    Ok(())
}
