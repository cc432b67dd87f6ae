use teloxide::prelude::*;
use tracing::{error, info};

use crate::bot::commands::{self, Command};
use crate::bot::AppState;
use crate::error::BotError;

use super::HandlerResult;

/// Entry point for recognized commands. Failures are logged here; the
/// dispatcher keeps running regardless.
pub async fn command_handler(msg: Message, cmd: Command, state: AppState) -> HandlerResult {
    if let Err(e) = dispatch_command(&msg, cmd, &state).await {
        error!("command in chat {} failed: {}", msg.chat.id, e);
    }
    Ok(())
}

async fn dispatch_command(msg: &Message, cmd: Command, state: &AppState) -> Result<(), BotError> {
    use teloxide::utils::command::BotCommands;

    let chat_id = msg.chat.id.0;

    // Everything except the greeting needs a private chat: surveys and
    // admin traffic go over DM, exactly like registration.
    if chat_id < 0 {
        state
            .messenger
            .send_notice(
                chat_id,
                "This bot distributes surveys over direct messages. \
                 Please open a private chat and use /join.",
            )
            .await?;
        return Ok(());
    }

    let from = msg.from();
    let username = from.and_then(|u| u.username.as_deref());

    if cmd.requires_admin() && !state.repo.is_admin_handle(username) {
        state
            .messenger
            .send_notice(chat_id, "You are not an administrator.")
            .await?;
        return Ok(());
    }

    match cmd {
        Command::Help | Command::Start => {
            state
                .messenger
                .send_notice(chat_id, &Command::descriptions().to_string())
                .await?;
        }
        Command::Join => {
            let display = from
                .map(|u| {
                    commands::registration::display_name(
                        &u.first_name,
                        u.last_name.as_deref(),
                        u.username.as_deref(),
                    )
                })
                .unwrap_or_default();
            commands::registration::handle_join(state, chat_id, username, &display).await?;
            info!("user {} joined", chat_id);
        }
        Command::Status => {
            commands::registration::handle_status(state, chat_id).await?;
        }
        Command::Users => {
            commands::roles::handle_users(state, chat_id).await?;
        }
        Command::Roles => {
            commands::roles::handle_roles(state, chat_id).await?;
        }
        Command::Mkrole { username, role } => {
            commands::roles::handle_mkrole(state, chat_id, &username, &role).await?;
        }
        Command::Rmrole { username, role } => {
            commands::roles::handle_rmrole(state, chat_id, &username, &role).await?;
        }
        Command::Delrole { role } => {
            commands::roles::handle_delrole(state, chat_id, &role).await?;
        }
        Command::Quest => {
            commands::questions::handle_quest(state, chat_id).await?;
        }
        Command::Questions => {
            commands::questions::handle_questions(state, chat_id).await?;
        }
        Command::Queststats { id } => {
            commands::stats::handle_question_stats(state, chat_id, id).await?;
        }
        Command::Userstats { username } => {
            commands::stats::handle_user_stats(state, chat_id, &username).await?;
        }
        Command::Rolestats { id, role } => {
            commands::stats::handle_role_stats(state, chat_id, id, &role).await?;
        }
    }
    Ok(())
}

/// Free-text messages: an active wizard for this chat consumes the reply,
/// otherwise the answer collector gets a chance; anything else is ignored.
pub async fn text_handler(msg: Message, state: AppState) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id.0;
    if chat_id < 0 || text.starts_with('/') {
        return Ok(());
    }

    if let Err(e) = route_text(&state, chat_id, text).await {
        error!("reply from {} failed: {}", chat_id, e);
    }
    Ok(())
}

async fn route_text(state: &AppState, chat_id: i64, text: &str) -> Result<(), BotError> {
    if commands::questions::handle_wizard_reply(state, chat_id, text).await? {
        return Ok(());
    }
    // In a private chat the chat id is the sender's user id.
    state.collector.handle_reply(chat_id, text).await?;
    Ok(())
}
