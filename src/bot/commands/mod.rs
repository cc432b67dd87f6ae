pub mod questions;
pub mod registration;
pub mod roles;
pub mod stats;

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Survey bot commands:")]
pub enum Command {
    #[command(description = "Display this help message")]
    Help,
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Register yourself to receive surveys")]
    Join,
    #[command(description = "Show your roles")]
    Status,
    #[command(description = "List registered users")]
    Users,
    #[command(description = "List roles and their members")]
    Roles,
    #[command(description = "Assign a role: /mkrole @user role", parse_with = "split")]
    Mkrole { username: String, role: String },
    #[command(description = "Detach a role: /rmrole @user role", parse_with = "split")]
    Rmrole { username: String, role: String },
    #[command(description = "Delete a role entirely: /delrole role")]
    Delrole { role: String },
    #[command(description = "Create a new survey question")]
    Quest,
    #[command(description = "List questions")]
    Questions,
    #[command(description = "Answer statistics for a question: /queststats id")]
    Queststats { id: i64 },
    #[command(description = "Answers given by a user: /userstats @user")]
    Userstats { username: String },
    #[command(description = "Per-role statistics: /rolestats id role", parse_with = "split")]
    Rolestats { id: i64, role: String },
}

impl Command {
    /// Commands restricted to the admin allow-list.
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Self::Users
                | Self::Roles
                | Self::Mkrole { .. }
                | Self::Rmrole { .. }
                | Self::Delrole { .. }
                | Self::Quest
                | Self::Questions
                | Self::Queststats { .. }
                | Self::Userstats { .. }
                | Self::Rolestats { .. }
        )
    }
}
