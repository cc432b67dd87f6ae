use anyhow::{anyhow, Result};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub database_url: String,
    /// Telegram usernames (without `@`) allowed to manage roles and surveys.
    pub admin_handles: Vec<String>,
    /// How often the delivery loop checks for due questions.
    pub poll_interval: Duration,
    /// How long a recipient may stay silent before a reminder nag.
    pub reminder_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        if token.trim().is_empty() {
            return Err(anyhow!("TELEGRAM_BOT_TOKEN must be set"));
        }

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:./data/survey.db".to_string());
        let database_url = if database_url.trim().is_empty() {
            "sqlite:./data/survey.db".to_string()
        } else {
            database_url
        };

        let admin_handles: Vec<String> = env::var("ADMIN_USERNAMES")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().trim_start_matches('@').to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let poll_interval = parse_secs("POLL_INTERVAL_SECS", 10)?;
        let reminder_interval = parse_secs("REMINDER_INTERVAL_SECS", 1800)?;

        Ok(Config {
            telegram_bot_token: token,
            database_url,
            admin_handles,
            poll_interval,
            reminder_interval,
        })
    }
}

fn parse_secs(var: &str, default: u64) -> Result<Duration> {
    let secs: u64 = match env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|_| anyhow!("Invalid {var}"))?,
        Err(_) => default,
    };
    if secs == 0 {
        return Err(anyhow!("{var} must be positive"));
    }
    Ok(Duration::from_secs(secs))
}
