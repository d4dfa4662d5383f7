use anyhow::{bail, Context, Result};

/// Runtime configuration, read once at startup and shared immutably.
#[derive(Debug, Clone)]
pub struct Config {
    /// The bot's own account number. Messages from this number carry the
    /// `SelfOperator` permission.
    pub operating_number: String,
    /// Account number granted `BotOwner`, if configured.
    pub owner_number: Option<String>,
    /// Leading substring marking a message as a command invocation.
    pub command_prefix: String,
    /// Log verbosity, as a tracing env-filter directive for the embedder.
    pub log_level: String,
    /// Drop messages sent by the bot's own account before dispatch.
    pub ignore_self_messages: bool,
}

impl Config {
    /// Load configuration from the process environment, honoring a `.env` file.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let operating_number = lookup("OPERATING_NUMBER")
            .filter(|v| !v.is_empty())
            .context("OPERATING_NUMBER is not set")?;

        let owner_number = lookup("OWNER_NUMBER").filter(|v| !v.is_empty());

        let command_prefix = lookup("COMMAND_PREFIX").unwrap_or_else(|| "!".to_string());
        if command_prefix.is_empty() {
            bail!("COMMAND_PREFIX must not be empty");
        }

        let log_level = lookup("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "info".to_string());

        let ignore_self_messages = lookup("IGNORE_SELF_MESSAGES")
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        Ok(Self {
            operating_number,
            owner_number,
            command_prefix,
            log_level,
            ignore_self_messages,
        })
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let vars: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |key| vars.get(key).map(|v| v.to_string())
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[("OPERATING_NUMBER", "15551230000")]))
            .expect("config should load");

        assert_eq!(config.operating_number, "15551230000");
        assert_eq!(config.owner_number, None);
        assert_eq!(config.command_prefix, "!");
        assert_eq!(config.log_level, "info");
        assert!(!config.ignore_self_messages);
    }

    #[test]
    fn test_missing_operating_number_fails() {
        let result = Config::from_lookup(lookup_from(&[("OWNER_NUMBER", "1")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_all_variables() {
        let config = Config::from_lookup(lookup_from(&[
            ("OPERATING_NUMBER", "100"),
            ("OWNER_NUMBER", "200"),
            ("COMMAND_PREFIX", "?"),
            ("LOG_LEVEL", "debug"),
            ("IGNORE_SELF_MESSAGES", "true"),
        ]))
        .expect("config should load");

        assert_eq!(config.owner_number.as_deref(), Some("200"));
        assert_eq!(config.command_prefix, "?");
        assert_eq!(config.log_level, "debug");
        assert!(config.ignore_self_messages);
    }

    #[test]
    fn test_bool_parsing() {
        assert!(parse_bool("true"));
        assert!(parse_bool("True"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool(""));
    }
}
