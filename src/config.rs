use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use teloxide::types::ChatId;

pub const BOT_TOKEN: &str = "BOT_TOKEN";
pub const TS_APIKEY: &str = "TS_APIKEY";
pub const TS_URL: &str = "TS_URL";
pub const ALLOWED_GROUPS: &str = "ALLOWED_GROUPS";
pub const TS_SERVER_ID: &str = "TS_SERVER_ID";
pub const LIVE_INTERVAL_SECS: &str = "LIVE_INTERVAL_SECS";
pub const LIVE_FIRST_DELAY_SECS: &str = "LIVE_FIRST_DELAY_SECS";
pub const LOG_CHAT_ID: &str = "LOG_CHAT_ID";
pub const LOG_DIR: &str = "LOG_DIR";

const DEFAULT_SERVER_ID: u32 = 1;
const DEFAULT_LIVE_INTERVAL_SECS: u64 = 60;
const DEFAULT_LIVE_FIRST_DELAY_SECS: u64 = 10;

/// Errors that can occur when reading configuration from the environment.
#[derive(Debug)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    Missing(&'static str),
    /// A variable is set but its value is unusable.
    Invalid { var: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(var) => write!(f, "environment variable {var} is required"),
            Self::Invalid { var, reason } => write!(f, "environment variable {var} is invalid: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

pub struct Config {
    pub bot_token: String,
    pub ts_api_key: String,
    /// WebQuery base URL without trailing slash.
    pub ts_url: String,
    pub ts_server_id: u32,
    pub allowed_groups: HashSet<ChatId>,
    pub live_interval: Duration,
    pub live_first_delay: Duration,
    /// Chat that receives WARN/ERROR log lines.
    pub log_chat_id: Option<ChatId>,
    pub log_dir: Option<PathBuf>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("ts_api_key", &"<redacted>")
            .field("ts_url", &self.ts_url)
            .field("ts_server_id", &self.ts_server_id)
            .field("allowed_groups", &self.allowed_groups)
            .field("live_interval", &self.live_interval)
            .field("live_first_delay", &self.live_first_delay)
            .field("log_chat_id", &self.log_chat_id)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &'static str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |var: &'static str| get(var).ok_or(ConfigError::Missing(var));

        let bot_token = require(BOT_TOKEN)?;
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        match bot_token.split_once(':') {
            Some((id, secret)) if id.parse::<u64>().is_ok() && !secret.is_empty() => {}
            _ => {
                return Err(ConfigError::Invalid {
                    var: BOT_TOKEN,
                    reason: "expected format 123456789:ABCdefGHI...".into(),
                });
            }
        }

        let ts_api_key = require(TS_APIKEY)?;
        let ts_url = parse_base_url(&require(TS_URL)?)?;
        let allowed_groups = parse_groups(&require(ALLOWED_GROUPS)?)?;

        let ts_server_id = match get(TS_SERVER_ID) {
            Some(raw) => parse_number(TS_SERVER_ID, &raw)?,
            None => DEFAULT_SERVER_ID,
        };

        let live_interval = match get(LIVE_INTERVAL_SECS) {
            Some(raw) => parse_number::<u64>(LIVE_INTERVAL_SECS, &raw)?,
            None => DEFAULT_LIVE_INTERVAL_SECS,
        };
        if live_interval == 0 {
            return Err(ConfigError::Invalid {
                var: LIVE_INTERVAL_SECS,
                reason: "must be greater than zero".into(),
            });
        }

        let live_first_delay = match get(LIVE_FIRST_DELAY_SECS) {
            Some(raw) => parse_number::<u64>(LIVE_FIRST_DELAY_SECS, &raw)?,
            None => DEFAULT_LIVE_FIRST_DELAY_SECS,
        };

        let log_chat_id = get(LOG_CHAT_ID)
            .map(|raw| parse_number::<i64>(LOG_CHAT_ID, &raw).map(ChatId))
            .transpose()?;

        Ok(Self {
            bot_token,
            ts_api_key,
            ts_url,
            ts_server_id,
            allowed_groups,
            live_interval: Duration::from_secs(live_interval),
            live_first_delay: Duration::from_secs(live_first_delay),
            log_chat_id,
            log_dir: get(LOG_DIR).map(PathBuf::from),
        })
    }
}

fn parse_base_url(raw: &str) -> Result<String, ConfigError> {
    let url = reqwest::Url::parse(raw).map_err(|e| ConfigError::Invalid {
        var: TS_URL,
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            var: TS_URL,
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(raw.trim_end_matches('/').to_string())
}

/// Parse a comma separated list of chat ids, skipping blank entries.
fn parse_groups(raw: &str) -> Result<HashSet<ChatId>, ConfigError> {
    let groups = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_number::<i64>(ALLOWED_GROUPS, s).map(ChatId))
        .collect::<Result<HashSet<_>, _>>()?;

    if groups.is_empty() {
        return Err(ConfigError::Invalid {
            var: ALLOWED_GROUPS,
            reason: "must list at least one chat id".into(),
        });
    }
    Ok(groups)
}

fn parse_number<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: format!("'{raw}': {e}"),
    })
}
