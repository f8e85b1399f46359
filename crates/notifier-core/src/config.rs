//! Environment-driven configuration.
//!
//! # Environment Variables
//!
//! - `TELEGRAM_BOT_TOKEN`, `SUPABASE_URL`, `SUPABASE_KEY`: required
//! - `SUPABASE_TABLE`: table name (default `digital_notificator_services`)
//! - `ADMIN_ID`: operator chat id (default `0`, reminders disabled)
//! - `GROQ_API_KEY`, `GROQ_API_URL`, `GROQ_MODEL`, `GROQ_VISION_MODEL`
//! - `NOTIFY_HOUR`: daily trigger hour (default `9`)
//! - `TZ_OFFSET_HOURS`: fixed UTC offset (default `3`)
//! - `NOTIFIER_STATE_DIR`: local state directory (default `~/.expiry-notifier`)

use std::path::PathBuf;

use thiserror::Error;

pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const STORE_URL_ENV: &str = "SUPABASE_URL";
pub const STORE_KEY_ENV: &str = "SUPABASE_KEY";
pub const STORE_TABLE_ENV: &str = "SUPABASE_TABLE";
pub const ADMIN_ID_ENV: &str = "ADMIN_ID";
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";
pub const GROQ_API_URL_ENV: &str = "GROQ_API_URL";
pub const GROQ_MODEL_ENV: &str = "GROQ_MODEL";
pub const GROQ_VISION_MODEL_ENV: &str = "GROQ_VISION_MODEL";
pub const NOTIFY_HOUR_ENV: &str = "NOTIFY_HOUR";
pub const TZ_OFFSET_ENV: &str = "TZ_OFFSET_HOURS";
pub const STATE_DIR_ENV: &str = "NOTIFIER_STATE_DIR";

pub const DEFAULT_TABLE: &str = "digital_notificator_services";
pub const DEFAULT_GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_VISION_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
pub const DEFAULT_NOTIFY_HOUR: u32 = 9;
pub const DEFAULT_TZ_OFFSET_HOURS: i32 = 3;

const DEFAULT_STATE_DIR: &str = ".expiry-notifier";
const COUNTERS_FILE: &str = "stats.json";
const HEARTBEAT_FILE: &str = "healthcheck";
const LOCK_FILE: &str = "notifier.pid";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required variables are unset or empty.
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    /// A variable is set but unparseable.
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Completion-service settings.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub vision_model: String,
}

/// Full runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub store_url: String,
    pub store_key: String,
    pub store_table: String,
    /// Operator chat id; `0` means unset.
    pub admin_id: i64,
    /// `None` runs the interpreter on deterministic steps only.
    pub completion: Option<CompletionConfig>,
    pub notify_hour: u32,
    pub tz_offset_hours: i32,
    pub state_dir: PathBuf,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, treating empty values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut missing = Vec::new();
        let mut required = |name: &'static str| {
            get(name).unwrap_or_else(|| {
                missing.push(name);
                String::new()
            })
        };
        let bot_token = required(BOT_TOKEN_ENV);
        let store_url = required(STORE_URL_ENV);
        let store_key = required(STORE_KEY_ENV);
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let admin_id = parse_or(get(ADMIN_ID_ENV), ADMIN_ID_ENV, 0i64)?;
        let notify_hour = parse_or(get(NOTIFY_HOUR_ENV), NOTIFY_HOUR_ENV, DEFAULT_NOTIFY_HOUR)?;
        if notify_hour > 23 {
            return Err(ConfigError::Invalid {
                name: NOTIFY_HOUR_ENV,
                value: notify_hour.to_string(),
            });
        }
        let tz_offset_hours = parse_or(get(TZ_OFFSET_ENV), TZ_OFFSET_ENV, DEFAULT_TZ_OFFSET_HOURS)?;
        if !(-12..=14).contains(&tz_offset_hours) {
            return Err(ConfigError::Invalid {
                name: TZ_OFFSET_ENV,
                value: tz_offset_hours.to_string(),
            });
        }

        let completion = get(GROQ_API_KEY_ENV).map(|api_key| CompletionConfig {
            api_key,
            api_url: get(GROQ_API_URL_ENV).unwrap_or_else(|| DEFAULT_GROQ_URL.to_string()),
            model: get(GROQ_MODEL_ENV).unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string()),
            vision_model: get(GROQ_VISION_MODEL_ENV)
                .unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
        });

        let state_dir = get(STATE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(default_state_dir);

        Ok(Self {
            bot_token,
            store_url,
            store_key,
            store_table: get(STORE_TABLE_ENV).unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            admin_id,
            completion,
            notify_hour,
            tz_offset_hours,
            state_dir,
        })
    }

    pub fn has_admin(&self) -> bool {
        self.admin_id != 0
    }

    pub fn counters_path(&self) -> PathBuf {
        self.state_dir.join(COUNTERS_FILE)
    }

    pub fn heartbeat_path(&self) -> PathBuf {
        self.state_dir.join(HEARTBEAT_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.state_dir.join(LOCK_FILE)
    }
}

/// `~/.expiry-notifier`, or a relative directory when there is no home.
pub fn default_state_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_STATE_DIR))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
}

fn parse_or<T: std::str::FromStr>(
    raw: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        (BOT_TOKEN_ENV, "123:abc"),
        (STORE_URL_ENV, "https://x.supabase.co"),
        (STORE_KEY_ENV, "key"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.store_table, DEFAULT_TABLE);
        assert_eq!(config.admin_id, 0);
        assert!(!config.has_admin());
        assert!(config.completion.is_none());
        assert_eq!(config.notify_hour, 9);
        assert_eq!(config.tz_offset_hours, 3);
    }

    #[test]
    fn test_missing_required_are_all_reported() {
        let vars = lookup(&[(STORE_KEY_ENV, "key"), (BOT_TOKEN_ENV, "  ")]);
        let err = Config::from_lookup(vars).unwrap_err();
        match err {
            ConfigError::Missing(names) => assert_eq!(names, vec![BOT_TOKEN_ENV, STORE_URL_ENV]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            (ADMIN_ID_ENV, "42"),
            (GROQ_API_KEY_ENV, "gsk"),
            (GROQ_MODEL_ENV, "other-model"),
            (NOTIFY_HOUR_ENV, "10"),
            (TZ_OFFSET_ENV, "0"),
            (STATE_DIR_ENV, "/tmp/notifier"),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.admin_id, 42);
        let completion = config.completion.as_ref().unwrap();
        assert_eq!(completion.model, "other-model");
        assert_eq!(completion.api_url, DEFAULT_GROQ_URL);
        assert_eq!(config.notify_hour, 10);
        assert_eq!(config.lock_path(), PathBuf::from("/tmp/notifier/notifier.pid"));
    }

    #[test]
    fn test_invalid_values() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push((NOTIFY_HOUR_ENV, "25"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { name: NOTIFY_HOUR_ENV, .. })
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs.push((ADMIN_ID_ENV, "admin"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { name: ADMIN_ID_ENV, .. })
        ));
    }
}
