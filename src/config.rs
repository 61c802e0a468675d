use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

/// Longest accepted reminder period (one week).
const MAX_REMINDER_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A variable is missing or could not be parsed.
    Env(envy::Error),
    /// `REMINDER_TIMEZONE` is not an IANA zone name.
    InvalidTimezone { name: String },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Env(source) => write!(f, "failed to read environment: {}", source),
            Self::InvalidTimezone { name } => write!(f, "unknown timezone '{}'", name),
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Env(source) => Some(source),
            Self::InvalidTimezone { .. } | Self::Validation(_) => None,
        }
    }
}

/// Raw environment as `envy` sees it (keys are lowercased variable names).
#[derive(Deserialize)]
struct EnvVars {
    token: String,
    channel_id: i64,
    owm_api_key: String,
    ocr_api_key: String,
    /// Present in deployments, not wired to any adapter.
    rapid_api_key: Option<String>,
    #[serde(default = "default_port")]
    port: u16,
    log_chat_id: Option<i64>,
    data_dir: Option<String>,
    reminder_timezone: Option<String>,
    #[serde(default = "default_start_hour")]
    reminder_start_hour: u32,
    #[serde(default = "default_end_hour")]
    reminder_end_hour: u32,
    #[serde(default = "default_interval_minutes")]
    reminder_interval_minutes: u64,
    #[serde(default = "default_mention")]
    broadcast_mention: String,
}

fn default_port() -> u16 {
    8080
}

fn default_start_hour() -> u32 {
    7
}

fn default_end_hour() -> u32 {
    18
}

fn default_interval_minutes() -> u64 {
    60
}

fn default_mention() -> String {
    "@everyone".to_string()
}

pub struct Config {
    pub bot_token: String,
    /// Chat that receives the hourly reminder broadcast.
    pub broadcast_chat_id: i64,
    pub weather_api_key: String,
    pub ocr_api_key: String,
    pub rapid_api_key: Option<String>,
    /// Port of the liveness endpoint.
    pub port: u16,
    /// Chat that receives forwarded warnings and errors.
    pub log_chat_id: Option<i64>,
    /// Directory for logs and scratch files.
    pub data_dir: PathBuf,
    /// Zone used for the daytime window. `None` means host local time.
    pub reminder_timezone: Option<Tz>,
    pub reminder_start_hour: u32,
    pub reminder_end_hour: u32,
    pub reminder_interval: Duration,
    pub broadcast_mention: String,
}

impl Config {
    /// Load from the process environment, merging a `.env` file first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let env: EnvVars = envy::from_iter(vars).map_err(ConfigError::Env)?;

        if env.token.is_empty() {
            return Err(ConfigError::Validation("TOKEN is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = env.token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "TOKEN appears invalid (expected format: 123456789:ABCdefGHI...)".into(),
            ));
        }
        if env.owm_api_key.is_empty() {
            return Err(ConfigError::Validation("OWM_API_KEY is required".into()));
        }
        if env.ocr_api_key.is_empty() {
            return Err(ConfigError::Validation("OCR_API_KEY is required".into()));
        }
        if env.reminder_start_hour > 23 || env.reminder_end_hour > 23 {
            return Err(ConfigError::Validation("reminder hours must be within 0..=23".into()));
        }
        if env.reminder_start_hour > env.reminder_end_hour {
            return Err(ConfigError::Validation(
                "REMINDER_START_HOUR must not be after REMINDER_END_HOUR".into(),
            ));
        }
        if env.reminder_interval_minutes == 0 {
            return Err(ConfigError::Validation("REMINDER_INTERVAL_MINUTES must be positive".into()));
        }
        let reminder_interval_secs = env
            .reminder_interval_minutes
            .checked_mul(60)
            .filter(|_| env.reminder_interval_minutes <= MAX_REMINDER_INTERVAL_MINUTES)
            .ok_or_else(|| {
                ConfigError::Validation(format!(
                    "REMINDER_INTERVAL_MINUTES must be at most {MAX_REMINDER_INTERVAL_MINUTES}"
                ))
            })?;

        let reminder_timezone = match env.reminder_timezone.filter(|s| !s.trim().is_empty()) {
            Some(name) => Some(
                name.trim()
                    .parse::<Tz>()
                    .map_err(|_| ConfigError::InvalidTimezone { name })?,
            ),
            None => None,
        };

        let data_dir = env
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            bot_token: env.token,
            broadcast_chat_id: env.channel_id,
            weather_api_key: env.owm_api_key,
            ocr_api_key: env.ocr_api_key,
            rapid_api_key: env.rapid_api_key.filter(|k| !k.is_empty()),
            port: env.port,
            log_chat_id: env.log_chat_id,
            data_dir,
            reminder_timezone,
            reminder_start_hour: env.reminder_start_hour,
            reminder_end_hour: env.reminder_end_hour,
            reminder_interval: Duration::from_secs(reminder_interval_secs),
            broadcast_mention: env.broadcast_mention,
        })
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    /// Where downloaded images and synthesized audio live until they are sent.
    pub fn scratch_dir(&self) -> PathBuf {
        self.data_dir.join("tmp")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(extra: &[(&str, &str)]) -> Vec<(String, String)> {
        let mut all = vec![
            ("TOKEN", "123456789:ABCdefGHIjklMNOpqrsTUVwxyz"),
            ("CHANNEL_ID", "-100200300"),
            ("OWM_API_KEY", "owm"),
            ("OCR_API_KEY", "ocr"),
        ];
        all.extend_from_slice(extra);
        all.into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn without(key: &str) -> Vec<(String, String)> {
        vars(&[]).into_iter().filter(|(k, _)| k != key).collect()
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_valid_config_with_defaults() {
        let config = Config::from_vars(vars(&[])).expect("should load valid config");
        assert_eq!(config.broadcast_chat_id, -100200300);
        assert_eq!(config.port, 8080);
        assert_eq!(config.reminder_start_hour, 7);
        assert_eq!(config.reminder_end_hour, 18);
        assert_eq!(config.reminder_interval, Duration::from_secs(3600));
        assert_eq!(config.broadcast_mention, "@everyone");
        assert!(config.reminder_timezone.is_none());
        assert!(config.rapid_api_key.is_none());
        assert_eq!(config.scratch_dir(), PathBuf::from("./tmp"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(vars(&[
            ("PORT", "3000"),
            ("LOG_CHAT_ID", "42"),
            ("DATA_DIR", "/var/lib/hydrobot"),
            ("REMINDER_TIMEZONE", "Asia/Ho_Chi_Minh"),
            ("REMINDER_INTERVAL_MINUTES", "30"),
            ("RAPID_API_KEY", "rapid"),
        ]))
        .unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_chat_id, Some(42));
        assert_eq!(config.log_dir(), PathBuf::from("/var/lib/hydrobot/logs"));
        assert_eq!(config.reminder_timezone, Some(chrono_tz::Asia::Ho_Chi_Minh));
        assert_eq!(config.reminder_interval, Duration::from_secs(1800));
        assert_eq!(config.rapid_api_key.as_deref(), Some("rapid"));
    }

    #[test]
    fn test_missing_token() {
        let err = assert_err(Config::from_vars(without("TOKEN")));
        assert!(matches!(err, ConfigError::Env(_)));
    }

    #[test]
    fn test_missing_channel() {
        let err = assert_err(Config::from_vars(without("CHANNEL_ID")));
        assert!(matches!(err, ConfigError::Env(_)));
    }

    #[test]
    fn test_non_numeric_channel() {
        let mut env = without("CHANNEL_ID");
        env.push(("CHANNEL_ID".into(), "general".into()));
        let err = assert_err(Config::from_vars(env));
        assert!(matches!(err, ConfigError::Env(_)));
    }

    #[test]
    fn test_invalid_token_format_no_colon() {
        let mut env = without("TOKEN");
        env.push(("TOKEN".into(), "invalid_token_no_colon".into()));
        let err = assert_err(Config::from_vars(env));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn test_invalid_token_format_empty_secret() {
        let mut env = without("TOKEN");
        env.push(("TOKEN".into(), "123456789:".into()));
        let err = assert_err(Config::from_vars(env));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_empty_api_key() {
        let mut env = without("OCR_API_KEY");
        env.push(("OCR_API_KEY".into(), String::new()));
        let err = assert_err(Config::from_vars(env));
        assert!(err.to_string().contains("OCR_API_KEY"));
    }

    #[test]
    fn test_inverted_window() {
        let err = assert_err(Config::from_vars(vars(&[
            ("REMINDER_START_HOUR", "19"),
            ("REMINDER_END_HOUR", "7"),
        ])));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_hour_out_of_range() {
        let err = assert_err(Config::from_vars(vars(&[("REMINDER_END_HOUR", "24")])));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_zero_interval() {
        let err = assert_err(Config::from_vars(vars(&[("REMINDER_INTERVAL_MINUTES", "0")])));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_interval_too_long() {
        let err = assert_err(Config::from_vars(vars(&[("REMINDER_INTERVAL_MINUTES", "10081")])));
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = assert_err(Config::from_vars(vars(&[(
            "REMINDER_INTERVAL_MINUTES",
            "18446744073709551615",
        )])));
        assert!(matches!(err, ConfigError::Validation(_)));

        let config = Config::from_vars(vars(&[("REMINDER_INTERVAL_MINUTES", "10080")])).unwrap();
        assert_eq!(config.reminder_interval, Duration::from_secs(7 * 24 * 3600));
    }

    #[test]
    fn test_unknown_timezone() {
        let err = assert_err(Config::from_vars(vars(&[("REMINDER_TIMEZONE", "Mars/Olympus")])));
        assert!(matches!(err, ConfigError::InvalidTimezone { .. }));
    }
}
