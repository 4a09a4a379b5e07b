use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub log_format: LogFormat,
    /// Upper bound on the answer text accepted in one edit
    pub max_answer_bytes: usize,
    /// Sessions untouched for this long are persisted and closed
    pub session_idle_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8081".to_string(),
            log_format: LogFormat::Pretty,
            max_answer_bytes: 64 * 1024,
            session_idle_secs: 30 * 60,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first, then the working directory
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/*.toml + APP__ overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Config::default();

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or(defaults.bind_addr);

        let log_format = match settings
            .get_string("logging.format")
            .or_else(|_| env::var("LOG_FORMAT"))
        {
            Ok(value) => parse_log_format(&value)?,
            Err(_) => defaults.log_format,
        };

        let max_answer_bytes = match settings.get_int("limits.max_answer_bytes") {
            Ok(value) if value > 0 => value as usize,
            Ok(value) => {
                return Err(config::ConfigError::Message(format!(
                    "limits.max_answer_bytes must be positive, got {}",
                    value
                )))
            }
            Err(_) => env::var("MAX_ANSWER_BYTES")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.max_answer_bytes),
        };

        let session_idle_secs = match settings.get_int("limits.session_idle_secs") {
            Ok(value) if value > 0 => value as u64,
            Ok(value) => {
                return Err(config::ConfigError::Message(format!(
                    "limits.session_idle_secs must be positive, got {}",
                    value
                )))
            }
            Err(_) => env::var("SESSION_IDLE_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.session_idle_secs),
        };

        Ok(Config {
            bind_addr,
            log_format,
            max_answer_bytes,
            session_idle_secs,
        })
    }
}

fn parse_log_format(value: &str) -> Result<LogFormat, config::ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "pretty" | "text" => Ok(LogFormat::Pretty),
        "json" => Ok(LogFormat::Json),
        other => Err(config::ConfigError::Message(format!(
            "unknown log format: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 8] = [
        "APP__SERVER__BIND_ADDR",
        "APP__LOGGING__FORMAT",
        "APP__LIMITS__MAX_ANSWER_BYTES",
        "APP__LIMITS__SESSION_IDLE_SECS",
        "BIND_ADDR",
        "LOG_FORMAT",
        "MAX_ANSWER_BYTES",
        "SESSION_IDLE_SECS",
    ];

    fn clear_env() {
        env::set_var("SKIP_ROOT_ENV", "1");
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn falls_back_to_defaults() {
        clear_env();
        let config = Config::load().unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8081");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.max_answer_bytes, 65536);
        assert_eq!(config.session_idle_secs, 1800);
    }

    #[test]
    #[serial]
    fn prefixed_env_overrides() {
        clear_env();
        env::set_var("APP__SERVER__BIND_ADDR", "127.0.0.1:9000");
        env::set_var("APP__LOGGING__FORMAT", "json");
        env::set_var("APP__LIMITS__MAX_ANSWER_BYTES", "1024");
        env::set_var("APP__LIMITS__SESSION_IDLE_SECS", "90");

        let config = Config::load().unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.max_answer_bytes, 1024);
        assert_eq!(config.session_idle_secs, 90);
        clear_env();
    }

    #[test]
    #[serial]
    fn plain_env_fallbacks() {
        clear_env();
        env::set_var("LOG_FORMAT", "TEXT");
        env::set_var("MAX_ANSWER_BYTES", "0");

        let config = Config::load().unwrap();
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.max_answer_bytes, 65536);
        clear_env();
    }

    #[test]
    #[serial]
    fn rejects_unknown_log_format() {
        clear_env();
        env::set_var("LOG_FORMAT", "xml");
        assert!(Config::load().is_err());
        clear_env();
    }
}
