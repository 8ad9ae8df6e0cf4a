//! services/web/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::Duration;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Outbound mail settings. The password is never printed.
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from", &self.from)
            .finish()
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub model_path: PathBuf,
    pub vectorizer_path: PathBuf,
    pub prompt_image_path: PathBuf,
    pub week_label: String,
    /// How long an idle browser session is kept.
    pub session_ttl: Duration,
    pub smtp: SmtpSettings,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required =
            |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Server and Database Settings ---
        let bind_address_str = or_default("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = required("DATABASE_URL")?;

        let session_ttl_str = or_default("SESSION_TTL_SECS", "3600");
        let session_ttl_secs = session_ttl_str.parse::<u32>().map_err(|e| {
            ConfigError::InvalidValue("SESSION_TTL_SECS".to_string(), e.to_string())
        })?;
        let session_ttl = Duration::seconds(i64::from(session_ttl_secs));

        let log_level_str = or_default("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Classifier Artifacts and Static Assets ---
        let model_path = PathBuf::from(or_default("MODEL_PATH", "./models/show_tell_model.json"));
        let vectorizer_path =
            PathBuf::from(or_default("VECTORIZER_PATH", "./models/show_tell_vectorizer.json"));
        let prompt_image_path =
            PathBuf::from(or_default("PROMPT_IMAGE_PATH", "./assets/chart_prompt.png"));
        let week_label = or_default("WEEK_LABEL", "Week 5");

        // --- Mail Settings ---
        let smtp_port_str = or_default("SMTP_PORT", "465");
        let smtp_port = smtp_port_str.parse::<u16>().map_err(|e| {
            ConfigError::InvalidValue("SMTP_PORT".to_string(), e.to_string())
        })?;
        let username = required("SMTP_USERNAME")?;
        let smtp = SmtpSettings {
            host: or_default("SMTP_HOST", "smtp.gmail.com"),
            port: smtp_port,
            password: required("SMTP_PASSWORD")?,
            from: lookup("SMTP_FROM").unwrap_or_else(|| username.clone()),
            username,
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            model_path,
            vectorizer_path,
            prompt_image_path,
            week_label,
            session_ttl,
            smtp,
        })
    }
}
