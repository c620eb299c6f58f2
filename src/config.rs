//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honored for local development. Lookups go through
//! [`Config::from_lookup`] so tests never have to touch the process
//! environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SESSION_TTL_HOURS: u64 = 24;
const DEFAULT_BCRYPT_COST: u32 = 10;
const TEST_BCRYPT_COST: u32 = 4;
const DEV_SESSION_SECRET: &str = "fittrack-development-session-secret";
const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// Deployment mode, from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

/// Where workouts and users are persisted, from `DATABASE_URL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    /// Process-local maps; data is lost on restart.
    Memory,
    /// Cloud Firestore in the given GCP project.
    Firestore { project_id: String },
}

impl DatabaseConfig {
    /// Parse a connection string of the form `memory://` or `firestore://<project-id>`.
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        let url = url.trim();
        if url == "memory" || url == "memory://" {
            return Ok(Self::Memory);
        }

        match url.strip_prefix("firestore://") {
            Some(project_id) if !project_id.is_empty() && !project_id.contains('/') => {
                Ok(Self::Firestore {
                    project_id: project_id.to_string(),
                })
            }
            _ => Err(ConfigError::Invalid(
                "DATABASE_URL",
                format!("unsupported connection string '{url}'"),
            )),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    pub environment: Environment,
    pub database: DatabaseConfig,
    /// Key for signing session cookies (raw bytes)
    pub session_secret: Vec<u8>,
    /// Absolute session lifetime, counted from login
    pub session_ttl: Duration,
    /// Sessions unused for longer than this are dropped
    pub session_idle_timeout: Option<Duration>,
    /// bcrypt work factor
    pub password_cost: u32,
    /// Directory holding the browser client
    pub static_dir: PathBuf,
    /// Insert the demo user and sample workouts at startup
    pub seed_demo_data: bool,
}

impl Config {
    /// Config for tests: in-memory storage and the cheapest bcrypt cost.
    pub fn test_default() -> Self {
        Self {
            port: 0,
            environment: Environment::Development,
            database: DatabaseConfig::Memory,
            session_secret: b"test_session_secret_32_bytes_min!".to_vec(),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_HOURS * 60 * 60),
            session_idle_timeout: None,
            password_cost: TEST_BCRYPT_COST,
            static_dir: PathBuf::from("frontend"),
            seed_demo_data: false,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref().map(str::trim) {
            Some("production") => Environment::Production,
            Some("development") | Some("") | None => Environment::Development,
            Some(other) => {
                return Err(ConfigError::Invalid(
                    "APP_ENV",
                    format!("expected 'production' or 'development', got '{other}'"),
                ))
            }
        };

        let database = match lookup("DATABASE_URL") {
            Some(url) => DatabaseConfig::parse(&url)?,
            None => DatabaseConfig::Memory,
        };

        let session_secret = match lookup("SESSION_SECRET").map(|v| v.trim().to_string()) {
            Some(secret) if !secret.is_empty() => secret.into_bytes(),
            _ if environment == Environment::Production => {
                return Err(ConfigError::Missing("SESSION_SECRET"))
            }
            _ => DEV_SESSION_SECRET.as_bytes().to_vec(),
        };
        if environment == Environment::Production
            && session_secret.len() < MIN_PRODUCTION_SECRET_LEN
        {
            return Err(ConfigError::Invalid(
                "SESSION_SECRET",
                format!("must be at least {MIN_PRODUCTION_SECRET_LEN} bytes in production"),
            ));
        }

        let port = parse_or("PORT", lookup("PORT"), DEFAULT_PORT)?;
        let ttl_hours = parse_or(
            "SESSION_TTL_HOURS",
            lookup("SESSION_TTL_HOURS"),
            DEFAULT_SESSION_TTL_HOURS,
        )?;
        if ttl_hours == 0 {
            return Err(ConfigError::Invalid(
                "SESSION_TTL_HOURS",
                "must be greater than 0".to_string(),
            ));
        }
        let session_idle_timeout = lookup("SESSION_IDLE_MINUTES")
            .map(|raw| parse_value::<u64>("SESSION_IDLE_MINUTES", &raw))
            .transpose()?
            .filter(|minutes| *minutes > 0)
            .map(|minutes| Duration::from_secs(minutes * 60));

        let password_cost = parse_or("BCRYPT_COST", lookup("BCRYPT_COST"), DEFAULT_BCRYPT_COST)?;
        if !(4..=31).contains(&password_cost) {
            return Err(ConfigError::Invalid(
                "BCRYPT_COST",
                "must be between 4 and 31".to_string(),
            ));
        }

        Ok(Self {
            port,
            environment,
            database,
            session_secret,
            session_ttl: Duration::from_secs(ttl_hours * 60 * 60),
            session_idle_timeout,
            password_cost,
            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("frontend")),
            seed_demo_data: parse_or("SEED_DEMO_DATA", lookup("SEED_DEMO_DATA"), false)?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(key, format!("cannot parse '{raw}'")))
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => parse_value(key, &raw),
        _ => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
