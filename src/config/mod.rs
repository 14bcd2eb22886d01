use anyhow::{Result, bail};
use dotenvy::dotenv;
use serde::Deserialize;

use crate::auth::password::{MAX_COST, MIN_COST};

/// Signing key used when `SECRET_KEY` is not set. Only suitable for local development.
pub const DEV_SECRET_KEY: &str = "dev_secret_change_me";

/// Longest accepted token lifetime, 100 years
pub const MAX_ACCESS_TOKEN_MINUTES: i64 = 100 * 366 * 24 * 60;

/// Configuration for the application
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database connection URL, or `memory://` for the in-process store
    pub database_url: String,

    /// Key used to sign and verify access tokens
    #[serde(default = "default_secret_key")]
    pub secret_key: String,

    /// Lifetime of an access token in minutes
    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: i64,

    /// bcrypt work factor
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    /// Address the HTTP server listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Browser origins allowed by CORS
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// Apply pending migrations when the server starts
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

fn default_secret_key() -> String {
    DEV_SECRET_KEY.to_string()
}

fn default_access_token_minutes() -> i64 {
    60 * 24 * 7
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_db_max_connections() -> u32 {
    5
}

fn default_run_migrations() -> bool {
    true
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Variables from a `.env` file are loaded first if one exists.
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::from_env::<Config>()?;
        config.validate()?;

        Ok(config)
    }

    /// Build a configuration from explicit key/value pairs instead of the process environment
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(pairs)?;
        config.validate()?;

        Ok(config)
    }

    /// Reject values the auth components cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(MIN_COST..=MAX_COST).contains(&self.bcrypt_cost) {
            bail!("BCRYPT_COST must be between {} and {}", MIN_COST, MAX_COST);
        }

        if !(1..=MAX_ACCESS_TOKEN_MINUTES).contains(&self.access_token_minutes) {
            bail!(
                "ACCESS_TOKEN_MINUTES must be between 1 and {}",
                MAX_ACCESS_TOKEN_MINUTES
            );
        }

        if self.secret_key.is_empty() {
            bail!("SECRET_KEY must not be empty");
        }

        Ok(())
    }

    /// Get a direct reference to the database URL
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Whether the in-process store was requested instead of PostgreSQL
    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with("memory:")
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.secret_key == DEV_SECRET_KEY
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    let config = Config::load()?;

    if config.uses_dev_secret() {
        tracing::warn!("SECRET_KEY is not set, signing tokens with the development key");
    }

    Ok(config)
}
