use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// How often the expiry sweeper runs, in seconds.
    pub expiry_sweep_seconds: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            expiry_sweep_seconds: env::var("EXPIRY_SWEEP_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("EXPIRY_SWEEP_SECONDS must be a valid number")?,
        })
    }
}
