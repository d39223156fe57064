use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::bus::DEFAULT_CAPACITY;
use crate::chat::DEFAULT_MESSAGE_LIMIT;

/// Daemon settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub port: u16,
    pub message_limit: u32,
    pub bus_capacity: usize,
    pub upload_url: Option<String>,
    pub upload_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            // Not fatal: a missing .env just means plain environment variables.
            info!("No .env file found or failed to load: {}", e);
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = match lookup("PARLOR_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => {
                let home_dir = lookup("HOME").unwrap_or_else(|| ".".into());
                PathBuf::from(home_dir).join(".parlor").join("parlor.db")
            }
        };

        let port = parse_or(&lookup, "PARLOR_PORT", 3000u16)?;
        let message_limit = parse_or(&lookup, "PARLOR_MESSAGE_LIMIT", DEFAULT_MESSAGE_LIMIT)?;
        if message_limit == 0 {
            anyhow::bail!("PARLOR_MESSAGE_LIMIT must be positive");
        }
        let bus_capacity = parse_or(&lookup, "PARLOR_BUS_CAPACITY", DEFAULT_CAPACITY)?;
        if bus_capacity == 0 {
            anyhow::bail!("PARLOR_BUS_CAPACITY must be positive");
        }

        Ok(Self {
            db_path,
            port,
            message_limit,
            bus_capacity,
            upload_url: lookup("PARLOR_UPLOAD_URL").filter(|url| !url.is_empty()),
            upload_token: lookup("PARLOR_UPLOAD_TOKEN").filter(|token| !token.is_empty()),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
