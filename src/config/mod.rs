//! Runtime configuration, read from the environment (and `.env` via dotenv).
//!
//! - DATABASE_URL (default: sqlite:../data/courtforge.db)
//! - EXPORT_DIR (default: ../data/exports)
//! - ACTIVE_WINDOW_YEARS (default: 2, at most 200)
//! - DUPLICATE_GAME_POLICY=reject|keep_first (default: reject)

use anyhow::{anyhow, Result};
use std::env;

use crate::models::DuplicatePolicy;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:../data/courtforge.db";
pub const DEFAULT_EXPORT_DIR: &str = "../data/exports";

/// Teams whose last game is older than this many years before the run date are inactive.
pub const DEFAULT_ACTIVE_WINDOW_YEARS: u32 = 2;
pub const MAX_ACTIVE_WINDOW_YEARS: u32 = 200;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub export_dir: String,
    pub active_window_years: u32,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            export_dir: DEFAULT_EXPORT_DIR.to_string(),
            active_window_years: DEFAULT_ACTIVE_WINDOW_YEARS,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let active_window_years = match lookup("ACTIVE_WINDOW_YEARS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|e| anyhow!("ACTIVE_WINDOW_YEARS must be a whole number of years ('{}'): {}", raw, e))?,
            None => defaults.active_window_years,
        };
        if active_window_years > MAX_ACTIVE_WINDOW_YEARS {
            return Err(anyhow!(
                "ACTIVE_WINDOW_YEARS must be at most {} (got {})",
                MAX_ACTIVE_WINDOW_YEARS,
                active_window_years
            ));
        }

        let duplicate_policy = match lookup("DUPLICATE_GAME_POLICY") {
            Some(raw) => raw.parse::<DuplicatePolicy>()?,
            None => defaults.duplicate_policy,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            export_dir: lookup("EXPORT_DIR").unwrap_or(defaults.export_dir),
            active_window_years,
            duplicate_policy,
        })
    }
}
