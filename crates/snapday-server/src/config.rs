//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::FixedOffset;

use snapday_shared::constants::{DEFAULT_SUGGESTION_LIMIT, DISCOVERY_LIMIT};
use snapday_social::SocialSettings;

/// Where records are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// SQLite file at [`ServerConfig::database_path`].
    Sqlite,
    /// Process memory; everything is lost on exit.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend: {other}")),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `None`, meaning the platform data directory.
    pub database_path: Option<PathBuf>,

    /// Env: `STORAGE_BACKEND` (`sqlite` | `memory`)
    /// Default: `sqlite`
    pub storage_backend: StorageBackend,

    /// Offset from UTC that decides where calendar days begin.
    /// Env: `UTC_OFFSET_MINUTES`
    /// Default: `None`, meaning the host's local time zone.
    pub utc_offset: Option<FixedOffset>,

    /// Env: `DISCOVERY_LIMIT`
    /// Default: `50`
    pub discovery_limit: usize,

    /// Env: `SUGGESTION_LIMIT`
    /// Default: `10`
    pub suggestion_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            database_path: None,
            storage_backend: StorageBackend::Sqlite,
            utc_offset: None,
            discovery_limit: DISCOVERY_LIMIT,
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = var("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Some(backend) = var("STORAGE_BACKEND") {
            match backend.parse() {
                Ok(parsed) => config.storage_backend = parsed,
                Err(e) => tracing::warn!(error = %e, "Invalid STORAGE_BACKEND, using sqlite"),
            }
        }

        if let Some(minutes) = var("UTC_OFFSET_MINUTES") {
            match parse_offset_minutes(&minutes) {
                Some(offset) => config.utc_offset = Some(offset),
                None => tracing::warn!(value = %minutes, "Invalid UTC_OFFSET_MINUTES, using local time"),
            }
        }

        if let Some(val) = var("DISCOVERY_LIMIT") {
            match val.parse::<usize>() {
                Ok(n) => config.discovery_limit = n,
                Err(_) => tracing::warn!(value = %val, "Invalid DISCOVERY_LIMIT, using default"),
            }
        }

        if let Some(val) = var("SUGGESTION_LIMIT") {
            match val.parse::<usize>() {
                Ok(n) => config.suggestion_limit = n,
                Err(_) => tracing::warn!(value = %val, "Invalid SUGGESTION_LIMIT, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }

    pub fn social_settings(&self) -> SocialSettings {
        SocialSettings {
            discovery_limit: self.discovery_limit,
            suggestion_limit: self.suggestion_limit,
        }
    }
}

/// Parse a signed minute count into a fixed UTC offset.
fn parse_offset_minutes(value: &str) -> Option<FixedOffset> {
    let minutes: i32 = value.trim().parse().ok()?;
    FixedOffset::east_opt(minutes.checked_mul(60)?)
}
