//! Server configuration.

use ratekeeper_common::constants;
use ratekeeper_pipeline::PipelineConfig;
use ratekeeper_source::{FrankfurterConfig, DEFAULT_BASE_URL};
use ratekeeper_store::ConnectOptions;
use std::time::Duration;

/// Main server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub listen_addr: String,
    /// Listen port.
    pub listen_port: u16,
    /// Database URL.
    pub database_url: String,
    /// Attempts to reach the database at startup.
    pub db_connect_attempts: u32,
    /// Pause between database connection attempts.
    pub db_connect_pause: Duration,
    /// Keep everything in memory instead of Postgres.
    pub in_memory: bool,
    /// Dedup window for update requests.
    pub cache_ttl: Duration,
    /// Update job queue capacity.
    pub queue_capacity: usize,
    /// Serialize same-pair submissions.
    pub strict_dedup: bool,
    /// Rate source base URL.
    pub source_url: String,
    /// Rate source request timeout.
    pub source_timeout: Duration,
    /// Serve canned rates instead of calling the rate source.
    pub fake_source: bool,
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            listen_port: 8080,
            database_url: "postgres://postgres:postgres@db:5432/esr".to_string(),
            db_connect_attempts: constants::DB_CONNECT_ATTEMPTS,
            db_connect_pause: constants::DB_CONNECT_PAUSE,
            in_memory: false,
            cache_ttl: constants::CACHE_TTL,
            queue_capacity: constants::QUEUE_CAPACITY,
            strict_dedup: false,
            source_url: DEFAULT_BASE_URL.to_string(),
            source_timeout: constants::SOURCE_TIMEOUT,
            fake_source: false,
            log_level: "info".to_string(),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup. Unparseable values keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("RATEKEEPER_LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Some(port) = lookup("RATEKEEPER_LISTEN_PORT").and_then(|v| v.parse().ok()) {
            config.listen_port = port;
        }

        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = url;
        }

        if let Some(attempts) =
            lookup("RATEKEEPER_DB_CONNECT_ATTEMPTS").and_then(|v| v.parse().ok())
        {
            config.db_connect_attempts = attempts;
        }

        if let Some(secs) = lookup("RATEKEEPER_DB_CONNECT_PAUSE_SECS").and_then(|v| v.parse().ok())
        {
            config.db_connect_pause = Duration::from_secs(secs);
        }

        if let Some(flag) = lookup("RATEKEEPER_IN_MEMORY").and_then(|v| parse_bool(&v)) {
            config.in_memory = flag;
        }

        if let Some(secs) = lookup("RATEKEEPER_CACHE_TTL_SECS").and_then(|v| v.parse().ok()) {
            config.cache_ttl = Duration::from_secs(secs);
        }

        if let Some(capacity) = lookup("RATEKEEPER_QUEUE_CAPACITY").and_then(|v| v.parse().ok()) {
            config.queue_capacity = capacity;
        }

        if let Some(flag) = lookup("RATEKEEPER_STRICT_DEDUP").and_then(|v| parse_bool(&v)) {
            config.strict_dedup = flag;
        }

        if let Some(url) = lookup("RATEKEEPER_SOURCE_URL") {
            config.source_url = url;
        }

        if let Some(secs) = lookup("RATEKEEPER_SOURCE_TIMEOUT_SECS").and_then(|v| v.parse().ok())
        {
            config.source_timeout = Duration::from_secs(secs);
        }

        if let Some(flag) = lookup("RATEKEEPER_FAKE_SOURCE").and_then(|v| parse_bool(&v)) {
            config.fake_source = flag;
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_port == 0 {
            return Err("Listen port cannot be 0".to_string());
        }

        if !self.in_memory && self.database_url.is_empty() {
            return Err("Database URL cannot be empty".to_string());
        }

        if !self.fake_source && self.source_url.is_empty() {
            return Err("Rate source URL cannot be empty".to_string());
        }

        if self.source_timeout.is_zero() {
            return Err("Rate source timeout cannot be 0".to_string());
        }

        self.pipeline().validate()
    }

    /// Socket address string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.listen_addr, self.listen_port)
    }

    /// Pipeline part of the configuration.
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            cache_ttl: self.cache_ttl,
            queue_capacity: self.queue_capacity,
            strict_dedup: self.strict_dedup,
            ..PipelineConfig::default()
        }
    }

    /// Rate source part of the configuration.
    pub fn source(&self) -> FrankfurterConfig {
        FrankfurterConfig {
            base_url: self.source_url.clone(),
            timeout: self.source_timeout,
        }
    }

    /// Database connection part of the configuration.
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            attempts: self.db_connect_attempts,
            pause: self.db_connect_pause,
            ..ConnectOptions::default()
        }
    }
}
