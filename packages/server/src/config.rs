use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::kernel::naver_client::DEFAULT_BASE_URL;
use crate::kernel::S3Settings;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: Option<String>,
    pub log_level: Option<String>,
    pub database: DatabaseConfig,
    pub naver: NaverConfig,
    pub s3: S3Settings,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Full connection string; takes precedence over the individual parts
    pub url_override: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn url(&self) -> String {
        match &self.url_override {
            Some(url) => url.clone(),
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.name
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NaverConfig {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            port: parse_var("PORT", 8000)?,
            environment: optional_var("ENVIRONMENT"),
            log_level: optional_var("LOG_LEVEL"),
            database: DatabaseConfig {
                url_override: optional_var("DATABASE_URL"),
                host: env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
                port: parse_var("DB_PORT", 5432)?,
                user: env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string()),
                password: env::var("DB_PASSWORD").unwrap_or_default(),
                name: env::var("DB_NAME").unwrap_or_else(|_| "product_db".to_string()),
                min_connections: parse_var("DB_MIN_CONNECTIONS", 5)?,
                max_connections: parse_var("DB_MAX_CONNECTIONS", 20)?,
            },
            naver: NaverConfig {
                client_id: env::var("NAVER_CLIENT_ID").context("NAVER_CLIENT_ID must be set")?,
                client_secret: env::var("NAVER_CLIENT_SECRET")
                    .context("NAVER_CLIENT_SECRET must be set")?,
                base_url: env::var("NAVER_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
                timeout: Duration::from_secs(parse_var("NAVER_TIMEOUT", 10)?),
            },
            s3: S3Settings {
                bucket: env::var("S3_BUCKET_NAME")
                    .unwrap_or_else(|_| "product-images".to_string()),
                region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                access_key_id: optional_var("AWS_ACCESS_KEY_ID"),
                secret_access_key: optional_var("AWS_SECRET_ACCESS_KEY"),
                endpoint_url: optional_var("S3_ENDPOINT_URL"),
                timeout: Duration::from_secs(parse_var("S3_TIMEOUT", 20)?),
            },
        })
    }

    /// Default tracing filter when RUST_LOG is not set
    pub fn default_log_filter(&self) -> String {
        log_filter_for(self.log_level.as_deref())
    }
}

/// Tracing filter for a `LOG_LEVEL` value, usable before the full config loads.
pub fn log_filter_for(level: Option<&str>) -> String {
    let level = level
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_lowercase)
        .unwrap_or_else(|| "info".to_string());
    format!("{},reindeer_core=debug,sqlx=warn", level)
}

/// Unset and empty are the same thing for optional settings.
fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", name)),
        None => Ok(default),
    }
}
