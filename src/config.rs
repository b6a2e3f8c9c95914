use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use secrecy::Secret;
use url::Url;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";
pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

#[derive(Debug)]
pub struct Settings {
    pub bind_address: String,
    pub database_url: Option<Secret<String>>,
    pub database_max_connections: u32,
    pub query_timeout: Duration,
    pub auth: AuthSettings,
    pub assets: AssetSettings,
    pub max_upload_bytes: usize,
    pub default_page_limit: u32,
}

#[derive(Debug)]
pub struct AuthSettings {
    pub access_token_secret: Secret<String>,
    pub access_token_ttl: chrono::Duration,
    pub refresh_token_secret: Secret<String>,
    pub refresh_token_ttl: chrono::Duration,
    pub cookie_secure: bool,
}

#[derive(Debug)]
pub struct AssetSettings {
    pub base_url: Url,
    pub api_key: Secret<String>,
}

impl Settings {
    /// Reads the process environment. Call `dotenv::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_var_string)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{} must be set", key));

        let auth = AuthSettings {
            access_token_secret: Secret::new(required("ACCESS_TOKEN_SECRET")?),
            access_token_ttl: chrono::Duration::minutes(parse_or(
                &lookup,
                "ACCESS_TOKEN_EXPIRY_MINUTES",
                24 * 60,
            )?),
            refresh_token_secret: Secret::new(required("REFRESH_TOKEN_SECRET")?),
            refresh_token_ttl: chrono::Duration::days(parse_or(
                &lookup,
                "REFRESH_TOKEN_EXPIRY_DAYS",
                10,
            )?),
            cookie_secure: parse_or(&lookup, "COOKIE_SECURE", true)?,
        };

        let base_url = required("ASSET_BASE_URL")?;
        let assets = AssetSettings {
            base_url: Url::parse(&base_url)
                .with_context(|| format!("ASSET_BASE_URL is not a valid url: {}", base_url))?,
            api_key: Secret::new(required("ASSET_API_KEY")?),
        };

        Ok(Self {
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            database_url: lookup("DATABASE_URL").map(Secret::new),
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            query_timeout: Duration::from_millis(parse_or(&lookup, "QUERY_TIMEOUT_MS", 10_000)?),
            auth,
            assets,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            default_page_limit: parse_or(&lookup, "DEFAULT_PAGE_LIMIT", DEFAULT_PAGE_LIMIT)?,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow!("{} has an invalid value {:?}: {}", key, raw, e)),
        None => Ok(default),
    }
}

fn env_var_string(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
