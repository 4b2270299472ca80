//! Configuration loading for the answer bot.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `ANSWERBOT_`, producing a typed [`AppConfig`].
//!
//! OAuth client credentials resolve through an explicit priority list of key
//! names (`OAUTH_CLIENT_ID` then `APP_ID`; `OAUTH_CLIENT_SECRET` then
//! `CLIENT_SECRET`). A credential that resolves through none of its keys
//! stays `None` and surfaces as a loud per-request error at exchange time,
//! never as a silent baked-in default.

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application configuration derived from `ANSWERBOT_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    /// Base URL of the marketplace REST API.
    #[serde(default = "default_marketplace_api_base")]
    pub marketplace_api_base: String,
    /// Base URL of the marketplace authorization site (user-facing consent page).
    #[serde(default = "default_marketplace_auth_base")]
    pub marketplace_auth_base: String,
    /// OAuth application client id; `ANSWERBOT_OAUTH_CLIENT_ID`, falling back
    /// to `ANSWERBOT_APP_ID`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_client_id: Option<String>,
    /// OAuth application secret; `ANSWERBOT_OAUTH_CLIENT_SECRET`, falling
    /// back to `ANSWERBOT_CLIENT_SECRET`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_client_secret: Option<String>,
    /// Redirect URI registered with the provider. Must match the one used to
    /// initiate authorization exactly, so it is configured once and reused by
    /// both the kickoff redirect and the code exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_redirect_uri: Option<String>,
    /// API key for the generative backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_openai_api_base")]
    pub openai_api_base: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            marketplace_api_base: default_marketplace_api_base(),
            marketplace_auth_base: default_marketplace_auth_base(),
            oauth_client_id: None,
            oauth_client_secret: None,
            oauth_redirect_uri: None,
            openai_api_key: None,
            openai_api_base: default_openai_api_base(),
            openai_model: default_openai_model(),
        }
    }
}

impl AppConfig {
    /// Parse the configured bind address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Serialize the configuration with secrets masked, for startup logging.
    pub fn redacted_json(&self) -> Result<String, serde_json::Error> {
        let mut redacted = self.clone();
        if redacted.oauth_client_secret.is_some() {
            redacted.oauth_client_secret = Some("***".to_string());
        }
        if redacted.openai_api_key.is_some() {
            redacted.openai_api_key = Some("***".to_string());
        }
        serde_json::to_string(&redacted)
    }
}

fn default_profile() -> String {
    "dev".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "sqlite:answerbot.db?mode=rwc".to_string()
}

fn default_db_max_connections() -> u32 {
    5
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_marketplace_api_base() -> String {
    "https://api.mercadolibre.com".to_string()
}

fn default_marketplace_auth_base() -> String {
    "https://auth.mercadolivre.com.br".to_string()
}

fn default_openai_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("database url cannot be empty; set ANSWERBOT_DATABASE_URL")]
    EmptyDatabaseUrl,
    #[error("invalid numeric value '{value}' for ANSWERBOT_{key}: {source}")]
    InvalidNumber {
        key: &'static str,
        value: String,
        source: std::num::ParseIntError,
    },
}

/// Loads configuration using layered `.env` files and `ANSWERBOT_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads the configuration: `.env`, `.env.local`, `.env.<profile>`,
    /// `.env.<profile>.local`, then process environment, later layers winning.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("ANSWERBOT_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let api_bind_addr = layered
            .remove("API_BIND_ADDR")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_api_bind_addr);
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let database_url = layered
            .remove("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_database_url);
        let db_max_connections = parse_number(
            &mut layered,
            "DB_MAX_CONNECTIONS",
            default_db_max_connections,
        )?;
        let db_acquire_timeout_ms = parse_number(
            &mut layered,
            "DB_ACQUIRE_TIMEOUT_MS",
            default_db_acquire_timeout_ms,
        )?;
        let marketplace_api_base = layered
            .remove("MARKETPLACE_API_BASE")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_marketplace_api_base);
        let marketplace_auth_base = layered
            .remove("MARKETPLACE_AUTH_BASE")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_marketplace_auth_base);

        // Layered credential resolution: first key that holds a non-empty
        // value wins; nothing resolvable stays None (reported loudly at use).
        let oauth_client_id = first_present(&mut layered, &["OAUTH_CLIENT_ID", "APP_ID"]);
        let oauth_client_secret =
            first_present(&mut layered, &["OAUTH_CLIENT_SECRET", "CLIENT_SECRET"]);
        let oauth_redirect_uri = first_present(&mut layered, &["OAUTH_REDIRECT_URI"]);

        let openai_api_key = first_present(&mut layered, &["OPENAI_API_KEY"]);
        let openai_api_base = layered
            .remove("OPENAI_API_BASE")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_openai_api_base);
        let openai_model = layered
            .remove("OPENAI_MODEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_openai_model);

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            marketplace_api_base,
            marketplace_auth_base,
            oauth_client_id,
            oauth_client_secret,
            oauth_redirect_uri,
            openai_api_key,
            openai_api_base,
            openai_model,
        };

        if config.database_url.is_empty() {
            return Err(ConfigError::EmptyDatabaseUrl);
        }

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("ANSWERBOT_PROFILE")
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix("ANSWERBOT_") {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a numeric setting, keeping the default only when the key is absent
/// or blank. A present but unparseable value is a configuration error, not a
/// silent fallback.
fn parse_number<T>(
    layered: &mut BTreeMap<String, String>,
    key: &'static str,
    default: fn() -> T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    match layered.remove(key).filter(|v| !v.trim().is_empty()) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|source| ConfigError::InvalidNumber { key, value, source }),
        None => Ok(default()),
    }
}

/// Take the first non-empty value among `keys`, removing all of them from the
/// layered map so leftovers never shadow later lookups.
fn first_present(layered: &mut BTreeMap<String, String>, keys: &[&str]) -> Option<String> {
    let mut resolved = None;
    for key in keys {
        let value = layered.remove(*key).filter(|v| !v.trim().is_empty());
        if resolved.is_none() {
            resolved = value;
        }
    }
    resolved
}
