use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{GrowlogError, Result};

/// Top-level configuration for the Growlog server.
///
/// Built once at process start: TOML file first, then environment
/// overrides (see [`GrowlogConfig::apply_env`]). Components receive it by
/// reference; nothing reads the environment after startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrowlogConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub docs: DocsConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

impl GrowlogConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: GrowlogConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_process_env(&mut self) -> Result<()> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides using the given lookup.
    ///
    /// Unset variables leave the file value untouched. A variable that is
    /// set but unparseable is a configuration error.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("GROWLOG_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_var("PORT", &port)?;
        }
        if let Some(env) = lookup("GROWLOG_ENV") {
            self.server.environment = env;
        }
        if let Some(path) = lookup("GROWLOG_DATABASE") {
            self.storage.database_path = path;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = Some(secret).filter(|s| !s.is_empty());
        }
        if let Some(ttl) = lookup("JWT_TTL_SECS") {
            self.auth.token_ttl_secs = parse_var("JWT_TTL_SECS", &ttl)?;
        }
        if let Some(enabled) = lookup("GROWLOG_DOCS_ENABLED") {
            self.docs.enabled = Some(parse_bool("GROWLOG_DOCS_ENABLED", &enabled)?);
        }
        if let Some(token) = lookup("SWAGGER_SAMPLE_TOKEN") {
            self.docs.sample_token = token;
        }
        if let Some(detailed) = lookup("GROWLOG_HEALTH_DETAILED") {
            self.health.detailed = parse_bool("GROWLOG_HEALTH_DETAILED", &detailed)?;
        }
        Ok(())
    }

    /// Whether the documentation endpoint should be mounted.
    ///
    /// An explicit setting wins; otherwise docs are served everywhere except
    /// in `production`, since the page embeds the sample bearer token.
    pub fn docs_enabled(&self) -> bool {
        self.docs
            .enabled
            .unwrap_or_else(|| !self.server.is_production())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| GrowlogError::Config(format!("{key} has an invalid value: {value:?}")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(GrowlogError::Config(format!(
            "{key} must be a boolean, got {value:?}"
        ))),
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Deployment environment name ("development", "production", ...).
    pub environment: String,
}

impl ServerConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "development".to_string(),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file.
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "growlog.db".to_string(),
        }
    }
}

/// Token issuance and verification settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for signing access tokens. Generated at startup if unset.
    pub jwt_secret: Option<String>,
    /// Access token lifetime in seconds.
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish()
    }
}

/// API documentation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    /// Explicit on/off switch. `None` means "decide from the environment".
    pub enabled: Option<bool>,
    /// Bearer token pre-filled into the documentation UI.
    pub sample_token: String,
}

/// Health endpoint settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Return uptime/timestamp/env JSON instead of the plain `OK`.
    pub detailed: bool,
}
