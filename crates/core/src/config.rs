//! Session manager configuration

use crate::error::CoreResult;
use crate::validation::{ValidateConfig, validators};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Secret used to obfuscate persisted sessions when none is configured.
///
/// Changing it makes every previously persisted session unreadable, which
/// degrades to a silent logout.
pub const DEFAULT_OBFUSCATION_SECRET: &str = "talent-connect-session";

/// Top-level configuration for the session manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Key under which the obfuscated session is stored
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Secret for the reversible storage transform
    #[serde(default = "default_obfuscation_secret")]
    pub obfuscation_secret: String,
    /// Backend API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Redirect targets used by the route guard
    #[serde(default)]
    pub routes: RouteConfig,
    /// Log level filter (e.g. "info", "talent_session=debug")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Backend API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Route guard redirect targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Where unauthenticated navigations are sent
    #[serde(default = "default_login_route")]
    pub login: String,
    /// Where authenticated navigations lacking a role are sent
    #[serde(default = "default_unauthorized_route")]
    pub unauthorized: String,
}

fn default_storage_key() -> String {
    "auth_state".to_string()
}

fn default_obfuscation_secret() -> String {
    DEFAULT_OBFUSCATION_SECRET.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

fn default_login_route() -> String {
    "/login".to_string()
}

fn default_unauthorized_route() -> String {
    "/unauthorized".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            obfuscation_secret: default_obfuscation_secret(),
            api: ApiConfig::default(),
            routes: RouteConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            login: default_login_route(),
            unauthorized: default_unauthorized_route(),
        }
    }
}

impl ApiConfig {
    /// Request timeout as a duration
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ValidateConfig for SessionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        validators::validate_not_empty(&self.storage_key, "storage_key")?;
        validators::validate_not_empty(&self.obfuscation_secret, "obfuscation_secret")?;
        validators::validate_url(&self.api.base_url, "api.base_url")?;
        validators::validate_range(self.api.timeout_secs, 1, 300, "api.timeout_secs")?;
        validators::validate_route(&self.routes.login, "routes.login")?;
        validators::validate_route(&self.routes.unauthorized, "routes.unauthorized")?;
        Ok(())
    }
}

impl SessionConfig {
    /// Load configuration from defaults, well-known files and the environment
    ///
    /// Environment variables use the `TALENT` prefix with `__` as the
    /// nesting separator, e.g. `TALENT__API__BASE_URL`.
    pub fn load() -> CoreResult<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        let config_paths = ["talent.toml", "config/talent.toml"];
        for path in &config_paths {
            if Path::new(path).exists() {
                debug!(path, "Loading configuration file");
                builder = builder.add_source(File::with_name(path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("TALENT")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file, with environment overrides
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("TALENT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage_key, "auth_state");
        assert_eq!(config.routes.login, "/login");
        assert_eq!(config.routes.unauthorized, "/unauthorized");
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        let config = SessionConfig {
            obfuscation_secret: String::new(),
            ..SessionConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("obfuscation_secret"));
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
storage_key = "tc_session"

[api]
base_url = "https://api.example.com"

[routes]
unauthorized = "/403"
"#
        )
        .unwrap();

        let config = SessionConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.storage_key, "tc_session");
        assert_eq!(config.api.base_url, "https://api.example.com");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.routes.login, "/login");
        assert_eq!(config.routes.unauthorized, "/403");
    }

    #[test]
    fn test_load_from_file_validates() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[routes]\nlogin = \"login\"").unwrap();

        let err = SessionConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { .. }));
        assert!(err.to_string().contains("routes.login"));
    }
}
