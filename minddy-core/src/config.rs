use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::MinddyError;

pub const DEFAULT_API_URL: &str = "http://localhost:8081";
pub const DEFAULT_SESSION_PATH: &str = "~/.minddy/session.json";
pub const DEFAULT_BOT_USERNAME: &str = "minddy_bot";

#[derive(Debug, Default, Deserialize, Clone)]
pub struct MinddyConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_SESSION_PATH.to_string(),
        }
    }
}

impl SessionConfig {
    /// Session file path with `~` and `$VARS` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::full(&self.path).map_or_else(
            |_| shellexpand::tilde(&self.path).into_owned(),
            |p| p.into_owned(),
        ))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_username: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_username: DEFAULT_BOT_USERNAME.to_string(),
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix("MINDDY")
        .prefix_separator("_")
        .separator("__")
}

impl MinddyConfig {
    /// Layered load: built-in defaults, then the TOML file at `path` if it
    /// exists, then `MINDDY_*` environment variables (`MINDDY_API__BASE_URL`).
    pub fn load(path: &str) -> Result<Self, MinddyError> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env(path: &str, env: Environment) -> Result<Self, MinddyError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(env)
            .build()?;
        Self::checked(s)
    }

    /// Load from a TOML string, without environment overrides.
    pub fn from_toml(contents: &str) -> Result<Self, MinddyError> {
        let s = Config::builder()
            .add_source(File::from_str(contents, config::FileFormat::Toml))
            .build()?;
        Self::checked(s)
    }

    fn checked(source: Config) -> Result<Self, MinddyError> {
        let config: Self = source.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would only fail later, on the first request.
    pub fn validate(&self) -> Result<(), MinddyError> {
        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(MinddyError::InvalidConfig(format!(
                "api.base_url must be an http(s) URL, got {:?}",
                self.api.base_url
            )));
        }
        if self.telegram.bot_username.trim().is_empty() {
            return Err(MinddyError::InvalidConfig(
                "telegram.bot_username is empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_local_backend() {
        let config = MinddyConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:8081");
        assert_eq!(config.telegram.bot_username, "minddy_bot");
        assert_eq!(config.service.log_level, "info");
    }

    #[test]
    fn test_empty_toml_falls_back_to_defaults() {
        let config = MinddyConfig::from_toml("").expect("empty config should load");
        assert_eq!(config.api.base_url, DEFAULT_API_URL);
        assert_eq!(config.session.path, DEFAULT_SESSION_PATH);
    }

    #[test]
    fn test_toml_overrides_sections() {
        let config = MinddyConfig::from_toml(
            r#"
            [api]
            base_url = "https://api.minddy.example"

            [telegram]
            bot_username = "minddy_staging_bot"
            "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://api.minddy.example");
        assert_eq!(config.telegram.bot_username, "minddy_staging_bot");
        assert_eq!(config.session.path, DEFAULT_SESSION_PATH);
    }

    #[test]
    fn test_non_http_base_url_is_rejected() {
        let result = MinddyConfig::from_toml(
            r#"
            [api]
            base_url = "localhost:8081"
            "#,
        );
        assert!(matches!(result, Err(MinddyError::InvalidConfig(_))));
    }

    #[test]
    fn test_blank_bot_username_is_rejected() {
        let mut config = MinddyConfig::default();
        config.telegram.bot_username = "  ".to_string();
        assert!(config.validate().is_err());
    }

    fn env_with(vars: &[(&str, &str)]) -> Environment {
        let map = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(map))
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("minddy.toml");
        std::fs::write(
            &path,
            r#"
            [api]
            base_url = "https://file.minddy.example"

            [telegram]
            bot_username = "file_bot"
            "#,
        )
        .unwrap();

        let config = MinddyConfig::load_with_env(
            path.to_str().unwrap(),
            env_with(&[("MINDDY_API__BASE_URL", "https://env.minddy.example")]),
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://env.minddy.example");
        assert_eq!(config.telegram.bot_username, "file_bot");
    }

    #[test]
    fn test_env_fills_sections_missing_from_file() {
        let config = MinddyConfig::load_with_env(
            "/nonexistent/minddy-config-for-tests",
            env_with(&[
                ("MINDDY_TELEGRAM__BOT_USERNAME", "env_bot"),
                ("OTHER_API__BASE_URL", "ftp://ignored"),
            ]),
        )
        .unwrap();

        assert_eq!(config.telegram.bot_username, "env_bot");
        assert_eq!(config.api.base_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_env_value_is_validated() {
        let result = MinddyConfig::load_with_env(
            "/nonexistent/minddy-config-for-tests",
            env_with(&[("MINDDY_API__BASE_URL", "localhost:8081")]),
        );
        assert!(matches!(result, Err(MinddyError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let config = MinddyConfig::load("/nonexistent/minddy-config-for-tests")
            .expect("missing config file should be optional");
        assert!(!config.api.base_url.is_empty());
    }

    #[test]
    fn test_session_path_expands_tilde() {
        let session = SessionConfig {
            path: "~/.minddy/session.json".to_string(),
        };
        let resolved = session.resolved_path();
        assert!(!resolved.to_string_lossy().starts_with('~'));
        assert!(resolved.ends_with(".minddy/session.json"));
    }
}
