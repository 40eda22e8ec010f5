//! Configuration loader and validator for the Optica CMS backend.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub site: Site,
    pub mailer: Mailer,
    pub instagram: Instagram,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    pub poll_interval_ms: u64,
    pub max_backoff_seconds: u64,
}

/// Public-site presentation settings consumed by the rendering layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Site {
    pub carousel_interval_ms: u64,
}

/// Transactional email provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mailer {
    pub api_token: String,
    pub from_address: String,
    pub contact_recipient: String,
}

/// Instagram Graph API settings for feed mirroring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Instagram {
    pub access_token: String,
    pub user_id: String,
    pub mirror_limit: u32,
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.poll_interval_ms == 0 {
        return Err(ConfigError::Invalid("app.poll_interval_ms must be > 0"));
    }
    // max_backoff_seconds is u64; it's inherently >= 0

    if cfg.site.carousel_interval_ms == 0 {
        return Err(ConfigError::Invalid("site.carousel_interval_ms must be > 0"));
    }

    if cfg.mailer.api_token.trim().is_empty() {
        return Err(ConfigError::Invalid("mailer.api_token must be non-empty"));
    }
    if cfg.mailer.from_address.trim().is_empty() {
        return Err(ConfigError::Invalid("mailer.from_address must be non-empty"));
    }
    if cfg.mailer.contact_recipient.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "mailer.contact_recipient must be non-empty",
        ));
    }

    if cfg.instagram.access_token.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "instagram.access_token must be non-empty",
        ));
    }
    if cfg.instagram.user_id.trim().is_empty() {
        return Err(ConfigError::Invalid("instagram.user_id must be non-empty"));
    }
    if cfg.instagram.mirror_limit == 0 || cfg.instagram.mirror_limit > 50 {
        return Err(ConfigError::Invalid(
            "instagram.mirror_limit must be in 1..=50",
        ));
    }

    Ok(())
}

/// Canonical example configuration, kept in sync with the YAML schema above.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  poll_interval_ms: 500
  max_backoff_seconds: 60

site:
  carousel_interval_ms: 5000

mailer:
  api_token: "YOUR_EMAIL_PROVIDER_TOKEN"
  from_address: "noreply@optica.example"
  contact_recipient: "owner@optica.example"

instagram:
  access_token: "YOUR_INSTAGRAM_GRAPH_TOKEN"
  user_id: "17841400000000000"
  mirror_limit: 12
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
    }

    #[test]
    fn invalid_mailer_token() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.mailer.api_token = "".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("mailer.api_token")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn invalid_intervals() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.poll_interval_ms = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.site.carousel_interval_ms = 0;
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("carousel_interval_ms")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn invalid_instagram_settings() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.instagram.user_id = "".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("instagram.user_id")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.instagram.mirror_limit = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.instagram.mirror_limit = 51;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn ensure_dirs_creates_data_dir() {
        let td = tempdir().unwrap();
        let data_path = td.path().join("data");
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = data_path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(data_path.exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        let mut f = fs::File::create(&p).unwrap();
        f.write_all(example().as_bytes()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.site.carousel_interval_ms, 5000);
    }
}
