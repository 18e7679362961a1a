//! Client config load/save for `~/.chatnio/config.yaml`.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::chat::{DEFAULT_MODEL, NEW_CONVERSATION};
use crate::session::{Session, TOKEN_ENV};

/// API section (endpoint, token, token_env).
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ApiSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Environment variable consulted when `token` is absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
}

/// Chat section (model, web, conversation_id).
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChatSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub chat: ChatSection,
}

impl Config {
    /// Build a session: endpoint from the file, token from the file or the
    /// configured environment variable.
    pub fn session(&self) -> Result<Session, ConfigError> {
        let session = Session::new();
        if let Some(endpoint) = &self.api.endpoint {
            session
                .set_endpoint(endpoint)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        match &self.api.token {
            Some(token) => {
                session.set_token(token.clone());
            }
            None => {
                session.set_token_from_env(self.api.token_env.as_deref().unwrap_or(TOKEN_ENV));
            }
        }
        Ok(session)
    }

    pub fn model(&self) -> &str {
        self.chat.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn web(&self) -> bool {
        self.chat.web.unwrap_or(false)
    }

    pub fn conversation_id(&self) -> i64 {
        self.chat.conversation_id.unwrap_or(NEW_CONVERSATION)
    }
}

/// Returns the default config file path: `~/.chatnio/config.yaml` (platform-specific).
pub fn default_config_path() -> Option<PathBuf> {
    let home = home_dir()?;
    Some(home.join(".chatnio").join("config.yaml"))
}

#[cfg(unix)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(windows)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE").map(PathBuf::from)
}

#[cfg(not(any(unix, windows)))]
fn home_dir() -> Option<PathBuf> {
    None
}

/// Load config from a YAML file.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}

/// Load `path` if it exists, otherwise return the defaults.
pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
    if path.exists() {
        load(path)
    } else {
        Ok(Config::default())
    }
}

/// Save config to a YAML file. Creates parent directory if missing.
pub fn save(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Config load/save error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
