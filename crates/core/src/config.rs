//! Server configuration
//!
//! Loaded from TOML. Every section and field is optional; missing values
//! fall back to the defaults below. A handful of environment variables
//! override the file.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::debate::DEFAULT_SEATS;
use crate::error::{Error, Result};

/// File name looked up in the platform config directory
pub const CONFIG_FILE_NAME: &str = "rostrum.toml";

/// Overrides `server.bind`
pub const ENV_BIND: &str = "ROSTRUM_BIND";
/// Overrides `ai.model`
pub const ENV_MODEL: &str = "AI_MODEL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub debate: DebateConfig,
    pub ai: AiConfig,
    /// Channels created at startup
    pub channels: Vec<ChannelSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub max_clients_per_channel: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 7331)),
            max_clients_per_channel: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateConfig {
    /// Ready participants needed to leave the lobby
    pub seats: usize,
    /// Upper bound on one analysis call before the fallback text is used
    pub analysis_timeout_secs: u64,
    /// Per-client outbound queue capacity
    pub outbound_queue_depth: usize,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            seats: DEFAULT_SEATS,
            analysis_timeout_secs: 90,
            outbound_queue_depth: 256,
        }
    }
}

impl DebateConfig {
    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// OpenAI-compatible chat completions endpoint
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub request_timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            model: "deepseek/deepseek-chat-v3.1:free".to_string(),
            max_tokens: 8192,
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl AiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Config(format!("{} is not set", self.api_key_env)))
    }
}

/// A channel to create at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSeed {
    pub name: String,
    #[serde(default)]
    pub secret: String,
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Platform config location, e.g. `~/.config/rostrum/rostrum.toml`
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "onyx", "rostrum")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Resolve configuration: an explicit path must exist; otherwise the
    /// platform file is used when present, else built-in defaults.
    /// Environment overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => {
                    tracing::info!(path = %path.display(), "Loading config");
                    Self::load_file(&path)?
                }
                None => Self::default(),
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment-style overrides from `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(bind) = lookup(ENV_BIND) {
            self.server.bind = bind
                .parse()
                .map_err(|_| Error::Config(format!("{} is not a socket address: {}", ENV_BIND, bind)))?;
        }
        if let Some(model) = lookup(ENV_MODEL).filter(|m| !m.trim().is_empty()) {
            self.ai.model = model;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.debate.seats == 0 {
            return Err(Error::Config("debate.seats must be at least 1".into()));
        }
        if self.debate.outbound_queue_depth == 0 {
            return Err(Error::Config(
                "debate.outbound_queue_depth must be at least 1".into(),
            ));
        }
        if self.server.max_clients_per_channel == 0 {
            return Err(Error::Config(
                "server.max_clients_per_channel must be at least 1".into(),
            ));
        }

        let mut names = HashSet::new();
        for seed in &self.channels {
            if seed.name.trim().is_empty() {
                return Err(Error::Config("channel name must not be empty".into()));
            }
            if !names.insert(seed.name.as_str()) {
                return Err(Error::Config(format!(
                    "channel {} is configured twice",
                    seed.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.server.bind.port(), 7331);
        assert_eq!(config.debate.seats, 2);
        assert_eq!(config.ai.api_key_env, "OPENROUTER_API_KEY");
        assert!(config.channels.is_empty());
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml_str(
            r#"
[debate]
analysis_timeout_secs = 5

[ai]
model = "local/model"

[[channels]]
name = "debate1"
secret = "p1"

[[channels]]
name = "open-floor"
"#,
        )
        .unwrap();

        assert_eq!(config.debate.analysis_timeout(), Duration::from_secs(5));
        assert_eq!(config.debate.outbound_queue_depth, 256);
        assert_eq!(config.ai.model, "local/model");
        assert_eq!(config.ai.max_tokens, 8192);
        assert_eq!(config.channels.len(), 2);
        assert_eq!(config.channels[1].secret, "");
    }

    #[test]
    fn test_rejects_duplicate_channels() {
        let result = Config::from_toml_str(
            r#"
[[channels]]
name = "a"
[[channels]]
name = "a"
"#,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_zero_seats() {
        let result = Config::from_toml_str("[debate]\nseats = 0\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[server]\nbind = \"127.0.0.1:9000\"\n").unwrap();

        let config = Config::load_file(&path).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9000".parse().unwrap());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = Config::load(Some(&temp.path().join("absent.toml")));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(|key| match key {
                ENV_BIND => Some("127.0.0.1:1234".to_string()),
                ENV_MODEL => Some("other/model".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.server.bind.port(), 1234);
        assert_eq!(config.ai.model, "other/model");

        let bad = config.apply_overrides(|key| (key == ENV_BIND).then(|| "nope".to_string()));
        assert!(matches!(bad, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_api_key() {
        let ai = AiConfig {
            api_key_env: "ROSTRUM_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..AiConfig::default()
        };
        assert!(matches!(ai.api_key(), Err(Error::Config(_))));
    }
}
