//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Configuration for motorchat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// WebSocket endpoint of the chat namespace
    pub server_url: Option<String>,
    /// Root of the chat-bot REST API
    pub api_url: Option<String>,
    /// Bearer token (alternative to the MOTORCHAT_TOKEN env var)
    pub token: Option<String>,
    /// Numeric user id attached to outbound messages
    pub user_id: Option<u64>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("motorchat")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        // Check for MOTORCHAT_CONFIG_PATH env var first
        if let Ok(path) = std::env::var("MOTORCHAT_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        let dir = path.parent().unwrap();
        fs::create_dir_all(dir)?;

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            server_url: Some("ws://localhost:3001/chat".to_string()),
            api_url: Some("http://localhost:3001/api/v1/chat-bot".to_string()),
            token: None,
            user_id: None,
        };

        default_config.save()?;
        Ok(path)
    }

    /// Get the bearer token, checking config then env
    pub fn get_token(&self) -> Option<String> {
        if self.token.is_some() {
            return self.token.clone();
        }
        std::env::var("MOTORCHAT_TOKEN").ok()
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# motorchat configuration file
# Place at ~/.config/motorchat/config.toml (Linux/Mac) or %APPDATA%\motorchat\config.toml (Windows)

# WebSocket endpoint of the chat namespace
server_url = "ws://localhost:3001/chat"

# Root of the chat-bot REST API
api_url = "http://localhost:3001/api/v1/chat-bot"

# Numeric user id attached to outbound messages
user_id = 52

# Bearer token (optional - the MOTORCHAT_TOKEN environment variable
# is recommended instead for security)
# token = "eyJ..."
"#
}
