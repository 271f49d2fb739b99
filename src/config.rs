//! Configuration management for Askdoc
//!
//! This module handles loading, parsing, and validating configuration
//! from a YAML file, with environment overrides for the backend address.

use crate::error::{AskdocError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Main configuration structure for Askdoc
///
/// Holds everything the client needs: where the backend lives and how
/// the chat session should behave.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend endpoint configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Chat behavior configuration
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Backend endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the chat backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout for REST calls (seconds)
    ///
    /// Does not apply to the answer stream, which is bounded by the
    /// idle timeout in [`ChatConfig`] instead.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl BackendConfig {
    /// Parsed base URL, normalized to end with a slash so endpoint paths
    /// join underneath it instead of replacing the last segment.
    pub fn base_url(&self) -> Result<Url> {
        let mut raw = self.base_url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw)?;
        Ok(url)
    }

    /// Per-request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Chat behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Number of messages a signed-out user may send before the client
    /// requires sign-in. The guard fires on the limit-th message.
    #[serde(default = "default_guest_message_limit")]
    pub guest_message_limit: u32,

    /// How long the answer stream may stay silent before the connection
    /// is torn down as failed (seconds)
    #[serde(default = "default_stream_idle_timeout")]
    pub stream_idle_timeout_seconds: u64,

    /// Start chat sessions with web search enabled
    #[serde(default)]
    pub search_mode: bool,
}

fn default_guest_message_limit() -> u32 {
    5
}

fn default_stream_idle_timeout() -> u64 {
    120
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            guest_message_limit: default_guest_message_limit(),
            stream_idle_timeout_seconds: default_stream_idle_timeout(),
            search_mode: false,
        }
    }
}

impl ChatConfig {
    /// Stream idle timeout as a [`Duration`]
    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_idle_timeout_seconds)
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// A missing file is not an error: defaults are used so the client
    /// works out of the box against a local backend. The `ASKDOC_API_URL`
    /// environment variable overrides the configured base URL either way.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Examples
    ///
    /// ```
    /// use askdoc::config::Config;
    ///
    /// let config = Config::load("does/not/exist.yaml").unwrap();
    /// assert_eq!(config.chat.guest_message_limit, 5);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut config: Config = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|e| {
                AskdocError::Config(format!("failed to read {}: {}", path.display(), e))
            })?;
            serde_yaml::from_str(&contents).map_err(|e| {
                AskdocError::Config(format!("failed to parse {}: {}", path.display(), e))
            })?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Config::default()
        };

        if let Ok(override_url) = std::env::var("ASKDOC_API_URL") {
            tracing::info!("Using API base URL override from environment");
            config.backend.base_url = override_url;
        }

        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `AskdocError::Config` if the base URL does not parse, a
    /// timeout is zero, or the guest message limit is zero.
    pub fn validate(&self) -> Result<()> {
        self.backend
            .base_url()
            .map_err(|e| AskdocError::Config(format!("invalid backend.base_url: {}", e)))?;

        if self.backend.request_timeout_seconds == 0 {
            return Err(
                AskdocError::Config("backend.request_timeout_seconds must be > 0".into()).into(),
            );
        }

        if self.chat.stream_idle_timeout_seconds == 0 {
            return Err(
                AskdocError::Config("chat.stream_idle_timeout_seconds must be > 0".into()).into(),
            );
        }

        if self.chat.guest_message_limit == 0 {
            return Err(AskdocError::Config("chat.guest_message_limit must be > 0".into()).into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.backend.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.chat.guest_message_limit, 5);
        assert_eq!(config.chat.stream_idle_timeout_seconds, 120);
        assert!(!config.chat.search_mode);
    }

    #[test]
    #[serial]
    fn test_load_missing_file_uses_defaults() {
        std::env::remove_var("ASKDOC_API_URL");
        let config = Config::load("definitely/not/here.yaml").unwrap();
        assert_eq!(config.backend.base_url, default_base_url());
    }

    #[test]
    #[serial]
    fn test_load_partial_yaml_fills_defaults() {
        std::env::remove_var("ASKDOC_API_URL");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "backend:\n  base_url: \"https://chat.example.com\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.backend.base_url, "https://chat.example.com");
        // Unspecified sections keep their defaults.
        assert_eq!(config.backend.request_timeout_seconds, 30);
        assert_eq!(config.chat.guest_message_limit, 5);
    }

    #[test]
    #[serial]
    fn test_env_override_wins_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "backend:\n  base_url: \"https://chat.example.com\"").unwrap();

        std::env::set_var("ASKDOC_API_URL", "https://other.example.com");
        let config = Config::load(file.path()).unwrap();
        std::env::remove_var("ASKDOC_API_URL");

        assert_eq!(config.backend.base_url, "https://other.example.com");
    }

    #[test]
    fn test_load_invalid_yaml_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "backend: [not, a, mapping").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = Config {
            backend: BackendConfig {
                base_url: "not a url".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut config = Config::default();
        config.backend.request_timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.chat.stream_idle_timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_guest_limit() {
        let mut config = Config::default();
        config.chat.guest_message_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_url_gains_trailing_slash() {
        let backend = BackendConfig {
            base_url: "http://host:8000/api".into(),
            ..Default::default()
        };
        let url = backend.base_url().unwrap();
        assert_eq!(url.as_str(), "http://host:8000/api/");
        // Endpoint paths join underneath, not beside, the base path.
        assert_eq!(
            url.join("chat/sessions").unwrap().as_str(),
            "http://host:8000/api/chat/sessions"
        );
    }
}
