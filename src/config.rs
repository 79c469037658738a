//! Runtime configuration for fastgpt-proxy.
//!
//! Non-secret knobs (listen address, upstream URL, timeout, chunking) can be
//! loaded from a JSON file or constructed programmatically. The two API keys
//! only ever come from the command line or the environment.

use std::fmt;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of characters per streamed chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 20;

/// Default upstream request timeout in seconds.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 15;

/// Kagi FastGPT endpoint.
pub const DEFAULT_UPSTREAM_URL: &str = "https://kagi.com/api/v0/fastgpt";

/// Command-line arguments.
#[derive(Parser, Clone)]
#[command(
    name = "fastgpt-proxy",
    about = "OpenAI-compatible streaming proxy for Kagi FastGPT"
)]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address. Overrides the config file.
    #[arg(long, env = "LISTEN_ADDR")]
    pub listen: Option<String>,

    /// Bearer key inbound clients must present.
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Kagi API key used for upstream queries.
    #[arg(long, env = "KAGI_API_KEY", hide_env_values = true)]
    pub kagi_api_key: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,
}

impl fmt::Debug for Cli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cli")
            .field("config", &self.config)
            .field("listen", &self.listen)
            .field("api_key", &redacted(&self.api_key))
            .field("kagi_api_key", &redacted(&self.kagi_api_key))
            .field("verbose", &self.verbose)
            .field("json_logs", &self.json_logs)
            .finish()
    }
}

/// Configuration problems detected before the server starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// Inbound authentication.
    pub auth: AuthConfig,

    /// Upstream answer API.
    pub upstream: UpstreamConfig,

    /// Simulated streaming.
    pub stream: StreamConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:5000").
    pub listen: String,

    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:5000".to_string(),
            max_body_bytes: 2 * 1024 * 1024, // 2 MB
        }
    }
}

/// Inbound bearer-key settings.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Expected bearer key. Never read from or written to the config file.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &redacted(&self.api_key))
            .finish()
    }
}

/// Upstream (Kagi FastGPT) settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// FastGPT endpoint URL.
    pub base_url: String,

    /// Kagi API key. Never read from or written to the config file.
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Per-query timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_URL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_UPSTREAM_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redacted(&self.api_key))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Streaming-emulation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Model identifier reported in chunks and `/v1/models`.
    pub model: String,

    /// Characters per content chunk.
    pub chunk_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            model: "fastgpt".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Build the final configuration: file (or defaults), then CLI/env overrides.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = Self::load(&cli.config)?;
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Overlay command-line and environment values.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(listen) = &cli.listen {
            self.server.listen = listen.clone();
        }
        if cli.api_key.is_some() {
            self.auth.api_key = cli.api_key.clone();
        }
        if cli.kagi_api_key.is_some() {
            self.upstream.api_key = cli.kagi_api_key.clone();
        }
    }

    /// Reject configurations the server cannot safely run with.
    ///
    /// There is no placeholder inbound key: both keys must be set explicitly.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !has_value(&self.auth.api_key) {
            return Err(ConfigError::Missing("API_KEY"));
        }
        if !has_value(&self.upstream.api_key) {
            return Err(ConfigError::Missing("KAGI_API_KEY"));
        }
        if self.stream.chunk_size == 0 {
            return Err(ConfigError::Invalid {
                name: "stream.chunk_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.stream.model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "stream.model",
                reason: "must not be empty".to_string(),
            });
        }
        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "upstream.timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn has_value(key: &Option<String>) -> bool {
    key.as_deref().is_some_and(|k| !k.trim().is_empty())
}

fn redacted(key: &Option<String>) -> &'static str {
    if key.is_some() {
        "<redacted>"
    } else {
        "<unset>"
    }
}
