//! Configuration Module - TOML-based Service Configuration
//!
//! Loads `config.toml` (optional) and applies environment variable
//! overrides, with `.env` files honoured at startup. Every section has
//! serde defaults, so an empty file is a valid development setup: port
//! 4000, permissive CORS and the in-memory store.
//!
//! Media host credentials are normally supplied through the environment
//! and are redacted from `Debug` output.

pub mod loader;

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::validation::{DEFAULT_NOTES_MAX_CHARS, ValidationRules};

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
  /// HTTP listener, CORS and logging.
  #[serde(default)]
  pub server: ServerConfig,
  /// Document store connection.
  #[serde(default)]
  pub persistence: PersistenceConfig,
  /// External media host (screenshots).
  #[serde(default)]
  pub media: MediaConfig,
  /// Payload validation limits.
  #[serde(default)]
  pub validation: ValidationConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  /// Bind host.
  #[serde(default = "default_host")]
  pub host: String,
  /// Listening port.
  #[serde(default = "default_port")]
  pub port: u16,
  /// Allowed CORS origin; `*` allows any origin (without credentials).
  #[serde(default = "default_cors_origin")]
  pub cors_origin: String,
  /// Maximum accepted request body size.
  #[serde(default = "default_body_limit")]
  pub body_limit_bytes: usize,
  /// Log level (trace, debug, info, warn, error) when RUST_LOG is unset.
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Emit JSON log lines instead of human-readable output.
  #[serde(default = "default_true")]
  pub log_json: bool,
  /// Hard cutoff for draining connections on shutdown.
  #[serde(default = "default_shutdown_timeout")]
  pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
  /// `host:port` for the listener.
  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.host, self.port)
  }

  pub fn shutdown_timeout(&self) -> Duration {
    Duration::from_secs(self.shutdown_timeout_secs)
  }
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host: default_host(),
      port: default_port(),
      cors_origin: default_cors_origin(),
      body_limit_bytes: default_body_limit(),
      log_level: default_log_level(),
      log_json: default_true(),
      shutdown_timeout_secs: default_shutdown_timeout(),
    }
  }
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
  /// Postgres connection string. Unset means in-memory storage.
  #[serde(default)]
  pub database_url: Option<String>,
  /// Pool size.
  #[serde(default = "default_max_connections")]
  pub max_connections: u32,
  /// How long to wait for a connection at startup (seconds).
  #[serde(default = "default_connect_timeout")]
  pub connect_timeout_secs: u64,
  /// Refuse to start when the database is configured but unreachable,
  /// instead of falling back to memory.
  #[serde(default)]
  pub require_database: bool,
}

impl PersistenceConfig {
  pub fn connect_timeout(&self) -> Duration {
    Duration::from_secs(self.connect_timeout_secs)
  }
}

impl Default for PersistenceConfig {
  fn default() -> Self {
    Self {
      database_url: None,
      max_connections: default_max_connections(),
      connect_timeout_secs: default_connect_timeout(),
      require_database: false,
    }
  }
}

/// Media host configuration.
#[derive(Clone, Deserialize)]
pub struct MediaConfig {
  /// Account (cloud) name.
  #[serde(default)]
  pub cloud_name: Option<String>,
  /// Public API key.
  #[serde(default)]
  pub api_key: Option<String>,
  /// API secret (never logged, never sent over the wire).
  #[serde(default)]
  pub api_secret: Option<String>,
  /// API root, e.g. `https://api.cloudinary.com`.
  #[serde(default = "default_media_base_url")]
  pub api_base_url: String,
  /// Upload folder used when the client does not ask for one.
  #[serde(default = "default_folder")]
  pub default_folder: String,
  /// Deadline for a single deletion call (seconds).
  #[serde(default = "default_media_timeout")]
  pub request_timeout_secs: u64,
}

/// Complete credential set for signing media host requests.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaCredentials {
  pub cloud_name: String,
  pub api_key: String,
  pub api_secret: String,
}

impl fmt::Debug for MediaCredentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MediaCredentials")
      .field("cloud_name", &self.cloud_name)
      .field("api_key", &self.api_key)
      .field("api_secret", &"<redacted>")
      .finish()
  }
}

impl MediaConfig {
  /// All three credentials, if every one of them is set and non-empty.
  pub fn credentials(&self) -> Option<MediaCredentials> {
    let present = |v: &Option<String>| {
      v.as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
    };
    Some(MediaCredentials {
      cloud_name: present(&self.cloud_name)?,
      api_key: present(&self.api_key)?,
      api_secret: present(&self.api_secret)?,
    })
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs)
  }
}

impl fmt::Debug for MediaConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MediaConfig")
      .field("cloud_name", &self.cloud_name)
      .field("api_key", &self.api_key)
      .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
      .field("api_base_url", &self.api_base_url)
      .field("default_folder", &self.default_folder)
      .field("request_timeout_secs", &self.request_timeout_secs)
      .finish()
  }
}

impl Default for MediaConfig {
  fn default() -> Self {
    Self {
      cloud_name: None,
      api_key: None,
      api_secret: None,
      api_base_url: default_media_base_url(),
      default_folder: default_folder(),
      request_timeout_secs: default_media_timeout(),
    }
  }
}

/// Payload validation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
  /// Maximum `notes` length in characters.
  #[serde(default = "default_notes_max_chars")]
  pub notes_max_chars: usize,
}

impl ValidationConfig {
  pub fn rules(&self) -> ValidationRules {
    ValidationRules {
      notes_max_chars: self.notes_max_chars,
    }
  }
}

impl Default for ValidationConfig {
  fn default() -> Self {
    Self {
      notes_max_chars: default_notes_max_chars(),
    }
  }
}

// Default value functions for serde

fn default_host() -> String {
  "0.0.0.0".to_string()
}

fn default_port() -> u16 {
  4000
}

fn default_cors_origin() -> String {
  "*".to_string()
}

fn default_body_limit() -> usize {
  1_048_576 // 1 MiB
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_shutdown_timeout() -> u64 {
  10
}

fn default_max_connections() -> u32 {
  10
}

fn default_connect_timeout() -> u64 {
  5
}

fn default_media_base_url() -> String {
  "https://api.cloudinary.com".to_string()
}

fn default_folder() -> String {
  "trades".to_string()
}

fn default_media_timeout() -> u64 {
  10
}

fn default_notes_max_chars() -> usize {
  DEFAULT_NOTES_MAX_CHARS
}
