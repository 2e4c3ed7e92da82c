//! Configuration Loader - File Loading, Env Overrides and Validation
//!
//! Resolution order: serde defaults, then `config.toml` (if present),
//! then environment variables. The result is validated before the
//! service starts.

use std::path::Path;

use anyhow::{Context, Result};

use super::AppConfig;

/// Load configuration from `path` and the process environment.
///
/// A missing file is not an error: defaults plus environment are used.
///
/// # Errors
/// Returns detailed error if:
/// - The file exists but can't be read
/// - TOML parsing fails
/// - An environment override has the wrong type
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let mut config = if path.exists() {
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)?
  } else {
    AppConfig::default()
  };

  apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
  validate_config(&config)?;

  Ok(config)
}

/// Parse TOML content into a config (no env, no validation).
pub fn parse_config(content: &str) -> Result<AppConfig> {
  toml::from_str(content).context("Failed to parse config.toml")
}

/// Apply environment overrides using `lookup` to read variables.
///
/// Recognised: `HOST`, `PORT`, `CORS_ORIGIN`, `LOG_LEVEL`,
/// `DATABASE_URL`, `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`,
/// `CLOUDINARY_API_SECRET`, `CLOUDINARY_API_BASE_URL`.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<()>
where
  F: Fn(&str) -> Option<String>,
{
  let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

  if let Some(host) = get("HOST") {
    config.server.host = host;
  }
  if let Some(port) = get("PORT") {
    config.server.port = port
      .trim()
      .parse()
      .with_context(|| format!("PORT must be a port number, got {port:?}"))?;
  }
  if let Some(origin) = get("CORS_ORIGIN") {
    config.server.cors_origin = origin;
  }
  if let Some(level) = get("LOG_LEVEL") {
    config.server.log_level = level;
  }
  if let Some(url) = get("DATABASE_URL") {
    config.persistence.database_url = Some(url);
  }
  if let Some(name) = get("CLOUDINARY_CLOUD_NAME") {
    config.media.cloud_name = Some(name);
  }
  if let Some(key) = get("CLOUDINARY_API_KEY") {
    config.media.api_key = Some(key);
  }
  if let Some(secret) = get("CLOUDINARY_API_SECRET") {
    config.media.api_secret = Some(secret);
  }
  if let Some(base) = get("CLOUDINARY_API_BASE_URL") {
    config.media.api_base_url = base;
  }

  Ok(())
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(config.server.port > 0, "server.port must be non-zero");
  anyhow::ensure!(
    !config.server.cors_origin.trim().is_empty(),
    "server.cors_origin must not be empty"
  );
  anyhow::ensure!(
    config.server.body_limit_bytes > 0,
    "server.body_limit_bytes must be positive"
  );

  anyhow::ensure!(
    config.persistence.max_connections > 0,
    "persistence.max_connections must be positive"
  );
  if config.persistence.require_database {
    anyhow::ensure!(
      config.persistence.database_url.is_some(),
      "persistence.require_database is set but no database_url is configured"
    );
  }

  anyhow::ensure!(
    url::Url::parse(&config.media.api_base_url).is_ok(),
    "media.api_base_url is not a valid URL: {}",
    config.media.api_base_url
  );
  anyhow::ensure!(
    config.media.request_timeout_secs > 0,
    "media.request_timeout_secs must be positive"
  );

  anyhow::ensure!(
    config.validation.notes_max_chars > 0,
    "validation.notes_max_chars must be positive"
  );

  Ok(())
}
