//! Flat configuration, merged from a YAML file and the environment.
//!
//! Environment variables take precedence over file values. Environment keys
//! carry the fixed `nmap_` prefix, which is stripped before matching (e.g.
//! `nmap_memory_depth=30` sets `memory_depth`).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file {path}: {source}")]
  Read {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("failed to parse config file {path}: {source}")]
  Parse {
    path: PathBuf,
    source: serde_yaml::Error,
  },
  #[error("missing required configuration key {0:?}")]
  MissingKey(&'static str),
  #[error("invalid value {value:?} for configuration key {key:?}")]
  InvalidValue { key: &'static str, value: String },
  #[error("config file not found: {0}")]
  FileNotFound(PathBuf),
}

/// Which sink gets log records in addition to the console.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogHandler {
  /// Console only
  #[default]
  Console,
  /// Console plus a log file at `path_to_log`
  File,
  /// Console plus JSON events over TCP to a logstash collector
  #[serde(alias = "logstash")]
  Stash,
}

/// Validated application configuration.
#[derive(Debug, Clone)]
pub struct Config {
  /// Cache capacity; also the per-scrape item limit
  pub memory_depth: usize,
  pub host: String,
  pub port: u16,
  /// URL of the news-listing page to scrape
  pub target_fqdn: String,
  pub log_handler: LogHandler,
  pub path_to_log: Option<PathBuf>,
  pub logging_level: String,
  pub logging_logstash_host: Option<String>,
  pub logging_logstash_port: Option<u16>,
}

/// Raw key/value view of the config sources, before validation. Every field
/// is optional here so the file and the environment can each contribute a
/// subset.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
  memory_depth: Option<usize>,
  host: Option<String>,
  port: Option<u16>,
  target_fqdn: Option<String>,
  log_handler: Option<LogHandler>,
  path_to_log: Option<PathBuf>,
  logging_level: Option<String>,
  logging_logstash_host: Option<String>,
  logging_logstash_port: Option<u16>,
}

/// Prefix stripped from environment keys.
const ENV_PREFIX: &str = "nmap_";

impl Config {
  /// Load configuration.
  ///
  /// Search order for the file:
  /// 1. Explicit path if provided (an error if it does not exist)
  /// 2. ./newsmap.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/newsmap/config.yaml
  ///
  /// A missing file is not fatal as long as the environment supplies every
  /// required key.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
    let path = match explicit_path {
      Some(p) if p.exists() => Some(p.to_path_buf()),
      Some(p) => return Err(ConfigError::FileNotFound(p.to_path_buf())),
      None => Self::find_config_file(),
    };

    let mut raw = match path {
      Some(p) => Self::read_file(&p)?,
      None => RawConfig::default(),
    };
    raw.apply_env(std::env::vars())?;
    raw.finish()
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("newsmap.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("newsmap").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }
}

impl RawConfig {
  /// Overlay values from the environment. Keys without the `nmap_` prefix are
  /// ignored; unknown prefixed keys are ignored too, matching the flat-mapping
  /// behavior of a plain environment merge.
  fn apply_env(&mut self, vars: impl Iterator<Item = (String, String)>) -> Result<(), ConfigError> {
    for (key, value) in vars {
      let Some(key) = key.strip_prefix(ENV_PREFIX) else {
        continue;
      };
      match key {
        "memory_depth" => self.memory_depth = Some(parse_env("memory_depth", &value)?),
        "host" => self.host = Some(value),
        "port" => self.port = Some(parse_env("port", &value)?),
        "target_fqdn" => self.target_fqdn = Some(value),
        "log_handler" => {
          self.log_handler = Some(match value.as_str() {
            "file" => LogHandler::File,
            "stash" | "logstash" => LogHandler::Stash,
            _ => LogHandler::Console,
          })
        }
        "path_to_log" => self.path_to_log = Some(PathBuf::from(value)),
        "logging_level" => self.logging_level = Some(value),
        "logging_logstash_host" => self.logging_logstash_host = Some(value),
        "logging_logstash_port" => {
          self.logging_logstash_port = Some(parse_env("logging_logstash_port", &value)?)
        }
        _ => {}
      }
    }
    Ok(())
  }

  /// Validate the merged view into a [`Config`].
  fn finish(self) -> Result<Config, ConfigError> {
    let memory_depth = self
      .memory_depth
      .ok_or(ConfigError::MissingKey("memory_depth"))?;
    if memory_depth == 0 {
      return Err(ConfigError::InvalidValue {
        key: "memory_depth",
        value: "0".to_string(),
      });
    }

    let log_handler = self.log_handler.unwrap_or_default();
    // The selected sink decides which further keys are required; a missing
    // one is fatal at startup.
    match log_handler {
      LogHandler::File if self.path_to_log.is_none() => {
        return Err(ConfigError::MissingKey("path_to_log"));
      }
      LogHandler::Stash if self.logging_logstash_host.is_none() => {
        return Err(ConfigError::MissingKey("logging_logstash_host"));
      }
      LogHandler::Stash if self.logging_logstash_port.is_none() => {
        return Err(ConfigError::MissingKey("logging_logstash_port"));
      }
      _ => {}
    }

    let target_fqdn = self
      .target_fqdn
      .unwrap_or_else(|| "https://news.ycombinator.com/news".to_string());
    if url::Url::parse(&target_fqdn).is_err() {
      return Err(ConfigError::InvalidValue {
        key: "target_fqdn",
        value: target_fqdn,
      });
    }

    Ok(Config {
      memory_depth,
      host: self.host.unwrap_or_else(|| "127.0.0.1".to_string()),
      port: self.port.unwrap_or(8080),
      target_fqdn,
      log_handler,
      path_to_log: self.path_to_log,
      logging_level: self.logging_level.unwrap_or_else(|| "info".to_string()),
      logging_logstash_host: self.logging_logstash_host,
      logging_logstash_port: self.logging_logstash_port,
    })
  }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
  value.parse().map_err(|_| ConfigError::InvalidValue {
    key,
    value: value.to_string(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect()
  }

  #[test]
  fn test_env_overrides_file_values() {
    let mut raw = RawConfig {
      memory_depth: Some(5),
      ..RawConfig::default()
    };
    raw
      .apply_env(env(&[("nmap_memory_depth", "30")]).into_iter())
      .unwrap();

    let config = raw.finish().unwrap();
    assert_eq!(config.memory_depth, 30);
  }

  #[test]
  fn test_unprefixed_env_keys_are_ignored() {
    let mut raw = RawConfig {
      memory_depth: Some(5),
      ..RawConfig::default()
    };
    raw
      .apply_env(env(&[("memory_depth", "30"), ("PATH", "/usr/bin")]).into_iter())
      .unwrap();

    assert_eq!(raw.finish().unwrap().memory_depth, 5);
  }

  #[test]
  fn test_missing_memory_depth_is_fatal() {
    let raw = RawConfig::default();
    assert!(matches!(
      raw.finish(),
      Err(ConfigError::MissingKey("memory_depth"))
    ));
  }

  #[test]
  fn test_zero_memory_depth_is_rejected() {
    let raw = RawConfig {
      memory_depth: Some(0),
      ..RawConfig::default()
    };
    assert!(matches!(raw.finish(), Err(ConfigError::InvalidValue { .. })));
  }

  #[test]
  fn test_file_handler_requires_path_to_log() {
    let raw = RawConfig {
      memory_depth: Some(5),
      log_handler: Some(LogHandler::File),
      ..RawConfig::default()
    };
    assert!(matches!(
      raw.finish(),
      Err(ConfigError::MissingKey("path_to_log"))
    ));
  }

  #[test]
  fn test_stash_handler_requires_host_and_port() {
    let raw = RawConfig {
      memory_depth: Some(5),
      log_handler: Some(LogHandler::Stash),
      logging_logstash_host: Some("logstash.local".to_string()),
      ..RawConfig::default()
    };
    assert!(matches!(
      raw.finish(),
      Err(ConfigError::MissingKey("logging_logstash_port"))
    ));
  }

  #[test]
  fn test_defaults_applied_for_optional_keys() {
    let raw = RawConfig {
      memory_depth: Some(5),
      ..RawConfig::default()
    };
    let config = raw.finish().unwrap();

    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.port, 8080);
    assert_eq!(config.log_handler, LogHandler::Console);
    assert_eq!(config.logging_level, "info");
  }

  #[test]
  fn test_unparseable_target_fqdn_is_rejected() {
    let raw = RawConfig {
      memory_depth: Some(5),
      target_fqdn: Some("not a url".to_string()),
      ..RawConfig::default()
    };
    assert!(matches!(
      raw.finish(),
      Err(ConfigError::InvalidValue {
        key: "target_fqdn",
        ..
      })
    ));
  }

  #[test]
  fn test_bad_integer_env_value_is_rejected() {
    let mut raw = RawConfig::default();
    let result = raw.apply_env(env(&[("nmap_port", "not-a-port")]).into_iter());
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
  }
}
