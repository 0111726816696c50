//! Log sink selection and formatting.
//!
//! The console sink is always installed. Depending on `log_handler`, a second
//! sink is added: a non-blocking file appender, or a JSON-over-TCP stream to
//! a logstash collector.

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use std::net::TcpStream;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, ConfigError, LogHandler};

/// Keeps the background log writer alive for the process lifetime. Dropping
/// it flushes and stops the file appender.
pub struct LogGuard {
  _file: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Install the global subscriber according to `config`.
pub fn init(config: &Config) -> Result<LogGuard> {
  let filter = EnvFilter::try_new(&config.logging_level)
    .map_err(|e| eyre!("invalid logging_level {:?}: {}", config.logging_level, e))?;
  let console = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

  match config.log_handler {
    LogHandler::Console => {
      tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .init();
      Ok(LogGuard { _file: None })
    }
    LogHandler::File => {
      let path = config
        .path_to_log
        .as_ref()
        .ok_or(ConfigError::MissingKey("path_to_log"))?;
      let directory = path.parent().unwrap_or_else(|| std::path::Path::new("."));
      let file_name = path
        .file_name()
        .ok_or_else(|| eyre!("path_to_log {:?} has no file name", path))?;
      std::fs::create_dir_all(directory)
        .wrap_err_with(|| format!("failed to create log directory {}", directory.display()))?;

      let appender = tracing_appender::rolling::never(directory, file_name);
      let (writer, guard) = tracing_appender::non_blocking(appender);
      tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(
          tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false),
        )
        .init();
      Ok(LogGuard { _file: Some(guard) })
    }
    LogHandler::Stash => {
      let host = config
        .logging_logstash_host
        .as_ref()
        .ok_or(ConfigError::MissingKey("logging_logstash_host"))?;
      let port = config
        .logging_logstash_port
        .ok_or(ConfigError::MissingKey("logging_logstash_port"))?;
      let stream = TcpStream::connect((host.as_str(), port))
        .wrap_err_with(|| format!("failed to connect to logstash at {host}:{port}"))?;

      tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(
          tracing_subscriber::fmt::layer()
            .json()
            .with_writer(Mutex::new(stream)),
        )
        .init();
      Ok(LogGuard { _file: None })
    }
  }
}
