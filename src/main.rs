use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;

use newsmap::cache::{CacheRepositoryBuilder, RepositoryFactory};
use newsmap::scraper::Scraper;
use newsmap::server::AppState;
use newsmap::{config, logging, server};

#[derive(Parser, Debug)]
#[command(name = "newsmap")]
#[command(about = "Serves the latest news-listing items from a bounded in-memory cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./newsmap.yaml, then $XDG_CONFIG_HOME/newsmap/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let config = config::Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config)?;

  tracing::info!("server is starting");

  // Startup hook: one factory registration, one builder invocation. A
  // construction failure here is fatal; the process serves no traffic.
  let mut factory = RepositoryFactory::new();
  factory.register("memory", Box::new(CacheRepositoryBuilder::new()));
  let repo = factory.create("memory", config.memory_depth)?;

  let scraper = Scraper::new(config.target_fqdn.clone(), config.memory_depth);

  // First scrape before accepting requests; a NoUpdate leaves the cache empty
  // until the first successful request-time refresh.
  repo.replace(scraper.scrape().await).await;

  let state = Arc::new(AppState {
    repo: Arc::clone(&repo),
    scraper,
    memory_depth: config.memory_depth,
  });

  let addr = format!("{}:{}", config.host, config.port);
  let listener = tokio::net::TcpListener::bind(&addr).await?;
  tracing::info!("listening on http://{addr}");

  axum::serve(listener, server::router(state))
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  // Shutdown hook: close the repository exactly once. Nothing after this
  // point may block process exit.
  tracing::info!("server is shutting down");
  repo.close().await;

  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!("failed to listen for shutdown signal: {e}");
  }
}
