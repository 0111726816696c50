//! newsmap is a small HTTP service that keeps the most recent items from an
//! external news-listing page in a bounded in-memory cache and serves them
//! through one sorted, paginated endpoint.
//!
//! The core pipeline is scrape → wholesale cache replace → sort/slice. The
//! cache repository is built once at startup through a factory/builder pair
//! and closed exactly once at shutdown.

pub mod cache;
pub mod config;
pub mod logging;
pub mod scraper;
pub mod server;
