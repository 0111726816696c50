//! Repository lifecycle around the news cache.
//!
//! A repository owns exactly one cache for the lifetime of the process. It is
//! created once during startup through the factory, shared by reference into
//! the request handlers, and closed exactly once on shutdown. The cache sits
//! behind a `tokio::sync::RwLock` because axum handlers run on a preemptive
//! multi-threaded runtime, so `replace` and `read` need explicit mutual
//! exclusion.

use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

use super::factory::FactoryError;
use super::store::NewsCache;
use crate::scraper::{Item, ScrapeOutcome};

/// Builder for one kind of repository.
///
/// Builders are registered in the [`RepositoryFactory`](super::RepositoryFactory)
/// and memoize the repository they produce: the first `build` call constructs
/// the instance, every later call returns that same instance and ignores its
/// arguments.
pub trait RepositoryBuilder: Send + Sync {
  fn build(&self, capacity: usize) -> Result<Arc<CacheRepository>, FactoryError>;
}

/// Owner of one [`NewsCache`] for the process lifetime.
#[derive(Debug)]
pub struct CacheRepository {
  cache: RwLock<NewsCache>,
}

impl CacheRepository {
  fn new(cache: NewsCache) -> Self {
    Self {
      cache: RwLock::new(cache),
    }
  }

  /// Configured capacity of the underlying cache.
  pub async fn capacity(&self) -> usize {
    self.cache.read().await.capacity()
  }

  pub async fn len(&self) -> usize {
    self.cache.read().await.len()
  }

  /// Apply one scrape outcome to the cache (see [`NewsCache::replace`]).
  pub async fn replace(&self, outcome: ScrapeOutcome) {
    self.cache.write().await.replace(outcome);
  }

  /// Positional read `[start, end)` (see [`NewsCache::read`]).
  pub async fn read(&self, start: usize, end: usize) -> Option<Vec<Item>> {
    self.cache.read().await.read(start, end)
  }

  /// Read everything currently held, in cache order.
  pub async fn snapshot(&self) -> Option<Vec<Item>> {
    let cache = self.cache.read().await;
    cache.read(0, cache.capacity())
  }

  /// Release the repository, clearing the cache. Closing an already-closed
  /// repository is safe and does nothing further.
  pub async fn close(&self) {
    self.cache.write().await.clear();
    tracing::debug!("cache repository closed");
  }
}

/// Memoizing builder for the in-memory cache repository.
pub struct CacheRepositoryBuilder {
  instance: Mutex<Option<Arc<CacheRepository>>>,
}

impl CacheRepositoryBuilder {
  pub fn new() -> Self {
    Self {
      instance: Mutex::new(None),
    }
  }

  /// Construct the underlying cache resource.
  fn connect(capacity: usize) -> Result<NewsCache, FactoryError> {
    NewsCache::with_capacity(capacity).map_err(FactoryError::Connection)
  }
}

impl Default for CacheRepositoryBuilder {
  fn default() -> Self {
    Self::new()
  }
}

impl RepositoryBuilder for CacheRepositoryBuilder {
  fn build(&self, capacity: usize) -> Result<Arc<CacheRepository>, FactoryError> {
    let mut slot = self
      .instance
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(existing) = slot.as_ref() {
      // Memoized: later calls return the first instance, arguments ignored
      return Ok(Arc::clone(existing));
    }

    let repo = Arc::new(CacheRepository::new(Self::connect(capacity)?));
    *slot = Some(Arc::clone(&repo));
    Ok(repo)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  fn batch(ids: &[&str]) -> ScrapeOutcome {
    ScrapeOutcome::Batch(
      ids
        .iter()
        .map(|id| Item {
          id: id.to_string(),
          title: String::new(),
          url: String::new(),
          now: Utc::now(),
        })
        .collect(),
    )
  }

  #[test]
  fn test_builder_memoizes_first_instance() {
    let builder = CacheRepositoryBuilder::new();

    let first = builder.build(5).unwrap();
    // Different arguments are ignored once an instance exists
    let second = builder.build(99).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
  }

  #[test]
  fn test_builder_rejects_zero_capacity() {
    let builder = CacheRepositoryBuilder::new();
    assert!(matches!(
      builder.build(0),
      Err(FactoryError::Connection(_))
    ));
  }

  #[tokio::test]
  async fn test_close_clears_and_is_idempotent() {
    let builder = CacheRepositoryBuilder::new();
    let repo = builder.build(5).unwrap();

    repo.replace(batch(&["1", "2"])).await;
    assert_eq!(repo.len().await, 2);

    repo.close().await;
    assert_eq!(repo.len().await, 0);

    // Second close is safe
    repo.close().await;
    assert_eq!(repo.len().await, 0);
  }
}
