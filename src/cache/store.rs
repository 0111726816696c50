//! Bounded in-memory store for scraped items.

use thiserror::Error;

use crate::scraper::{Item, ScrapeOutcome};

/// Error raised when a cache cannot be constructed.
#[derive(Debug, Error)]
#[error("cache capacity must be a positive integer, got {0}")]
pub struct CacheInitError(pub usize);

/// Ordered store of items, bounded by the configured `memory_depth`.
///
/// Contents are replaced wholesale on every refresh; order is the order of
/// the last applied batch. The scraper truncates batches to capacity before
/// they reach the cache, so the cache itself never clamps; that boundary is
/// a layering contract, not a second enforcement point.
#[derive(Debug)]
pub struct NewsCache {
  items: Vec<Item>,
  capacity: usize,
}

impl NewsCache {
  /// Create an empty cache bounded by `capacity`.
  pub fn with_capacity(capacity: usize) -> Result<Self, CacheInitError> {
    if capacity == 0 {
      return Err(CacheInitError(capacity));
    }
    Ok(Self {
      items: Vec::with_capacity(capacity),
      capacity,
    })
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  /// Apply one scrape outcome.
  ///
  /// `NoUpdate` leaves the current contents untouched. A batch, including an
  /// empty one, discards everything previously held and installs the batch
  /// in its original order.
  pub fn replace(&mut self, outcome: ScrapeOutcome) {
    match outcome {
      ScrapeOutcome::Batch(batch) => self.items = batch,
      ScrapeOutcome::NoUpdate => {}
    }
  }

  /// Read the ordered sub-sequence `[start, end)`.
  ///
  /// Bounds must satisfy `start <= end <= capacity`; any violation yields
  /// `None`, which callers treat as "no data" rather than an error distinct
  /// from an empty cache. Within valid bounds, positions past the current
  /// length are simply absent from the result.
  pub fn read(&self, start: usize, end: usize) -> Option<Vec<Item>> {
    if start > end || end > self.capacity {
      return None;
    }
    let start = start.min(self.items.len());
    let end = end.min(self.items.len());
    Some(self.items[start..end].to_vec())
  }

  /// Empty the cache. Used when the owning repository closes.
  pub fn clear(&mut self) {
    self.items.clear();
  }
}
