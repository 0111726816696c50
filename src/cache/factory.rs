//! Registry mapping cache kinds to their builders.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use super::repo::{CacheRepository, RepositoryBuilder};
use super::store::CacheInitError;

#[derive(Debug, Error)]
pub enum FactoryError {
  /// Asked to create a kind nobody registered. Registration is fixed at
  /// startup, so hitting this at runtime is a programming error.
  #[error("no builder registered for cache kind {0:?}")]
  UnknownBuilder(String),
  /// The builder failed to construct the underlying cache resource.
  #[error("failed to construct cache")]
  Connection(#[source] CacheInitError),
}

/// Registry of repository builders, keyed by cache kind.
#[derive(Default)]
pub struct RepositoryFactory {
  builders: HashMap<String, Box<dyn RepositoryBuilder>>,
}

impl RepositoryFactory {
  pub fn new() -> Self {
    Self {
      builders: HashMap::new(),
    }
  }

  /// Register `builder` under `key`. Registering the same key twice silently
  /// replaces the previous builder; last registration wins.
  pub fn register(&mut self, key: impl Into<String>, builder: Box<dyn RepositoryBuilder>) {
    self.builders.insert(key.into(), builder);
  }

  /// Create (or fetch the memoized) repository for `key`.
  ///
  /// Builder failures are propagated untranslated.
  pub fn create(&self, key: &str, capacity: usize) -> Result<Arc<CacheRepository>, FactoryError> {
    let builder = self
      .builders
      .get(key)
      .ok_or_else(|| FactoryError::UnknownBuilder(key.to_string()))?;
    builder.build(capacity)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::repo::CacheRepositoryBuilder;

  #[test]
  fn test_create_unregistered_kind_fails() {
    let factory = RepositoryFactory::new();
    assert!(matches!(
      factory.create("memory", 5),
      Err(FactoryError::UnknownBuilder(_))
    ));
  }

  #[test]
  fn test_create_returns_singleton_per_key() {
    let mut factory = RepositoryFactory::new();
    factory.register("memory", Box::new(CacheRepositoryBuilder::new()));

    let first = factory.create("memory", 5).unwrap();
    let second = factory.create("memory", 10).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
  }

  #[test]
  fn test_last_registration_wins() {
    let mut factory = RepositoryFactory::new();
    factory.register("memory", Box::new(CacheRepositoryBuilder::new()));
    let first = factory.create("memory", 5).unwrap();

    // Re-registering replaces the builder, and with it the memoized instance
    factory.register("memory", Box::new(CacheRepositoryBuilder::new()));
    let second = factory.create("memory", 5).unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
  }
}
