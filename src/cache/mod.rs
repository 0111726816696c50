//! Bounded cache, its owning repository, and the builder/factory pair that
//! constructs the repository exactly once per cache kind.

mod factory;
mod repo;
mod store;

pub use factory::{FactoryError, RepositoryFactory};
pub use repo::{CacheRepository, CacheRepositoryBuilder, RepositoryBuilder};
pub use store::{CacheInitError, NewsCache};
