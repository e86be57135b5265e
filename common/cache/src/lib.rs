//! Redis-backed cache-aside layer shared by the services.
//!
//! - Deterministic key derivation from operation identity and arguments
//! - Configurable TTL per namespace
//! - Whole-namespace invalidation for writers
//! - Graceful degradation: a broken redis never fails a read, it only makes
//!   it slower
//!
//! # Example
//!
//! ```rust,ignore
//! use common_cache::{CacheAside, CacheConfig, CacheSource};
//!
//! let cache = CacheAside::new(redis, CacheConfig::with_ttl("items", 30));
//!
//! let result = cache
//!     .get_or_produce("list", &[], || async { load_items().await })
//!     .await?;
//!
//! if result.was_cached() {
//!     println!("served from cache");
//! }
//! ```

pub mod cache_aside;
pub mod keys;
pub mod types;

pub use cache_aside::CacheAside;
pub use keys::cache_key;
pub use types::{CacheConfig, CacheResult, CacheSource};
