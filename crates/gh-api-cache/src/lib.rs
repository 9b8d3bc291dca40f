//! Expiring in-memory cache for GitHub API lookups
//!
//! This crate provides [`ExpireCache`], a small keyed store where every entry
//! lives for a fixed time-to-live. It is meant for short-lived memoization of
//! lookups that are cheap to redo but wasteful to repeat, such as "which PR
//! belongs to this branch".
//!
//! Expiry is lazy: an entry past its deadline is removed the next time it is
//! looked up, or when the whole cache is cleared. There is no background task.
//!
//! # Example
//!
//! ```rust
//! use gh_api_cache::ExpireCache;
//! use std::time::Duration;
//!
//! let cache: ExpireCache<&str, u64> = ExpireCache::new(Duration::from_secs(60));
//! cache.set("feature-x", 42);
//! assert_eq!(cache.get(&"feature-x"), Some(42));
//!
//! cache.clear();
//! assert_eq!(cache.get(&"feature-x"), None);
//! ```

pub mod expire_cache;

pub use expire_cache::{ClearOnDrop, ExpireCache};
