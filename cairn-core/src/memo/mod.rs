//! Memoization on top of a cache
//!
//! A memoized call is stored under a [`CallKey`]: the function's name, its
//! positional arguments in order, then a reserved keyword mark followed by the
//! keyword arguments sorted by name. Arguments are typed ([`ArgValue`]), so
//! `f(1)`, `f(1.0)` and `f(true)` never share an entry.
//!
//! # Example
//!
//! ```rust,ignore
//! use cairn_core::{CallArgs, PersistentLruCache};
//!
//! #[derive(CallArgs)]
//! struct Lookup {
//!     service: String,
//!     id: u64,
//! }
//!
//! let cache: PersistentLruCache<cairn_core::CallKey, Vec<String>> =
//!     PersistentLruCache::open("./cache/lookups.cache")?;
//! let mut lookup = cache.memoize("ids::lookup", |query: Lookup| expensive(&query));
//!
//! let ids = lookup.call(Lookup { service: "tmdb".into(), id: 278 })?;
//! ```
//!
//! Memoize only functions whose results can be reused across calls; side
//! effects inside a memoized function run on misses only.

pub mod key;
pub mod memoized;

pub use key::{ArgValue, CallArgs, CallKey, IntoArg};
pub use memoized::Memoized;
