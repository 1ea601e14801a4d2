//! Core types - pure abstractions shared across the codebase.

mod entry;
mod key;
mod kind;

pub use entry::CacheEntry;
pub use key::CacheKey;
pub use kind::ResourceType;
