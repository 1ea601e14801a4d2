//! Cached artifact: merged content plus its fingerprint.

use std::sync::Arc;

/// Immutable result of building one group/type/minimize combination.
///
/// `fingerprint` is `None` exactly when `content` is `None`; the
/// constructors are the only way to build an entry, so the pairing holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    content: Option<Arc<str>>,
    fingerprint: Option<Arc<str>>,
}

impl CacheEntry {
    /// Entry for a build that produced content.
    pub fn new(content: impl Into<Arc<str>>, fingerprint: impl Into<Arc<str>>) -> Self {
        Self {
            content: Some(content.into()),
            fingerprint: Some(fingerprint.into()),
        }
    }

    /// Entry for a build that legitimately produced nothing (empty group).
    pub const fn empty() -> Self {
        Self {
            content: None,
            fingerprint: None,
        }
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Content as bytes, empty when there is none.
    pub fn bytes(&self) -> &[u8] {
        self.content().map(str::as_bytes).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none()
    }
}
