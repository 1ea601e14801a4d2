//! Cache key for merged group output.

use std::fmt;

use super::ResourceType;

/// Identity of one cached artifact: `(group, type, minimize)`.
///
/// Equality and hashing are structural over all three fields, so two
/// requests resolving to the same tuple share one cache slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub group: String,
    pub kind: ResourceType,
    pub minimize: bool,
}

impl CacheKey {
    pub fn new(group: impl Into<String>, kind: ResourceType, minimize: bool) -> Self {
        Self {
            group: group.into(),
            kind,
            minimize,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.kind)?;
        if !self.minimize {
            f.write_str(" (unminimized)")?;
        }
        Ok(())
    }
}
