//! Resolve a request into the cache key it asks for.

use crate::core::{CacheKey, ResourceType};
use crate::manager::RequestDescriptor;

/// Query parameter that turns minification off (`?minimize=false`).
pub const MINIMIZE_PARAM: &str = "minimize";

/// Maps a request to `(group, type, minimize)`.
pub trait GroupExtractor: Send + Sync {
    /// `None` when the request names no group or no known type.
    fn extract(&self, request: &RequestDescriptor) -> Option<CacheKey>;
}

/// `/prefix/<group>.<js|css>[?minimize=false]`.
///
/// The group is the last path segment without its extension; the type comes
/// from the extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultGroupExtractor;

impl GroupExtractor for DefaultGroupExtractor {
    fn extract(&self, request: &RequestDescriptor) -> Option<CacheKey> {
        let segment = request.path().rsplit('/').next()?;
        let (group, ext) = segment.rsplit_once('.')?;
        if group.is_empty() {
            return None;
        }
        let kind = ResourceType::from_extension(ext)?;
        let minimize = !request
            .param(MINIMIZE_PARAM)
            .is_some_and(|v| v.eq_ignore_ascii_case("false"));
        Some(CacheKey::new(group, kind, minimize))
    }
}
