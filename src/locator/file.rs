//! File-system locator rooted at the model base directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{LocateError, UriLocator, UriLocatorFactory, WildcardLocator, has_wildcard};
use crate::utils::path::uri::is_external;

/// Reads resources below `root`; wildcard URIs are expanded.
#[derive(Debug, Clone)]
pub struct FileLocator {
    root: PathBuf,
    wildcard: WildcardLocator,
}

impl FileLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            wildcard: WildcardLocator::default(),
        }
    }

    /// Use a custom wildcard locator (e.g. a different file order).
    pub fn with_wildcard(mut self, wildcard: WildcardLocator) -> Self {
        self.wildcard = wildcard;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Clean a URI into root-relative segments, rejecting `..`.
    fn segments(uri: &str) -> Result<Vec<&str>, LocateError> {
        let segments: Vec<&str> = uri
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        if segments.contains(&"..") {
            return Err(LocateError::OutsideRoot(uri.to_string()));
        }
        Ok(segments)
    }

    fn locate_wildcard(&self, uri: &str, segments: &[&str]) -> Result<Vec<u8>, LocateError> {
        // Folder = leading segments without wildcard characters.
        let split = segments
            .iter()
            .position(|s| has_wildcard(s))
            .unwrap_or(segments.len())
            .min(segments.len().saturating_sub(1));
        let folder = segments[..split].iter().fold(self.root.clone(), |p, s| p.join(s));
        let pattern = segments[split..].join("/");
        crate::debug!("locate"; "{} -> {} in {}", uri, pattern, folder.display());
        self.wildcard.locate(&pattern, &folder)
    }

    fn locate_file(&self, uri: &str, segments: &[&str]) -> Result<Vec<u8>, LocateError> {
        if segments.is_empty() {
            return Err(LocateError::NotFound(uri.to_string()));
        }
        let path = segments.iter().fold(self.root.clone(), |p, s| p.join(s));

        fs::read(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => LocateError::NotFound(uri.to_string()),
            _ => LocateError::Io { path, source },
        })
    }
}

impl UriLocator for FileLocator {
    fn locate(&self, uri: &str) -> Result<Vec<u8>, LocateError> {
        let segments = Self::segments(uri)?;
        if has_wildcard(uri) {
            self.locate_wildcard(uri, &segments)
        } else {
            self.locate_file(uri, &segments)
        }
    }
}

/// Default factory: local URIs go to a [`FileLocator`], external URLs
/// have no locator.
#[derive(Debug, Clone)]
pub struct FileLocatorFactory {
    file: FileLocator,
}

impl FileLocatorFactory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            file: FileLocator::new(root),
        }
    }

    pub fn with_wildcard(mut self, wildcard: WildcardLocator) -> Self {
        self.file = self.file.with_wildcard(wildcard);
        self
    }
}

impl UriLocatorFactory for FileLocatorFactory {
    fn locator_for(&self, uri: &str) -> Option<&dyn UriLocator> {
        if is_external(uri) {
            return None;
        }
        Some(&self.file)
    }
}
