//! Wildcard expansion over a folder.
//!
//! The last segment of a pattern is a glob (`*` any run, `?` one char)
//! matched case-sensitively against file names. A pattern containing `**`
//! descends into every subdirectory; otherwise only the folder itself is
//! scanned. Matches are sorted, then concatenated into one byte stream.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use regex::Regex;

use super::LocateError;
use crate::{debug, log};

/// Token that switches expansion to recursive traversal.
pub const RECURSIVE_WILDCARD: &str = "**";

/// Sort order applied to matched files before concatenation.
pub type FileOrder = fn(&Path, &Path) -> Ordering;

/// Ascending, case-insensitive comparison of full paths.
pub fn ascending(a: &Path, b: &Path) -> Ordering {
    compare_ignore_case(a, b).then_with(|| a.cmp(b))
}

/// Descending, case-insensitive comparison of full paths.
pub fn descending(a: &Path, b: &Path) -> Ordering {
    ascending(b, a)
}

fn compare_ignore_case(a: &Path, b: &Path) -> Ordering {
    let a = a.to_string_lossy().to_lowercase();
    let b = b.to_string_lossy().to_lowercase();
    a.cmp(&b)
}

/// Check if a URI should go through wildcard expansion.
///
/// External URLs (anything starting with `http`) never do, even when their
/// query string contains `?` or `*`.
pub fn has_wildcard(uri: &str) -> bool {
    !uri.starts_with("http") && uri.contains(['*', '?'])
}

/// Expands wildcard patterns into merged file content.
#[derive(Debug, Clone, Copy)]
pub struct WildcardLocator {
    order: FileOrder,
}

impl Default for WildcardLocator {
    fn default() -> Self {
        Self { order: ascending }
    }
}

impl WildcardLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the sort order applied to matched files.
    pub fn with_order(mut self, order: FileOrder) -> Self {
        self.order = order;
        self
    }

    /// Concatenate every file under `folder` matching `pattern`.
    ///
    /// No match is not an error: the result is empty and a warning is logged.
    pub fn locate(&self, pattern: &str, folder: &Path) -> Result<Vec<u8>, LocateError> {
        let files = self.matching_files(pattern, folder)?;

        if files.is_empty() {
            log!("warning"; "no files found inside {} for wildcard: {}", folder.display(), pattern);
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        for path in &files {
            debug!("locate"; "file: {}", path.display());
            let bytes = fs::read(path).map_err(|source| LocateError::Io {
                path: path.clone(),
                source,
            })?;
            out.extend_from_slice(&bytes);
        }
        Ok(out)
    }

    /// Matched files in concatenation order.
    pub fn matching_files(&self, pattern: &str, folder: &Path) -> Result<Vec<PathBuf>, LocateError> {
        if !folder.is_dir() {
            return Err(LocateError::InvalidFolder {
                folder: folder.to_path_buf(),
                pattern: pattern.to_string(),
            });
        }

        let name_glob = pattern.rsplit('/').next().unwrap_or(pattern);
        let matcher = glob_to_regex(name_glob).map_err(|source| LocateError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        let depth = if pattern.contains(RECURSIVE_WILDCARD) { usize::MAX } else { 1 };
        debug!("locate"; "wildcard: {} (depth {})", name_glob, depth);

        let mut files: Vec<PathBuf> = WalkDir::new(folder)
            .skip_hidden(false)
            .max_depth(depth)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.file_name().to_str().is_some_and(|name| matcher.is_match(name)))
            .map(|e| e.path())
            .collect();

        files.sort_by(|a, b| (self.order)(a, b));
        Ok(files)
    }
}

/// Compile a file-name glob into an anchored regex.
fn glob_to_regex(glob: &str) -> Result<Regex, regex::Error> {
    let mut pattern = String::with_capacity(glob.len() + 8);
    pattern.push('^');
    let mut buf = [0u8; 4];
    for c in glob.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            c => pattern.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }
    pattern.push('$');
    Regex::new(&pattern)
}
