//! Group processing: locate, rewrite, minify and merge a group's resources.
//!
//! ```text
//! processor/
//! ├── minify    # oxc / lightningcss
//! └── rewrite   # CSS url(..) → proxy URL, allow-list
//! ```

pub mod minify;
pub mod rewrite;

pub use rewrite::{AllowList, CssUrlRewriter};

use std::sync::Arc;

use thiserror::Error;

use crate::core::ResourceType;
use crate::locator::{LocateError, UriLocatorFactory};
use crate::model::Group;
use crate::{debug, log};

/// Failures while building group output.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("group `{0}` not found")]
    GroupNotFound(String),

    #[error("failed to locate `{uri}`")]
    Locate {
        uri: String,
        #[source]
        source: LocateError,
    },

    #[error("resource `{0}` is not valid UTF-8")]
    Encoding(String),
}

/// Turns one group into merged output for a resource type.
pub trait GroupProcessor: Send + Sync {
    /// Merged content, or `None` when the group has no resource of `kind`.
    fn process(
        &self,
        group: &Group,
        kind: ResourceType,
        minimize: bool,
    ) -> Result<Option<String>, BuildError>;
}

/// Reads every resource of the type in model order and joins them with a
/// newline.
///
/// Stylesheets go through the URL rewriter when one is set. Minification is
/// per resource so `minimize = false` entries survive untouched; a resource
/// the minifier cannot parse is kept as-is.
pub struct DefaultGroupProcessor {
    locators: Arc<dyn UriLocatorFactory>,
    rewriter: Option<Arc<CssUrlRewriter>>,
    ignore_missing: bool,
}

impl DefaultGroupProcessor {
    pub fn new(locators: Arc<dyn UriLocatorFactory>) -> Self {
        Self {
            locators,
            rewriter: None,
            ignore_missing: false,
        }
    }

    pub fn with_rewriter(mut self, rewriter: Arc<CssUrlRewriter>) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    /// Skip resources that do not exist instead of failing the build.
    pub fn with_ignore_missing(mut self, ignore: bool) -> Self {
        self.ignore_missing = ignore;
        self
    }

    fn read(&self, uri: &str) -> Result<Option<String>, BuildError> {
        let bytes = match self.locators.locate(uri) {
            Ok(bytes) => bytes,
            Err(LocateError::NotFound(_)) if self.ignore_missing => {
                log!("warning"; "skipping missing resource {}", uri);
                return Ok(None);
            }
            Err(source) => {
                return Err(BuildError::Locate {
                    uri: uri.to_string(),
                    source,
                });
            }
        };
        let mut text = String::from_utf8(bytes).map_err(|_| BuildError::Encoding(uri.to_string()))?;
        if text.starts_with('\u{feff}') {
            text.drain(..'\u{feff}'.len_utf8());
        }
        Ok(Some(text))
    }
}

impl GroupProcessor for DefaultGroupProcessor {
    fn process(
        &self,
        group: &Group,
        kind: ResourceType,
        minimize: bool,
    ) -> Result<Option<String>, BuildError> {
        if !group.has_resources_of(kind) {
            return Ok(None);
        }

        let mut parts = Vec::new();
        for resource in group.resources_of(kind) {
            let Some(mut text) = self.read(&resource.uri)? else {
                continue;
            };
            if kind == ResourceType::Css
                && let Some(rewriter) = &self.rewriter
            {
                text = rewriter.rewrite(&text, &resource.uri);
            }
            if minimize && resource.minimize {
                text = match minify::minify(kind, &text) {
                    Some(min) => min,
                    None => {
                        debug!("build"; "minifier rejected {}, keeping original", resource.uri);
                        text
                    }
                };
            }
            parts.push(text);
        }

        debug!("build"; "{}.{}: {} resource(s)", group.name, kind, parts.len());
        Ok(Some(parts.join("\n")))
    }
}
