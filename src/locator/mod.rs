//! Resource location: turn a resource URI into bytes.
//!
//! ```text
//! locator/
//! ├── wildcard   # glob expansion over a folder (`*.js`, `**/*.css`)
//! └── file       # file-system locator rooted at the model base directory
//! ```

mod file;
pub mod wildcard;

pub use file::FileLocatorFactory;
pub use wildcard::{WildcardLocator, has_wildcard};

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while locating a resource.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("invalid folder `{}` for wildcard `{pattern}`", folder.display())]
    InvalidFolder { folder: PathBuf, pattern: String },

    #[error("invalid wildcard `{pattern}`")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("IO error when reading `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("resource `{0}` points outside the resource root")]
    OutsideRoot(String),

    #[error("no locator supports `{0}`")]
    Unsupported(String),
}

/// Reads the bytes behind a resource URI.
pub trait UriLocator: Send + Sync {
    fn locate(&self, uri: &str) -> Result<Vec<u8>, LocateError>;
}

/// Picks the locator able to handle a URI.
pub trait UriLocatorFactory: Send + Sync {
    /// Locator for `uri`, or `None` when no locator supports it.
    fn locator_for(&self, uri: &str) -> Option<&dyn UriLocator>;

    /// Locate `uri` through whichever locator supports it.
    fn locate(&self, uri: &str) -> Result<Vec<u8>, LocateError> {
        self.locator_for(uri)
            .ok_or_else(|| LocateError::Unsupported(uri.to_string()))?
            .locate(uri)
    }
}
