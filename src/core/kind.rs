//! Resource type definitions.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::mime::types::{CSS, JAVASCRIPT};

/// Type of a resource inside a group, determines merge and minify strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// JavaScript (`.js`)
    #[serde(alias = "script")]
    Js,
    /// Stylesheet (`.css`)
    #[serde(alias = "style")]
    Css,
}

impl ResourceType {
    /// Every resource type, in a stable order.
    pub const ALL: [Self; 2] = [Self::Js, Self::Css];

    /// Detect resource type from extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "js" => Some(Self::Js),
            "css" => Some(Self::Css),
            _ => None,
        }
    }

    /// Detect resource type from a file path or URI.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// File extension served for this type.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Js => "js",
            Self::Css => "css",
        }
    }

    /// HTTP `Content-Type` for merged output of this type.
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Js => JAVASCRIPT,
            Self::Css => CSS,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
