//! `[runtime]` section configuration.
//!
//! ```toml
//! [runtime]
//! debug = false                    # enables /wroAPI/reloadCache and reloadModel
//! gzip = true                      # compress when the client accepts gzip
//! rewrite_css_urls = true          # proxy relative url(..) in stylesheets
//! ignore_missing_resources = true  # skip missing files instead of failing
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub debug: bool,
    pub gzip: bool,
    pub rewrite_css_urls: bool,
    pub ignore_missing_resources: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            debug: false,
            gzip: true,
            rewrite_css_urls: true,
            ignore_missing_resources: true,
        }
    }
}
