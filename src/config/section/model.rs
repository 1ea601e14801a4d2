//! `[model]` section configuration.
//!
//! ```toml
//! [model]
//! path = "wro.toml"    # group model, relative to the config file
//! format = "auto"      # "toml", "json", or "auto" (by extension)
//! base = "."           # directory resource URIs resolve against
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::model::ModelFormat;
use crate::utils::path::normalize_path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    pub format: ModelFormat,
    pub base: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "wro.toml".into(),
            format: ModelFormat::Auto,
            base: ".".into(),
        }
    }
}

impl ModelConfig {
    const PATH: FieldPath = FieldPath::new("model.path");
    const BASE: FieldPath = FieldPath::new("model.base");

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    /// Make `path` and `base` absolute against `root`.
    pub fn normalize(&mut self, root: &Path) {
        self.path = normalize_path(&root.join(&self.path));
        self.base = normalize_path(&root.join(&self.base));
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !self.path.is_file() {
            diag.error_with_hint(
                Self::PATH,
                format!("model file `{}` not found", self.path.display()),
                "create it or point `model.path` at an existing file",
            );
        }
        if !self.base.is_dir() {
            diag.error(
                Self::BASE,
                format!("`{}` is not a directory", self.base.display()),
            );
        }
    }
}
