//! Model loaded from a TOML or JSON file.
//!
//! ```toml
//! [[group]]
//! name = "all"
//!
//! [[group.resource]]
//! type = "js"
//! uri = "js/**/*.js"
//!
//! [[group.resource]]
//! type = "css"
//! uri = "css/site.css"
//! minimize = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::{Group, Model, ModelError, ModelSource};
use crate::{debug, log};

/// On-disk model format.
///
/// Chosen statically from configuration; `Auto` decides by file extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    #[default]
    Auto,
    Toml,
    Json,
}

impl ModelFormat {
    /// Concrete format for `path` (never `Auto`).
    pub fn resolve(self, path: &Path) -> Self {
        match self {
            Self::Auto => match path.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
                _ => Self::Toml,
            },
            other => other,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModelFile {
    #[serde(default, rename = "group", alias = "groups")]
    groups: Vec<Group>,
}

/// Reads the model file once and keeps the parsed result until told to
/// discard it.
///
/// The last model that loaded successfully survives a reload: when the
/// file is broken on the next read, that model keeps being served.
pub struct FileModelSource {
    path: PathBuf,
    format: ModelFormat,
    cached: RwLock<Option<Arc<Model>>>,
    last_good: RwLock<Option<Arc<Model>>>,
}

impl FileModelSource {
    pub fn new(path: impl Into<PathBuf>, format: ModelFormat) -> Self {
        let path = path.into();
        let format = format.resolve(&path);
        Self {
            path,
            format,
            cached: RwLock::new(None),
            last_good: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse model text in the configured format.
    pub fn parse(&self, content: &str) -> Result<Model, ModelError> {
        let file: ModelFile = match self.format {
            ModelFormat::Json => serde_json::from_str(content)
                .map_err(|e| ModelError::Parse(self.path.clone(), e.to_string()))?,
            _ => toml::from_str(content)
                .map_err(|e| ModelError::Parse(self.path.clone(), e.to_string()))?,
        };
        Model::new(file.groups)
    }

    fn load(&self) -> Result<Model, ModelError> {
        let content =
            fs::read_to_string(&self.path).map_err(|e| ModelError::Io(self.path.clone(), e))?;
        let model = self.parse(&content)?;
        debug!("model"; "loaded {} group(s) from {}", model.groups().len(), self.path.display());
        Ok(model)
    }
}

impl ModelSource for FileModelSource {
    fn model(&self) -> Result<Arc<Model>, ModelError> {
        if let Some(model) = self.cached.read().as_ref() {
            return Ok(Arc::clone(model));
        }

        let mut cached = self.cached.write();
        // Another thread may have loaded it while we waited.
        if let Some(model) = cached.as_ref() {
            return Ok(Arc::clone(model));
        }
        let model = match self.load() {
            Ok(model) => Arc::new(model),
            Err(err) => {
                let Some(fallback) = self.last_good.read().clone() else {
                    return Err(err);
                };
                log!("warning"; "{}, keeping previous model", err);
                fallback
            }
        };
        *self.last_good.write() = Some(Arc::clone(&model));
        *cached = Some(Arc::clone(&model));
        Ok(model)
    }

    fn on_model_period_changed(&self) {
        debug!("model"; "discarding cached model");
        self.cached.write().take();
    }

    fn destroy(&self) {
        self.cached.write().take();
        self.last_good.write().take();
    }
}
