//! Resource group model.
//!
//! A model is an ordered list of named groups; each group lists resource
//! URIs tagged with a [`ResourceType`]. The model is read-only once loaded
//! and shared between request threads behind an `Arc`.

mod file;

pub use file::{FileModelSource, ModelFormat};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::ResourceType;

/// Model loading failures.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("IO error when reading `{}`", .0.display())]
    Io(PathBuf, #[source] io::Error),

    #[error("invalid model file `{}`: {}", .0.display(), .1)]
    Parse(PathBuf, String),

    #[error("duplicate group name `{0}`")]
    DuplicateGroup(String),

    #[error("group with empty name")]
    EmptyGroupName,
}

/// One resource reference inside a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: ResourceType,

    /// URI relative to the model base directory; may contain wildcards.
    pub uri: String,

    /// Set to `false` to keep this resource unminified in minimized output.
    #[serde(default = "default_true")]
    pub minimize: bool,
}

fn default_true() -> bool {
    true
}

impl Resource {
    pub fn new(kind: ResourceType, uri: impl Into<String>) -> Self {
        Self {
            kind,
            uri: uri.into(),
            minimize: true,
        }
    }
}

/// Named, ordered list of resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,

    #[serde(default, rename = "resource")]
    pub resources: Vec<Resource>,
}

impl Group {
    pub fn new(name: impl Into<String>, resources: Vec<Resource>) -> Self {
        Self {
            name: name.into(),
            resources,
        }
    }

    /// Resources of one type, in declaration order.
    pub fn resources_of(&self, kind: ResourceType) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(move |r| r.kind == kind)
    }

    pub fn has_resources_of(&self, kind: ResourceType) -> bool {
        self.resources.iter().any(|r| r.kind == kind)
    }

    /// Resource types present in this group.
    pub fn kinds(&self) -> impl Iterator<Item = ResourceType> + '_ {
        ResourceType::ALL
            .into_iter()
            .filter(|kind| self.has_resources_of(*kind))
    }
}

/// Every group known to the server.
#[derive(Debug, Clone, Default)]
pub struct Model {
    groups: Vec<Group>,
    index: FxHashMap<String, usize>,
}

impl Model {
    /// Build a model, rejecting duplicate or empty group names.
    pub fn new(groups: Vec<Group>) -> Result<Self, ModelError> {
        let mut index = FxHashMap::default();
        for (i, group) in groups.iter().enumerate() {
            if group.name.is_empty() {
                return Err(ModelError::EmptyGroupName);
            }
            if index.insert(group.name.clone(), i).is_some() {
                return Err(ModelError::DuplicateGroup(group.name.clone()));
            }
        }
        Ok(Self { groups, index })
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.index.get(name).map(|&i| &self.groups[i])
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }
}

/// Supplies the current model.
///
/// Implementations may cache the parsed model; `on_model_period_changed`
/// tells them to discard that cache so the next call re-reads the source.
pub trait ModelSource: Send + Sync {
    fn model(&self) -> Result<Arc<Model>, ModelError>;

    /// Model refresh event. Sources without a cache ignore it.
    fn on_model_period_changed(&self) {}

    /// Called once when the owning manager is destroyed.
    fn destroy(&self) {}
}

/// A fixed, pre-built model.
impl ModelSource for Arc<Model> {
    fn model(&self) -> Result<Arc<Model>, ModelError> {
        Ok(Arc::clone(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> Group {
        Group::new(
            "all",
            vec![
                Resource::new(ResourceType::Js, "a.js"),
                Resource::new(ResourceType::Js, "b.js"),
            ],
        )
    }

    #[test]
    fn test_group_kinds() {
        let mut g = group();
        assert!(g.has_resources_of(ResourceType::Js));
        assert!(!g.has_resources_of(ResourceType::Css));
        assert_eq!(g.kinds().collect::<Vec<_>>(), vec![ResourceType::Js]);

        g.resources.push(Resource::new(ResourceType::Css, "a.css"));
        assert_eq!(
            g.kinds().collect::<Vec<_>>(),
            vec![ResourceType::Js, ResourceType::Css]
        );
    }

    #[test]
    fn test_resources_of_keeps_order() {
        let g = group();
        let uris: Vec<_> = g.resources_of(ResourceType::Js).map(|r| r.uri.as_str()).collect();
        assert_eq!(uris, ["a.js", "b.js"]);
    }

    #[test]
    fn test_model_lookup() {
        let model = Model::new(vec![group(), Group::new("other", vec![])]).unwrap();
        assert_eq!(model.group("all").map(|g| g.resources.len()), Some(2));
        assert!(model.group("other").is_some());
        assert!(model.group("missing").is_none());
        assert_eq!(model.groups().len(), 2);
    }

    #[test]
    fn test_model_rejects_duplicates() {
        let err = Model::new(vec![group(), group()]).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateGroup(name) if name == "all"));
    }

    #[test]
    fn test_parse_error_message() {
        let err = ModelError::Parse(PathBuf::from("wro.toml"), "expected `=`".into());
        assert_eq!(err.to_string(), "invalid model file `wro.toml`: expected `=`");
    }

    #[test]
    fn test_model_rejects_empty_name() {
        let err = Model::new(vec![Group::new("", vec![])]).unwrap_err();
        assert!(matches!(err, ModelError::EmptyGroupName));
    }
}
