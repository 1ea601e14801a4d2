//! Manager error types.

use std::error::Error as _;
use std::io;

use thiserror::Error;

use crate::model::ModelError;
use crate::processor::BuildError;

/// Everything [`Manager`](super::Manager) can fail with.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// A required collaborator was not supplied.
    #[error("manager is not configured: missing {0}")]
    Configuration(&'static str),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("access to `{0}` is not allowed")]
    Unauthorized(String),

    #[error("failed to build `{key}`")]
    Build {
        key: String,
        #[source]
        source: BuildError,
    },

    #[error("failed to load model")]
    Model(#[from] ModelError),

    #[error("manager has been destroyed")]
    IllegalState,

    #[error("failed to write response")]
    Io(#[from] io::Error),
}

impl ManagerError {
    /// HTTP status for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Unauthorized(_) => 403,
            Self::IllegalState => 503,
            Self::Configuration(_) | Self::Build { .. } | Self::Model(_) | Self::Io(_) => 500,
        }
    }

    /// Message including every source, `outer: inner: root`.
    pub fn describe(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(err) = source {
            message.push_str(": ");
            message.push_str(&err.to_string());
            source = err.source();
        }
        message
    }
}
