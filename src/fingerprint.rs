//! Content fingerprints used as ETags.
//!
//! - [`Blake3Fingerprint`]: full blake3 digest as hex (default)
//! - [`FxFingerprint`]: 64-bit FxHash as 16 hex chars, cheaper, weaker

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::utils::hash;

/// Produces a stable fingerprint for merged content.
pub trait FingerprintCreator: Send + Sync {
    fn create(&self, content: &str) -> String;
}

/// Blake3 digest, hex-encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Fingerprint;

impl FingerprintCreator for Blake3Fingerprint {
    fn create(&self, content: &str) -> String {
        hex::encode(blake3::hash(content.as_bytes()).as_bytes())
    }
}

/// FxHash digest, 16 hex chars.
#[derive(Debug, Clone, Copy, Default)]
pub struct FxFingerprint;

impl FingerprintCreator for FxFingerprint {
    fn create(&self, content: &str) -> String {
        hash::fingerprint(content)
    }
}

/// Fingerprint algorithm selected in `[cache] fingerprint`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintKind {
    #[default]
    Blake3,
    Fx,
}

impl FingerprintKind {
    pub fn creator(self) -> Arc<dyn FingerprintCreator> {
        match self {
            Self::Blake3 => Arc::new(Blake3Fingerprint),
            Self::Fx => Arc::new(FxFingerprint),
        }
    }
}
