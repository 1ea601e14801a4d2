//! `[cache]` section configuration.
//!
//! ```toml
//! [cache]
//! capacity = 128               # max cached (group, type, minimize) entries
//! update_period = 0            # seconds between refresh passes, 0 = lazy only
//! model_update_period = 0      # seconds between model reloads, 0 = never
//! single_flight = false        # one build per key on concurrent misses
//! fingerprint = "blake3"       # or "fx"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_CAPACITY;
use crate::config::{ConfigDiagnostics, FieldPath};
use crate::fingerprint::FingerprintKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
    pub update_period: u64,
    pub model_update_period: u64,
    pub single_flight: bool,
    pub fingerprint: FingerprintKind,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            update_period: 0,
            model_update_period: 0,
            single_flight: false,
            fingerprint: FingerprintKind::default(),
        }
    }
}

impl CacheConfig {
    const CAPACITY: FieldPath = FieldPath::new("cache.capacity");

    pub fn update_period(&self) -> Duration {
        Duration::from_secs(self.update_period)
    }

    pub fn model_update_period(&self) -> Duration {
        Duration::from_secs(self.model_update_period)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.capacity == 0 {
            diag.error_with_hint(
                Self::CAPACITY,
                "capacity must be at least 1",
                format!("the default is {DEFAULT_CAPACITY}"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_cache_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.cache.capacity, 128);
        assert_eq!(config.cache.update_period(), Duration::ZERO);
        assert_eq!(config.cache.model_update_period(), Duration::ZERO);
        assert!(!config.cache.single_flight);
        assert_eq!(config.cache.fingerprint, FingerprintKind::Blake3);
    }

    #[test]
    fn test_cache_parse() {
        let config = test_parse_config(
            "[cache]\ncapacity = 16\nupdate_period = 30\nmodel_update_period = 300\nsingle_flight = true\nfingerprint = \"fx\"",
        );
        assert_eq!(config.cache.capacity, 16);
        assert_eq!(config.cache.update_period(), Duration::from_secs(30));
        assert_eq!(config.cache.model_update_period(), Duration::from_secs(300));
        assert!(config.cache.single_flight);
        assert_eq!(config.cache.fingerprint, FingerprintKind::Fx);
    }

    #[test]
    fn test_unknown_fingerprint_rejected() {
        let result: Result<CacheConfig, _> = toml::from_str("fingerprint = \"md5\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_capacity_invalid() {
        let mut diag = ConfigDiagnostics::new();
        CacheConfig {
            capacity: 0,
            ..CacheConfig::default()
        }
        .validate(&mut diag);
        assert!(diag.has_errors());
    }
}
