//! Global config with atomic reload support.
//!
//! Uses `arc-swap` for lock-free reads and atomic replacement, so request
//! threads keep the snapshot they started with while the watcher swaps in
//! a reloaded `wrought.toml`.

use crate::config::AppConfig;
use crate::utils::hash;
use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

pub static CONFIG: LazyLock<ArcSwap<AppConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(AppConfig::default()));

/// Hash of the config file content currently loaded.
static CONFIG_HASH: AtomicU64 = AtomicU64::new(0);

#[inline]
pub fn cfg() -> Arc<AppConfig> {
    CONFIG.load_full()
}

/// Old and new config after a successful reload.
#[derive(Debug, Clone)]
pub struct ConfigChange {
    pub old: Arc<AppConfig>,
    pub new: Arc<AppConfig>,
}

impl ConfigChange {
    pub fn cache_period_changed(&self) -> bool {
        self.old.cache.update_period != self.new.cache.update_period
    }

    pub fn model_period_changed(&self) -> bool {
        self.old.cache.model_update_period != self.new.cache.model_update_period
    }

    /// Changes the running server cannot pick up: bind address, prefix,
    /// model location, and the collaborators wired at startup.
    pub fn requires_restart(&self) -> bool {
        let (old, new) = (&self.old, &self.new);
        old.serve != new.serve
            || old.model != new.model
            || old.cache.capacity != new.cache.capacity
            || old.cache.single_flight != new.cache.single_flight
            || old.cache.fingerprint != new.cache.fingerprint
            || old.runtime.rewrite_css_urls != new.runtime.rewrite_css_urls
            || old.runtime.ignore_missing_resources != new.runtime.ignore_missing_resources
    }
}

/// Reload config from disk if its content changed.
///
/// Returns `Ok(None)` when the file is unchanged.
pub fn reload_config() -> Result<Option<ConfigChange>> {
    let old = cfg();
    let Some(cli) = old.cli else {
        return Ok(None);
    };

    let content = fs::read_to_string(&old.config_path)
        .with_context(|| format!("failed to read {}", old.config_path.display()))?;
    let new_hash = hash::compute(&content);
    if new_hash == CONFIG_HASH.load(Ordering::Relaxed) {
        return Ok(None);
    }

    let new = Arc::new(AppConfig::load(cli)?);
    CONFIG.store(Arc::clone(&new));
    CONFIG_HASH.store(new_hash, Ordering::Relaxed);

    Ok(Some(ConfigChange { old, new }))
}

pub fn init_config(config: AppConfig) -> Arc<AppConfig> {
    if let Ok(content) = fs::read_to_string(&config.config_path) {
        CONFIG_HASH.store(hash::compute(&content), Ordering::Relaxed);
    }

    let arc = Arc::new(config);
    CONFIG.store(Arc::clone(&arc));
    arc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_detection() {
        let old = Arc::new(AppConfig::default());
        let mut next = AppConfig::default();
        next.cache.update_period = 60;
        let change = ConfigChange {
            old: Arc::clone(&old),
            new: Arc::new(next),
        };
        assert!(change.cache_period_changed());
        assert!(!change.model_period_changed());

        let mut next = AppConfig::default();
        next.cache.model_update_period = 5;
        let change = ConfigChange {
            old,
            new: Arc::new(next),
        };
        assert!(!change.cache_period_changed());
        assert!(change.model_period_changed());
        assert!(!change.requires_restart());
    }

    #[test]
    fn test_requires_restart() {
        let old = Arc::new(AppConfig::default());
        let mut next = AppConfig::default();
        next.serve.port = 9999;
        let change = ConfigChange {
            old: Arc::clone(&old),
            new: Arc::new(next),
        };
        assert!(change.requires_restart());

        let mut next = AppConfig::default();
        next.runtime.debug = true;
        next.runtime.gzip = false;
        let change = ConfigChange {
            old,
            new: Arc::new(next),
        };
        assert!(!change.requires_restart());
    }
}
