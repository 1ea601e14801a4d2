//! Manager wiring and validation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64};

use parking_lot::{Mutex, RwLock};

use super::pipeline::Pipeline;
use super::{FillPolicy, Manager, ManagerError, ManagerSettings, Unsynchronized};
use crate::cache::{CacheStore, LruStore};
use crate::config::AppConfig;
use crate::core::{CacheEntry, CacheKey};
use crate::extract::{DefaultGroupExtractor, GroupExtractor};
use crate::fingerprint::FingerprintCreator;
use crate::locator::{FileLocatorFactory, UriLocatorFactory};
use crate::model::{FileModelSource, ModelSource};
use crate::processor::{AllowList, CssUrlRewriter, DefaultGroupProcessor, GroupProcessor};

/// Collects collaborators; [`build`](Self::build) rejects an incomplete set.
///
/// Required: model source, cache store, group processor, fingerprint
/// creator. Everything else has a default or is optional.
#[derive(Default)]
pub struct ManagerBuilder {
    model: Option<Arc<dyn ModelSource>>,
    cache: Option<Arc<dyn CacheStore<CacheKey, CacheEntry>>>,
    processor: Option<Arc<dyn GroupProcessor>>,
    fingerprint: Option<Arc<dyn FingerprintCreator>>,
    extractor: Option<Box<dyn GroupExtractor>>,
    locators: Option<Arc<dyn UriLocatorFactory>>,
    allow_list: Option<Arc<dyn AllowList>>,
    policy: Option<Arc<dyn FillPolicy>>,
    settings: ManagerSettings,
}

impl ManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire the file-backed collaborators described by `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        let locators: Arc<dyn UriLocatorFactory> =
            Arc::new(FileLocatorFactory::new(config.model.base_dir()));
        let mut processor = DefaultGroupProcessor::new(Arc::clone(&locators))
            .with_ignore_missing(config.runtime.ignore_missing_resources);

        let mut builder = Self::new()
            .model(Arc::new(FileModelSource::new(
                &config.model.path,
                config.model.format,
            )))
            .cache(Arc::new(LruStore::new(config.cache.capacity)))
            .fingerprint(config.cache.fingerprint.creator())
            .locators(locators)
            .settings(ManagerSettings {
                debug: config.runtime.debug,
                gzip: config.runtime.gzip,
                update_period: config.cache.update_period(),
            });

        if config.runtime.rewrite_css_urls {
            let rewriter = Arc::new(CssUrlRewriter::new(&config.serve.prefix));
            processor = processor.with_rewriter(Arc::clone(&rewriter));
            builder = builder.allow_list(rewriter);
        }
        if config.cache.single_flight {
            builder = builder.policy(Arc::new(super::SingleFlight::new()));
        }
        builder.processor(Arc::new(processor))
    }

    pub fn model(mut self, model: Arc<dyn ModelSource>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn CacheStore<CacheKey, CacheEntry>>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn processor(mut self, processor: Arc<dyn GroupProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn fingerprint(mut self, fingerprint: Arc<dyn FingerprintCreator>) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    /// Defaults to [`DefaultGroupExtractor`].
    pub fn extractor(mut self, extractor: impl GroupExtractor + 'static) -> Self {
        self.extractor = Some(Box::new(extractor));
        self
    }

    /// Locators for proxied resources. Without one every proxy request is
    /// a 404.
    pub fn locators(mut self, locators: Arc<dyn UriLocatorFactory>) -> Self {
        self.locators = Some(locators);
        self
    }

    pub fn allow_list(mut self, allow_list: Arc<dyn AllowList>) -> Self {
        self.allow_list = Some(allow_list);
        self
    }

    /// Defaults to [`Unsynchronized`].
    pub fn policy(mut self, policy: Arc<dyn FillPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn settings(mut self, settings: ManagerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Result<Manager, ManagerError> {
        let model = self.model.ok_or(ManagerError::Configuration("model source"))?;
        let cache = self.cache.ok_or(ManagerError::Configuration("cache store"))?;
        let processor = self
            .processor
            .ok_or(ManagerError::Configuration("group processor"))?;
        let fingerprint = self
            .fingerprint
            .ok_or(ManagerError::Configuration("fingerprint creator"))?;

        let pipeline = Pipeline {
            model,
            cache,
            processor,
            fingerprint,
            policy: self.policy.unwrap_or_else(|| Arc::new(Unsynchronized)),
            callback: RwLock::new(None),
        };

        Ok(Manager {
            pipeline: Arc::new(pipeline),
            extractor: self
                .extractor
                .unwrap_or_else(|| Box::new(DefaultGroupExtractor)),
            locators: self.locators,
            allow_list: self.allow_list,
            debug: AtomicBool::new(self.settings.debug),
            gzip: AtomicBool::new(self.settings.gzip),
            update_period_ms: AtomicU64::new(self.settings.update_period.as_millis() as u64),
            scheduler: Mutex::new(None),
            destroyed: AtomicBool::new(false),
        })
    }
}
