//! Request orchestration.
//!
//! ```text
//! request ─► admin API? (debug only) ─► proxy resource? ─► extract key
//!                                                            │
//!                     cache hit ◄── lookup ──► miss: start scheduler,
//!                         │                      fill via policy
//!                         ▼
//!           content type + ETag, optional gzip, write body
//! ```
//!
//! The manager owns the refresh scheduler. It is created on the first
//! miss, torn down by cache/model period changes and recreated by the
//! next miss.

mod builder;
mod error;
mod pipeline;
mod policy;
mod request;
mod scheduler;

pub use builder::ManagerBuilder;
pub use error::ManagerError;
pub use policy::{FillPolicy, SingleFlight, Unsynchronized};
pub use request::{BufferedResponse, RequestDescriptor, ResponseSink};
pub use scheduler::Scheduler;

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use flate2::Compression;
use flate2::write::GzEncoder;
use parking_lot::Mutex;

use crate::core::{CacheEntry, CacheKey};
use crate::extract::GroupExtractor;
use crate::locator::UriLocatorFactory;
use crate::processor::AllowList;
use crate::utils::mime;
use crate::{debug, log};
use pipeline::Pipeline;

/// Path segment of the admin API.
pub const PATH_API: &str = "wroAPI";
/// Admin action: clear the cache and stop the scheduler.
pub const API_RELOAD_CACHE: &str = "reloadCache";
/// Admin action: as `reloadCache`, and drop the parsed model.
pub const API_RELOAD_MODEL: &str = "reloadModel";
/// Path segment of proxied resources.
pub const PATH_RESOURCES: &str = "wroResources";
/// Query parameter carrying the proxied resource id.
pub const PARAM_RESOURCE_ID: &str = "id";

/// Runtime switches the manager reads on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ManagerSettings {
    /// Enables the admin API.
    pub debug: bool,
    pub gzip: bool,
    /// Refresh period; zero disables the scheduler.
    pub update_period: Duration,
}

pub struct Manager {
    pipeline: Arc<Pipeline>,
    extractor: Box<dyn GroupExtractor>,
    locators: Option<Arc<dyn UriLocatorFactory>>,
    allow_list: Option<Arc<dyn AllowList>>,
    debug: AtomicBool,
    gzip: AtomicBool,
    update_period_ms: AtomicU64,
    scheduler: Mutex<Option<Scheduler>>,
    destroyed: AtomicBool,
}

impl Manager {
    pub fn builder() -> ManagerBuilder {
        ManagerBuilder::new()
    }

    /// Serve one request into `sink`.
    pub fn process(
        &self,
        request: &RequestDescriptor,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), ManagerError> {
        self.ensure_alive()?;

        if self.debug.load(Ordering::Relaxed) && self.handle_api(request, sink)? {
            return Ok(());
        }
        if request.has_segment(PATH_RESOURCES) {
            return self.serve_resource(request, sink);
        }

        let key = self
            .extractor
            .extract(request)
            .ok_or_else(|| ManagerError::NotFound(request.path().to_string()))?;
        let entry = self.entry(&key)?;

        sink.set_content_type(key.kind.content_type());
        if let Some(fingerprint) = entry.fingerprint() {
            sink.set_header("ETag", &format!("\"{fingerprint}\""));
        }
        self.write_body(request, sink, entry.bytes())
    }

    /// Cached entry for `key`, building it on a miss.
    pub fn entry(&self, key: &CacheKey) -> Result<CacheEntry, ManagerError> {
        self.ensure_alive()?;
        if let Some(entry) = self.pipeline.cache.get(key) {
            debug!("cache"; "hit {}", key);
            return Ok(entry);
        }
        self.start_scheduler();
        self.pipeline.fill(key)
    }

    /// Listener invoked at the start of every refresh pass.
    pub fn register_cache_change_callback(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.pipeline.callback.write() = Some(Arc::new(callback));
    }

    /// Stop the scheduler and clear the cache.
    pub fn on_cache_period_changed(&self) -> Result<(), ManagerError> {
        self.ensure_alive()?;
        self.stop_scheduler();
        self.pipeline.cache.clear();
        log!("cache"; "cleared");
        Ok(())
    }

    /// As [`on_cache_period_changed`](Self::on_cache_period_changed), and make
    /// the model source re-read its model.
    ///
    /// The model is dropped before the cache is cleared, so a miss racing
    /// this call cannot store a group built from the old model.
    pub fn on_model_period_changed(&self) -> Result<(), ManagerError> {
        self.ensure_alive()?;
        self.pipeline.model.on_model_period_changed();
        self.on_cache_period_changed()?;
        log!("cache"; "model reloaded");
        Ok(())
    }

    /// Apply new runtime switches. A changed period takes effect when the
    /// scheduler is next started.
    pub fn apply_settings(&self, settings: ManagerSettings) {
        self.debug.store(settings.debug, Ordering::Relaxed);
        self.gzip.store(settings.gzip, Ordering::Relaxed);
        self.update_period_ms
            .store(settings.update_period.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn settings(&self) -> ManagerSettings {
        ManagerSettings {
            debug: self.debug.load(Ordering::Relaxed),
            gzip: self.gzip.load(Ordering::Relaxed),
            update_period: self.update_period(),
        }
    }

    pub fn is_scheduler_running(&self) -> bool {
        self.scheduler.lock().is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Tear everything down. The scheduler is cancelled without waiting;
    /// every later call fails with [`ManagerError::IllegalState`].
    pub fn destroy(&self) -> Result<(), ManagerError> {
        // Flag and slot change under the scheduler lock so a racing miss
        // cannot start a scheduler after teardown.
        let scheduler = {
            let mut slot = self.scheduler.lock();
            if self.destroyed.swap(true, Ordering::AcqRel) {
                return Err(ManagerError::IllegalState);
            }
            slot.take()
        };
        if let Some(mut scheduler) = scheduler {
            scheduler.cancel();
        }
        self.pipeline.cache.destroy();
        self.pipeline.model.destroy();
        debug!("cache"; "manager destroyed");
        Ok(())
    }

    fn ensure_alive(&self) -> Result<(), ManagerError> {
        if self.is_destroyed() {
            return Err(ManagerError::IllegalState);
        }
        Ok(())
    }

    fn update_period(&self) -> Duration {
        Duration::from_millis(self.update_period_ms.load(Ordering::Relaxed))
    }

    /// Admin API; `Ok(true)` when the request was handled.
    fn handle_api(
        &self,
        request: &RequestDescriptor,
        sink: &mut dyn ResponseSink,
    ) -> Result<bool, ManagerError> {
        if !request.has_segment(PATH_API) {
            return Ok(false);
        }
        if request.has_segment(API_RELOAD_CACHE) {
            self.on_cache_period_changed()?;
        } else if request.has_segment(API_RELOAD_MODEL) {
            self.on_model_period_changed()?;
        } else {
            return Ok(false);
        }
        sink.set_content_type(mime::types::PLAIN);
        request::write_all(sink, b"OK")?;
        Ok(true)
    }

    /// Proxy a resource referenced from rewritten CSS.
    fn serve_resource(
        &self,
        request: &RequestDescriptor,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), ManagerError> {
        let id = request
            .param(PARAM_RESOURCE_ID)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ManagerError::NotFound(request.path().to_string()))?;

        if let Some(allow) = &self.allow_list
            && !allow.is_uri_allowed(id)
        {
            return Err(ManagerError::Unauthorized(id.to_string()));
        }

        let locator = self
            .locators
            .as_ref()
            .and_then(|factory| factory.locator_for(id))
            .ok_or_else(|| ManagerError::NotFound(id.to_string()))?;
        let bytes = locator.locate(id).map_err(|err| {
            debug!("serve"; "proxy {}: {}", id, err);
            ManagerError::NotFound(id.to_string())
        })?;

        sink.set_content_type(mime::from_uri(id));
        self.write_body(request, sink, &bytes)
    }

    fn write_body(
        &self,
        request: &RequestDescriptor,
        sink: &mut dyn ResponseSink,
        bytes: &[u8],
    ) -> Result<(), ManagerError> {
        if !(self.gzip.load(Ordering::Relaxed) && request.accepts_gzip()) {
            return Ok(request::write_all(sink, bytes)?);
        }

        sink.set_header("Content-Encoding", "gzip");
        sink.set_header("Vary", "Accept-Encoding");
        let mut encoder = GzEncoder::new(sink.body(), Compression::default());
        encoder.write_all(bytes)?;
        encoder.finish()?.flush()?;
        Ok(())
    }

    /// Start the refresh scheduler unless one is running, disabled, or the
    /// manager is destroyed.
    fn start_scheduler(&self) {
        let mut slot = self.scheduler.lock();
        if slot.is_some() || self.is_destroyed() {
            return;
        }
        let pipeline = Arc::clone(&self.pipeline);
        *slot = Scheduler::spawn("cache-refresh", self.update_period(), move |cancelled| {
            pipeline
                .refresh_all(cancelled)
                .map(|_| ())
                .map_err(|err| err.describe())
        });
    }

    fn stop_scheduler(&self) {
        if let Some(mut scheduler) = self.scheduler.lock().take() {
            scheduler.cancel();
            debug!("scheduler"; "{} cancelled", scheduler.name());
        }
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.stop_scheduler();
    }
}

#[cfg(test)]
mod tests;
