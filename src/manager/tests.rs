use std::io::Read;
use std::sync::atomic::AtomicUsize;
use std::thread;
use std::time::Instant;

use flate2::read::GzDecoder;
use rustc_hash::FxHashMap;

use super::*;
use crate::cache::{CacheStore, LruStore};
use crate::core::ResourceType;
use crate::fingerprint::{FingerprintCreator, FxFingerprint};
use crate::locator::{LocateError, UriLocator};
use crate::model::{Group, Model, ModelError, ModelSource, Resource};
use crate::processor::{BuildError, GroupProcessor};

// ============================================================================
// Test doubles
// ============================================================================

#[derive(Default)]
struct CountingModel {
    reloads: AtomicUsize,
    destroyed: AtomicBool,
}

impl ModelSource for CountingModel {
    fn model(&self) -> Result<Arc<Model>, ModelError> {
        let groups = vec![
            Group::new(
                "all",
                vec![
                    Resource::new(ResourceType::Js, "a.js"),
                    Resource::new(ResourceType::Css, "a.css"),
                ],
            ),
            Group::new("scripts", vec![Resource::new(ResourceType::Js, "b.js")]),
            Group::new("broken", vec![Resource::new(ResourceType::Js, "x.js")]),
        ];
        Ok(Arc::new(Model::new(groups)?))
    }

    fn on_model_period_changed(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct CountingProcessor {
    calls: AtomicUsize,
}

impl GroupProcessor for CountingProcessor {
    fn process(
        &self,
        group: &Group,
        kind: ResourceType,
        minimize: bool,
    ) -> Result<Option<String>, BuildError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if group.name == "broken" {
            return Err(BuildError::GroupNotFound(group.name.clone()));
        }
        if !group.has_resources_of(kind) {
            return Ok(None);
        }
        Ok(Some(format!("{}:{}:{}", group.name, kind, minimize)))
    }
}

struct MapLocator(FxHashMap<String, Vec<u8>>);

impl UriLocator for MapLocator {
    fn locate(&self, uri: &str) -> Result<Vec<u8>, LocateError> {
        self.0
            .get(uri)
            .cloned()
            .ok_or_else(|| LocateError::NotFound(uri.to_string()))
    }
}

impl UriLocatorFactory for MapLocator {
    fn locator_for(&self, _uri: &str) -> Option<&dyn UriLocator> {
        Some(self)
    }
}

struct Allow(Vec<&'static str>);

impl AllowList for Allow {
    fn is_uri_allowed(&self, uri: &str) -> bool {
        self.0.contains(&uri)
    }
}

struct Fixture {
    manager: Manager,
    model: Arc<CountingModel>,
    processor: Arc<CountingProcessor>,
    cache: Arc<LruStore<CacheKey, CacheEntry>>,
}

fn fixture(settings: ManagerSettings) -> Fixture {
    let model = Arc::new(CountingModel::default());
    let processor = Arc::new(CountingProcessor::default());
    let cache = Arc::new(LruStore::new(16));

    let mut files = FxHashMap::default();
    files.insert("img/a.png".to_string(), b"PNG".to_vec());
    files.insert("img/private.png".to_string(), b"SECRET".to_vec());

    let manager = Manager::builder()
        .model(model.clone())
        .cache(cache.clone())
        .processor(processor.clone())
        .fingerprint(Arc::new(FxFingerprint))
        .locators(Arc::new(MapLocator(files)))
        .allow_list(Arc::new(Allow(vec!["img/a.png", "img/missing.png"])))
        .settings(settings)
        .build()
        .unwrap();

    Fixture {
        manager,
        model,
        processor,
        cache,
    }
}

fn serve(manager: &Manager, target: &str) -> Result<BufferedResponse, ManagerError> {
    let mut response = BufferedResponse::new();
    manager.process(&RequestDescriptor::parse(target), &mut response)?;
    Ok(response)
}

fn wait_until(timeout: Duration, done: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    done()
}

// ============================================================================
// Builder
// ============================================================================

#[test]
fn test_builder_requires_collaborators() {
    let err = Manager::builder().build().err().unwrap();
    assert!(matches!(err, ManagerError::Configuration("model source")));

    let err = Manager::builder()
        .model(Arc::new(CountingModel::default()))
        .cache(Arc::new(LruStore::new(1)))
        .processor(Arc::new(CountingProcessor::default()))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, ManagerError::Configuration("fingerprint creator")));

    let err = Manager::builder()
        .model(Arc::new(CountingModel::default()))
        .fingerprint(Arc::new(FxFingerprint))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, ManagerError::Configuration("cache store")));
}

// ============================================================================
// Group requests
// ============================================================================

#[test]
fn test_miss_then_hit() {
    let f = fixture(ManagerSettings::default());

    let first = serve(&f.manager, "/wro/all.js").unwrap();
    assert_eq!(f.processor.calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.body_bytes(), b"all:js:true");

    let second = serve(&f.manager, "/wro/all.js").unwrap();
    assert_eq!(f.processor.calls.load(Ordering::SeqCst), 1);
    assert_eq!(second.body_bytes(), first.body_bytes());
    assert_eq!(second.header("ETag"), first.header("ETag"));
}

#[test]
fn test_headers() {
    let f = fixture(ManagerSettings::default());
    let response = serve(&f.manager, "/wro/all.css?minimize=false").unwrap();

    assert_eq!(response.content_type(), Some(ResourceType::Css.content_type()));
    let expected = format!("\"{}\"", FxFingerprint.create("all:css:false"));
    assert_eq!(response.header("ETag"), Some(expected.as_str()));
    assert!(response.header("Content-Encoding").is_none());
}

#[test]
fn test_each_key_is_cached_separately() {
    let f = fixture(ManagerSettings::default());
    serve(&f.manager, "/wro/all.js").unwrap();
    serve(&f.manager, "/wro/all.js?minimize=false").unwrap();
    serve(&f.manager, "/wro/all.css").unwrap();
    assert_eq!(f.processor.calls.load(Ordering::SeqCst), 3);
    assert_eq!(f.cache.len(), 3);
}

#[test]
fn test_empty_group_output() {
    let f = fixture(ManagerSettings::default());
    let response = serve(&f.manager, "/wro/scripts.css").unwrap();
    assert!(response.body_bytes().is_empty());
    assert!(response.header("ETag").is_none());

    let cached = f.cache.get(&CacheKey::new("scripts", ResourceType::Css, true));
    assert_eq!(cached, Some(CacheEntry::empty()));
}

#[test]
fn test_not_found() {
    let f = fixture(ManagerSettings::default());
    assert!(matches!(
        serve(&f.manager, "/wro/all"),
        Err(ManagerError::NotFound(_))
    ));
    assert!(matches!(
        serve(&f.manager, "/wro/unknown.js"),
        Err(ManagerError::NotFound(_))
    ));
    assert!(f.cache.is_empty());
}

#[test]
fn test_build_error_is_not_cached() {
    let f = fixture(ManagerSettings::default());
    let err = serve(&f.manager, "/wro/broken.js").unwrap_err();
    assert!(matches!(err, ManagerError::Build { .. }));
    assert!(f.cache.is_empty());

    serve(&f.manager, "/wro/broken.js").unwrap_err();
    assert_eq!(f.processor.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_gzip_when_enabled_and_accepted() {
    let f = fixture(ManagerSettings {
        gzip: true,
        ..ManagerSettings::default()
    });

    let mut response = BufferedResponse::new();
    let request = RequestDescriptor::parse("/wro/all.js").with_accepts_gzip(true);
    f.manager.process(&request, &mut response).unwrap();
    assert_eq!(response.header("Content-Encoding"), Some("gzip"));

    let mut decoded = String::new();
    GzDecoder::new(response.body_bytes())
        .read_to_string(&mut decoded)
        .unwrap();
    assert_eq!(decoded, "all:js:true");

    let plain = serve(&f.manager, "/wro/all.js").unwrap();
    assert!(plain.header("Content-Encoding").is_none());
    assert_eq!(plain.body_bytes(), b"all:js:true");
}

#[test]
fn test_gzip_disabled_ignores_accept() {
    let f = fixture(ManagerSettings::default());
    let mut response = BufferedResponse::new();
    let request = RequestDescriptor::parse("/wro/all.js").with_accepts_gzip(true);
    f.manager.process(&request, &mut response).unwrap();
    assert!(response.header("Content-Encoding").is_none());
}

// ============================================================================
// Admin API
// ============================================================================

#[test]
fn test_reload_cache_in_debug() {
    let f = fixture(ManagerSettings {
        debug: true,
        update_period: Duration::from_secs(3600),
        ..ManagerSettings::default()
    });
    serve(&f.manager, "/wro/all.js").unwrap();
    assert!(!f.cache.is_empty());
    assert!(f.manager.is_scheduler_running());

    let response = serve(&f.manager, "/wro/wroAPI/reloadCache").unwrap();
    assert_eq!(response.body_bytes(), b"OK");
    assert!(f.cache.get(&CacheKey::new("all", ResourceType::Js, true)).is_none());
    assert!(!f.manager.is_scheduler_running());
    assert_eq!(f.model.reloads.load(Ordering::SeqCst), 0);
}

#[test]
fn test_reload_model_in_debug() {
    let f = fixture(ManagerSettings {
        debug: true,
        ..ManagerSettings::default()
    });
    serve(&f.manager, "/wro/all.js").unwrap();
    serve(&f.manager, "/wro/wroAPI/reloadModel").unwrap();
    assert!(f.cache.is_empty());
    assert_eq!(f.model.reloads.load(Ordering::SeqCst), 1);
}

#[test]
fn test_api_unreachable_without_debug() {
    let f = fixture(ManagerSettings::default());
    serve(&f.manager, "/wro/all.js").unwrap();

    let err = serve(&f.manager, "/wro/wroAPI/reloadCache").unwrap_err();
    assert!(matches!(err, ManagerError::NotFound(_)));
    assert_eq!(f.cache.len(), 1);
}

#[test]
fn test_unknown_api_action() {
    let f = fixture(ManagerSettings {
        debug: true,
        ..ManagerSettings::default()
    });
    let err = serve(&f.manager, "/wro/wroAPI/flush").unwrap_err();
    assert!(matches!(err, ManagerError::NotFound(_)));
}

// ============================================================================
// Proxy resources
// ============================================================================

#[test]
fn test_proxy_allowed_resource() {
    let f = fixture(ManagerSettings::default());
    let response = serve(&f.manager, "/wro/wroResources?id=img%2Fa.png").unwrap();
    assert_eq!(response.body_bytes(), b"PNG");
    assert_eq!(response.content_type(), Some(mime::types::PNG));
    assert!(response.header("ETag").is_none());
    assert_eq!(f.processor.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_proxy_rejects_unlisted() {
    let f = fixture(ManagerSettings::default());
    let err = serve(&f.manager, "/wro/wroResources?id=img/private.png").unwrap_err();
    assert!(matches!(err, ManagerError::Unauthorized(id) if id == "img/private.png"));
}

#[test]
fn test_proxy_not_found() {
    let f = fixture(ManagerSettings::default());
    assert!(matches!(
        serve(&f.manager, "/wro/wroResources?id=img/missing.png"),
        Err(ManagerError::NotFound(_))
    ));
    assert!(matches!(
        serve(&f.manager, "/wro/wroResources"),
        Err(ManagerError::NotFound(_))
    ));
}

// ============================================================================
// Scheduler
// ============================================================================

#[test]
fn test_no_scheduler_for_zero_period() {
    let f = fixture(ManagerSettings::default());
    serve(&f.manager, "/wro/all.js").unwrap();
    assert!(!f.manager.is_scheduler_running());
}

#[test]
fn test_scheduler_started_once_on_miss() {
    let f = fixture(ManagerSettings {
        update_period: Duration::from_secs(3600),
        ..ManagerSettings::default()
    });
    assert!(!f.manager.is_scheduler_running());
    let passes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&passes);
    f.manager.register_cache_change_callback(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| serve(&f.manager, "/wro/scripts.js").unwrap());
        }
    });
    assert!(f.manager.is_scheduler_running());

    // Each scheduler runs one pass right away; the next is an hour out.
    assert!(wait_until(Duration::from_secs(5), || passes.load(Ordering::SeqCst) >= 1));
    thread::sleep(Duration::from_millis(100));
    assert_eq!(passes.load(Ordering::SeqCst), 1);

    f.manager.destroy().unwrap();
}

#[test]
fn test_scheduler_refreshes_every_key() {
    let f = fixture(ManagerSettings {
        update_period: Duration::from_millis(20),
        ..ManagerSettings::default()
    });
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    f.manager.register_cache_change_callback(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    serve(&f.manager, "/wro/scripts.js").unwrap();

    // all: js+css, scripts: js; two minimize states each. `broken` fails.
    let keys = [
        CacheKey::new("all", ResourceType::Js, true),
        CacheKey::new("all", ResourceType::Js, false),
        CacheKey::new("all", ResourceType::Css, true),
        CacheKey::new("all", ResourceType::Css, false),
        CacheKey::new("scripts", ResourceType::Js, true),
        CacheKey::new("scripts", ResourceType::Js, false),
    ];
    assert!(wait_until(Duration::from_secs(5), || {
        notified.load(Ordering::SeqCst) >= 2 && keys.iter().all(|k| f.cache.get(k).is_some())
    }));
    assert!(f.cache.get(&CacheKey::new("scripts", ResourceType::Css, true)).is_none());
    assert!(f.cache.get(&CacheKey::new("broken", ResourceType::Js, true)).is_none());

    f.manager.destroy().unwrap();
}

#[test]
fn test_cache_period_change_stops_scheduler() {
    let f = fixture(ManagerSettings {
        update_period: Duration::from_secs(3600),
        ..ManagerSettings::default()
    });
    serve(&f.manager, "/wro/all.js").unwrap();
    assert!(f.manager.is_scheduler_running());

    f.manager.on_cache_period_changed().unwrap();
    assert!(!f.manager.is_scheduler_running());
    assert!(f.cache.is_empty());

    serve(&f.manager, "/wro/all.js").unwrap();
    assert!(f.manager.is_scheduler_running());
}

#[test]
fn test_apply_settings() {
    let f = fixture(ManagerSettings::default());
    let settings = ManagerSettings {
        debug: true,
        gzip: true,
        update_period: Duration::from_secs(30),
    };
    f.manager.apply_settings(settings);
    assert_eq!(f.manager.settings(), settings);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_destroy_is_terminal() {
    let f = fixture(ManagerSettings {
        update_period: Duration::from_secs(3600),
        ..ManagerSettings::default()
    });
    serve(&f.manager, "/wro/all.js").unwrap();

    f.manager.destroy().unwrap();
    assert!(f.manager.is_destroyed());
    assert!(!f.manager.is_scheduler_running());
    assert!(f.model.destroyed.load(Ordering::SeqCst));
    assert!(f.cache.is_empty());

    assert!(matches!(
        serve(&f.manager, "/wro/all.js"),
        Err(ManagerError::IllegalState)
    ));
    assert!(matches!(
        f.manager.on_cache_period_changed(),
        Err(ManagerError::IllegalState)
    ));
    assert!(matches!(f.manager.destroy(), Err(ManagerError::IllegalState)));
}

#[test]
fn test_no_scheduler_after_destroy() {
    let f = fixture(ManagerSettings {
        update_period: Duration::from_secs(3600),
        ..ManagerSettings::default()
    });
    f.manager.destroy().unwrap();

    // A miss that passed the liveness check before teardown.
    f.manager.start_scheduler();
    assert!(!f.manager.is_scheduler_running());
}

// ============================================================================
// Model reload ordering
// ============================================================================

/// Single group whose resource name follows a version bumped on reload.
#[derive(Default)]
struct VersionedModel {
    version: AtomicUsize,
}

impl ModelSource for VersionedModel {
    fn model(&self) -> Result<Arc<Model>, ModelError> {
        let uri = format!("v{}.js", self.version.load(Ordering::SeqCst) + 1);
        let group = Group::new("all", vec![Resource::new(ResourceType::Js, uri)]);
        Ok(Arc::new(Model::new(vec![group])?))
    }

    fn on_model_period_changed(&self) {
        self.version.fetch_add(1, Ordering::SeqCst);
    }
}

/// Emits the uris of the group's resources.
struct UriProcessor;

impl GroupProcessor for UriProcessor {
    fn process(
        &self,
        group: &Group,
        kind: ResourceType,
        _minimize: bool,
    ) -> Result<Option<String>, BuildError> {
        let uris: Vec<_> = group.resources_of(kind).map(|r| r.uri.as_str()).collect();
        Ok(Some(uris.join(",")))
    }
}

/// Store that serves a request for `key` right after every clear.
struct RefillingCache {
    inner: LruStore<CacheKey, CacheEntry>,
    manager: std::sync::OnceLock<std::sync::Weak<Manager>>,
    key: CacheKey,
}

impl CacheStore<CacheKey, CacheEntry> for RefillingCache {
    fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.inner.get(key)
    }

    fn put(&self, key: CacheKey, value: CacheEntry) {
        self.inner.put(key, value);
    }

    fn clear(&self) {
        self.inner.clear();
        if let Some(manager) = self.manager.get().and_then(|m| m.upgrade()) {
            manager.entry(&self.key).unwrap();
        }
    }

    fn destroy(&self) {
        self.inner.destroy();
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

#[test]
fn test_model_reload_never_caches_old_model() {
    let key = CacheKey::new("all", ResourceType::Js, true);
    let cache = Arc::new(RefillingCache {
        inner: LruStore::new(4),
        manager: std::sync::OnceLock::new(),
        key: key.clone(),
    });
    let manager = Arc::new(
        Manager::builder()
            .model(Arc::new(VersionedModel::default()))
            .cache(cache.clone())
            .processor(Arc::new(UriProcessor))
            .fingerprint(Arc::new(FxFingerprint))
            .build()
            .unwrap(),
    );
    cache.manager.set(Arc::downgrade(&manager)).unwrap();

    assert_eq!(manager.entry(&key).unwrap().content(), Some("v1.js"));
    manager.on_model_period_changed().unwrap();
    assert_eq!(manager.entry(&key).unwrap().content(), Some("v2.js"));
}
