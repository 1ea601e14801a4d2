//! HTTP front end.
//!
//! ```text
//! tiny_http ─► rayon pool ─► response::respond ─► Manager::process
//!                                   ▲
//! notify ─► watch ─► ServeRuntime ──┘ (settings, cache/model events)
//! ```

mod lifecycle;
mod response;
mod watch;

pub use lifecycle::{is_shutdown, setup_shutdown_handler};

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tiny_http::{Request, Server};

use crate::config::{AppConfig, ConfigChange};
use crate::manager::{Manager, ManagerBuilder, ManagerError, ManagerSettings, Scheduler};
use crate::{debug, log};

/// Manager plus the model refresh timer driving it.
pub struct ServeRuntime {
    manager: Arc<Manager>,
    model_timer: Mutex<Option<Scheduler>>,
}

impl ServeRuntime {
    pub fn new(manager: Arc<Manager>) -> Self {
        Self {
            manager,
            model_timer: Mutex::new(None),
        }
    }

    pub fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }

    /// Replace the model refresh timer; a zero period stops it.
    ///
    /// The timer's immediate first tick is skipped: the model was just
    /// loaded (or reloaded) by whoever called this.
    pub fn restart_model_timer(&self, period: Duration) {
        let mut slot = self.model_timer.lock();
        slot.take();

        let manager = Arc::clone(&self.manager);
        let mut first = true;
        *slot = Scheduler::spawn("model-refresh", period, move |_| {
            if std::mem::take(&mut first) {
                return Ok(());
            }
            manager.on_model_period_changed()
        });
    }

    pub fn is_model_timer_running(&self) -> bool {
        self.model_timer.lock().is_some()
    }

    /// Push a reloaded config into the running manager.
    pub fn apply_change(&self, change: &ConfigChange) -> Result<(), ManagerError> {
        let new = &change.new;
        self.manager.apply_settings(ManagerSettings {
            debug: new.runtime.debug,
            gzip: new.runtime.gzip,
            update_period: new.cache.update_period(),
        });

        if change.model_period_changed() {
            self.manager.on_model_period_changed()?;
            self.restart_model_timer(new.cache.model_update_period());
        } else if change.cache_period_changed() {
            self.manager.on_cache_period_changed()?;
        }
        if change.requires_restart() {
            log!("warning"; "some config changes take effect after a restart");
        }
        Ok(())
    }

    /// Stop timers and destroy the manager.
    pub fn shutdown(&self) {
        self.model_timer.lock().take();
        if let Err(e) = self.manager.destroy() {
            debug!("serve"; "manager teardown: {}", e);
        }
    }
}

/// Run the server until Ctrl+C.
pub fn serve(config: Arc<AppConfig>) -> Result<()> {
    let manager = ManagerBuilder::from_config(&config)
        .build()
        .context("failed to set up manager")?;
    let runtime = Arc::new(ServeRuntime::new(Arc::new(manager)));

    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);
    lifecycle::register_server(Arc::clone(&server));
    log!("serve"; "http://{}{}/<group>.<js|css>", addr, config.serve.normalized_prefix());
    if config.runtime.debug {
        log!("serve"; "admin API enabled");
    }

    runtime.restart_model_timer(config.cache.model_update_period());
    let _watcher = match watch::ConfigWatcher::spawn(&config, Arc::clone(&runtime)) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            log!("warning"; "file watching disabled: {}", e);
            None
        }
    };

    let result = run_request_loop(&server, &runtime, &config);
    runtime.shutdown();
    result
}

fn run_request_loop(
    server: &Server,
    runtime: &Arc<ServeRuntime>,
    config: &Arc<AppConfig>,
) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("wrought-http-{i}"))
        .build()
        .context("failed to create thread pool")?;

    for request in server.incoming_requests() {
        let runtime = Arc::clone(runtime);
        let config = Arc::clone(config);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &runtime, &config) {
                log!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

fn handle_request(request: Request, runtime: &ServeRuntime, config: &AppConfig) -> Result<()> {
    if is_shutdown() {
        return response::respond_unavailable(request);
    }
    let path = request.url().split('?').next().unwrap_or_default();
    let matches = config.serve.matches(path);
    debug!("serve"; "{} {}", request.method(), request.url());
    response::respond(request, runtime.manager(), matches)
}
