//! Config and model file watcher.
//!
//! ```text
//! notify ─► channel ─► debounce ─► classify ─► ServeRuntime
//! ```
//!
//! A changed `wrought.toml` is reloaded and pushed into the manager; a
//! changed model file drops the cached model and every cached group.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::ServeRuntime;
use crate::config::{AppConfig, reload_config};
use crate::utils::path::normalize_path;
use crate::{debug, log};

/// Quiet window after the last event before acting.
const DEBOUNCE_MS: u64 = 300;

/// Keeps the notify watcher alive for the server's lifetime.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
}

impl ConfigWatcher {
    pub fn spawn(config: &AppConfig, runtime: Arc<ServeRuntime>) -> notify::Result<Self> {
        let (tx, rx) = channel::unbounded();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;

        let targets = WatchTargets::new(config);
        for dir in targets.dirs() {
            watcher.watch(&dir, RecursiveMode::NonRecursive)?;
            debug!("watch"; "watching {}", dir.display());
        }

        thread::Builder::new()
            .name("wrought-watch".into())
            .spawn(move || run(&rx, &targets, &runtime))
            .map_err(|e| notify::Error::generic(&e.to_string()))?;

        Ok(Self { _watcher: watcher })
    }
}

/// What a batch of events touched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Changes {
    config: bool,
    model: bool,
}

impl Changes {
    fn any(self) -> bool {
        self.config || self.model
    }
}

/// The two files the server reacts to.
#[derive(Debug, Clone)]
struct WatchTargets {
    config: Option<PathBuf>,
    model: PathBuf,
}

impl WatchTargets {
    fn new(config: &AppConfig) -> Self {
        // Configs built in memory have no file behind them.
        let config_file = (!config.config_path.as_os_str().is_empty())
            .then(|| normalize_path(&config.config_path));
        Self {
            config: config_file,
            model: normalize_path(&config.model.path),
        }
    }

    /// Existing parent directories, deduplicated.
    ///
    /// Editors replace files by rename, so the directory is watched
    /// instead of the file itself.
    fn dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = Vec::new();
        for file in self.config.iter().chain(std::iter::once(&self.model)) {
            if let Some(dir) = file.parent()
                && dir.is_dir()
                && !dirs.iter().any(|d| d == dir)
            {
                dirs.push(dir.to_path_buf());
            }
        }
        dirs
    }

    fn classify(&self, event: &Event, changes: &mut Changes) {
        match event.kind {
            EventKind::Create(_) | EventKind::Remove(_) => {}
            EventKind::Modify(ModifyKind::Metadata(_)) => return,
            EventKind::Modify(_) => {}
            _ => return,
        }

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }
            let path = normalize_path(path);
            if self.config.as_deref() == Some(path.as_path()) {
                changes.config = true;
            }
            if path == self.model {
                changes.model = true;
            }
        }
    }
}

fn run(rx: &Receiver<notify::Result<Event>>, targets: &WatchTargets, runtime: &ServeRuntime) {
    let debounce = Duration::from_millis(DEBOUNCE_MS);

    while let Ok(first) = rx.recv() {
        let mut changes = Changes::default();
        accept(first, targets, &mut changes);

        loop {
            match rx.recv_timeout(debounce) {
                Ok(next) => accept(next, targets, &mut changes),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }

        if changes.any() && !super::is_shutdown() {
            apply(changes, runtime);
        }
    }
}

fn accept(result: notify::Result<Event>, targets: &WatchTargets, changes: &mut Changes) {
    match result {
        Ok(event) => targets.classify(&event, changes),
        Err(e) => log!("watch"; "notify error: {}", e),
    }
}

fn apply(changes: Changes, runtime: &ServeRuntime) {
    let mut model_handled = false;

    if changes.config {
        match reload_config() {
            Ok(Some(change)) => {
                model_handled = change.model_period_changed();
                match runtime.apply_change(&change) {
                    Ok(()) => log!("config"; "reloaded"),
                    Err(e) => log!("error"; "config reload: {}", e.describe()),
                }
            }
            Ok(None) => debug!("config"; "unchanged"),
            Err(e) => log!("error"; "config reload failed, keeping previous: {:#}", e),
        }
    }

    if changes.model && !model_handled {
        match runtime.manager().on_model_period_changed() {
            Ok(()) => log!("model"; "changed, cache dropped"),
            Err(e) => log!("error"; "model reload: {}", e.describe()),
        }
    }
}

/// Editor artifacts (swap, backup, dotfiles).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
