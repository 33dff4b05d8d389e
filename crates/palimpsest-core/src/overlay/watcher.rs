//! Override Watcher
//!
//! Watches the override tree and decides, per changed file, whether the host
//! can patch it incrementally or must reload fully.

use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexSet;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::common::OverlayError;
use crate::config::OverlayConfig;

/// Debounce window for bursts of filesystem events
const DEBOUNCE: Duration = Duration::from_millis(200);

/// What the host should do about a changed file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotUpdate {
    /// Not an override file; the host's normal handling applies
    Ignore,
    /// Non-template override; incremental patching is not attempted
    FullReload,
    /// Template override; defer to the host's incremental update path
    Incremental,
}

#[derive(Debug, Clone)]
pub struct HotUpdatePolicy {
    override_root: PathBuf,
    template_extensions: Vec<String>,
}

impl HotUpdatePolicy {
    pub fn new(config: &OverlayConfig) -> Self {
        Self {
            override_root: config.override_root.clone(),
            template_extensions: config.template_extensions.clone(),
        }
    }

    pub fn override_root(&self) -> &Path {
        &self.override_root
    }

    pub fn decide(&self, path: &Path) -> HotUpdate {
        if !path.starts_with(&self.override_root) {
            return HotUpdate::Ignore;
        }

        let is_template = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.template_extensions.iter().any(|t| t == ext))
            .unwrap_or(false);

        if is_template {
            HotUpdate::Incremental
        } else {
            HotUpdate::FullReload
        }
    }

    /// Same policy with the override root resolved to its canonical path, so
    /// it matches the absolute paths filesystem events carry
    fn canonical(&self) -> Result<Self, OverlayError> {
        let override_root = self
            .override_root
            .canonicalize()
            .map_err(|_| OverlayError::MissingRoot(self.override_root.clone()))?;
        Ok(Self {
            override_root,
            template_extensions: self.template_extensions.clone(),
        })
    }
}

pub struct OverlayWatcher;

impl OverlayWatcher {
    /// Start watching the override root
    ///
    /// Must be called from within a tokio runtime. `on_update` receives each
    /// changed path with a non-`Ignore` decision once per debounce window.
    pub async fn start<F>(policy: HotUpdatePolicy, on_update: F) -> Result<JoinHandle<()>, OverlayError>
    where
        F: Fn(&Path, HotUpdate) + Send + 'static,
    {
        use notify::{Event, RecursiveMode, Watcher};

        let policy = policy.canonical()?;
        info!("Starting override watcher on {:?}", policy.override_root());

        let (tx, mut rx) = tokio::sync::mpsc::channel::<Event>(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    let _ = tx.blocking_send(event);
                }
                Err(e) => warn!("Override watcher error: {}", e),
            }
        })?;

        watcher.watch(policy.override_root(), RecursiveMode::Recursive)?;

        let handle = tokio::spawn(async move {
            // Keep watcher alive
            let _watcher = watcher;

            while let Some(event) = rx.recv().await {
                let mut paths: IndexSet<PathBuf> = event.paths.into_iter().collect();

                tokio::time::sleep(DEBOUNCE).await;
                while let Ok(more) = rx.try_recv() {
                    paths.extend(more.paths);
                }

                for path in &paths {
                    let decision = policy.decide(path);
                    debug!("Override change {:?}: {:?}", path, decision);
                    if decision != HotUpdate::Ignore {
                        on_update(path, decision);
                    }
                }
            }
        });

        Ok(handle)
    }
}
