//! Progress tracker for bundle installations and model downloads.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use modelhub_api::{DownloadStatusMap, Model};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::ProgressBackend;
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::notify::{Notification, Notifier};
use crate::poller::{apply_download_tick, apply_install_tick, TickOutcome};
use crate::record::{Installation, ModelDownload, ProgressEntry};

/// Tracks in-flight bundle installations and model downloads.
///
/// Cloning yields another handle to the same state. Two pollers run on the
/// Tokio runtime, one for installations and one for downloads; each starts
/// when something is tracked and stops once nothing it tracks is active.
/// Observers receive the merged view through [`ProgressTracker::subscribe`].
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn ProgressBackend>,
    notifier: Arc<dyn Notifier>,
    config: TrackerConfig,
    state: Mutex<State>,
    updates: watch::Sender<Vec<ProgressEntry>>,
}

#[derive(Default)]
struct State {
    installations: HashMap<String, Installation>,
    downloads: HashMap<String, ModelDownload>,
    install_poller: Option<Poller>,
    download_poller: Option<Poller>,
    next_generation: u64,
}

/// A running poll loop. The generation lets a loop tell whether it still
/// owns its slot after being replaced.
struct Poller {
    generation: u64,
    handle: JoinHandle<()>,
}

impl Poller {
    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl State {
    fn slot(&mut self, kind: Kind) -> &mut Option<Poller> {
        match kind {
            Kind::Installation => &mut self.install_poller,
            Kind::Download => &mut self.download_poller,
        }
    }

    fn has_active(&self, kind: Kind) -> bool {
        match kind {
            Kind::Installation => self.has_active_installations(),
            Kind::Download => self.has_active_downloads(),
        }
    }

    /// Clear the slot if it still belongs to `generation`.
    fn release_poller(&mut self, kind: Kind, generation: u64) {
        let slot = self.slot(kind);
        if slot.as_ref().is_some_and(|p| p.generation == generation) {
            *slot = None;
        }
    }

    fn owns_poller(&mut self, kind: Kind, generation: u64) -> bool {
        self.slot(kind)
            .as_ref()
            .is_some_and(|p| p.generation == generation)
    }

    fn has_active_installations(&self) -> bool {
        self.installations.values().any(|i| !i.status.is_terminal())
    }

    fn has_active_downloads(&self) -> bool {
        self.downloads.values().any(|d| !d.status.is_terminal())
    }

    fn entries(&self) -> Vec<ProgressEntry> {
        let mut entries: Vec<ProgressEntry> = self
            .installations
            .values()
            .map(ProgressEntry::from)
            .chain(self.downloads.values().map(ProgressEntry::from))
            .collect();
        entries.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        entries
    }
}

#[derive(Clone, Copy)]
enum Kind {
    Installation,
    Download,
}

impl ProgressTracker {
    /// Create a tracker over a backend and a notifier.
    pub fn new(
        backend: Arc<dyn ProgressBackend>,
        notifier: Arc<dyn Notifier>,
        config: TrackerConfig,
    ) -> Self {
        let (updates, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                backend,
                notifier,
                config,
                state: Mutex::new(State::default()),
                updates,
            }),
        }
    }

    /// Subscribe to snapshots of [`ProgressTracker::active_installations`].
    pub fn subscribe(&self) -> watch::Receiver<Vec<ProgressEntry>> {
        self.inner.updates.subscribe()
    }

    /// Every tracked installation and download, oldest first.
    pub fn active_installations(&self) -> Vec<ProgressEntry> {
        self.state().entries()
    }

    pub fn installation(&self, id: &str) -> Option<Installation> {
        self.state().installations.get(id).cloned()
    }

    pub fn model_download(&self, id: &str) -> Option<ModelDownload> {
        self.state().downloads.get(id).cloned()
    }

    pub fn installations(&self) -> Vec<Installation> {
        self.state().installations.values().cloned().collect()
    }

    pub fn model_downloads(&self) -> Vec<ModelDownload> {
        self.state().downloads.values().cloned().collect()
    }

    /// Whether any tracked record is still running.
    pub fn has_active(&self) -> bool {
        let state = self.state();
        state.has_active_installations() || state.has_active_downloads()
    }

    /// Whether the installation poller is currently running.
    pub fn is_polling_installations(&self) -> bool {
        self.state()
            .install_poller
            .as_ref()
            .is_some_and(Poller::is_running)
    }

    /// Whether the download poller is currently running.
    pub fn is_polling_downloads(&self) -> bool {
        self.state()
            .download_poller
            .as_ref()
            .is_some_and(Poller::is_running)
    }

    /// Register an installation and ask the backend to install each profile.
    ///
    /// Returns the new installation id. If any install request fails the
    /// record is marked `error`, scheduled for removal and the error returned.
    pub async fn start_installation(
        &self,
        bundle_id: &str,
        bundle_name: &str,
        profiles: &[String],
    ) -> Result<String, TrackerError> {
        if profiles.is_empty() {
            return Err(TrackerError::NoProfiles);
        }

        let id = format!("install-{}", Uuid::new_v4());
        {
            let mut state = self.state();
            state.installations.insert(
                id.clone(),
                Installation::new(id.clone(), bundle_id, bundle_name, profiles),
            );
            self.publish(&state);
        }
        info!(
            "Starting installation {} of bundle '{}' ({} profile(s))",
            id,
            bundle_id,
            profiles.len()
        );

        for profile in profiles {
            if let Err(e) = self.inner.backend.install_bundle(bundle_id, profile).await {
                warn!(
                    "Install request for '{}' profile '{}' failed: {}",
                    bundle_id, profile, e
                );
                {
                    let mut state = self.state();
                    if let Some(inst) = state.installations.get_mut(&id) {
                        inst.fail(e.to_string());
                    }
                    self.publish(&state);
                }
                self.notify(Notification::error(
                    "Installation failed",
                    format!("{}: {}", bundle_name, e),
                ));
                let delay = self.inner.config.install_removal_delay;
                self.schedule_removal(Kind::Installation, id, delay);
                return Err(e.into());
            }
        }

        self.ensure_poller(Kind::Installation);
        self.notify(Notification::info(
            "Installation started",
            format!("Installing {}", bundle_name),
        ));
        Ok(id)
    }

    /// Ask the backend to start a model download and track it.
    ///
    /// A model that is already being tracked returns the existing id without
    /// issuing a second request.
    pub async fn start_model_download(
        &self,
        model_id: &str,
        model_name: &str,
    ) -> Result<String, TrackerError> {
        if let Some(existing) = self.active_download_for(model_id) {
            debug!("Model '{}' is already tracked as {}", model_id, existing);
            return Ok(existing);
        }

        if let Err(e) = self.inner.backend.download_model(model_id).await {
            warn!("Download request for '{}' failed: {}", model_id, e);
            self.notify(Notification::error(
                "Download failed",
                format!("{}: {}", model_name, e),
            ));
            return Err(e.into());
        }

        let id = format!("download-{}", Uuid::new_v4());
        {
            let mut state = self.state();
            state.downloads.insert(
                id.clone(),
                ModelDownload::new(id.clone(), model_id, model_name),
            );
            self.publish(&state);
        }
        info!("Tracking download {} of model '{}'", id, model_id);

        self.ensure_poller(Kind::Download);
        self.notify(Notification::info(
            "Download started",
            format!("Downloading {}", model_name),
        ));
        Ok(id)
    }

    /// Rebuild records for downloads the backend is still running.
    ///
    /// Used after a restart to regain visibility into server-side work.
    /// Returns the number of downloads restored.
    pub async fn restore_active_downloads(&self) -> Result<usize, TrackerError> {
        let report = self.inner.backend.download_status().await?;

        let tracked: HashSet<String> = self
            .state()
            .downloads
            .values()
            .filter(|d| !d.status.is_terminal())
            .map(|d| d.model_id.clone())
            .collect();

        let mut pending: Vec<_> = report
            .into_values()
            .filter(|s| s.status.is_active() && !tracked.contains(&s.model_id))
            .collect();
        if pending.is_empty() {
            return Ok(0);
        }
        pending.sort_by(|a, b| a.model_id.cmp(&b.model_id));

        let catalog = if pending.iter().any(|s| s.model_name.is_none()) {
            match self.inner.backend.model_catalog().await {
                Ok(models) => models,
                Err(e) => {
                    warn!("Could not resolve model names: {}", e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let cap = self.inner.config.download_progress_cap;
        let restored = pending.len();
        {
            let mut state = self.state();
            for status in pending {
                let name = status
                    .model_name
                    .clone()
                    .or_else(|| catalog_name(&catalog, &status.model_id))
                    .unwrap_or_else(|| status.model_id.clone());
                let id = format!("download-{}", Uuid::new_v4());
                let mut dl = ModelDownload::new(id.clone(), &status.model_id, &name);
                dl.seen = true;
                dl.progress = status.progress.clamp(0.0, 100.0).min(cap);
                dl.current_step = format!("Downloading ({:.0}%)", dl.progress);
                state.downloads.insert(id, dl);
            }
            self.publish(&state);
        }
        info!("Restored {} active download(s)", restored);

        self.ensure_poller(Kind::Download);
        Ok(restored)
    }

    /// Cancel a bundle installation.
    ///
    /// Active backend downloads of the models in the installed profiles are
    /// asked to stop; downloads tracked on their own are left running. The
    /// record is then marked `cancelled` and removed after a short delay.
    /// Backend failures are surfaced as notifications only. If the
    /// installation finishes while the stop requests are in flight, it keeps
    /// its final state and [`TrackerError::AlreadyFinished`] is returned.
    pub async fn cancel_installation(&self, id: &str) -> Result<(), TrackerError> {
        let (bundle_id, name, profiles) = {
            let state = self.state();
            let inst = state
                .installations
                .get(id)
                .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;
            if inst.status.is_terminal() {
                return Err(TrackerError::AlreadyFinished(id.to_string()));
            }
            (inst.bundle_id.clone(), inst.bundle_name.clone(), inst.profiles.clone())
        };

        let bundle_models = match self.inner.backend.bundle(&bundle_id).await {
            Ok(bundle) => Some(
                profiles
                    .iter()
                    .filter_map(|p| bundle.profile(p))
                    .flat_map(|p| p.models.iter().cloned())
                    .collect::<HashSet<String>>(),
            ),
            Err(e) => {
                warn!(
                    "Failed to load bundle '{}', stopping every untracked active download: {}",
                    bundle_id, e
                );
                None
            }
        };

        match self.inner.backend.download_status().await {
            Ok(report) => {
                let tracked = self.tracked_download_models();
                let to_stop = report.values().filter(|s| {
                    s.status.is_active()
                        && !tracked.contains(&s.model_id)
                        && bundle_models
                            .as_ref()
                            .map_or(true, |models| models.contains(&s.model_id))
                });
                for status in to_stop {
                    if let Err(e) = self.inner.backend.stop_download(&status.model_id).await {
                        warn!("Failed to stop download '{}': {}", status.model_id, e);
                        self.notify(Notification::error(
                            "Cancel failed",
                            format!("Could not stop {}: {}", status.model_id, e),
                        ));
                    }
                }
            }
            Err(e) => {
                warn!("Failed to list downloads while cancelling {}: {}", id, e);
                self.notify(Notification::error(
                    "Cancel failed",
                    format!("{}: {}", name, e),
                ));
            }
        }

        if !self.mark_cancelled(Kind::Installation, id) {
            debug!("{} finished while the stop requests were in flight", id);
            return Err(TrackerError::AlreadyFinished(id.to_string()));
        }
        self.notify(Notification::info(
            "Installation cancelled",
            format!("{} was cancelled", name),
        ));
        Ok(())
    }

    /// Cancel a model download.
    ///
    /// Returns `Ok(true)` once the backend answered the stop request,
    /// whatever it reported; the record is then `cancelled` and removed
    /// after a short delay. Returns `Ok(false)` when the request itself
    /// failed: a notification is emitted and the record is left as is.
    /// If the download finishes while the request is in flight, it keeps
    /// its final state and [`TrackerError::AlreadyFinished`] is returned.
    pub async fn cancel_model_download(&self, id: &str) -> Result<bool, TrackerError> {
        let (model_id, name) = {
            let state = self.state();
            let dl = state
                .downloads
                .get(id)
                .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;
            if dl.status.is_terminal() {
                return Err(TrackerError::AlreadyFinished(id.to_string()));
            }
            (dl.model_id.clone(), dl.model_name.clone())
        };

        match self.inner.backend.stop_download(&model_id).await {
            Ok(response) => {
                if !response.success {
                    warn!(
                        "Backend did not confirm stopping '{}': {}",
                        model_id,
                        response.message.as_deref().unwrap_or("no message")
                    );
                }
                if !self.mark_cancelled(Kind::Download, id) {
                    debug!("{} finished while the stop request was in flight", id);
                    return Err(TrackerError::AlreadyFinished(id.to_string()));
                }
                self.notify(Notification::info(
                    "Download cancelled",
                    format!("{} was cancelled", name),
                ));
                Ok(true)
            }
            Err(e) => {
                warn!("Failed to cancel download '{}': {}", model_id, e);
                self.notify(Notification::error(
                    "Cancel failed",
                    format!("{}: {}", name, e),
                ));
                Ok(false)
            }
        }
    }

    /// Stop tracking an installation. Returns whether it was tracked.
    pub fn remove_installation(&self, id: &str) -> bool {
        self.remove(Kind::Installation, id)
    }

    /// Stop tracking a model download. Returns whether it was tracked.
    pub fn remove_model_download(&self, id: &str) -> bool {
        self.remove(Kind::Download, id)
    }

    fn remove(&self, kind: Kind, id: &str) -> bool {
        let mut state = self.state();
        let removed = match kind {
            Kind::Installation => state.installations.remove(id).is_some(),
            Kind::Download => state.downloads.remove(id).is_some(),
        };
        if removed {
            debug!("Removed {}", id);
            self.stop_idle_poller(&mut state, kind);
            self.publish(&state);
        }
        removed
    }

    /// Model ids of downloads tracked on their own that are still running.
    fn tracked_download_models(&self) -> HashSet<String> {
        self.state()
            .downloads
            .values()
            .filter(|d| !d.status.is_terminal())
            .map(|d| d.model_id.clone())
            .collect()
    }

    /// Returns false when the record is gone or already finished.
    fn mark_cancelled(&self, kind: Kind, id: &str) -> bool {
        {
            let mut state = self.state();
            let changed = match kind {
                Kind::Installation => state
                    .installations
                    .get_mut(id)
                    .is_some_and(|inst| inst.cancel()),
                Kind::Download => state.downloads.get_mut(id).is_some_and(|dl| dl.cancel()),
            };
            if !changed {
                return false;
            }
            self.stop_idle_poller(&mut state, kind);
            self.publish(&state);
        }
        self.schedule_removal(kind, id.to_string(), self.inner.config.cancel_removal_delay);
        true
    }

    /// Abort a poller whose records are all terminal (or gone).
    fn stop_idle_poller(&self, state: &mut State, kind: Kind) {
        if state.has_active(kind) {
            return;
        }
        if let Some(poller) = state.slot(kind).take() {
            debug!("Stopping idle poller");
            poller.handle.abort();
        }
    }

    fn ensure_poller(&self, kind: Kind) {
        let period = match kind {
            Kind::Installation => self.inner.config.install_poll_interval,
            Kind::Download => self.inner.config.download_poll_interval,
        };

        let mut state = self.state();
        if state.slot(kind).as_ref().is_some_and(Poller::is_running) {
            return;
        }

        let generation = state.next_generation;
        state.next_generation += 1;
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(poll_loop(weak, kind, generation, period));
        *state.slot(kind) = Some(Poller { generation, handle });
    }

    /// One installation poll. Returns whether polling should continue.
    async fn poll_installations(&self, generation: u64) -> bool {
        let tracked: Vec<String> = {
            let mut state = self.state();
            if !state.owns_poller(Kind::Installation, generation) {
                return false;
            }
            if !state.has_active_installations() {
                state.release_poller(Kind::Installation, generation);
                return false;
            }
            state
                .installations
                .values()
                .filter(|i| !i.status.is_terminal())
                .map(|i| i.id.clone())
                .collect()
        };

        let downloads = self.inner.backend.download_status().await;
        let installed = self.inner.backend.installed_bundles().await;

        let cap = self.inner.config.install_progress_cap;
        let mut completed = Vec::new();
        let keep_polling = {
            let mut state = self.state();
            match (downloads, installed) {
                (Ok(downloads), Ok(installed)) => {
                    for id in &tracked {
                        if let Some(inst) = state.installations.get_mut(id) {
                            if apply_install_tick(inst, &downloads, &installed, cap)
                                == TickOutcome::Completed
                            {
                                completed.push((id.clone(), inst.bundle_name.clone()));
                            }
                        }
                    }
                }
                (Err(e), _) | (_, Err(e)) => {
                    warn!("Installation status check failed: {}", e);
                    for id in &tracked {
                        if let Some(inst) = state.installations.get_mut(id) {
                            inst.record_error(format!("Status check failed: {}", e));
                        }
                    }
                }
            }
            self.publish(&state);

            let active = state.has_active_installations();
            if !active {
                state.release_poller(Kind::Installation, generation);
            }
            active
        };

        for (id, name) in completed {
            info!("Installation {} of '{}' completed", id, name);
            self.notify(Notification::success(
                "Installation complete",
                format!("{} installed successfully", name),
            ));
            let delay = self.inner.config.install_removal_delay;
            self.schedule_removal(Kind::Installation, id, delay);
        }

        keep_polling
    }

    /// One download poll. Returns whether polling should continue.
    async fn poll_downloads(&self, generation: u64) -> bool {
        let tracked: Vec<(String, String, bool)> = {
            let mut state = self.state();
            if !state.owns_poller(Kind::Download, generation) {
                return false;
            }
            if !state.has_active_downloads() {
                state.release_poller(Kind::Download, generation);
                return false;
            }
            state
                .downloads
                .values()
                .filter(|d| !d.status.is_terminal())
                .map(|d| (d.id.clone(), d.model_id.clone(), d.seen))
                .collect()
        };

        let report = self.inner.backend.download_status().await;
        let installed_models = match &report {
            Ok(report) => self.installed_unreported(&tracked, report).await,
            Err(_) => HashSet::new(),
        };

        let cap = self.inner.config.download_progress_cap;
        let mut finished = Vec::new();
        let keep_polling = {
            let mut state = self.state();
            match &report {
                Ok(report) => {
                    for (id, model_id, _) in &tracked {
                        if let Some(dl) = state.downloads.get_mut(id) {
                            let outcome = apply_download_tick(
                                dl,
                                report.get(model_id),
                                installed_models.contains(model_id),
                                cap,
                            );
                            if outcome != TickOutcome::Pending {
                                finished.push((id.clone(), dl.model_name.clone(), outcome));
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("Download status check failed: {}", e);
                    for (id, _, _) in &tracked {
                        if let Some(dl) = state.downloads.get_mut(id) {
                            dl.record_error(format!("Status check failed: {}", e));
                        }
                    }
                }
            }
            self.publish(&state);

            let active = state.has_active_downloads();
            if !active {
                state.release_poller(Kind::Download, generation);
            }
            active
        };

        let config = &self.inner.config;
        for (id, name, outcome) in finished {
            let delay = match outcome {
                TickOutcome::Completed => {
                    info!("Download {} of '{}' completed", id, name);
                    self.notify(Notification::success(
                        "Download complete",
                        format!("{} downloaded successfully", name),
                    ));
                    config.download_removal_delay
                }
                TickOutcome::Failed(message) => {
                    self.notify(Notification::error("Download failed", message));
                    config.download_removal_delay
                }
                TickOutcome::Cancelled => {
                    self.notify(Notification::info(
                        "Download cancelled",
                        format!("{} was cancelled", name),
                    ));
                    config.cancel_removal_delay
                }
                TickOutcome::Pending => continue,
            };
            self.schedule_removal(Kind::Download, id, delay);
        }

        keep_polling
    }

    /// Catalog check for downloads that never showed up in the report.
    async fn installed_unreported(
        &self,
        tracked: &[(String, String, bool)],
        report: &DownloadStatusMap,
    ) -> HashSet<String> {
        let unreported = tracked
            .iter()
            .any(|(_, model_id, seen)| !seen && !report.contains_key(model_id));
        if !unreported {
            return HashSet::new();
        }

        match self.inner.backend.model_catalog().await {
            Ok(models) => models
                .into_iter()
                .filter(|m| m.installed)
                .map(|m| m.id)
                .collect(),
            Err(e) => {
                debug!("Catalog check failed: {}", e);
                HashSet::new()
            }
        }
    }

    fn schedule_removal(&self, kind: Kind, id: String, delay: Duration) {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                ProgressTracker { inner }.remove(kind, &id);
            }
        });
    }

    fn active_download_for(&self, model_id: &str) -> Option<String> {
        self.state()
            .downloads
            .values()
            .find(|d| d.model_id == model_id && !d.status.is_terminal())
            .map(|d| d.id.clone())
    }

    fn notify(&self, notification: Notification) {
        self.inner.notifier.notify(notification);
    }

    fn publish(&self, state: &State) {
        self.inner.updates.send_replace(state.entries());
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

async fn poll_loop(weak: Weak<Inner>, kind: Kind, generation: u64, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(inner) = weak.upgrade() else {
            break;
        };
        let tracker = ProgressTracker { inner };
        let keep_polling = match kind {
            Kind::Installation => tracker.poll_installations(generation).await,
            Kind::Download => tracker.poll_downloads(generation).await,
        };
        if !keep_polling {
            debug!("Poller finished: nothing left to track");
            break;
        }
    }
}

fn catalog_name(catalog: &[Model], model_id: &str) -> Option<String> {
    catalog
        .iter()
        .find(|m| m.id == model_id)
        .map(|m| m.name.clone())
}
