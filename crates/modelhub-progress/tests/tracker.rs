//! Tracker behaviour against an in-memory backend, on a paused clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use modelhub_api::{
    ApiError, Bundle, BundleProfile, DownloadState, DownloadStatus, DownloadStatusMap,
    InstalledBundle, Model, StopDownloadResponse,
};
use modelhub_progress::{
    EntryKind, Notification, NotificationLevel, Notifier, ProgressBackend, ProgressStatus,
    ProgressTracker, TrackerConfig, TrackerError,
};
use tokio::time::sleep;

#[derive(Default)]
struct FakeState {
    install_calls: Vec<(String, String)>,
    download_calls: Vec<String>,
    stop_calls: Vec<String>,
    status_calls: usize,
    installed_calls: usize,
    downloads: DownloadStatusMap,
    installed: Vec<InstalledBundle>,
    bundles: Vec<Bundle>,
    catalog: Vec<Model>,
    fail_install: Option<String>,
    fail_status: bool,
    fail_stop: bool,
    stop_success: bool,
    /// How long a stop request takes to answer.
    stop_delay: Option<Duration>,
}

#[derive(Default)]
struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    fn set_download(&self, model_id: &str, state: DownloadState, progress: f64) {
        self.with(|s| {
            s.downloads.insert(
                model_id.to_string(),
                DownloadStatus {
                    model_id: model_id.to_string(),
                    model_name: None,
                    status: state,
                    progress,
                    downloaded: None,
                    total: None,
                    error: None,
                },
            );
        });
    }

    fn mark_installed(&self, bundle_id: &str, profiles: &[&str]) {
        self.with(|s| {
            s.installed.push(InstalledBundle {
                bundle_id: bundle_id.to_string(),
                profiles: profiles.iter().map(|p| p.to_string()).collect(),
            })
        });
    }
}

fn server_error(message: &str) -> ApiError {
    ApiError::Api {
        status: 500,
        message: message.to_string(),
    }
}

#[async_trait]
impl ProgressBackend for FakeBackend {
    async fn install_bundle(&self, bundle_id: &str, profile: &str) -> Result<(), ApiError> {
        self.with(|s| {
            s.install_calls
                .push((bundle_id.to_string(), profile.to_string()));
            match &s.fail_install {
                Some(message) => Err(server_error(message)),
                None => Ok(()),
            }
        })
    }

    async fn download_model(&self, model_id: &str) -> Result<(), ApiError> {
        self.with(|s| s.download_calls.push(model_id.to_string()));
        Ok(())
    }

    async fn stop_download(&self, model_id: &str) -> Result<StopDownloadResponse, ApiError> {
        if let Some(delay) = self.with(|s| s.stop_delay) {
            sleep(delay).await;
        }
        self.with(|s| {
            s.stop_calls.push(model_id.to_string());
            if s.fail_stop {
                return Err(server_error("stop failed"));
            }
            Ok(StopDownloadResponse {
                success: s.stop_success,
                message: None,
            })
        })
    }

    async fn download_status(&self) -> Result<DownloadStatusMap, ApiError> {
        self.with(|s| {
            s.status_calls += 1;
            if s.fail_status {
                return Err(server_error("status unavailable"));
            }
            Ok(s.downloads.clone())
        })
    }

    async fn installed_bundles(&self) -> Result<Vec<InstalledBundle>, ApiError> {
        self.with(|s| {
            s.installed_calls += 1;
            Ok(s.installed.clone())
        })
    }

    async fn bundle(&self, bundle_id: &str) -> Result<Bundle, ApiError> {
        self.with(|s| {
            s.bundles
                .iter()
                .find(|b| b.id == bundle_id)
                .cloned()
                .ok_or_else(|| ApiError::Api {
                    status: 404,
                    message: format!("Bundle {} not found", bundle_id),
                })
        })
    }

    async fn model_catalog(&self) -> Result<Vec<Model>, ApiError> {
        self.with(|s| Ok(s.catalog.clone()))
    }
}

#[derive(Default)]
struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    fn levels(&self) -> Vec<NotificationLevel> {
        self.seen.lock().unwrap().iter().map(|n| n.level).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

fn setup() -> (ProgressTracker, Arc<FakeBackend>, Arc<RecordingNotifier>) {
    let backend = Arc::new(FakeBackend::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let tracker = ProgressTracker::new(
        backend.clone(),
        notifier.clone(),
        TrackerConfig::default(),
    );
    (tracker, backend, notifier)
}

fn profiles(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn bundle(id: &str, profile: &str, models: &[&str]) -> Bundle {
    Bundle {
        id: id.to_string(),
        name: id.to_string(),
        description: None,
        version: None,
        profiles: vec![BundleProfile {
            name: profile.to_string(),
            description: None,
            models: models.iter().map(|m| m.to_string()).collect(),
        }],
        workflows: Vec::new(),
    }
}

fn model(id: &str, name: &str, installed: bool) -> Model {
    Model {
        id: id.to_string(),
        name: name.to_string(),
        model_type: "checkpoint".to_string(),
        filename: None,
        size: None,
        url: None,
        installed,
        description: None,
    }
}

#[tokio::test(start_paused = true)]
async fn test_start_installation_issues_one_call_per_profile() {
    let (tracker, backend, _) = setup();

    let id = tracker
        .start_installation("flux", "Flux Dev", &profiles(&["low-vram", "high-vram", "cpu"]))
        .await
        .unwrap();

    let calls = backend.with(|s| s.install_calls.clone());
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|(bundle, _)| bundle == "flux"));

    let installations = tracker.installations();
    assert_eq!(installations.len(), 1);
    assert_eq!(installations[0].id, id);
    assert_eq!(installations[0].status, ProgressStatus::Starting);
    assert!(tracker.is_polling_installations());
}

#[tokio::test(start_paused = true)]
async fn test_start_installation_requires_a_profile() {
    let (tracker, backend, _) = setup();
    let result = tracker.start_installation("flux", "Flux Dev", &[]).await;
    assert!(matches!(result, Err(TrackerError::NoProfiles)));
    assert!(backend.with(|s| s.install_calls.is_empty()));
    assert!(tracker.installations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_progress_capped_while_downloading() {
    let (tracker, backend, _) = setup();
    backend.set_download("flux-fp8", DownloadState::Downloading, 99.0);
    backend.set_download("t5-xxl", DownloadState::Downloading, 100.0);

    let id = tracker
        .start_installation("flux", "Flux Dev", &profiles(&["low-vram"]))
        .await
        .unwrap();

    // Offset from the 1s ticks so each check lands after a poll.
    sleep(Duration::from_millis(100)).await;
    for _ in 0..3 {
        sleep(Duration::from_millis(1000)).await;
        let inst = tracker.installation(&id).unwrap();
        assert_eq!(inst.status, ProgressStatus::Downloading);
        assert!(inst.progress <= 95.0, "progress {} above cap", inst.progress);
    }

    backend.set_download("flux-fp8", DownloadState::Downloading, 20.0);
    backend.set_download("t5-xxl", DownloadState::Downloading, 40.0);
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(tracker.installation(&id).unwrap().progress, 30.0);
}

#[tokio::test(start_paused = true)]
async fn test_installation_completes_and_is_removed() {
    let (tracker, backend, notifier) = setup();
    let id = tracker
        .start_installation("flux", "Flux Dev", &profiles(&["low-vram"]))
        .await
        .unwrap();
    backend.mark_installed("flux", &["low-vram"]);

    // First poll fires at t=1s.
    sleep(Duration::from_millis(1100)).await;
    let inst = tracker.installation(&id).unwrap();
    assert_eq!(inst.status, ProgressStatus::Completed);
    assert_eq!(inst.progress, 100.0);
    assert!(notifier.levels().contains(&NotificationLevel::Success));
    assert!(!tracker.is_polling_installations());

    sleep(Duration::from_millis(4800)).await;
    assert!(tracker.installation(&id).is_some());

    sleep(Duration::from_millis(200)).await;
    assert!(tracker.installation(&id).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_removing_last_installation_stops_polling() {
    let (tracker, backend, _) = setup();
    let id = tracker
        .start_installation("flux", "Flux Dev", &profiles(&["low-vram"]))
        .await
        .unwrap();

    sleep(Duration::from_millis(1100)).await;
    let calls_before = backend.with(|s| s.installed_calls);
    assert_eq!(calls_before, 1);

    assert!(tracker.remove_installation(&id));
    assert!(!tracker.is_polling_installations());

    sleep(Duration::from_secs(10)).await;
    assert_eq!(backend.with(|s| s.installed_calls), calls_before);
    assert!(!tracker.remove_installation(&id));
}

#[tokio::test(start_paused = true)]
async fn test_failed_install_request_marks_error() {
    let (tracker, backend, notifier) = setup();
    backend.with(|s| s.fail_install = Some("disk full".to_string()));

    let result = tracker
        .start_installation("flux", "Flux Dev", &profiles(&["low-vram", "cpu"]))
        .await;
    assert!(matches!(result, Err(TrackerError::Api(_))));
    // The first failure stops further requests.
    assert_eq!(backend.with(|s| s.install_calls.len()), 1);

    let entries = tracker.active_installations();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, ProgressStatus::Error);
    assert!(entries[0].errors[0].contains("disk full"));
    assert_eq!(notifier.levels(), vec![NotificationLevel::Error]);
    assert!(!tracker.is_polling_installations());

    sleep(Duration::from_millis(5100)).await;
    assert!(tracker.active_installations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_poll_is_recorded_and_loop_continues() {
    let (tracker, backend, _) = setup();
    backend.with(|s| s.fail_status = true);
    let id = tracker
        .start_installation("flux", "Flux Dev", &profiles(&["low-vram"]))
        .await
        .unwrap();

    sleep(Duration::from_millis(2100)).await;
    let inst = tracker.installation(&id).unwrap();
    assert_eq!(inst.errors.len(), 1, "errors deduplicated: {:?}", inst.errors);
    assert!(inst.errors[0].contains("status unavailable"));
    assert!(!inst.status.is_terminal());

    backend.with(|s| s.fail_status = false);
    backend.mark_installed("flux", &["low-vram"]);
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(
        tracker.installation(&id).unwrap().status,
        ProgressStatus::Completed
    );
}

#[tokio::test(start_paused = true)]
async fn test_restore_active_downloads() {
    let (tracker, backend, _) = setup();
    backend.set_download("sdxl", DownloadState::Downloading, 40.0);
    backend.set_download("vae", DownloadState::Downloading, 70.0);
    backend.set_download("old", DownloadState::Completed, 100.0);
    backend.with(|s| s.catalog = vec![model("sdxl", "SDXL Base 1.0", false)]);

    let restored = tracker.restore_active_downloads().await.unwrap();
    assert_eq!(restored, 2);

    let mut downloads = tracker.model_downloads();
    downloads.sort_by(|a, b| a.model_id.cmp(&b.model_id));
    assert_eq!(downloads.len(), 2);
    assert!(downloads
        .iter()
        .all(|d| d.status == ProgressStatus::Downloading));
    assert_eq!(downloads[0].model_name, "SDXL Base 1.0");
    assert_eq!(downloads[0].progress, 40.0);
    assert_eq!(downloads[1].model_name, "vae");
    assert_eq!(downloads[1].progress, 70.0);
    assert!(tracker.is_polling_downloads());

    // Restoring again does not duplicate entries.
    assert_eq!(tracker.restore_active_downloads().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_download_is_optimistic() {
    let (tracker, backend, notifier) = setup();
    backend.with(|s| s.stop_success = false);

    let id = tracker.start_model_download("sdxl", "SDXL").await.unwrap();
    assert!(tracker.cancel_model_download(&id).await.unwrap());

    assert_eq!(backend.with(|s| s.stop_calls.clone()), vec!["sdxl"]);
    assert_eq!(
        tracker.model_download(&id).unwrap().status,
        ProgressStatus::Cancelled
    );
    assert!(!tracker.is_polling_downloads());
    assert_eq!(notifier.levels().last(), Some(&NotificationLevel::Info));

    sleep(Duration::from_millis(1900)).await;
    assert!(tracker.model_download(&id).is_some());
    sleep(Duration::from_millis(200)).await;
    assert!(tracker.model_download(&id).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_download_failure_only_notifies() {
    let (tracker, backend, notifier) = setup();
    backend.with(|s| s.fail_stop = true);

    let id = tracker.start_model_download("sdxl", "SDXL").await.unwrap();
    assert!(!tracker.cancel_model_download(&id).await.unwrap());

    assert_eq!(
        tracker.model_download(&id).unwrap().status,
        ProgressStatus::Downloading
    );
    assert_eq!(notifier.levels().last(), Some(&NotificationLevel::Error));

    let missing = tracker.cancel_model_download("nope").await;
    assert!(matches!(missing, Err(TrackerError::NotFound(_))));
}

#[tokio::test(start_paused = true)]
async fn test_download_lifecycle() {
    let (tracker, backend, notifier) = setup();
    let id = tracker.start_model_download("sdxl", "SDXL").await.unwrap();

    backend.set_download("sdxl", DownloadState::Downloading, 30.0);
    sleep(Duration::from_millis(2100)).await;
    let dl = tracker.model_download(&id).unwrap();
    assert_eq!(dl.progress, 30.0);
    assert_eq!(dl.status, ProgressStatus::Downloading);

    // Finished downloads leave the backend report.
    backend.with(|s| s.downloads.clear());
    sleep(Duration::from_millis(2000)).await;
    let dl = tracker.model_download(&id).unwrap();
    assert_eq!(dl.status, ProgressStatus::Completed);
    assert_eq!(dl.progress, 100.0);
    assert!(notifier.levels().contains(&NotificationLevel::Success));
    assert!(!tracker.is_polling_downloads());

    sleep(Duration::from_millis(3100)).await;
    assert!(tracker.model_download(&id).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_download_is_deduplicated() {
    let (tracker, backend, _) = setup();
    let first = tracker.start_model_download("sdxl", "SDXL").await.unwrap();
    let second = tracker.start_model_download("sdxl", "SDXL").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(backend.with(|s| s.download_calls.len()), 1);
    assert_eq!(tracker.model_downloads().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unreported_download_completes_via_catalog() {
    let (tracker, backend, _) = setup();
    backend.with(|s| s.catalog = vec![model("vae", "VAE", true)]);

    let id = tracker.start_model_download("vae", "VAE").await.unwrap();
    sleep(Duration::from_millis(2100)).await;

    assert_eq!(
        tracker.model_download(&id).unwrap().status,
        ProgressStatus::Completed
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_installation_stops_active_downloads() {
    let (tracker, backend, _) = setup();
    backend.set_download("flux-fp8", DownloadState::Downloading, 10.0);
    backend.set_download("t5-xxl", DownloadState::Queued, 0.0);
    backend.set_download("clip-l", DownloadState::Completed, 100.0);

    let id = tracker
        .start_installation("flux", "Flux Dev", &profiles(&["low-vram"]))
        .await
        .unwrap();
    tracker.cancel_installation(&id).await.unwrap();

    let mut stopped = backend.with(|s| s.stop_calls.clone());
    stopped.sort();
    assert_eq!(stopped, vec!["flux-fp8", "t5-xxl"]);
    assert_eq!(
        tracker.installation(&id).unwrap().status,
        ProgressStatus::Cancelled
    );
    assert!(!tracker.is_polling_installations());

    let again = tracker.cancel_installation(&id).await;
    assert!(matches!(again, Err(TrackerError::AlreadyFinished(_))));

    sleep(Duration::from_millis(2100)).await;
    assert!(tracker.installation(&id).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_installation_spares_other_downloads() {
    let (tracker, backend, _) = setup();
    backend.with(|s| s.bundles = vec![bundle("flux", "low-vram", &["flux-fp8"])]);
    backend.set_download("flux-fp8", DownloadState::Downloading, 10.0);
    backend.set_download("sdxl", DownloadState::Downloading, 60.0);
    backend.set_download("upscaler", DownloadState::Queued, 0.0);

    let download = tracker.start_model_download("sdxl", "SDXL").await.unwrap();
    let id = tracker
        .start_installation("flux", "Flux Dev", &profiles(&["low-vram"]))
        .await
        .unwrap();
    tracker.cancel_installation(&id).await.unwrap();

    assert_eq!(backend.with(|s| s.stop_calls.clone()), vec!["flux-fp8"]);
    assert_eq!(
        tracker.model_download(&download).unwrap().status,
        ProgressStatus::Downloading
    );
    assert!(tracker.is_polling_downloads());
}

#[tokio::test(start_paused = true)]
async fn test_download_finishing_during_cancel_keeps_completed() {
    let (tracker, backend, notifier) = setup();
    let id = tracker.start_model_download("sdxl", "SDXL").await.unwrap();

    backend.set_download("sdxl", DownloadState::Downloading, 50.0);
    sleep(Duration::from_millis(2100)).await;
    assert_eq!(tracker.model_download(&id).unwrap().progress, 50.0);

    // The poll at t=4s sees the download gone while the stop is pending.
    backend.with(|s| {
        s.downloads.clear();
        s.stop_delay = Some(Duration::from_millis(2500));
    });
    let result = tracker.cancel_model_download(&id).await;
    assert!(matches!(result, Err(TrackerError::AlreadyFinished(_))));

    assert_eq!(
        tracker.model_download(&id).unwrap().status,
        ProgressStatus::Completed
    );
    assert_eq!(
        notifier.levels(),
        vec![NotificationLevel::Info, NotificationLevel::Success]
    );

    // Only the completion removal is scheduled, at t=7s.
    sleep(Duration::from_millis(2200)).await;
    assert!(tracker.model_download(&id).is_some());
    sleep(Duration::from_millis(400)).await;
    assert!(tracker.model_download(&id).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_installation_finishing_during_cancel_keeps_completed() {
    let (tracker, backend, notifier) = setup();
    backend.set_download("flux-fp8", DownloadState::Downloading, 80.0);
    backend.with(|s| s.stop_delay = Some(Duration::from_millis(2500)));

    let id = tracker
        .start_installation("flux", "Flux Dev", &profiles(&["low-vram"]))
        .await
        .unwrap();
    // Reported installed at the t=1s poll, before the stop answers.
    backend.mark_installed("flux", &["low-vram"]);

    let result = tracker.cancel_installation(&id).await;
    assert!(matches!(result, Err(TrackerError::AlreadyFinished(_))));
    assert_eq!(backend.with(|s| s.stop_calls.clone()), vec!["flux-fp8"]);

    let inst = tracker.installation(&id).unwrap();
    assert_eq!(inst.status, ProgressStatus::Completed);
    assert_eq!(inst.progress, 100.0);
    assert_eq!(
        notifier.levels(),
        vec![NotificationLevel::Info, NotificationLevel::Success]
    );
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_merged_view() {
    let (tracker, _backend, _) = setup();
    let mut updates = tracker.subscribe();

    tracker
        .start_installation("flux", "Flux Dev", &profiles(&["low-vram"]))
        .await
        .unwrap();
    tracker.start_model_download("sdxl", "SDXL").await.unwrap();

    assert!(updates.has_changed().unwrap());
    let snapshot = updates.borrow_and_update().clone();
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.iter().any(|e| e.kind == EntryKind::Bundle));
    assert!(snapshot.iter().any(|e| e.kind == EntryKind::Model));
    assert_eq!(snapshot, tracker.active_installations());
}

#[tokio::test(start_paused = true)]
async fn test_removing_last_download_stops_polling() {
    let (tracker, backend, _) = setup();
    let id = tracker.start_model_download("sdxl", "SDXL").await.unwrap();
    assert!(tracker.has_active());
    assert!(tracker.is_polling_downloads());

    assert!(tracker.remove_model_download(&id));
    assert!(!tracker.has_active());
    assert!(!tracker.is_polling_downloads());

    sleep(Duration::from_secs(10)).await;
    assert_eq!(backend.with(|s| s.status_calls), 0);
}
