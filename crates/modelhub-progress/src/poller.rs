//! Per-tick state transitions driven by backend status reports.
//!
//! These functions only mutate records; the tracker fetches the reports,
//! applies them under its lock and acts on the returned outcome.

use modelhub_api::{DownloadState, DownloadStatus, DownloadStatusMap, InstalledBundle};

use crate::record::{Installation, ModelDownload, ProgressStatus};

/// Result of applying one poll to a record.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TickOutcome {
    /// Still running; progress may have changed.
    Pending,
    Completed,
    Failed(String),
    Cancelled,
}

/// Apply one install poll to an installation.
///
/// Progress is the mean of all active download percentages, held at or
/// below `cap` until the bundle is reported installed.
pub(crate) fn apply_install_tick(
    inst: &mut Installation,
    downloads: &DownloadStatusMap,
    installed: &[InstalledBundle],
    cap: f64,
) -> TickOutcome {
    if inst.status.is_terminal() {
        return TickOutcome::Pending;
    }

    let bundle_installed = installed
        .iter()
        .any(|b| b.bundle_id == inst.bundle_id && b.covers(&inst.profiles));
    if bundle_installed {
        inst.complete();
        return TickOutcome::Completed;
    }

    for failed in downloads
        .values()
        .filter(|d| d.status == DownloadState::Error)
    {
        inst.record_error(download_error(failed));
    }

    let active: Vec<f64> = downloads
        .values()
        .filter(|d| d.status.is_active())
        .map(|d| d.progress.clamp(0.0, 100.0))
        .collect();

    if active.is_empty() {
        inst.status = ProgressStatus::Installing;
        inst.current_step = "Installing bundle files".to_string();
    } else {
        let average = active.iter().sum::<f64>() / active.len() as f64;
        inst.status = ProgressStatus::Downloading;
        inst.progress = average.min(cap);
        inst.current_step = format!("Downloading {} model(s)", active.len());
    }

    TickOutcome::Pending
}

/// Apply one download poll to a model download.
///
/// `entry` is the backend's report for the model, if any. A download that
/// disappears from the report after having been seen, or that the catalog
/// already lists as installed, is treated as finished.
pub(crate) fn apply_download_tick(
    dl: &mut ModelDownload,
    entry: Option<&DownloadStatus>,
    installed_in_catalog: bool,
    cap: f64,
) -> TickOutcome {
    if dl.status.is_terminal() {
        return TickOutcome::Pending;
    }

    match entry {
        Some(status) if status.status.is_active() => {
            dl.seen = true;
            dl.status = ProgressStatus::Downloading;
            dl.progress = status.progress.clamp(0.0, 100.0).min(cap);
            dl.current_step = match status.status {
                DownloadState::Queued => "Queued".to_string(),
                _ => format!("Downloading ({:.0}%)", dl.progress),
            };
            TickOutcome::Pending
        }
        Some(status) => match status.status {
            DownloadState::Completed => {
                dl.complete();
                TickOutcome::Completed
            }
            DownloadState::Cancelled => {
                dl.cancel();
                TickOutcome::Cancelled
            }
            DownloadState::Unknown => TickOutcome::Pending,
            _ => {
                let message = download_error(status);
                dl.fail(message.clone());
                TickOutcome::Failed(message)
            }
        },
        None if dl.seen || installed_in_catalog => {
            dl.complete();
            TickOutcome::Completed
        }
        None => TickOutcome::Pending,
    }
}

fn download_error(status: &DownloadStatus) -> String {
    let name = status.model_name.as_deref().unwrap_or(&status.model_id);
    match &status.error {
        Some(error) => format!("{}: {}", name, error),
        None => format!("{}: download failed", name),
    }
}
