//! Live progress bars for tracked installations and downloads.

use std::collections::HashMap;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use modelhub_progress::{EntryKind, ProgressEntry, ProgressStatus, ProgressTracker};
use tracing::debug;

fn bar_style() -> miette::Result<ProgressStyle> {
    Ok(ProgressStyle::default_bar()
        .template("{spinner:.green} {prefix:20!} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        .map_err(|e| miette::miette!("Invalid progress bar template: {}", e))?
        .progress_chars("#>-"))
}

/// Render the entries whose ids are in `ids` until each is terminal or gone.
///
/// Ctrl-C cancels whatever is still running. Returns the last state seen
/// for every entry.
pub(crate) async fn watch(
    tracker: &ProgressTracker,
    ids: &[String],
) -> miette::Result<Vec<ProgressEntry>> {
    let multi = MultiProgress::new();
    let style = bar_style()?;
    let mut bars: HashMap<String, ProgressBar> = HashMap::new();
    let mut last: HashMap<String, ProgressEntry> = HashMap::new();
    let mut updates = tracker.subscribe();

    loop {
        let snapshot = updates.borrow_and_update().clone();
        for entry in snapshot.iter().filter(|e| ids.contains(&e.id)) {
            let bar = bars.entry(entry.id.clone()).or_insert_with(|| {
                let bar = multi.add(ProgressBar::new(100));
                bar.set_style(style.clone());
                bar.set_prefix(entry.name.clone());
                bar
            });
            render(bar, entry);
            last.insert(entry.id.clone(), entry.clone());
        }

        let done = ids.iter().all(|id| {
            snapshot
                .iter()
                .find(|e| &e.id == id)
                .map_or(true, |e| e.status.is_terminal())
        });
        if done {
            break;
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted, cancelling {} entries", ids.len());
                cancel_running(tracker, &snapshot, ids).await;
            }
        }
    }

    Ok(ids.iter().filter_map(|id| last.remove(id)).collect())
}

fn render(bar: &ProgressBar, entry: &ProgressEntry) {
    if bar.is_finished() {
        return;
    }
    bar.set_position(entry.progress.clamp(0.0, 100.0).round() as u64);
    match entry.status {
        ProgressStatus::Completed => bar.finish_with_message("done"),
        ProgressStatus::Cancelled => bar.abandon_with_message("cancelled"),
        ProgressStatus::Error => {
            let reason = entry.errors.last().map(String::as_str).unwrap_or("failed");
            bar.abandon_with_message(format!("error: {}", reason));
        }
        _ => {
            bar.set_message(entry.current_step.clone());
            bar.tick();
        }
    }
}

async fn cancel_running(tracker: &ProgressTracker, snapshot: &[ProgressEntry], ids: &[String]) {
    for entry in snapshot
        .iter()
        .filter(|e| ids.contains(&e.id) && !e.status.is_terminal())
    {
        let result = match entry.kind {
            EntryKind::Bundle => tracker.cancel_installation(&entry.id).await,
            EntryKind::Model => tracker.cancel_model_download(&entry.id).await.map(|_| ()),
        };
        if let Err(e) = result {
            debug!("Could not cancel {}: {}", entry.id, e);
        }
    }
}

/// Print a one-line summary per entry and fail if any did not complete.
pub(crate) fn summarize(entries: &[ProgressEntry]) -> miette::Result<()> {
    let mut failed = 0;
    for entry in entries {
        match entry.status {
            ProgressStatus::Completed => println!("{}: completed", entry.name),
            status => {
                failed += 1;
                println!("{}: {}", entry.name, status);
                for error in &entry.errors {
                    println!("  - {}", error);
                }
            }
        }
    }

    if failed > 0 {
        Err(miette::miette!("{} of {} did not complete", failed, entries.len()))
    } else {
        Ok(())
    }
}
