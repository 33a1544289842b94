//! Downloads command - pick up downloads the backend is still running.

use tracing::info;

use super::{progress, Context};

pub(crate) async fn run(ctx: &Context) -> miette::Result<()> {
    let tracker = ctx.tracker();
    let restored = tracker
        .restore_active_downloads()
        .await
        .map_err(|e| miette::miette!("Failed to read download status: {}", e))?;

    if restored == 0 {
        println!("No active downloads.");
        return Ok(());
    }
    info!("Watching {} download(s)", restored);

    let ids: Vec<String> = tracker.model_downloads().into_iter().map(|d| d.id).collect();
    let entries = progress::watch(&tracker, &ids).await?;
    progress::summarize(&entries)
}
