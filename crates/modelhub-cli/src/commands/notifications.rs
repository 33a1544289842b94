//! Notifications command - show recent toasts from earlier commands.

use modelhub_progress::NotificationLevel;

use super::Context;

pub(crate) fn run(ctx: &Context, clear: bool) -> miette::Result<()> {
    let log = ctx.notification_log();

    if clear {
        log.clear()
            .map_err(|e| miette::miette!("Failed to clear notifications: {}", e))?;
        println!("Notifications cleared.");
        return Ok(());
    }

    let entries = log
        .load()
        .map_err(|e| miette::miette!("Failed to read notifications: {}", e))?;
    if entries.is_empty() {
        println!("No recent notifications.");
        return Ok(());
    }

    for n in &entries {
        let level = match n.level {
            NotificationLevel::Success => "ok",
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warn",
            NotificationLevel::Error => "error",
        };
        println!(
            "[{}] {:<5} {}: {}",
            n.timestamp.format("%H:%M:%S"),
            level,
            n.title,
            n.message
        );
    }
    Ok(())
}
