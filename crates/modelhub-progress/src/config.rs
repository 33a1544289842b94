//! Tracker timing configuration.

use std::time::Duration;

/// Intervals, delays and caps used by the progress tracker.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// How often bundle installations are polled.
    pub install_poll_interval: Duration,
    /// How often model downloads are polled.
    pub download_poll_interval: Duration,
    /// Delay before a finished installation is dropped.
    pub install_removal_delay: Duration,
    /// Delay before a finished model download is dropped.
    pub download_removal_delay: Duration,
    /// Delay before a cancelled record is dropped.
    pub cancel_removal_delay: Duration,
    /// Highest progress shown for an installation before the backend
    /// confirms the bundle installed.
    pub install_progress_cap: f64,
    /// Highest progress shown for a download before completion.
    pub download_progress_cap: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            install_poll_interval: Duration::from_secs(1),
            download_poll_interval: Duration::from_secs(2),
            install_removal_delay: Duration::from_secs(5),
            download_removal_delay: Duration::from_secs(3),
            cancel_removal_delay: Duration::from_secs(2),
            install_progress_cap: 95.0,
            download_progress_cap: 99.0,
        }
    }
}
