use std::time::Duration;

// How often the confirmation poller re-queries the node
pub const SYNC_INTERVAL: Duration = Duration::from_millis(50);
// How long to wait for inclusion before giving up. Giving up says nothing
// about the outcome.
pub const CONFIRM_TIMEOUT: Duration = Duration::from_secs(90);
// Inclusion depth an operation must reach to count as confirmed
pub const DEFAULT_CONFIRMATIONS: u64 = 1;

/// Tuning for the confirmation poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationConfig {
    pub confirmations: u64,
    pub timeout: Duration,
    pub sync_interval: Duration,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            confirmations: DEFAULT_CONFIRMATIONS,
            timeout: CONFIRM_TIMEOUT,
            sync_interval: SYNC_INTERVAL,
        }
    }
}
