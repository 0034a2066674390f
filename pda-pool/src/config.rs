//! Pool configuration.

use std::sync::Arc;
use std::time::Duration;

use pda_core::{DurationMs, KeyValueStore};

use crate::error::EscalationContext;

/// Called once when the pool gives up and escalates. Not called on
/// ordinary per-vendor failures or on [`crate::PoolError::Logic`].
pub type EscalateCallback = Arc<dyn Fn(&EscalationContext) + Send + Sync>;

/// Tuning knobs for [`crate::Pool`]. Defaults match the values worked
/// through in the error-handling design's example scenarios.
pub struct PoolConfig {
    /// Total failed attempts (across all vendors) before escalating.
    pub max_retries: u32,
    /// Consecutive failed attempts (uninterrupted by a success) before escalating.
    pub max_consecutive_failures: u32,
    /// Wall-clock budget for one `dispatch` call, start to finish.
    pub timeout: Duration,
    /// Starting `minTime` for a vendor with no persisted state.
    pub initial_min_time: DurationMs,
    /// AIMD probe step applied to every vendor in the pool.
    pub probe_step: u64,
    /// Rate-limit backoff multiplier applied to every vendor in the pool.
    pub rate_limit_backoff: f64,
    /// `(low, high)` milliseconds; uniform-random freeze duration on a `RateLimit` failure.
    pub soft_freeze_duration: (u64, u64),
    /// `(low, high)` milliseconds; uniform-random freeze duration on a `ServerError`/`Unknown` failure.
    pub hard_freeze_duration: (u64, u64),
    /// Durable backing store for vendor state snapshots.
    pub storage: Arc<dyn KeyValueStore>,
    /// Invoked exactly once when the pool escalates.
    pub on_escalate: Option<EscalateCallback>,
}

impl PoolConfig {
    /// A config with reasonable example defaults, backed by the given storage.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            max_retries: 10,
            max_consecutive_failures: 5,
            timeout: Duration::from_secs(30),
            initial_min_time: DurationMs::from_millis(500),
            probe_step: 20,
            rate_limit_backoff: 1.25,
            soft_freeze_duration: (5_000, 10_000),
            hard_freeze_duration: (30_000, 60_000),
            storage,
            on_escalate: None,
        }
    }
}
