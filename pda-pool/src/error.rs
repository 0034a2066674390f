//! Pool-level errors and the escalation context handed to `onEscalate`.

use std::time::Duration;

use pda_core::VendorId;
use pda_vendor::VendorState;
use serde_json::Value;
use thiserror::Error;

/// Snapshot of pool state at the moment retry/failure budgets were exhausted.
#[derive(Debug, Clone)]
pub struct EscalationContext {
    /// Total failed attempts across all vendors this dispatch.
    pub total_retries: u32,
    /// Consecutive failed attempts uninterrupted by a success.
    pub consecutive_failures: u32,
    /// Wall-clock time elapsed since dispatch started.
    pub elapsed: Duration,
    /// Every vendor's state at the time of escalation.
    pub vendor_states: Vec<(VendorId, VendorState)>,
    /// The most recent failure's message.
    pub last_error: String,
    /// The task input that was being dispatched.
    pub task_input: Value,
}

/// Failure raised by [`crate::Pool::dispatch`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum PoolError {
    /// The dispatch's wall-clock timeout budget was exhausted.
    #[error("pool dispatch timed out after {elapsed:?}")]
    Timeout {
        /// Elapsed time at the point of timeout.
        elapsed: Duration,
    },

    /// A vendor classified its failure as a logic error; propagates
    /// immediately without retry, freeze, or escalation.
    #[error("logic error: {0}")]
    Logic(String),

    /// Every vendor is currently frozen and waiting would exceed the
    /// remaining timeout budget.
    #[error("no vendor available; frozen until {frozen_until}ms")]
    NoVendorAvailable {
        /// Earliest `frozenUntil` among the pool's vendors, epoch milliseconds.
        frozen_until: u64,
    },

    /// Retry or consecutive-failure budget exhausted.
    #[error("escalated after {0.total_retries} retries ({0.consecutive_failures} consecutive failures)")]
    Escalation(EscalationContext),

    /// Storage or other unclassified failure.
    #[error("{0}")]
    Storage(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
