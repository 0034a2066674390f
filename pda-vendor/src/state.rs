//! Persistable vendor state.

use serde::{Deserialize, Serialize};

/// Persistable snapshot of a vendor's rate-discovery and freeze state.
///
/// Invariants: `min_time >= 50`; `last_success_min_time <= min_time`; once
/// `is_stable`, `min_time` never decreases below `last_success_min_time`
/// (enforced by [`crate::Vendor`]'s state evolution, not by this struct's
/// constructors).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorState {
    /// Whether the vendor has been rate-limited at least once since its last reset.
    pub is_stable: bool,
    /// Current inter-request spacing, in milliseconds.
    pub min_time: u64,
    /// The `min_time` recorded at the last success before entering `is_stable`.
    pub last_success_min_time: u64,
    /// Milliseconds since the epoch at which the freeze lifts; `0` means not frozen.
    pub frozen_until: u64,
    /// Total successful calls.
    pub success_count: u64,
    /// Total failed calls.
    pub failure_count: u64,
    /// The most recent failure's message, if any.
    pub last_error: Option<String>,
    /// Milliseconds since the epoch of the most recent failure, if any.
    pub last_error_at: Option<u64>,
}

impl VendorState {
    /// Fresh state at the given initial `minTime` (clamped to the 50ms floor).
    pub fn new(initial_min_time: u64) -> Self {
        let min_time = initial_min_time.max(crate::MIN_TIME_FLOOR_MS);
        Self {
            is_stable: false,
            min_time,
            last_success_min_time: min_time,
            frozen_until: 0,
            success_count: 0,
            failure_count: 0,
            last_error: None,
            last_error_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_starts_unfrozen_and_unstable() {
        let state = VendorState::new(500);
        assert!(!state.is_stable);
        assert_eq!(state.frozen_until, 0);
        assert_eq!(state.min_time, 500);
    }

    #[test]
    fn fresh_state_clamps_below_floor_min_time() {
        let state = VendorState::new(10);
        assert_eq!(state.min_time, crate::MIN_TIME_FLOOR_MS);
    }

    #[test]
    fn state_round_trips_through_json() {
        let state = VendorState::new(500);
        let json = serde_json::to_value(&state).unwrap();
        let back: VendorState = serde_json::from_value(json).unwrap();
        assert_eq!(state, back);
    }
}
