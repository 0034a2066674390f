#![warn(missing_docs)]
//! `Vendor`: a single-backend wrapper performing adaptive rate discovery
//! (AIMD probe/backoff), default error classification, and an internal
//! rate limiter of concurrency 1. Freezing policy itself belongs to the
//! scheduler in `pda-pool`; a `Vendor` only tracks and mutates its own
//! `VendorState` in response to outcomes it observes directly.

pub mod error;
pub mod state;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use pda_core::VendorId;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

pub use error::{ErrorClass, VendorError};
pub use state::VendorState;

/// The floor `minTime` never probes below, in milliseconds.
pub const MIN_TIME_FLOOR_MS: u64 = 50;

/// The backend a `Vendor` wraps: one outbound call, fallible.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Execute the call. Errors are classified per [`default_classify`]
    /// (or a vendor-supplied override) and re-raised as a [`VendorError`].
    async fn execute(&self, input: Value) -> Result<Value, Box<dyn std::error::Error + Send + Sync>>;
}

/// Classify an error message into an [`ErrorClass`] using the token rules
/// from the error handling design: rate-limit indicators, 5xx/network
/// transport failures, and 4xx/invalid/unauthorized client errors.
pub fn default_classify(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    let contains_any = |tokens: &[&str]| tokens.iter().any(|t| lower.contains(t));

    if contains_any(&["429", "rate limit", "too many requests", "quota"]) {
        ErrorClass::RateLimit
    } else if contains_any(&["400", "401", "403", "404", "invalid", "unauthorized", "not found", "bad request"]) {
        ErrorClass::LogicError
    } else if contains_any(&["5xx", "timeout", "network", "econn", "500", "502", "503", "504"]) {
        ErrorClass::ServerError
    } else {
        ErrorClass::Unknown
    }
}

type Classifier = dyn Fn(&str) -> ErrorClass + Send + Sync;

/// A single backend wrapped with adaptive rate discovery and a
/// concurrency-1 rate limiter. Cheap to clone — internal state is shared
/// via `Arc`.
#[derive(Clone)]
pub struct Vendor {
    id: VendorId,
    weight: u32,
    backend: Arc<dyn Backend>,
    classifier: Arc<Classifier>,
    state: Arc<RwLock<VendorState>>,
    /// Enforces concurrency 1; held across the sleep-then-execute sequence.
    limiter: Arc<Mutex<Instant>>,
    pending: Arc<AtomicI64>,
    /// AIMD probe step, in ms. Owned by the pool's config; defaults to the
    /// spec's example value of 20 so a bare `Vendor` is still usable standalone.
    probe_step: u64,
    /// Multiplier applied to `minTime` on a rate-limit failure.
    rate_limit_backoff: f64,
}

impl Vendor {
    /// Build a vendor. `weight` is clamped to at least 1 per the data model.
    pub fn new(id: VendorId, weight: u32, initial_min_time: pda_core::DurationMs, backend: Arc<dyn Backend>) -> Self {
        Self {
            id,
            weight: weight.max(1),
            backend,
            classifier: Arc::new(default_classify),
            state: Arc::new(RwLock::new(VendorState::new(initial_min_time.as_millis().max(MIN_TIME_FLOOR_MS)))),
            limiter: Arc::new(Mutex::new(Instant::now() - Duration::from_secs(3600))),
            pending: Arc::new(AtomicI64::new(0)),
            probe_step: 20,
            rate_limit_backoff: 1.25,
        }
    }

    /// Override the default error classifier.
    pub fn with_classifier(mut self, classifier: impl Fn(&str) -> ErrorClass + Send + Sync + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Override the AIMD probe step and rate-limit backoff multiplier;
    /// used by `Pool` to propagate its own configured values.
    pub fn with_probe_tuning(mut self, probe_step: u64, rate_limit_backoff: f64) -> Self {
        self.probe_step = probe_step;
        self.rate_limit_backoff = rate_limit_backoff;
        self
    }

    /// The vendor's identifier.
    pub fn id(&self) -> &VendorId {
        &self.id
    }

    /// Selection weight, always `>= 1`.
    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Snapshot the vendor's current persistable state.
    pub async fn state(&self) -> VendorState {
        self.state.read().await.clone()
    }

    /// Overwrite state wholesale, e.g. loading a snapshot from storage
    /// during `Pool` initialization.
    pub async fn load_state(&self, loaded: VendorState) {
        *self.state.write().await = loaded;
    }

    /// Reset to a fresh, unfrozen, unstable state at the given floor.
    pub async fn reset(&self, initial_min_time: pda_core::DurationMs) {
        *self.state.write().await = VendorState::new(initial_min_time.as_millis().max(MIN_TIME_FLOOR_MS));
    }

    /// In-flight assignments not yet observed by the limiter: incremented
    /// when the pool selects this vendor, decremented when `schedule` settles.
    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::SeqCst).max(0) as u64
    }

    /// Called by the pool immediately after selecting this vendor.
    pub fn increment_pending(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    /// Called by the pool once `schedule` settles, successfully or not.
    pub fn decrement_pending(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }

    /// `successCount / (successCount + failureCount)`, `1.0` with no history yet.
    pub async fn success_rate(&self) -> f64 {
        let state = self.state.read().await;
        let total = state.success_count + state.failure_count;
        if total == 0 {
            1.0
        } else {
            state.success_count as f64 / total as f64
        }
    }

    /// Whether the vendor is currently frozen, given the current wall-clock
    /// time in milliseconds since the epoch. Freezing itself is set by the
    /// pool via [`Vendor::freeze`]; this only reads it.
    pub fn is_frozen(state: &VendorState, now_ms: u64) -> bool {
        state.frozen_until > now_ms
    }

    /// Freeze the vendor until `now_ms + duration`. Called by the pool in
    /// response to a classified failure; `Vendor` never freezes itself.
    pub async fn freeze(&self, duration: pda_core::DurationMs, now_ms: u64) {
        let mut state = self.state.write().await;
        state.frozen_until = now_ms + duration.as_millis();
    }

    /// Funnel `input` through the rate limiter (concurrency 1, paced by the
    /// current `minTime`) and the backend, then apply the AIMD state
    /// evolution for the outcome. Does not freeze — that's the pool's job
    /// once it observes the returned [`VendorError`]'s class.
    pub async fn schedule(&self, input: Value) -> Result<Value, VendorError> {
        let min_time = {
            let mut last_dispatch = self.limiter.lock().await;
            let min_time_ms = self.state.read().await.min_time;
            let elapsed = last_dispatch.elapsed();
            let required = Duration::from_millis(min_time_ms);
            if elapsed < required {
                tokio::time::sleep(required - elapsed).await;
            }
            *last_dispatch = Instant::now();
            min_time_ms
        };

        match self.backend.execute(input).await {
            Ok(output) => {
                self.record_success().await;
                Ok(output)
            }
            Err(original) => {
                let message = original.to_string();
                let class = (self.classifier)(&message);
                self.record_failure(class, &message, min_time).await;
                Err(VendorError::Execution {
                    vendor_id: self.id.clone(),
                    error_class: class,
                    original: message,
                })
            }
        }
    }

    async fn record_success(&self) {
        let mut state = self.state.write().await;
        if !state.is_stable {
            state.last_success_min_time = state.min_time;
            state.min_time = state.min_time.saturating_sub(self.probe_step).max(MIN_TIME_FLOOR_MS);
        }
        state.success_count += 1;
        tracing::debug!(vendor = %self.id, min_time = state.min_time, "vendor success");
    }

    async fn record_failure(&self, class: ErrorClass, message: &str, current_min_time: u64) {
        let mut state = self.state.write().await;
        if class == ErrorClass::RateLimit {
            let backoff_base = if state.is_stable { state.min_time } else { state.last_success_min_time.max(current_min_time) };
            state.is_stable = true;
            state.min_time = ((backoff_base as f64) * self.rate_limit_backoff).ceil() as u64;
        }
        state.failure_count += 1;
        state.last_error = Some(message.to_string());
        state.last_error_at = Some(now_millis());
        tracing::warn!(vendor = %self.id, ?class, "vendor failure");
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    struct AlwaysSucceed;

    #[async_trait]
    impl Backend for AlwaysSucceed {
        async fn execute(&self, input: Value) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
            Ok(input)
        }
    }

    struct AlwaysFail(&'static str);

    #[async_trait]
    impl Backend for AlwaysFail {
        async fn execute(&self, _input: Value) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
            Err(self.0.into())
        }
    }

    struct CountedThenRateLimit {
        calls: AtomicU32,
        succeed_for: u32,
    }

    #[async_trait]
    impl Backend for CountedThenRateLimit {
        async fn execute(&self, input: Value) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.succeed_for {
                Ok(input)
            } else {
                Err("429 too many requests".into())
            }
        }
    }

    fn min_time(ms: u64) -> pda_core::DurationMs {
        pda_core::DurationMs::from_millis(ms)
    }

    #[test]
    fn default_classify_maps_tokens_to_classes() {
        assert_eq!(default_classify("429 Too Many Requests"), ErrorClass::RateLimit);
        assert_eq!(default_classify("500 Internal Server Error"), ErrorClass::ServerError);
        assert_eq!(default_classify("400 Bad Request"), ErrorClass::LogicError);
        assert_eq!(default_classify("teapot"), ErrorClass::Unknown);
    }

    #[tokio::test]
    async fn success_probes_min_time_toward_floor() {
        let vendor = Vendor::new(VendorId::new("v1"), 1, min_time(100), Arc::new(AlwaysSucceed));
        vendor.schedule(serde_json::json!("x")).await.unwrap();
        let state = vendor.state().await;
        assert_eq!(state.min_time, 80);
        assert!(!state.is_stable);
    }

    #[tokio::test]
    async fn min_time_never_drops_below_floor() {
        let vendor = Vendor::new(VendorId::new("v1"), 1, min_time(55), Arc::new(AlwaysSucceed));
        for _ in 0..5 {
            vendor.schedule(serde_json::json!("x")).await.unwrap();
        }
        assert!(vendor.state().await.min_time >= MIN_TIME_FLOOR_MS);
    }

    #[tokio::test]
    async fn rate_limit_failure_marks_stable_and_backs_off() {
        let backend = CountedThenRateLimit { calls: AtomicU32::new(0), succeed_for: 5 };
        let vendor = Vendor::new(VendorId::new("v1"), 1, min_time(500), Arc::new(backend));

        for _ in 0..5 {
            vendor.schedule(serde_json::json!("x")).await.unwrap();
        }
        let after_successes = vendor.state().await;
        assert_eq!(after_successes.min_time, 400);
        assert_eq!(after_successes.last_success_min_time, 420);
        assert!(!after_successes.is_stable);

        let err = vendor.schedule(serde_json::json!("x")).await.unwrap_err();
        assert!(matches!(err, VendorError::Execution { error_class: ErrorClass::RateLimit, .. }));
        let after_limit = vendor.state().await;
        assert!(after_limit.is_stable);
        assert_eq!(after_limit.min_time, 525);
    }

    #[tokio::test]
    async fn logic_error_does_not_touch_min_time() {
        let vendor = Vendor::new(VendorId::new("v1"), 1, min_time(500), Arc::new(AlwaysFail("400 invalid request")));
        let err = vendor.schedule(serde_json::json!("x")).await.unwrap_err();
        assert!(matches!(err, VendorError::Execution { error_class: ErrorClass::LogicError, .. }));
        assert_eq!(vendor.state().await.min_time, 500);
    }

    #[tokio::test]
    async fn pending_count_tracks_manual_increments() {
        let vendor = Vendor::new(VendorId::new("v1"), 1, min_time(50), Arc::new(AlwaysSucceed));
        vendor.increment_pending();
        vendor.increment_pending();
        assert_eq!(vendor.pending(), 2);
        vendor.decrement_pending();
        assert_eq!(vendor.pending(), 1);
    }

    #[tokio::test]
    async fn is_frozen_reads_frozen_until_against_now() {
        let vendor = Vendor::new(VendorId::new("v1"), 1, min_time(50), Arc::new(AlwaysSucceed));
        vendor.freeze(pda_core::DurationMs::from_millis(10_000), 1_000).await;
        let state = vendor.state().await;
        assert!(Vendor::is_frozen(&state, 5_000));
        assert!(!Vendor::is_frozen(&state, 20_000));
    }
}
