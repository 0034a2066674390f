#![warn(missing_docs)]
//! `Pool`: dispatches a task across a set of vendors with automatic
//! failover, load-balanced selection, freeze-on-failure, durable
//! persistence of vendor state, and escalation once retry/failure budgets
//! are exhausted.

pub mod config;
pub mod error;

use std::sync::Arc;
use std::time::{Duration, Instant};

use pda_core::KeyValueStore;
use pda_vendor::{ErrorClass, Vendor, VendorError, VendorState};
use rand::Rng;
use serde_json::Value;
use tokio::sync::{Mutex, OnceCell};

pub use config::PoolConfig;
pub use error::{EscalationContext, PoolError};

/// The outcome of one successful `Pool::dispatch`.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// The vendor's successful result.
    pub result: Value,
    /// The id of the vendor that produced it.
    pub vendor_id: pda_core::VendorId,
    /// How many failed attempts preceded this success.
    pub retries: u32,
    /// Wall-clock time the dispatch took.
    pub duration: Duration,
}

/// Multi-vendor scheduler. Construction is cheap; [`Pool::dispatch`]
/// performs lazy, idempotent, concurrency-safe initialization on first call.
pub struct Pool {
    vendors: Vec<Vendor>,
    config: PoolConfig,
    init: OnceCell<()>,
    init_lock: Mutex<()>,
}

impl Pool {
    /// Build a pool over the given vendors with the given configuration.
    /// Each vendor has the pool's `probeStep`/`rateLimitBackoff` applied.
    pub fn new(vendors: Vec<Vendor>, config: PoolConfig) -> Self {
        let vendors = vendors
            .into_iter()
            .map(|v| v.with_probe_tuning(config.probe_step, config.rate_limit_backoff))
            .collect();
        Self {
            vendors,
            config,
            init: OnceCell::new(),
            init_lock: Mutex::new(()),
        }
    }

    /// Idempotent, concurrency-safe initialization: loads `vendor:<id>`
    /// snapshots from storage for each vendor. Concurrent callers await the
    /// same initialization; it runs at most once.
    async fn ensure_initialized(&self) {
        if self.init.initialized() {
            return;
        }
        let _guard = self.init_lock.lock().await;
        self.init
            .get_or_init(|| async {
                for vendor in &self.vendors {
                    let key = format!("vendor:{}", vendor.id());
                    if let Ok(Some(value)) = self.config.storage.get(&key).await {
                        if let Ok(state) = serde_json::from_value::<VendorState>(value) {
                            vendor.load_state(state).await;
                        }
                    }
                }
            })
            .await;
    }

    /// Dispatch `input` across the pool's vendors, retrying and failing
    /// over per the freeze/escalation policy, and settling within
    /// `timeout + ε` wall-clock time regardless of outcome.
    pub async fn dispatch(&self, input: Value) -> Result<DispatchOutcome, PoolError> {
        self.ensure_initialized().await;

        let start = Instant::now();
        let mut total_retries: u32 = 0;
        let mut consecutive_failures: u32 = 0;
        let mut last_error = "no vendors".to_string();

        loop {
            let elapsed = start.elapsed();
            if elapsed >= self.config.timeout {
                return Err(PoolError::Timeout { elapsed });
            }

            if total_retries >= self.config.max_retries || consecutive_failures >= self.config.max_consecutive_failures
            {
                let context = self.escalation_context(total_retries, consecutive_failures, elapsed, &last_error, &input).await;
                if let Some(on_escalate) = &self.config.on_escalate {
                    on_escalate(&context);
                }
                return Err(PoolError::Escalation(context));
            }

            let remaining = self.config.timeout - elapsed;
            let now_ms = now_millis();

            let Some(vendor) = self.select_vendor(now_ms).await else {
                if self.wait_for_unfreeze(remaining, now_ms).await.is_none() {
                    return Err(PoolError::NoVendorAvailable {
                        frozen_until: self.earliest_unfreeze(now_ms).await,
                    });
                }
                continue;
            };

            vendor.increment_pending();
            let remaining = self.config.timeout.saturating_sub(start.elapsed());

            let outcome = tokio::select! {
                biased;
                result = vendor.schedule(input.clone()) => Some(result),
                _ = tokio::time::sleep(remaining) => None,
            };

            match outcome {
                Some(Ok(result)) => {
                    vendor.decrement_pending();
                    self.persist(vendor).await;
                    return Ok(DispatchOutcome {
                        result,
                        vendor_id: vendor.id().clone(),
                        retries: total_retries,
                        duration: start.elapsed(),
                    });
                }
                Some(Err(VendorError::Execution { error_class, original, .. })) => {
                    vendor.decrement_pending();
                    total_retries += 1;
                    consecutive_failures += 1;
                    last_error = original.clone();

                    if error_class == ErrorClass::LogicError {
                        self.persist(vendor).await;
                        return Err(PoolError::Logic(original));
                    }

                    self.freeze_for_class(vendor, error_class, now_ms).await;
                    self.persist(vendor).await;
                }
                Some(Err(VendorError::Other(e))) => {
                    vendor.decrement_pending();
                    total_retries += 1;
                    consecutive_failures += 1;
                    last_error = e.to_string();
                    self.persist(vendor).await;
                }
                None => {
                    // Timer won the race. The vendor's own `schedule` future
                    // is dropped here, which cancels it cooperatively; its
                    // eventual result (if any progress was buffered) is
                    // simply never observed.
                    vendor.decrement_pending();
                    return Err(PoolError::Timeout { elapsed: start.elapsed() });
                }
            }
        }
    }

    /// Among non-frozen vendors, the minimum by `(queueLength asc, weight
    /// desc, successRate desc)`.
    async fn select_vendor(&self, now_ms: u64) -> Option<&Vendor> {
        let mut best: Option<(&Vendor, u64, u32, f64)> = None;
        for vendor in &self.vendors {
            let state = vendor.state().await;
            if Vendor::is_frozen(&state, now_ms) {
                continue;
            }
            let queue_length = vendor.pending();
            let success_rate = vendor.success_rate().await;
            let candidate = (vendor, queue_length, vendor.weight(), success_rate);
            best = Some(match best {
                None => candidate,
                Some(current) => {
                    if (candidate.1, std::cmp::Reverse(candidate.2), -candidate.3)
                        < (current.1, std::cmp::Reverse(current.2), -current.3)
                    {
                        candidate
                    } else {
                        current
                    }
                }
            });
        }
        best.map(|(v, ..)| v)
    }

    async fn earliest_unfreeze(&self, now_ms: u64) -> u64 {
        let mut earliest = u64::MAX;
        for vendor in &self.vendors {
            let state = vendor.state().await;
            if state.frozen_until > now_ms {
                earliest = earliest.min(state.frozen_until);
            }
        }
        earliest
    }

    /// Sleep until the earliest `frozenUntil` plus a 100ms grace, capped by
    /// the remaining timeout budget. Returns `None` if the budget would be
    /// exhausted first.
    async fn wait_for_unfreeze(&self, remaining: Duration, now_ms: u64) -> Option<()> {
        let earliest = self.earliest_unfreeze(now_ms).await;
        if earliest == u64::MAX {
            return None;
        }
        let wait_ms = (earliest - now_ms) + 100;
        let wait = Duration::from_millis(wait_ms);
        if wait >= remaining {
            return None;
        }
        tokio::time::sleep(wait).await;
        Some(())
    }

    async fn freeze_for_class(&self, vendor: &Vendor, class: ErrorClass, now_ms: u64) {
        let duration_ms = match class {
            ErrorClass::RateLimit => rand_in_range(self.config.soft_freeze_duration),
            ErrorClass::ServerError | ErrorClass::Unknown => rand_in_range(self.config.hard_freeze_duration),
            ErrorClass::LogicError => return,
        };
        vendor.freeze(pda_core::DurationMs::from_millis(duration_ms), now_ms).await;
    }

    async fn persist(&self, vendor: &Vendor) {
        let key = format!("vendor:{}", vendor.id());
        let state = vendor.state().await;
        if let Ok(value) = serde_json::to_value(&state) {
            if let Err(e) = self.config.storage.set(&key, value).await {
                tracing::warn!(vendor = %vendor.id(), error = %e, "failed to persist vendor state, continuing");
            }
        }
    }

    async fn escalation_context(
        &self,
        total_retries: u32,
        consecutive_failures: u32,
        elapsed: Duration,
        last_error: &str,
        input: &Value,
    ) -> EscalationContext {
        let mut snapshots = Vec::with_capacity(self.vendors.len());
        for vendor in &self.vendors {
            snapshots.push((vendor.id().clone(), vendor.state().await));
        }
        EscalationContext {
            total_retries,
            consecutive_failures,
            elapsed,
            vendor_states: snapshots,
            last_error: last_error.to_string(),
            task_input: input.clone(),
        }
    }

    /// Snapshot every vendor's current state.
    pub async fn vendor_states(&self) -> Vec<(pda_core::VendorId, VendorState)> {
        self.ensure_initialized().await;
        let mut out = Vec::with_capacity(self.vendors.len());
        for vendor in &self.vendors {
            out.push((vendor.id().clone(), vendor.state().await));
        }
        out
    }

    /// Reset every vendor to a fresh state and persist the reset.
    pub async fn reset(&self) {
        self.ensure_initialized().await;
        for vendor in &self.vendors {
            vendor.reset(self.config.initial_min_time).await;
            self.persist(vendor).await;
        }
    }

    /// Drop every `vendor:*` key from storage without touching in-memory state.
    pub async fn clear_storage(&self) -> Result<(), PoolError> {
        let keys = self
            .config
            .storage
            .list_keys("vendor:")
            .await
            .map_err(|e| PoolError::Storage(e.to_string()))?;
        for key in keys {
            let _ = self.config.storage.delete(&key).await;
        }
        Ok(())
    }
}

fn rand_in_range((low, high): (u64, u64)) -> u64 {
    if low >= high {
        return low;
    }
    rand::thread_rng().gen_range(low..=high)
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
