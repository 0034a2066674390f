//! Error classification and the vendor-execution error type.

use pda_core::VendorId;
use thiserror::Error;

/// The class a failed vendor call is bucketed into, driving the pool's
/// freeze policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorClass {
    /// 429 / quota exhaustion. Soft-frozen; backs off `minTime`.
    RateLimit,
    /// 5xx / network / timeout. Hard-frozen.
    ServerError,
    /// 4xx / invalid / unauthorized. No freeze, no retry, propagates immediately.
    LogicError,
    /// Unrecognized; treated as [`ErrorClass::ServerError`] by the pool's freeze policy.
    Unknown,
}

/// Failure raised by a [`crate::Vendor`]'s `schedule`.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum VendorError {
    /// The backend call failed; carries the vendor, its classified error
    /// class, and the original error's textual description.
    #[error("vendor {vendor_id} failed ({error_class:?}): {original}")]
    Execution {
        /// The vendor that failed.
        vendor_id: VendorId,
        /// The class the default or overridden classifier assigned.
        error_class: ErrorClass,
        /// The backend error's `Display` output.
        original: String,
    },

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
