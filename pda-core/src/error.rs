//! Error types for each protocol boundary.

use thiserror::Error;

use crate::orchestrator::OrchestratorState;

/// Failure while validating raw input against a manifest's input schema.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field was missing.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A field's value did not match its declared type.
    #[error("field {field} expected {expected}, got {got}")]
    TypeMismatch {
        /// Name of the offending field.
        field: String,
        /// The type the schema declared.
        expected: String,
        /// A description of the value actually supplied.
        got: String,
    },

    /// A value was outside its declared enum.
    #[error("field {field} is not one of the allowed values")]
    NotInEnum {
        /// Name of the offending field.
        field: String,
    },

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Failure deriving field descriptors or a portable schema from an input schema.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema was not a recognizable object-like shape.
    #[error("unrecognized schema shape: {0}")]
    UnrecognizedShape(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Failure in the File Handle Store.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum FileStoreError {
    /// The backing storage failed to write or read a blob.
    #[error("storage io error: {0}")]
    Io(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Failure raised by an executor while it runs.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The executor raised an application-level failure.
    #[error("{0}")]
    Failed(String),

    /// The run's cancellation token was tripped.
    #[error("cancelled")]
    Cancelled,

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Failure raised by an adapter.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AdapterError {
    /// `collectInput` failed to produce raw input.
    #[error("input collection failed: {0}")]
    CollectInput(String),

    /// `handleInteraction` failed on a blocking request.
    #[error("interaction handling failed: {0}")]
    HandleInteraction(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Failure raised by the Orchestrator.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum OrchError {
    /// An illegal state transition was attempted.
    #[error("illegal transition from {from:?} to {to:?}")]
    IllegalTransition {
        /// The state the orchestrator was in.
        from: OrchestratorState,
        /// The state that was requested.
        to: OrchestratorState,
    },

    /// Input failed schema validation.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The executor raised a failure.
    #[error("executor failed: {0}")]
    Executor(#[from] ExecutorError),

    /// The adapter raised a failure handling a blocking interaction.
    #[error("adapter failed: {0}")]
    Adapter(#[from] AdapterError),

    /// `reset()` was called from a non-terminal state.
    #[error("reset is only legal from a terminal state, found {0:?}")]
    ResetFromNonTerminal(OrchestratorState),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
