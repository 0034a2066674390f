//! Execution outcomes and file references.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::duration::DurationMs;
use crate::id::FileHandle;

/// A reference to a blob held in the File Handle Store. The handle governs
/// the blob's lifetime; this struct is just a pointer plus metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRef {
    pub handle: FileHandle,
    pub mime_type: String,
    pub filename: Option<String>,
    pub size: u64,
    pub temporary: Option<bool>,
}

/// The terminal outcome of one Orchestrator run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    /// Present iff `success`.
    pub data: Option<Value>,
    /// Present iff `!success`.
    pub error: Option<String>,
    pub stack: Option<String>,
    pub files: Option<Vec<FileRef>>,
    /// Milliseconds since the run transitioned to `PRE_FLIGHT`.
    pub duration: DurationMs,
}

impl ExecutionResult {
    /// Build the `{success: true, data, duration}` result of a clean completion.
    pub fn success(data: Value, duration: DurationMs) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            stack: None,
            files: None,
            duration,
        }
    }

    /// Build the `{success: false, error, stack, duration}` result of a failed run.
    pub fn failure(error: impl Into<String>, stack: Option<String>, duration: DurationMs) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            stack,
            files: None,
            duration,
        }
    }

    pub fn with_files(mut self, files: Vec<FileRef>) -> Self {
        self.files = Some(files);
        self
    }
}
