//! The Executor: a lazy, suspendable producer of interaction requests.
//!
//! Rust has no native resumable-generator primitive suitable for this, so
//! the "yield a request, resume with a response" contract is implemented as
//! a channel pair: the executor runs as an ordinary `async fn` on its own
//! task, and each interaction helper sends a request on an mpsc channel and
//! (for blocking interactions) awaits a response on a per-request oneshot
//! channel. The orchestrator is the loop on the receiving end of the mpsc
//! channel; it is the only place that resumes the "coroutine", by answering
//! each request before the executor's next await point unblocks.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::duration::DurationMs;
use crate::error::ExecutorError;
use crate::file_store::FileHandleStore;
use crate::interaction::{InteractionRequest, InteractionResponse, InteractionType};

/// Severity for `ExecutionContext::info`.
pub use crate::events::InfoLevel;

/// One message an executor sends upstream while it runs.
pub enum ExecutorMessage {
    /// A blocking interaction; the orchestrator must eventually send exactly
    /// one response down `respond_to`.
    Blocking {
        request: InteractionRequest,
        respond_to: oneshot::Sender<InteractionResponse>,
    },
    /// A non-blocking `progress`/`info` notification; fire-and-forget.
    NonBlocking { request: InteractionRequest },
}

/// Handed to an executor for the lifetime of one run. Carries cancellation,
/// file storage, and the interaction helpers.
#[derive(Clone)]
pub struct ExecutionContext {
    cancellation: CancellationToken,
    file_store: Arc<dyn FileHandleStore>,
    upstream: mpsc::Sender<ExecutorMessage>,
}

impl ExecutionContext {
    pub fn new(
        cancellation: CancellationToken,
        file_store: Arc<dyn FileHandleStore>,
        upstream: mpsc::Sender<ExecutorMessage>,
    ) -> Self {
        Self {
            cancellation,
            file_store,
            upstream,
        }
    }

    /// The run's cancellation token. Cooperative executors should poll this
    /// around long work; it is also tested by the orchestrator between yields.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// The run's file handle store.
    pub fn file_store(&self) -> &Arc<dyn FileHandleStore> {
        &self.file_store
    }

    async fn blocking(&self, request: InteractionRequest) -> Result<InteractionResponse, ExecutorError> {
        let (respond_to, response_rx) = oneshot::channel();
        self.upstream
            .send(ExecutorMessage::Blocking { request, respond_to })
            .await
            .map_err(|_| ExecutorError::Cancelled)?;
        response_rx.await.map_err(|_| ExecutorError::Cancelled)
    }

    async fn non_blocking(&self, request: InteractionRequest) {
        // Fire-and-forget: a full or closed channel must not suspend the executor.
        let _ = self.upstream.try_send(ExecutorMessage::NonBlocking { request });
    }

    /// Yield a non-blocking progress notification; does not suspend.
    pub async fn progress(&self, current: u64, total: Option<u64>, status: Option<String>) {
        let mut data = serde_json::json!({"current": current});
        if let Some(total) = total {
            data["total"] = Value::from(total);
        }
        if let Some(status) = &status {
            data["status"] = Value::String(status.clone());
        }
        let request = InteractionRequest::new(InteractionType::Progress, status.unwrap_or_default()).with_data(data);
        self.non_blocking(request).await;
    }

    /// Yield a non-blocking info notification; does not suspend.
    pub async fn info(&self, message: impl Into<String>, level: InfoLevel) {
        let message = message.into();
        let request = InteractionRequest::new(InteractionType::Info, message)
            .with_data(serde_json::json!({"level": serde_json::to_value(level).unwrap_or(Value::Null)}));
        self.non_blocking(request).await;
    }

    /// Ask for yes/no confirmation. Resumes with the response's boolean
    /// value, or the default on an interaction timeout.
    pub async fn confirm(&self, message: impl Into<String>, timeout: Option<DurationMs>) -> Result<bool, ExecutorError> {
        let mut request = InteractionRequest::new(InteractionType::Confirm, message).with_default_value(Value::Bool(false));
        if let Some(timeout) = timeout {
            request = request.with_timeout(timeout);
        }
        let response = self.blocking(request).await?;
        Ok(response.value.as_bool().unwrap_or(false))
    }

    /// Ask for free-text input.
    pub async fn prompt(
        &self,
        message: impl Into<String>,
        default_value: Option<String>,
        timeout: Option<DurationMs>,
    ) -> Result<String, ExecutorError> {
        let mut request = InteractionRequest::new(InteractionType::Prompt, message);
        if let Some(default) = &default_value {
            request = request.with_default_value(Value::String(default.clone()));
        }
        if let Some(timeout) = timeout {
            request = request.with_timeout(timeout);
        }
        let response = self.blocking(request).await?;
        Ok(response.value.as_str().unwrap_or_default().to_string())
    }

    /// Ask the user to pick one option.
    pub async fn select(
        &self,
        message: impl Into<String>,
        options: Vec<String>,
        default: Option<String>,
    ) -> Result<String, ExecutorError> {
        let mut request =
            InteractionRequest::new(InteractionType::Select, message).with_data(serde_json::json!({"options": options}));
        if let Some(default) = &default {
            request = request.with_default_value(Value::String(default.clone()));
        }
        let response = self.blocking(request).await?;
        Ok(response.value.as_str().unwrap_or_default().to_string())
    }

    /// Ask the user to pick any number of options, within optional bounds.
    pub async fn multiselect(
        &self,
        message: impl Into<String>,
        options: Vec<String>,
        min: Option<usize>,
        max: Option<usize>,
        default: Option<Vec<String>>,
    ) -> Result<Vec<String>, ExecutorError> {
        let mut data = serde_json::json!({"options": options});
        if let Some(min) = min {
            data["min"] = Value::from(min);
        }
        if let Some(max) = max {
            data["max"] = Value::from(max);
        }
        let mut request = InteractionRequest::new(InteractionType::Multiselect, message).with_data(data);
        if let Some(default) = &default {
            request = request.with_default_value(serde_json::json!(default));
        }
        let response = self.blocking(request).await?;
        let values = response
            .value
            .as_array()
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        Ok(values)
    }
}

/// A lazy suspendable producer of interaction requests, parameterized only
/// by the universal interchange type (`serde_json::Value`) — not by a
/// concrete app input/output type — so the orchestrator can drive any
/// executor uniformly. Apps embed their typed input/output at the edges and
/// (de)serialize through this boundary.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run to completion, yielding interaction requests through `ctx` and
    /// returning the app's final output, or raising an `ExecutorError`.
    ///
    /// MUST NOT perform blocking IO without yielding. Suspension points are
    /// exactly the interaction helpers on `ctx` and whatever external work
    /// the implementer chooses to `.await`.
    async fn run(&self, ctx: ExecutionContext, input: Value) -> Result<Value, ExecutorError>;
}
