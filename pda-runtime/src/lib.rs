#![warn(missing_docs)]
//! The Orchestrator state machine driver.
//!
//! Drives one [`Executor`] to completion against one [`Adapter`], policing
//! the state graph in `pda_core::orchestrator`, translating executor yields
//! into adapter calls, enforcing interaction timeouts, and publishing events
//! on an [`EventBus`].
//!
//! There is exactly one orchestrator implementation: a PDA run has no
//! alternate persistence strategies to swap in, so this crate exposes a
//! single concrete [`Orchestrator`] rather than a trait.

use std::sync::Arc;
use std::time::Instant;

use pda_core::events::{Event, EventBus, InfoLevel};
use pda_core::{
    Adapter, DurationMs, ExecutionContext, ExecutionResult, Executor, ExecutorError,
    ExecutorMessage, FileHandleStore, InteractionResponse, InteractionType, Manifest, OrchError,
    OrchestratorState,
};
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

/// Drives one run of an [`Executor`] against one [`Adapter`].
///
/// An `Orchestrator` is reusable across runs: once a run reaches a terminal
/// state, [`Orchestrator::reset`] returns it to `IDLE` for the next one.
pub struct Orchestrator {
    state: RwLock<OrchestratorState>,
    events: EventBus,
}

impl Orchestrator {
    /// Create a fresh orchestrator in `IDLE`, with its own event bus.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(OrchestratorState::Idle),
            events: EventBus::default(),
        }
    }

    /// Create an orchestrator publishing onto a caller-supplied event bus
    /// (useful for sharing one bus across several orchestrators, or wiring
    /// it to an adapter's own subscriber before the first run).
    pub fn with_event_bus(events: EventBus) -> Self {
        Self {
            state: RwLock::new(OrchestratorState::Idle),
            events,
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> OrchestratorState {
        *self.state.read().await
    }

    /// Subscribe to this orchestrator's events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Return to `IDLE` from a terminal state. Does not clear observers.
    pub async fn reset(&self) -> Result<(), OrchError> {
        let current = *self.state.read().await;
        if !current.is_terminal() {
            return Err(OrchError::ResetFromNonTerminal(current));
        }
        self.transition(OrchestratorState::Idle, None).await
    }

    async fn transition(&self, to: OrchestratorState, adapter: Option<&Arc<dyn Adapter>>) -> Result<(), OrchError> {
        let mut guard = self.state.write().await;
        if let Err(e) = pda_core::validate_transition(*guard, to) {
            let from = *guard;
            tracing::warn!(?from, ?to, "illegal orchestrator transition rejected");
            return Err(e);
        }
        let from = *guard;
        *guard = to;
        drop(guard);
        tracing::debug!(?from, ?to, "orchestrator state change");
        self.events.emit(Event::StateChange { from, to });
        if let Some(adapter) = adapter {
            adapter.on_state_change(from, to).await;
        }
        Ok(())
    }

    /// Run `executor` to completion against `adapter`, using `file_store`
    /// for any files it produces. `input`, when supplied, bypasses
    /// `adapter.collect_input` entirely — caller-supplied input always wins.
    ///
    /// Fails with [`OrchError`] only for the precondition (the orchestrator
    /// must be `IDLE`) and for genuine state-machine bugs; every other
    /// failure mode (validation, executor, cancellation, adapter) is
    /// reported through the returned [`ExecutionResult`].
    pub async fn run(
        &self,
        manifest: &Manifest,
        executor: Arc<dyn Executor>,
        adapter: Arc<dyn Adapter>,
        file_store: Arc<dyn FileHandleStore>,
        input: Option<Value>,
    ) -> Result<ExecutionResult, OrchError> {
        self.transition(OrchestratorState::PreFlight, Some(&adapter)).await?;
        let start = Instant::now();

        let raw_input = match input {
            Some(v) => v,
            None => match adapter.collect_input(manifest).await {
                Ok(v) => v,
                Err(e) => return Ok(self.finish_failure(manifest, &adapter, start, e.to_string()).await),
            },
        };

        let validated = match pda_core::validate_input(&manifest.input_schema, &raw_input) {
            Ok(v) => v,
            Err(e) => return Ok(self.finish_failure(manifest, &adapter, start, e.to_string()).await),
        };

        self.transition(OrchestratorState::Running, Some(&adapter)).await?;

        let cancellation = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel::<ExecutorMessage>(16);
        let ctx = ExecutionContext::new(cancellation.clone(), file_store, tx);

        let mut task = tokio::spawn({
            let executor = executor;
            async move { executor.run(ctx, validated).await }
        });

        let outcome: Result<Value, ExecutorError> = loop {
            tokio::select! {
                biased;
                msg = rx.recv() => {
                    match msg {
                        Some(message) => {
                            if cancellation.is_cancelled() {
                                task.abort();
                                break Err(ExecutorError::Cancelled);
                            }
                            if let Err(e) = self.dispatch(&adapter, message).await {
                                task.abort();
                                break Err(e);
                            }
                        }
                        None => break flatten_join(task.await),
                    }
                }
                result = &mut task => {
                    break flatten_join(result);
                }
            }
        };

        Ok(match outcome {
            Ok(value) => self.finish_success(manifest, &adapter, start, value).await,
            Err(e) => self.finish_failure(manifest, &adapter, start, e.to_string()).await,
        })
    }

    /// Route one message yielded by the executor: transition through
    /// `AWAITING_USER` and back, performing the adapter call appropriate to
    /// the interaction's kind.
    async fn dispatch(&self, adapter: &Arc<dyn Adapter>, message: ExecutorMessage) -> Result<(), ExecutorError> {
        self.transition(OrchestratorState::AwaitingUser, Some(adapter))
            .await
            .map_err(|e| ExecutorError::Other(Box::new(e)))?;

        match message {
            ExecutorMessage::Blocking { request, respond_to } => {
                self.events.emit(Event::InteractionRequest { request: request.clone() });
                let response = match request.timeout {
                    Some(timeout) => match tokio::time::timeout(timeout.to_std(), adapter.handle_interaction(&request)).await {
                        Ok(Ok(response)) => response,
                        Ok(Err(e)) => return Err(ExecutorError::Other(Box::new(e))),
                        Err(_elapsed) => {
                            tracing::debug!(request_id = %request.request_id, "interaction timed out, using default");
                            InteractionResponse::skipped(
                                request.request_id.clone(),
                                request.default_value.clone().unwrap_or(Value::Null),
                            )
                        }
                    },
                    None => adapter
                        .handle_interaction(&request)
                        .await
                        .map_err(|e| ExecutorError::Other(Box::new(e)))?,
                };
                self.events.emit(Event::InteractionResponse { response: response.clone() });
                // The losing side of the race above is simply dropped; Rust
                // futures have no notion of an unobserved-rejection crash.
                let _ = respond_to.send(response);
            }
            ExecutorMessage::NonBlocking { request } => {
                match request.interaction_type {
                    InteractionType::Progress => {
                        let current = request.data.as_ref().and_then(|d| d.get("current")).and_then(Value::as_u64).unwrap_or(0);
                        let total = request.data.as_ref().and_then(|d| d.get("total")).and_then(Value::as_u64);
                        let status = request.data.as_ref().and_then(|d| d.get("status")).and_then(Value::as_str).map(str::to_string);
                        self.events.emit(Event::Progress { current, total, status });
                    }
                    InteractionType::Info => {
                        let level = request
                            .data
                            .as_ref()
                            .and_then(|d| d.get("level"))
                            .and_then(|v| serde_json::from_value::<InfoLevel>(v.clone()).ok())
                            .unwrap_or(InfoLevel::Info);
                        self.events.emit(Event::Info { message: request.message.clone(), level });
                    }
                    _ => self.events.emit(Event::InteractionRequest { request: request.clone() }),
                }
                // Fire-and-forget: the executor must not wait on this.
                let adapter = adapter.clone();
                tokio::spawn(async move {
                    let _ = adapter.handle_interaction(&request).await;
                });
            }
        }

        self.transition(OrchestratorState::Running, Some(adapter))
            .await
            .map_err(|e| ExecutorError::Other(Box::new(e)))
    }

    async fn finish_success(
        &self,
        manifest: &Manifest,
        adapter: &Arc<dyn Adapter>,
        start: Instant,
        data: Value,
    ) -> ExecutionResult {
        let duration = DurationMs::from(start.elapsed());
        let result = ExecutionResult::success(data, duration);
        let _ = self.transition(OrchestratorState::Success, Some(adapter)).await;
        self.events.emit(Event::Complete { result: result.clone() });
        adapter.render_output(&result, manifest).await;
        result
    }

    async fn finish_failure(
        &self,
        manifest: &Manifest,
        adapter: &Arc<dyn Adapter>,
        start: Instant,
        error: String,
    ) -> ExecutionResult {
        let duration = DurationMs::from(start.elapsed());
        let result = ExecutionResult::failure(error.clone(), None, duration);
        // Failure can occur while still in PRE_FLIGHT (validation) as well
        // as RUNNING (executor/cancellation); both transition to ERROR.
        let current = *self.state.read().await;
        if current != OrchestratorState::Error {
            let _ = self.transition(OrchestratorState::Error, Some(adapter)).await;
        }
        self.events.emit(Event::Error { message: error });
        self.events.emit(Event::Complete { result: result.clone() });
        adapter.render_output(&result, manifest).await;
        result
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

fn flatten_join(result: Result<Result<Value, ExecutorError>, tokio::task::JoinError>) -> Result<Value, ExecutorError> {
    match result {
        Ok(inner) => inner,
        Err(join_err) if join_err.is_cancelled() => Err(ExecutorError::Cancelled),
        Err(join_err) => Err(ExecutorError::Other(Box::new(join_err))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pda_core::{AdapterError, InteractionRequest};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoExecutor;

    #[async_trait]
    impl Executor for EchoExecutor {
        async fn run(&self, _ctx: ExecutionContext, input: Value) -> Result<Value, ExecutorError> {
            Ok(input)
        }
    }

    struct ConfirmThenFailExecutor;

    #[async_trait]
    impl Executor for ConfirmThenFailExecutor {
        async fn run(&self, ctx: ExecutionContext, _input: Value) -> Result<Value, ExecutorError> {
            let proceed = ctx.confirm("divide by zero?", None).await?;
            if proceed {
                Ok(Value::from(0))
            } else {
                Err(ExecutorError::Failed("Operation cancelled by user".into()))
            }
        }
    }

    struct TimeoutPromptExecutor;

    #[async_trait]
    impl Executor for TimeoutPromptExecutor {
        async fn run(&self, ctx: ExecutionContext, _input: Value) -> Result<Value, ExecutorError> {
            let name = ctx
                .prompt("Enter name", Some("anon".into()), Some(DurationMs::from_millis(50)))
                .await?;
            Ok(Value::String(name))
        }
    }

    struct NoOpAdapter {
        confirm_response: bool,
        render_calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Adapter for NoOpAdapter {
        async fn collect_input(&self, _manifest: &Manifest) -> Result<Value, AdapterError> {
            Ok(serde_json::json!({}))
        }

        async fn handle_interaction(&self, request: &InteractionRequest) -> Result<InteractionResponse, AdapterError> {
            Ok(InteractionResponse::new(request.request_id.clone(), Value::Bool(self.confirm_response)))
        }

        async fn render_output(&self, _result: &ExecutionResult, _manifest: &Manifest) {
            self.render_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct ObservingAdapter {
        seen: Arc<std::sync::Mutex<Vec<(OrchestratorState, OrchestratorState)>>>,
    }

    #[async_trait]
    impl Adapter for ObservingAdapter {
        async fn collect_input(&self, _manifest: &Manifest) -> Result<Value, AdapterError> {
            Ok(serde_json::json!({}))
        }

        async fn handle_interaction(&self, request: &InteractionRequest) -> Result<InteractionResponse, AdapterError> {
            Ok(InteractionResponse::new(request.request_id.clone(), Value::Bool(true)))
        }

        async fn render_output(&self, _result: &ExecutionResult, _manifest: &Manifest) {}

        async fn on_state_change(&self, from: OrchestratorState, to: OrchestratorState) {
            self.seen.lock().unwrap().push((from, to));
        }
    }

    struct SilentAdapter;

    #[async_trait]
    impl Adapter for SilentAdapter {
        async fn collect_input(&self, _manifest: &Manifest) -> Result<Value, AdapterError> {
            Ok(serde_json::json!({}))
        }

        async fn handle_interaction(&self, _request: &InteractionRequest) -> Result<InteractionResponse, AdapterError> {
            // Never responds in time; used to exercise the interaction-timeout race.
            std::future::pending().await
        }

        async fn render_output(&self, _result: &ExecutionResult, _manifest: &Manifest) {}
    }

    fn manifest() -> Manifest {
        Manifest::new("calc", "Calculator", serde_json::json!({"type": "object", "properties": {}}), Value::Null)
    }

    struct NoopFileStore;

    #[async_trait]
    impl FileHandleStore for NoopFileStore {
        async fn store(
            &self,
            _bytes: Vec<u8>,
            _options: pda_core::StoreOptions,
        ) -> Result<pda_core::FileRef, pda_core::FileStoreError> {
            unimplemented!("not exercised by these tests")
        }
        async fn retrieve(&self, _handle: &pda_core::FileHandle) -> Result<Option<Vec<u8>>, pda_core::FileStoreError> {
            Ok(None)
        }
        async fn delete(&self, _handle: &pda_core::FileHandle) -> Result<(), pda_core::FileStoreError> {
            Ok(())
        }
        async fn get_metadata(&self, _handle: &pda_core::FileHandle) -> Result<Option<pda_core::FileMetadata>, pda_core::FileStoreError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn happy_path_reaches_success_with_no_blocking_interactions() {
        let orch = Orchestrator::new();
        let mut events = orch.subscribe();
        let render_calls = Arc::new(AtomicUsize::new(0));
        let result = orch
            .run(
                &manifest(),
                Arc::new(EchoExecutor),
                Arc::new(NoOpAdapter { confirm_response: true, render_calls: render_calls.clone() }),
                Arc::new(NoopFileStore),
                Some(serde_json::json!({"a": 1})),
            )
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(orch.state().await, OrchestratorState::Success);
        assert_eq!(render_calls.load(Ordering::SeqCst), 1);

        let mut saw_complete = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, Event::Complete { .. }) {
                saw_complete = true;
            }
        }
        assert!(saw_complete);
    }

    #[tokio::test]
    async fn confirm_no_aborts_run_with_error() {
        let orch = Orchestrator::new();
        let render_calls = Arc::new(AtomicUsize::new(0));
        let result = orch
            .run(
                &manifest(),
                Arc::new(ConfirmThenFailExecutor),
                Arc::new(NoOpAdapter { confirm_response: false, render_calls: render_calls.clone() }),
                Arc::new(NoopFileStore),
                Some(serde_json::json!({})),
            )
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Operation cancelled by user"));
        assert_eq!(orch.state().await, OrchestratorState::Error);
    }

    #[tokio::test]
    async fn interaction_timeout_synthesizes_default_response() {
        let orch = Orchestrator::new();
        let result = orch
            .run(
                &manifest(),
                Arc::new(TimeoutPromptExecutor),
                Arc::new(SilentAdapter),
                Arc::new(NoopFileStore),
                Some(serde_json::json!({})),
            )
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.data, Some(Value::String("anon".into())));
    }

    #[tokio::test]
    async fn reset_is_rejected_from_a_non_terminal_state() {
        let orch = Orchestrator::new();
        let err = orch.reset().await.unwrap_err();
        assert!(matches!(err, OrchError::ResetFromNonTerminal(OrchestratorState::Idle)));
    }

    #[tokio::test]
    async fn run_twice_in_a_row_without_reset_fails_the_precondition() {
        let orch = Orchestrator::new();
        let render_calls = Arc::new(AtomicUsize::new(0));
        orch.run(
            &manifest(),
            Arc::new(EchoExecutor),
            Arc::new(NoOpAdapter { confirm_response: true, render_calls: render_calls.clone() }),
            Arc::new(NoopFileStore),
            Some(Value::Null),
        )
        .await
        .unwrap();
        // Orchestrator is now in SUCCESS, not IDLE.
        let err = orch
            .run(
                &manifest(),
                Arc::new(EchoExecutor),
                Arc::new(NoOpAdapter { confirm_response: true, render_calls }),
                Arc::new(NoopFileStore),
                Some(Value::Null),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OrchError::IllegalTransition { from: OrchestratorState::Success, to: OrchestratorState::PreFlight }));
    }

    #[tokio::test]
    async fn adapter_observes_every_state_transition() {
        let orch = Orchestrator::new();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        orch.run(
            &manifest(),
            Arc::new(EchoExecutor),
            Arc::new(ObservingAdapter { seen: seen.clone() }),
            Arc::new(NoopFileStore),
            Some(serde_json::json!({})),
        )
        .await
        .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (OrchestratorState::Idle, OrchestratorState::PreFlight),
                (OrchestratorState::PreFlight, OrchestratorState::Running),
                (OrchestratorState::Running, OrchestratorState::Success),
            ]
        );
    }
}
