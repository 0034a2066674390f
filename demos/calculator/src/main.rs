//! Reference PDA app: a four-operation calculator.
//!
//! Exercises the happy path, a blocking `confirm` interaction for
//! division-by-zero, and runs entirely through the CLI adapter:
//!
//! ```sh
//! cargo run -p calculator -- --a=10 --b=5 --op=add
//! cargo run -p calculator -- --a=10 --b=0 --op=div
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use pda_core::{DurationMs, ExecutionContext, Executor, ExecutorError, Manifest};
use pda_store_memory::MemoryFileStore;

struct Calculator;

#[async_trait]
impl Executor for Calculator {
    async fn run(&self, ctx: ExecutionContext, input: serde_json::Value) -> Result<serde_json::Value, ExecutorError> {
        let a = input["a"].as_f64().ok_or_else(|| ExecutorError::Failed("missing field a".into()))?;
        let b = input["b"].as_f64().ok_or_else(|| ExecutorError::Failed("missing field b".into()))?;
        let op = input["op"].as_str().ok_or_else(|| ExecutorError::Failed("missing field op".into()))?;

        let result = match op {
            "add" => a + b,
            "sub" => a - b,
            "mul" => a * b,
            "div" => {
                if b == 0.0 {
                    let proceed = ctx
                        .confirm("Division by zero will produce an infinite result. Continue?", Some(DurationMs::from_secs(30)))
                        .await?;
                    if !proceed {
                        return Err(ExecutorError::Failed("Operation cancelled by user".into()));
                    }
                    a / b
                } else {
                    a / b
                }
            }
            other => return Err(ExecutorError::Failed(format!("unknown operation: {other}"))),
        };

        Ok(serde_json::json!(result))
    }
}

fn manifest() -> Manifest {
    Manifest::new(
        "calculator",
        "Calculator",
        serde_json::json!({
            "type": "object",
            "properties": {
                "a": {"type": "number", "description": "left operand"},
                "b": {"type": "number", "description": "right operand"},
                "op": {"type": "string", "enum": ["add", "sub", "mul", "div"], "description": "operation"},
            },
            "required": ["a", "b", "op"],
        }),
        serde_json::json!({"type": "number"}),
    )
    .with_description("adds, subtracts, multiplies, or divides two numbers")
    .with_version(env!("CARGO_PKG_VERSION"))
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let executor: Arc<dyn Executor> = Arc::new(Calculator);
    let file_store = Arc::new(MemoryFileStore::new());

    match pda_adapter_cli::run_cli(&manifest(), executor, file_store).await {
        Ok(result) if result.success => std::process::ExitCode::SUCCESS,
        Ok(_) => std::process::ExitCode::FAILURE,
        Err(e) => {
            eprintln!("orchestrator error: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pda_core::{InteractionResponse, InteractionType};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> (ExecutionContext, mpsc::Receiver<pda_core::ExecutorMessage>) {
        let (tx, rx) = mpsc::channel(16);
        (ExecutionContext::new(CancellationToken::new(), Arc::new(MemoryFileStore::new()), tx), rx)
    }

    #[tokio::test]
    async fn add_computes_sum() {
        let (ctx, _rx) = ctx();
        let out = Calculator.run(ctx, serde_json::json!({"a": 10, "b": 5, "op": "add"})).await.unwrap();
        assert_eq!(out, serde_json::json!(15.0));
    }

    #[tokio::test]
    async fn div_by_zero_confirm_no_cancels() {
        let (ctx, mut rx) = ctx();
        let run = tokio::spawn(Calculator.run(ctx, serde_json::json!({"a": 10, "b": 0, "op": "div"})));

        let msg = rx.recv().await.unwrap();
        match msg {
            pda_core::ExecutorMessage::Blocking { request, respond_to } => {
                assert_eq!(request.interaction_type, InteractionType::Confirm);
                respond_to.send(InteractionResponse::new(request.request_id, serde_json::json!(false))).unwrap();
            }
            _ => panic!("expected a blocking confirm request"),
        }

        let err = run.await.unwrap().unwrap_err();
        assert!(matches!(err, ExecutorError::Failed(msg) if msg == "Operation cancelled by user"));
    }

    #[tokio::test]
    async fn div_by_zero_confirm_yes_proceeds() {
        let (ctx, mut rx) = ctx();
        let run = tokio::spawn(Calculator.run(ctx, serde_json::json!({"a": 10, "b": 0, "op": "div"})));

        let msg = rx.recv().await.unwrap();
        match msg {
            pda_core::ExecutorMessage::Blocking { request, respond_to } => {
                respond_to.send(InteractionResponse::new(request.request_id, serde_json::json!(true))).unwrap();
            }
            _ => panic!("expected a blocking confirm request"),
        }

        let out = run.await.unwrap().unwrap();
        assert!(out.as_f64().unwrap().is_infinite());
    }

    #[test]
    fn manifest_declares_required_fields() {
        let m = manifest();
        assert_eq!(m.id, "calculator");
        let fields = pda_core::derive_fields(&m.input_schema).unwrap();
        assert_eq!(fields.len(), 3);
        assert!(fields.iter().all(|f| f.required));
    }
}
