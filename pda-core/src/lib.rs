//! # pda-core — Protocol traits for Protocol-Driven Applications
//!
//! A PDA (Protocol-Driven Application) is an app described by a
//! [`manifest::Manifest`] (identity + input/output schemas) and an
//! [`executor::Executor`] that produces a lazy sequence of interaction
//! requests interleaved with effectful work. An [`orchestrator`] state
//! machine drives the executor, mediates interaction with a pluggable
//! [`adapter::Adapter`] (CLI, MCP, GUI), and exposes uniform lifecycle,
//! cancellation, and failure semantics across surfaces.
//!
//! This crate defines the shared protocol types only; the concrete
//! orchestrator driver lives in `pda-runtime`, reference file stores in
//! `pda-store-memory`/`pda-store-fs`, reference adapters in
//! `pda-adapter-cli`/`pda-adapter-mcp`.
//!
//! ## Dependency notes
//!
//! Interaction data, execution results, and portable schemas all carry
//! `serde_json::Value` payloads rather than a generic `T: Serialize`. JSON
//! is the universal interchange format at every boundary this crate
//! describes (wire protocols, CLI flags, MCP tool calls), and a concrete
//! `Value` keeps the adapter and executor traits object-safe.

#![warn(missing_docs)]

pub mod adapter;
pub mod duration;
pub mod error;
pub mod events;
pub mod executor;
pub mod file_store;
pub mod id;
pub mod interaction;
pub mod kv_store;
pub mod manifest;
pub mod orchestrator;
pub mod result;
pub mod schema;

pub use adapter::Adapter;
pub use duration::DurationMs;
pub use error::{AdapterError, ExecutorError, FileStoreError, OrchError, SchemaError, ValidationError};
pub use events::{Event, EventBus, InfoLevel};
pub use executor::{ExecutionContext, Executor, ExecutorMessage};
pub use file_store::{FileHandleStore, FileMetadata, StoreOptions};
pub use id::{FileHandle, RequestId, VendorId};
pub use interaction::{InteractionRequest, InteractionResponse, InteractionType};
pub use kv_store::KeyValueStore;
pub use manifest::Manifest;
pub use orchestrator::{validate_transition, OrchestratorState};
pub use result::{ExecutionResult, FileRef};
pub use schema::{derive_fields, to_portable_schema, validate_input, FieldDescriptor, FieldType, UiHints};
