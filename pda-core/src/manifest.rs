//! Declarative app identity and schemas.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The declarative identity, schemas, and UI hints of a PDA. Immutable
/// for the lifetime of an app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Unique identifier, also used as the MCP tool name.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Human-readable description; also the MCP tool description.
    pub description: Option<String>,
    /// App version, free-form.
    pub version: Option<String>,
    /// The raw input schema passed to `deriveFields`/`toPortableSchema`.
    pub input_schema: Value,
    /// The raw output schema, informational only (not validated against).
    pub output_schema: Value,
    /// Top-level UI hints not attached to any single field.
    pub ui_hints: Option<Value>,
}

impl Manifest {
    /// Start building a manifest with the required identity fields.
    pub fn new(id: impl Into<String>, name: impl Into<String>, input_schema: Value, output_schema: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            version: None,
            input_schema,
            output_schema,
            ui_hints: None,
        }
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach a version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}
