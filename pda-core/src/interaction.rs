//! Typed request/response messages exchanged between executor and adapter.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::duration::DurationMs;
use crate::id::RequestId;

/// The shape of an interaction, determining whether it suspends the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionType {
    Confirm,
    Prompt,
    Select,
    Multiselect,
    Form,
    Progress,
    Info,
    Workflow,
}

impl InteractionType {
    /// `progress`/`info` never require a response and never suspend the executor.
    pub fn requires_response_by_default(self) -> bool {
        !matches!(self, InteractionType::Progress | InteractionType::Info)
    }
}

/// A request yielded by the executor, routed through the orchestrator to the adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRequest {
    /// Fresh, unique within the run.
    pub request_id: RequestId,
    #[serde(rename = "type")]
    pub interaction_type: InteractionType,
    pub message: String,
    pub data: Option<Value>,
    pub requires_response: bool,
    pub timeout: Option<DurationMs>,
    pub default_value: Option<Value>,
}

impl InteractionRequest {
    /// Build a request, deriving `requiresResponse` from the interaction type
    /// unless a blocking type is explicitly told not to require one.
    pub fn new(interaction_type: InteractionType, message: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::fresh(),
            requires_response: interaction_type.requires_response_by_default(),
            interaction_type,
            message: message.into(),
            data: None,
            timeout: None,
            default_value: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_timeout(mut self, timeout: DurationMs) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_default_value(mut self, default_value: Value) -> Self {
        self.default_value = Some(default_value);
        self
    }
}

/// A reply to some outstanding `InteractionRequest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionResponse {
    /// Must match the id of the request being answered.
    pub request_id: RequestId,
    pub value: Value,
    /// Set when this response was synthesized after an interaction timeout.
    pub skipped: Option<bool>,
}

impl InteractionResponse {
    pub fn new(request_id: RequestId, value: Value) -> Self {
        Self {
            request_id,
            value,
            skipped: None,
        }
    }

    /// Build the synthesized response delivered when an interaction timeout wins its race.
    pub fn skipped(request_id: RequestId, default_value: Value) -> Self {
        Self {
            request_id,
            value: default_value,
            skipped: Some(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_and_info_never_require_response() {
        assert!(!InteractionType::Progress.requires_response_by_default());
        assert!(!InteractionType::Info.requires_response_by_default());
        assert!(InteractionType::Confirm.requires_response_by_default());
        assert!(InteractionType::Prompt.requires_response_by_default());
    }
}
