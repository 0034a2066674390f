//! Translates blocking interactions into sampling round-trips with the
//! connected MCP client.

use async_trait::async_trait;
use pda_core::{
    Adapter, AdapterError, ExecutionResult, InteractionRequest, InteractionResponse,
    InteractionType, Manifest, OrchestratorState,
};
use rmcp::model::{Content, CreateMessageRequestParam, Role, SamplingMessage};
use rmcp::service::{Peer, RoleServer};
use serde_json::Value;

/// Adapter backing one MCP tool call. Holds the peer connection so blocking
/// interactions can be sampled back to the client mid-run.
pub struct McpAdapter {
    peer: Peer<RoleServer>,
}

impl McpAdapter {
    /// Build an adapter bound to a single tool call's peer connection.
    pub fn new(peer: Peer<RoleServer>) -> Self {
        Self { peer }
    }
}

/// Render an interaction request as a natural-language prompt for the model.
pub fn format_interaction_for_ai(request: &InteractionRequest) -> String {
    match request.interaction_type {
        InteractionType::Confirm => format!("{} (respond yes or no)", request.message),
        InteractionType::Prompt => request.message.clone(),
        InteractionType::Select | InteractionType::Multiselect => {
            let options = request
                .data
                .as_ref()
                .and_then(|d| d.get("options"))
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            if request.interaction_type == InteractionType::Multiselect {
                format!("{} Options: {options}. Reply with a comma-separated list.", request.message)
            } else {
                format!("{} Options: {options}.", request.message)
            }
        }
        _ => request.message.clone(),
    }
}

/// Parse a model's free-text reply back into the value shape the request expects.
pub fn parse_ai_response(request: &InteractionRequest, text: &str) -> Value {
    let trimmed = text.trim();
    match request.interaction_type {
        InteractionType::Confirm => {
            Value::Bool(trimmed.eq_ignore_ascii_case("yes") || trimmed.eq_ignore_ascii_case("y"))
        }
        InteractionType::Select => request
            .data
            .as_ref()
            .and_then(|d| d.get("options"))
            .and_then(Value::as_array)
            .and_then(|options| {
                options.iter().find(|opt| {
                    opt.as_str().map(|s| s.eq_ignore_ascii_case(trimmed)).unwrap_or(false)
                })
            })
            .cloned()
            .unwrap_or_else(|| Value::String(trimmed.to_string())),
        InteractionType::Multiselect => Value::Array(
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
        ),
        _ => Value::String(trimmed.to_string()),
    }
}

#[async_trait]
impl Adapter for McpAdapter {
    async fn collect_input(&self, _manifest: &Manifest) -> Result<Value, AdapterError> {
        Err(AdapterError::CollectInput(
            "the MCP adapter never collects input itself; the tool call's arguments are \
             always passed to Orchestrator::run directly"
                .to_string(),
        ))
    }

    async fn handle_interaction(&self, request: &InteractionRequest) -> Result<InteractionResponse, AdapterError> {
        let prompt = format_interaction_for_ai(request);
        let params = CreateMessageRequestParam {
            messages: vec![SamplingMessage {
                role: Role::User,
                content: Content::text(prompt),
            }],
            max_tokens: 512,
            ..Default::default()
        };

        let result = self
            .peer
            .create_message(params)
            .await
            .map_err(|e| AdapterError::HandleInteraction(e.to_string()))?;

        let text = result
            .content
            .as_text()
            .map(|t| t.text.clone())
            .unwrap_or_default();

        Ok(InteractionResponse::new(request.request_id.clone(), parse_ai_response(request, &text)))
    }

    async fn render_output(&self, _result: &ExecutionResult, _manifest: &Manifest) {
        // The MCP result is built directly from ExecutionResult by
        // `to_mcp_result` in `call_tool`; this adapter has nothing to render.
    }

    async fn on_state_change(&self, from: OrchestratorState, to: OrchestratorState) {
        tracing::debug!(?from, ?to, "mcp adapter observed state change");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pda_core::RequestId;
    use serde_json::json;

    #[test]
    fn format_confirm_asks_for_yes_or_no() {
        let request = InteractionRequest::new(InteractionType::Confirm, "Proceed?");
        assert!(format_interaction_for_ai(&request).contains("yes or no"));
    }

    #[test]
    fn parse_confirm_accepts_yes_variants() {
        let request = InteractionRequest::new(InteractionType::Confirm, "Proceed?");
        assert_eq!(parse_ai_response(&request, "Yes"), Value::Bool(true));
        assert_eq!(parse_ai_response(&request, "no"), Value::Bool(false));
    }

    #[test]
    fn parse_select_matches_option_case_insensitively() {
        let request = InteractionRequest::new(InteractionType::Select, "Pick one")
            .with_data(json!({"options": ["Add", "Subtract"]}));
        assert_eq!(parse_ai_response(&request, "add"), json!("Add"));
    }

    #[test]
    fn parse_multiselect_splits_comma_separated_reply() {
        let request = InteractionRequest::new(InteractionType::Multiselect, "Pick any")
            .with_data(json!({"options": ["a", "b", "c"]}));
        assert_eq!(parse_ai_response(&request, "a, c"), json!(["a", "c"]));
    }

    #[test]
    fn format_select_lists_options_from_the_options_object() {
        let request = InteractionRequest::new(InteractionType::Select, "Pick one")
            .with_data(json!({"options": ["Add", "Subtract"]}));
        let prompt = format_interaction_for_ai(&request);
        assert!(prompt.contains("Add, Subtract"));
    }

    #[test]
    fn request_id_survives_round_trip_construction() {
        let request = InteractionRequest::new(InteractionType::Prompt, "Name?");
        let response = InteractionResponse::new(request.request_id.clone(), json!("Ada"));
        assert_eq!(response.request_id, request.request_id);
        let _: RequestId = response.request_id;
    }
}
