use crate::services::dispatcher::{Payload, RequestOutcome};
use serde_json::Value;

/// Human-readable text for an outcome, as shown in the `content` block.
pub fn render_outcome_text(outcome: &RequestOutcome) -> String {
    match outcome {
        RequestOutcome::Success(Payload::Json(value)) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        RequestOutcome::Success(Payload::NoContent) => Payload::NoContent
            .to_value()
            .as_str()
            .unwrap_or_default()
            .to_string(),
        RequestOutcome::HttpError { status, body } => {
            format!("HTTP error: {} - {}", status, body)
        }
        RequestOutcome::TransportError { message } => format!("Error: {}", message),
    }
}

/// `tools/call` result. Backend failures stay tool results with
/// `isError: true` rather than JSON-RPC errors.
pub fn build_tool_result(outcome: &RequestOutcome) -> Value {
    serde_json::json!({
        "content": [
            {
                "type": "text",
                "text": render_outcome_text(outcome),
            }
        ],
        "structuredContent": outcome.to_value(),
        "isError": !outcome.is_success(),
    })
}
