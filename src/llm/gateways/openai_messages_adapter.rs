//! Conversion between crewlab messages and the OpenAI chat wire format.

use crate::llm::models::{LlmMessage, LlmToolCall, MessageRole};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::warn;

/// Adapt LLM messages to OpenAI format.
pub fn adapt_messages_to_openai(messages: &[LlmMessage]) -> Vec<Value> {
    messages.iter().map(adapt_message).collect()
}

fn adapt_message(msg: &LlmMessage) -> Value {
    let content = msg.content.as_deref().unwrap_or("");

    match msg.role {
        MessageRole::System => json!({"role": "system", "content": content}),
        MessageRole::User => json!({"role": "user", "content": content}),
        MessageRole::Assistant => {
            let mut assistant_msg = json!({"role": "assistant"});

            if let Some(ref content) = msg.content {
                assistant_msg["content"] = json!(content);
            }

            if let Some(ref tool_calls) = msg.tool_calls {
                let formatted_calls: Vec<Value> = tool_calls.iter().map(format_tool_call).collect();
                assistant_msg["tool_calls"] = json!(formatted_calls);
            }

            assistant_msg
        }
        MessageRole::Tool => json!({
            "role": "tool",
            "content": content,
            "tool_call_id": msg.tool_call_id.as_deref().unwrap_or("")
        }),
    }
}

fn format_tool_call(tc: &LlmToolCall) -> Value {
    json!({
        "id": tc.id.as_deref().unwrap_or(""),
        "type": "function",
        "function": {
            "name": tc.name,
            "arguments": serde_json::to_string(&tc.arguments).unwrap_or_else(|_| "{}".to_string())
        }
    })
}

/// Convert tool calls from OpenAI format to internal format.
///
/// Some providers return the arguments already decoded as an object rather than a JSON
/// string; both shapes are accepted.
pub fn convert_tool_calls(tool_calls: &[Value]) -> Vec<LlmToolCall> {
    tool_calls
        .iter()
        .filter_map(|tc| {
            let id = tc["id"].as_str().map(String::from);
            let name = tc["function"]["name"].as_str()?.to_string();

            let arguments: HashMap<String, Value> = match &tc["function"]["arguments"] {
                Value::String(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
                    warn!(tool = %name, error = %e, "Unparseable tool arguments");
                    HashMap::new()
                }),
                Value::Object(map) => map.clone().into_iter().collect(),
                _ => HashMap::new(),
            };

            Some(LlmToolCall {
                id,
                name,
                arguments,
            })
        })
        .collect()
}
