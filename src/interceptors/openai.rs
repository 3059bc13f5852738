//! OpenAI chat completions interceptor
//!
//! Requests carry `model` and a `messages` array with role/content entries.
//! Streamed responses are `chat.completion.chunk` objects whose
//! `choices[0].delta` fragments accumulate into the final assistant message.

use serde_json::{json, Value};

use super::{Interceptor, Provider, TurnMessage};

/// Interceptor for OpenAI-style chat completion clients
#[derive(Debug, Default)]
pub struct OpenAiInterceptor;

impl OpenAiInterceptor {
    pub fn new() -> Self {
        Self
    }
}

impl Interceptor for OpenAiInterceptor {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    fn extract_model(&self, request: &Value) -> String {
        request["model"].as_str().unwrap_or_default().to_string()
    }

    fn extract_request_messages(&self, request: &Value) -> Vec<TurnMessage> {
        let Some(items) = request["messages"].as_array() else {
            return Vec::new();
        };
        items
            .iter()
            .map(|item| {
                let role = item["role"].as_str().unwrap_or("user").to_string();
                TurnMessage::new(role, item["content"].clone())
            })
            .collect()
    }

    fn merge_stream_chunks(&self, chunks: &[Value]) -> Value {
        let mut id = String::new();
        let mut model = String::new();
        let mut role = "assistant".to_string();
        let mut content = String::new();
        let mut finish_reason = Value::Null;

        for chunk in chunks {
            if id.is_empty() {
                id = chunk["id"].as_str().unwrap_or_default().to_string();
            }
            if model.is_empty() {
                model = chunk["model"].as_str().unwrap_or_default().to_string();
            }

            let Some(choice) = chunk["choices"].get(0) else {
                continue;
            };
            if let Some(delta_role) = choice["delta"]["role"].as_str() {
                role = delta_role.to_string();
            }
            if let Some(delta) = choice["delta"]["content"].as_str() {
                content.push_str(delta);
            }
            if !choice["finish_reason"].is_null() {
                finish_reason = choice["finish_reason"].clone();
            }
        }

        json!({
            "id": id,
            "object": "chat.completion",
            "model": model,
            "choices": [{
                "index": 0,
                "message": {"role": role, "content": content},
                "finish_reason": finish_reason,
            }],
        })
    }

    fn inject_memory(&self, request: &mut Value, memory: &str) {
        let Some(messages) = request["messages"].as_array_mut() else {
            return;
        };

        // Fold into an existing leading system message, otherwise add one.
        if let Some(first) = messages.first_mut() {
            if first["role"] == "system" {
                if let Some(existing) = first["content"].as_str() {
                    first["content"] = Value::String(format!("{}\n\n{}", memory, existing));
                    return;
                }
            }
        }
        messages.insert(0, json!({"role": "system", "content": memory}));
    }
}
