//! Anthropic Messages API interceptor
//!
//! Requests carry `model`, optional `system`, and an ordered `messages`
//! array. Streaming responses are SSE events (`message_start`,
//! `content_block_delta`, `message_delta`, `message_stop`); merging folds the
//! text deltas back into a single-content-block message shaped like the
//! non-streaming response.

use serde_json::{json, Value};

use super::{Interceptor, Provider, TurnMessage};

/// Interceptor for the Anthropic Messages API
#[derive(Debug, Default)]
pub struct AnthropicInterceptor;

impl AnthropicInterceptor {
    pub fn new() -> Self {
        Self
    }
}

impl Interceptor for AnthropicInterceptor {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn extract_model(&self, request: &Value) -> String {
        request["model"].as_str().unwrap_or_default().to_string()
    }

    fn extract_request_messages(&self, request: &Value) -> Vec<TurnMessage> {
        let mut messages = Vec::new();

        // The system prompt is part of the conversation record even though
        // the wire format keeps it outside `messages`.
        if let Some(system) = request.get("system") {
            if !system.is_null() {
                messages.push(TurnMessage::new("system", system.clone()));
            }
        }

        if let Some(items) = request["messages"].as_array() {
            for item in items {
                let role = item["role"].as_str().unwrap_or("user").to_string();
                messages.push(TurnMessage::new(role, item["content"].clone()));
            }
        }

        messages
    }

    fn merge_stream_chunks(&self, chunks: &[Value]) -> Value {
        let mut id = String::new();
        let mut model = String::new();
        let mut text = String::new();
        let mut stop_reason = Value::Null;
        let mut usage = Value::Null;

        for chunk in chunks {
            match chunk["type"].as_str() {
                Some("message_start") => {
                    let message = &chunk["message"];
                    id = message["id"].as_str().unwrap_or_default().to_string();
                    model = message["model"].as_str().unwrap_or_default().to_string();
                }
                Some("content_block_delta") => {
                    if let Some(delta) = chunk["delta"]["text"].as_str() {
                        text.push_str(delta);
                    }
                }
                Some("message_delta") => {
                    if !chunk["delta"]["stop_reason"].is_null() {
                        stop_reason = chunk["delta"]["stop_reason"].clone();
                    }
                    if !chunk["usage"].is_null() {
                        usage = chunk["usage"].clone();
                    }
                }
                _ => {}
            }
        }

        let mut merged = json!({
            "id": id,
            "type": "message",
            "role": "assistant",
            "model": model,
            "content": [{"type": "text", "text": text}],
            "stop_reason": stop_reason,
        });
        if !usage.is_null() {
            merged["usage"] = usage;
        }
        merged
    }

    fn inject_memory(&self, request: &mut Value, memory: &str) {
        match request.get_mut("system") {
            Some(Value::String(system)) => {
                *system = format!("{}\n\n{}", memory, system);
            }
            Some(Value::Array(blocks)) => {
                blocks.insert(0, json!({"type": "text", "text": memory}));
            }
            _ => {
                request["system"] = Value::String(memory.to_string());
            }
        }
    }
}
