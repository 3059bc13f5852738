//! Google Gemini interceptor
//!
//! Requests carry `model`, `contents` (role + `parts` arrays, assistant role
//! spelled `model`) and an optional `system_instruction`. Streamed chunks
//! are partial `candidates` whose text parts accumulate into the final
//! response.

use serde_json::{json, Value};

use super::{Interceptor, Provider, TurnMessage};

/// Interceptor for Gemini generateContent-style clients
#[derive(Debug, Default)]
pub struct GeminiInterceptor;

impl GeminiInterceptor {
    pub fn new() -> Self {
        Self
    }
}

fn normalize_role(role: &str) -> &str {
    match role {
        "model" => "assistant",
        other => other,
    }
}

impl Interceptor for GeminiInterceptor {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    fn extract_model(&self, request: &Value) -> String {
        request["model"].as_str().unwrap_or_default().to_string()
    }

    fn extract_request_messages(&self, request: &Value) -> Vec<TurnMessage> {
        let mut messages = Vec::new();

        if let Some(system) = request.get("system_instruction") {
            if !system.is_null() {
                messages.push(TurnMessage::new("system", system["parts"].clone()));
            }
        }

        if let Some(contents) = request["contents"].as_array() {
            for content in contents {
                let role = normalize_role(content["role"].as_str().unwrap_or("user"));
                messages.push(TurnMessage::new(role, content["parts"].clone()));
            }
        }

        messages
    }

    fn merge_stream_chunks(&self, chunks: &[Value]) -> Value {
        let mut text = String::new();
        let mut model_version = Value::Null;
        let mut finish_reason = Value::Null;

        for chunk in chunks {
            if model_version.is_null() && !chunk["modelVersion"].is_null() {
                model_version = chunk["modelVersion"].clone();
            }

            let Some(candidate) = chunk["candidates"].get(0) else {
                continue;
            };
            if let Some(parts) = candidate["content"]["parts"].as_array() {
                for part in parts {
                    if let Some(fragment) = part["text"].as_str() {
                        text.push_str(fragment);
                    }
                }
            }
            if !candidate["finishReason"].is_null() {
                finish_reason = candidate["finishReason"].clone();
            }
        }

        let mut merged = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": finish_reason,
            }],
        });
        if !model_version.is_null() {
            merged["modelVersion"] = model_version;
        }
        merged
    }

    fn inject_memory(&self, request: &mut Value, memory: &str) {
        match request.get_mut("system_instruction") {
            Some(system) if !system.is_null() => {
                if let Some(parts) = system["parts"].as_array_mut() {
                    parts.insert(0, json!({"text": memory}));
                }
            }
            _ => {
                request["system_instruction"] = json!({"parts": [{"text": memory}]});
            }
        }
    }
}
