//! Claude agent-client interceptor
//!
//! For prompt-style clients where each request carries a single `prompt`
//! string rather than a full message array. Streamed chunks are agent
//! messages; assistant content blocks accumulate into the captured response.
//!
//! Because the request holds only the newest prompt, sessions can stage the
//! user turn in the pending-message slot so it lands together with the
//! assistant response (see [`SessionConfig::buffer_user_message`]).
//!
//! [`SessionConfig::buffer_user_message`]: crate::session::SessionConfig::buffer_user_message

use serde_json::{json, Value};

use super::{Interceptor, Provider, TurnMessage};

/// Interceptor for prompt-style Claude agent clients
#[derive(Debug, Default)]
pub struct ClaudeInterceptor;

impl ClaudeInterceptor {
    pub fn new() -> Self {
        Self
    }
}

impl Interceptor for ClaudeInterceptor {
    fn provider(&self) -> Provider {
        Provider::Claude
    }

    fn extract_model(&self, request: &Value) -> String {
        request["model"]
            .as_str()
            .or_else(|| request["options"]["model"].as_str())
            .unwrap_or_default()
            .to_string()
    }

    fn extract_request_messages(&self, request: &Value) -> Vec<TurnMessage> {
        match request["prompt"].as_str() {
            Some(prompt) => vec![TurnMessage::user(prompt)],
            None => Vec::new(),
        }
    }

    fn merge_stream_chunks(&self, chunks: &[Value]) -> Value {
        let mut text = String::new();
        let mut model = Value::Null;

        for chunk in chunks {
            if chunk["type"] != "assistant" {
                continue;
            }
            let message = &chunk["message"];
            if model.is_null() && !message["model"].is_null() {
                model = message["model"].clone();
            }
            if let Some(blocks) = message["content"].as_array() {
                for block in blocks {
                    if let Some(fragment) = block["text"].as_str() {
                        text.push_str(fragment);
                    }
                }
            }
        }

        let mut merged = json!({
            "role": "assistant",
            "content": [{"type": "text", "text": text}],
        });
        if !model.is_null() {
            merged["model"] = model;
        }
        merged
    }

    fn inject_memory(&self, request: &mut Value, memory: &str) {
        if let Some(prompt) = request["prompt"].as_str() {
            request["prompt"] = Value::String(format!(
                "<memory>\n{}\n</memory>\n\n{}",
                memory, prompt
            ));
        }
    }
}
