//! Provider interceptors
//!
//! One interceptor per supported provider. An interceptor knows how to read
//! that provider's native request/response JSON: which fields hold the
//! conversation, how to fold a stream of chunks back into a full response,
//! and where memory text can be spliced into an outgoing request.
//!
//! Interceptors never talk to the network themselves. The capturing client
//! wrappers (see [`wrapped`]) drive them, and the persistence pipeline
//! receives whatever they extract.

pub mod anthropic;
pub mod claude;
pub mod gemini;
pub mod openai;
pub mod registry;
pub mod wrapped;

pub use anthropic::AnthropicInterceptor;
pub use claude::ClaudeInterceptor;
pub use gemini::GeminiInterceptor;
pub use openai::OpenAiInterceptor;
pub use registry::{InstallReport, InterceptorRegistry};
pub use wrapped::{
    BlockingCapturingClient, BlockingChunkStream, BlockingMemoryRecall, BlockingProviderClient,
    CapturingClient, ChunkStream, MemoryRecall, NoMemoryRecall, ProviderClient,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google Gemini (generateContent-style calls)
    Gemini,
    /// Claude agent clients (prompt-style calls)
    Claude,
    /// Anthropic Messages API
    Anthropic,
    /// OpenAI chat completions
    OpenAi,
}

impl Provider {
    /// Wire name of the provider, as sent to the remote service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Claude => "claude",
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role/content record extracted from a provider request.
///
/// `content` is kept as opaque JSON: a plain string for simple messages, or
/// the provider's own block structure (tool results, parts, etc.).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnMessage {
    /// Role of the message sender ("user", "assistant", "system")
    pub role: String,

    /// Message content, provider shape preserved
    pub content: Value,
}

impl TurnMessage {
    /// Create a message with an arbitrary role and JSON content
    pub fn new(role: impl Into<String>, content: Value) -> Self {
        Self {
            role: role.into(),
            content,
        }
    }

    /// Create a simple user message with text content
    pub fn user(text: impl Into<String>) -> Self {
        Self::new("user", Value::String(text.into()))
    }

    /// Create a simple assistant message with text content
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new("assistant", Value::String(text.into()))
    }
}

/// One request/response exchange, the unit of persistence.
///
/// Owned by the persistence pipeline for the duration of a single attempt;
/// never retained afterward.
#[derive(Debug, Clone, Serialize)]
pub struct CapturedTurn {
    /// Which provider produced the exchange
    pub provider: Provider,

    /// Model identifier taken from the request
    pub model: String,

    /// Ordered request messages
    pub request_messages: Vec<TurnMessage>,

    /// Normalized response payload, provider shape preserved
    pub response_dict: Value,
}

/// Per-provider extraction contract.
///
/// Implementations must be pure over their inputs: no network, no session
/// access. All methods take provider-native JSON; a request the interceptor
/// does not recognize should degrade to empty extractions rather than panic.
pub trait Interceptor: Send + Sync {
    /// Which provider this interceptor handles
    fn provider(&self) -> Provider;

    /// Check whether this provider can be intercepted in the current
    /// environment.
    ///
    /// `Ok(false)` means "silently skip at install time" (the provider is not
    /// in use here); an `Err` is an installation failure that is isolated to
    /// this provider.
    fn probe(&self) -> anyhow::Result<bool> {
        Ok(true)
    }

    /// Model identifier from a provider-native request
    fn extract_model(&self, request: &Value) -> String;

    /// Ordered role/content records from a provider-native request
    fn extract_request_messages(&self, request: &Value) -> Vec<TurnMessage>;

    /// Normalized response payload for a non-streaming call.
    ///
    /// The default preserves the provider response as-is.
    fn normalize_response(&self, response: &Value) -> Value {
        response.clone()
    }

    /// Fold an ordered chunk sequence into a response payload equivalent in
    /// shape to the non-streaming response.
    fn merge_stream_chunks(&self, chunks: &[Value]) -> Value;

    /// Splice recalled memory text into an outgoing request.
    ///
    /// Must not change the request's call signature; providers put the text
    /// wherever their wire format keeps ambient context (system slot, first
    /// user message, prompt prefix).
    fn inject_memory(&self, request: &mut Value, memory: &str);
}
