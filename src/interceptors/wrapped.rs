//! Capturing client wrappers
//!
//! [`CapturingClient`] decorates a provider client: every call is delegated
//! to the wrapped client unchanged, and when a session is active the request
//! and response are also handed to the persistence pipeline. With no active
//! session, or while the provider's interceptor is uninstalled, the wrapper
//! is a pure pass-through.
//!
//! Capture never alters the caller's view: the response (or error) the
//! wrapped client produces is exactly what the caller receives, and a
//! failing capture is swallowed by the pipeline.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::Stream;
use serde_json::Value;

use super::{CapturedTurn, Interceptor, Provider, TurnMessage};
use crate::capture::{
    BlockingPipelineSink, CaptureIter, CaptureSink, CaptureStream, ChunkCallback, PipelineSink,
};
use crate::core::RecallResult;
use crate::session::{self, SessionConfig};

/// Boxed chunk stream returned by async streaming calls
pub type ChunkStream = Pin<Box<dyn Stream<Item = RecallResult<Value>> + Send>>;

/// Boxed chunk iterator returned by blocking streaming calls
pub type BlockingChunkStream = Box<dyn Iterator<Item = RecallResult<Value>> + Send>;

/// Async provider client surface the wrapper decorates.
///
/// Requests and responses are provider-native JSON; adapters over concrete
/// SDK clients implement this to opt into capture.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Issue a non-streaming call
    async fn create(&self, request: Value) -> RecallResult<Value>;

    /// Issue a streaming call, yielding provider-native chunks
    async fn create_stream(&self, request: Value) -> RecallResult<ChunkStream>;
}

/// Blocking mirror of [`ProviderClient`]
pub trait BlockingProviderClient: Send + Sync {
    /// Issue a non-streaming call
    fn create(&self, request: Value) -> RecallResult<Value>;

    /// Issue a streaming call, yielding provider-native chunks
    fn create_stream(&self, request: Value) -> RecallResult<BlockingChunkStream>;
}

/// Source of stored memory for prompt augmentation.
///
/// A recall failure must never fail the provider call; the wrapper logs it
/// and sends the request unaugmented.
#[async_trait]
pub trait MemoryRecall: Send + Sync {
    /// Fetch memory text for the named agent, if any exists
    async fn recall(&self, agent_name: &str) -> anyhow::Result<Option<String>>;
}

/// Blocking mirror of [`MemoryRecall`]
pub trait BlockingMemoryRecall: Send + Sync {
    /// Fetch memory text for the named agent, if any exists
    fn recall(&self, agent_name: &str) -> anyhow::Result<Option<String>>;
}

/// Default recall source: never injects anything
pub struct NoMemoryRecall;

#[async_trait]
impl MemoryRecall for NoMemoryRecall {
    async fn recall(&self, _agent_name: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}

impl BlockingMemoryRecall for NoMemoryRecall {
    fn recall(&self, _agent_name: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Async wrapper
// ---------------------------------------------------------------------------

/// Capturing decorator around an async provider client.
///
/// Built through [`InterceptorRegistry::wrap`]; shares the registry's
/// installed flag so uninstalling reverts this client to pure delegation.
///
/// [`InterceptorRegistry::wrap`]: super::InterceptorRegistry::wrap
pub struct CapturingClient {
    inner: Arc<dyn ProviderClient>,
    interceptor: Arc<dyn Interceptor>,
    installed: Arc<AtomicBool>,
    sink: Arc<dyn CaptureSink>,
    recall: Arc<dyn MemoryRecall>,
}

impl CapturingClient {
    pub(crate) fn new(
        inner: Arc<dyn ProviderClient>,
        interceptor: Arc<dyn Interceptor>,
        installed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            inner,
            interceptor,
            installed,
            sink: Arc::new(PipelineSink),
            recall: Arc::new(NoMemoryRecall),
        }
    }

    /// Replace the persistence sink
    pub fn with_sink(mut self, sink: Arc<dyn CaptureSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Use a memory source for prompt augmentation
    pub fn with_memory_recall(mut self, recall: Arc<dyn MemoryRecall>) -> Self {
        self.recall = recall;
        self
    }

    /// Provider this client talks to
    pub fn provider(&self) -> Provider {
        self.interceptor.provider()
    }

    fn active_session(&self) -> Option<Arc<SessionConfig>> {
        if !self.installed.load(Ordering::Relaxed) {
            return None;
        }
        session::current()
    }

    async fn augment(&self, config: &SessionConfig, request: &mut Value) {
        if config.capture_only {
            return;
        }
        match self.recall.recall(&config.agent_name).await {
            Ok(Some(memory)) => self.interceptor.inject_memory(request, &memory),
            Ok(None) => {}
            Err(err) => {
                tracing::debug!(
                    agent = %config.agent_name,
                    error = %err,
                    "memory recall failed; sending request unaugmented"
                );
            }
        }
    }

    /// Extract what must survive the call before the request is consumed.
    fn snapshot_request(&self, request: &Value) -> (String, Vec<TurnMessage>) {
        let model = self.interceptor.extract_model(request);
        let messages = self.interceptor.extract_request_messages(request);
        (model, messages)
    }
}

/// Consume the staged user message into the front of the turn.
///
/// Called only once a turn is actually being submitted, so a provider error
/// leaves the staged message in place for the retry.
fn prepend_pending(config: &SessionConfig, messages: &mut Vec<TurnMessage>) {
    if let Some(pending) = config.take_pending_user_message() {
        messages.insert(0, pending);
    }
}

#[async_trait]
impl ProviderClient for CapturingClient {
    async fn create(&self, request: Value) -> RecallResult<Value> {
        let Some(config) = self.active_session() else {
            return self.inner.create(request).await;
        };

        let mut request = request;
        self.augment(&config, &mut request).await;
        let (model, mut request_messages) = self.snapshot_request(&request);

        // Provider errors propagate untouched; nothing is captured for them.
        let response = self.inner.create(request).await?;

        prepend_pending(&config, &mut request_messages);
        let turn = CapturedTurn {
            provider: self.interceptor.provider(),
            model,
            request_messages,
            response_dict: self.interceptor.normalize_response(&response),
        };
        self.sink.submit(config, turn);

        Ok(response)
    }

    async fn create_stream(&self, request: Value) -> RecallResult<ChunkStream> {
        let Some(config) = self.active_session() else {
            return self.inner.create_stream(request).await;
        };

        let mut request = request;
        self.augment(&config, &mut request).await;
        let (model, request_messages) = self.snapshot_request(&request);

        let stream = self.inner.create_stream(request).await?;

        let interceptor = self.interceptor.clone();
        let sink = self.sink.clone();
        let provider = interceptor.provider();
        let callback: ChunkCallback = Box::new(move |chunks| {
            let mut request_messages = request_messages;
            prepend_pending(&config, &mut request_messages);
            let turn = CapturedTurn {
                provider,
                model,
                request_messages,
                response_dict: interceptor.merge_stream_chunks(&chunks),
            };
            sink.submit(config, turn);
        });

        Ok(Box::pin(CaptureStream::new(stream, callback)))
    }
}

// ---------------------------------------------------------------------------
// Blocking wrapper
// ---------------------------------------------------------------------------

/// Capturing decorator around a blocking provider client.
pub struct BlockingCapturingClient {
    inner: Arc<dyn BlockingProviderClient>,
    interceptor: Arc<dyn Interceptor>,
    installed: Arc<AtomicBool>,
    sink: Arc<dyn CaptureSink>,
    recall: Arc<dyn BlockingMemoryRecall>,
}

impl BlockingCapturingClient {
    pub(crate) fn new(
        inner: Arc<dyn BlockingProviderClient>,
        interceptor: Arc<dyn Interceptor>,
        installed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            inner,
            interceptor,
            installed,
            sink: Arc::new(BlockingPipelineSink),
            recall: Arc::new(NoMemoryRecall),
        }
    }

    /// Replace the persistence sink
    pub fn with_sink(mut self, sink: Arc<dyn CaptureSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Use a memory source for prompt augmentation
    pub fn with_memory_recall(mut self, recall: Arc<dyn BlockingMemoryRecall>) -> Self {
        self.recall = recall;
        self
    }

    /// Provider this client talks to
    pub fn provider(&self) -> Provider {
        self.interceptor.provider()
    }

    fn active_session(&self) -> Option<Arc<SessionConfig>> {
        if !self.installed.load(Ordering::Relaxed) {
            return None;
        }
        session::current()
    }

    fn augment(&self, config: &SessionConfig, request: &mut Value) {
        if config.capture_only {
            return;
        }
        match self.recall.recall(&config.agent_name) {
            Ok(Some(memory)) => self.interceptor.inject_memory(request, &memory),
            Ok(None) => {}
            Err(err) => {
                tracing::debug!(
                    agent = %config.agent_name,
                    error = %err,
                    "memory recall failed; sending request unaugmented"
                );
            }
        }
    }

    fn snapshot_request(&self, request: &Value) -> (String, Vec<TurnMessage>) {
        let model = self.interceptor.extract_model(request);
        let messages = self.interceptor.extract_request_messages(request);
        (model, messages)
    }
}

impl BlockingProviderClient for BlockingCapturingClient {
    fn create(&self, request: Value) -> RecallResult<Value> {
        let Some(config) = self.active_session() else {
            return self.inner.create(request);
        };

        let mut request = request;
        self.augment(&config, &mut request);
        let (model, mut request_messages) = self.snapshot_request(&request);

        let response = self.inner.create(request)?;

        prepend_pending(&config, &mut request_messages);
        let turn = CapturedTurn {
            provider: self.interceptor.provider(),
            model,
            request_messages,
            response_dict: self.interceptor.normalize_response(&response),
        };
        self.sink.submit(config, turn);

        Ok(response)
    }

    fn create_stream(&self, request: Value) -> RecallResult<BlockingChunkStream> {
        let Some(config) = self.active_session() else {
            return self.inner.create_stream(request);
        };

        let mut request = request;
        self.augment(&config, &mut request);
        let (model, request_messages) = self.snapshot_request(&request);

        let iter = self.inner.create_stream(request)?;

        let interceptor = self.interceptor.clone();
        let sink = self.sink.clone();
        let provider = interceptor.provider();
        let callback: ChunkCallback = Box::new(move |chunks| {
            let mut request_messages = request_messages;
            prepend_pending(&config, &mut request_messages);
            let turn = CapturedTurn {
                provider,
                model,
                request_messages,
                response_dict: interceptor.merge_stream_chunks(&chunks),
            };
            sink.submit(config, turn);
        });

        Ok(Box::new(CaptureIter::new(iter, callback)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::AsyncRecallClient;
    use crate::core::RecallError;
    use crate::interceptors::{AnthropicInterceptor, OpenAiInterceptor};
    use crate::session::ServiceHandle;
    use futures::StreamExt;
    use serde_json::json;
    use std::sync::Mutex;

    // -- test doubles -------------------------------------------------------

    struct MockClient {
        requests: Mutex<Vec<Value>>,
        response: Value,
        chunks: Vec<RecallResult<Value>>,
        fail: bool,
    }

    impl MockClient {
        fn returning(response: Value) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                response,
                chunks: Vec::new(),
                fail: false,
            }
        }

        fn streaming(chunks: Vec<RecallResult<Value>>) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                response: Value::Null,
                chunks,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                response: Value::Null,
                chunks: Vec::new(),
                fail: true,
            }
        }

        fn seen_requests(&self) -> Vec<Value> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProviderClient for MockClient {
        async fn create(&self, request: Value) -> RecallResult<Value> {
            self.requests.lock().unwrap().push(request);
            if self.fail {
                return Err(RecallError::Other("provider unavailable".into()));
            }
            Ok(self.response.clone())
        }

        async fn create_stream(&self, request: Value) -> RecallResult<ChunkStream> {
            self.requests.lock().unwrap().push(request);
            if self.fail {
                return Err(RecallError::Other("provider unavailable".into()));
            }
            let chunks: Vec<RecallResult<Value>> = self
                .chunks
                .iter()
                .map(|c| match c {
                    Ok(v) => Ok(v.clone()),
                    Err(_) => Err(RecallError::Stream("reset".into())),
                })
                .collect();
            Ok(Box::pin(futures::stream::iter(chunks)))
        }
    }

    impl BlockingProviderClient for MockClient {
        fn create(&self, request: Value) -> RecallResult<Value> {
            self.requests.lock().unwrap().push(request);
            if self.fail {
                return Err(RecallError::Other("provider unavailable".into()));
            }
            Ok(self.response.clone())
        }

        fn create_stream(&self, request: Value) -> RecallResult<BlockingChunkStream> {
            self.requests.lock().unwrap().push(request);
            let chunks: Vec<RecallResult<Value>> = self
                .chunks
                .iter()
                .map(|c| match c {
                    Ok(v) => Ok(v.clone()),
                    Err(_) => Err(RecallError::Stream("reset".into())),
                })
                .collect();
            Ok(Box::new(chunks.into_iter()))
        }
    }

    #[derive(Default)]
    struct SpySink {
        turns: Mutex<Vec<(String, CapturedTurn)>>,
    }

    impl SpySink {
        fn captured(&self) -> Vec<(String, CapturedTurn)> {
            self.turns.lock().unwrap().clone()
        }
    }

    impl CaptureSink for SpySink {
        fn submit(&self, config: Arc<SessionConfig>, turn: CapturedTurn) {
            self.turns
                .lock()
                .unwrap()
                .push((config.agent_name.clone(), turn));
        }
    }

    struct FixedRecall(Option<String>);

    #[async_trait]
    impl MemoryRecall for FixedRecall {
        async fn recall(&self, _agent: &str) -> anyhow::Result<Option<String>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenRecall;

    #[async_trait]
    impl MemoryRecall for BrokenRecall {
        async fn recall(&self, _agent: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("memory service unreachable")
        }
    }

    // -- helpers ------------------------------------------------------------

    fn config(agent: &str) -> Arc<SessionConfig> {
        SessionConfig::builder(agent)
            .client(ServiceHandle::Async(Arc::new(
                AsyncRecallClient::new("http://localhost:9").unwrap(),
            )))
            .build()
            .unwrap()
    }

    fn wrapped(
        inner: Arc<MockClient>,
        spy: Arc<SpySink>,
        installed: bool,
    ) -> CapturingClient {
        CapturingClient::new(
            inner,
            Arc::new(AnthropicInterceptor::new()),
            Arc::new(AtomicBool::new(installed)),
        )
        .with_sink(spy)
    }

    fn anthropic_request() -> Value {
        json!({
            "model": "claude-sonnet-4-20250514",
            "messages": [{"role": "user", "content": "hi"}]
        })
    }

    // -- non-streaming ------------------------------------------------------

    #[tokio::test]
    async fn test_no_session_passes_through_without_capture() {
        let inner = Arc::new(MockClient::returning(json!({"role": "assistant"})));
        let spy = Arc::new(SpySink::default());
        let client = wrapped(inner.clone(), spy.clone(), true);

        let response = client.create(anthropic_request()).await.unwrap();

        assert_eq!(response, json!({"role": "assistant"}));
        assert_eq!(inner.seen_requests(), vec![anthropic_request()]);
        assert!(spy.captured().is_empty());
    }

    #[tokio::test]
    async fn test_uninstalled_passes_through_even_inside_session() {
        let inner = Arc::new(MockClient::returning(json!({"ok": true})));
        let spy = Arc::new(SpySink::default());
        let client = wrapped(inner, spy.clone(), false);

        session::scope(config("agent"), async {
            let response = client.create(anthropic_request()).await.unwrap();
            assert_eq!(response, json!({"ok": true}));
        })
        .await;

        assert!(spy.captured().is_empty());
    }

    #[tokio::test]
    async fn test_active_session_captures_one_turn() {
        let inner = Arc::new(MockClient::returning(json!({"role": "assistant", "content": []})));
        let spy = Arc::new(SpySink::default());
        let client = wrapped(inner, spy.clone(), true);

        let response = session::scope(config("notes-agent"), async {
            client.create(anthropic_request()).await.unwrap()
        })
        .await;

        assert_eq!(response, json!({"role": "assistant", "content": []}));

        let captured = spy.captured();
        assert_eq!(captured.len(), 1);
        let (agent, turn) = &captured[0];
        assert_eq!(agent, "notes-agent");
        assert_eq!(turn.provider, Provider::Anthropic);
        assert_eq!(turn.model, "claude-sonnet-4-20250514");
        assert_eq!(turn.request_messages, vec![TurnMessage::user("hi")]);
        assert_eq!(turn.response_dict, json!({"role": "assistant", "content": []}));
    }

    #[tokio::test]
    async fn test_provider_error_propagates_without_capture() {
        let inner = Arc::new(MockClient::failing());
        let spy = Arc::new(SpySink::default());
        let client = wrapped(inner, spy.clone(), true);

        let result = session::scope(config("agent"), async {
            client.create(anthropic_request()).await
        })
        .await;

        assert!(result.is_err());
        assert!(spy.captured().is_empty());
    }

    #[tokio::test]
    async fn test_pending_user_message_prepends_to_captured_turn() {
        let inner = Arc::new(MockClient::returning(json!({"role": "assistant"})));
        let spy = Arc::new(SpySink::default());
        let client = wrapped(inner, spy.clone(), true);

        let session = config("agent");
        session.buffer_user_message(TurnMessage::user("earlier question"));

        session::scope(session, async {
            client
                .create(json!({"model": "m", "messages": []}))
                .await
                .unwrap();
        })
        .await;

        let captured = spy.captured();
        assert_eq!(captured[0].1.request_messages[0].content, json!("earlier question"));
    }

    #[tokio::test]
    async fn test_provider_error_leaves_pending_message_staged() {
        let failing = Arc::new(MockClient::failing());
        let working = Arc::new(MockClient::returning(json!({"role": "assistant"})));
        let spy = Arc::new(SpySink::default());
        let broken = wrapped(failing, spy.clone(), true);
        let client = wrapped(working, spy.clone(), true);

        let session = config("agent");
        session.buffer_user_message(TurnMessage::user("earlier question"));

        session::scope(session, async {
            // The failed call must not consume the staged message
            assert!(broken.create(anthropic_request()).await.is_err());
            client.create(anthropic_request()).await.unwrap();
        })
        .await;

        let captured = spy.captured();
        assert_eq!(captured.len(), 1);
        assert_eq!(
            captured[0].1.request_messages[0].content,
            json!("earlier question")
        );
    }

    #[tokio::test]
    async fn test_stream_setup_error_leaves_pending_message_staged() {
        let inner = Arc::new(MockClient::failing());
        let spy = Arc::new(SpySink::default());
        let client = wrapped(inner, spy.clone(), true);

        let session = config("agent");
        session.buffer_user_message(TurnMessage::user("staged"));

        let result = session::scope(session.clone(), async {
            client.create_stream(anthropic_request()).await.map(|_| ())
        })
        .await;

        assert!(result.is_err());
        assert!(spy.captured().is_empty());
        assert!(session.take_pending_user_message().is_some());
    }

    #[tokio::test]
    async fn test_registry_wrapped_client_reverts_on_uninstall() {
        use crate::interceptors::InterceptorRegistry;

        let registry = InterceptorRegistry::with_defaults();
        let inner = Arc::new(MockClient::returning(json!({"role": "assistant"})));
        let spy = Arc::new(SpySink::default());

        // Wrapped before install: the client tracks the registry's state
        let client = registry
            .wrap(Provider::Anthropic, inner.clone() as Arc<dyn ProviderClient>)
            .unwrap()
            .with_sink(spy.clone());

        session::scope(config("agent"), async {
            client.create(anthropic_request()).await.unwrap();
            assert!(spy.captured().is_empty());

            registry.install();
            client.create(anthropic_request()).await.unwrap();
            assert_eq!(spy.captured().len(), 1);

            // Uninstalling reverts the already-constructed client to pure
            // delegation
            registry.uninstall_all();
            let response = client.create(anthropic_request()).await.unwrap();
            assert_eq!(response, json!({"role": "assistant"}));
            assert_eq!(spy.captured().len(), 1);
        })
        .await;

        assert_eq!(inner.seen_requests().len(), 3);
    }

    #[tokio::test]
    async fn test_exiting_nested_scope_routes_to_outer_agent() {
        let inner = Arc::new(MockClient::returning(json!({"role": "assistant"})));
        let spy = Arc::new(SpySink::default());
        let client = wrapped(inner, spy.clone(), true);

        session::scope(config("outer"), async {
            session::scope(config("nested"), async {
                client.create(anthropic_request()).await.unwrap();
            })
            .await;
            // After the nested scope ends, captures go to the outer agent
            client.create(anthropic_request()).await.unwrap();
        })
        .await;

        let agents: Vec<String> = spy.captured().into_iter().map(|(a, _)| a).collect();
        assert_eq!(agents, vec!["nested".to_string(), "outer".to_string()]);
    }

    // -- memory injection ---------------------------------------------------

    #[tokio::test]
    async fn test_memory_recall_augments_outgoing_request() {
        let inner = Arc::new(MockClient::returning(json!({"ok": true})));
        let spy = Arc::new(SpySink::default());
        let client = wrapped(inner.clone(), spy, true)
            .with_memory_recall(Arc::new(FixedRecall(Some("prefers Rust".into()))));

        session::scope(config("agent"), async {
            client.create(anthropic_request()).await.unwrap();
        })
        .await;

        // The wrapped client saw the augmented request
        let sent = inner.seen_requests();
        assert_eq!(sent[0]["system"], "prefers Rust");
    }

    #[tokio::test]
    async fn test_capture_only_skips_recall() {
        let inner = Arc::new(MockClient::returning(json!({"ok": true})));
        let spy = Arc::new(SpySink::default());
        let client = wrapped(inner.clone(), spy.clone(), true)
            .with_memory_recall(Arc::new(FixedRecall(Some("should not appear".into()))));

        let session = SessionConfig::builder("agent")
            .client(ServiceHandle::Async(Arc::new(
                AsyncRecallClient::new("http://localhost:9").unwrap(),
            )))
            .capture_only(true)
            .build()
            .unwrap();

        session::scope(session, async {
            client.create(anthropic_request()).await.unwrap();
        })
        .await;

        // Request untouched, turn still captured
        assert_eq!(inner.seen_requests(), vec![anthropic_request()]);
        assert_eq!(spy.captured().len(), 1);
    }

    #[tokio::test]
    async fn test_recall_failure_sends_request_unaugmented() {
        let inner = Arc::new(MockClient::returning(json!({"ok": true})));
        let spy = Arc::new(SpySink::default());
        let client = wrapped(inner.clone(), spy.clone(), true)
            .with_memory_recall(Arc::new(BrokenRecall));

        let response = session::scope(config("agent"), async {
            client.create(anthropic_request()).await.unwrap()
        })
        .await;

        assert_eq!(response, json!({"ok": true}));
        assert_eq!(inner.seen_requests(), vec![anthropic_request()]);
        assert_eq!(spy.captured().len(), 1);
    }

    // -- streaming ----------------------------------------------------------

    fn sse_chunks() -> Vec<RecallResult<Value>> {
        vec![
            Ok(json!({"type": "message_start", "message": {"id": "msg_1", "model": "claude-sonnet-4-20250514"}})),
            Ok(json!({"type": "content_block_delta", "delta": {"type": "text_delta", "text": "Hello"}})),
            Ok(json!({"type": "content_block_delta", "delta": {"type": "text_delta", "text": " world"}})),
            Ok(json!({"type": "message_delta", "delta": {"stop_reason": "end_turn"}})),
        ]
    }

    #[tokio::test]
    async fn test_stream_passthrough_and_capture_after_drain() {
        let inner = Arc::new(MockClient::streaming(sse_chunks()));
        let spy = Arc::new(SpySink::default());
        let client = wrapped(inner, spy.clone(), true);

        session::scope(config("agent"), async {
            let mut stream = client.create_stream(anthropic_request()).await.unwrap();

            let mut seen = Vec::new();
            while let Some(chunk) = stream.next().await {
                seen.push(chunk.unwrap());
            }
            assert_eq!(seen.len(), 4);
            assert_eq!(seen[1]["delta"]["text"], "Hello");
        })
        .await;

        let captured = spy.captured();
        assert_eq!(captured.len(), 1);
        let turn = &captured[0].1;
        assert_eq!(turn.response_dict["content"][0]["text"], "Hello world");
        assert_eq!(turn.response_dict["stop_reason"], "end_turn");
        assert_eq!(turn.request_messages, vec![TurnMessage::user("hi")]);
    }

    #[tokio::test]
    async fn test_stream_midstream_error_captures_partial_turn() {
        let chunks = vec![
            Ok(json!({"type": "message_start", "message": {"id": "msg_1", "model": "m"}})),
            Ok(json!({"type": "content_block_delta", "delta": {"type": "text_delta", "text": "partial"}})),
            Err(RecallError::Stream("reset".into())),
        ];
        let inner = Arc::new(MockClient::streaming(chunks));
        let spy = Arc::new(SpySink::default());
        let client = wrapped(inner, spy.clone(), true);

        session::scope(config("agent"), async {
            let mut stream = client.create_stream(anthropic_request()).await.unwrap();
            assert!(stream.next().await.unwrap().is_ok());
            assert!(stream.next().await.unwrap().is_ok());
            assert!(stream.next().await.unwrap().is_err());
            assert!(stream.next().await.is_none());
        })
        .await;

        let captured = spy.captured();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].1.response_dict["content"][0]["text"], "partial");
    }

    #[tokio::test]
    async fn test_stream_setup_error_propagates_without_capture() {
        let inner = Arc::new(MockClient::failing());
        let spy = Arc::new(SpySink::default());
        let client = wrapped(inner, spy.clone(), true);

        let result = session::scope(config("agent"), async {
            client.create_stream(anthropic_request()).await.map(|_| ())
        })
        .await;

        assert!(result.is_err());
        assert!(spy.captured().is_empty());
    }

    #[tokio::test]
    async fn test_stream_without_session_is_unwrapped() {
        let inner = Arc::new(MockClient::streaming(sse_chunks()));
        let spy = Arc::new(SpySink::default());
        let client = wrapped(inner, spy.clone(), true);

        let mut stream = client.create_stream(anthropic_request()).await.unwrap();
        let mut count = 0;
        while let Some(chunk) = stream.next().await {
            chunk.unwrap();
            count += 1;
        }

        assert_eq!(count, 4);
        assert!(spy.captured().is_empty());
    }

    // -- blocking wrapper ---------------------------------------------------

    #[test]
    fn test_blocking_create_captures_inside_session() {
        let inner = Arc::new(MockClient::returning(json!({"role": "assistant"})));
        let spy = Arc::new(SpySink::default());
        let client = BlockingCapturingClient::new(
            inner,
            Arc::new(OpenAiInterceptor::new()),
            Arc::new(AtomicBool::new(true)),
        )
        .with_sink(spy.clone());

        let session = config("sync-agent");
        let request = json!({"model": "gpt-4o", "messages": [{"role": "user", "content": "hi"}]});

        {
            let _guard = session.enter();
            let response = BlockingProviderClient::create(&client, request).unwrap();
            assert_eq!(response, json!({"role": "assistant"}));
        }

        let captured = spy.captured();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].0, "sync-agent");
        assert_eq!(captured[0].1.provider, Provider::OpenAi);
        assert_eq!(captured[0].1.model, "gpt-4o");
    }

    #[test]
    fn test_blocking_stream_captures_after_drain() {
        let chunks = vec![
            Ok(json!({"id": "c1", "model": "gpt-4o", "choices": [{"delta": {"role": "assistant", "content": "Hi"}, "finish_reason": null}]})),
            Ok(json!({"id": "c1", "model": "gpt-4o", "choices": [{"delta": {"content": " there"}, "finish_reason": "stop"}]})),
        ];
        let inner = Arc::new(MockClient::streaming(chunks));
        let spy = Arc::new(SpySink::default());
        let client = BlockingCapturingClient::new(
            inner,
            Arc::new(OpenAiInterceptor::new()),
            Arc::new(AtomicBool::new(true)),
        )
        .with_sink(spy.clone());

        let session = config("sync-agent");
        {
            let _guard = session.enter();
            let iter = client
                .create_stream(json!({"model": "gpt-4o", "messages": []}))
                .unwrap();
            let seen: Vec<Value> = iter.map(|r| r.unwrap()).collect();
            assert_eq!(seen.len(), 2);
        }

        let captured = spy.captured();
        assert_eq!(captured.len(), 1);
        assert_eq!(
            captured[0].1.response_dict["choices"][0]["message"]["content"],
            "Hi there"
        );
    }

    #[test]
    fn test_blocking_no_session_no_capture() {
        let inner = Arc::new(MockClient::returning(json!({"ok": true})));
        let spy = Arc::new(SpySink::default());
        let client = BlockingCapturingClient::new(
            inner,
            Arc::new(OpenAiInterceptor::new()),
            Arc::new(AtomicBool::new(true)),
        )
        .with_sink(spy.clone());

        let response =
            BlockingProviderClient::create(&client, json!({"model": "gpt-4o"})).unwrap();
        assert_eq!(response, json!({"ok": true}));
        assert!(spy.captured().is_empty());
    }
}
