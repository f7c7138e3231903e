//! A scriptable `ChatClient` for tests and scenario replay. Not a provider
//! adapter — it exists so the extractor and summarizer are exercisable
//! without a network call, mirroring how the CLI's `dedup`/`classify`
//! commands in the teacher never depend on an external service either.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{ChatClient, ChatMessage, ChatResponse};
use crate::error::Result;
use crate::pipeline::Cancellation;

/// Replays a fixed sequence of responses, one per call, looping the last
/// response once exhausted. An empty script yields an empty response
/// every time (exercising the "Model error/empty" fallback paths).
pub struct ScriptedChatClient {
    responses: Vec<ChatResponse>,
    calls: AtomicUsize,
    fail_indices: Mutex<Vec<usize>>,
}

impl ScriptedChatClient {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            responses,
            calls: AtomicUsize::new(0),
            fail_indices: Mutex::new(Vec::new()),
        }
    }

    pub fn from_text(texts: Vec<&str>) -> Self {
        Self::new(
            texts
                .into_iter()
                .map(|t| ChatResponse {
                    text: t.to_string(),
                    structured: serde_json::from_str(t).ok(),
                })
                .collect(),
        )
    }

    /// Make the call at `index` (0-based) fail with a `Model` error.
    pub fn fail_at(self, index: usize) -> Self {
        self.fail_indices.lock().unwrap().push(index);
        self
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn chat(
        &self,
        _messages: &[ChatMessage],
        cancellation: &Cancellation,
    ) -> Result<ChatResponse> {
        cancellation.check()?;
        let idx = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_indices.lock().unwrap().contains(&idx) {
            return Err(crate::error::GraphRagError::Model(format!(
                "scripted failure at call {idx}"
            )));
        }
        if self.responses.is_empty() {
            return Ok(ChatResponse::default());
        }
        let resp = &self.responses[idx.min(self.responses.len() - 1)];
        Ok(resp.clone())
    }
}
