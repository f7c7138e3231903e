//! Chat and embedding collaborator interfaces (spec §6). Concrete providers
//! (OpenAI, local models, ...) are out of scope for the core; the core only
//! consumes these traits, resolved by model-id through
//! [`crate::pipeline::Services`].

pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::pipeline::Cancellation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub text: String,
    pub structured: Option<Value>,
}

/// `chat(messages, cancellation) -> {text, structured?}` (spec §6). The
/// core only constructs system+user turns.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        cancellation: &Cancellation,
    ) -> Result<ChatResponse>;
}

/// `embed(texts, cancellation) -> vectors` of uniform dimensionality
/// (spec §6).
#[async_trait]
pub trait EmbeddingGenerator: Send + Sync {
    async fn embed(&self, texts: &[String], cancellation: &Cancellation) -> Result<Vec<Vec<f64>>>;
}

/// A dependency-free, deterministic embedder derived from token shingles
/// rather than a real model — exists so the heuristic-maintenance dedup
/// pass (§4.7) and its tests are runnable without a network call, the same
/// way the teacher's `simhash`/`tfidf` modules are self-contained
/// similarity primitives rather than calls to an external service.
pub struct HashingEmbedder {
    pub dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self { dimensions: 64 }
    }
}

#[async_trait]
impl EmbeddingGenerator for HashingEmbedder {
    async fn embed(&self, texts: &[String], cancellation: &Cancellation) -> Result<Vec<Vec<f64>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            cancellation.check()?;
            out.push(hash_embed(text, self.dimensions));
        }
        Ok(out)
    }
}

fn hash_embed(text: &str, dims: usize) -> Vec<f64> {
    use siphasher::sip::SipHasher13;
    use std::hash::{Hash, Hasher};
    use unicode_segmentation::UnicodeSegmentation;

    let mut v = vec![0.0f64; dims];
    for word in text.unicode_words() {
        let lower = word.to_lowercase();
        let mut hasher = SipHasher13::new();
        lower.hash(&mut hasher);
        let h = hasher.finish();
        let bucket = (h as usize) % dims;
        let sign = if (h >> 63) & 1 == 1 { 1.0 } else { -1.0 };
        v[bucket] += sign;
    }
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    v
}

/// No backing model: every call succeeds with an empty response. Lets a
/// run complete end to end with no provider configured — extraction and
/// summarization fall back to their heuristics-only/deterministic paths
/// (§4.8, §4.10) rather than the pipeline refusing to start.
pub struct NullChatClient;

#[async_trait]
impl ChatClient for NullChatClient {
    async fn chat(
        &self,
        _messages: &[ChatMessage],
        cancellation: &Cancellation,
    ) -> Result<ChatResponse> {
        cancellation.check()?;
        Ok(ChatResponse::default())
    }
}

pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if na > 0.0 && nb > 0.0 {
        dot / (na * nb)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashing_embedder_is_deterministic() {
        let embedder = HashingEmbedder::default();
        let cancellation = Cancellation::new();
        let a = embedder
            .embed(&["hello world".to_string()], &cancellation)
            .await
            .unwrap();
        let b = embedder
            .embed(&["hello world".to_string()], &cancellation)
            .await
            .unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn identical_text_has_cosine_similarity_one() {
        let embedder = HashingEmbedder::default();
        let cancellation = Cancellation::new();
        let vecs = embedder
            .embed(
                &["Alpha Beta".to_string(), "Alpha Beta".to_string()],
                &cancellation,
            )
            .await
            .unwrap();
        let sim = cosine_similarity(&vecs[0], &vecs[1]);
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn null_chat_client_returns_empty_response() {
        let client = NullChatClient;
        let cancellation = Cancellation::new();
        let resp = client
            .chat(&[ChatMessage::user("hello")], &cancellation)
            .await
            .unwrap();
        assert!(resp.text.is_empty());
        assert!(resp.structured.is_none());
    }

    #[tokio::test]
    async fn unrelated_text_has_lower_similarity() {
        let embedder = HashingEmbedder::default();
        let cancellation = Cancellation::new();
        let vecs = embedder
            .embed(
                &[
                    "Alpha Beta gamma delta".to_string(),
                    "Zulu yankee xray whiskey".to_string(),
                ],
                &cancellation,
            )
            .await
            .unwrap();
        let sim = cosine_similarity(&vecs[0], &vecs[1]);
        assert!(sim < 0.5);
    }
}
