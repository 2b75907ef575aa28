//! Language-model providers: batch embeddings and single-turn generation.
//!
//! The retrieval index and the auditor only see the `Embedder` and
//! `Generator` traits; `OpenAiClient` implements both against an
//! OpenAI-compatible API.

pub mod openai;

pub use openai::{OpenAiClient, OpenAiConfig};

use async_trait::async_trait;
use crawliq_core::Error;

/// Turns texts into embedding vectors, one per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error>;
}

/// Stateless completion: a system prompt and a user prompt in, text out.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> Result<String, Error>;
}
