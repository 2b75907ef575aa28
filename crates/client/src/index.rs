//! In-memory retrieval index.
//!
//! Chunks are embedded in one batch per `add_many` call and kept in
//! insertion order. Queries rank every node by cosine similarity. The index
//! holds a fixed number of nodes and evicts the oldest first; all vectors
//! share the dimensionality of the first batch.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::llm::{Embedder, Generator};
use crawliq_core::Error;

/// Text to be indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub meta: NodeMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMeta {
    /// `summary`, `findings` or `suggestions`.
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone)]
struct Node {
    id: String,
    text: String,
    meta: NodeMeta,
    vector: Vec<f32>,
}

/// A query result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    pub id: String,
    pub text: String,
    pub meta: NodeMeta,
    pub score: f32,
}

struct IndexState {
    nodes: VecDeque<Node>,
    dim: Option<usize>,
}

/// Cosine similarity; 0 when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Bounded in-memory vector index with a generation backend.
pub struct RetrievalIndex {
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    capacity: usize,
    state: RwLock<IndexState>,
}

impl RetrievalIndex {
    pub fn new(embedder: Arc<dyn Embedder>, generator: Arc<dyn Generator>, capacity: usize) -> Self {
        Self {
            embedder,
            generator,
            capacity: capacity.max(1),
            state: RwLock::new(IndexState { nodes: VecDeque::new(), dim: None }),
        }
    }

    /// Embed and append chunks with a single embedding call.
    ///
    /// A node whose id is already present replaces the older node. When the
    /// capacity is exceeded the oldest nodes are evicted.
    ///
    /// # Errors
    ///
    /// - `ProviderFailed` if the embedder fails or returns the wrong number of vectors
    /// - `DimensionMismatch` if the vectors disagree with the index dimensionality
    pub async fn add_many(&self, chunks: Vec<Chunk>) -> Result<usize, Error> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;

        if vectors.len() != chunks.len() {
            return Err(Error::ProviderFailed(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let mut state = self.state.write().await;
        let expected = match state.dim {
            Some(dim) => dim,
            None => vectors[0].len(),
        };
        if expected == 0 {
            return Err(Error::ProviderFailed("embedder returned empty vectors".into()));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(Error::DimensionMismatch { expected, actual: bad.len() });
        }
        state.dim = Some(expected);

        let added = chunks.len();
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            state.nodes.retain(|node| node.id != chunk.id);
            state.nodes.push_back(Node { id: chunk.id, text: chunk.text, meta: chunk.meta, vector });
        }

        let mut evicted = 0;
        while state.nodes.len() > self.capacity {
            state.nodes.pop_front();
            evicted += 1;
        }
        if evicted > 0 {
            tracing::debug!(evicted, capacity = self.capacity, "evicted oldest index nodes");
        }

        Ok(added)
    }

    /// Top-k nodes by cosine similarity, descending; ties keep insertion order.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<Hit>, Error> {
        self.search(text, k, None).await
    }

    /// As `query`, restricted to nodes tagged with `audit_hash`.
    pub async fn query_scoped(&self, text: &str, k: usize, audit_hash: &str) -> Result<Vec<Hit>, Error> {
        self.search(text, k, Some(audit_hash)).await
    }

    async fn search(&self, text: &str, k: usize, audit_hash: Option<&str>) -> Result<Vec<Hit>, Error> {
        let in_scope = |node: &Node| audit_hash.is_none_or(|hash| node.meta.audit_hash.as_deref() == Some(hash));

        {
            let state = self.state.read().await;
            if k == 0 || !state.nodes.iter().any(in_scope) {
                return Ok(Vec::new());
            }
        }

        let query_vector = self
            .embedder
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::ProviderFailed("embedder returned no vector for query".into()))?;

        let state = self.state.read().await;
        if let Some(dim) = state.dim
            && dim != query_vector.len()
        {
            return Err(Error::DimensionMismatch { expected: dim, actual: query_vector.len() });
        }

        let mut scored: Vec<(&Node, f32)> = state
            .nodes
            .iter()
            .filter(|&node| in_scope(node))
            .map(|node| (node, cosine_similarity(&query_vector, &node.vector)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(node, score)| Hit { id: node.id.clone(), text: node.text.clone(), meta: node.meta.clone(), score })
            .collect())
    }

    /// One stateless completion.
    pub async fn generate(&self, system: &str, user: &str) -> Result<String, Error> {
        self.generator.generate(system, user).await
    }

    /// Number of nodes currently held.
    pub async fn len(&self) -> usize {
        self.state.read().await.nodes.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// True if any node is tagged with `audit_hash`.
    pub async fn contains_audit(&self, audit_hash: &str) -> bool {
        let state = self.state.read().await;
        state.nodes.iter().any(|node| node.meta.audit_hash.as_deref() == Some(audit_hash))
    }
}
