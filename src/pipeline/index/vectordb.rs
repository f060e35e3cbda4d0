use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::types::{EmbeddingModel, RetrievedChunk};
use super::IndexError;
use crate::config::RetrievalConfig;
use crate::models::Chunk;

/// Immutable similarity index over one company's chunks for one
/// document-set generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceIndex {
    company_id: String,
    generation: u64,
    /// Chunks in index order (document order, then ordinal).
    chunks: Vec<Chunk>,
    embeddings: Vec<Vec<f32>>,
    max_k: usize,
}

impl EvidenceIndex {
    /// Embed and index the given chunks.
    pub fn build(
        company_id: &str,
        generation: u64,
        chunks: Vec<Chunk>,
        embedder: &dyn EmbeddingModel,
        retrieval: &RetrievalConfig,
    ) -> Result<Self, IndexError> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = embedder.embed_batch(&texts)?;
        Self::from_parts(company_id, generation, chunks, embeddings, retrieval)
    }

    /// Assemble an index from chunks and precomputed embeddings (one per chunk).
    pub fn from_parts(
        company_id: &str,
        generation: u64,
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
        retrieval: &RetrievalConfig,
    ) -> Result<Self, IndexError> {
        if chunks.is_empty() {
            return Err(IndexError::EmptyIndex);
        }
        if retrieval.max_k == 0 {
            return Err(IndexError::InvalidConfig("max_k must be > 0".into()));
        }
        if chunks.len() != embeddings.len() {
            return Err(IndexError::Embedding(format!(
                "chunk count {} does not match embedding count {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        tracing::info!(
            company_id,
            generation,
            chunks = chunks.len(),
            "Evidence index built"
        );

        Ok(Self {
            company_id: company_id.to_string(),
            generation,
            chunks,
            embeddings,
            max_k: retrieval.max_k,
        })
    }

    /// Top-`k` chunks by cosine similarity to `probe`, most relevant first.
    /// `k` is clamped to `[1, max_k]`; ties keep index order.
    pub fn query(
        &self,
        probe: &str,
        k: usize,
        embedder: &dyn EmbeddingModel,
    ) -> Result<Vec<RetrievedChunk>, IndexError> {
        let query_embedding = embedder.embed(probe)?;
        Ok(self.query_embedding(&query_embedding, k))
    }

    pub fn query_embedding(&self, query_embedding: &[f32], k: usize) -> Vec<RetrievedChunk> {
        let k = k.clamp(1, self.max_k);

        let mut scored: Vec<(usize, f32)> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(i, embedding)| (i, cosine_similarity(query_embedding, embedding)))
            .collect();

        // Stable sort: equal relevance keeps index order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        scored
            .into_iter()
            .take(k)
            .map(|(i, relevance)| RetrievedChunk {
                chunk: self.chunks[i].clone(),
                relevance,
            })
            .collect()
    }

    pub fn company_id(&self) -> &str {
        &self.company_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
