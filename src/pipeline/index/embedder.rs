use serde::{Deserialize, Serialize};

use super::types::EmbeddingModel;
use super::IndexError;

/// Default embedding dimension.
pub const EMBEDDING_DIM: usize = 384;

/// Common English function words, dropped before hashing.
const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "could", "did", "do", "does", "for", "from", "had", "has", "have", "he",
    "her", "his", "how", "i", "if", "in", "into", "is", "it", "its", "more", "most", "no", "not",
    "of", "on", "or", "our", "out", "she", "so", "such", "than", "that", "the", "their", "them",
    "then", "there", "these", "they", "this", "those", "to", "up", "was", "we", "were", "what",
    "when", "which", "who", "will", "with", "would", "you", "your",
];

/// Deterministic bag-of-words embedder using signed feature hashing.
///
/// Tokens are lowercased alphanumeric runs; stopwords are dropped; each
/// token's bucket gets `1 + ln(tf)` with a hash-derived sign; the result is
/// L2-normalized. Same text, same vector, on every platform.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new() -> Self {
        Self {
            dimension: EMBEDDING_DIM,
        }
    }

    pub fn with_dimension(dimension: usize) -> Result<Self, IndexError> {
        if dimension == 0 {
            return Err(IndexError::InvalidConfig("embedding dimension must be > 0".into()));
        }
        Ok(Self { dimension })
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut counts: std::collections::BTreeMap<String, u32> = std::collections::BTreeMap::new();
        for token in tokenize(text) {
            *counts.entry(token).or_insert(0) += 1;
        }

        let mut vec = vec![0.0f32; self.dimension];
        for (token, tf) in counts {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vec[bucket] += sign * (1.0 + (tf as f32).ln());
        }

        l2_normalize(&mut vec);
        vec
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingModel for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        Ok(self.vectorize(text))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, IndexError> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Lowercased alphanumeric tokens with stopwords and single letters removed.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(|t| t.to_lowercase())
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
}

/// 64-bit FNV-1a.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

fn l2_normalize(vec: &mut [f32]) {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in vec.iter_mut() {
            *val /= norm;
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Ollama embedder (/api/embed)
// ═══════════════════════════════════════════════════════════

/// Embedding model served by a local Ollama instance.
///
/// Blocking client: call from a blocking context (`spawn_blocking`), never
/// directly on an async worker.
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    dimension: usize,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedder {
    pub fn new(
        base_url: &str,
        model: &str,
        dimension: usize,
        timeout_secs: u64,
    ) -> Result<Self, IndexError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| IndexError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimension,
            client,
        })
    }
}

impl EmbeddingModel for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| IndexError::Embedding("empty embedding response".into()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, IndexError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/embed", self.base_url);
        let body = OllamaEmbedRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| IndexError::Embedding(format!("request to {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(IndexError::Embedding(format!("HTTP {status}: {body}")));
        }

        let parsed: OllamaEmbedResponse = response
            .json()
            .map_err(|e| IndexError::Embedding(format!("response parsing: {e}")))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(IndexError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }
        if let Some(bad) = parsed.embeddings.iter().find(|v| v.len() != self.dimension) {
            return Err(IndexError::Embedding(format!(
                "dimension {} does not match configured {}",
                bad.len(),
                self.dimension
            )));
        }

        tracing::debug!(model = %self.model, count = texts.len(), "Ollama embeddings generated");
        Ok(parsed.embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn embed_returns_correct_dimension() {
        let vec = HashingEmbedder::new().embed("Hello world").unwrap();
        assert_eq!(vec.len(), EMBEDDING_DIM);
    }

    #[test]
    fn embed_batch_returns_correct_count() {
        let vecs = HashingEmbedder::new()
            .embed_batch(&["text one", "text two", "text three"])
            .unwrap();
        assert_eq!(vecs.len(), 3);
    }

    #[test]
    fn embed_is_deterministic() {
        let embedder = HashingEmbedder::new();
        assert_eq!(
            embedder.embed("Recurring revenue grew").unwrap(),
            embedder.embed("Recurring revenue grew").unwrap()
        );
    }

    #[test]
    fn embed_is_l2_normalized() {
        let vec = HashingEmbedder::new().embed("test normalization").unwrap();
        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "norm = {norm}");
    }

    #[test]
    fn stopwords_only_text_is_zero_vector() {
        let vec = HashingEmbedder::new().embed("the and of a").unwrap();
        assert!(vec.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn case_and_punctuation_do_not_matter() {
        let embedder = HashingEmbedder::new();
        assert_eq!(
            embedder.embed("Market size: TAM!").unwrap(),
            embedder.embed("market SIZE tam").unwrap()
        );
    }

    #[test]
    fn shared_vocabulary_scores_higher() {
        let embedder = HashingEmbedder::new();
        let probe = embedder.embed("market size addressable revenue").unwrap();
        let related = embedder
            .embed("The total addressable market size is $12B in annual revenue.")
            .unwrap();
        let unrelated = embedder
            .embed("Our founders previously worked together at a robotics lab.")
            .unwrap();
        assert!(dot(&probe, &related) > dot(&probe, &unrelated));
    }

    #[test]
    fn tokenizer_drops_stopwords_and_single_chars() {
        let tokens: Vec<String> = tokenize("The CEO is a co-founder of X Corp").collect();
        assert_eq!(tokens, vec!["ceo", "co", "founder", "corp"]);
    }

    #[test]
    fn zero_dimension_rejected() {
        assert!(HashingEmbedder::with_dimension(0).is_err());
    }
}
