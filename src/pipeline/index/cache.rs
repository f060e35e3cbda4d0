use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use super::chunker::ParagraphChunker;
use super::types::EmbeddingModel;
use super::vectordb::EvidenceIndex;
use super::IndexError;
use crate::config::RetrievalConfig;
use crate::models::Chunk;
use crate::pipeline::extraction::ExtractedText;

/// Chunks and embeddings of one document. Document ids are content-derived,
/// so this never goes stale for a given chunker and embedder.
struct DocumentVectors {
    chunks: Vec<Chunk>,
    embeddings: Vec<Vec<f32>>,
}

struct CachedIndex {
    generation: u64,
    document_ids: Vec<Uuid>,
    index: Arc<EvidenceIndex>,
}

/// Index returned by the cache.
pub struct IndexLookup {
    pub index: Arc<EvidenceIndex>,
    /// `true` when a snapshot for the same generation and document set was reused.
    pub reused: bool,
    /// Documents that had to be chunked and embedded for this lookup.
    pub embedded_documents: usize,
}

/// Per-company index snapshots plus per-document embedding reuse.
///
/// A snapshot is served only for the exact generation and document set it
/// was built from. Rebuilds reuse cached document vectors, so only documents
/// new to the cache are embedded.
#[derive(Default)]
pub struct IndexCache {
    documents: RwLock<HashMap<Uuid, Arc<DocumentVectors>>>,
    indexes: RwLock<HashMap<String, CachedIndex>>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the index for `documents` at `generation`, building it if needed.
    /// `documents` must already be in index order.
    pub fn get_or_build(
        &self,
        company_id: &str,
        generation: u64,
        documents: &[(Uuid, Arc<ExtractedText>)],
        chunker: &ParagraphChunker,
        embedder: &dyn EmbeddingModel,
        retrieval: &RetrievalConfig,
    ) -> Result<IndexLookup, IndexError> {
        let document_ids: Vec<Uuid> = documents.iter().map(|(id, _)| *id).collect();

        {
            let indexes = self.indexes.read().map_err(|_| IndexError::LockPoisoned)?;
            if let Some(cached) = indexes.get(company_id) {
                if cached.generation == generation && cached.document_ids == document_ids {
                    tracing::debug!(company_id, generation, "Reusing cached evidence index");
                    return Ok(IndexLookup {
                        index: Arc::clone(&cached.index),
                        reused: true,
                        embedded_documents: 0,
                    });
                }
            }
        }

        let mut chunks = Vec::new();
        let mut embeddings = Vec::new();
        let mut embedded_documents = 0;

        for (document_id, extracted) in documents {
            let vectors = match self.cached_vectors(document_id)? {
                Some(vectors) => vectors,
                None => {
                    embedded_documents += 1;
                    self.embed_document(document_id, extracted, chunker, embedder)?
                }
            };
            chunks.extend(vectors.chunks.iter().cloned());
            embeddings.extend(vectors.embeddings.iter().cloned());
        }

        let index = Arc::new(EvidenceIndex::from_parts(
            company_id, generation, chunks, embeddings, retrieval,
        )?);

        let mut indexes = self.indexes.write().map_err(|_| IndexError::LockPoisoned)?;
        indexes.insert(
            company_id.to_string(),
            CachedIndex {
                generation,
                document_ids,
                index: Arc::clone(&index),
            },
        );

        tracing::info!(
            company_id,
            generation,
            embedded_documents,
            reused_documents = documents.len() - embedded_documents,
            "Evidence index rebuilt"
        );

        Ok(IndexLookup {
            index,
            reused: false,
            embedded_documents,
        })
    }

    fn cached_vectors(&self, document_id: &Uuid) -> Result<Option<Arc<DocumentVectors>>, IndexError> {
        let documents = self.documents.read().map_err(|_| IndexError::LockPoisoned)?;
        Ok(documents.get(document_id).cloned())
    }

    fn embed_document(
        &self,
        document_id: &Uuid,
        extracted: &ExtractedText,
        chunker: &ParagraphChunker,
        embedder: &dyn EmbeddingModel,
    ) -> Result<Arc<DocumentVectors>, IndexError> {
        let chunks = chunker.chunk(document_id, extracted);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = embedder.embed_batch(&texts)?;

        tracing::debug!(document_id = %document_id, chunks = chunks.len(), "Document embedded");

        let vectors = Arc::new(DocumentVectors { chunks, embeddings });
        let mut documents = self.documents.write().map_err(|_| IndexError::LockPoisoned)?;
        documents.insert(*document_id, Arc::clone(&vectors));
        Ok(vectors)
    }

    /// Drop the company's snapshot (document set changed).
    pub fn invalidate(&self, company_id: &str) -> Result<(), IndexError> {
        let mut indexes = self.indexes.write().map_err(|_| IndexError::LockPoisoned)?;
        indexes.remove(company_id);
        Ok(())
    }

    /// Drop cached vectors of a removed document.
    pub fn forget_document(&self, document_id: &Uuid) -> Result<(), IndexError> {
        let mut documents = self.documents.write().map_err(|_| IndexError::LockPoisoned)?;
        documents.remove(document_id);
        Ok(())
    }

    pub fn cached_document_count(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::{assemble_text, ExtractionMethod, RawPage};
    use crate::pipeline::index::embedder::HashingEmbedder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts texts embedded, delegating to the hashing embedder.
    struct CountingEmbedder {
        inner: HashingEmbedder,
        texts: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                inner: HashingEmbedder::new(),
                texts: AtomicUsize::new(0),
            }
        }
    }

    impl EmbeddingModel for CountingEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
            self.inner.embed(text)
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, IndexError> {
            self.texts.fetch_add(texts.len(), Ordering::SeqCst);
            self.inner.embed_batch(texts)
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
    }

    fn doc(text: &str) -> (Uuid, Arc<ExtractedText>) {
        let extracted = assemble_text(
            ExtractionMethod::PlainTextRead,
            &[RawPage {
                page_number: None,
                text: text.into(),
            }],
        )
        .unwrap();
        (Uuid::new_v4(), Arc::new(extracted))
    }

    #[test]
    fn same_generation_reuses_snapshot() {
        let cache = IndexCache::new();
        let embedder = CountingEmbedder::new();
        let docs = vec![doc("Team of five engineers."), doc("Market is growing.")];
        let chunker = ParagraphChunker::default();
        let retrieval = RetrievalConfig::default();

        let first = cache.get_or_build("acme", 2, &docs, &chunker, &embedder, &retrieval).unwrap();
        let second = cache.get_or_build("acme", 2, &docs, &chunker, &embedder, &retrieval).unwrap();

        assert!(!first.reused);
        assert!(second.reused);
        assert!(Arc::ptr_eq(&first.index, &second.index));
        assert_eq!(embedder.texts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn new_generation_rebuilds_but_only_embeds_new_documents() {
        let cache = IndexCache::new();
        let embedder = CountingEmbedder::new();
        let chunker = ParagraphChunker::default();
        let retrieval = RetrievalConfig::default();
        let mut docs = vec![doc("Team of five engineers.")];

        let first = cache.get_or_build("acme", 1, &docs, &chunker, &embedder, &retrieval).unwrap();
        docs.push(doc("Proprietary compiler technology."));
        let second = cache.get_or_build("acme", 2, &docs, &chunker, &embedder, &retrieval).unwrap();

        assert!(!second.reused);
        assert_eq!(second.embedded_documents, 1);
        assert_eq!(second.index.generation(), 2);
        assert_eq!(second.index.len(), 2);
        assert_eq!(first.index.len(), 1, "old snapshot is untouched");
    }

    #[test]
    fn stale_generation_is_never_served() {
        let cache = IndexCache::new();
        let embedder = HashingEmbedder::new();
        let chunker = ParagraphChunker::default();
        let retrieval = RetrievalConfig::default();
        let docs = vec![doc("Team of five engineers.")];

        cache.get_or_build("acme", 1, &docs, &chunker, &embedder, &retrieval).unwrap();
        let lookup = cache.get_or_build("acme", 3, &docs, &chunker, &embedder, &retrieval).unwrap();
        assert!(!lookup.reused);
        assert_eq!(lookup.index.generation(), 3);
    }

    #[test]
    fn invalidate_and_forget() {
        let cache = IndexCache::new();
        let embedder = CountingEmbedder::new();
        let chunker = ParagraphChunker::default();
        let retrieval = RetrievalConfig::default();
        let docs = vec![doc("Team of five engineers.")];

        cache.get_or_build("acme", 1, &docs, &chunker, &embedder, &retrieval).unwrap();
        cache.invalidate("acme").unwrap();
        cache.forget_document(&docs[0].0).unwrap();
        assert_eq!(cache.cached_document_count(), 0);

        let lookup = cache.get_or_build("acme", 1, &docs, &chunker, &embedder, &retrieval).unwrap();
        assert!(!lookup.reused);
        assert_eq!(lookup.embedded_documents, 1);
    }

    #[test]
    fn no_documents_is_empty_index() {
        let cache = IndexCache::new();
        let err = cache
            .get_or_build(
                "acme",
                1,
                &[],
                &ParagraphChunker::default(),
                &HashingEmbedder::new(),
                &RetrievalConfig::default(),
            )
            .err()
            .unwrap();
        assert_eq!(err, IndexError::EmptyIndex);
    }
}
