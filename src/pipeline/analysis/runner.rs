use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use super::error::AnalysisError;
use super::fingerprint::evaluation_fingerprint;
use super::types::{AnalysisEvent, AnalysisOutcome, AnalysisRequest};
use crate::config::{default_store_path, AnalysisConfig};
use crate::db::{EvaluationStore, PutOutcome, SqliteEvaluationStore};
use crate::models::{
    Document, DocumentStatus, Evaluation, ExcludedDocument, PrincipleOutcome, UnscoredKind,
};
use crate::pipeline::aggregation::{aggregate, recommend};
use crate::pipeline::extraction::{DocumentExtractor, ExtractedText, ExtractionError};
use crate::pipeline::import::{DocumentRegistry, IngestResult};
use crate::pipeline::index::{
    EmbeddingModel, EvidenceIndex, HashingEmbedder, IndexCache, IndexError, ParagraphChunker,
};
use crate::pipeline::scoring::{OllamaOracle, PrincipleScorer, ReasoningOracle, ScoringError};
use crate::rubric::Rubric;

/// Progress callback. Called from the run's task; must not block.
pub type ProgressFn<'a> = &'a (dyn Fn(AnalysisEvent) + Send + Sync);

/// Owns the shared pipeline state and executes analysis runs.
///
/// Registry, index cache, rubric and store are shared across runs; each run
/// gets its own semaphore bounding oracle calls.
pub struct AnalysisRunner<O> {
    registry: Arc<DocumentRegistry>,
    extractor: Arc<DocumentExtractor>,
    chunker: Arc<ParagraphChunker>,
    cache: Arc<IndexCache>,
    embedder: Arc<dyn EmbeddingModel>,
    store: Arc<dyn EvaluationStore>,
    rubric: Arc<Rubric>,
    config: AnalysisConfig,
    oracle: Arc<O>,
}

impl AnalysisRunner<OllamaOracle> {
    /// Production wiring: rubric from `rubric_path` (or the embedded default),
    /// SQLite store at `store_path` (or `~/.dealscope/evaluations.db`) and an
    /// Ollama oracle.
    pub fn from_config(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        let rubric = match &config.rubric_path {
            Some(path) => Rubric::load_from_path(path)?,
            None => Rubric::load_default()?,
        };

        let store_path = config
            .store_path
            .clone()
            .or_else(default_store_path)
            .ok_or_else(|| AnalysisError::Config("cannot determine store path".into()))?;
        let store = Arc::new(SqliteEvaluationStore::open(&store_path)?);

        let oracle = Arc::new(OllamaOracle::new(&config.oracle)?);
        tracing::info!(
            store = %store_path.display(),
            model = oracle.model(),
            rubric_version = %rubric.version,
            "Analysis runner configured"
        );

        Self::new(config, rubric, store, oracle)
    }
}

impl<O: ReasoningOracle + 'static> AnalysisRunner<O> {
    pub fn new(
        config: AnalysisConfig,
        rubric: Rubric,
        store: Arc<dyn EvaluationStore>,
        oracle: Arc<O>,
    ) -> Result<Self, AnalysisError> {
        config.validate()?;
        rubric.validate()?;
        let chunker = ParagraphChunker::new(config.chunking)?;

        Ok(Self {
            registry: Arc::new(DocumentRegistry::new()),
            extractor: Arc::new(DocumentExtractor::new()),
            chunker: Arc::new(chunker),
            cache: Arc::new(IndexCache::new()),
            embedder: Arc::new(HashingEmbedder::new()),
            store,
            rubric: Arc::new(rubric),
            config,
            oracle,
        })
    }

    /// Replace the embedding model. Clears nothing: call before any run.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingModel>) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn with_extractor(mut self, extractor: DocumentExtractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    pub fn store(&self) -> &dyn EvaluationStore {
        self.store.as_ref()
    }

    /// Register a document for a company. See `DocumentRegistry::ingest`.
    pub fn ingest(
        &self,
        company_id: &str,
        format_label: &str,
        bytes: &[u8],
    ) -> Result<IngestResult, AnalysisError> {
        Ok(self.registry.ingest(company_id, format_label, bytes)?)
    }

    /// Remove a document and drop every cached index that covered it.
    pub fn remove_document(&self, company_id: &str, document_id: &Uuid) -> Result<(), AnalysisError> {
        self.registry.remove(company_id, document_id)?;
        self.cache.invalidate(company_id)?;
        self.cache.forget_document(document_id)?;
        Ok(())
    }

    /// Stored evaluations for a company, oldest first.
    pub fn evaluations(&self, company_id: &str) -> Result<Vec<Evaluation>, AnalysisError> {
        Ok(self.store.list_for_company(company_id)?)
    }

    /// Execute one analysis run.
    ///
    /// Setting `cancel` aborts outstanding scoring and stores nothing.
    pub async fn run(
        &self,
        request: AnalysisRequest,
        cancel: Arc<AtomicBool>,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let start = Instant::now();
        let emit = |event: AnalysisEvent| {
            if let Some(progress) = progress {
                progress(event);
            }
        };

        let company_id = request.company_id.trim().to_string();
        if company_id.is_empty() {
            return Err(AnalysisError::CompanyRequired);
        }
        check_cancelled(&cancel)?;

        let snapshot = self.registry.snapshot(&company_id, &request.document_ids)?;
        if snapshot.documents.is_empty() {
            return Err(AnalysisError::EmptyIndex);
        }
        let document_ids: Vec<Uuid> = snapshot.documents.iter().map(|d| d.id).collect();
        let fingerprint = evaluation_fingerprint(&company_id, &document_ids, &self.rubric.version);

        if !request.force_refresh {
            if let Some(evaluation) = self.store.get(&fingerprint)? {
                tracing::info!(
                    company_id = %company_id,
                    fingerprint = %fingerprint,
                    "Returning stored evaluation"
                );
                emit(AnalysisEvent::Reused { fingerprint });
                return Ok(AnalysisOutcome {
                    evaluation,
                    reused: true,
                    excluded_documents: excluded(&snapshot.documents),
                });
            }
        }

        tracing::info!(
            company_id = %company_id,
            documents = document_ids.len(),
            generation = snapshot.generation,
            force_refresh = request.force_refresh,
            "Analysis started"
        );
        emit(AnalysisEvent::Started {
            company_id: company_id.clone(),
            documents: document_ids.len(),
        });

        // Extraction
        let documents = self.extract_pending(&company_id, snapshot.documents).await?;
        let excluded_documents = excluded(&documents);
        for doc in &excluded_documents {
            emit(AnalysisEvent::DocumentExcluded {
                document_id: doc.document_id,
                reason: doc.reason.clone(),
            });
        }
        let usable: Vec<(Uuid, Arc<ExtractedText>)> = documents
            .iter()
            .filter_map(|d| d.extracted.as_ref().map(|text| (d.id, Arc::clone(text))))
            .collect();
        emit(AnalysisEvent::ExtractionFinished {
            usable: usable.len(),
            excluded: excluded_documents.len(),
        });
        check_cancelled(&cancel)?;

        if usable.is_empty() {
            tracing::warn!(company_id = %company_id, "No usable documents, nothing to score");
            return Err(AnalysisError::EmptyIndex);
        }

        // Index + probe embeddings
        let (index, index_reused, probes) = self
            .build_index(&company_id, snapshot.generation, usable)
            .await?;
        emit(AnalysisEvent::IndexReady {
            chunks: index.len(),
            reused: index_reused,
            principles: self.rubric.len(),
        });
        check_cancelled(&cancel)?;

        // Scoring fan-out
        let outcomes = self.score_all(index, probes, &cancel, &emit).await?;
        check_cancelled(&cancel)?;

        // Aggregation
        let categories = aggregate(&outcomes, &self.rubric);
        let recommendation = recommend(&categories, &self.rubric.thresholds);

        let evaluation = Evaluation {
            company_id: company_id.clone(),
            fingerprint,
            rubric_version: self.rubric.version.clone(),
            document_ids,
            outcomes,
            categories,
            recommendation,
            created_at: Utc::now(),
        };

        let (evaluation, reused) = match self.store.put(&evaluation, request.force_refresh)? {
            PutOutcome::Inserted | PutOutcome::Replaced => (evaluation, false),
            PutOutcome::AlreadyPresent(existing) => {
                tracing::info!(
                    fingerprint = %evaluation.fingerprint,
                    "Concurrent run stored this fingerprint first, keeping stored evaluation"
                );
                (*existing, true)
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            company_id = %company_id,
            fingerprint = %evaluation.fingerprint,
            recommendation = %evaluation.recommendation,
            scored = evaluation.scored_count(),
            excluded = excluded_documents.len(),
            duration_ms,
            "Analysis complete"
        );
        emit(AnalysisEvent::Completed {
            recommendation: evaluation.recommendation,
            duration_ms,
        });

        Ok(AnalysisOutcome {
            evaluation,
            reused,
            excluded_documents,
        })
    }

    /// Extract every pending document off the async workers and record the
    /// results. Returns the documents in their post-extraction state.
    async fn extract_pending(
        &self,
        company_id: &str,
        documents: Vec<Document>,
    ) -> Result<Vec<Document>, AnalysisError> {
        let pending: Vec<Document> = documents
            .iter()
            .filter(|d| d.status == DocumentStatus::Pending)
            .cloned()
            .collect();
        if pending.is_empty() {
            return Ok(documents);
        }

        let extractor = Arc::clone(&self.extractor);
        let results: Vec<(Uuid, Result<ExtractedText, ExtractionError>)> =
            tokio::task::spawn_blocking(move || {
                pending
                    .into_iter()
                    .map(|doc| {
                        let result = extractor.extract(
                            &doc.id,
                            doc.format,
                            &doc.declared_format,
                            &doc.raw_bytes,
                        );
                        (doc.id, result)
                    })
                    .collect()
            })
            .await?;

        let mut updated = documents;
        for (id, result) in results {
            let recorded = self.registry.record_extraction(company_id, &id, result)?;
            if let Some(slot) = updated.iter_mut().find(|d| d.id == id) {
                *slot = recorded;
            }
        }
        Ok(updated)
    }

    /// Build (or reuse) the evidence index and embed every principle probe.
    /// Runs on the blocking pool: embedders may do blocking I/O.
    async fn build_index(
        &self,
        company_id: &str,
        generation: u64,
        usable: Vec<(Uuid, Arc<ExtractedText>)>,
    ) -> Result<(Arc<EvidenceIndex>, bool, Vec<Vec<f32>>), AnalysisError> {
        let cache = Arc::clone(&self.cache);
        let chunker = Arc::clone(&self.chunker);
        let embedder = Arc::clone(&self.embedder);
        let rubric = Arc::clone(&self.rubric);
        let retrieval = self.config.retrieval;
        let company = company_id.to_string();

        let (lookup, probes) = tokio::task::spawn_blocking(move || {
            let lookup = cache.get_or_build(
                &company,
                generation,
                &usable,
                &chunker,
                embedder.as_ref(),
                &retrieval,
            )?;
            let probe_texts: Vec<String> = rubric.principles.iter().map(|p| p.probe_text()).collect();
            let probe_refs: Vec<&str> = probe_texts.iter().map(String::as_str).collect();
            let probes = embedder.embed_batch(&probe_refs)?;
            Ok::<_, IndexError>((lookup, probes))
        })
        .await??;

        if probes.len() != self.rubric.len() {
            return Err(AnalysisError::Index(IndexError::Embedding(format!(
                "expected {} probe embeddings, got {}",
                self.rubric.len(),
                probes.len()
            ))));
        }

        Ok((lookup.index, lookup.reused, probes))
    }

    /// Score every principle concurrently. Outcomes come back in catalog order.
    async fn score_all(
        &self,
        index: Arc<EvidenceIndex>,
        probes: Vec<Vec<f32>>,
        cancel: &Arc<AtomicBool>,
        emit: &(dyn Fn(AnalysisEvent) + Send + Sync),
    ) -> Result<Vec<PrincipleOutcome>, AnalysisError> {
        let semaphore = Arc::new(Semaphore::new(self.config.oracle.max_concurrent_calls));
        let scorer = PrincipleScorer::new(
            Arc::clone(&self.oracle),
            semaphore,
            self.config.retrieval,
            self.config.retry,
        );

        let total = self.rubric.len();
        let mut tasks: JoinSet<(usize, Result<PrincipleOutcome, ScoringError>)> = JoinSet::new();
        for (position, (principle, probe)) in
            self.rubric.principles.iter().cloned().zip(probes).enumerate()
        {
            let scorer = scorer.clone();
            let index = Arc::clone(&index);
            let cancel = Arc::clone(cancel);
            tasks.spawn(async move {
                let result = scorer.score(&principle, &probe, &index, &cancel).await;
                (position, result)
            });
        }

        let mut slots: Vec<Option<PrincipleOutcome>> = vec![None; total];
        let mut completed = 0;
        while let Some(joined) = tasks.join_next().await {
            let (position, result) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::error!(error = %e, "Scoring task failed");
                    continue;
                }
            };
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(ScoringError::Cancelled) => {
                    tasks.abort_all();
                    tracing::info!("Analysis cancelled, outstanding scoring aborted");
                    return Err(AnalysisError::Cancelled);
                }
                Err(e) => PrincipleOutcome::Unscored {
                    principle_id: self.rubric.principles[position].id.clone(),
                    kind: e.unscored_kind(),
                    detail: e.to_string(),
                },
            };

            completed += 1;
            emit(AnalysisEvent::PrincipleFinished {
                principle_id: outcome.principle_id().to_string(),
                scored: outcome.is_scored(),
                completed,
                total,
            });
            slots[position] = Some(outcome);
        }

        // Slots left empty belong to tasks that panicked.
        let mut outcomes = Vec::with_capacity(total);
        for (slot, principle) in slots.into_iter().zip(&self.rubric.principles) {
            let outcome = match slot {
                Some(outcome) => outcome,
                None => {
                    completed += 1;
                    emit(AnalysisEvent::PrincipleFinished {
                        principle_id: principle.id.clone(),
                        scored: false,
                        completed,
                        total,
                    });
                    PrincipleOutcome::Unscored {
                        principle_id: principle.id.clone(),
                        kind: UnscoredKind::OracleUnavailable,
                        detail: "scoring task failed".into(),
                    }
                }
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}

fn check_cancelled(cancel: &AtomicBool) -> Result<(), AnalysisError> {
    if cancel.load(Ordering::Relaxed) {
        return Err(AnalysisError::Cancelled);
    }
    Ok(())
}

/// Documents that contribute no evidence, with the recorded reason.
fn excluded(documents: &[Document]) -> Vec<ExcludedDocument> {
    documents
        .iter()
        .filter(|d| d.status == DocumentStatus::Failed)
        .map(|d| ExcludedDocument {
            document_id: d.id,
            reason: d
                .failure
                .clone()
                .unwrap_or_else(|| "extraction failed".into()),
        })
        .collect()
}
