use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::corpus::DocumentStore;
use crate::error::RetrievalError;
use crate::llm::embeddings::{EmbedPurpose, Embedder};
use crate::models::{FusedResult, RetrievalOutcome, RetrievedPassage, ScoredCandidate, SearchFilters};
use crate::search::fusion::FusionRanker;
use crate::search::lexical::LexicalIndex;
use crate::search::vector::VectorBackend;

/// Candidates fetched per branch beyond `top_k`; fusing two already
/// truncated top-k lists can unfairly exclude an item ranked deep in one
/// branch and high in the other. Default to tune, not a requirement.
const OVERSAMPLE_FACTOR: usize = 3;

/// Confidence blend: weight of the normalized top score vs the gap between
/// rank 1 and rank 2. Defaults to tune.
const CONFIDENCE_TOP_WEIGHT: f32 = 0.7;
const CONFIDENCE_GAP_WEIGHT: f32 = 0.3;

/// Ceiling applied when the outcome was built from a single surviving
/// branch.
const DEGRADED_CONFIDENCE_CEILING: f32 = 0.5;

/// Retrieval seam used by the router; lets tests inject failure modes that
/// the real service only hits when every branch dies.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(
        &self,
        query: &str,
        filters: &SearchFilters,
        top_k: usize,
    ) -> Result<RetrievalOutcome, RetrievalError>;
}

/// Composes the embedder, the vector backend, the lexical index and the
/// fusion ranker into one search operation with filtering and a confidence
/// estimate.
pub struct RetrievalService {
    embedder: Arc<dyn Embedder>,
    vectors: Arc<dyn VectorBackend>,
    lexical: Arc<LexicalIndex>,
    corpus: Arc<DocumentStore>,
    ranker: FusionRanker,
    branch_timeout: Duration,
}

impl RetrievalService {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vectors: Arc<dyn VectorBackend>,
        lexical: Arc<LexicalIndex>,
        corpus: Arc<DocumentStore>,
        ranker: FusionRanker,
        branch_timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            vectors,
            lexical,
            corpus,
            ranker,
            branch_timeout,
        }
    }

    /// Run the semantic branch: embed the query, then search the vector
    /// backend. The whole branch runs under the configured timeout so a
    /// slow backend degrades the outcome instead of stalling the request.
    async fn semantic_branch(
        &self,
        query: &str,
        filters: &SearchFilters,
        fetch_k: usize,
    ) -> Result<Vec<ScoredCandidate>, String> {
        let search = async {
            let embedding = self
                .embedder
                .embed(query, EmbedPurpose::Query)
                .await
                .map_err(|e| e.to_string())?;
            self.vectors
                .search(&embedding, fetch_k, filters)
                .map_err(|e| e.to_string())
        };

        match tokio::time::timeout(self.branch_timeout, search).await {
            Ok(result) => result,
            Err(_) => Err(format!(
                "vector branch timed out after {}ms",
                self.branch_timeout.as_millis()
            )),
        }
    }

    async fn lexical_branch(
        &self,
        query: &str,
        filters: &SearchFilters,
        fetch_k: usize,
    ) -> Result<Vec<ScoredCandidate>, String> {
        let lexical = self.lexical.clone();
        let query = query.to_string();
        let filters = filters.clone();

        tokio::task::spawn_blocking(move || lexical.search(&query, fetch_k, &filters))
            .await
            .map_err(|e| format!("lexical task failed: {e}"))?
            .map_err(|e| e.to_string())
    }

    fn confidence(&self, fused: &[FusedResult], degraded: bool) -> f32 {
        let Some(top) = fused.first() else {
            return 0.0;
        };

        let norm_top = (top.score / self.ranker.max_score()).clamp(0.0, 1.0);
        let gap = match fused.get(1) {
            Some(second) if top.score > 0.0 => {
                ((top.score - second.score) / top.score).clamp(0.0, 1.0)
            }
            _ => 0.0,
        };

        let mut confidence = CONFIDENCE_TOP_WEIGHT * norm_top + CONFIDENCE_GAP_WEIGHT * gap;
        if degraded {
            confidence = confidence.min(DEGRADED_CONFIDENCE_CEILING);
        }
        confidence.clamp(0.0, 1.0)
    }
}

#[async_trait]
impl Retriever for RetrievalService {
    async fn retrieve(
        &self,
        query: &str,
        filters: &SearchFilters,
        top_k: usize,
    ) -> Result<RetrievalOutcome, RetrievalError> {
        let fetch_k = top_k.saturating_mul(OVERSAMPLE_FACTOR).max(top_k);

        let (semantic, lexical) = tokio::join!(
            self.semantic_branch(query, filters, fetch_k),
            self.lexical_branch(query, filters, fetch_k),
        );

        let (semantic, lexical, degraded) = match (semantic, lexical) {
            (Ok(s), Ok(l)) => (s, l, false),
            (Ok(s), Err(e)) => {
                tracing::warn!("Lexical branch failed, degrading to semantic-only: {e}");
                (s, Vec::new(), true)
            }
            (Err(e), Ok(l)) => {
                tracing::warn!("Semantic branch failed, degrading to lexical-only: {e}");
                (Vec::new(), l, true)
            }
            (Err(semantic), Err(lexical)) => {
                return Err(RetrievalError { semantic, lexical });
            }
        };

        let mut fused = self.ranker.fuse(&semantic, &lexical);
        fused.truncate(top_k);

        let confidence = self.confidence(&fused, degraded);

        let passages: Vec<RetrievedPassage> = fused
            .into_iter()
            .filter_map(|f| {
                let document = self.corpus.get(&f.doc_id);
                if document.is_none() {
                    tracing::warn!("Fused candidate {} missing from corpus", f.doc_id);
                }
                document.map(|document| RetrievedPassage {
                    document,
                    score: f.score,
                    semantic_rank: f.semantic_rank,
                    lexical_rank: f.lexical_rank,
                })
            })
            .collect();

        tracing::debug!(
            count = passages.len(),
            confidence,
            degraded,
            "Retrieval completed"
        );

        Ok(RetrievalOutcome {
            passages,
            confidence,
            degraded,
        })
    }
}
