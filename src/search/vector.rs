use parking_lot::RwLock;

use crate::error::SearchError;
use crate::models::{Category, ScoredCandidate, SearchFilters};

/// Metadata stored alongside each vector, used for exact-match filtering.
#[derive(Debug, Clone)]
pub struct VectorMetadata {
    pub country: String,
    pub category: Category,
}

/// Similarity-search backend contract. The retrieval service only depends
/// on this seam; the in-memory store below is the default backend and its
/// persistence internals stay opaque to callers.
pub trait VectorBackend: Send + Sync {
    fn upsert(
        &self,
        id: &str,
        vector: Vec<f32>,
        metadata: VectorMetadata,
    ) -> Result<(), SearchError>;

    /// Nearest stored vectors by cosine similarity, descending, ties broken
    /// by id ascending. Ranks in the returned candidates are 1-based.
    fn search(
        &self,
        query: &[f32],
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<ScoredCandidate>, SearchError>;
}

struct VectorEntry {
    id: String,
    embedding: Vec<f32>,
    metadata: VectorMetadata,
}

/// In-memory vector store with cosine similarity search.
pub struct VectorStore {
    dim: usize,
    entries: RwLock<Vec<VectorEntry>>,
}

impl VectorStore {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl VectorBackend for VectorStore {
    fn upsert(
        &self,
        id: &str,
        vector: Vec<f32>,
        metadata: VectorMetadata,
    ) -> Result<(), SearchError> {
        if vector.len() != self.dim {
            return Err(SearchError::DimensionMismatch {
                expected: self.dim,
                got: vector.len(),
            });
        }

        let mut entries = self.entries.write();
        entries.retain(|e| e.id != id);
        entries.push(VectorEntry {
            id: id.to_string(),
            embedding: vector,
            metadata,
        });
        Ok(())
    }

    fn search(
        &self,
        query: &[f32],
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<ScoredCandidate>, SearchError> {
        if query.len() != self.dim {
            return Err(SearchError::DimensionMismatch {
                expected: self.dim,
                got: query.len(),
            });
        }

        let entries = self.entries.read();
        let mut scored: Vec<(f32, &str)> = entries
            .iter()
            .filter(|e| filters.matches(&e.metadata.country, e.metadata.category))
            .map(|e| (cosine_similarity(query, &e.embedding), e.id.as_str()))
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(b.1))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(i, (score, id))| ScoredCandidate {
                doc_id: id.to_string(),
                score,
                rank: i + 1,
            })
            .collect())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}
