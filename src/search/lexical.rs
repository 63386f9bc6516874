use parking_lot::RwLock;
use std::collections::HashSet;

use crate::error::LexicalError;
use crate::models::{Category, Document, ScoredCandidate, SearchFilters};

/// Term set plus filterable metadata for one indexed document.
struct LexicalEntry {
    doc_id: String,
    terms: HashSet<String>,
    country: String,
    category: Category,
}

/// In-process keyword index scoring documents by normalized term overlap:
/// for query terms Q (lower-cased, deduplicated) and document terms D,
/// score = |Q ∩ D| / |Q|, a value in [0, 1]. Zero-overlap documents are
/// excluded from results. Fully deterministic; the only failure mode is an
/// empty query.
#[derive(Default)]
pub struct LexicalIndex {
    entries: RwLock<Vec<LexicalEntry>>,
}

/// Lower-cased alphanumeric terms of `text`, in order of appearance.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn term_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

impl LexicalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a document's title and body terms. Replaces a previous entry
    /// with the same id.
    pub fn index_document(&self, doc: &Document) {
        let mut terms = term_set(&doc.title);
        terms.extend(term_set(&doc.body));

        let mut entries = self.entries.write();
        entries.retain(|e| e.doc_id != doc.id);
        entries.push(LexicalEntry {
            doc_id: doc.id.clone(),
            terms,
            country: doc.country.clone(),
            category: doc.category,
        });
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Rank documents by fraction of query terms present in the document.
    /// Ties are broken by id ascending; ranks are 1-based.
    pub fn search(
        &self,
        query: &str,
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<ScoredCandidate>, LexicalError> {
        let query_terms: HashSet<String> = term_set(query);
        if query_terms.is_empty() {
            return Err(LexicalError::EmptyQuery);
        }

        let entries = self.entries.read();
        let mut scored: Vec<(f32, &str)> = entries
            .iter()
            .filter(|e| filters.matches(&e.country, e.category))
            .filter_map(|e| {
                let overlap = query_terms.intersection(&e.terms).count();
                if overlap == 0 {
                    return None;
                }
                let score = overlap as f32 / query_terms.len() as f32;
                Some((score, e.doc_id.as_str()))
            })
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
            .map(|(i, (score, doc_id))| ScoredCandidate {
                doc_id: doc_id.to_string(),
                score,
                rank: i + 1,
            })
            .collect())
    }
}
