use parking_lot::RwLock;
use std::collections::HashMap;

use crate::models::{Document, DocumentSummary};

/// Read-mostly registry of seeded documents, keyed by id. Mutated only by
/// the seeding path, which runs before query traffic starts.
#[derive(Default)]
pub struct DocumentStore {
    docs: RwLock<HashMap<String, Document>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the corpus wholesale (re-seeding).
    pub fn replace_all(&self, docs: Vec<Document>) {
        let mut map = self.docs.write();
        map.clear();
        for doc in docs {
            map.insert(doc.id.clone(), doc);
        }
    }

    pub fn get(&self, id: &str) -> Option<Document> {
        self.docs.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    /// Summary rows sorted by id for stable listings.
    pub fn summaries(&self) -> Vec<DocumentSummary> {
        let docs = self.docs.read();
        let mut rows: Vec<DocumentSummary> = docs
            .values()
            .map(|d| DocumentSummary {
                id: d.id.clone(),
                title: d.title.clone(),
                category: d.category,
                country: d.country.clone(),
            })
            .collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        rows
    }
}
