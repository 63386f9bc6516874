use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Travel information categories covered by the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Visa,
    Culture,
    Law,
    Safety,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Visa => "visa",
            Category::Culture => "culture",
            Category::Law => "law",
            Category::Safety => "safety",
        }
    }
}

/// An immutable reference document, created at seed time and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub body: String,
    pub category: Category,
    pub country: String,
    /// Where the information came from (embassy site, government advisory).
    pub source: Option<String>,
    pub last_updated: Option<NaiveDate>,
    /// Editorial reliability estimate in [0, 1].
    pub reliability: f32,
}

/// One entry produced by a single retrieval method, before fusion.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub doc_id: String,
    pub score: f32,
    /// 1-based position in the method's own ranking.
    pub rank: usize,
}

/// A fused entry: document id, blended score, and the ranks that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedResult {
    pub doc_id: String,
    pub score: f32,
    pub semantic_rank: Option<usize>,
    pub lexical_rank: Option<usize>,
}

impl FusedResult {
    /// The better (smaller) of the two contributing ranks.
    pub fn best_rank(&self) -> usize {
        match (self.semantic_rank, self.lexical_rank) {
            (Some(s), Some(l)) => s.min(l),
            (Some(s), None) => s,
            (None, Some(l)) => l,
            (None, None) => usize::MAX,
        }
    }
}

/// Exact-match metadata filters; an empty filter matches everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    pub country: Option<String>,
    pub category: Option<Category>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.country.is_none() && self.category.is_none()
    }

    /// Conjunction of the set fields.
    pub fn matches(&self, country: &str, category: Category) -> bool {
        self.country
            .as_deref()
            .is_none_or(|c| c.eq_ignore_ascii_case(country))
            && self.category.is_none_or(|c| c == category)
    }
}

/// A document that survived fusion, resolved and ready for grounding.
#[derive(Debug, Clone)]
pub struct RetrievedPassage {
    pub document: Document,
    pub score: f32,
    pub semantic_rank: Option<usize>,
    pub lexical_rank: Option<usize>,
}

/// Top-K fused passages plus a scalar confidence, one per query.
#[derive(Debug, Clone, Default)]
pub struct RetrievalOutcome {
    pub passages: Vec<RetrievedPassage>,
    /// Scalar certainty in [0, 1]; 0.0 when nothing was found.
    pub confidence: f32,
    /// True when one retrieval branch failed and the outcome was built
    /// from the surviving branch alone.
    pub degraded: bool,
}

impl RetrievalOutcome {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

/// Classified intent of an incoming query. Computed once per request,
/// immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    RagQuery,
    GeneralChat,
}

/// A single chat turn (user or assistant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Answer request
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerRequest {
    pub query: String,
    pub country: Option<String>,
    pub category: Option<Category>,
    pub top_k: Option<usize>,
    pub history: Option<Vec<ChatMessage>>,
}

/// Source reference attached to an answer.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    pub id: String,
    pub title: String,
    pub score: f32,
    pub category: Category,
    pub country: String,
}

/// Answer response
#[derive(Debug, Clone, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub confidence: f32,
    /// True iff the grounded path fell back to an ungrounded answer.
    pub degraded: bool,
    /// False when the answer was produced without retrieved context.
    pub grounded: bool,
    pub intent: Intent,
    pub request_id: Uuid,
}

/// Seeded-corpus summary row for the documents listing.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    pub category: Category,
    pub country: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serializes_to_snake_case() {
        let json = serde_json::to_value(Category::Visa).unwrap();
        assert_eq!(json, "visa");
        let json = serde_json::to_value(Category::Safety).unwrap();
        assert_eq!(json, "safety");
    }

    #[test]
    fn test_intent_round_trips() {
        let json = serde_json::to_string(&Intent::RagQuery).unwrap();
        assert_eq!(json, "\"rag_query\"");
        let back: Intent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Intent::RagQuery);
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filters = SearchFilters::default();
        assert!(filters.is_empty());
        assert!(filters.matches("Japan", Category::Visa));
        assert!(filters.matches("UAE", Category::Law));
    }

    #[test]
    fn test_filter_conjunction() {
        let filters = SearchFilters {
            country: Some("Japan".to_string()),
            category: Some(Category::Visa),
        };
        assert!(filters.matches("Japan", Category::Visa));
        assert!(!filters.matches("Japan", Category::Culture));
        assert!(!filters.matches("USA", Category::Visa));
    }

    #[test]
    fn test_filter_country_is_case_insensitive() {
        let filters = SearchFilters {
            country: Some("japan".to_string()),
            category: None,
        };
        assert!(filters.matches("Japan", Category::Law));
    }

    #[test]
    fn test_best_rank_prefers_smaller() {
        let fused = FusedResult {
            doc_id: "a".into(),
            score: 0.5,
            semantic_rank: Some(3),
            lexical_rank: Some(1),
        };
        assert_eq!(fused.best_rank(), 1);

        let only_semantic = FusedResult {
            doc_id: "b".into(),
            score: 0.2,
            semantic_rank: Some(7),
            lexical_rank: None,
        };
        assert_eq!(only_semantic.best_rank(), 7);
    }
}
