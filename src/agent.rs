use std::sync::Arc;
use uuid::Uuid;

use crate::error::GenerationError;
use crate::llm::generate::AnswerGenerator;
use crate::models::{
    AnswerRequest, AnswerResponse, ChatMessage, Intent, RetrievalOutcome, SearchFilters, SourceRef,
};
use crate::search::retrieve::Retriever;

/// Queries answered with a fixed template, no model or retrieval involved.
const GREETINGS: &[(&str, &str)] = &[
    (
        "hi",
        "Hello! I'm your travel assistant. How can I help you with your travel plans?",
    ),
    (
        "hello",
        "Hello! I'm here to help with travel information. What would you like to know?",
    ),
    (
        "hey",
        "Hey there! Ask me anything about visa requirements, local laws, cultural tips, or travel safety.",
    ),
    (
        "help",
        "I can help you with:\n- Visa requirements and immigration\n- Local laws and regulations\n- Cultural etiquette and customs\n- Safety guidelines\n\nWhat would you like to know?",
    ),
    ("thanks", "You're welcome! Safe travels!"),
    (
        "thank you",
        "You're welcome! Feel free to ask if you have more questions.",
    ),
    ("bye", "Goodbye! Have a great trip!"),
    ("goodbye", "Goodbye! Have a great trip!"),
];

/// A hit on any of these routes the query through retrieval.
const TRAVEL_KEYWORDS: &[&str] = &[
    "visa",
    "passport",
    "immigration",
    "travel",
    "visit",
    "trip",
    "law",
    "legal",
    "regulation",
    "rule",
    "prohibited",
    "allowed",
    "culture",
    "custom",
    "etiquette",
    "tradition",
    "behavior",
    "safe",
    "danger",
    "crime",
    "emergency",
    "health",
    "flight",
    "hotel",
    "transport",
    "accommodation",
    "currency",
    "food",
    "restaurant",
    "eat",
    "drink",
    "cuisine",
];

/// Classify a raw query into exactly one intent. Greeting detection is an
/// exact match on the normalized query; the travel-keyword scan is a
/// substring check, matching what the corpus actually covers.
pub fn classify_intent(query: &str) -> Intent {
    let normalized = query
        .trim()
        .trim_end_matches(['!', '.', '?'])
        .to_lowercase();

    if GREETINGS.iter().any(|(g, _)| *g == normalized) {
        return Intent::Greeting;
    }
    if TRAVEL_KEYWORDS.iter().any(|k| normalized.contains(k)) {
        return Intent::RagQuery;
    }
    Intent::GeneralChat
}

/// Fixed templated reply for a greeting query.
pub fn greeting_answer(query: &str) -> String {
    let normalized = query
        .trim()
        .trim_end_matches(['!', '.', '?'])
        .to_lowercase();
    GREETINGS
        .iter()
        .find(|(g, _)| *g == normalized)
        .map(|(_, answer)| answer.to_string())
        .unwrap_or_else(|| {
            "Hello! Ask me about visa requirements, local laws, cultural etiquette, or travel safety.".to_string()
        })
}

/// Workflow position. The machine only ever moves forward; no state is
/// revisited within a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Classify,
    Greet,
    RetrieveAndAnswer,
    GeneralAnswer,
    Done,
}

/// Per-request working record, owned exclusively by one in-flight request
/// and threaded through the workflow by value.
struct AgentState {
    request_id: Uuid,
    query: String,
    filters: SearchFilters,
    history: Vec<ChatMessage>,
    top_k: usize,
    intent: Option<Intent>,
    outcome: Option<RetrievalOutcome>,
    answer: Option<String>,
    confidence: f32,
    grounded: bool,
    degraded: bool,
}

impl AgentState {
    fn into_response(self) -> AnswerResponse {
        let sources = self
            .outcome
            .as_ref()
            .map(source_refs)
            .unwrap_or_default();

        AnswerResponse {
            answer: self
                .answer
                .unwrap_or_else(|| "No response generated".to_string()),
            sources,
            confidence: self.confidence,
            degraded: self.degraded,
            grounded: self.grounded,
            intent: self.intent.expect("intent assigned before Done"),
            request_id: self.request_id,
        }
    }
}

pub fn source_refs(outcome: &RetrievalOutcome) -> Vec<SourceRef> {
    outcome
        .passages
        .iter()
        .map(|p| SourceRef {
            id: p.document.id.clone(),
            title: p.document.title.clone(),
            score: p.score,
            category: p.document.category,
            country: p.document.country.clone(),
        })
        .collect()
}

/// Routes each query through a fixed workflow:
///
/// ```text
/// Start ── Classify ──┬── Greet ─────────────────┐
///                     ├── RetrieveAndAnswer ──┐  │
///                     │         │ (retrieval  │  ├── Done
///                     │         ▼  failed)    │  │
///                     └── GeneralAnswer ───────┘──┘
/// ```
///
/// Classify is the only branching point; the edge from RetrieveAndAnswer to
/// GeneralAnswer is a deliberate recovery path, not an error path. Exactly
/// one query is processed per invocation and nothing is shared across
/// requests.
pub struct AgentRouter {
    retrieval: Arc<dyn Retriever>,
    generator: Arc<AnswerGenerator>,
    default_top_k: usize,
}

impl AgentRouter {
    pub fn new(
        retrieval: Arc<dyn Retriever>,
        generator: Arc<AnswerGenerator>,
        default_top_k: usize,
    ) -> Self {
        Self {
            retrieval,
            generator,
            default_top_k,
        }
    }

    /// Answer one query. Only an exhausted answer-generation retry budget
    /// surfaces as an error; retrieval failures degrade instead.
    pub async fn answer(&self, request: AnswerRequest) -> Result<AnswerResponse, GenerationError> {
        let request_id = Uuid::new_v4();
        let mut state = AgentState {
            request_id,
            query: request.query.trim().to_string(),
            filters: SearchFilters {
                country: request.country,
                category: request.category,
            },
            history: request.history.unwrap_or_default(),
            top_k: request.top_k.unwrap_or(self.default_top_k),
            intent: None,
            outcome: None,
            answer: None,
            confidence: 0.0,
            grounded: false,
            degraded: false,
        };

        let mut step = Step::Classify;
        loop {
            step = match step {
                Step::Classify => {
                    let intent = classify_intent(&state.query);
                    state.intent = Some(intent);
                    tracing::info!(%request_id, ?intent, "Query classified");
                    match intent {
                        Intent::Greeting => Step::Greet,
                        Intent::RagQuery => Step::RetrieveAndAnswer,
                        Intent::GeneralChat => Step::GeneralAnswer,
                    }
                }
                Step::Greet => {
                    state.answer = Some(greeting_answer(&state.query));
                    state.confidence = 1.0;
                    Step::Done
                }
                Step::RetrieveAndAnswer => {
                    match self
                        .retrieval
                        .retrieve(&state.query, &state.filters, state.top_k)
                        .await
                    {
                        Ok(outcome) => {
                            let generated = self
                                .generator
                                .generate_grounded(&state.query, &state.history, &outcome)
                                .await?;
                            state.confidence = outcome.confidence;
                            state.grounded = !generated.cited_ids.is_empty();
                            state.answer = Some(generated.text);
                            state.outcome = Some(outcome);
                            Step::Done
                        }
                        Err(e) => {
                            tracing::warn!(%request_id, "Retrieval failed, answering ungrounded: {e}");
                            state.degraded = true;
                            Step::GeneralAnswer
                        }
                    }
                }
                Step::GeneralAnswer => {
                    let generated = self
                        .generator
                        .generate_open(&state.query, &state.history)
                        .await?;
                    state.answer = Some(generated.text);
                    state.grounded = false;
                    state.confidence = 0.0;
                    Step::Done
                }
                Step::Done => break,
            };
        }

        Ok(state.into_response())
    }
}
