//! Integration tests for the travel-rag pipeline.
//!
//! These tests exercise seeding, hybrid retrieval, fusion, and the agent
//! workflow end to end without any network: the embedder is a deterministic
//! vocabulary counter and the chat model is scripted.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use travel_rag::agent::AgentRouter;
use travel_rag::corpus::DocumentStore;
use travel_rag::error::{EmbeddingError, SearchError};
use travel_rag::llm::chat::ChatModel;
use travel_rag::llm::embeddings::{EmbedPurpose, Embedder};
use travel_rag::llm::generate::{AnswerGenerator, GenerationOptions};
use travel_rag::models::{
    AnswerRequest, Category, ChatMessage, Intent, ScoredCandidate, SearchFilters,
};
use travel_rag::search::fusion::FusionRanker;
use travel_rag::search::lexical::LexicalIndex;
use travel_rag::search::retrieve::{RetrievalService, Retriever};
use travel_rag::search::vector::{VectorBackend, VectorMetadata, VectorStore};
use travel_rag::seed::{seed_corpus, seed_documents};

const VOCAB: [&str; 14] = [
    "japan",
    "visa",
    "uae",
    "usa",
    "uk",
    "passport",
    "etiquette",
    "ramadan",
    "law",
    "alcohol",
    "drugs",
    "safety",
    "emergency",
    "earthquake",
];

/// Deterministic embedder: term counts over a fixed vocabulary.
struct VocabEmbedder;

impl VocabEmbedder {
    fn vectorize(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        VOCAB
            .iter()
            .map(|term| lower.matches(term).count() as f32)
            .collect()
    }
}

#[async_trait]
impl Embedder for VocabEmbedder {
    async fn embed(&self, text: &str, _purpose: EmbedPurpose) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        Ok(Self::vectorize(text))
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        purpose: EmbedPurpose,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed(t, purpose).await?);
        }
        Ok(out)
    }
}

struct FixedModel(&'static str);

#[async_trait]
impl ChatModel for FixedModel {
    async fn complete(&self, _messages: &[ChatMessage]) -> anyhow::Result<String> {
        Ok(self.0.to_string())
    }
}

struct DownBackend;

impl VectorBackend for DownBackend {
    fn upsert(
        &self,
        _id: &str,
        _vector: Vec<f32>,
        _metadata: VectorMetadata,
    ) -> Result<(), SearchError> {
        Err(SearchError::Backend("backend down".to_string()))
    }

    fn search(
        &self,
        _query: &[f32],
        _k: usize,
        _filters: &SearchFilters,
    ) -> Result<Vec<ScoredCandidate>, SearchError> {
        Err(SearchError::Backend("backend down".to_string()))
    }
}

struct Pipeline {
    lexical: Arc<LexicalIndex>,
    retrieval: Arc<RetrievalService>,
    router: AgentRouter,
}

async fn build_pipeline() -> Pipeline {
    let corpus = Arc::new(DocumentStore::new());
    let lexical = Arc::new(LexicalIndex::new());
    let vectors = Arc::new(VectorStore::new(VOCAB.len()));
    let embedder = Arc::new(VocabEmbedder);

    seed_corpus(&corpus, &lexical, vectors.as_ref(), embedder.as_ref())
        .await
        .unwrap();

    let retrieval = Arc::new(RetrievalService::new(
        embedder,
        vectors,
        lexical.clone(),
        corpus,
        FusionRanker::new(0.7).unwrap(),
        Duration::from_millis(500),
    ));

    let generator = Arc::new(AnswerGenerator::new(
        Arc::new(FixedModel(
            "Indian citizens need a tourist visa [visa-jp-tourist].",
        )),
        GenerationOptions {
            backoff_base: Duration::ZERO,
            ..GenerationOptions::default()
        },
    ));

    let router = AgentRouter::new(retrieval.clone(), generator, 5);

    Pipeline {
        lexical,
        retrieval,
        router,
    }
}

fn request(query: &str) -> AnswerRequest {
    AnswerRequest {
        query: query.to_string(),
        country: None,
        category: None,
        top_k: None,
        history: None,
    }
}

#[tokio::test]
async fn test_end_to_end_japan_visa_question() {
    let pipeline = build_pipeline().await;

    let response = pipeline
        .router
        .answer(request("What are the visa requirements for Japan?"))
        .await
        .unwrap();

    assert_eq!(response.intent, Intent::RagQuery);
    assert!(response.grounded);
    assert!(!response.degraded);
    assert!(!response.sources.is_empty());
    assert_eq!(response.sources[0].id, "visa-jp-tourist");
    assert!(response.confidence > 0.0 && response.confidence <= 1.0);
    assert!(response.answer.contains("visa"));
}

#[tokio::test]
async fn test_end_to_end_greeting_never_retrieves() {
    let pipeline = build_pipeline().await;

    let response = pipeline.router.answer(request("hello")).await.unwrap();

    assert_eq!(response.intent, Intent::Greeting);
    assert!(response.sources.is_empty());
    assert_eq!(response.confidence, 1.0);
    assert!(!response.degraded);

    // Deterministic template
    let again = pipeline.router.answer(request("hello")).await.unwrap();
    assert_eq!(response.answer, again.answer);
}

#[tokio::test]
async fn test_end_to_end_filters_restrict_sources() {
    let pipeline = build_pipeline().await;

    let mut req = request("What should I know about alcohol and drugs law?");
    req.country = Some("UAE".to_string());
    req.category = Some(Category::Law);

    let response = pipeline.router.answer(req).await.unwrap();

    assert!(!response.sources.is_empty());
    for source in &response.sources {
        assert_eq!(source.country, "UAE");
        assert_eq!(source.category, Category::Law);
    }
}

#[tokio::test]
async fn test_retrieval_outcome_strictly_ordered() {
    let pipeline = build_pipeline().await;

    let outcome = pipeline
        .retrieval
        .retrieve(
            "visa passport law safety",
            &SearchFilters::default(),
            5,
        )
        .await
        .unwrap();

    for pair in outcome.passages.windows(2) {
        assert!(
            pair[0].score >= pair[1].score,
            "passages out of order: {} < {}",
            pair[0].score,
            pair[1].score
        );
    }
}

#[tokio::test]
async fn test_exact_title_is_lexical_rank_one_with_full_overlap() {
    let pipeline = build_pipeline().await;
    let title = &seed_documents()[0].title;

    let results = pipeline
        .lexical
        .search(title, 10, &SearchFilters::default())
        .unwrap();

    assert_eq!(results[0].doc_id, "visa-jp-tourist");
    assert_eq!(results[0].rank, 1);
    assert!((results[0].score - 1.0).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_vector_outage_degrades_but_still_answers() {
    let corpus = Arc::new(DocumentStore::new());
    let lexical = Arc::new(LexicalIndex::new());
    let embedder = Arc::new(VocabEmbedder);

    // Index lexically only; the vector backend is down for search
    let docs = seed_documents();
    for doc in &docs {
        lexical.index_document(doc);
    }
    corpus.replace_all(docs);

    let retrieval = RetrievalService::new(
        embedder,
        Arc::new(DownBackend),
        lexical,
        corpus,
        FusionRanker::new(0.7).unwrap(),
        Duration::from_millis(500),
    );

    let outcome = retrieval
        .retrieve("japan visa requirements", &SearchFilters::default(), 5)
        .await
        .unwrap();

    assert!(outcome.degraded);
    assert!(!outcome.is_empty());
    assert_eq!(outcome.passages[0].document.id, "visa-jp-tourist");
    assert!(outcome.passages.iter().all(|p| p.semantic_rank.is_none()));
    assert!(outcome.confidence <= 0.5);
}

#[tokio::test]
async fn test_empty_corpus_retrieval_is_valid_and_empty() {
    let retrieval = RetrievalService::new(
        Arc::new(VocabEmbedder),
        Arc::new(VectorStore::new(VOCAB.len())),
        Arc::new(LexicalIndex::new()),
        Arc::new(DocumentStore::new()),
        FusionRanker::new(0.7).unwrap(),
        Duration::from_millis(500),
    );

    let outcome = retrieval
        .retrieve("japan visa", &SearchFilters::default(), 5)
        .await
        .unwrap();

    assert!(outcome.is_empty());
    assert_eq!(outcome.confidence, 0.0);
}
