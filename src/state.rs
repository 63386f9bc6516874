use std::sync::Arc;

use crate::agent::AgentRouter;
use crate::config::Config;
use crate::corpus::DocumentStore;
use crate::llm::chat::HttpChatModel;
use crate::llm::embeddings::{Embedder, HttpEmbedder};
use crate::llm::generate::{AnswerGenerator, GenerationOptions};
use crate::search::fusion::FusionRanker;
use crate::search::lexical::LexicalIndex;
use crate::search::retrieve::RetrievalService;
use crate::search::vector::VectorStore;
use crate::seed;

/// Shared application state. All dependencies are constructed here once,
/// at startup, and injected into the services that use them; nothing is
/// resolved through globals at request time.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub corpus: Arc<DocumentStore>,
    pub lexical: Arc<LexicalIndex>,
    pub vectors: Arc<VectorStore>,
    pub embedder: Arc<dyn Embedder>,
    pub retrieval: Arc<RetrievalService>,
    pub generator: Arc<AnswerGenerator>,
    pub router: Arc<AgentRouter>,
    pub http_client: reqwest::Client,
}

impl AppState {
    /// Build the dependency graph. Configuration problems fail here, at
    /// startup, never at request time.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        let corpus = Arc::new(DocumentStore::new());
        let lexical = Arc::new(LexicalIndex::new());
        let vectors = Arc::new(VectorStore::new(config.llm.embedding_dim));
        let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(
            http_client.clone(),
            config.llm.clone(),
        ));

        let ranker = FusionRanker::new(config.search.fusion_alpha)?;
        let retrieval = Arc::new(RetrievalService::new(
            embedder.clone(),
            vectors.clone(),
            lexical.clone(),
            corpus.clone(),
            ranker,
            config.retrieval_timeout(),
        ));

        let chat_model = Arc::new(HttpChatModel::new(http_client.clone(), config.llm.clone()));
        let generator = Arc::new(AnswerGenerator::new(
            chat_model,
            GenerationOptions::default(),
        ));

        let router = Arc::new(AgentRouter::new(
            retrieval.clone(),
            generator.clone(),
            config.search.default_top_k,
        ));

        Ok(Self {
            config,
            corpus,
            lexical,
            vectors,
            embedder,
            retrieval,
            generator,
            router,
            http_client,
        })
    }

    /// Index the document feed. Runs before the listener starts, so the
    /// indexes are never mutated under query traffic.
    pub async fn seed(&self) -> anyhow::Result<usize> {
        seed::seed_corpus(
            &self.corpus,
            &self.lexical,
            self.vectors.as_ref(),
            self.embedder.as_ref(),
        )
        .await
    }
}
