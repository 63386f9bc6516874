//! # travel-rag
//!
//! A travel-assistant question-answering service. Natural-language queries
//! are routed through a small agent workflow and answered from a curated
//! knowledge base using hybrid retrieval with source attribution and a
//! confidence score.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌──────────────┐
//!                    │  User Query   │
//!                    └──────┬────────┘
//!                           │
//!                           ▼
//!                    ┌──────────────┐
//!                    │   Classify    │  keyword heuristic
//!                    └──────┬────────┘
//!           ┌───────────────┼────────────────┐
//!           ▼               ▼                ▼
//!     ┌──────────┐  ┌───────────────┐  ┌─────────────┐
//!     │  Greet    │  │ Retrieve +    │  │  General    │
//!     │ (canned)  │  │ Answer        │  │  Answer     │
//!     └─────┬─────┘  └──────┬────────┘  │ (ungrounded)│
//!           │               │  on total  └──────┬──────┘
//!           │               │  retrieval        │
//!           │               │  failure ─────────┘
//!           │               ▼
//!           │    ┌─────────────────────┐
//!           │    │ semantic ∥ lexical  │  concurrent branches,
//!           │    │ search              │  per-branch timeout
//!           │    └──────────┬──────────┘
//!           │               ▼
//!           │    ┌─────────────────────┐
//!           │    │ RRF fusion (α-blend)│  rank-based, K = 60
//!           │    └──────────┬──────────┘
//!           │               ▼
//!           │    ┌─────────────────────┐
//!           │    │ grounded generation │  bounded context,
//!           │    │ with citations      │  retry + backoff
//!           │    └──────────┬──────────┘
//!           └───────────────┼──────────────────┐
//!                           ▼                  │
//!                    ┌──────────────┐          │
//!                    │   Response    │◄────────┘
//!                    │ answer, sources, confidence, degraded
//!                    └──────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration with fail-fast validation
//! - [`error`] - Typed error taxonomy for every component boundary
//! - [`models`] - Shared data types: `Document`, fusion results, request/response types
//! - [`corpus`] - In-memory registry of the seeded reference documents
//! - [`search::lexical`] - Term-overlap keyword index
//! - [`search::vector`] - Similarity-search backend seam and in-memory store
//! - [`search::fusion`] - Reciprocal Rank Fusion with a configurable branch blend
//! - [`search::retrieve`] - Concurrent hybrid retrieval with degraded-mode handling
//! - [`llm`] - Embedding, chat, and streaming calls against Ollama or OpenAI-compatible APIs
//! - [`llm::generate`] - Grounding-context construction and retried answer generation
//! - [`agent`] - Intent classification and the four-state answer workflow
//! - [`api`] - Axum HTTP handlers for answering, streaming, and corpus inspection
//! - [`seed`] - Curated document feed indexed at startup
//! - [`state`] - Shared application state wiring all dependencies together

pub mod agent;
pub mod api;
pub mod config;
pub mod corpus;
pub mod error;
pub mod llm;
pub mod models;
pub mod search;
pub mod seed;
pub mod state;
