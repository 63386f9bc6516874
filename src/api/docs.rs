use axum::extract::State;
use axum::Json;

use crate::models::DocumentSummary;
use crate::state::AppState;

/// GET /api/health - liveness plus corpus size.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "documents": state.corpus.len(),
        "provider": state.config.llm.provider,
    }))
}

/// GET /api/documents - seeded-corpus summary, sorted by id.
pub async fn list_documents(State(state): State<AppState>) -> Json<Vec<DocumentSummary>> {
    Json(state.corpus.summaries())
}
