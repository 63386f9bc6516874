use std::convert::Infallible;
use std::pin::Pin;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::Json;
use futures_util::stream::{self, Stream, StreamExt};

use crate::agent::{classify_intent, greeting_answer, source_refs};
use crate::llm::generate::INSUFFICIENT_INFO_ANSWER;
use crate::llm::stream::stream_answer;
use crate::models::{AnswerRequest, AnswerResponse, Intent, RetrievalOutcome, SearchFilters};
use crate::search::retrieve::Retriever;
use crate::state::AppState;

const MAX_QUERY_LEN: usize = 2_000;
const IDLE_TIMEOUT_SECS: u64 = 30;

/// POST /api/answer - classify, retrieve, generate, return the full
/// response in one JSON body.
pub async fn answer(
    State(state): State<AppState>,
    Json(mut req): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, (StatusCode, String)> {
    req.query = validate_query(&req.query)?;

    let response = state.router.answer(req).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Answer generation failed: {e}"),
        )
    })?;

    Ok(Json(response))
}

type EventStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

/// POST /api/answer/stream - SSE variant: a `meta` event carrying intent,
/// sources, confidence and the degraded flag, then `delta` content events,
/// then `done`.
pub async fn answer_stream(
    State(state): State<AppState>,
    Json(req): Json<AnswerRequest>,
) -> Result<Sse<EventStream>, (StatusCode, String)> {
    let query = validate_query(&req.query)?;
    let filters = SearchFilters {
        country: req.country.clone(),
        category: req.category,
    };
    let top_k = req.top_k.unwrap_or(state.config.search.default_top_k);
    let history = req.history.clone().unwrap_or_default();

    let intent = classify_intent(&query);

    // Fixed-template paths never touch the model: emit the whole answer as
    // a single delta.
    if intent == Intent::Greeting {
        let outcome = RetrievalOutcome {
            confidence: 1.0,
            ..RetrievalOutcome::empty()
        };
        return Ok(canned_sse(intent, &outcome, false, greeting_answer(&query)));
    }

    let (outcome, degraded) = match intent {
        Intent::RagQuery => match state.retrieval.retrieve(&query, &filters, top_k).await {
            Ok(outcome) => (outcome, false),
            Err(e) => {
                tracing::warn!("Retrieval failed on streaming path, answering ungrounded: {e}");
                (RetrievalOutcome::empty(), true)
            }
        },
        _ => (RetrievalOutcome::empty(), false),
    };

    if intent == Intent::RagQuery && outcome.is_empty() && !degraded {
        return Ok(canned_sse(
            intent,
            &outcome,
            false,
            INSUFFICIENT_INFO_ANSWER.to_string(),
        ));
    }

    let messages = if outcome.is_empty() {
        state.generator.open_messages(&query, &history)
    } else {
        state
            .generator
            .grounded_messages(&query, &history, &outcome)
            .0
    };

    let meta_event = meta_event(intent, &outcome, degraded);

    let llm_stream = stream_answer(&state.http_client, &state.config.llm, messages)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("LLM error: {e}")))?;

    // Map deltas to SSE events, cutting the stream off when the provider
    // goes idle.
    let idle_timeout = Duration::from_secs(IDLE_TIMEOUT_SECS);
    let delta_stream = futures_util::stream::unfold(
        (llm_stream, idle_timeout),
        |(mut llm_stream, timeout)| async move {
            match tokio::time::timeout(timeout, llm_stream.next()).await {
                Ok(Some(Ok(content))) => {
                    let event: Result<Event, Infallible> = Ok(Event::default()
                        .event("delta")
                        .json_data(serde_json::json!({ "content": content }))
                        .unwrap());
                    Some((event, (llm_stream, timeout)))
                }
                Ok(Some(Err(e))) => {
                    let event: Result<Event, Infallible> = Ok(Event::default()
                        .event("error")
                        .json_data(serde_json::json!({ "message": e.to_string() }))
                        .unwrap());
                    Some((event, (llm_stream, Duration::ZERO)))
                }
                Ok(None) => None,
                Err(_) => {
                    let event: Result<Event, Infallible> = Ok(Event::default()
                        .event("error")
                        .json_data(
                            serde_json::json!({ "message": "LLM response timed out (idle)" }),
                        )
                        .unwrap());
                    // Duration::ZERO makes the next poll time out too, which
                    // ends the stream.
                    Some((event, (llm_stream, Duration::ZERO)))
                }
            }
        },
    );

    let done_event: Result<Event, Infallible> = Ok(Event::default()
        .event("done")
        .json_data(serde_json::json!({}))
        .unwrap());

    let event_stream = stream::once(async move { Ok(meta_event) })
        .chain(delta_stream)
        .chain(stream::once(async move { done_event }));

    Ok(Sse::new(Box::pin(event_stream) as EventStream))
}

fn validate_query(raw: &str) -> Result<String, (StatusCode, String)> {
    let query = raw.trim();
    if query.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Query is required".to_string()));
    }
    Ok(truncate_to_char_boundary(query, MAX_QUERY_LEN))
}

fn meta_event(intent: Intent, outcome: &RetrievalOutcome, degraded: bool) -> Event {
    Event::default()
        .event("meta")
        .json_data(serde_json::json!({
            "intent": intent,
            "sources": source_refs(outcome),
            "confidence": outcome.confidence,
            "degraded": degraded,
            "grounded": !outcome.is_empty(),
        }))
        .unwrap()
}

fn canned_sse(
    intent: Intent,
    outcome: &RetrievalOutcome,
    degraded: bool,
    answer: String,
) -> Sse<EventStream> {
    let events: Vec<Result<Event, Infallible>> = vec![
        Ok(meta_event(intent, outcome, degraded)),
        Ok(Event::default()
            .event("delta")
            .json_data(serde_json::json!({ "content": answer }))
            .unwrap()),
        Ok(Event::default()
            .event("done")
            .json_data(serde_json::json!({}))
            .unwrap()),
    ];
    Sse::new(Box::pin(stream::iter(events)) as EventStream)
}

fn truncate_to_char_boundary(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    s.char_indices()
        .take_while(|(i, _)| *i < max_len)
        .map(|(_, c)| c)
        .collect()
}
