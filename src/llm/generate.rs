use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::error::GenerationError;
use crate::llm::chat::ChatModel;
use crate::llm::sanitize_for_prompt;
use crate::models::{ChatMessage, RetrievalOutcome};

/// Tuning for answer generation. Defaults are production values; tests
/// shrink the backoff to zero.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Hard ceiling on model-call attempts per answer.
    pub max_attempts: u32,
    /// First retry delay; doubles per attempt, plus jitter.
    pub backoff_base: Duration,
    /// Character budget for the grounding context.
    pub context_budget_chars: usize,
    /// Most recent history turns kept in the prompt.
    pub max_history_turns: usize,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(250),
            context_budget_chars: 6_000,
            max_history_turns: 10,
        }
    }
}

/// A generated answer plus the ids of the passages that made it into the
/// grounding context.
#[derive(Debug, Clone)]
pub struct GeneratedAnswer {
    pub text: String,
    pub cited_ids: Vec<String>,
}

/// Wraps the chat model: builds a bounded grounding context from retrieved
/// passages and produces a cited answer, retrying transient model failures
/// with jittered exponential backoff.
pub struct AnswerGenerator {
    model: Arc<dyn ChatModel>,
    options: GenerationOptions,
}

/// Fixed reply when retrieval came back empty; the model is never called
/// without grounding on this path.
pub const INSUFFICIENT_INFO_ANSWER: &str = "I couldn't find information about that in my \
    knowledge base. Could you rephrase the question, or narrow it to a country and topic \
    (visa, culture, law, or safety)?";

impl AnswerGenerator {
    pub fn new(model: Arc<dyn ChatModel>, options: GenerationOptions) -> Self {
        Self { model, options }
    }

    /// Answer from retrieved passages. An empty outcome short-circuits to
    /// the insufficient-information template.
    pub async fn generate_grounded(
        &self,
        query: &str,
        history: &[ChatMessage],
        outcome: &RetrievalOutcome,
    ) -> Result<GeneratedAnswer, GenerationError> {
        if outcome.is_empty() {
            return Ok(GeneratedAnswer {
                text: INSUFFICIENT_INFO_ANSWER.to_string(),
                cited_ids: Vec::new(),
            });
        }

        let (messages, cited_ids) = self.grounded_messages(query, history, outcome);
        let text = self.complete_with_retry(&messages).await?;
        Ok(GeneratedAnswer { text, cited_ids })
    }

    /// Open-domain answer with no grounding context, clearly framed as such
    /// for the model. Used by the router's ungrounded branch.
    pub async fn generate_open(
        &self,
        query: &str,
        history: &[ChatMessage],
    ) -> Result<GeneratedAnswer, GenerationError> {
        let messages = self.open_messages(query, history);
        let text = self.complete_with_retry(&messages).await?;
        Ok(GeneratedAnswer {
            text,
            cited_ids: Vec::new(),
        })
    }

    /// Prompt for the grounded path. Public so the streaming handler can
    /// reuse the exact same prompt construction.
    pub fn grounded_messages(
        &self,
        query: &str,
        history: &[ChatMessage],
        outcome: &RetrievalOutcome,
    ) -> (Vec<ChatMessage>, Vec<String>) {
        let (context_block, cited_ids) =
            build_context_block(outcome, self.options.context_budget_chars);

        let system = "You are a travel assistant covering visa requirements, local laws, \
            cultural etiquette, and safety guidance.\n\
            Each user message includes reference passages retrieved from a curated knowledge base.\n\
            Answer ONLY from the provided passages. Never invent facts.\n\
            Cite passages by their bracketed ids, e.g. [visa-jp-tourist].\n\
            If the passages don't answer the question, say what they do cover and what is missing.";

        let mut messages = vec![ChatMessage {
            role: "system".to_string(),
            content: system.to_string(),
        }];
        messages.extend(clean_history(history, self.options.max_history_turns));
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: format!(
                "{context_block}---\nQuestion: {}",
                sanitize_for_prompt(query)
            ),
        });

        (messages, cited_ids)
    }

    /// Prompt for the ungrounded path.
    pub fn open_messages(&self, query: &str, history: &[ChatMessage]) -> Vec<ChatMessage> {
        let system = "You are a travel assistant. No reference passages are available for \
            this question, so answer from general knowledge, state clearly that the answer \
            is not backed by the curated knowledge base, and recommend verifying details \
            with official sources such as embassies or government advisories.";

        let mut messages = vec![ChatMessage {
            role: "system".to_string(),
            content: system.to_string(),
        }];
        messages.extend(clean_history(history, self.options.max_history_turns));
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: sanitize_for_prompt(query),
        });
        messages
    }

    async fn complete_with_retry(
        &self,
        messages: &[ChatMessage],
    ) -> Result<String, GenerationError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.model.complete(messages).await {
                Ok(text) => return Ok(text),
                Err(source) if attempt >= self.options.max_attempts => {
                    return Err(GenerationError {
                        attempts: attempt,
                        source,
                    });
                }
                Err(e) => {
                    let delay = backoff_delay(self.options.backoff_base, attempt);
                    tracing::warn!(
                        attempt,
                        "Model call failed: {e}; retrying in {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Exponential delay for the given 1-based attempt, with jitter of up to
/// one base interval so concurrent retries don't stampede.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = base.saturating_mul(1u32 << (attempt - 1).min(8));
    let jitter_ms = if base.is_zero() {
        0
    } else {
        rand::rng().random_range(0..=base.as_millis() as u64)
    };
    exp + Duration::from_millis(jitter_ms)
}

/// Format passages into the grounding block, in fused-rank order, dropping
/// from the tail once the budget is exceeded. The head passage is always
/// included; if it alone overflows the budget its body is cut at a char
/// boundary instead.
fn build_context_block(outcome: &RetrievalOutcome, budget_chars: usize) -> (String, Vec<String>) {
    let mut block = String::from("Reference passages from the travel knowledge base:\n\n");
    let mut cited = Vec::new();

    for (i, passage) in outcome.passages.iter().enumerate() {
        let doc = &passage.document;
        let mut part = String::new();
        write!(
            part,
            "## Source {}: {} [{}]\n*Country: {} | Category: {}",
            i + 1,
            sanitize_for_prompt(&doc.title),
            doc.id,
            doc.country,
            doc.category.as_str(),
        )
        .unwrap();
        if let Some(updated) = doc.last_updated {
            write!(part, " | Updated: {updated}").unwrap();
        }
        writeln!(part, "*\n{}\n", sanitize_for_prompt(&doc.body)).unwrap();

        if block.len() + part.len() > budget_chars {
            if cited.is_empty() {
                block.push_str(truncate_to_char_boundary(
                    &part,
                    budget_chars.saturating_sub(block.len()),
                ));
                block.push('\n');
                cited.push(doc.id.clone());
            }
            break;
        }

        block.push_str(&part);
        cited.push(doc.id.clone());
    }

    (block, cited)
}

fn clean_history(history: &[ChatMessage], max_turns: usize) -> Vec<ChatMessage> {
    let kept: Vec<ChatMessage> = history
        .iter()
        .filter(|m| m.role == "user" || m.role == "assistant")
        .map(|m| ChatMessage {
            role: m.role.clone(),
            content: sanitize_for_prompt(&m.content),
        })
        .collect();
    let skip = kept.len().saturating_sub(max_turns);
    kept.into_iter().skip(skip).collect()
}

fn truncate_to_char_boundary(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
