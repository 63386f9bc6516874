use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::EmbeddingError;

/// Whether a text is embedded as a search query or as corpus content.
/// Asymmetric encoders produce different vectors for the two roles, so the
/// purpose is part of the embedding contract, not a hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedPurpose {
    Query,
    Document,
}

impl EmbedPurpose {
    /// Instruction prefix understood by nomic-style embedding models.
    fn prefix(&self) -> &'static str {
        match self {
            EmbedPurpose::Query => "search_query: ",
            EmbedPurpose::Document => "search_document: ",
        }
    }
}

/// Embedding seam. Services depend on this trait so they can run against a
/// deterministic stub in tests.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text. Deterministic for identical (text, purpose).
    async fn embed(&self, text: &str, purpose: EmbedPurpose) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed a batch, preserving input order. A partial failure fails the
    /// whole batch so index construction stays atomic.
    async fn embed_batch(
        &self,
        texts: &[String],
        purpose: EmbedPurpose,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Maximum characters sent per text to the embedding API. Travel documents
/// run a few kilobytes at most; this keeps even dense bodies well under an
/// 8k-token context.
const MAX_EMBED_CHARS: usize = 3_000;

/// Truncate `text` to at most `MAX_EMBED_CHARS`, splitting on a UTF-8 char
/// boundary.
fn truncate_for_embedding(text: &str) -> &str {
    if text.len() <= MAX_EMBED_CHARS {
        return text;
    }
    let mut end = MAX_EMBED_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Embedder backed by the configured HTTP provider (Ollama or an
/// OpenAI-compatible API).
pub struct HttpEmbedder {
    client: reqwest::Client,
    config: LlmConfig,
}

impl HttpEmbedder {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str, purpose: EmbedPurpose) -> Result<Vec<f32>, EmbeddingError> {
        let vectors = self.embed_batch(&[text.to_string()], purpose).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Provider(anyhow::anyhow!("no embedding returned")))
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        purpose: EmbedPurpose,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(EmbeddingError::EmptyInput);
        }

        let prepared: Vec<String> = texts
            .iter()
            .map(|t| format!("{}{}", purpose.prefix(), truncate_for_embedding(t)))
            .collect();

        let embeddings = match self.config.provider.as_str() {
            "ollama" => embed_ollama(&self.client, &self.config, &prepared)
                .await
                .map_err(EmbeddingError::Provider)?,
            "openai" => embed_openai(&self.client, &self.config, &prepared)
                .await
                .map_err(EmbeddingError::Provider)?,
            other => return Err(EmbeddingError::UnknownProvider(other.to_string())),
        };

        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::Provider(anyhow::anyhow!(
                "provider returned {} embeddings for {} inputs",
                embeddings.len(),
                texts.len()
            )));
        }
        for embedding in &embeddings {
            if embedding.len() != self.config.embedding_dim {
                return Err(EmbeddingError::WrongDimension {
                    expected: self.config.embedding_dim,
                    got: embedding.len(),
                });
            }
        }

        Ok(embeddings)
    }
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaEmbedRequest {
    model: String,
    input: Vec<String>,
    /// Ask Ollama to silently truncate inputs that exceed the model's
    /// context length instead of returning a 400 error.
    truncate: bool,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

async fn embed_ollama(
    client: &reqwest::Client,
    config: &LlmConfig,
    texts: &[String],
) -> anyhow::Result<Vec<Vec<f32>>> {
    let url = format!("{}/api/embed", config.base_url);

    let batch_size = 32;
    let mut all_embeddings = Vec::new();

    for chunk in texts.chunks(batch_size) {
        let req = OllamaEmbedRequest {
            model: config.embedding_model.clone(),
            input: chunk.to_vec(),
            truncate: true,
        };

        let resp = client
            .post(&url)
            .json(&req)
            .send()
            .await
            .context("Failed to call Ollama embed API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Ollama embed API returned {status}: {body}");
        }

        let body: OllamaEmbedResponse = resp
            .json()
            .await
            .context("Failed to parse Ollama embed response")?;

        all_embeddings.extend(body.embeddings);
    }

    Ok(all_embeddings)
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiEmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedData>,
}

#[derive(Deserialize)]
struct OpenAiEmbedData {
    embedding: Vec<f32>,
}

async fn embed_openai(
    client: &reqwest::Client,
    config: &LlmConfig,
    texts: &[String],
) -> anyhow::Result<Vec<Vec<f32>>> {
    let url = format!("{}/v1/embeddings", config.base_url);
    let api_key = config.api_key.as_deref().unwrap_or_default();

    let batch_size = 64;
    let mut all_embeddings = Vec::new();

    for chunk in texts.chunks(batch_size) {
        let req = OpenAiEmbedRequest {
            model: config.embedding_model.clone(),
            input: chunk.to_vec(),
        };

        let resp = client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&req)
            .send()
            .await
            .context("Failed to call OpenAI embed API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI embed API returned {status}: {body}");
        }

        let body: OpenAiEmbedResponse = resp
            .json()
            .await
            .context("Failed to parse OpenAI embed response")?;

        let mut embeddings: Vec<Vec<f32>> = body.data.into_iter().map(|d| d.embedding).collect();
        all_embeddings.append(&mut embeddings);
    }

    Ok(all_embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate_for_embedding("short"), "short");
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        let long = "é".repeat(MAX_EMBED_CHARS); // 2 bytes per char
        let result = truncate_for_embedding(&long);
        assert!(result.len() <= MAX_EMBED_CHARS);
        assert!(result.is_char_boundary(result.len()));
    }

    #[test]
    fn test_purpose_prefixes_differ() {
        assert_ne!(
            EmbedPurpose::Query.prefix(),
            EmbedPurpose::Document.prefix()
        );
    }

    #[test]
    fn test_ollama_response_parses() {
        let json = r#"{"embeddings":[[0.1,0.2],[0.3,0.4]]}"#;
        let resp: OllamaEmbedResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.embeddings.len(), 2);
        assert_eq!(resp.embeddings[0], vec![0.1, 0.2]);
    }

    #[test]
    fn test_openai_response_parses() {
        let json = r#"{"data":[{"embedding":[0.5,0.6]}]}"#;
        let resp: OpenAiEmbedResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data.len(), 1);
        assert_eq!(resp.data[0].embedding, vec![0.5, 0.6]);
    }

    #[tokio::test]
    async fn test_empty_input_rejected_before_any_network_call() {
        let embedder = HttpEmbedder::new(reqwest::Client::new(), LlmConfig::default());
        let err = embedder.embed("   ", EmbedPurpose::Query).await;
        assert!(matches!(err, Err(EmbeddingError::EmptyInput)));
    }

    #[tokio::test]
    async fn test_unknown_provider_rejected() {
        let mut config = LlmConfig::default();
        config.provider = "mystery".to_string();
        let embedder = HttpEmbedder::new(reqwest::Client::new(), config);
        let err = embedder.embed("hello", EmbedPurpose::Query).await;
        assert!(matches!(err, Err(EmbeddingError::UnknownProvider(p)) if p == "mystery"));
    }
}
