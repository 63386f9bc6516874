use anyhow::{Context, Result};
use futures_util::stream::{Stream, StreamExt};
use serde::Deserialize;
use std::pin::Pin;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::models::ChatMessage;

/// Stream of answer-text deltas, one per provider chunk.
pub type AnswerStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Stream a chat completion from the configured provider as content deltas.
pub async fn stream_answer(
    client: &reqwest::Client,
    config: &LlmConfig,
    messages: Vec<ChatMessage>,
) -> Result<AnswerStream> {
    let provider = config.provider.clone();
    let (url, request) = match provider.as_str() {
        "ollama" => (
            format!("{}/api/chat", config.base_url),
            serde_json::json!({
                "model": config.chat_model,
                "messages": messages,
                "stream": true,
            }),
        ),
        "openai" => (
            format!("{}/v1/chat/completions", config.base_url),
            serde_json::json!({
                "model": config.chat_model,
                "messages": messages,
                "stream": true,
            }),
        ),
        other => anyhow::bail!("Unsupported LLM provider for streaming: {other}"),
    };

    let mut builder = client
        .post(&url)
        .timeout(Duration::from_secs(300))
        .json(&request);
    if provider == "openai" {
        builder = builder.header(
            "Authorization",
            format!("Bearer {}", config.api_key.as_deref().unwrap_or("")),
        );
    }

    let resp = builder
        .send()
        .await
        .context("Failed to connect to LLM for answer streaming")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("LLM streaming API returned {status}: {body}");
    }

    let stream = split_lines(resp.bytes_stream()).filter_map(move |line_result| {
        let provider = provider.clone();
        async move {
            match line_result {
                Ok(line) => match provider.as_str() {
                    "ollama" => parse_ollama_chunk(&line),
                    _ => parse_openai_chunk(&line),
                },
                Err(e) => Some(Err(e)),
            }
        }
    });

    Ok(Box::pin(stream))
}

/// Parse one Ollama NDJSON line. `None` skips the line (empty delta or the
/// final done marker).
fn parse_ollama_chunk(line: &str) -> Option<Result<String>> {
    #[derive(Deserialize)]
    struct Chunk {
        message: ChunkMessage,
        done: bool,
    }
    #[derive(Deserialize)]
    struct ChunkMessage {
        content: String,
    }

    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match serde_json::from_str::<Chunk>(line) {
        Ok(chunk) if chunk.done || chunk.message.content.is_empty() => None,
        Ok(chunk) => Some(Ok(chunk.message.content)),
        Err(e) => Some(Err(anyhow::anyhow!("Failed to parse Ollama chunk: {e}"))),
    }
}

/// Parse one OpenAI SSE line. `None` skips non-data lines, `[DONE]`, and
/// role-only chunks.
fn parse_openai_chunk(line: &str) -> Option<Result<String>> {
    #[derive(Deserialize)]
    struct Chunk {
        choices: Vec<Choice>,
    }
    #[derive(Deserialize)]
    struct Choice {
        delta: Delta,
    }
    #[derive(Deserialize)]
    struct Delta {
        content: Option<String>,
    }

    let data = line.trim().strip_prefix("data: ")?.trim();
    if data == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<Chunk>(data) {
        Ok(chunk) => {
            let content = chunk.choices.first().and_then(|c| c.delta.content.clone())?;
            if content.is_empty() {
                None
            } else {
                Some(Ok(content))
            }
        }
        Err(e) => Some(Err(anyhow::anyhow!("Failed to parse OpenAI chunk: {e}"))),
    }
}

/// Convert a byte stream into a stream of complete, non-empty lines.
fn split_lines(
    byte_stream: impl Stream<Item = reqwest::Result<bytes::Bytes>> + Send + 'static,
) -> impl Stream<Item = Result<String>> + Send {
    futures_util::stream::unfold(
        (Box::pin(byte_stream), String::new()),
        |(mut stream, mut buffer)| async move {
            loop {
                if let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].to_string();
                    buffer.replace_range(..=pos, "");
                    if !line.trim().is_empty() {
                        return Some((Ok(line), (stream, buffer)));
                    }
                    continue;
                }

                match stream.next().await {
                    Some(Ok(bytes)) => buffer.push_str(&String::from_utf8_lossy(&bytes)),
                    Some(Err(e)) => {
                        return Some((
                            Err(anyhow::anyhow!("Stream read error: {e}")),
                            (stream, buffer),
                        ));
                    }
                    None => {
                        if buffer.trim().is_empty() {
                            return None;
                        }
                        let remaining = std::mem::take(&mut buffer);
                        return Some((Ok(remaining), (stream, buffer)));
                    }
                }
            }
        },
    )
}
