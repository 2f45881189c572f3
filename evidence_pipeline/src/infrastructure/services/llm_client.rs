// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Language Model Client
//!
//! Chat-completion and embedding calls against an OpenAI-compatible API
//! (OpenRouter by default). The HTTP client is documented thread-safe and
//! is shared across enrichment workers; per-call state lives in the
//! request. Transient failures retry with the standard backoff policy,
//! 429s surface the server's retry delay, and credentials come from the
//! environment only.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use evidence_domain::EvidenceError;

use crate::infrastructure::retry::{retry_async, RetryPolicy};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "anthropic/claude-3.5-sonnet";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// One chat-completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system_prompt: String,
    pub user_content: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Chat-completion and embedding contract consumed by the enrichment
/// runtime and the search planner. Implementations must be safe for
/// concurrent use; workers share one instance.
#[async_trait]
pub trait LanguageModelClient: Send + Sync {
    /// Returns the assistant message text for a chat request.
    async fn complete(&self, request: &ChatRequest) -> Result<String, EvidenceError>;

    /// Returns the embedding vector for a text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EvidenceError>;

    /// Model name recorded next to stored embeddings.
    fn embedding_model(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Client for any OpenAI-compatible completion/embedding endpoint.
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    embedding_model: String,
}

impl OpenAiCompatibleClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Result<Self, EvidenceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EvidenceError::config(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            embedding_model: embedding_model.into(),
        })
    }

    /// Reads `LLM_API_KEY` (fallback `OPENROUTER_API_KEY`), `LLM_BASE_URL`,
    /// `LLM_MODEL`, and `EMBEDDING_MODEL` from the environment.
    pub fn from_env() -> Result<Self, EvidenceError> {
        let api_key = std::env::var("LLM_API_KEY")
            .or_else(|_| std::env::var("OPENROUTER_API_KEY"))
            .map_err(|_| {
                EvidenceError::config("LLM_API_KEY or OPENROUTER_API_KEY must be set")
            })?;
        let base_url =
            std::env::var("LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let embedding_model = std::env::var("EMBEDDING_MODEL")
            .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string());
        Self::new(base_url, api_key, model, embedding_model)
    }

    async fn post_json(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, EvidenceError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EvidenceError::transport(format!("POST {path}: {e}")))?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(EvidenceError::rate_limited(
                format!("POST {path} rate limited"),
                retry_after,
            ));
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(EvidenceError::auth(format!("POST {path} returned {status}")));
        }
        if status.is_server_error() {
            return Err(EvidenceError::transport(format!("POST {path} returned {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EvidenceError::llm_parse(format!(
                "POST {path} returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| EvidenceError::llm_parse(format!("POST {path}: {e}")))
    }
}

#[async_trait]
impl LanguageModelClient for OpenAiCompatibleClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, EvidenceError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system_prompt},
                {"role": "user", "content": request.user_content}
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        let value = retry_async(RetryPolicy::default(), "chat completion", || {
            self.post_json("/chat/completions", body.clone())
        })
        .await?;

        let parsed: ChatCompletionResponse = serde_json::from_value(value)
            .map_err(|e| EvidenceError::llm_parse(format!("completion shape: {e}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| EvidenceError::llm_parse("completion returned no choices"))?;
        debug!("completion returned {} chars", content.len());
        Ok(content)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EvidenceError> {
        // Stay under the embedding model's context window.
        let truncated: String = text.chars().take(30_000).collect();
        let body = json!({
            "model": self.embedding_model,
            "input": truncated,
        });

        let value = retry_async(RetryPolicy::default(), "embedding", || {
            self.post_json("/embeddings", body.clone())
        })
        .await?;

        let parsed: EmbeddingResponse = serde_json::from_value(value)
            .map_err(|e| EvidenceError::llm_parse(format!("embedding shape: {e}")))?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| EvidenceError::llm_parse("embedding returned no data"))
    }

    fn embedding_model(&self) -> &str {
        &self.embedding_model
    }
}

/// Scripted client for tests: hands out canned completions in order and a
/// fixed embedding. Mirrors the no-op/capturing doubles used elsewhere in
/// the workspace.
pub struct ScriptedLanguageModelClient {
    responses: parking_lot::Mutex<std::collections::VecDeque<Result<String, EvidenceError>>>,
    fallback: String,
    embedding: Vec<f32>,
    pub calls: std::sync::atomic::AtomicU32,
}

impl ScriptedLanguageModelClient {
    /// Every call answers with `fallback`.
    pub fn constant(fallback: impl Into<String>) -> Self {
        Self {
            responses: parking_lot::Mutex::new(std::collections::VecDeque::new()),
            fallback: fallback.into(),
            embedding: vec![0.1, 0.2, 0.3],
            calls: std::sync::atomic::AtomicU32::new(0),
        }
    }

    /// Queued responses are consumed first, then the fallback answers.
    pub fn with_queue(
        responses: Vec<Result<String, EvidenceError>>,
        fallback: impl Into<String>,
    ) -> Self {
        Self {
            responses: parking_lot::Mutex::new(responses.into()),
            fallback: fallback.into(),
            embedding: vec![0.1, 0.2, 0.3],
            calls: std::sync::atomic::AtomicU32::new(0),
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }
}

#[async_trait]
impl LanguageModelClient for ScriptedLanguageModelClient {
    async fn complete(&self, _request: &ChatRequest) -> Result<String, EvidenceError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match self.responses.lock().pop_front() {
            Some(response) => response,
            None => Ok(self.fallback.clone()),
        }
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EvidenceError> {
        Ok(self.embedding.clone())
    }

    fn embedding_model(&self) -> &str {
        "scripted-embedding"
    }
}
