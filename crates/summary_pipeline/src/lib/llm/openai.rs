use std::time::Duration;

use reqwest::{header::RETRY_AFTER, Client, StatusCode};
use serde::Deserialize;

use crate::{
    llm::prompt::{build_user_prompt, SYSTEM_PROMPT},
    ApiKey, SummarizeError, Summarizer, SummaryRequest, SummaryResponse,
};

/// Client for OpenAI compatible chat completion APIs. Points at Groq unless
/// another base url is configured.
///
/// The client holds no credentials, the API key travels with every request.
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum OpenAIError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api {
        status: u16,
        message: String,
        retry_after: Option<Duration>,
    },
}

impl Default for OpenAIClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAIClient {
    pub const GROQ_BASE_URL: &'static str = "https://api.groq.com/openai/v1";
    const TEMPERATURE: f32 = 0.3;
    const MAX_TOKENS: u32 = 2048;
    /// Upper bound on how much of an error body ends up in logs and summaries
    const MAX_ERROR_MESSAGE_CHARS: usize = 500;

    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: Self::GROQ_BASE_URL.into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn send_completion_request(
        &self,
        api_key: &ApiKey,
        model_name: &str,
        user_content: String,
        timeout: Duration,
    ) -> Result<CompletionResponse, OpenAIError> {
        let body = serde_json::json!({
            "model": model_name,
            "temperature": Self::TEMPERATURE,
            "max_tokens": Self::MAX_TOKENS,
            "messages": [
                {
                    "role": "system",
                    "content": SYSTEM_PROMPT
                },
                {
                    "role": "user",
                    "content": user_content
                }
            ]
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key.expose())
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let retry_after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            let message = resp.text().await.unwrap_or_default();
            return Err(OpenAIError::Api {
                status,
                message,
                retry_after,
            });
        }

        Ok(resp.json::<CompletionResponse>().await?)
    }
}

/// `Retry-After` in delta-seconds form. HTTP dates are ignored.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

fn truncate(message: &str) -> String {
    let message = message.trim();
    if message.chars().count() <= OpenAIClient::MAX_ERROR_MESSAGE_CHARS {
        return message.to_string();
    }
    let mut truncated = message
        .chars()
        .take(OpenAIClient::MAX_ERROR_MESSAGE_CHARS)
        .collect::<String>();
    truncated.push('…');
    truncated
}

/// Maps a non-success HTTP status onto a [`SummarizeError`]
pub fn classify_status(status: u16, message: &str, retry_after: Option<Duration>) -> SummarizeError {
    let message = truncate(message);

    match StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR) {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SummarizeError::Auth(message),
        StatusCode::TOO_MANY_REQUESTS => SummarizeError::RateLimited { retry_after },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            SummarizeError::Upstream {
                status: Some(status),
                message,
                transient: true,
            }
        }
        StatusCode::BAD_REQUEST
        | StatusCode::NOT_FOUND
        | StatusCode::PAYLOAD_TOO_LARGE
        | StatusCode::UNPROCESSABLE_ENTITY => SummarizeError::MalformedRequest(message),
        s if s.is_server_error() => SummarizeError::Upstream {
            status: Some(status),
            message,
            transient: true,
        },
        _ => SummarizeError::Upstream {
            status: Some(status),
            message,
            transient: false,
        },
    }
}

impl OpenAIError {
    fn classify(self, timeout: Duration) -> SummarizeError {
        match self {
            OpenAIError::Api {
                status,
                message,
                retry_after,
            } => classify_status(status, &message, retry_after),
            OpenAIError::Request(e) if e.is_timeout() => SummarizeError::Timeout(timeout),
            OpenAIError::Request(e) if e.is_decode() => SummarizeError::Upstream {
                status: e.status().map(|s| s.as_u16()),
                message: format!("Invalid response body: {e}"),
                transient: false,
            },
            OpenAIError::Request(e) => SummarizeError::Upstream {
                status: e.status().map(|s| s.as_u16()),
                message: e.without_url().to_string(),
                transient: true,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    pub choices: Vec<CompletionChoice>,
    pub usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub index: u32,
    pub message: CompletionMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionMessage {
    pub role: String,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionUsage {
    pub total_tokens: u32,
}

impl Summarizer for OpenAIClient {
    const DEFAULT_MODEL: &'static str = "llama-3.1-8b-instant";

    async fn summarize(&self, request: SummaryRequest<'_>) -> Result<SummaryResponse, SummarizeError> {
        let user_content = build_user_prompt(request.text, request.instruction);

        let response = self
            .send_completion_request(request.api_key, request.model, user_content, request.timeout)
            .await
            .map_err(|e| e.classify(request.timeout).redact(request.api_key))
            .inspect_err(|e| tracing::error!(error = %e, "Failed to summarize content"))?;

        let summary = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| SummarizeError::Upstream {
                status: None,
                message: "No content in response".into(),
                transient: false,
            })?;

        Ok(SummaryResponse {
            summary: summary.to_string(),
            tokens_used: response.usage.map(|u| u.total_tokens),
        })
    }
}
