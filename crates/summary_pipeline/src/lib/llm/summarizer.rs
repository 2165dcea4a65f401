use std::{fmt, future::Future, time::Duration};

use summary_datastore::AttemptOutcome;

pub trait Summarizer {
    const DEFAULT_MODEL: &'static str;

    fn summarize(
        &self,
        request: SummaryRequest<'_>,
    ) -> impl Future<Output = Result<SummaryResponse, SummarizeError>> + Send;
}

/// API key for the AI provider. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

impl From<String> for ApiKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SummaryRequest<'a> {
    pub text: &'a str,
    pub instruction: Option<&'a str>,
    pub api_key: &'a ApiKey,
    pub model: &'a str,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SummaryResponse {
    pub summary: String,
    pub tokens_used: Option<u32>,
}

/// Classified failure of a single summarization call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SummarizeError {
    #[error("Authentication with the AI provider failed: {0}")]
    Auth(String),
    #[error("Rate limited by the AI provider")]
    RateLimited { retry_after: Option<Duration> },
    #[error("AI provider error: {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
        transient: bool,
    },
    #[error("AI request timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),
    #[error("AI provider rejected the request: {0}")]
    MalformedRequest(String),
}

impl SummarizeError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout(_) => true,
            Self::Upstream { transient, .. } => *transient,
            Self::Auth(_) | Self::MalformedRequest(_) => false,
        }
    }

    /// Minimum wait requested by the provider before the next attempt
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    pub fn outcome(&self) -> AttemptOutcome {
        match self {
            Self::Auth(_) => AttemptOutcome::AuthError,
            Self::RateLimited { .. } => AttemptOutcome::RateLimited,
            Self::Upstream { .. } => AttemptOutcome::UpstreamError,
            Self::Timeout(_) => AttemptOutcome::Timeout,
            Self::MalformedRequest(_) => AttemptOutcome::MalformedRequest,
        }
    }

    /// Replaces any occurrence of `api_key` in the error text
    pub fn redact(self, api_key: &ApiKey) -> Self {
        let secret = api_key.expose();
        if secret.is_empty() {
            return self;
        }
        let scrub = |s: String| s.replace(secret, "[REDACTED]");

        match self {
            Self::Auth(message) => Self::Auth(scrub(message)),
            Self::MalformedRequest(message) => Self::MalformedRequest(scrub(message)),
            Self::Upstream {
                status,
                message,
                transient,
            } => Self::Upstream {
                status,
                message: scrub(message),
                transient,
            },
            other @ (Self::RateLimited { .. } | Self::Timeout(_)) => other,
        }
    }
}
