use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use summary_pipeline::{SummarizeError, Summarizer, SummaryRequest, SummaryResponse};

/// Scripted reply for a single call
#[derive(Debug, Clone)]
pub enum Reply {
    Summary(String),
    Fail(SummarizeError),
    /// Never answers within any reasonable timeout
    Hang,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub text: String,
    pub instruction: Option<String>,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

/// Answers with the scripted replies in order, then with `summary` once the
/// script runs out.
#[derive(Clone)]
pub struct MockSummarizer {
    pub summary: String,
    pub script: Arc<Mutex<VecDeque<Reply>>>,
    pub calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockSummarizer {
    pub fn new(summary: &str) -> Self {
        Self {
            summary: summary.to_string(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn scripted(replies: impl IntoIterator<Item = Reply>, then: &str) -> Self {
        let mock = Self::new(then);
        mock.script.lock().unwrap().extend(replies);
        mock
    }

    pub fn failing(err: SummarizeError) -> Self {
        Self::scripted(std::iter::repeat(Reply::Fail(err)).take(64), "")
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Summarizer for MockSummarizer {
    const DEFAULT_MODEL: &'static str = "mock-llama";

    async fn summarize(
        &self,
        request: SummaryRequest<'_>,
    ) -> Result<SummaryResponse, SummarizeError> {
        self.calls.lock().unwrap().push(RecordedCall {
            text: request.text.to_string(),
            instruction: request.instruction.map(str::to_string),
            api_key: request.api_key.expose().to_string(),
            model: request.model.to_string(),
            timeout: request.timeout,
        });

        let reply = self.script.lock().unwrap().pop_front();

        match reply.unwrap_or_else(|| Reply::Summary(self.summary.clone())) {
            Reply::Summary(summary) => Ok(SummaryResponse {
                summary,
                tokens_used: Some(42),
            }),
            Reply::Fail(err) => Err(err),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(SummarizeError::Timeout(Duration::from_secs(3600)))
            }
        }
    }
}
