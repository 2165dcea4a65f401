use serde::Serialize;
use summary_datastore::{
    OwnerId, ProcessingLogEntry, SharedSummaryLogEntry, Summary, SummaryKind, SummaryStatus,
};

use crate::{normalizer::word_count, ApiKey, SummarizeError};

/// Identity and credentials of the user a request is made on behalf of.
/// Supplied by the caller, never modified by the pipeline.
#[derive(Debug, Clone)]
pub struct Owner {
    pub id: OwnerId,
    pub display_name: String,
    pub api_key: Option<ApiKey>,
}

impl Owner {
    pub fn new(id: OwnerId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(ApiKey::new(api_key));
        self
    }
}

#[derive(Debug, Clone)]
pub enum SubmissionText {
    Pasted(String),
    /// Raw bytes of an uploaded `.txt` or `.md` file
    Upload { file_name: String, bytes: Vec<u8> },
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub title: String,
    pub kind: SummaryKind,
    pub text: SubmissionText,
    pub instruction: Option<String>,
}

impl Submission {
    pub fn pasted(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: SummaryKind::default(),
            text: SubmissionText::Pasted(text.into()),
            instruction: None,
        }
    }

    pub fn upload(title: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            title: title.into(),
            kind: SummaryKind::default(),
            text: SubmissionText::Upload {
                file_name: file_name.into(),
                bytes,
            },
            instruction: None,
        }
    }

    pub fn kind(mut self, kind: SummaryKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }
}

/// A summary together with its logs, as presented to callers
#[derive(Debug, Clone, Serialize)]
pub struct SummaryView {
    pub summary: Summary,
    pub final_text: Option<String>,
    pub final_word_count: u32,
    pub processing_logs: Vec<ProcessingLogEntry>,
    pub share_logs: Vec<SharedSummaryLogEntry>,
}

impl SummaryView {
    pub fn new(
        summary: Summary,
        processing_logs: Vec<ProcessingLogEntry>,
        share_logs: Vec<SharedSummaryLogEntry>,
    ) -> Self {
        let final_text = summary.final_text().map(str::to_string);
        let final_word_count = final_text.as_deref().map(word_count).unwrap_or(0);

        Self {
            summary,
            final_text,
            final_word_count,
            processing_logs,
            share_logs,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingOutcome {
    Completed,
    Failed(SummarizeError),
}

/// Result of a [`crate::SummaryProcessor::submit`] call. The summary is always
/// in a terminal state.
#[derive(Debug, Clone)]
pub struct ProcessingReport {
    pub summary: Summary,
    /// Attempts made during this call
    pub attempts: u32,
    pub outcome: ProcessingOutcome,
}

impl ProcessingReport {
    pub fn is_completed(&self) -> bool {
        debug_assert!(self.summary.status.is_terminal());
        self.summary.status == SummaryStatus::Completed
    }
}
