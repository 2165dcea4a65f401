use std::{fmt, str::FromStr, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SummaryId(pub i64);

impl fmt::Display for SummaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OwnerId(pub i64);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Processing status of a [`Summary`].
///
/// ```text
/// draft ──► processing ──► completed
///               │ ▲
///               ▼ │
///              error
/// ```
///
/// Any state but `draft` may also be reset to `draft` through an explicit
/// caller request; see [`SummaryStatus::can_reset`]. For `processing` this
/// recovers a summary whose `submit` was interrupted before it could persist
/// a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    Draft,
    Processing,
    Completed,
    Error,
}

impl SummaryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    pub fn can_transition_to(self, next: SummaryStatus) -> bool {
        use SummaryStatus::*;

        match (self, next) {
            (Draft, Processing) | (Error, Processing) => true,
            (Processing, Completed) | (Processing, Error) => true,
            (Draft, _) | (Processing, _) | (Completed, _) | (Error, _) => false,
        }
    }

    /// Whether a caller may explicitly send this summary back to `draft`
    pub fn can_reset(self) -> bool {
        !matches!(self, Self::Draft)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl fmt::Display for SummaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "error" => Ok(Self::Error),
            other => Err(UnknownVariant::new("summary status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryKind {
    #[default]
    Meeting,
    Call,
    Document,
    Other,
}

impl SummaryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meeting => "meeting",
            Self::Call => "call",
            Self::Document => "document",
            Self::Other => "other",
        }
    }

    /// Human readable label, used in shared emails
    pub fn label(&self) -> &'static str {
        match self {
            Self::Meeting => "Meeting Notes",
            Self::Call => "Call Transcript",
            Self::Document => "Document",
            Self::Other => "Other",
        }
    }
}

impl FromStr for SummaryKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "meeting" => Ok(Self::Meeting),
            "call" => Ok(Self::Call),
            "document" => Ok(Self::Document),
            "other" => Ok(Self::Other),
            _ => Err(UnknownVariant::new("summary kind", s)),
        }
    }
}

/// A transcript and the outcome of summarizing it.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub id: SummaryId,
    pub owner_id: OwnerId,
    pub title: String,
    pub kind: SummaryKind,
    pub status: SummaryStatus,
    pub original_text: String,
    pub instruction: Option<String>,
    pub generated_summary: Option<String>,
    pub edited_summary: Option<String>,
    pub word_count_original: u32,
    pub word_count_generated: u32,
    pub processing_time: Option<Duration>,
    /// Total AI attempts made across every submission of this summary
    pub attempt_count: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub shared_at: Option<DateTime<Utc>>,
    pub shared_with: Vec<String>,
}

impl Summary {
    /// The edited summary if the user provided one, otherwise the generated one
    pub fn final_text(&self) -> Option<&str> {
        self.edited_summary
            .as_deref()
            .or(self.generated_summary.as_deref())
    }
}

/// Search, status filter and paging applied when listing an owner's summaries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryFilter {
    /// Case-insensitive substring of the title, original text or generated summary
    pub search: Option<String>,
    pub status: Option<SummaryStatus>,
    /// 1-based
    pub page: u32,
    pub per_page: u32,
}

impl Default for SummaryFilter {
    fn default() -> Self {
        Self {
            search: None,
            status: None,
            page: 1,
            per_page: Self::DEFAULT_PER_PAGE,
        }
    }
}

impl SummaryFilter {
    pub const DEFAULT_PER_PAGE: u32 = 10;
    pub const MAX_PER_PAGE: u32 = 100;

    /// A blank search term clears the search
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into().trim().to_string();
        self.search = (!search.is_empty()).then_some(search);
        self
    }

    pub fn with_status(mut self, status: SummaryStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Page number, at least 1
    pub fn page_number(&self) -> u32 {
        self.page.max(1)
    }

    /// Page size clamped to `1..=MAX_PER_PAGE`
    pub fn limit(&self) -> u32 {
        self.per_page.clamp(1, Self::MAX_PER_PAGE)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page_number() - 1) * u64::from(self.limit())
    }
}

/// One page of an owner's summaries, newest first
#[derive(Debug, Clone, Serialize)]
pub struct SummaryPage {
    pub summaries: Vec<Summary>,
    /// Matching summaries across all pages
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

impl SummaryPage {
    pub fn new(summaries: Vec<Summary>, total: u64, filter: &SummaryFilter) -> Self {
        Self {
            summaries,
            total,
            page: filter.page_number(),
            per_page: filter.limit(),
        }
    }

    /// An empty result still has one (empty) page
    pub fn total_pages(&self) -> u32 {
        let pages = self.total.div_ceil(u64::from(self.per_page.max(1))).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// Dashboard counters for one owner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OwnerStats {
    pub total: u64,
    pub completed: u64,
    /// `draft` or `processing`
    pub pending: u64,
    /// Shared with at least one recipient
    pub shared: u64,
}

/// Fields supplied by the caller when creating a [`Summary`]. New summaries
/// always start out as [`SummaryStatus::Draft`].
#[derive(Debug, Clone)]
pub struct NewSummary {
    pub owner_id: OwnerId,
    pub title: String,
    pub kind: SummaryKind,
    pub original_text: String,
    pub instruction: Option<String>,
    pub word_count_original: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    AuthError,
    RateLimited,
    UpstreamError,
    Timeout,
    MalformedRequest,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::AuthError => "auth_error",
            Self::RateLimited => "rate_limited",
            Self::UpstreamError => "upstream_error",
            Self::Timeout => "timeout",
            Self::MalformedRequest => "malformed_request",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttemptOutcome {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "auth_error" => Ok(Self::AuthError),
            "rate_limited" => Ok(Self::RateLimited),
            "upstream_error" => Ok(Self::UpstreamError),
            "timeout" => Ok(Self::Timeout),
            "malformed_request" => Ok(Self::MalformedRequest),
            other => Err(UnknownVariant::new("attempt outcome", other)),
        }
    }
}

/// One AI invocation attempt made while processing a summary.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingLogEntry {
    pub id: i64,
    pub summary_id: SummaryId,
    pub attempt: u32,
    pub outcome: AttemptOutcome,
    pub detail: Option<String>,
    pub latency: Duration,
    pub model: String,
    pub tokens_used: Option<u32>,
    /// User prompt sent with this attempt
    pub prompt: String,
    /// Text returned by the provider, if any
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProcessingLogEntry {
    pub summary_id: SummaryId,
    pub attempt: u32,
    pub outcome: AttemptOutcome,
    pub detail: Option<String>,
    pub latency: Duration,
    pub model: String,
    pub tokens_used: Option<u32>,
    pub prompt: String,
    pub response: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareOutcome {
    Sent,
    InvalidAddress,
    DeliveryError,
    Timeout,
}

impl ShareOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::InvalidAddress => "invalid_address",
            Self::DeliveryError => "delivery_error",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ShareOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShareOutcome {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(Self::Sent),
            "invalid_address" => Ok(Self::InvalidAddress),
            "delivery_error" => Ok(Self::DeliveryError),
            "timeout" => Ok(Self::Timeout),
            other => Err(UnknownVariant::new("share outcome", other)),
        }
    }
}

/// Delivery record for a single recipient of a shared summary.
#[derive(Debug, Clone, Serialize)]
pub struct SharedSummaryLogEntry {
    pub id: i64,
    pub summary_id: SummaryId,
    pub recipient: String,
    pub subject: String,
    pub outcome: ShareOutcome,
    pub reason: Option<String>,
    /// Personal message sent along with the summary
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewShareLogEntry {
    pub summary_id: SummaryId,
    pub recipient: String,
    pub subject: String,
    pub outcome: ShareOutcome,
    pub reason: Option<String>,
    pub note: Option<String>,
}
