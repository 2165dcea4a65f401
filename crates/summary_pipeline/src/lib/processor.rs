pub mod builder;
pub mod retry;

use std::time::{Duration, Instant};

use chrono::Utc;
use summary_datastore::{
    AttemptOutcome, DataStore, NewProcessingLogEntry, NewSummary, OwnerId, OwnerStats, Summary,
    SummaryFilter, SummaryId, SummaryPage, SummaryStatus,
};

use crate::{
    llm::prompt::build_user_prompt,
    normalizer::{decode_upload, normalize, word_count},
    processor::retry::RetryPolicy,
    types::{Owner, ProcessingOutcome, ProcessingReport, Submission, SubmissionText, SummaryView},
    ApiKey, Error, InputError, ProcessingLog, SummarizeError, Summarizer, SummaryRequest,
    SummaryResponse,
};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Maximum transcript length in characters
    pub max_text_length: usize,
    pub max_upload_bytes: usize,
    /// Left empty, the summarizer's default model is used
    pub model: String,
    pub ai_timeout: Duration,
    pub retry: RetryPolicy,
    /// Used when the owner has no API key of their own
    pub fallback_api_key: Option<ApiKey>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_text_length: 50_000,
            max_upload_bytes: 10 * 1024 * 1024,
            model: String::new(),
            ai_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            fallback_api_key: None,
        }
    }
}

/// Owns the lifecycle of a summary: intake, AI processing with retries,
/// and the edits a user makes afterwards.
#[derive(Debug)]
pub struct SummaryProcessor<D, S>
where
    D: DataStore + Send + Sync + 'static,
    S: Summarizer + Send + Sync + 'static,
{
    store: D,
    summarizer: S,
    settings: PipelineSettings,
}

impl<D, S> SummaryProcessor<D, S>
where
    D: DataStore + Send + Sync + 'static,
    S: Summarizer + Send + Sync + 'static,
{
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn store(&self) -> &D {
        &self.store
    }

    async fn load(&self, id: SummaryId) -> Result<Summary, Error> {
        self.store
            .get_summary(id)
            .await?
            .ok_or(Error::NotFound(id))
    }

    /// Normalizes the submitted text and stores it as a new draft.
    /// Invalid input is rejected before anything is written.
    #[tracing::instrument(skip(self, owner, submission), fields(owner_id = %owner.id))]
    pub async fn create_submission(
        &self,
        owner: &Owner,
        submission: Submission,
    ) -> Result<SummaryId, Error> {
        let title = submission.title.trim();
        if title.is_empty() {
            return Err(InputError::MissingTitle.into());
        }

        let raw = match submission.text {
            SubmissionText::Pasted(text) => text,
            SubmissionText::Upload { file_name, bytes } => {
                decode_upload(&file_name, &bytes, self.settings.max_upload_bytes)?
            }
        };
        let normalized = normalize(&raw, self.settings.max_text_length)
            .inspect_err(|e| tracing::info!(error = %e, "Rejected submission"))?;

        let instruction = submission
            .instruction
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty());

        let summary = self
            .store
            .create_summary(&NewSummary {
                owner_id: owner.id,
                title: title.to_string(),
                kind: submission.kind,
                word_count_original: normalized.word_count(),
                original_text: normalized.into_string(),
                instruction,
            })
            .await?;

        tracing::info!(summary_id = %summary.id, words = summary.word_count_original, "Created draft summary");
        Ok(summary.id)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_summary(&self, id: SummaryId) -> Result<SummaryView, Error> {
        let summary = self.load(id).await?;
        let processing_logs = self.store.processing_logs(id).await?;
        let share_logs = self.store.share_logs(id).await?;

        Ok(SummaryView::new(summary, processing_logs, share_logs))
    }

    /// History for one owner: newest first, narrowed by a case-insensitive
    /// search over title, transcript and generated summary and by status.
    /// A page past the end comes back empty.
    #[tracing::instrument(skip(self))]
    pub async fn list_summaries(
        &self,
        owner_id: OwnerId,
        filter: &SummaryFilter,
    ) -> Result<SummaryPage, Error> {
        Ok(self.store.list_summaries(owner_id, filter).await?)
    }

    /// Dashboard counters; `pending` covers `draft` and `processing`
    pub async fn owner_stats(&self, owner_id: OwnerId) -> Result<OwnerStats, Error> {
        Ok(self.store.owner_stats(owner_id).await?)
    }

    /// Runs AI processing for a `draft` or `error` summary.
    ///
    /// Attempts run one after another; only retryable failures are retried and
    /// every attempt is written to the processing log. AI failures do not
    /// produce an `Err`: the summary ends in `error` and the cause is carried
    /// by the returned [`ProcessingReport`].
    #[tracing::instrument(skip(self, owner), fields(owner_id = %owner.id))]
    pub async fn submit(&self, id: SummaryId, owner: &Owner) -> Result<ProcessingReport, Error> {
        let mut summary = self.load(id).await?;

        if !summary.status.can_transition_to(SummaryStatus::Processing) {
            return Err(Error::InvalidTransition {
                id,
                status: summary.status,
                action: "submit",
            });
        }

        let api_key = owner
            .api_key
            .as_ref()
            .or(self.settings.fallback_api_key.as_ref())
            .ok_or(Error::MissingApiKey(owner.id))?;

        summary.status = SummaryStatus::Processing;
        summary.last_error = None;
        self.store.update_summary(&summary).await?;

        let started = Instant::now();
        let attempts_before = summary.attempt_count;
        let result = self.run_attempts(&mut summary, api_key).await;
        let attempts = summary.attempt_count - attempts_before;
        summary.processing_time = Some(started.elapsed());

        let outcome = match result {
            Ok(response) => {
                summary.word_count_generated = word_count(&response.summary);
                summary.generated_summary = Some(response.summary);
                summary.processed_at = Some(Utc::now());
                summary.status = SummaryStatus::Completed;
                tracing::info!(
                    attempts,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Summary completed"
                );
                ProcessingOutcome::Completed
            }
            Err(err) => {
                summary.last_error = Some(err.to_string());
                summary.status = SummaryStatus::Error;
                tracing::error!(attempts, error = %err, "Summary processing failed");
                ProcessingOutcome::Failed(err)
            }
        };

        if let Err(e) = self.store.update_summary(&summary).await {
            tracing::error!(error = ?e, "Failed to persist processing result");
            self.persist_failure(summary, &e).await;
            return Err(e.into());
        }

        Ok(ProcessingReport {
            summary,
            attempts,
            outcome,
        })
    }

    /// Last attempt at moving a summary out of `processing` after its result
    /// could not be stored
    async fn persist_failure(&self, mut summary: Summary, cause: &anyhow::Error) {
        summary.status = SummaryStatus::Error;
        summary.last_error = Some(format!("Failed to store processing result: {cause}"));

        if let Err(e) = self.store.update_summary(&summary).await {
            tracing::error!(error = ?e, "Summary left in processing, reset it to draft to recover");
        }
    }

    async fn run_attempts(
        &self,
        summary: &mut Summary,
        api_key: &ApiKey,
    ) -> Result<SummaryResponse, SummarizeError> {
        let policy = &self.settings.retry;
        let log = ProcessingLog::new(&self.store);
        let mut backoff = policy.backoff_schedule();
        let mut attempts_made = 0;
        let prompt = build_user_prompt(&summary.original_text, summary.instruction.as_deref());

        loop {
            attempts_made += 1;
            summary.attempt_count += 1;
            let attempt = summary.attempt_count;

            let started = Instant::now();
            let result = self.attempt(summary, api_key).await;
            let latency = started.elapsed();

            log.record(&NewProcessingLogEntry {
                summary_id: summary.id,
                attempt,
                outcome: match &result {
                    Ok(_) => AttemptOutcome::Success,
                    Err(e) => e.outcome(),
                },
                detail: result.as_ref().err().map(ToString::to_string),
                latency,
                model: self.settings.model.clone(),
                tokens_used: result.as_ref().ok().and_then(|r| r.tokens_used),
                prompt: prompt.clone(),
                response: result.as_ref().ok().map(|r| r.summary.clone()),
            })
            .await;

            let err = match result {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            let next_delay = match backoff.next() {
                Some(delay) if err.is_retryable() && attempts_made < policy.max_attempts => delay,
                _ => return Err(err),
            };

            let delay = policy.delay_before_retry(next_delay, err.retry_after());
            tracing::warn!(
                attempt,
                error = %err,
                delay_ms = delay.as_millis() as u64,
                "Retrying summarization"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(
        &self,
        summary: &Summary,
        api_key: &ApiKey,
    ) -> Result<SummaryResponse, SummarizeError> {
        let timeout = self.settings.ai_timeout;
        let request = SummaryRequest {
            text: &summary.original_text,
            instruction: summary.instruction.as_deref(),
            api_key,
            model: &self.settings.model,
            timeout,
        };

        let response = tokio::time::timeout(timeout, self.summarizer.summarize(request))
            .await
            .unwrap_or(Err(SummarizeError::Timeout(timeout)))?;

        let summary = response.summary.trim();
        if summary.is_empty() {
            return Err(SummarizeError::Upstream {
                status: None,
                message: "AI provider returned an empty summary".into(),
                transient: false,
            });
        }

        Ok(SummaryResponse {
            summary: summary.to_string(),
            tokens_used: response.tokens_used,
        })
    }

    /// Stores a user edit of a completed summary. The generated text and the
    /// status are left untouched.
    #[tracing::instrument(skip(self, new_text))]
    pub async fn edit(&self, id: SummaryId, new_text: &str) -> Result<Summary, Error> {
        let mut summary = self.load(id).await?;

        if summary.status != SummaryStatus::Completed {
            return Err(Error::InvalidTransition {
                id,
                status: summary.status,
                action: "edit",
            });
        }

        let edited = normalize(new_text, self.settings.max_text_length)?;
        summary.edited_summary = Some(edited.into_string());
        self.store.update_summary(&summary).await?;

        tracing::info!("Summary edited");
        Ok(summary)
    }

    /// Sends a summary back to `draft` so it can be submitted again. Works from
    /// `completed`, `error`, and from `processing` to recover a summary whose
    /// processing was interrupted. Generated and edited text are discarded,
    /// logs and the attempt counter are kept.
    #[tracing::instrument(skip(self))]
    pub async fn reset_to_draft(&self, id: SummaryId) -> Result<Summary, Error> {
        let mut summary = self.load(id).await?;

        if !summary.status.can_reset() {
            return Err(Error::InvalidTransition {
                id,
                status: summary.status,
                action: "reset",
            });
        }

        summary.status = SummaryStatus::Draft;
        summary.generated_summary = None;
        summary.edited_summary = None;
        summary.word_count_generated = 0;
        summary.processing_time = None;
        summary.processed_at = None;
        summary.last_error = None;
        self.store.update_summary(&summary).await?;

        tracing::info!("Summary reset to draft");
        Ok(summary)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_summary(&self, id: SummaryId) -> Result<(), Error> {
        if !self.store.delete_summary(id).await? {
            return Err(Error::NotFound(id));
        }
        Ok(())
    }
}
