use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use chrono::Utc;
use summary_datastore::{
    DataStore, NewProcessingLogEntry, NewShareLogEntry, NewSummary, OwnerId, OwnerStats,
    ProcessingLogEntry, SharedSummaryLogEntry, Summary, SummaryFilter, SummaryId, SummaryPage,
    SummaryStatus,
};

#[derive(Default)]
pub struct StoreState {
    pub summaries: BTreeMap<SummaryId, Summary>,
    pub processing_logs: Vec<ProcessingLogEntry>,
    pub share_logs: Vec<SharedSummaryLogEntry>,
    /// Every status persisted through `update_summary`, in order
    pub status_history: Vec<(SummaryId, SummaryStatus)>,
    next_id: i64,
}

#[derive(Clone, Default)]
pub struct MockDataStore {
    pub state: Arc<Mutex<StoreState>>,
    pub fail_log_writes: bool,
    pub fail_with: Option<String>,
    /// `update_summary` refuses summaries in this status
    pub fail_updates_to: Option<SummaryStatus>,
}

impl MockDataStore {
    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Default::default()
        }
    }

    pub fn with_failing_log_writes() -> Self {
        Self {
            fail_log_writes: true,
            ..Default::default()
        }
    }

    pub fn failing_updates_to(status: SummaryStatus) -> Self {
        Self {
            fail_updates_to: Some(status),
            ..Default::default()
        }
    }

    /// Overwrites a stored summary without going through `update_summary`
    pub fn put(&self, summary: Summary) {
        self.state
            .lock()
            .unwrap()
            .summaries
            .insert(summary.id, summary);
    }

    pub fn stored(&self, id: SummaryId) -> Option<Summary> {
        self.state.lock().unwrap().summaries.get(&id).cloned()
    }

    pub fn summary_count(&self) -> usize {
        self.state.lock().unwrap().summaries.len()
    }

    pub fn attempts_for(&self, id: SummaryId) -> Vec<ProcessingLogEntry> {
        self.state
            .lock()
            .unwrap()
            .processing_logs
            .iter()
            .filter(|e| e.summary_id == id)
            .cloned()
            .collect()
    }

    pub fn shares_for(&self, id: SummaryId) -> Vec<SharedSummaryLogEntry> {
        self.state
            .lock()
            .unwrap()
            .share_logs
            .iter()
            .filter(|e| e.summary_id == id)
            .cloned()
            .collect()
    }

    pub fn statuses_for(&self, id: SummaryId) -> Vec<SummaryStatus> {
        self.state
            .lock()
            .unwrap()
            .status_history
            .iter()
            .filter(|(summary_id, _)| *summary_id == id)
            .map(|(_, status)| *status)
            .collect()
    }

    fn check_failure(&self) -> anyhow::Result<()> {
        match &self.fail_with {
            Some(msg) => Err(anyhow::anyhow!("{}", msg)),
            None => Ok(()),
        }
    }
}

impl DataStore for MockDataStore {
    async fn create_summary(&self, summary: &NewSummary) -> anyhow::Result<Summary> {
        self.check_failure()?;

        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let now = Utc::now();
        let created = Summary {
            id: SummaryId(state.next_id),
            owner_id: summary.owner_id,
            title: summary.title.clone(),
            kind: summary.kind,
            status: SummaryStatus::Draft,
            original_text: summary.original_text.clone(),
            instruction: summary.instruction.clone(),
            generated_summary: None,
            edited_summary: None,
            word_count_original: summary.word_count_original,
            word_count_generated: 0,
            processing_time: None,
            attempt_count: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
            processed_at: None,
            shared_at: None,
            shared_with: Vec::new(),
        };
        state.summaries.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_summary(&self, id: SummaryId) -> anyhow::Result<Option<Summary>> {
        Ok(self.stored(id))
    }

    async fn list_summaries(
        &self,
        owner_id: OwnerId,
        filter: &SummaryFilter,
    ) -> anyhow::Result<SummaryPage> {
        let search = filter.search.as_deref().map(str::to_lowercase);
        let state = self.state.lock().unwrap();

        let matching = state
            .summaries
            .values()
            .rev()
            .filter(|s| s.owner_id == owner_id)
            .filter(|s| filter.status.map_or(true, |status| s.status == status))
            .filter(|s| match &search {
                Some(needle) => [
                    Some(s.title.as_str()),
                    Some(s.original_text.as_str()),
                    s.generated_summary.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(needle)),
                None => true,
            })
            .collect::<Vec<_>>();

        let total = matching.len() as u64;
        let summaries = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit() as usize)
            .cloned()
            .collect();

        Ok(SummaryPage::new(summaries, total, filter))
    }

    async fn owner_stats(&self, owner_id: OwnerId) -> anyhow::Result<OwnerStats> {
        let state = self.state.lock().unwrap();
        let mut stats = OwnerStats::default();

        for summary in state.summaries.values().filter(|s| s.owner_id == owner_id) {
            stats.total += 1;
            match summary.status {
                SummaryStatus::Completed => stats.completed += 1,
                SummaryStatus::Draft | SummaryStatus::Processing => stats.pending += 1,
                SummaryStatus::Error => {}
            }
            if summary.shared_at.is_some() {
                stats.shared += 1;
            }
        }
        Ok(stats)
    }

    async fn update_summary(&self, summary: &Summary) -> anyhow::Result<()> {
        self.check_failure()?;
        if self.fail_updates_to == Some(summary.status) {
            anyhow::bail!("connection reset while saving summary {}", summary.id);
        }

        let mut state = self.state.lock().unwrap();
        let Some(stored) = state.summaries.get_mut(&summary.id) else {
            anyhow::bail!("Summary {} does not exist", summary.id);
        };
        *stored = summary.clone();
        stored.updated_at = Utc::now();
        state.status_history.push((summary.id, summary.status));
        Ok(())
    }

    async fn delete_summary(&self, id: SummaryId) -> anyhow::Result<bool> {
        let mut state = self.state.lock().unwrap();
        let removed = state.summaries.remove(&id).is_some();
        state.processing_logs.retain(|e| e.summary_id != id);
        state.share_logs.retain(|e| e.summary_id != id);
        Ok(removed)
    }

    async fn insert_processing_log(
        &self,
        entry: &NewProcessingLogEntry,
    ) -> anyhow::Result<ProcessingLogEntry> {
        if self.fail_log_writes {
            anyhow::bail!("processing_logs is read-only");
        }

        let mut state = self.state.lock().unwrap();
        let logged = ProcessingLogEntry {
            id: state.processing_logs.len() as i64 + 1,
            summary_id: entry.summary_id,
            attempt: entry.attempt,
            outcome: entry.outcome,
            detail: entry.detail.clone(),
            latency: entry.latency,
            model: entry.model.clone(),
            tokens_used: entry.tokens_used,
            prompt: entry.prompt.clone(),
            response: entry.response.clone(),
            created_at: Utc::now(),
        };
        state.processing_logs.push(logged.clone());
        Ok(logged)
    }

    async fn processing_logs(&self, summary_id: SummaryId) -> anyhow::Result<Vec<ProcessingLogEntry>> {
        Ok(self.attempts_for(summary_id))
    }

    async fn insert_share_log(
        &self,
        entry: &NewShareLogEntry,
    ) -> anyhow::Result<SharedSummaryLogEntry> {
        if self.fail_log_writes {
            anyhow::bail!("share_logs is read-only");
        }

        let mut state = self.state.lock().unwrap();
        let logged = SharedSummaryLogEntry {
            id: state.share_logs.len() as i64 + 1,
            summary_id: entry.summary_id,
            recipient: entry.recipient.clone(),
            subject: entry.subject.clone(),
            outcome: entry.outcome,
            reason: entry.reason.clone(),
            note: entry.note.clone(),
            created_at: Utc::now(),
        };
        state.share_logs.push(logged.clone());
        Ok(logged)
    }

    async fn share_logs(&self, summary_id: SummaryId) -> anyhow::Result<Vec<SharedSummaryLogEntry>> {
        Ok(self.shares_for(summary_id))
    }
}
