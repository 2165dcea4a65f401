use summary_datastore::{DataStore, NewProcessingLogEntry};

/// Append-only record of AI invocation attempts.
///
/// Writes never fail the surrounding operation: a store error is reported
/// through `tracing` and dropped.
pub struct ProcessingLog<'a, D> {
    store: &'a D,
}

impl<'a, D> ProcessingLog<'a, D>
where
    D: DataStore + Send + Sync,
{
    pub fn new(store: &'a D) -> Self {
        Self { store }
    }

    #[tracing::instrument(
        skip_all,
        fields(summary_id = %entry.summary_id, attempt = entry.attempt, outcome = %entry.outcome)
    )]
    pub async fn record(&self, entry: &NewProcessingLogEntry) {
        match self.store.insert_processing_log(entry).await {
            Ok(_) if entry.outcome.is_success() => {
                tracing::debug!(latency_ms = entry.latency.as_millis() as u64, "Recorded successful attempt")
            }
            Ok(_) => tracing::info!(
                latency_ms = entry.latency.as_millis() as u64,
                detail = entry.detail.as_deref().unwrap_or_default(),
                "Recorded failed attempt"
            ),
            Err(e) => tracing::warn!(error = ?e, "Failed to record processing attempt"),
        }
    }
}
