use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::{migrate::Migrator, postgres::PgPoolOptions, PgPool};

use crate::{
    datastore::DataStore,
    domain::{
        NewProcessingLogEntry, NewShareLogEntry, NewSummary, OwnerId, OwnerStats,
        ProcessingLogEntry, SharedSummaryLogEntry, Summary, SummaryFilter, SummaryId, SummaryPage,
    },
};

static MIGRATOR: Migrator = sqlx::migrate!();

#[derive(Debug, Clone)]
pub struct PgDataStore {
    pub pool: PgPool,
}

impl PgDataStore {
    /// Establish connection to database and run pending migrations
    pub async fn init(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .inspect_err(
                |e| tracing::error!(error = ?e, "Failed to establish connection to database"),
            )
            .context("Failed to connect to postgres database")?;

        MIGRATOR
            .run(&pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to run database migrations"))
            .context("Failed to run database migrations")?;

        Ok(PgDataStore { pool })
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: i64,
    owner_id: i64,
    title: String,
    kind: String,
    status: String,
    original_text: String,
    instruction: Option<String>,
    generated_summary: Option<String>,
    edited_summary: Option<String>,
    word_count_original: i32,
    word_count_generated: i32,
    processing_time_ms: Option<i64>,
    attempt_count: i32,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    shared_at: Option<DateTime<Utc>>,
    shared_with: Vec<String>,
}

impl TryFrom<SummaryRow> for Summary {
    type Error = anyhow::Error;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        Ok(Summary {
            id: SummaryId(row.id),
            owner_id: OwnerId(row.owner_id),
            title: row.title,
            kind: row.kind.parse()?,
            status: row.status.parse()?,
            original_text: row.original_text,
            instruction: row.instruction,
            generated_summary: row.generated_summary,
            edited_summary: row.edited_summary,
            word_count_original: u32::try_from(row.word_count_original)?,
            word_count_generated: u32::try_from(row.word_count_generated)?,
            processing_time: row
                .processing_time_ms
                .map(|ms| Duration::from_millis(ms.max(0) as u64)),
            attempt_count: u32::try_from(row.attempt_count)?,
            last_error: row.last_error,
            created_at: row.created_at,
            updated_at: row.updated_at,
            processed_at: row.processed_at,
            shared_at: row.shared_at,
            shared_with: row.shared_with,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProcessingLogRow {
    id: i64,
    summary_id: i64,
    attempt: i32,
    outcome: String,
    detail: Option<String>,
    latency_ms: i64,
    model: String,
    tokens_used: Option<i32>,
    prompt: String,
    response: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProcessingLogRow> for ProcessingLogEntry {
    type Error = anyhow::Error;

    fn try_from(row: ProcessingLogRow) -> Result<Self, Self::Error> {
        Ok(ProcessingLogEntry {
            id: row.id,
            summary_id: SummaryId(row.summary_id),
            attempt: u32::try_from(row.attempt)?,
            outcome: row.outcome.parse()?,
            detail: row.detail,
            latency: Duration::from_millis(row.latency_ms.max(0) as u64),
            model: row.model,
            tokens_used: row.tokens_used.map(u32::try_from).transpose()?,
            prompt: row.prompt,
            response: row.response,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ShareLogRow {
    id: i64,
    summary_id: i64,
    recipient: String,
    subject: String,
    outcome: String,
    reason: Option<String>,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ShareLogRow> for SharedSummaryLogEntry {
    type Error = anyhow::Error;

    fn try_from(row: ShareLogRow) -> Result<Self, Self::Error> {
        Ok(SharedSummaryLogEntry {
            id: row.id,
            summary_id: SummaryId(row.summary_id),
            recipient: row.recipient,
            subject: row.subject,
            outcome: row.outcome.parse()?,
            reason: row.reason,
            note: row.note,
            created_at: row.created_at,
        })
    }
}

fn duration_to_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// `ILIKE` pattern matching `search` anywhere, with wildcards in the input
/// taken literally
fn contains_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[derive(sqlx::FromRow)]
struct StatsRow {
    total: i64,
    completed: i64,
    pending: i64,
    shared: i64,
}

impl From<StatsRow> for OwnerStats {
    fn from(row: StatsRow) -> Self {
        OwnerStats {
            total: to_u64(row.total),
            completed: to_u64(row.completed),
            pending: to_u64(row.pending),
            shared: to_u64(row.shared),
        }
    }
}

const FILTERED_SUMMARIES: &str = r#"
    FROM summaries
    WHERE owner_id = $1
      AND ($2::TEXT IS NULL
           OR title ILIKE $2
           OR original_text ILIKE $2
           OR generated_summary ILIKE $2)
      AND ($3::TEXT IS NULL OR status = $3)
"#;

impl DataStore for PgDataStore {
    async fn create_summary(&self, summary: &NewSummary) -> anyhow::Result<Summary> {
        let row = sqlx::query_as::<_, SummaryRow>(
            r#"
            INSERT INTO summaries (owner_id, title, kind, status, original_text, instruction, word_count_original)
            VALUES ($1, $2, $3, 'draft', $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(summary.owner_id.0)
        .bind(&summary.title)
        .bind(summary.kind.as_str())
        .bind(&summary.original_text)
        .bind(&summary.instruction)
        .bind(to_i32(summary.word_count_original))
        .fetch_one(&self.pool)
        .await
        .inspect_err(|e| {
            tracing::error!(error = ?e, owner_id = %summary.owner_id, "Failed to insert summary")
        })
        .context("Failed to insert summary")?;

        row.try_into()
    }

    async fn get_summary(&self, id: SummaryId) -> anyhow::Result<Option<Summary>> {
        let row = sqlx::query_as::<_, SummaryRow>("SELECT * FROM summaries WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, summary_id = %id, "Failed to fetch summary"))
            .context("Failed to fetch summary")?;

        row.map(Summary::try_from).transpose()
    }

    async fn list_summaries(
        &self,
        owner_id: OwnerId,
        filter: &SummaryFilter,
    ) -> anyhow::Result<SummaryPage> {
        let pattern = filter.search.as_deref().map(contains_pattern);
        let status = filter.status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {FILTERED_SUMMARIES}"))
            .bind(owner_id.0)
            .bind(&pattern)
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, %owner_id, "Failed to count summaries"))
            .context("Failed to count summaries")?;

        let rows = sqlx::query_as::<_, SummaryRow>(&format!(
            "SELECT * {FILTERED_SUMMARIES} ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        ))
        .bind(owner_id.0)
        .bind(&pattern)
        .bind(status)
        .bind(i64::from(filter.limit()))
        .bind(i64::try_from(filter.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, %owner_id, "Failed to list summaries"))
        .context("Failed to list summaries")?;

        let summaries = rows
            .into_iter()
            .map(Summary::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(SummaryPage::new(summaries, to_u64(total), filter))
    }

    async fn owner_stats(&self, owner_id: OwnerId) -> anyhow::Result<OwnerStats> {
        let row = sqlx::query_as::<_, StatsRow>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                COUNT(*) FILTER (WHERE status IN ('draft', 'processing')) AS pending,
                COUNT(*) FILTER (WHERE shared_at IS NOT NULL) AS shared
            FROM summaries
            WHERE owner_id = $1
            "#,
        )
        .bind(owner_id.0)
        .fetch_one(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, %owner_id, "Failed to compute summary stats"))
        .context("Failed to compute summary stats")?;

        Ok(row.into())
    }

    async fn update_summary(&self, summary: &Summary) -> anyhow::Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE summaries SET
                title = $2,
                kind = $3,
                status = $4,
                original_text = $5,
                instruction = $6,
                generated_summary = $7,
                edited_summary = $8,
                word_count_original = $9,
                word_count_generated = $10,
                processing_time_ms = $11,
                attempt_count = $12,
                last_error = $13,
                processed_at = $14,
                shared_at = $15,
                shared_with = $16,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(summary.id.0)
        .bind(&summary.title)
        .bind(summary.kind.as_str())
        .bind(summary.status.as_str())
        .bind(&summary.original_text)
        .bind(&summary.instruction)
        .bind(&summary.generated_summary)
        .bind(&summary.edited_summary)
        .bind(to_i32(summary.word_count_original))
        .bind(to_i32(summary.word_count_generated))
        .bind(summary.processing_time.map(duration_to_millis))
        .bind(to_i32(summary.attempt_count))
        .bind(&summary.last_error)
        .bind(summary.processed_at)
        .bind(summary.shared_at)
        .bind(&summary.shared_with)
        .execute(&self.pool)
        .await
        .inspect_err(|e| {
            tracing::error!(error = ?e, summary_id = %summary.id, "Failed to update summary")
        })
        .context("Failed to update summary")?;

        if result.rows_affected() == 0 {
            anyhow::bail!("Summary {} does not exist", summary.id);
        }

        Ok(())
    }

    async fn delete_summary(&self, id: SummaryId) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM summaries WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, summary_id = %id, "Failed to delete summary"))
            .context("Failed to delete summary")?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_processing_log(
        &self,
        entry: &NewProcessingLogEntry,
    ) -> anyhow::Result<ProcessingLogEntry> {
        let row = sqlx::query_as::<_, ProcessingLogRow>(
            r#"
            INSERT INTO processing_logs
                (summary_id, attempt, outcome, detail, latency_ms, model, tokens_used, prompt, response)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(entry.summary_id.0)
        .bind(to_i32(entry.attempt))
        .bind(entry.outcome.as_str())
        .bind(&entry.detail)
        .bind(duration_to_millis(entry.latency))
        .bind(&entry.model)
        .bind(entry.tokens_used.map(to_i32))
        .bind(&entry.prompt)
        .bind(&entry.response)
        .fetch_one(&self.pool)
        .await
        .inspect_err(|e| {
            tracing::error!(
                error = ?e,
                summary_id = %entry.summary_id,
                attempt = entry.attempt,
                "Failed to insert processing log"
            )
        })
        .context("Failed to insert processing log")?;

        row.try_into()
    }

    async fn processing_logs(&self, summary_id: SummaryId) -> anyhow::Result<Vec<ProcessingLogEntry>> {
        let rows = sqlx::query_as::<_, ProcessingLogRow>(
            "SELECT * FROM processing_logs WHERE summary_id = $1 ORDER BY attempt ASC",
        )
        .bind(summary_id.0)
        .fetch_all(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, %summary_id, "Failed to fetch processing logs"))
        .context("Failed to fetch processing logs")?;

        rows.into_iter().map(ProcessingLogEntry::try_from).collect()
    }

    async fn insert_share_log(
        &self,
        entry: &NewShareLogEntry,
    ) -> anyhow::Result<SharedSummaryLogEntry> {
        let row = sqlx::query_as::<_, ShareLogRow>(
            r#"
            INSERT INTO share_logs (summary_id, recipient, subject, outcome, reason, note)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(entry.summary_id.0)
        .bind(&entry.recipient)
        .bind(&entry.subject)
        .bind(entry.outcome.as_str())
        .bind(&entry.reason)
        .bind(&entry.note)
        .fetch_one(&self.pool)
        .await
        .inspect_err(|e| {
            tracing::error!(
                error = ?e,
                summary_id = %entry.summary_id,
                recipient = %entry.recipient,
                "Failed to insert share log"
            )
        })
        .context("Failed to insert share log")?;

        row.try_into()
    }

    async fn share_logs(&self, summary_id: SummaryId) -> anyhow::Result<Vec<SharedSummaryLogEntry>> {
        let rows = sqlx::query_as::<_, ShareLogRow>(
            "SELECT * FROM share_logs WHERE summary_id = $1 ORDER BY id ASC",
        )
        .bind(summary_id.0)
        .fetch_all(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, %summary_id, "Failed to fetch share logs"))
        .context("Failed to fetch share logs")?;

        rows.into_iter().map(SharedSummaryLogEntry::try_from).collect()
    }
}
