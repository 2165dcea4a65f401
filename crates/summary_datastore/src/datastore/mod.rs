use std::future::Future;

use crate::domain::{
    NewProcessingLogEntry, NewShareLogEntry, NewSummary, OwnerId, OwnerStats, ProcessingLogEntry,
    SharedSummaryLogEntry, Summary, SummaryFilter, SummaryId, SummaryPage,
};

pub mod postgres;

pub trait DataStore {
    fn create_summary(
        &self,
        summary: &NewSummary,
    ) -> impl Future<Output = anyhow::Result<Summary>> + Send;

    fn get_summary(
        &self,
        id: SummaryId,
    ) -> impl Future<Output = anyhow::Result<Option<Summary>>> + Send;

    /// One page of the summaries belonging to `owner_id` that match `filter`,
    /// newest first
    fn list_summaries(
        &self,
        owner_id: OwnerId,
        filter: &SummaryFilter,
    ) -> impl Future<Output = anyhow::Result<SummaryPage>> + Send;

    fn owner_stats(&self, owner_id: OwnerId) -> impl Future<Output = anyhow::Result<OwnerStats>> + Send;

    /// Overwrites every mutable column of the summary row and bumps `updated_at`
    fn update_summary(&self, summary: &Summary) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Returns `false` when no row matched `id`
    fn delete_summary(&self, id: SummaryId) -> impl Future<Output = anyhow::Result<bool>> + Send;

    fn insert_processing_log(
        &self,
        entry: &NewProcessingLogEntry,
    ) -> impl Future<Output = anyhow::Result<ProcessingLogEntry>> + Send;

    /// Processing log of a summary ordered by attempt number
    fn processing_logs(
        &self,
        summary_id: SummaryId,
    ) -> impl Future<Output = anyhow::Result<Vec<ProcessingLogEntry>>> + Send;

    fn insert_share_log(
        &self,
        entry: &NewShareLogEntry,
    ) -> impl Future<Output = anyhow::Result<SharedSummaryLogEntry>> + Send;

    /// Share log of a summary in insertion order
    fn share_logs(
        &self,
        summary_id: SummaryId,
    ) -> impl Future<Output = anyhow::Result<Vec<SharedSummaryLogEntry>>> + Send;
}

impl<T: DataStore + Send + Sync> DataStore for &T {
    async fn create_summary(&self, summary: &NewSummary) -> anyhow::Result<Summary> {
        (**self).create_summary(summary).await
    }

    async fn get_summary(&self, id: SummaryId) -> anyhow::Result<Option<Summary>> {
        (**self).get_summary(id).await
    }

    async fn list_summaries(
        &self,
        owner_id: OwnerId,
        filter: &SummaryFilter,
    ) -> anyhow::Result<SummaryPage> {
        (**self).list_summaries(owner_id, filter).await
    }

    async fn owner_stats(&self, owner_id: OwnerId) -> anyhow::Result<OwnerStats> {
        (**self).owner_stats(owner_id).await
    }

    async fn update_summary(&self, summary: &Summary) -> anyhow::Result<()> {
        (**self).update_summary(summary).await
    }

    async fn delete_summary(&self, id: SummaryId) -> anyhow::Result<bool> {
        (**self).delete_summary(id).await
    }

    async fn insert_processing_log(
        &self,
        entry: &NewProcessingLogEntry,
    ) -> anyhow::Result<ProcessingLogEntry> {
        (**self).insert_processing_log(entry).await
    }

    async fn processing_logs(&self, summary_id: SummaryId) -> anyhow::Result<Vec<ProcessingLogEntry>> {
        (**self).processing_logs(summary_id).await
    }

    async fn insert_share_log(
        &self,
        entry: &NewShareLogEntry,
    ) -> anyhow::Result<SharedSummaryLogEntry> {
        (**self).insert_share_log(entry).await
    }

    async fn share_logs(&self, summary_id: SummaryId) -> anyhow::Result<Vec<SharedSummaryLogEntry>> {
        (**self).share_logs(summary_id).await
    }
}
