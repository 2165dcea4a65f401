use std::time::Duration;

use summary_datastore::DataStore;

use crate::{
    processor::{retry::RetryPolicy, PipelineSettings},
    ApiKey, Summarizer, SummaryProcessor,
};

pub struct SummaryProcessorBuilder<D = (), S = ()> {
    store: D,
    summarizer: S,
    settings: PipelineSettings,
}

impl Default for SummaryProcessorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryProcessorBuilder {
    pub fn new() -> Self {
        Self {
            store: (),
            summarizer: (),
            settings: PipelineSettings::default(),
        }
    }
}

impl<D, S> SummaryProcessorBuilder<D, S> {
    pub fn store<D2: DataStore + Send + Sync + 'static>(
        self,
        store: D2,
    ) -> SummaryProcessorBuilder<D2, S> {
        SummaryProcessorBuilder {
            store,
            summarizer: self.summarizer,
            settings: self.settings,
        }
    }

    pub fn summarizer<S2: Summarizer + Send + Sync + 'static>(
        self,
        summarizer: S2,
    ) -> SummaryProcessorBuilder<D, S2> {
        SummaryProcessorBuilder {
            store: self.store,
            summarizer,
            settings: self.settings,
        }
    }

    pub fn settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.settings.model = model.into();
        self
    }

    pub fn max_text_length(mut self, max_text_length: usize) -> Self {
        self.settings.max_text_length = max_text_length;
        self
    }

    pub fn max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.settings.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn ai_timeout(mut self, timeout: Duration) -> Self {
        self.settings.ai_timeout = timeout;
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.settings.retry = retry;
        self
    }

    pub fn fallback_api_key(mut self, api_key: Option<ApiKey>) -> Self {
        self.settings.fallback_api_key = api_key;
        self
    }
}

impl<D, S> SummaryProcessorBuilder<D, S>
where
    D: DataStore + Send + Sync + 'static,
    S: Summarizer + Send + Sync + 'static,
{
    pub fn build(mut self) -> SummaryProcessor<D, S> {
        if self.settings.model.is_empty() {
            self.settings.model = S::DEFAULT_MODEL.to_string();
        }

        SummaryProcessor {
            store: self.store,
            summarizer: self.summarizer,
            settings: self.settings,
        }
    }
}
