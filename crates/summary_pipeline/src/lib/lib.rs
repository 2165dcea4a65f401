mod error;
mod llm;
pub mod normalizer;
mod processing_log;
mod processor;
pub mod sharing;
pub mod tracing;
pub mod types;

pub use error::Error;
pub use llm::{
    openai, prompt,
    summarizer::{ApiKey, SummarizeError, Summarizer, SummaryRequest, SummaryResponse},
};
pub use normalizer::{InputError, NormalizedText};
pub use processing_log::ProcessingLog;
pub use processor::{
    builder::SummaryProcessorBuilder, retry::RetryPolicy, PipelineSettings, SummaryProcessor,
};
pub use sharing::{
    dispatcher::ShareDispatcher, DeliveryFailure, Mailer, OutgoingEmail, Sender, ShareResult,
};
pub use types::{Owner, ProcessingOutcome, ProcessingReport, Submission, SubmissionText, SummaryView};
