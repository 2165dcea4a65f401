use summary_datastore::{OwnerId, SummaryId, SummaryStatus};

use crate::normalizer::InputError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("Summary {0} not found")]
    NotFound(SummaryId),
    #[error("Cannot {action} summary {id} while it is {status}")]
    InvalidTransition {
        id: SummaryId,
        status: SummaryStatus,
        action: &'static str,
    },
    #[error("No AI API key configured for owner {0}")]
    MissingApiKey(OwnerId),
    #[error("Summary {0} has no content to share")]
    NothingToShare(SummaryId),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
