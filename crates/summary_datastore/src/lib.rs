//! # DataStore Module
//!
//! This module provides functionality for persisting transcript summaries
//! together with their append-only processing and sharing logs.
//!
//! The module uses sqlx for database operations and exposes a [`DataStore`]
//! trait so the summarization pipeline can run against any backing store.

mod datastore;
mod domain;

pub use datastore::postgres::PgDataStore;
pub use datastore::DataStore;
pub use domain::{
    AttemptOutcome, NewProcessingLogEntry, NewShareLogEntry, NewSummary, OwnerId, OwnerStats,
    ProcessingLogEntry, ShareOutcome, SharedSummaryLogEntry, Summary, SummaryFilter, SummaryId,
    SummaryKind, SummaryPage, SummaryStatus, UnknownVariant,
};
