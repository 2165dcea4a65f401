//! # Sharing
//!
//! Emails completed summaries to recipients. Each recipient is handled on its
//! own and gets exactly one entry in the share log, whatever the outcome.

pub mod address;
pub mod dispatcher;
pub mod message;
pub mod smtp;

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
    future::Future,
    time::Duration,
};

use lettre::{message::Mailbox, Address};
use summary_datastore::ShareOutcome;

pub trait Mailer {
    type Error: Display;

    fn send(&self, email: OutgoingEmail) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub from: Mailbox,
    pub to: Address,
    pub subject: String,
    pub body: String,
}

/// The person a summary is shared by
#[derive(Debug, Clone)]
pub struct Sender {
    pub name: String,
    pub address: Address,
}

impl Sender {
    pub fn new(name: impl Into<String>, address: Address) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }

    pub fn mailbox(&self) -> Mailbox {
        let name = self.name.trim();
        Mailbox::new((!name.is_empty()).then(|| name.to_string()), self.address.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryFailure {
    #[error("Invalid email address")]
    InvalidAddress,
    #[error("Delivery failed: {0}")]
    Delivery(String),
    #[error("Delivery timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),
}

impl DeliveryFailure {
    pub fn outcome(&self) -> ShareOutcome {
        match self {
            Self::InvalidAddress => ShareOutcome::InvalidAddress,
            Self::Delivery(_) => ShareOutcome::DeliveryError,
            Self::Timeout(_) => ShareOutcome::Timeout,
        }
    }
}

/// Aggregate outcome of a share request. Partial success is a valid result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareResult {
    pub sent: BTreeSet<String>,
    pub failed: BTreeMap<String, DeliveryFailure>,
}

impl ShareResult {
    pub fn all_sent(&self) -> bool {
        self.failed.is_empty() && !self.sent.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        !self.sent.is_empty() && !self.failed.is_empty()
    }
}
