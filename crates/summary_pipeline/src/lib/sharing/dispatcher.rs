use std::time::Duration;

use chrono::Utc;
use itertools::Itertools;
use summary_datastore::{DataStore, NewShareLogEntry, ShareOutcome, SummaryId, SummaryStatus};

use crate::{
    sharing::{
        address::parse_address,
        message::{render_body, subject},
        DeliveryFailure, Mailer, OutgoingEmail, Sender, ShareResult,
    },
    Error, InputError,
};

/// Emails completed summaries and keeps the per-recipient share log
#[derive(Debug)]
pub struct ShareDispatcher<D, M>
where
    D: DataStore + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    store: D,
    mailer: M,
    send_timeout: Duration,
}

impl<D, M> ShareDispatcher<D, M>
where
    D: DataStore + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    pub fn new(store: D, mailer: M) -> Self {
        Self {
            store,
            mailer,
            send_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    /// Sends the final text of a completed summary to every recipient.
    ///
    /// Blank and duplicate recipients are dropped. Invalid addresses are
    /// reported without a delivery attempt, and a failure for one recipient
    /// never stops delivery to the others. Only problems with the summary
    /// itself are returned as `Err`.
    #[tracing::instrument(skip(self, recipients, sender, note), fields(sender = %sender.address))]
    pub async fn share<I, R>(
        &self,
        id: SummaryId,
        recipients: I,
        sender: &Sender,
        note: Option<&str>,
    ) -> Result<ShareResult, Error>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<str>,
    {
        let mut summary = self
            .store
            .get_summary(id)
            .await?
            .ok_or(Error::NotFound(id))?;

        if summary.status != SummaryStatus::Completed {
            return Err(Error::InvalidTransition {
                id,
                status: summary.status,
                action: "share",
            });
        }

        let final_text = summary
            .final_text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(Error::NothingToShare(id))?
            .to_string();

        let recipients = recipients
            .into_iter()
            .map(|r| r.as_ref().trim().to_string())
            .filter(|r| !r.is_empty())
            .unique()
            .collect::<Vec<_>>();
        if recipients.is_empty() {
            return Err(InputError::NoRecipients.into());
        }

        let note = note.map(str::trim).filter(|n| !n.is_empty());
        let shared_at = Utc::now();
        let subject = subject(&summary);
        let body = render_body(&summary, &final_text, &sender.name, note, shared_at);
        let from = sender.mailbox();

        let mut result = ShareResult::default();
        for recipient in recipients {
            let delivery = match parse_address(&recipient) {
                Ok(to) => {
                    self.deliver(OutgoingEmail {
                        from: from.clone(),
                        to,
                        subject: subject.clone(),
                        body: body.clone(),
                    })
                    .await
                }
                Err(failure) => Err(failure),
            };

            self.record(id, &recipient, &subject, note, &delivery).await;

            match delivery {
                Ok(()) => {
                    result.sent.insert(recipient);
                }
                Err(failure) => {
                    tracing::warn!(%recipient, error = %failure, "Failed to share summary");
                    result.failed.insert(recipient, failure);
                }
            }
        }

        if !result.sent.is_empty() {
            summary.shared_at = Some(shared_at);
            summary.shared_with = result.sent.iter().cloned().collect();
            if let Err(e) = self.store.update_summary(&summary).await {
                tracing::warn!(error = ?e, "Failed to update sharing status");
            }
        }

        tracing::info!(
            sent = result.sent.len(),
            failed = result.failed.len(),
            "Shared summary"
        );
        Ok(result)
    }

    async fn deliver(&self, email: OutgoingEmail) -> Result<(), DeliveryFailure> {
        match tokio::time::timeout(self.send_timeout, self.mailer.send(email)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(DeliveryFailure::Delivery(e.to_string())),
            Err(_) => Err(DeliveryFailure::Timeout(self.send_timeout)),
        }
    }

    /// Share log writes never fail the share request
    async fn record(
        &self,
        summary_id: SummaryId,
        recipient: &str,
        subject: &str,
        note: Option<&str>,
        delivery: &Result<(), DeliveryFailure>,
    ) {
        let entry = NewShareLogEntry {
            summary_id,
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            outcome: match delivery {
                Ok(()) => ShareOutcome::Sent,
                Err(failure) => failure.outcome(),
            },
            reason: delivery.as_ref().err().map(ToString::to_string),
            note: note.map(str::to_string),
        };

        if let Err(e) = self.store.insert_share_log(&entry).await {
            tracing::warn!(error = ?e, %recipient, "Failed to record share attempt");
        }
    }
}
