mod mocks;

use std::time::Duration;

use mocks::{datastore::MockDataStore, mailer::MockMailer, summarizer::MockSummarizer};
use summary_datastore::{OwnerId, ShareOutcome, SummaryId, SummaryStatus};
use summary_pipeline::{
    sharing::address::parse_address, DeliveryFailure, Error, InputError, Owner, RetryPolicy,
    Sender, ShareDispatcher, Submission, SummaryProcessorBuilder,
};

const GENERATED: &str = "- Launch moved to October\n- Budget approved";

fn sender() -> Sender {
    Sender::new("Alice Doe", parse_address("alice@example.com").unwrap())
}

fn owner() -> Owner {
    Owner::new(OwnerId(7), "Alice Doe").with_api_key("gsk_owner_key")
}

/// Creates a summary and runs it through processing when `complete` is set
async fn summary(store: &MockDataStore, complete: bool) -> SummaryId {
    let processor = SummaryProcessorBuilder::new()
        .store(store.clone())
        .summarizer(MockSummarizer::new(GENERATED))
        .retry_policy(RetryPolicy::new(1))
        .build();

    let id = processor
        .create_submission(
            &owner(),
            Submission::pasted("Launch review", "We reviewed the launch plan in detail."),
        )
        .await
        .unwrap();

    if complete {
        processor.submit(id, &owner()).await.unwrap();
    }
    id
}

#[tokio::test]
async fn test_valid_and_invalid_recipients() {
    let store = MockDataStore::default();
    let mailer = MockMailer::default();
    let id = summary(&store, true).await;

    let dispatcher = ShareDispatcher::new(store.clone(), mailer.clone());
    let result = dispatcher
        .share(id, ["a@x.com", "not-an-address"], &sender(), None)
        .await
        .unwrap();

    assert!(result.is_partial());
    assert_eq!(result.sent.iter().collect::<Vec<_>>(), vec!["a@x.com"]);
    assert_eq!(
        result.failed.get("not-an-address"),
        Some(&DeliveryFailure::InvalidAddress)
    );

    assert_eq!(mailer.recipients(), vec!["a@x.com"]);

    let logs = store.shares_for(id);
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].recipient, "a@x.com");
    assert_eq!(logs[0].outcome, ShareOutcome::Sent);
    assert_eq!(logs[0].reason, None);
    assert_eq!(logs[1].recipient, "not-an-address");
    assert_eq!(logs[1].outcome, ShareOutcome::InvalidAddress);
    assert!(logs[1].reason.is_some());
    assert!(logs.iter().all(|l| l.subject == "Summary: Launch review"));
}

#[tokio::test]
async fn test_delivery_failure_does_not_stop_other_recipients() {
    let store = MockDataStore::default();
    let mailer = MockMailer::rejecting(&["b@y.com"]);
    let id = summary(&store, true).await;

    let dispatcher = ShareDispatcher::new(store.clone(), mailer.clone());
    let result = dispatcher
        .share(id, ["a@x.com", "b@y.com", "c@z.com"], &sender(), None)
        .await
        .unwrap();

    assert_eq!(
        result.sent.iter().collect::<Vec<_>>(),
        vec!["a@x.com", "c@z.com"]
    );
    match result.failed.get("b@y.com") {
        Some(DeliveryFailure::Delivery(reason)) => assert!(reason.contains("550")),
        other => panic!("Expected a delivery failure, got {other:?}"),
    }
    assert_eq!(mailer.recipients(), vec!["a@x.com", "c@z.com"]);

    let outcomes = store
        .shares_for(id)
        .iter()
        .map(|l| l.outcome)
        .collect::<Vec<_>>();
    assert_eq!(
        outcomes,
        vec![
            ShareOutcome::Sent,
            ShareOutcome::DeliveryError,
            ShareOutcome::Sent
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stalled_delivery_times_out() {
    let store = MockDataStore::default();
    let mailer = MockMailer::stalling(&["slow@x.com"]);
    let id = summary(&store, true).await;

    let dispatcher = ShareDispatcher::new(store.clone(), mailer.clone())
        .with_send_timeout(Duration::from_secs(10));
    let result = dispatcher
        .share(id, ["slow@x.com", "fast@x.com"], &sender(), None)
        .await
        .unwrap();

    assert_eq!(
        result.failed.get("slow@x.com"),
        Some(&DeliveryFailure::Timeout(Duration::from_secs(10)))
    );
    assert!(result.sent.contains("fast@x.com"));
    assert_eq!(store.shares_for(id)[0].outcome, ShareOutcome::Timeout);
}

#[tokio::test]
async fn test_share_requires_completed_summary() {
    let store = MockDataStore::default();
    let mailer = MockMailer::default();
    let id = summary(&store, false).await;

    let dispatcher = ShareDispatcher::new(store.clone(), mailer.clone());
    let result = dispatcher.share(id, ["a@x.com"], &sender(), None).await;

    assert!(matches!(
        result,
        Err(Error::InvalidTransition {
            status: SummaryStatus::Draft,
            action: "share",
            ..
        })
    ));
    assert!(mailer.sent().is_empty());
    assert!(store.shares_for(id).is_empty());
}

#[tokio::test]
async fn test_share_unknown_summary() {
    let dispatcher = ShareDispatcher::new(MockDataStore::default(), MockMailer::default());

    let result = dispatcher
        .share(SummaryId(404), ["a@x.com"], &sender(), None)
        .await;

    assert!(matches!(result, Err(Error::NotFound(SummaryId(404)))));
}

#[tokio::test]
async fn test_blank_and_duplicate_recipients() {
    let store = MockDataStore::default();
    let mailer = MockMailer::default();
    let id = summary(&store, true).await;
    let dispatcher = ShareDispatcher::new(store.clone(), mailer.clone());

    let result = dispatcher
        .share(id, [" a@x.com ", "", "a@x.com", "   "], &sender(), None)
        .await
        .unwrap();

    assert!(result.all_sent());
    assert_eq!(mailer.sent().len(), 1);
    assert_eq!(store.shares_for(id).len(), 1);

    let nobody = dispatcher.share(id, ["", " "], &sender(), None).await;
    assert!(matches!(nobody, Err(Error::Input(InputError::NoRecipients))));
    assert_eq!(store.shares_for(id).len(), 1);
}

#[tokio::test]
async fn test_edited_text_is_sent() {
    let store = MockDataStore::default();
    let mailer = MockMailer::default();
    let id = summary(&store, true).await;

    let mut edited = store.stored(id).unwrap();
    edited.edited_summary = Some("Launch slips one month.".into());
    {
        let mut state = store.state.lock().unwrap();
        state.summaries.insert(id, edited);
    }

    let dispatcher = ShareDispatcher::new(store.clone(), mailer.clone());
    dispatcher
        .share(id, ["a@x.com"], &sender(), Some("FYI before Monday"))
        .await
        .unwrap();

    let sent = mailer.sent();
    let email = &sent[0];
    assert_eq!(email.subject, "Summary: Launch review");
    assert_eq!(email.from.name.as_deref(), Some("Alice Doe"));
    assert_eq!(email.from.email.to_string(), "alice@example.com");
    assert!(email.body.starts_with("Message from Alice Doe:\nFYI before Monday\n"));
    assert!(email.body.contains("Launch slips one month."));
    assert!(!email.body.contains("Budget approved"));
    assert!(email.body.contains("Type: Meeting Notes"));
}

#[tokio::test]
async fn test_sharing_metadata_is_updated() {
    let store = MockDataStore::default();
    let id = summary(&store, true).await;

    let dispatcher = ShareDispatcher::new(store.clone(), MockMailer::rejecting(&["b@y.com"]));
    dispatcher
        .share(id, ["b@y.com", "a@x.com"], &sender(), None)
        .await
        .unwrap();

    let stored = store.stored(id).unwrap();
    assert!(stored.shared_at.is_some());
    assert_eq!(stored.shared_with, vec!["a@x.com".to_string()]);
    assert_eq!(stored.status, SummaryStatus::Completed, "Sharing never changes status");
}

#[tokio::test]
async fn test_every_share_call_is_logged() {
    let store = MockDataStore::default();
    let id = summary(&store, true).await;
    let dispatcher = ShareDispatcher::new(store.clone(), MockMailer::default());

    dispatcher.share(id, ["a@x.com"], &sender(), None).await.unwrap();
    dispatcher
        .share(id, ["a@x.com", "b@y.com"], &sender(), None)
        .await
        .unwrap();

    assert_eq!(store.shares_for(id).len(), 3);
}

#[tokio::test]
async fn test_share_log_failures_are_swallowed() {
    let store = MockDataStore::with_failing_log_writes();
    let mailer = MockMailer::default();
    let id = summary(&store, true).await;

    let dispatcher = ShareDispatcher::new(store.clone(), mailer.clone());
    let result = dispatcher
        .share(id, ["a@x.com"], &sender(), None)
        .await
        .unwrap();

    assert!(result.all_sent());
    assert_eq!(mailer.sent().len(), 1);
}

#[tokio::test]
async fn test_share_log_keeps_the_note() {
    let store = MockDataStore::default();
    let id = summary(&store, true).await;
    let dispatcher = ShareDispatcher::new(store.clone(), MockMailer::default());

    dispatcher
        .share(id, ["a@x.com", "nope"], &sender(), Some("  FYI before Monday "))
        .await
        .unwrap();
    dispatcher
        .share(id, ["b@y.com"], &sender(), Some("   "))
        .await
        .unwrap();

    let notes = store
        .shares_for(id)
        .into_iter()
        .map(|l| l.note)
        .collect::<Vec<_>>();
    assert_eq!(
        notes,
        vec![
            Some("FYI before Monday".to_string()),
            Some("FYI before Monday".to_string()),
            None
        ]
    );
}
