use chrono::{DateTime, Utc};
use summary_datastore::Summary;

use crate::normalizer::word_count;

const RULE_WIDTH: usize = 50;
const DATE_FORMAT: &str = "%B %d, %Y at %I:%M %p";

pub fn subject(summary: &Summary) -> String {
    format!("Summary: {}", summary.title)
}

/// Plain-text email body for a shared summary
pub fn render_body(
    summary: &Summary,
    final_text: &str,
    sender_name: &str,
    note: Option<&str>,
    shared_at: DateTime<Utc>,
) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut lines = Vec::new();

    if let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) {
        lines.push(format!("Message from {sender_name}:"));
        lines.push(note.to_string());
        lines.push(String::new());
    }

    lines.extend([
        format!("Summary: {}", summary.title),
        format!("Type: {}", summary.kind.label()),
        format!("Created: {}", summary.created_at.format(DATE_FORMAT)),
        format!("Shared by: {sender_name}"),
        format!("Shared on: {}", shared_at.format(DATE_FORMAT)),
        String::new(),
        rule.clone(),
        "SUMMARY CONTENT".to_string(),
        rule.clone(),
        String::new(),
        final_text.to_string(),
        String::new(),
        rule,
        String::new(),
        format!("Original text: {} words", summary.word_count_original),
        format!("Summary: {} words", word_count(final_text)),
        String::new(),
        "This summary was generated using AI Summarizer.".to_string(),
    ]);

    lines.join("\n")
}
