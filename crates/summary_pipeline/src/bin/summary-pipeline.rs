use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use summary_datastore::{OwnerId, PgDataStore, SummaryFilter, SummaryId, SummaryKind, SummaryStatus};
use summary_pipeline::{
    normalizer::decode_upload,
    openai::OpenAIClient,
    sharing::{
        address::{parse_address, parse_recipient_list},
        smtp::{SmtpMailer, SmtpPassword},
    },
    tracing::init_tracing_subscriber,
    ApiKey, Owner, ProcessingOutcome, RetryPolicy, Sender, ShareDispatcher, Submission,
    SubmissionText, SummaryProcessor, SummaryProcessorBuilder,
};

#[derive(Parser)]
#[command(name = "summary-pipeline", about = "Transcript summarization pipeline")]
struct Cli {
    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Fallback AI API key, used when the owner has none
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base url of the OpenAI compatible API
    #[arg(long, env = "AI_BASE_URL", default_value = OpenAIClient::GROQ_BASE_URL)]
    ai_base_url: String,

    /// Model used for summarization
    #[arg(long, env = "AI_MODEL")]
    ai_model: Option<String>,

    /// Timeout of a single AI request in seconds
    #[arg(long, env = "AI_TIMEOUT_SECS", default_value = "60")]
    ai_timeout_secs: u64,

    /// Attempts per submission, including the first one
    #[arg(long, env = "AI_MAX_ATTEMPTS", default_value = "3")]
    ai_max_attempts: u32,

    /// Maximum transcript length in characters
    #[arg(long, env = "MAX_TEXT_LENGTH", default_value = "50000")]
    max_text_length: usize,

    /// Owner the command acts on behalf of
    #[arg(long, env = "OWNER_ID", default_value = "1")]
    owner_id: i64,

    /// Owner display name, used as the sender name of shared emails
    #[arg(long, env = "OWNER_NAME", default_value = "")]
    owner_name: String,

    #[command(flatten)]
    smtp: SmtpArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct SmtpArgs {
    #[arg(long, env = "SMTP_HOST", default_value = "smtp.gmail.com")]
    smtp_host: String,

    #[arg(long, env = "SMTP_PORT", default_value_t = SmtpMailer::DEFAULT_PORT)]
    smtp_port: u16,

    #[arg(long, env = "SMTP_USERNAME")]
    smtp_username: Option<String>,

    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    smtp_password: Option<String>,

    /// Address shared summaries are sent from
    #[arg(long, env = "DEFAULT_FROM_EMAIL", default_value = "noreply@aisummarizer.com")]
    from_email: String,

    /// Timeout of a single email delivery in seconds
    #[arg(long, env = "SMTP_TIMEOUT_SECS", default_value = "30")]
    smtp_timeout_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Store a transcript as a new draft summary
    Create {
        #[arg(long)]
        title: String,
        /// meeting, call, document or other
        #[arg(long, default_value = "meeting")]
        kind: SummaryKind,
        #[command(flatten)]
        text: TextInput,
        /// Custom instruction for the AI
        #[arg(long)]
        instruction: Option<String>,
        /// Submit for processing right after creating it
        #[arg(long)]
        submit: bool,
    },
    /// Run AI processing for a draft or failed summary
    Submit { id: i64 },
    /// Print a summary with its processing and share logs as JSON
    Show { id: i64 },
    /// List the owner's summaries, newest first
    List {
        /// Matches title, transcript or generated summary
        #[arg(long)]
        search: Option<String>,
        /// draft, processing, completed or error
        #[arg(long)]
        status: Option<SummaryStatus>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = SummaryFilter::DEFAULT_PER_PAGE)]
        per_page: u32,
    },
    /// Counters for the owner's summaries and the most recent ones
    Stats,
    /// Replace the summary text of a completed summary
    Edit {
        id: i64,
        #[command(flatten)]
        text: TextInput,
    },
    /// Send a completed or failed summary back to draft
    Reset { id: i64 },
    /// Email a completed summary
    Share {
        id: i64,
        /// Recipients separated by commas, semicolons or spaces
        #[arg(long)]
        to: String,
        /// Personal message placed above the summary
        #[arg(long)]
        note: Option<String>,
    },
    /// Delete a summary and its logs
    Delete { id: i64 },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct TextInput {
    /// Read the text from a .txt or .md file
    #[arg(long)]
    file: Option<PathBuf>,
    /// Pass the text inline
    #[arg(long)]
    text: Option<String>,
}

impl Cli {
    fn owner(&self) -> Owner {
        Owner::new(OwnerId(self.owner_id), self.owner_name.clone())
    }

    fn build_processor(&self, store: PgDataStore) -> SummaryProcessor<PgDataStore, OpenAIClient> {
        let mut builder = SummaryProcessorBuilder::new()
            .store(store)
            .summarizer(OpenAIClient::new().with_base_url(&self.ai_base_url))
            .max_text_length(self.max_text_length)
            .ai_timeout(Duration::from_secs(self.ai_timeout_secs))
            .retry_policy(RetryPolicy::new(self.ai_max_attempts))
            .fallback_api_key(self.api_key.clone().map(ApiKey::from));

        if let Some(model) = &self.ai_model {
            builder = builder.model(model);
        }

        builder.build()
    }

    fn build_mailer(&self) -> anyhow::Result<SmtpMailer> {
        let smtp = &self.smtp;
        let timeout = Duration::from_secs(smtp.smtp_timeout_secs);

        match (&smtp.smtp_username, &smtp.smtp_password) {
            (Some(username), Some(password)) => Ok(SmtpMailer::starttls(
                &smtp.smtp_host,
                smtp.smtp_port,
                username,
                SmtpPassword::new(password),
                timeout,
            )?),
            _ => {
                tracing::warn!(host = %smtp.smtp_host, "No SMTP credentials, using an unencrypted connection");
                Ok(SmtpMailer::unencrypted(&smtp.smtp_host, smtp.smtp_port))
            }
        }
    }
}

async fn read_text(input: &TextInput) -> anyhow::Result<SubmissionText> {
    match (&input.file, &input.text) {
        (Some(path), _) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            Ok(SubmissionText::Upload { file_name, bytes })
        }
        (None, Some(text)) => Ok(SubmissionText::Pasted(text.clone())),
        (None, None) => anyhow::bail!("Either --file or --text is required"),
    }
}

async fn submit(
    processor: &SummaryProcessor<PgDataStore, OpenAIClient>,
    id: SummaryId,
    owner: &Owner,
) -> anyhow::Result<()> {
    let report = processor.submit(id, owner).await?;

    match report.outcome {
        ProcessingOutcome::Completed => {
            println!(
                "Summary {id} completed after {} attempt(s):\n\n{}",
                report.attempts,
                report.summary.final_text().unwrap_or_default()
            );
        }
        ProcessingOutcome::Failed(err) => {
            println!("Summary {id} failed after {} attempt(s): {err}", report.attempts);
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let _guard = sentry::init((
        std::env::var("SENTRY_DSN").unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some("production".into()),
            ..Default::default()
        },
    ));

    let cli = Cli::parse();
    init_tracing_subscriber()?;

    let store = PgDataStore::init(&cli.database_url).await?;
    let owner = cli.owner();
    let processor = cli.build_processor(store.clone());

    match &cli.command {
        Command::Create {
            title,
            kind,
            text,
            instruction,
            submit: submit_now,
        } => {
            let submission = Submission {
                title: title.clone(),
                kind: *kind,
                text: read_text(text).await?,
                instruction: instruction.clone(),
            };

            let id = processor.create_submission(&owner, submission).await?;
            println!("Created summary {id}");

            if *submit_now {
                submit(&processor, id, &owner).await?;
            }
        }
        Command::Submit { id } => submit(&processor, SummaryId(*id), &owner).await?,
        Command::Show { id } => {
            let view = processor.get_summary(SummaryId(*id)).await?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Command::List {
            search,
            status,
            page,
            per_page,
        } => {
            let mut filter = SummaryFilter::default()
                .with_page(*page)
                .with_per_page(*per_page);
            if let Some(search) = search {
                filter = filter.with_search(search.as_str());
            }
            if let Some(status) = status {
                filter = filter.with_status(*status);
            }

            let page = processor.list_summaries(owner.id, &filter).await?;
            for summary in &page.summaries {
                print_row(summary);
            }
            println!(
                "page {} of {} ({} summaries)",
                page.page,
                page.total_pages(),
                page.total
            );
        }
        Command::Stats => {
            let stats = processor.owner_stats(owner.id).await?;
            println!(
                "total {}\tcompleted {}\tpending {}\tshared {}",
                stats.total, stats.completed, stats.pending, stats.shared
            );

            let recent = processor
                .list_summaries(owner.id, &SummaryFilter::default().with_per_page(5))
                .await?;
            for summary in &recent.summaries {
                print_row(summary);
            }
        }
        Command::Edit { id, text } => {
            let text = match read_text(text).await? {
                SubmissionText::Pasted(text) => text,
                SubmissionText::Upload { file_name, bytes } => {
                    decode_upload(
                        &file_name,
                        &bytes,
                        processor.settings().max_upload_bytes,
                    )?
                }
            };
            processor.edit(SummaryId(*id), &text).await?;
            println!("Updated summary {id}");
        }
        Command::Reset { id } => {
            processor.reset_to_draft(SummaryId(*id)).await?;
            println!("Summary {id} is a draft again");
        }
        Command::Share { id, to, note } => {
            let from = parse_address(&cli.smtp.from_email)
                .with_context(|| format!("Invalid sender address {:?}", cli.smtp.from_email))?;
            let sender = Sender::new(owner.display_name.clone(), from);
            let dispatcher = ShareDispatcher::new(store, cli.build_mailer()?)
                .with_send_timeout(Duration::from_secs(cli.smtp.smtp_timeout_secs));

            let result = dispatcher
                .share(SummaryId(*id), parse_recipient_list(to), &sender, note.as_deref())
                .await?;

            for recipient in &result.sent {
                println!("sent\t{recipient}");
            }
            for (recipient, reason) in &result.failed {
                println!("failed\t{recipient}\t{reason}");
            }
        }
        Command::Delete { id } => {
            processor.delete_summary(SummaryId(*id)).await?;
            println!("Deleted summary {id}");
        }
    }

    Ok(())
}

fn print_row(summary: &summary_datastore::Summary) {
    println!(
        "{}\t{}\t{}\t{}",
        summary.id,
        summary.status,
        summary.created_at.format("%Y-%m-%d %H:%M"),
        summary.title
    );
}
