use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deadline_reminder::config::ReminderConfig;
use deadline_reminder::due::days_until;
use deadline_reminder::mail_client::MailgunClient;
use deadline_reminder::notifier::Notifier;
use deadline_reminder::notion_client::NotionClient;
use deadline_reminder::schedule::Job;
use deadline_reminder::ReminderScheduler;

#[derive(Parser)]
#[command(name = "deadline-reminder")]
#[command(about = "Mail reminders for upcoming deadlines in a Notion task database")]
struct Cli {
    /// Path to a TOML file with schedule settings.
    ///
    /// Every field is optional; credentials always come from the environment.
    #[arg(short, long, env = "REMINDER_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduler until interrupted (default)
    Run,
    /// Fetch the task database and print every tracked task
    List,
    /// Fetch, then archive completed tasks once
    Sweep,
    /// Fetch, then send urgent/soon reminders once
    Remind,
    /// Fetch, then send the weekly digest once
    Digest,
    /// Print when each job fires next
    Next,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deadline_reminder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = ReminderConfig::load(cli.config.as_deref())?;
    let timezone = config.schedule.timezone()?;
    let timeout = config.schedule.http_timeout();

    let source = NotionClient::new(&config.notion, timeout)
        .context("Failed to create Notion client")?;
    let mailer =
        MailgunClient::new(&config.mail, timeout).context("Failed to create Mailgun client")?;
    let notifier = Notifier::new(
        mailer,
        config.mail.sender(),
        config.mail.recipient.clone(),
        config.schedule.mail_concurrency,
    );
    let scheduler =
        ReminderScheduler::new(source, notifier, timezone, config.schedule.triggers()?);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(scheduler).await,
        Command::List => {
            scheduler.run_job(Job::Reset).await?;
            let today = scheduler.today();
            let store = scheduler.store();
            let store = store.lock().await;

            if store.is_empty() {
                println!("No tasks tracked.");
            }
            for (title, task) in store.iter() {
                println!(
                    "{:>4}d  {}  {}  [{}]",
                    days_until(today, task.due_date),
                    task.due_date,
                    title,
                    task.page_id
                );
            }
            Ok(())
        }
        Command::Sweep => run_once(&scheduler, Job::Sweep).await,
        Command::Remind => run_once(&scheduler, Job::Remind).await,
        Command::Digest => run_once(&scheduler, Job::Digest).await,
        Command::Next => {
            let now = Utc::now().with_timezone(&timezone);
            for (job, trigger) in scheduler.jobs() {
                println!("{:<7} {:<22} {}", job, trigger.to_string(), trigger.next_after(&now));
            }
            Ok(())
        }
    }
}

async fn run(scheduler: ReminderScheduler<NotionClient, MailgunClient>) -> Result<()> {
    let mut handle = tokio::spawn(async move { scheduler.run().await });

    tracing::info!("Deadline reminders running. Press Ctrl+C to stop.");

    tokio::select! {
        result = &mut handle => {
            result.context("Scheduler task panicked")??;
        }
        signal = signal::ctrl_c() => {
            signal?;
            tracing::info!("Shutdown signal received, stopping...");
            handle.abort();
        }
    }

    tracing::info!("Deadline reminders stopped");
    Ok(())
}

async fn run_once(
    scheduler: &ReminderScheduler<NotionClient, MailgunClient>,
    job: Job,
) -> Result<()> {
    scheduler
        .run_job(Job::Reset)
        .await
        .context("Failed to fetch tasks")?;

    let outcome = scheduler
        .run_job(job)
        .await
        .with_context(|| format!("{} job failed", job))?;
    println!("{}: {}", job, outcome);

    Ok(())
}
