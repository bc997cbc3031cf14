use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use shared_types::ReminderTier;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time;

use crate::due::{select_due, today_in};
use crate::error::ReminderResult;
use crate::fetcher::refresh_store;
use crate::mail_client::Mailer;
use crate::notifier::{DispatchReport, Notifier};
use crate::notion_client::TaskSource;
use crate::schedule::{Job, Trigger};
use crate::store::{SharedStore, TaskStore};
use crate::sweeper::{sweep, SweepReport};

/// What a single job run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Swept(SweepReport),
    Reminded(DispatchReport),
    Reset { tracked: usize },
    Digest(Option<DispatchReport>),
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Swept(report) => write!(
                f,
                "{} checked, {} archived, {} lookup failures, {} archive failures",
                report.checked,
                report.removed.len(),
                report.lookup_failed,
                report.archive_failed
            ),
            JobOutcome::Reminded(report) => write!(f, "reminders: {}", report),
            JobOutcome::Reset { tracked } => write!(f, "{} tasks tracked", tracked),
            JobOutcome::Digest(Some(report)) => write!(f, "digest: {}", report),
            JobOutcome::Digest(None) => write!(f, "digest skipped, nothing due this week"),
        }
    }
}

/// Owns the task store and runs every job on its trigger
pub struct ReminderScheduler<S, M> {
    source: Arc<S>,
    notifier: Arc<Notifier<M>>,
    store: SharedStore,
    timezone: Tz,
    jobs: Vec<(Job, Trigger)>,
}

impl<S, M> Clone for ReminderScheduler<S, M> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            notifier: Arc::clone(&self.notifier),
            store: Arc::clone(&self.store),
            timezone: self.timezone,
            jobs: self.jobs.clone(),
        }
    }
}

impl<S, M> ReminderScheduler<S, M>
where
    S: TaskSource + 'static,
    M: Mailer + 'static,
{
    pub fn new(source: S, notifier: Notifier<M>, timezone: Tz, jobs: Vec<(Job, Trigger)>) -> Self {
        Self {
            source: Arc::new(source),
            notifier: Arc::new(notifier),
            store: TaskStore::new().into_shared(),
            timezone,
            jobs,
        }
    }

    pub fn store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }

    pub fn notifier(&self) -> &Notifier<M> {
        &self.notifier
    }

    pub fn jobs(&self) -> &[(Job, Trigger)] {
        &self.jobs
    }

    /// Today's date in the configured time zone
    pub fn today(&self) -> NaiveDate {
        today_in(&self.timezone)
    }

    /// Populate the store, then run every job on its trigger until one of the
    /// job tasks ends.
    ///
    /// Fails without starting any job when the initial fetch fails.
    pub async fn run(&self) -> Result<()> {
        tracing::info!(
            "Starting reminder scheduler ({} jobs, timezone {})",
            self.jobs.len(),
            self.timezone
        );

        let outcome = self
            .run_job(Job::Reset)
            .await
            .context("Initial fetch failed")?;
        tracing::info!("Initial fetch: {}", outcome);

        let handles: Vec<JoinHandle<()>> = self
            .jobs
            .iter()
            .map(|&(job, trigger)| {
                let scheduler = self.clone();
                tokio::spawn(async move { scheduler.run_job_loop(job, trigger).await })
            })
            .collect();

        if handles.is_empty() {
            return Ok(());
        }

        // Job loops never return on their own, so any completion is a panic
        let (result, index, remaining) = futures::future::select_all(handles).await;
        if let Err(e) = result {
            tracing::error!("{} job task error: {:?}", self.jobs[index].0, e);
        }
        for handle in remaining {
            handle.abort();
        }

        Ok(())
    }

    async fn run_job_loop(&self, job: Job, trigger: Trigger) {
        tracing::info!("{} job started ({})", job, trigger);

        let mut last_fire: Option<DateTime<Tz>> = None;

        loop {
            let now = Utc::now().with_timezone(&self.timezone);
            let next = trigger.next_after_fire(&now, last_fire.as_ref());
            let wait = (next - now).to_std().unwrap_or_default();

            tracing::debug!("Next {} run at {} (in {:?})", job, next, wait);
            time::sleep(wait).await;
            last_fire = Some(next);

            match self.run_job(job).await {
                Ok(outcome) => tracing::info!("{} job finished: {}", job, outcome),
                Err(e) => {
                    tracing::error!("{} job failed: {}", job, e);
                    // Continue on the next trigger
                }
            }
        }
    }

    /// Run one job now.
    ///
    /// Sweep and reset hold the store lock for their whole run. Reminder jobs
    /// only hold it while selecting due tasks, so slow mail delivery never
    /// blocks a sweep.
    pub async fn run_job(&self, job: Job) -> ReminderResult<JobOutcome> {
        tracing::debug!("Running {} job", job);

        match job {
            Job::Sweep => {
                let mut store = self.store.lock().await;
                let report = sweep(self.source.as_ref(), &mut store).await;
                Ok(JobOutcome::Swept(report))
            }
            Job::Reset => {
                let mut store = self.store.lock().await;
                let tracked = refresh_store(self.source.as_ref(), &mut store).await?;
                Ok(JobOutcome::Reset { tracked })
            }
            Job::Remind => {
                let due = {
                    let store = self.store.lock().await;
                    select_due(&store, self.today(), ReminderTier::Soon.threshold_days())
                };
                let report = self.notifier.send_tiered_reminders(&due).await;
                Ok(JobOutcome::Reminded(report))
            }
            Job::Digest => {
                let due = {
                    let store = self.store.lock().await;
                    select_due(&store, self.today(), ReminderTier::Weekly.threshold_days())
                };
                let report = self.notifier.send_weekly_digest(&due).await;
                Ok(JobOutcome::Digest(report))
            }
        }
    }
}
