//! Reminder mail composition and dispatch.
//!
//! Messages are pushed through a bounded queue: at most `concurrency` sends
//! are in flight, every send is awaited, and failures are collected into a
//! [`DispatchReport`] instead of being dropped. Nothing is retried.

use futures::stream::{self, StreamExt};
use shared_types::{DueItem, ReminderTier};
use std::collections::BTreeMap;
use std::fmt;

use crate::mail_client::{Mailer, OutgoingEmail};

/// A send that did not go through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedSend {
    pub tier: ReminderTier,
    pub subject: String,
    pub error: String,
}

/// Aggregate result of one dispatch batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: Vec<FailedSend>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.sent + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for DispatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} sent, {} failed", self.sent, self.failed.len())?;
        for failure in &self.failed {
            write!(f, "\n  {}: {}", failure.subject, failure.error)?;
        }
        Ok(())
    }
}

pub struct Notifier<M> {
    mailer: M,
    from: String,
    to: String,
    concurrency: usize,
}

impl<M: Mailer> Notifier<M> {
    pub fn new(mailer: M, from: impl Into<String>, to: impl Into<String>, concurrency: usize) -> Self {
        Self {
            mailer,
            from: from.into(),
            to: to.into(),
            concurrency: concurrency.max(1),
        }
    }

    pub fn mailer(&self) -> &M {
        &self.mailer
    }

    fn email(&self, tier: ReminderTier, subject: String, text: String) -> OutgoingEmail {
        OutgoingEmail {
            tier,
            from: self.from.clone(),
            to: self.to.clone(),
            subject,
            text,
        }
    }

    /// Build the per-task reminders for `items`.
    ///
    /// Items due in one to three days get a "soon" mail; items due in exactly
    /// one day also get an "urgent" mail, so day-one tasks receive both.
    pub fn tiered_messages(&self, items: &BTreeMap<String, DueItem>) -> Vec<OutgoingEmail> {
        let mut messages = Vec::new();

        for item in items.values() {
            if (1..=ReminderTier::Soon.threshold_days()).contains(&item.days_until) {
                messages.push(self.email(
                    ReminderTier::Soon,
                    format!("Reminder: \"{}\" is {}", item.title, item.due_phrase()),
                    format!(
                        "\"{}\" is {} (on {}).",
                        item.title,
                        item.due_phrase(),
                        item.due_date.format("%A, %B %-d")
                    ),
                ));
            }

            if item.days_until == ReminderTier::Urgent.threshold_days() {
                messages.push(self.email(
                    ReminderTier::Urgent,
                    format!("URGENT: \"{}\" is due tomorrow", item.title),
                    format!(
                        "\"{}\" is due tomorrow ({}). Time to wrap it up!",
                        item.title, item.due_date
                    ),
                ));
            }
        }

        messages
    }

    /// Build the weekly digest, or `None` when nothing is due within a week
    pub fn digest_message(&self, items: &BTreeMap<String, DueItem>) -> Option<OutgoingEmail> {
        let lines: Vec<String> = items
            .values()
            .filter(|item| item.days_until <= ReminderTier::Weekly.threshold_days())
            .map(|item| format!("- {}: {} ({})", item.title, item.due_phrase(), item.due_date))
            .collect();

        if lines.is_empty() {
            return None;
        }

        let subject = match lines.len() {
            1 => "Weekly digest: 1 task due this week".to_string(),
            n => format!("Weekly digest: {} tasks due this week", n),
        };
        let text = format!("Here is what is due this week:\n\n{}\n", lines.join("\n"));

        Some(self.email(ReminderTier::Weekly, subject, text))
    }

    pub async fn send_tiered_reminders(&self, items: &BTreeMap<String, DueItem>) -> DispatchReport {
        let messages = self.tiered_messages(items);
        tracing::info!(
            "Sending {} tiered reminders for {} due tasks",
            messages.len(),
            items.len()
        );
        self.dispatch(messages).await
    }

    pub async fn send_weekly_digest(
        &self,
        items: &BTreeMap<String, DueItem>,
    ) -> Option<DispatchReport> {
        let Some(message) = self.digest_message(items) else {
            tracing::info!("No tasks due this week, skipping digest");
            return None;
        };

        Some(self.dispatch(vec![message]).await)
    }

    async fn dispatch(&self, messages: Vec<OutgoingEmail>) -> DispatchReport {
        let mailer = &self.mailer;

        let results: Vec<(OutgoingEmail, Result<(), String>)> = stream::iter(messages)
            .map(|message| async move {
                let result = mailer.send(&message).await.map_err(|e| e.to_string());
                (message, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = DispatchReport::default();
        for (message, result) in results {
            match result {
                Ok(()) => {
                    tracing::info!("Sent {} reminder: {}", message.tier.as_str(), message.subject);
                    report.sent += 1;
                }
                Err(error) => {
                    tracing::error!("Failed to send {:?}: {}", message.subject, error);
                    report.failed.push(FailedSend {
                        tier: message.tier,
                        subject: message.subject,
                        error,
                    });
                }
            }
        }

        report
    }
}
