//! In-memory stand-ins for the task database and the mail service.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use deadline_reminder::mail_client::{Mailer, OutgoingEmail};
use deadline_reminder::notion_client::{PageRecord, TaskPage, TaskSource};
use deadline_reminder::error::RemoteFailure;
use deadline_reminder::{ReminderError, ReminderResult};
use reqwest::StatusCode;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Mutex;

pub fn record(id: &str, title: &str, due: NaiveDate) -> PageRecord {
    serde_json::from_value(json!({
        "id": id,
        "properties": {
            "Name": { "title": [{ "plain_text": title }] },
            "Due": { "date": { "start": due.format("%Y-%m-%d").to_string() } }
        }
    }))
    .unwrap()
}

pub fn untitled_record(id: &str) -> PageRecord {
    serde_json::from_value(json!({
        "id": id,
        "properties": {
            "Name": { "title": [] },
            "Due": { "date": { "start": "2024-05-01" } }
        }
    }))
    .unwrap()
}

/// Task database backed by fixed pages, addressed by cursors `cursor-{n}`
#[derive(Default)]
pub struct FakeSource {
    pub pages: Vec<Vec<PageRecord>>,
    pub complete: HashSet<String>,
    pub failing_page: Option<usize>,
    pub failing_lookups: HashSet<String>,
    pub failing_archives: HashSet<String>,
    pub cursors: Mutex<Vec<Option<String>>>,
    pub lookups: Mutex<Vec<String>>,
    pub archived: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn with_pages(pages: Vec<Vec<PageRecord>>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    pub fn mark_complete(mut self, ids: &[&str]) -> Self {
        self.complete.extend(ids.iter().map(|id| id.to_string()));
        self
    }

    pub fn archived(&self) -> Vec<String> {
        self.archived.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn cursors(&self) -> Vec<Option<String>> {
        self.cursors.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskSource for FakeSource {
    async fn query_tasks(&self, cursor: Option<&str>) -> ReminderResult<TaskPage> {
        self.cursors.lock().unwrap().push(cursor.map(str::to_string));

        let index = cursor
            .and_then(|c| c.strip_prefix("cursor-"))
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(0);

        if self.failing_page == Some(index) {
            return Err(ReminderError::status(
                "query database",
                StatusCode::BAD_GATEWAY,
                "bad gateway",
            ));
        }

        let records = self.pages.get(index).cloned().unwrap_or_default();
        let next_cursor = if index + 1 < self.pages.len() {
            Some(format!("cursor-{}", index + 1))
        } else {
            None
        };

        Ok(TaskPage {
            records,
            next_cursor,
        })
    }

    async fn retrieve(&self, page_id: &str) -> ReminderResult<PageRecord> {
        self.lookups.lock().unwrap().push(page_id.to_string());

        if self.failing_lookups.contains(page_id) {
            return Err(ReminderError::status(
                format!("retrieve page {}", page_id),
                StatusCode::GATEWAY_TIMEOUT,
                "upstream timed out",
            ));
        }

        Ok(serde_json::from_value(json!({
            "id": page_id,
            "properties": {
                "Complete": { "checkbox": self.complete.contains(page_id) }
            }
        }))
        .unwrap())
    }

    async fn archive(&self, page_id: &str) -> ReminderResult<()> {
        self.archived.lock().unwrap().push(page_id.to_string());

        if self.failing_archives.contains(page_id) {
            return Err(ReminderError::update(
                format!("archive page {}", page_id),
                RemoteFailure::Status {
                    status: StatusCode::CONFLICT,
                    body: "conflict".to_string(),
                },
            ));
        }
        Ok(())
    }
}

/// Mailer that records every message and fails subjects containing a marker
#[derive(Default)]
pub struct RecordingMailer {
    pub fail_when_subject_contains: Option<String>,
    pub sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_when_subject_contains: Some(marker.to_string()),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> ReminderResult<()> {
        if let Some(marker) = &self.fail_when_subject_contains {
            if email.subject.contains(marker.as_str()) {
                return Err(ReminderError::update(
                    "send mail",
                    RemoteFailure::Status {
                        status: StatusCode::BAD_REQUEST,
                        body: "rejected".to_string(),
                    },
                ));
            }
        }

        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}
