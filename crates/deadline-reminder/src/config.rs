use anyhow::{Context, Result};
use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::schedule::{Job, Trigger};

const DEFAULT_NOTION_API_URL: &str = "https://api.notion.com";
const DEFAULT_MAILGUN_API_URL: &str = "https://api.mailgun.net";

/// Credentials and endpoint for the task database
#[derive(Debug, Clone)]
pub struct NotionConfig {
    pub api_key: String,
    pub database_id: String,
    pub api_url: String,
}

/// Credentials and addressing for outgoing mail
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_key: String,
    pub domain: String,
    pub api_url: String,
    pub recipient: String,
}

impl MailConfig {
    /// Sender address derived from the mail domain
    pub fn sender(&self) -> String {
        format!("Deadline Reminder <reminders@{}>", self.domain)
    }
}

/// When jobs run and how remote calls are bounded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// IANA time zone all triggers and "today" are evaluated in
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Minute past each hour the completion sweep runs
    #[serde(default)]
    pub sweep_minute: u32,

    /// Daily reminder dispatch time (HH:MM)
    #[serde(default = "default_remind_at")]
    pub remind_at: String,

    /// Daily store reset time (HH:MM)
    #[serde(default = "default_reset_at")]
    pub reset_at: String,

    /// Weekday the digest goes out
    #[serde(default = "default_digest_weekday")]
    pub digest_weekday: String,

    /// Weekly digest time (HH:MM)
    #[serde(default = "default_digest_at")]
    pub digest_at: String,

    /// Timeout applied to every HTTP request (seconds)
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Maximum mail sends in flight at once
    #[serde(default = "default_mail_concurrency")]
    pub mail_concurrency: usize,
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_remind_at() -> String {
    "09:00".to_string()
}

fn default_reset_at() -> String {
    "00:00".to_string()
}

fn default_digest_weekday() -> String {
    "Mon".to_string()
}

fn default_digest_at() -> String {
    "08:00".to_string()
}

fn default_http_timeout() -> u64 {
    30
}

fn default_mail_concurrency() -> usize {
    4
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            sweep_minute: 0,
            remind_at: default_remind_at(),
            reset_at: default_reset_at(),
            digest_weekday: default_digest_weekday(),
            digest_at: default_digest_at(),
            http_timeout_secs: default_http_timeout(),
            mail_concurrency: default_mail_concurrency(),
        }
    }
}

impl ScheduleConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: ScheduleConfig = toml::from_str(content).context("Invalid schedule config")?;
        Ok(config)
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid timezone: {}", self.timezone))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Build the trigger for every job
    pub fn triggers(&self) -> Result<Vec<(Job, Trigger)>> {
        let digest_weekday: Weekday = self
            .digest_weekday
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid digest_weekday: {}", self.digest_weekday))?;

        Ok(vec![
            (
                Job::Sweep,
                Trigger::hourly(self.sweep_minute).context("Invalid sweep_minute")?,
            ),
            (
                Job::Remind,
                Trigger::Daily {
                    at: parse_time("remind_at", &self.remind_at)?,
                },
            ),
            (
                Job::Reset,
                Trigger::Daily {
                    at: parse_time("reset_at", &self.reset_at)?,
                },
            ),
            (
                Job::Digest,
                Trigger::Weekly {
                    weekday: digest_weekday,
                    at: parse_time("digest_at", &self.digest_at)?,
                },
            ),
        ])
    }
}

fn parse_time(field: &str, value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .with_context(|| format!("{} must be HH:MM, got {:?}", field, value))
}

/// Complete service configuration
#[derive(Debug, Clone)]
pub struct ReminderConfig {
    pub notion: NotionConfig,
    pub mail: MailConfig,
    pub schedule: ScheduleConfig,
}

impl ReminderConfig {
    /// Credentials come from the environment; the schedule from an optional
    /// TOML file, with `REMINDER_TIMEZONE` taking precedence over its zone.
    pub fn load(schedule_path: Option<&Path>) -> Result<Self> {
        let schedule = match schedule_path {
            Some(path) => ScheduleConfig::load(path)?,
            None => ScheduleConfig::default(),
        };
        Self::from_lookup(schedule, env_var)
    }

    /// Assemble the configuration from `schedule` and a variable lookup
    pub fn from_lookup<F>(mut schedule: ScheduleConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(timezone) = lookup("REMINDER_TIMEZONE") {
            schedule.timezone = timezone;
        }

        // Surface bad values at startup rather than on the first trigger
        schedule.timezone()?;
        schedule.triggers()?;

        Ok(Self {
            notion: NotionConfig::from_lookup(&lookup)?,
            mail: MailConfig::from_lookup(&lookup)?,
            schedule,
        })
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).with_context(|| format!("{} must be set", key))
}

impl NotionConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            api_key: required(lookup, "NOTION_KEY")?,
            database_id: required(lookup, "NOTION_DB")?,
            api_url: lookup("NOTION_API_URL")
                .unwrap_or_else(|| DEFAULT_NOTION_API_URL.to_string()),
        })
    }
}

impl MailConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            api_key: required(lookup, "MAILGUN_API_KEY")?,
            domain: required(lookup, "MAILGUN_DOMAIN")?,
            api_url: lookup("MAILGUN_API_URL")
                .unwrap_or_else(|| DEFAULT_MAILGUN_API_URL.to_string()),
            recipient: required(lookup, "REMINDER_RECIPIENT")?,
        })
    }
}
