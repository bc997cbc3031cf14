//! Wall-clock triggers for the scheduled jobs.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Timelike,
    Weekday,
};
use std::fmt;

use crate::error::{ReminderError, ReminderResult};

/// The four recurring jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    /// Check completion flags and archive finished tasks
    Sweep,
    /// Send urgent/soon reminders
    Remind,
    /// Rebuild the store from the task database
    Reset,
    /// Send the weekly digest
    Digest,
}

impl Job {
    pub fn as_str(&self) -> &str {
        match self {
            Job::Sweep => "sweep",
            Job::Remind => "remind",
            Job::Reset => "reset",
            Job::Digest => "digest",
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A recurring local wall-clock time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Fires `minute` past every hour. Build it with [`Trigger::hourly`] to
    /// have the minute checked; a minute past 59 fires on the hour.
    Hourly { minute: u32 },
    Daily { at: NaiveTime },
    Weekly { weekday: Weekday, at: NaiveTime },
}

impl Trigger {
    pub fn hourly(minute: u32) -> ReminderResult<Self> {
        if minute > 59 {
            return Err(ReminderError::Config(format!(
                "hourly minute must be between 0 and 59, got {}",
                minute
            )));
        }
        Ok(Trigger::Hourly { minute })
    }

    /// First fire time strictly after both `now` and `last_fire`.
    ///
    /// The job loop sleeps on a monotonic clock, so when the wall clock steps
    /// back the job can run while `now` is still before the time it fired for.
    pub fn next_after_fire<Z: TimeZone>(
        &self,
        now: &DateTime<Z>,
        last_fire: Option<&DateTime<Z>>,
    ) -> DateTime<Z> {
        match last_fire {
            Some(last) if last > now => self.next_after(last),
            _ => self.next_after(now),
        }
    }

    /// First fire time strictly after `now`, in `now`'s time zone.
    ///
    /// Local times skipped by a DST jump fire an hour later; repeated local
    /// times fire on their first occurrence.
    pub fn next_after<Z: TimeZone>(&self, now: &DateTime<Z>) -> DateTime<Z> {
        let tz = now.timezone();
        let mut candidate = self.first_candidate(now.naive_local());

        loop {
            if let Some(at) = resolve_local(&tz, candidate) {
                if at > *now {
                    return at;
                }
            }
            candidate += self.period();
        }
    }

    /// Occurrence in the period containing `local`, which may already be past
    fn first_candidate(&self, local: NaiveDateTime) -> NaiveDateTime {
        match *self {
            Trigger::Hourly { minute } => {
                let at = NaiveTime::from_hms_opt(local.hour(), minute, 0).unwrap_or(NaiveTime::MIN);
                local.date().and_time(at)
            }
            Trigger::Daily { at } => local.date().and_time(at),
            Trigger::Weekly { weekday, at } => {
                let ahead = (weekday.num_days_from_monday() as i64
                    - local.weekday().num_days_from_monday() as i64)
                    .rem_euclid(7);
                (local.date() + Duration::days(ahead)).and_time(at)
            }
        }
    }

    fn period(&self) -> Duration {
        match self {
            Trigger::Hourly { .. } => Duration::hours(1),
            Trigger::Daily { .. } => Duration::days(1),
            Trigger::Weekly { .. } => Duration::days(7),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Hourly { minute } => write!(f, "hourly at :{:02}", minute),
            Trigger::Daily { at } => write!(f, "daily at {}", at.format("%H:%M")),
            Trigger::Weekly { weekday, at } => {
                write!(f, "every {} at {}", weekday, at.format("%H:%M"))
            }
        }
    }
}

fn resolve_local<Z: TimeZone>(tz: &Z, local: NaiveDateTime) -> Option<DateTime<Z>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(at) => Some(at),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => tz
            .from_local_datetime(&(local + Duration::hours(1)))
            .earliest(),
    }
}
