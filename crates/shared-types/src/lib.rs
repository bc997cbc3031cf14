use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A task tracked by the reminder service.
///
/// The title is the store key; `page_id` is the opaque identifier the remote
/// task database uses for the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub page_id: String,
    pub due_date: NaiveDate,
    pub title: String,
}

/// The value half of a store entry (title is the key)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedTask {
    pub due_date: NaiveDate,
    pub page_id: String,
}

/// A task whose days-until-due falls within a threshold.
///
/// Derived per notification cycle and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueItem {
    pub title: String,
    pub due_date: NaiveDate,
    pub page_id: String,
    /// Signed calendar-day delta; negative when overdue
    pub days_until: i64,
}

impl DueItem {
    /// "1 day" / "N days", using the magnitude of the delta
    pub fn day_count(&self) -> String {
        match self.days_until.abs() {
            1 => "1 day".to_string(),
            n => format!("{} days", n),
        }
    }

    /// Human-readable due phrase used in reminder emails
    pub fn due_phrase(&self) -> String {
        match self.days_until {
            0 => "due today".to_string(),
            n if n < 0 => format!("overdue by {}", self.day_count()),
            _ => format!("due in {}", self.day_count()),
        }
    }
}

// ============================================================================
// Reminder tiers
// ============================================================================

/// Reminder email categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReminderTier {
    /// Due tomorrow
    Urgent,
    /// Due within three days
    Soon,
    /// Weekly digest of everything due within seven days
    Weekly,
}

impl ReminderTier {
    pub fn as_str(&self) -> &str {
        match self {
            ReminderTier::Urgent => "urgent",
            ReminderTier::Soon => "soon",
            ReminderTier::Weekly => "weekly",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "urgent" => Some(ReminderTier::Urgent),
            "soon" => Some(ReminderTier::Soon),
            "weekly" => Some(ReminderTier::Weekly),
            _ => None,
        }
    }

    /// Largest days-until-due value that still qualifies for this tier
    pub fn threshold_days(&self) -> i64 {
        match self {
            ReminderTier::Urgent => 1,
            ReminderTier::Soon => 3,
            ReminderTier::Weekly => 7,
        }
    }
}
