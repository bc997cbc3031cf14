use chrono::{NaiveDate, TimeZone, Utc};
use shared_types::DueItem;
use std::collections::BTreeMap;

use crate::store::TaskStore;

/// Signed number of calendar days from `today` until `due`
pub fn days_until(today: NaiveDate, due: NaiveDate) -> i64 {
    (due - today).num_days()
}

/// Current calendar date in `tz`
pub fn today_in<Z: TimeZone>(tz: &Z) -> NaiveDate {
    Utc::now().with_timezone(tz).date_naive()
}

/// Select tracked tasks due within `threshold_days` of `today`.
///
/// Overdue tasks have a negative delta and are always selected when the
/// threshold is non-negative.
pub fn select_due(
    store: &TaskStore,
    today: NaiveDate,
    threshold_days: i64,
) -> BTreeMap<String, DueItem> {
    store
        .iter()
        .filter_map(|(title, task)| {
            let days = days_until(today, task.due_date);
            if days > threshold_days {
                return None;
            }

            tracing::debug!("Found task due: {} ({} days)", title, days);
            Some((
                title.clone(),
                DueItem {
                    title: title.clone(),
                    due_date: task.due_date,
                    page_id: task.page_id.clone(),
                    days_until: days,
                },
            ))
        })
        .collect()
}
