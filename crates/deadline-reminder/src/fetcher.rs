use chrono::NaiveDate;
use shared_types::Task;

use crate::error::{ReminderError, ReminderResult};
use crate::notion_client::{PageRecord, TaskSource};
use crate::store::TaskStore;

/// Fetch every record in the database, following pagination cursors until
/// the provider reports no further pages.
///
/// Any page error aborts the fetch, as does a record without a usable title
/// or due date. Records keep the order the provider returned them in.
pub async fn fetch_all_tasks<S: TaskSource + ?Sized>(source: &S) -> ReminderResult<Vec<Task>> {
    let mut records = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0;

    loop {
        let page = source.query_tasks(cursor.as_deref()).await?;
        pages += 1;
        records.extend(page.records);

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    tracing::info!(
        "{} items were fetched from the task database ({} pages)",
        records.len(),
        pages
    );

    records.iter().map(normalize_record).collect()
}

/// Reduce a raw record to `{id, due date, title}`
pub fn normalize_record(record: &PageRecord) -> ReminderResult<Task> {
    let title = record
        .title()
        .ok_or_else(|| ReminderError::malformed(&record.id, "Name.title"))?;

    let due_date = record
        .due_start()
        .and_then(parse_due_date)
        .ok_or_else(|| ReminderError::malformed(&record.id, "Due.date.start"))?;

    Ok(Task {
        page_id: record.id.clone(),
        due_date,
        title: title.to_string(),
    })
}

/// Due dates arrive either as a calendar day or as a full timestamp; only the
/// calendar day matters here.
fn parse_due_date(start: &str) -> Option<NaiveDate> {
    let day = start.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Fetch the remote task set and rebuild the store from it.
///
/// The store is only touched once the fetch has succeeded, so a failed
/// refresh leaves the previous snapshot in place.
pub async fn refresh_store<S: TaskSource + ?Sized>(
    source: &S,
    store: &mut TaskStore,
) -> ReminderResult<usize> {
    let tasks = fetch_all_tasks(source).await?;
    let collisions = store.populate(tasks);

    if collisions > 0 {
        tracing::warn!("{} tasks shared a title with another task", collisions);
    }

    Ok(store.len())
}
