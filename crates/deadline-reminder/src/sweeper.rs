use crate::notion_client::TaskSource;
use crate::store::TaskStore;

/// Outcome of a completion sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Tasks whose completion flag was looked up successfully
    pub checked: usize,
    /// Titles removed from the store because they were complete
    pub removed: Vec<String>,
    /// Lookups that failed; those tasks stay tracked
    pub lookup_failed: usize,
    /// Removed tasks whose archive request failed
    pub archive_failed: usize,
}

/// Check every tracked task's completion flag, archiving and dropping the
/// ones that are done.
///
/// One lookup per task. A failed lookup is logged and the task is kept for the
/// next sweep; the rest of the sweep carries on. A complete task is removed
/// locally even if its archive request fails, since the next reset re-fetches
/// it and the sweep after that retries the archive. Removals made before an
/// interruption are not rolled back.
pub async fn sweep<S: TaskSource + ?Sized>(source: &S, store: &mut TaskStore) -> SweepReport {
    let entries: Vec<(String, String)> = store
        .iter()
        .map(|(title, task)| (title.clone(), task.page_id.clone()))
        .collect();

    let mut report = SweepReport::default();

    for (title, page_id) in entries {
        let record = match source.retrieve(&page_id).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!("Failed to check completion of {:?}: {}", title, e);
                report.lookup_failed += 1;
                continue;
            }
        };
        report.checked += 1;

        if record.complete() != Some(true) {
            continue;
        }

        tracing::info!("Archiving completed task {:?}", title);
        if let Err(e) = source.archive(&page_id).await {
            tracing::error!("Failed to archive {:?}: {}", title, e);
            report.archive_failed += 1;
        }

        store.remove(&title);
        tracing::debug!("Removed {:?} from the active task list", title);
        report.removed.push(title);
    }

    tracing::info!(
        "Sweep checked {} tasks: {} removed, {} lookup failures, {} archive failures",
        report.checked,
        report.removed.len(),
        report.lookup_failed,
        report.archive_failed
    );

    report
}
