//! In-memory index of the tasks currently tracked for reminders.
//!
//! The store is keyed by task title. It is owned by the scheduler and handed
//! to each job as a [`SharedStore`]; jobs that mutate it hold the lock for
//! their whole run, so a sweep can never interleave with a reset.

use shared_types::{Task, TrackedTask};
use std::collections::btree_map::{self, BTreeMap};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Store handle shared between scheduled jobs
pub type SharedStore = Arc<Mutex<TaskStore>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStore {
    tasks: BTreeMap<String, TrackedTask>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the store for sharing between jobs
    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    /// Replace the contents with `tasks`.
    ///
    /// Titles are the key, so when two records share a title the later one
    /// wins. Returns how many records were overwritten that way.
    pub fn populate(&mut self, tasks: Vec<Task>) -> usize {
        self.tasks.clear();
        let mut collisions = 0;

        for task in tasks {
            let tracked = TrackedTask {
                due_date: task.due_date,
                page_id: task.page_id,
            };

            if let Some(previous) = self.tasks.insert(task.title.clone(), tracked) {
                tracing::warn!(
                    "Duplicate task title {:?}: page {} replaced by a later record",
                    task.title,
                    previous.page_id
                );
                collisions += 1;
            }
        }

        collisions
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn remove(&mut self, title: &str) -> Option<TrackedTask> {
        self.tasks.remove(title)
    }

    pub fn get(&self, title: &str) -> Option<&TrackedTask> {
        self.tasks.get(title)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Entries in title order
    pub fn iter(&self) -> btree_map::Iter<'_, String, TrackedTask> {
        self.tasks.iter()
    }
}

impl<'a> IntoIterator for &'a TaskStore {
    type Item = (&'a String, &'a TrackedTask);
    type IntoIter = btree_map::Iter<'a, String, TrackedTask>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
