//! Per-request resolution task registry
//!
//! Resolution can outlive the client-facing response deadline, so every
//! request gets a task handle: the transport waits a bounded time for the
//! task, and when it is still running answers with a processing status and
//! the task id for a follow-up poll. Finished outcomes are consumed on
//! poll and pruned after a retention window either way.

use crate::models::SourcesOutcome;
use chrono::{DateTime, Duration, Utc};
use log::info;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use uuid::Uuid;

/// Completed outcomes are kept this long for late pollers
const RETENTION_MINUTES: i64 = 10;

enum TaskState {
    Running,
    Finished(SourcesOutcome),
}

struct TaskEntry {
    state: TaskState,
    updated_at: DateTime<Utc>,
}

/// What a poll sees
#[derive(Debug, PartialEq, Eq)]
pub enum TaskStatus {
    Running,
    Finished(SourcesOutcome),
    Unknown,
}

#[derive(Default)]
pub struct TaskRegistry {
    tasks: Mutex<HashMap<Uuid, TaskEntry>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a resolution future under a fresh task id. The returned
    /// receiver fires when the task finishes; the outcome also lands in the
    /// registry for pollers.
    pub fn spawn<F>(self: &Arc<Self>, fut: F) -> (Uuid, oneshot::Receiver<SourcesOutcome>)
    where
        F: Future<Output = SourcesOutcome> + Send + 'static,
    {
        let id = Uuid::new_v4();
        self.prune();
        self.tasks.lock().unwrap().insert(
            id,
            TaskEntry {
                state: TaskState::Running,
                updated_at: Utc::now(),
            },
        );

        let (tx, rx) = oneshot::channel();
        let registry = self.clone();
        tokio::spawn(async move {
            let outcome = fut.await;
            registry.finish(id, outcome.clone());
            // Waiter may have timed out and gone away
            let _ = tx.send(outcome);
        });

        (id, rx)
    }

    /// Poll a task; a finished outcome is consumed by the first poller
    pub fn poll(&self, id: Uuid) -> TaskStatus {
        let mut tasks = self.tasks.lock().unwrap();
        let finished = match tasks.get(&id) {
            Some(entry) => matches!(entry.state, TaskState::Finished(_)),
            None => return TaskStatus::Unknown,
        };
        if !finished {
            return TaskStatus::Running;
        }
        match tasks.remove(&id) {
            Some(TaskEntry {
                state: TaskState::Finished(outcome),
                ..
            }) => TaskStatus::Finished(outcome),
            _ => TaskStatus::Unknown,
        }
    }

    fn finish(&self, id: Uuid, outcome: SourcesOutcome) {
        info!("Task {} finished", id);
        let mut tasks = self.tasks.lock().unwrap();
        if let Some(entry) = tasks.get_mut(&id) {
            entry.state = TaskState::Finished(outcome);
            entry.updated_at = Utc::now();
        }
    }

    /// Drop finished entries past the retention window
    fn prune(&self) {
        let cutoff = Utc::now() - Duration::minutes(RETENTION_MINUTES);
        self.tasks.lock().unwrap().retain(|_, entry| {
            matches!(entry.state, TaskState::Running) || entry.updated_at > cutoff
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_and_wait() {
        let registry = Arc::new(TaskRegistry::new());
        let (id, rx) = registry.spawn(async {
            SourcesOutcome::Found {
                manifest_url: "https://cdn.example/m.m3u8".into(),
            }
        });

        let outcome = rx.await.unwrap();
        assert!(matches!(outcome, SourcesOutcome::Found { .. }));

        // The registry also holds the outcome for a late poller
        let status = registry.poll(id);
        assert_eq!(
            status,
            TaskStatus::Finished(SourcesOutcome::Found {
                manifest_url: "https://cdn.example/m.m3u8".into()
            })
        );
    }

    #[tokio::test]
    async fn test_finished_outcome_consumed_once() {
        let registry = Arc::new(TaskRegistry::new());
        let (id, rx) = registry.spawn(async { SourcesOutcome::no_valid_sources() });
        rx.await.unwrap();

        assert!(matches!(registry.poll(id), TaskStatus::Finished(_)));
        assert_eq!(registry.poll(id), TaskStatus::Unknown);
    }

    #[tokio::test]
    async fn test_running_task_polls_as_running() {
        let registry = Arc::new(TaskRegistry::new());
        let (id, _rx) = registry.spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            SourcesOutcome::processing_error()
        });

        assert_eq!(registry.poll(id), TaskStatus::Running);
    }

    #[test]
    fn test_unknown_task() {
        let registry = TaskRegistry::new();
        assert_eq!(registry.poll(Uuid::new_v4()), TaskStatus::Unknown);
    }
}
