use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    fn can_become(&self, next: TaskStatus) -> bool {
        !self.is_terminal() && next >= *self
    }
}

/// One download tracked by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub quality: String,
    pub status: TaskStatus,
    pub progress: u8,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// How long finished tasks are kept around.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetentionPolicy {
    pub ttl: Option<Duration>,
    pub max_tasks: Option<usize>,
}

/// In-memory task store. A single lock guards the whole map.
pub struct TaskRegistry {
    tasks: RwLock<HashMap<String, Task>>,
    retention: RetentionPolicy,
    last_id: AtomicU64,
}

impl TaskRegistry {
    pub fn new(retention: RetentionPolicy) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            retention,
            last_id: AtomicU64::new(0),
        }
    }

    pub fn create(&self, url: &str, kind: &str, quality: &str) -> Task {
        let now = Utc::now();
        let mut tasks = self.tasks.write();
        self.evict(&mut tasks, now);

        let task = Task {
            id: self.next_id(now),
            url: url.to_string(),
            kind: kind.to_string(),
            quality: quality.to_string(),
            status: TaskStatus::Pending,
            progress: 0,
            message: "Task created".to_string(),
            created_at: now,
            completed_at: None,
        };
        tasks.insert(task.id.clone(), task.clone());
        task
    }

    /// Applies a status change. Unknown ids are ignored, as are backwards moves.
    pub fn update(&self, id: &str, status: TaskStatus, progress: u8, message: impl Into<String>) {
        let mut tasks = self.tasks.write();
        let Some(task) = tasks.get_mut(id) else {
            debug!(task_id = id, "update for unknown task ignored");
            return;
        };
        if !task.status.can_become(status) {
            debug!(task_id = id, from = ?task.status, to = ?status, "stale task update ignored");
            return;
        }

        task.status = status;
        task.progress = progress.min(100).max(task.progress);
        task.message = message.into();
        if status.is_terminal() {
            task.completed_at = Some(Utc::now());
        }
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.tasks.read().get(id).cloned()
    }

    /// Snapshot of every retained task, oldest first.
    pub fn list(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.read().values().cloned().collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn next_id(&self, now: DateTime<Utc>) -> String {
        let nanos = now.timestamp_nanos_opt().unwrap_or_default().max(0) as u64;
        let mut last = self.last_id.load(Ordering::Relaxed);
        loop {
            let candidate = nanos.max(last + 1);
            match self
                .last_id
                .compare_exchange_weak(last, candidate, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => return format!("task_{candidate}"),
                Err(actual) => last = actual,
            }
        }
    }

    fn evict(&self, tasks: &mut HashMap<String, Task>, now: DateTime<Utc>) {
        if let Some(ttl) = self.retention.ttl.and_then(|ttl| chrono::Duration::from_std(ttl).ok()) {
            let before = tasks.len();
            tasks.retain(|_, task| match task.completed_at {
                Some(done) => now - done < ttl,
                None => true,
            });
            let evicted = before - tasks.len();
            if evicted > 0 {
                debug!(evicted, "expired finished tasks");
            }
        }

        let Some(max) = self.retention.max_tasks else {
            return;
        };
        // Room for the task about to be inserted.
        while tasks.len() >= max.max(1) {
            let oldest = tasks
                .values()
                .filter_map(|task| task.completed_at.map(|done| (done, task.id.clone())))
                .min();
            match oldest {
                Some((_, id)) => {
                    tasks.remove(&id);
                }
                None => break,
            }
        }
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new(RetentionPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_create_defaults() {
        let registry = TaskRegistry::default();
        let task = registry.create("https://music.apple.com/us/album/x/1", "album", "alac");

        assert!(task.id.starts_with("task_"));
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.progress, 0);
        assert_eq!(task.message, "Task created");
        assert!(task.completed_at.is_none());
        assert_eq!(registry.get(&task.id).unwrap().url, task.url);
    }

    #[test]
    fn test_update_stamps_completion_only_when_terminal() {
        let registry = TaskRegistry::default();
        let task = registry.create("u", "song", "alac");

        registry.update(&task.id, TaskStatus::Processing, 10, "Starting download...");
        assert!(registry.get(&task.id).unwrap().completed_at.is_none());

        registry.update(&task.id, TaskStatus::Failed, 0, "Download failed: boom");
        let task = registry.get(&task.id).unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.message, "Download failed: boom");
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn test_status_and_progress_only_move_forward() {
        let registry = TaskRegistry::default();
        let task = registry.create("u", "album", "alac");

        registry.update(&task.id, TaskStatus::Processing, 50, "half");
        registry.update(&task.id, TaskStatus::Processing, 20, "lower");
        let current = registry.get(&task.id).unwrap();
        assert_eq!(current.progress, 50);
        assert_eq!(current.message, "lower");

        registry.update(&task.id, TaskStatus::Completed, 100, "done");
        registry.update(&task.id, TaskStatus::Processing, 100, "again");
        let current = registry.get(&task.id).unwrap();
        assert_eq!(current.status, TaskStatus::Completed);
        assert_eq!(current.message, "done");
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let registry = TaskRegistry::default();
        registry.update("task_missing", TaskStatus::Completed, 100, "done");
        assert!(registry.is_empty());
        assert!(registry.get("task_missing").is_none());
    }

    #[test]
    fn test_list_is_a_snapshot() {
        let registry = TaskRegistry::default();
        let first = registry.create("a", "album", "alac");
        registry.create("b", "song", "alac");

        let snapshot = registry.list();
        registry.update(&first.id, TaskStatus::Processing, 30, "working");
        registry.create("c", "playlist", "alac");

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].status, TaskStatus::Pending);
        assert_eq!(registry.list().len(), 3);
    }

    #[test]
    fn test_ids_unique_under_concurrent_create() {
        let registry = Arc::new(TaskRegistry::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    (0..64)
                        .map(|_| registry.create("u", "album", "alac").id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(ids.insert(id), "duplicate task id");
            }
        }
        assert_eq!(ids.len(), 512);
        assert_eq!(registry.len(), 512);
    }

    #[test]
    fn test_cap_evicts_oldest_finished_first() {
        let registry = TaskRegistry::new(RetentionPolicy {
            ttl: None,
            max_tasks: Some(3),
        });
        let a = registry.create("a", "album", "alac");
        let b = registry.create("b", "album", "alac");
        let c = registry.create("c", "album", "alac");
        registry.update(&b.id, TaskStatus::Completed, 100, "done");
        std::thread::sleep(Duration::from_millis(2));
        registry.update(&a.id, TaskStatus::Failed, 0, "failed");

        let d = registry.create("d", "album", "alac");
        assert!(registry.get(&b.id).is_none());
        assert!(registry.get(&a.id).is_some());
        assert!(registry.get(&c.id).is_some());
        assert!(registry.get(&d.id).is_some());
    }

    #[test]
    fn test_cap_never_evicts_running_tasks() {
        let registry = TaskRegistry::new(RetentionPolicy {
            ttl: None,
            max_tasks: Some(1),
        });
        let a = registry.create("a", "album", "alac");
        let b = registry.create("b", "album", "alac");
        assert!(registry.get(&a.id).is_some());
        assert!(registry.get(&b.id).is_some());
    }

    #[test]
    fn test_ttl_expires_finished_tasks() {
        let registry = TaskRegistry::new(RetentionPolicy {
            ttl: Some(Duration::from_millis(1)),
            max_tasks: None,
        });
        let done = registry.create("a", "album", "alac");
        let running = registry.create("b", "album", "alac");
        registry.update(&done.id, TaskStatus::Completed, 100, "ok");
        std::thread::sleep(Duration::from_millis(5));

        registry.create("c", "album", "alac");
        assert!(registry.get(&done.id).is_none());
        assert!(registry.get(&running.id).is_some());
    }

    #[test]
    fn test_task_json_shape() {
        let registry = TaskRegistry::default();
        let task = registry.create("u", "album", "aac");
        let json = serde_json::to_value(&task).unwrap();

        assert_eq!(json["type"], "album");
        assert_eq!(json["status"], "pending");
        assert!(json.get("completed_at").is_none());
        assert!(json.get("created_at").is_some());
    }
}
