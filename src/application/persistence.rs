use std::collections::HashSet;

use tracing::{debug, error, warn};

use crate::domain::{repository::KeyValueStore, task::Task};
use crate::error::Result;

/// Slot name for the serialized collection. Bump the suffix on format changes.
pub const STORAGE_KEY: &str = "task-tracker-v1";

/// Mirrors the task collection into a single slot of a [`KeyValueStore`].
/// Whole-collection overwrite, never a partial patch.
#[derive(Clone)]
pub struct TaskPersistence<S: KeyValueStore> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> TaskPersistence<S> {
    pub fn new(store: S) -> Self { Self::with_key(store, STORAGE_KEY) }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self { store, key: key.into() }
    }

    pub fn key(&self) -> &str { &self.key }

    pub async fn init(&self) -> Result<()> {
        self.store.init().await?;
        Ok(())
    }

    /// Reads the slot. Missing, unreadable or malformed data all come back as
    /// an empty collection; the cause is logged.
    pub async fn load(&self) -> Vec<Task> {
        let raw = match self.store.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "no stored tasks");
                return Vec::new();
            }
            Err(e) => {
                error!(key = %self.key, error = %e, "failed to read stored tasks");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<Task>>(&raw) {
            Ok(tasks) => sanitize(tasks),
            Err(e) => {
                error!(key = %self.key, error = %e, "stored tasks are malformed, starting empty");
                Vec::new()
            }
        }
    }

    pub async fn save(&self, tasks: &[Task]) -> Result<()> {
        let raw = serde_json::to_string(tasks)?;
        self.store.set(&self.key, &raw).await?;
        debug!(key = %self.key, count = tasks.len(), "saved tasks");
        Ok(())
    }
}

/// Drops stored records that break the collection invariants: blank titles
/// and repeated ids (first occurrence wins).
fn sanitize(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::with_capacity(tasks.len());
    let (mut blank, mut duplicate) = (0usize, 0usize);
    let tasks: Vec<Task> = tasks
        .into_iter()
        .filter(|t| {
            if t.title.trim().is_empty() {
                blank += 1;
                false
            } else if !seen.insert(t.id.clone()) {
                duplicate += 1;
                false
            } else {
                true
            }
        })
        .collect();
    if blank > 0 {
        warn!(dropped = blank, "dropped stored tasks with blank titles");
    }
    if duplicate > 0 {
        warn!(dropped = duplicate, "dropped stored tasks with duplicate ids");
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{TaskId, TaskStatus};
    use chrono::{NaiveDate, Utc};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MapStore {
        items: Arc<Mutex<HashMap<String, String>>>,
    }

    #[async_trait::async_trait]
    impl KeyValueStore for MapStore {
        async fn init(&self) -> anyhow::Result<()> { Ok(()) }
        async fn get(&self, key: &str) -> anyhow::Result<Option<String>> { Ok(self.items.lock().unwrap().get(key).cloned()) }
        async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
            self.items.lock().unwrap().insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    struct BrokenStore;

    #[async_trait::async_trait]
    impl KeyValueStore for BrokenStore {
        async fn init(&self) -> anyhow::Result<()> { Ok(()) }
        async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> { anyhow::bail!("disk gone") }
        async fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> { anyhow::bail!("disk full") }
    }

    fn task(id: &str, day: u32) -> Task {
        Task {
            id: TaskId::from(id),
            title: format!("task {id}"),
            description: String::new(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            time: None,
            category: "Travail".into(),
            status: TaskStatus::Todo,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_then_load_preserves_order_and_fields() {
        let persistence = TaskPersistence::new(MapStore::default());
        let mut tasks = vec![task("b", 2), task("a", 1)];
        tasks[1].status = TaskStatus::Done;
        tasks[0].time = Some("18:00".into());
        persistence.save(&tasks).await.unwrap();
        assert_eq!(persistence.load().await, tasks);
    }

    #[tokio::test]
    async fn missing_slot_loads_empty() {
        let persistence = TaskPersistence::new(MapStore::default());
        assert!(persistence.load().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_slot_loads_empty() {
        let store = MapStore::default();
        store.set(STORAGE_KEY, "{not json").await.unwrap();
        let persistence = TaskPersistence::new(store);
        assert!(persistence.load().await.is_empty());
    }

    #[tokio::test]
    async fn read_failure_loads_empty_and_write_failure_is_reported() {
        let persistence = TaskPersistence::new(BrokenStore);
        assert!(persistence.load().await.is_empty());
        assert!(persistence.save(&[task("a", 1)]).await.is_err());
    }

    #[tokio::test]
    async fn duplicate_ids_keep_first() {
        let store = MapStore::default();
        let mut second = task("a", 2);
        second.title = "shadow".into();
        store.set(STORAGE_KEY, &serde_json::to_string(&vec![task("a", 1), second]).unwrap()).await.unwrap();
        let loaded = TaskPersistence::new(store).load().await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].title, "task a");
    }

    #[tokio::test]
    async fn blank_titles_are_dropped() {
        let store = MapStore::default();
        let mut blank = task("x", 1);
        blank.title = "   ".into();
        let mut shadowed = task("b", 1);
        shadowed.title = String::new();
        let stored = vec![blank, task("a", 1), shadowed, task("b", 2)];
        store.set(STORAGE_KEY, &serde_json::to_string(&stored).unwrap()).await.unwrap();
        let loaded = TaskPersistence::new(store).load().await;
        let ids: Vec<_> = loaded.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert!(loaded.iter().all(|t| !t.title.trim().is_empty()));
    }

    #[tokio::test]
    async fn custom_key_is_isolated() {
        let store = MapStore::default();
        let v1 = TaskPersistence::new(store.clone());
        let v2 = TaskPersistence::with_key(store, "task-tracker-v2");
        v1.save(&[task("a", 1)]).await.unwrap();
        assert!(v2.load().await.is_empty());
        assert_eq!(v2.key(), "task-tracker-v2");
    }
}
