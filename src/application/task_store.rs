use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::application::persistence::TaskPersistence;
use crate::domain::repository::KeyValueStore;
use crate::domain::task::{
    self, NewTask, Task, TaskId, TaskPatch, TaskStatus, normalize_category, normalize_time, normalize_title,
};
use crate::error::{Result, TrackerError};

/// What a mutation by id did. `NotFound` is not an error: stale ids are tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Applied,
    NotFound,
}

impl Mutation {
    pub fn applied(self) -> bool { self == Mutation::Applied }
}

/// Owns the in-memory task collection, newest first. Every applied mutation
/// is written through to the persistence slot and published to subscribers.
pub struct TaskStore<S: KeyValueStore> {
    persistence: TaskPersistence<S>,
    tasks: Vec<Task>,
    synced: bool,
    notify: watch::Sender<Vec<Task>>,
}

impl<S: KeyValueStore> TaskStore<S> {
    /// Never fails: an unusable medium leaves the store empty and unsynced.
    pub async fn open(persistence: TaskPersistence<S>) -> Self {
        let synced = match persistence.init().await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "failed to initialize task storage; changes stay in memory");
                false
            }
        };
        let tasks = persistence.load().await;
        debug!(count = tasks.len(), synced, "task store opened");
        let (notify, _) = watch::channel(tasks.clone());
        Self { persistence, tasks, synced, notify }
    }

    pub fn tasks(&self) -> &[Task] { &self.tasks }

    pub fn get(&self, id: &TaskId) -> Option<&Task> { self.tasks.iter().find(|t| &t.id == id) }

    /// False while the last write to the durable slot has failed.
    pub fn is_synced(&self) -> bool { self.synced }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Task>> { self.notify.subscribe() }

    pub async fn create(&mut self, input: NewTask) -> Result<Task> {
        let title = normalize_title(&input.title).ok_or(TrackerError::EmptyTitle)?;
        let task = Task {
            id: self.fresh_id(),
            title,
            description: input.description.trim().to_string(),
            date: input.date.unwrap_or_else(task::today),
            time: normalize_time(input.time.as_deref()),
            category: normalize_category(input.category.as_deref()),
            status: TaskStatus::Todo,
            created_at: Utc::now(),
        };
        debug!(id = %task.id, date = %task.date, "create task");
        self.tasks.insert(0, task.clone());
        self.commit().await;
        Ok(task)
    }

    pub async fn set_status(&mut self, id: &TaskId, status: TaskStatus) -> Mutation {
        self.modify(id, |t| t.status = status).await
    }

    /// `done` goes back to `todo`; `todo` and `doing` both go to `done`.
    pub async fn toggle_done(&mut self, id: &TaskId) -> Mutation {
        let Some(current) = self.get(id).map(|t| t.status) else { return self.missing(id, "toggle_done") };
        let next = if current == TaskStatus::Done { TaskStatus::Todo } else { TaskStatus::Done };
        self.set_status(id, next).await
    }

    /// `doing` goes back to `todo`; `todo` and `done` both go to `doing`.
    pub async fn toggle_doing(&mut self, id: &TaskId) -> Mutation {
        let Some(current) = self.get(id).map(|t| t.status) else { return self.missing(id, "toggle_doing") };
        let next = if current == TaskStatus::Doing { TaskStatus::Todo } else { TaskStatus::Doing };
        self.set_status(id, next).await
    }

    pub async fn update(&mut self, id: &TaskId, patch: TaskPatch) -> Result<Mutation> {
        let title = match patch.title.as_deref() {
            Some(raw) => Some(normalize_title(raw).ok_or(TrackerError::EmptyTitle)?),
            None => None,
        };
        Ok(self
            .modify(id, move |t| {
                if let Some(title) = title { t.title = title; }
                if let Some(d) = patch.description { t.description = d.trim().to_string(); }
                if let Some(date) = patch.date { t.date = date; }
                if let Some(time) = patch.time { t.time = normalize_time(time.as_deref()); }
                if let Some(c) = patch.category { t.category = normalize_category(Some(&c)); }
                if let Some(s) = patch.status { t.status = s; }
            })
            .await)
    }

    pub async fn delete(&mut self, id: &TaskId) -> Mutation {
        let Some(pos) = self.tasks.iter().position(|t| &t.id == id) else { return self.missing(id, "delete") };
        self.tasks.remove(pos);
        debug!(%id, "delete task");
        self.commit().await;
        Mutation::Applied
    }

    async fn modify(&mut self, id: &TaskId, apply: impl FnOnce(&mut Task)) -> Mutation {
        let Some(task) = self.tasks.iter_mut().find(|t| &t.id == id) else { return self.missing(id, "update") };
        apply(task);
        debug!(%id, status = %task.status, "update task");
        self.commit().await;
        Mutation::Applied
    }

    fn missing(&self, id: &TaskId, op: &'static str) -> Mutation {
        warn!(%id, op, "no task with this id");
        Mutation::NotFound
    }

    /// Write-through after a mutation. A failed write leaves memory authoritative.
    async fn commit(&mut self) {
        match self.persistence.save(&self.tasks).await {
            Ok(()) => self.synced = true,
            Err(e) => {
                warn!(error = %e, "failed to persist tasks; keeping in-memory state");
                self.synced = false;
            }
        }
        self.notify.send_replace(self.tasks.clone());
    }

    fn fresh_id(&self) -> TaskId {
        loop {
            let id = TaskId::generate();
            if self.get(&id).is_none() { return id; }
        }
    }
}
