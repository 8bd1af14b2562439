//! Task entity and manager.

use std::collections::HashMap;
use std::time::Instant;

use super::repository::RepositoryId;

pub type TaskId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Draft,
    Ready,
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub task_id: TaskId,
    pub repository_id: Option<RepositoryId>,
    pub title: String,
    pub body: String,
    pub status: TaskStatus,
    pub order_key: f64,
}

/// Per-task composer buffer with an autosave debounce timer.
pub struct ComposerBuffer {
    pub text: String,
    pub cursor: usize,
    pub last_edited_at: Option<Instant>,
}

impl Default for ComposerBuffer {
    fn default() -> Self {
        Self {
            text: String::new(),
            cursor: 0,
            last_edited_at: None,
        }
    }
}

pub const TASK_AUTOSAVE_DEBOUNCE_MS: u64 = 250;

impl ComposerBuffer {
    pub fn edit(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor = self.text.len();
        self.last_edited_at = Some(Instant::now());
    }

    /// True once the debounce window has elapsed since the last edit,
    /// signalling the autosave op should be enqueued.
    pub fn due_for_autosave(&self) -> bool {
        self.last_edited_at
            .map(|t| t.elapsed().as_millis() as u64 >= TASK_AUTOSAVE_DEBOUNCE_MS)
            .unwrap_or(false)
    }
}

#[derive(Default)]
pub struct TaskManager {
    tasks: HashMap<TaskId, Task>,
    order: Vec<TaskId>,
    composers: HashMap<TaskId, ComposerBuffer>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, task: Task) {
        if !self.tasks.contains_key(&task.task_id) {
            self.order.push(task.task_id.clone());
        }
        self.tasks.insert(task.task_id.clone(), task);
        self.order.sort_by(|a, b| {
            let ka = self.tasks.get(a).map(|t| t.order_key).unwrap_or(f64::MAX);
            let kb = self.tasks.get(b).map(|t| t.order_key).unwrap_or(f64::MAX);
            ka.partial_cmp(&kb).unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    pub fn delete(&mut self, id: &str) {
        self.tasks.remove(id);
        self.order.retain(|existing| existing != id);
        self.composers.remove(id);
    }

    pub fn reorder(&mut self, id: &str, new_order_key: f64) {
        if let Some(task) = self.tasks.get_mut(id) {
            task.order_key = new_order_key;
        }
        self.order.sort_by(|a, b| {
            let ka = self.tasks.get(a).map(|t| t.order_key).unwrap_or(f64::MAX);
            let kb = self.tasks.get(b).map(|t| t.order_key).unwrap_or(f64::MAX);
            ka.partial_cmp(&kb).unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn ordered(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(move |id| self.tasks.get(id))
    }

    pub fn by_repository(&self, repository_id: &str) -> impl Iterator<Item = &Task> {
        self.ordered()
            .filter(move |t| t.repository_id.as_deref() == Some(repository_id))
    }

    pub fn composer_mut(&mut self, id: &str) -> &mut ComposerBuffer {
        self.composers.entry(id.to_string()).or_default()
    }

    /// Repository tasks with non-`Completed` status
    /// still "reference" an archived directory's repository and must block
    /// archival, matching the directory-archival rule.
    pub fn has_non_completed_for_repository(&self, repository_id: &str) -> bool {
        self.by_repository(repository_id)
            .any(|t| t.status != TaskStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, order_key: f64) -> Task {
        Task {
            task_id: id.to_string(),
            repository_id: None,
            title: id.to_string(),
            body: String::new(),
            status: TaskStatus::Draft,
            order_key,
        }
    }

    #[test]
    fn ordered_reflects_order_key() {
        let mut manager = TaskManager::new();
        manager.upsert(task("b", 2.0));
        manager.upsert(task("a", 1.0));
        let ids: Vec<_> = manager.ordered().map(|t| t.task_id.clone()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn reorder_changes_order() {
        let mut manager = TaskManager::new();
        manager.upsert(task("a", 1.0));
        manager.upsert(task("b", 2.0));
        manager.reorder("a", 3.0);
        let ids: Vec<_> = manager.ordered().map(|t| t.task_id.clone()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn composer_autosave_due_after_debounce() {
        let mut manager = TaskManager::new();
        let composer = manager.composer_mut("t1");
        assert!(!composer.due_for_autosave());
        composer.edit("hello");
        assert!(!composer.due_for_autosave());
    }
}
