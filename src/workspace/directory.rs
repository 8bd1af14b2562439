//! Directory entity and manager.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

pub type DirectoryId = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    pub directory_id: DirectoryId,
    pub path: String,
    pub archived_at: Option<DateTime<Utc>>,
}

impl Directory {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

/// Per-directory derived git summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitSummary {
    pub branch: Option<String>,
    pub changed_files: u32,
    pub additions: u32,
    pub deletions: u32,
}

#[derive(Default)]
pub struct DirectoryManager {
    directories: HashMap<DirectoryId, Directory>,
    git_summaries: HashMap<DirectoryId, GitSummary>,
    /// Insertion order, used to keep a stable default ordering.
    order: Vec<DirectoryId>,
}

impl DirectoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, directory: Directory) {
        if !self.directories.contains_key(&directory.directory_id) {
            self.order.push(directory.directory_id.clone());
        }
        self.directories.insert(directory.directory_id.clone(), directory);
    }

    pub fn delete(&mut self, id: &str) {
        self.directories.remove(id);
        self.git_summaries.remove(id);
        self.order.retain(|existing| existing != id);
    }

    pub fn get(&self, id: &str) -> Option<&Directory> {
        self.directories.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Directory> {
        self.directories.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.directories.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Directory> {
        self.order.iter().filter_map(move |id| self.directories.get(id))
    }

    pub fn set_git_summary(&mut self, id: &str, summary: GitSummary) {
        self.git_summaries.insert(id.to_string(), summary);
    }

    pub fn git_summary(&self, id: &str) -> Option<&GitSummary> {
        self.git_summaries.get(id)
    }

    /// True if no non-archived conversations/tasks
    /// reference `id`. The projection reducer is responsible for calling
    /// this before allowing archival; it lives here because it's pure
    /// domain logic over directory state only — callers pass in the
    /// relevant id sets from the other managers.
    pub fn can_archive(&self, id: &str, has_live_references: bool) -> bool {
        self.contains(id) && !has_live_references
    }
}
