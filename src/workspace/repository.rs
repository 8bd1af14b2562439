//! Repository entity and manager.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::directory::DirectoryId;

pub type RepositoryId = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub repository_id: RepositoryId,
    pub name: String,
    pub remote_url: String,
    pub default_branch: Option<String>,
    pub archived_at: Option<DateTime<Utc>>,
}

/// Derived, best-effort snapshot computed from local git probing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositorySnapshot {
    pub normalized_remote_url: Option<String>,
    pub commit_count: Option<u64>,
    pub last_commit_at: Option<DateTime<Utc>>,
    pub short_commit_hash: Option<String>,
    pub inferred_name: Option<String>,
    pub default_branch: Option<String>,
}

#[derive(Default)]
pub struct RepositoryManager {
    repositories: HashMap<RepositoryId, Repository>,
    order: Vec<RepositoryId>,
    /// Directory -> repository association, resynced by remote URL when a
    /// directory's git-updated event arrives.
    directory_repository: HashMap<DirectoryId, RepositoryId>,
}

impl RepositoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, repository: Repository) {
        if !self.repositories.contains_key(&repository.repository_id) {
            self.order.push(repository.repository_id.clone());
        }
        self.repositories
            .insert(repository.repository_id.clone(), repository);
    }

    pub fn delete(&mut self, id: &str) {
        self.repositories.remove(id);
        self.order.retain(|existing| existing != id);
        self.directory_repository.retain(|_, repo_id| repo_id != id);
    }

    pub fn get(&self, id: &str) -> Option<&Repository> {
        self.repositories.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Repository> {
        self.order.iter().filter_map(move |id| self.repositories.get(id))
    }

    pub fn find_by_remote_url(&self, remote_url: &str) -> Option<&Repository> {
        self.repositories.values().find(|r| r.remote_url == remote_url)
    }

    /// Sync the directory -> repository association by remote URL, per the
    /// git-updated event for a directory.
    pub fn sync_directory_association(&mut self, directory_id: &DirectoryId, remote_url: &str) {
        if let Some(repo) = self.find_by_remote_url(remote_url) {
            self.directory_repository
                .insert(directory_id.clone(), repo.repository_id.clone());
        }
    }

    pub fn repository_for_directory(&self, directory_id: &str) -> Option<&RepositoryId> {
        self.directory_repository.get(directory_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(id: &str, remote: &str) -> Repository {
        Repository {
            repository_id: id.to_string(),
            name: id.to_string(),
            remote_url: remote.to_string(),
            default_branch: None,
            archived_at: None,
        }
    }

    #[test]
    fn sync_directory_association_resolves_by_remote_url() {
        let mut manager = RepositoryManager::new();
        manager.upsert(repo("r1", "git@example.com:org/repo.git"));
        manager.sync_directory_association(&"d1".to_string(), "git@example.com:org/repo.git");
        assert_eq!(manager.repository_for_directory("d1"), Some(&"r1".to_string()));
    }

    #[test]
    fn delete_clears_directory_associations() {
        let mut manager = RepositoryManager::new();
        manager.upsert(repo("r1", "url"));
        manager.sync_directory_association(&"d1".to_string(), "url");
        manager.delete("r1");
        assert!(manager.repository_for_directory("d1").is_none());
    }
}
