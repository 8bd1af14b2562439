//! Observed events: the append-only stream the projection reducer folds
//! over to produce workspace state.

use super::conversation::AgentType;
use super::directory::GitSummary;

/// A single observed fact about the world, carrying a strictly increasing
/// per-entity cursor so the reducer can detect and drop stale replays.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedEvent {
    pub cursor: u64,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    DirectoryUpsert { directory_id: String, path: String },
    DirectoryDelete { directory_id: String },
    DirectoryGitUpdated { directory_id: String, summary: GitSummary, remote_url: Option<String> },

    RepositoryUpsert { repository_id: String, name: String, remote_url: String },
    RepositoryDelete { repository_id: String },

    ConversationUpsert {
        session_id: String,
        directory_id: Option<String>,
        agent_type: AgentType,
    },
    ConversationDelete { session_id: String },

    TaskUpsert {
        task_id: String,
        repository_id: Option<String>,
        title: String,
    },
    TaskDelete { task_id: String },
    TaskReorder { task_id: String, order_key: f64 },
}

impl ObservedEvent {
    pub fn entity_key(&self) -> &str {
        match &self.kind {
            EventKind::DirectoryUpsert { directory_id, .. } => directory_id,
            EventKind::DirectoryDelete { directory_id } => directory_id,
            EventKind::DirectoryGitUpdated { directory_id, .. } => directory_id,
            EventKind::RepositoryUpsert { repository_id, .. } => repository_id,
            EventKind::RepositoryDelete { repository_id } => repository_id,
            EventKind::ConversationUpsert { session_id, .. } => session_id,
            EventKind::ConversationDelete { session_id } => session_id,
            EventKind::TaskUpsert { task_id, .. } => task_id,
            EventKind::TaskDelete { task_id } => task_id,
            EventKind::TaskReorder { task_id, .. } => task_id,
        }
    }
}
