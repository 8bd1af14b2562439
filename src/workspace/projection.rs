//! Pure reducer folding observed events into workspace entity state.
//!
//! Every event carries a per-entity cursor. Re-delivering an event whose
//! cursor is not strictly greater than the last one applied for that entity
//! is a no-op, which is what makes [`Projection::apply`] idempotent and
//! keeps entities internally cursor-monotonic regardless of how events for
//! *other* entities interleave with them.

use std::collections::HashMap;

use super::conversation::{Conversation, ConversationManager};
use super::directory::{Directory, DirectoryManager};
use super::events::{EventKind, ObservedEvent};
use super::repository::{Repository, RepositoryManager};
use super::task::{Task, TaskManager, TaskStatus};

#[derive(Default)]
pub struct Projection {
    pub directories: DirectoryManager,
    pub repositories: RepositoryManager,
    pub conversations: ConversationManager,
    pub tasks: TaskManager,
    last_applied: HashMap<String, u64>,
    next_order_cursor: u64,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. Returns `false` without mutating anything if this
    /// entity has already seen a cursor at or past this one.
    pub fn apply(&mut self, event: ObservedEvent) -> bool {
        let key = event.entity_key().to_string();
        if let Some(&last) = self.last_applied.get(&key) {
            if event.cursor <= last {
                return false;
            }
        }
        self.apply_kind(event.kind);
        self.last_applied.insert(key, event.cursor);
        true
    }

    pub fn apply_all(&mut self, events: impl IntoIterator<Item = ObservedEvent>) {
        for event in events {
            self.apply(event);
        }
    }

    pub fn next_cursor(&mut self) -> u64 {
        self.next_order_cursor += 1;
        self.next_order_cursor
    }

    fn apply_kind(&mut self, kind: EventKind) {
        match kind {
            EventKind::DirectoryUpsert { directory_id, path } => {
                self.directories.upsert(Directory {
                    directory_id,
                    path,
                    archived_at: None,
                });
            }
            EventKind::DirectoryDelete { directory_id } => {
                self.directories.delete(&directory_id);
            }
            EventKind::DirectoryGitUpdated {
                directory_id,
                summary,
                remote_url,
            } => {
                self.directories.set_git_summary(&directory_id, summary);
                if let Some(remote_url) = remote_url {
                    self.repositories
                        .sync_directory_association(&directory_id, &remote_url);
                }
            }
            EventKind::RepositoryUpsert {
                repository_id,
                name,
                remote_url,
            } => {
                self.repositories.upsert(Repository {
                    repository_id,
                    name,
                    remote_url,
                    default_branch: None,
                    archived_at: None,
                });
            }
            EventKind::RepositoryDelete { repository_id } => {
                self.repositories.delete(&repository_id);
            }
            EventKind::ConversationUpsert {
                session_id,
                directory_id,
                agent_type,
            } => {
                let order_cursor = self.next_cursor();
                let mut conversation = Conversation::new(session_id.clone(), agent_type, order_cursor);
                conversation.directory_id = directory_id;
                self.conversations.upsert(conversation);
            }
            EventKind::ConversationDelete { session_id } => {
                self.conversations.delete(&session_id);
            }
            EventKind::TaskUpsert {
                task_id,
                repository_id,
                title,
            } => {
                let order_key = self.next_cursor() as f64;
                self.tasks.upsert(Task {
                    task_id,
                    repository_id,
                    title,
                    body: String::new(),
                    status: TaskStatus::Draft,
                    order_key,
                });
            }
            EventKind::TaskDelete { task_id } => {
                self.tasks.delete(&task_id);
            }
            EventKind::TaskReorder { task_id, order_key } => {
                self.tasks.reorder(&task_id, order_key);
            }
        }
    }

    /// A directory can be archived only if no live conversation or
    /// non-completed task still references it (directly, or transitively
    /// through its associated repository).
    pub fn can_archive_directory(&self, directory_id: &str) -> bool {
        let has_live_conversation = self
            .conversations
            .ordered_ids()
            .iter()
            .filter_map(|id| self.conversations.get(id))
            .any(|c| c.directory_id.as_deref() == Some(directory_id) && c.live);

        let has_live_task = self
            .repositories
            .repository_for_directory(directory_id)
            .map(|repo_id| self.tasks.has_non_completed_for_repository(repo_id))
            .unwrap_or(false);

        self.directories
            .can_archive(directory_id, has_live_conversation || has_live_task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::conversation::AgentType;

    fn ev(cursor: u64, kind: EventKind) -> ObservedEvent {
        ObservedEvent { cursor, kind }
    }

    #[test]
    fn directory_then_conversation_then_delete_leaves_only_directory() {
        let mut projection = Projection::new();
        projection.apply_all([
            ev(
                1,
                EventKind::DirectoryUpsert {
                    directory_id: "D".into(),
                    path: "/p".into(),
                },
            ),
            ev(
                2,
                EventKind::ConversationUpsert {
                    session_id: "C".into(),
                    directory_id: Some("D".into()),
                    agent_type: AgentType::Codex,
                },
            ),
            ev(3, EventKind::ConversationDelete { session_id: "C".into() }),
        ]);

        assert!(projection.directories.contains("D"));
        assert!(projection.conversations.get("C").is_none());
        assert!(!projection.conversations.is_subscribed("C"));
    }

    #[test]
    fn replaying_the_same_event_twice_has_no_further_effect() {
        let mut projection = Projection::new();
        let upsert = ev(
            1,
            EventKind::DirectoryUpsert {
                directory_id: "D".into(),
                path: "/p".into(),
            },
        );
        assert!(projection.apply(upsert.clone()));
        assert!(!projection.apply(upsert));
        assert_eq!(projection.directories.iter().count(), 1);
    }

    #[test]
    fn stale_cursor_for_an_entity_is_dropped_even_out_of_global_order() {
        let mut projection = Projection::new();
        projection.apply(ev(
            5,
            EventKind::DirectoryUpsert {
                directory_id: "D".into(),
                path: "/new".into(),
            },
        ));
        // A cursor-3 update for the same entity arrives after a cursor-5
        // one (e.g. redelivered from a slow path) and must not regress it.
        let applied = projection.apply(ev(
            3,
            EventKind::DirectoryUpsert {
                directory_id: "D".into(),
                path: "/stale".into(),
            },
        ));
        assert!(!applied);
        assert_eq!(projection.directories.get("D").unwrap().path, "/new");
    }

    #[test]
    fn events_for_independent_entities_interleave_without_conflict() {
        let mut projection = Projection::new();
        projection.apply_all([
            ev(
                10,
                EventKind::ConversationUpsert {
                    session_id: "C".into(),
                    directory_id: None,
                    agent_type: AgentType::Claude,
                },
            ),
            ev(
                1,
                EventKind::DirectoryUpsert {
                    directory_id: "D".into(),
                    path: "/p".into(),
                },
            ),
        ]);
        assert!(projection.directories.contains("D"));
        assert!(projection.conversations.contains("C"));
    }

    #[test]
    fn directory_archival_blocked_by_live_conversation() {
        let mut projection = Projection::new();
        projection.apply_all([
            ev(
                1,
                EventKind::DirectoryUpsert {
                    directory_id: "D".into(),
                    path: "/p".into(),
                },
            ),
            ev(
                2,
                EventKind::ConversationUpsert {
                    session_id: "C".into(),
                    directory_id: Some("D".into()),
                    agent_type: AgentType::Codex,
                },
            ),
        ]);
        if let Some(conversation) = projection.conversations.get_mut("C") {
            conversation.live = true;
        }
        assert!(!projection.can_archive_directory("D"));
    }
}
