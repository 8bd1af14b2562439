//! The process-wide workspace singleton: active selection, modal state,
//! pane/selection state, and the entity managers reached through a
//! [`Projection`].

pub mod conversation;
pub mod directory;
pub mod events;
pub mod projection;
pub mod repository;
pub mod task;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::modal::ModalKind;
use crate::modal::prompts::ConversationTitleEditState;
use conversation::SessionId;
use directory::DirectoryId;
use projection::Projection;
use repository::RepositoryId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MainPaneMode {
    #[default]
    Home,
    Project,
    Conversation,
    Tasks,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeftNavSelection {
    Home,
    Tasks,
    Repository(RepositoryId),
    Project(DirectoryId),
    Conversation(SessionId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionPoint {
    pub row: u16,
    pub col: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub anchor: SelectionPoint,
    pub focus: SelectionPoint,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionDrag {
    pub anchor: SelectionPoint,
    pub focus: SelectionPoint,
    pub has_dragged: bool,
}

/// A transient, auto-expiring notice shown in the task pane / debug footer.
/// Generalizes a toast queue into the single-line notice surface this
/// system exposes (see error-handling rules: user/input errors and
/// control-plane RPC errors are both surfaced this way).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub id: u64,
    pub message: String,
    pub level: NoticeLevel,
    pub created_at: Instant,
    pub duration: Duration,
}

impl Notice {
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.duration
    }
}

pub struct NoticeQueue {
    queue: VecDeque<Notice>,
    next_id: u64,
    max_visible: usize,
}

impl Default for NoticeQueue {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            next_id: 1,
            max_visible: 5,
        }
    }
}

impl NoticeQueue {
    pub fn push(&mut self, message: impl Into<String>, level: NoticeLevel) {
        let notice = Notice {
            id: self.next_id,
            message: message.into(),
            level,
            created_at: Instant::now(),
            duration: Duration::from_secs(3),
        };
        self.next_id = self.next_id.wrapping_add(1);
        self.queue.push_back(notice);
        while self.queue.len() > self.max_visible {
            self.queue.pop_front();
        }
    }

    pub fn evict_expired(&mut self) {
        self.queue.retain(|n| !n.is_expired());
    }

    pub fn visible(&self) -> impl Iterator<Item = &Notice> {
        self.queue.iter()
    }
}

#[derive(Default)]
pub struct PaneState {
    pub scroll_offset: usize,
    pub repositories_collapsed: bool,
    pub shortcuts_collapsed: bool,
    pub show_debug_bar: bool,
    pub show_gateway_profile: bool,
    pub show_gateway_status_timeline: bool,
    pub show_gateway_render_trace: bool,
}

pub struct Workspace {
    pub active_directory_id: Option<DirectoryId>,
    pub active_conversation_id: Option<SessionId>,
    pub main_pane_mode: MainPaneMode,
    pub left_nav_selection: LeftNavSelection,
    pub active_modal: Option<ModalKind>,
    pub conversation_title_edit: Option<ConversationTitleEditState>,
    pub panes: PaneState,
    pub repository_toggle_chord_prefix_at: Option<Instant>,
    pub selection: Option<Selection>,
    pub selection_drag: Option<SelectionDrag>,
    pub selection_pinned_follow_output: bool,
    pub notices: NoticeQueue,
    pub projection: Projection,
}

impl Default for Workspace {
    fn default() -> Self {
        Self {
            active_directory_id: None,
            active_conversation_id: None,
            main_pane_mode: MainPaneMode::default(),
            left_nav_selection: LeftNavSelection::Home,
            active_modal: None,
            conversation_title_edit: None,
            panes: PaneState::default(),
            repository_toggle_chord_prefix_at: None,
            selection: None,
            selection_drag: None,
            selection_pinned_follow_output: false,
            notices: NoticeQueue::default(),
            projection: Projection::new(),
        }
    }
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opening any modal clears a pending conversation title edit, per the
    /// single-active-modal invariant — the title edit occupies the same
    /// precedence slot as a modal even though it renders inline.
    pub fn open_modal(&mut self, kind: ModalKind) {
        self.conversation_title_edit = None;
        self.active_modal = Some(kind);
    }

    pub fn close_modal(&mut self) {
        self.active_modal = None;
    }

    /// True whenever `active_conversation_id` names a conversation that
    /// still exists in the projection.
    pub fn active_conversation_is_consistent(&self) -> bool {
        match &self.active_conversation_id {
            None => true,
            Some(id) => self.projection.conversations.contains(id),
        }
    }

    pub fn select_conversation(&mut self, session_id: SessionId) {
        self.left_nav_selection = LeftNavSelection::Conversation(session_id.clone());
        self.active_conversation_id = Some(session_id);
        self.main_pane_mode = MainPaneMode::Conversation;
    }

    pub fn clear_active_conversation(&mut self) {
        self.active_conversation_id = None;
        if matches!(self.left_nav_selection, LeftNavSelection::Conversation(_)) {
            self.left_nav_selection = LeftNavSelection::Home;
            self.main_pane_mode = MainPaneMode::Home;
        }
    }

    /// Start a mouse-drag selection at `(row, col)`. Replaces any selection
    /// already in progress; does not yet pin against new output.
    pub fn begin_selection_drag(&mut self, row: u16, col: u16) {
        let point = SelectionPoint { row, col };
        self.selection_drag = Some(SelectionDrag {
            anchor: point,
            focus: point,
            has_dragged: false,
        });
        self.selection = Some(Selection {
            anchor: point,
            focus: point,
            text: String::new(),
        });
    }

    /// Extend the in-progress drag to `(row, col)`.
    pub fn update_selection_drag(&mut self, row: u16, col: u16) {
        let Some(drag) = self.selection_drag.as_mut() else {
            return;
        };
        let focus = SelectionPoint { row, col };
        if focus != drag.anchor {
            drag.has_dragged = true;
        }
        drag.focus = focus;
        if let Some(selection) = self.selection.as_mut() {
            selection.focus = focus;
        }
    }

    /// Finish the drag. A selection that actually moved pins against new
    /// output arriving in the active conversation; a click with no drag
    /// clears the selection instead.
    pub fn end_selection_drag(&mut self) {
        let Some(drag) = self.selection_drag.take() else {
            return;
        };
        if drag.has_dragged {
            self.selection_pinned_follow_output = true;
        } else {
            self.clear_selection();
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
        self.selection_drag = None;
        self.selection_pinned_follow_output = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::events::{EventKind, ObservedEvent};
    use crate::workspace::conversation::AgentType;

    #[test]
    fn opening_a_modal_clears_pending_title_edit() {
        let mut workspace = Workspace::new();
        workspace.conversation_title_edit = Some(ConversationTitleEditState::default());
        workspace.open_modal(ModalKind::AddDirectory);
        assert!(workspace.conversation_title_edit.is_none());
        assert_eq!(workspace.active_modal, Some(ModalKind::AddDirectory));
    }

    #[test]
    fn active_conversation_consistency_tracks_deletion() {
        let mut workspace = Workspace::new();
        workspace.projection.apply(ObservedEvent {
            cursor: 1,
            kind: EventKind::ConversationUpsert {
                session_id: "C".into(),
                directory_id: None,
                agent_type: AgentType::Codex,
            },
        });
        workspace.select_conversation("C".to_string());
        assert!(workspace.active_conversation_is_consistent());

        workspace.projection.apply(ObservedEvent {
            cursor: 2,
            kind: EventKind::ConversationDelete { session_id: "C".into() },
        });
        assert!(!workspace.active_conversation_is_consistent());
    }

    #[test]
    fn drag_that_moves_pins_selection_follow_output() {
        let mut workspace = Workspace::new();
        workspace.begin_selection_drag(0, 0);
        workspace.update_selection_drag(2, 5);
        workspace.end_selection_drag();
        assert!(workspace.selection_pinned_follow_output);
        assert!(workspace.selection.is_some());
    }

    #[test]
    fn drag_that_never_moves_clears_selection() {
        let mut workspace = Workspace::new();
        workspace.begin_selection_drag(1, 1);
        workspace.end_selection_drag();
        assert!(!workspace.selection_pinned_follow_output);
        assert!(workspace.selection.is_none());
    }

    #[test]
    fn clearing_active_conversation_falls_back_to_home() {
        let mut workspace = Workspace::new();
        workspace.select_conversation("C".to_string());
        workspace.clear_active_conversation();
        assert_eq!(workspace.left_nav_selection, LeftNavSelection::Home);
        assert_eq!(workspace.main_pane_mode, MainPaneMode::Home);
    }
}
