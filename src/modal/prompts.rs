//! The smaller, mostly-textual prompt modals:
//! new-thread, add-directory, api-key, repository, task-editor and
//! release-notes, plus the conversation-title-edit overlay.
//!
//! These share one small text-buffer shape (a `String` buffer + `cursor_pos`)
//! generalized into a single reusable [`TextPrompt`].

use super::{Line, Modal, ModalKeyOutcome, Overlay};
use crate::input::{Key, Keystroke};

/// A minimal single-line text input shared by most of the small prompt
/// modals (path entry, API key entry, title entry, etc.).
#[derive(Debug, Clone, Default)]
pub struct TextPrompt {
    pub buffer: String,
    pub cursor_pos: usize,
    pub error_message: Option<String>,
}

impl TextPrompt {
    pub fn new(initial: impl Into<String>) -> Self {
        let buffer: String = initial.into();
        let cursor_pos = buffer.len();
        Self {
            buffer,
            cursor_pos,
            error_message: None,
        }
    }

    pub fn insert_char(&mut self, c: char) {
        self.buffer.insert(self.cursor_pos, c);
        self.cursor_pos += c.len_utf8();
        self.error_message = None;
    }

    pub fn backspace(&mut self) {
        if self.cursor_pos == 0 {
            return;
        }
        let mut prev = self.cursor_pos - 1;
        while !self.buffer.is_char_boundary(prev) {
            prev -= 1;
        }
        self.buffer.drain(prev..self.cursor_pos);
        self.cursor_pos = prev;
    }

    pub fn move_left(&mut self) {
        if self.cursor_pos > 0 {
            self.cursor_pos -= 1;
            while !self.buffer.is_char_boundary(self.cursor_pos) {
                self.cursor_pos -= 1;
            }
        }
    }

    pub fn move_right(&mut self) {
        if self.cursor_pos < self.buffer.len() {
            self.cursor_pos += 1;
            while self.cursor_pos < self.buffer.len() && !self.buffer.is_char_boundary(self.cursor_pos) {
                self.cursor_pos += 1;
            }
        }
    }
}

/// Shared keystroke handling for the single-line text prompts: typed
/// characters and Backspace/Left/Right edit the buffer, Enter submits.
fn text_prompt_on_key(prompt: &mut TextPrompt, stroke: &Keystroke) -> ModalKeyOutcome {
    match stroke.key {
        Key::Char(c) if !stroke.ctrl && !stroke.meta => {
            prompt.insert_char(c);
            ModalKeyOutcome::Consumed
        }
        Key::Backspace => {
            prompt.backspace();
            ModalKeyOutcome::Consumed
        }
        Key::Left => {
            prompt.move_left();
            ModalKeyOutcome::Consumed
        }
        Key::Right => {
            prompt.move_right();
            ModalKeyOutcome::Consumed
        }
        Key::Enter => ModalKeyOutcome::Submit,
        _ => ModalKeyOutcome::Ignored,
    }
}

fn single_line_overlay(title: &str, prompt: &TextPrompt, width: u16, height: u16) -> Overlay {
    let mut rows: Vec<Line> = vec![title.to_string(), String::new(), prompt.buffer.clone()];
    if let Some(err) = &prompt.error_message {
        rows.push(String::new());
        rows.push(err.clone());
    }
    Overlay {
        left: 4,
        top: 2,
        width,
        height,
        rows,
    }
}

macro_rules! text_prompt_modal {
    ($name:ident, $title:expr) => {
        #[derive(Debug, Clone, Default)]
        pub struct $name {
            pub prompt: TextPrompt,
            pub dismissed: bool,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }
        }

        impl Modal for $name {
            fn build_overlay(&self, cols: u16, _viewport_rows: u16) -> Overlay {
                let width = cols.min(60).max(20);
                single_line_overlay($title, &self.prompt, width, 7)
            }

            fn dismiss(&mut self) {
                self.dismissed = true;
            }

            fn on_key(&mut self, stroke: &Keystroke) -> ModalKeyOutcome {
                text_prompt_on_key(&mut self.prompt, stroke)
            }

            fn text_value(&self) -> Option<&str> {
                Some(&self.prompt.buffer)
            }
        }
    };
}

text_prompt_modal!(NewThreadPromptState, "New thread");
text_prompt_modal!(AddDirectoryPromptState, "Add directory");
text_prompt_modal!(ApiKeyPromptState, "API key");
text_prompt_modal!(RepositoryPromptState, "Repository");

/// Task editor holds both a title line and a multi-line body buffer plus an
/// autosave debounce timestamp.
#[derive(Debug, Clone, Default)]
pub struct TaskEditorPromptState {
    pub title: TextPrompt,
    pub body: String,
    pub body_cursor: usize,
    pub dismissed: bool,
    /// Tab toggles focus between the title line and the body; starts on the
    /// title since a new task always needs one.
    pub editing_title: bool,
}

impl TaskEditorPromptState {
    pub fn new() -> Self {
        Self {
            editing_title: true,
            ..Self::default()
        }
    }

    fn insert_body_char(&mut self, c: char) {
        self.body.insert(self.body_cursor, c);
        self.body_cursor += c.len_utf8();
    }

    fn body_backspace(&mut self) {
        if self.body_cursor == 0 {
            return;
        }
        let mut prev = self.body_cursor - 1;
        while !self.body.is_char_boundary(prev) {
            prev -= 1;
        }
        self.body.drain(prev..self.body_cursor);
        self.body_cursor = prev;
    }
}

impl Modal for TaskEditorPromptState {
    fn build_overlay(&self, cols: u16, viewport_rows: u16) -> Overlay {
        let width = cols.min(70).max(30);
        let height = viewport_rows.min(20).max(8);
        let mut rows = vec![self.title.buffer.clone(), String::new()];
        rows.extend(self.body.lines().map(str::to_string));
        Overlay {
            left: 2,
            top: 1,
            width,
            height,
            rows,
        }
    }

    fn dismiss(&mut self) {
        self.dismissed = true;
    }

    fn on_key(&mut self, stroke: &Keystroke) -> ModalKeyOutcome {
        if stroke.key == Key::Enter && stroke.ctrl {
            return ModalKeyOutcome::Submit;
        }
        if stroke.key == Key::Tab {
            self.editing_title = !self.editing_title;
            return ModalKeyOutcome::Consumed;
        }
        if self.editing_title {
            return match stroke.key {
                Key::Enter => {
                    self.editing_title = false;
                    ModalKeyOutcome::Consumed
                }
                _ => text_prompt_on_key(&mut self.title, stroke),
            };
        }
        match stroke.key {
            Key::Char(c) if !stroke.ctrl && !stroke.meta => {
                self.insert_body_char(c);
                ModalKeyOutcome::Consumed
            }
            Key::Backspace => {
                self.body_backspace();
                ModalKeyOutcome::Consumed
            }
            Key::Enter => {
                self.insert_body_char('\n');
                ModalKeyOutcome::Consumed
            }
            _ => ModalKeyOutcome::Ignored,
        }
    }

    fn text_value(&self) -> Option<&str> {
        Some(&self.title.buffer)
    }
}

/// Release notes modal: read-only content plus a "never show again" toggle,
/// persisted via `persistence::files::ReleaseNotesState`.
#[derive(Debug, Clone, Default)]
pub struct ReleaseNotesPromptState {
    pub tag: String,
    pub body_lines: Vec<String>,
    pub never_show: bool,
    pub dismissed: bool,
}

impl Modal for ReleaseNotesPromptState {
    fn build_overlay(&self, cols: u16, viewport_rows: u16) -> Overlay {
        let width = cols.min(72).max(30);
        let height = viewport_rows.min(24).max(6);
        let mut rows = vec![format!("Release notes — {}", self.tag), String::new()];
        rows.extend(self.body_lines.iter().cloned());
        Overlay {
            left: 3,
            top: 1,
            width,
            height,
            rows,
        }
    }

    fn dismiss(&mut self) {
        self.dismissed = true;
    }

    fn on_key(&mut self, stroke: &Keystroke) -> ModalKeyOutcome {
        match stroke.key {
            Key::Space => {
                self.never_show = !self.never_show;
                ModalKeyOutcome::Consumed
            }
            Key::Enter => ModalKeyOutcome::Submit,
            _ => ModalKeyOutcome::Ignored,
        }
    }
}

/// Conversation title-edit: not a full overlay modal
/// (it is rendered inline in the rail), but it participates in the same
/// precedence slot, so it still implements [`Modal`].
#[derive(Debug, Clone, Default)]
pub struct ConversationTitleEditState {
    pub session_id: String,
    pub original_title: Option<String>,
    pub buffer: TextPrompt,
    pub persist_pending: bool,
}

impl Modal for ConversationTitleEditState {
    fn build_overlay(&self, cols: u16, _viewport_rows: u16) -> Overlay {
        Overlay {
            left: 0,
            top: 0,
            width: cols.min(40),
            height: 1,
            rows: vec![self.buffer.buffer.clone()],
        }
    }

    fn on_key(&mut self, stroke: &Keystroke) -> ModalKeyOutcome {
        let outcome = text_prompt_on_key(&mut self.buffer, stroke);
        if outcome == ModalKeyOutcome::Consumed {
            self.persist_pending = true;
        }
        outcome
    }

    fn text_value(&self) -> Option<&str> {
        Some(&self.buffer.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_prompt_insert_and_backspace() {
        let mut prompt = TextPrompt::new("ab");
        prompt.insert_char('c');
        assert_eq!(prompt.buffer, "abc");
        prompt.backspace();
        assert_eq!(prompt.buffer, "ab");
    }

    #[test]
    fn cursor_movement_stays_in_bounds() {
        let mut prompt = TextPrompt::new("a");
        prompt.move_left();
        assert_eq!(prompt.cursor_pos, 0);
        prompt.move_left();
        assert_eq!(prompt.cursor_pos, 0);
        prompt.move_right();
        prompt.move_right();
        assert_eq!(prompt.cursor_pos, 1);
    }

    #[test]
    fn add_directory_prompt_dismiss_sets_flag() {
        let mut modal = AddDirectoryPromptState::new();
        modal.dismiss();
        assert!(modal.dismissed);
    }
}
