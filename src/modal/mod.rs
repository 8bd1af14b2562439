//! Modal overlay manager plus the command menu and the
//! smaller prompt modals it dispatches among.

pub mod command_menu;
pub mod prompts;

use crate::input::mouse::MouseEvent;

/// A single line of overlay content. Kept as a plain string — the renderer
/// is responsible for styling; the modal only supplies text.
pub type Line = String;

/// The rectangle + content of the currently active modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub rows: Vec<Line>,
}

impl Overlay {
    pub fn contains(&self, col: u16, row: u16) -> bool {
        col >= self.left
            && col < self.left + self.width
            && row >= self.top
            && row < self.top + self.height
    }
}

/// Outcome of feeding one keystroke to the active modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalKeyOutcome {
    /// The modal had nothing to do with this keystroke; the caller should
    /// fall through to shortcut/pane handling.
    Ignored,
    /// The modal consumed the keystroke (text entry, navigation).
    Consumed,
    /// The modal's primary action was submitted (Enter); the caller should
    /// read back [`Modal::text_value`] and close the modal.
    Submit,
}

/// Behavior every modal implementation provides.
pub trait Modal {
    fn build_overlay(&self, cols: u16, viewport_rows: u16) -> Overlay;

    /// Called when an outside click dismisses this modal.
    fn dismiss(&mut self) {}

    /// Called for a press inside the overlay rectangle. Return `true` if the
    /// modal consumed the press (so the caller does not also treat it as a
    /// pane click).
    fn on_inside_pointer_press(&mut self, _col: u16, _row: u16) -> bool {
        false
    }

    /// Feed one decoded keystroke to the modal. The default accepts nothing,
    /// which is correct for read-only overlays that have no text entry.
    fn on_key(&mut self, _stroke: &crate::input::Keystroke) -> ModalKeyOutcome {
        ModalKeyOutcome::Ignored
    }

    /// The modal's current text payload, read back by the caller on
    /// [`ModalKeyOutcome::Submit`]. Modals with no text payload keep the
    /// default.
    fn text_value(&self) -> Option<&str> {
        None
    }
}

/// Which modal kind is active — used for precedence ordering.
/// Declared highest-precedence first; [`ModalKind::precedence`] returns the
/// index into this ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModalKind {
    ReleaseNotes,
    CommandMenu,
    ConversationTitleEdit,
    TaskEditor,
    Repository,
    ApiKey,
    AddDirectory,
    NewThread,
}

const PRECEDENCE_ORDER: &[ModalKind] = &[
    ModalKind::ReleaseNotes,
    ModalKind::CommandMenu,
    ModalKind::ConversationTitleEdit,
    ModalKind::TaskEditor,
    ModalKind::Repository,
    ModalKind::ApiKey,
    ModalKind::AddDirectory,
    ModalKind::NewThread,
];

impl ModalKind {
    pub fn precedence(&self) -> usize {
        PRECEDENCE_ORDER.iter().position(|k| k == self).unwrap_or(usize::MAX)
    }
}

/// Result of routing a mouse press through the modal manager.
/// `input_remainder` is reserved for a future keystroke the press handling
/// could not place anywhere; mouse routing itself never produces one today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModalRouteResult {
    pub handled: bool,
    pub input_remainder: Option<crate::input::Keystroke>,
}

/// Tracks the single active modal and its kind, and performs
/// precedence-ordered replacement plus outside-click dismissal.
pub struct ModalManager {
    current: Option<(ModalKind, Box<dyn Modal>)>,
}

impl Default for ModalManager {
    fn default() -> Self {
        Self { current: None }
    }
}

impl ModalManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_kind(&self) -> Option<ModalKind> {
        self.current.as_ref().map(|(k, _)| *k)
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Request to open `modal` as `kind`. By precedence rule: a lower
    /// (numerically smaller = higher-priority) kind already showing is not
    /// displaced by a request for a lower-priority kind. Opening any modal
    /// that IS allowed to open clears any pending conversation title edit
    /// (handled by the caller, which owns that state).
    pub fn request_open(&mut self, kind: ModalKind, modal: Box<dyn Modal>) -> bool {
        let allowed = match &self.current {
            None => true,
            Some((current_kind, _)) => kind.precedence() <= current_kind.precedence(),
        };
        if allowed {
            self.current = Some((kind, modal));
        }
        allowed
    }

    pub fn close(&mut self) {
        self.current = None;
    }

    pub fn build_current_overlay(&self, cols: u16, viewport_rows: u16) -> Option<Overlay> {
        self.current
            .as_ref()
            .map(|(_, modal)| modal.build_overlay(cols, viewport_rows))
    }

    /// Route an SGR mouse press. Non-press (wheel/motion/release) events are
    /// never routed here — only plain presses participate in outside-click
    /// dismissal.
    pub fn route_mouse_press(
        &mut self,
        event: &MouseEvent,
        cols: u16,
        viewport_rows: u16,
    ) -> ModalRouteResult {
        let Some((_, modal)) = self.current.as_mut() else {
            return ModalRouteResult::default();
        };
        if !event.is_plain_press() {
            return ModalRouteResult::default();
        }

        let overlay = modal.build_overlay(cols, viewport_rows);
        let col = event.col.max(0) as u16;
        let row = event.row.max(0) as u16;

        if overlay.contains(col, row) {
            let consumed = modal.on_inside_pointer_press(col - overlay.left, row - overlay.top);
            ModalRouteResult {
                handled: consumed,
                input_remainder: None,
            }
        } else {
            modal.dismiss();
            self.current = None;
            ModalRouteResult::default()
        }
    }

    /// Route a decoded keystroke to the current modal, if any. `Ignored` is
    /// also returned when nothing is open, so the caller always falls
    /// through to shortcut detection / pane-local handling in that case.
    pub fn route_keystroke(&mut self, stroke: &crate::input::Keystroke) -> ModalKeyOutcome {
        use crate::input::Key;

        let Some((_, modal)) = self.current.as_mut() else {
            return ModalKeyOutcome::Ignored;
        };

        if matches!(stroke.key, Key::Escape) {
            modal.dismiss();
            self.current = None;
            return ModalKeyOutcome::Consumed;
        }

        modal.on_key(stroke)
    }

    /// Reads the submitted text from the currently open modal, if any.
    /// Called by the caller after `route_keystroke` returns `Submit`, before
    /// the caller closes the modal.
    pub fn current_text_value(&self) -> Option<&str> {
        self.current.as_ref().and_then(|(_, modal)| modal.text_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedModal {
        rect: (u16, u16, u16, u16),
        dismissed: std::cell::Cell<bool>,
    }

    impl Modal for FixedModal {
        fn build_overlay(&self, _cols: u16, _viewport_rows: u16) -> Overlay {
            let (left, top, width, height) = self.rect;
            Overlay {
                left,
                top,
                width,
                height,
                rows: vec![],
            }
        }

        fn dismiss(&mut self) {
            self.dismissed.set(true);
        }
    }

    fn press(col: i64, row: i64) -> MouseEvent {
        MouseEvent {
            kind: crate::input::mouse::MouseKind::Press { button: 0 },
            col,
            row,
            modifiers: Default::default(),
            is_release: false,
        }
    }

    #[test]
    fn press_outside_overlay_dismisses_modal() {
        let mut manager = ModalManager::new();
        manager.request_open(
            ModalKind::AddDirectory,
            Box::new(FixedModal {
                rect: (10, 5, 40, 10),
                dismissed: std::cell::Cell::new(false),
            }),
        );

        let result = manager.route_mouse_press(&press(3, 3), 100, 40);
        assert!(!result.handled);
        assert!(manager.current_kind().is_none());
    }

    #[test]
    fn inside_press_consults_modal_and_keeps_it_open() {
        let mut manager = ModalManager::new();
        manager.request_open(
            ModalKind::AddDirectory,
            Box::new(FixedModal {
                rect: (10, 5, 40, 10),
                dismissed: std::cell::Cell::new(false),
            }),
        );

        let result = manager.route_mouse_press(&press(15, 7), 100, 40);
        assert!(!result.handled); // FixedModal's default on_inside_pointer_press returns false
        assert!(manager.current_kind().is_some());
    }

    #[test]
    fn higher_precedence_modal_displaces_lower_precedence_one() {
        let mut manager = ModalManager::new();
        manager.request_open(
            ModalKind::NewThread,
            Box::new(FixedModal {
                rect: (0, 0, 1, 1),
                dismissed: std::cell::Cell::new(false),
            }),
        );
        let opened = manager.request_open(
            ModalKind::ReleaseNotes,
            Box::new(FixedModal {
                rect: (0, 0, 1, 1),
                dismissed: std::cell::Cell::new(false),
            }),
        );
        assert!(opened);
        assert_eq!(manager.current_kind(), Some(ModalKind::ReleaseNotes));
    }

    #[test]
    fn lower_precedence_modal_does_not_displace_higher_precedence_one() {
        let mut manager = ModalManager::new();
        manager.request_open(
            ModalKind::ReleaseNotes,
            Box::new(FixedModal {
                rect: (0, 0, 1, 1),
                dismissed: std::cell::Cell::new(false),
            }),
        );
        let opened = manager.request_open(
            ModalKind::NewThread,
            Box::new(FixedModal {
                rect: (0, 0, 1, 1),
                dismissed: std::cell::Cell::new(false),
            }),
        );
        assert!(!opened);
        assert_eq!(manager.current_kind(), Some(ModalKind::ReleaseNotes));
    }
}
