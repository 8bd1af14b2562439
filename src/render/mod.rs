//! Composes the row buffer for one paint and diffs it against the
//! previous frame.

pub mod frame;
pub mod recorder;

use crate::layout::PaneLayout;
use crate::modal::ModalManager;
use crate::oracle::Oracle;
use crate::workspace::conversation::SessionId;
use crate::workspace::Workspace;
use frame::{CursorState, Frame};

/// Scans emitted ANSI for sequences outside the terminal protocol this
/// renderer emits; surfaces issues without interrupting the paint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityIssue {
    pub description: String,
}

fn validate_integrity(ansi: &str) -> Vec<IntegrityIssue> {
    let mut issues = Vec::new();
    let bytes = ansi.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == 0x1b && bytes.get(i + 1) != Some(&b'[') {
            issues.push(IntegrityIssue {
                description: format!("unexpected escape introducer at byte {i}"),
            });
        }
        i += 1;
    }
    issues
}

pub struct Renderer {
    previous: Option<Frame>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self { previous: None }
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidates the cached frame so the next render rebuilds from
    /// scratch (used after a resize, per cursor-pinning-across-resizes).
    pub fn invalidate(&mut self) {
        self.previous = None;
    }

    fn render_left_rail(&self, workspace: &Workspace, layout: &PaneLayout) -> Vec<String> {
        let mut rows = Vec::with_capacity(layout.pane_rows as usize);
        rows.push(pad("Directories", layout.left_cols));
        for directory in workspace.projection.directories.iter() {
            rows.push(pad(&format!("  {}", directory.path), layout.left_cols));
        }
        rows.push(pad("Threads", layout.left_cols));
        for session_id in workspace.projection.conversations.ordered_ids() {
            if let Some(conversation) = workspace.projection.conversations.get(session_id) {
                let label = conversation.title.clone().unwrap_or_else(|| session_id.clone());
                let marker = if Some(session_id) == workspace.active_conversation_id.as_ref() {
                    "> "
                } else {
                    "  "
                };
                rows.push(pad(&format!("{marker}{label}"), layout.left_cols));
            }
        }
        while rows.len() < layout.pane_rows as usize {
            rows.push(" ".repeat(layout.left_cols as usize));
        }
        rows.truncate(layout.pane_rows as usize);
        rows
    }

    fn render_right_pane(&self, oracle: Option<&Oracle>, layout: &PaneLayout) -> Vec<String> {
        let mut rows = Vec::with_capacity(layout.pane_rows as usize);
        if let Some(oracle) = oracle {
            let snapshot = oracle.snapshot();
            for row in snapshot.rows.iter().take(layout.pane_rows as usize) {
                let text: String = row.cells.iter().map(|c| c.contents.clone()).collect();
                rows.push(pad(&text, layout.right_cols));
            }
        }
        while rows.len() < layout.pane_rows as usize {
            rows.push(" ".repeat(layout.right_cols as usize));
        }
        rows.truncate(layout.pane_rows as usize);
        rows
    }

    fn render_status_row(&self, workspace: &Workspace, layout: &PaneLayout, output_load_bytes: usize) -> String {
        let debug = if workspace.panes.show_debug_bar {
            format!(" | load={output_load_bytes}B")
        } else {
            String::new()
        };
        pad(&format!(" harness-mux{debug}"), layout.cols)
    }

    /// Builds the composed frame for one paint: left rail + right pane +
    /// status row, then at most one modal overlay, then an optional
    /// selection overlay.
    pub fn build(
        &self,
        workspace: &Workspace,
        modal_manager: &ModalManager,
        active_oracle: Option<&Oracle>,
        cols: u16,
        rows: u16,
        output_load_bytes: usize,
    ) -> Frame {
        let layout = PaneLayout::compute(cols, rows);
        let mut out_rows = Vec::with_capacity(rows as usize);

        let left_rows = self.render_left_rail(workspace, &layout);
        let right_rows = self.render_right_pane(active_oracle, &layout);
        for i in 0..layout.pane_rows as usize {
            let sep = "|";
            out_rows.push(format!(
                "{}{}{}",
                left_rows.get(i).cloned().unwrap_or_default(),
                sep,
                right_rows.get(i).cloned().unwrap_or_default()
            ));
        }
        out_rows.push(self.render_status_row(workspace, &layout, output_load_bytes));

        let mut frame = Frame {
            rows: out_rows,
            cursor: CursorState::default(),
        };

        if let Some(overlay) = modal_manager.build_current_overlay(cols, layout.pane_rows) {
            frame.apply_overlay(&overlay);
        }

        if let Some(selection) = &workspace.selection {
            apply_selection_overlay(&mut frame, selection, &layout);
        }

        frame
    }

    /// Diffs `frame` against the previously built one and returns the
    /// emitted ANSI, running it through the integrity validator first.
    pub fn diff_and_advance(&mut self, frame: Frame) -> (String, Vec<IntegrityIssue>) {
        let ansi = frame::diff(self.previous.as_ref(), &frame);
        let issues = validate_integrity(&ansi);
        self.previous = Some(frame);
        (ansi, issues)
    }
}

fn pad(text: &str, width: u16) -> String {
    let width = width as usize;
    let mut s: String = text.chars().take(width).collect();
    while s.chars().count() < width {
        s.push(' ');
    }
    s
}

/// Applies reverse-video (represented here as surrounding the selected
/// span with inverse SGR codes) to rows between the selection anchor and
/// focus, for the visible viewport only.
fn apply_selection_overlay(frame: &mut Frame, selection: &crate::workspace::Selection, layout: &PaneLayout) {
    let (start_row, end_row) = if selection.anchor.row <= selection.focus.row {
        (selection.anchor.row, selection.focus.row)
    } else {
        (selection.focus.row, selection.anchor.row)
    };
    for row_idx in start_row..=end_row {
        if row_idx as usize >= frame.rows.len() || row_idx >= layout.pane_rows {
            continue;
        }
        let row = &frame.rows[row_idx as usize];
        frame.rows[row_idx as usize] = format!("\x1b[7m{row}\x1b[27m");
    }
}

pub fn active_session_for_oracle<'a>(workspace: &'a Workspace) -> Option<&'a SessionId> {
    workspace.active_conversation_id.as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_changes_between_builds_emits_zero_bytes() {
        let workspace = Workspace::new();
        let modal_manager = ModalManager::new();
        let mut renderer = Renderer::new();

        let frame1 = renderer.build(&workspace, &modal_manager, None, 40, 10, 0);
        let (first_ansi, _) = renderer.diff_and_advance(frame1);
        assert!(!first_ansi.is_empty());

        let frame2 = renderer.build(&workspace, &modal_manager, None, 40, 10, 0);
        let (second_ansi, _) = renderer.diff_and_advance(frame2);
        assert_eq!(second_ansi, "");
    }

    #[test]
    fn invalidate_forces_full_repaint() {
        let workspace = Workspace::new();
        let modal_manager = ModalManager::new();
        let mut renderer = Renderer::new();

        let frame1 = renderer.build(&workspace, &modal_manager, None, 40, 10, 0);
        renderer.diff_and_advance(frame1);
        renderer.invalidate();

        let frame2 = renderer.build(&workspace, &modal_manager, None, 40, 10, 0);
        let (ansi, _) = renderer.diff_and_advance(frame2);
        assert!(!ansi.is_empty());
    }
}
