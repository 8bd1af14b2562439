//! The composed row buffer for one paint, plus its diff against the
//! previous frame.

use crate::modal::Overlay;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorState {
    pub row: u16,
    pub col: u16,
    pub visible: bool,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            row: 0,
            col: 0,
            visible: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub rows: Vec<String>,
    pub cursor: CursorState,
}

impl Frame {
    pub fn blank(cols: u16, rows: u16) -> Self {
        Self {
            rows: vec![" ".repeat(cols as usize); rows as usize],
            cursor: CursorState::default(),
        }
    }

    /// Clips `overlay.rows` onto this frame's rows, replacing the
    /// characters within the overlay rectangle left-to-right.
    pub fn apply_overlay(&mut self, overlay: &Overlay) {
        for (line_idx, line) in overlay.rows.iter().enumerate() {
            let row_idx = overlay.top as usize + line_idx;
            let Some(row) = self.rows.get_mut(row_idx) else {
                continue;
            };
            let mut chars: Vec<char> = row.chars().collect();
            for (col_offset, ch) in line.chars().enumerate() {
                let col = overlay.left as usize + col_offset;
                if col < chars.len() {
                    chars[col] = ch;
                }
            }
            *row = chars.into_iter().collect();
        }
    }
}

/// Emits, for each row index whose content changed versus `previous`, the
/// ANSI sequence `move-to(i+1,1); erase-to-end-of-line; row text`.
/// Unchanged rows emit nothing; a frame identical to `previous` emits zero
/// bytes beyond the trailing cursor control.
pub fn diff(previous: Option<&Frame>, current: &Frame) -> String {
    let mut out = String::new();
    for (i, row) in current.rows.iter().enumerate() {
        let changed = match previous {
            Some(prev) => prev.rows.get(i) != Some(row),
            None => true,
        };
        if !changed {
            continue;
        }
        out.push_str(&format!("\x1b[{};1H\x1b[2K{}", i + 1, row));
    }

    if previous.map(|p| p.cursor) != Some(current.cursor) {
        out.push_str(&format!("\x1b[{};{}H", current.cursor.row + 1, current.cursor.col + 1));
        out.push_str(if current.cursor.visible { "\x1b[?25h" } else { "\x1b[?25l" });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_frames_emit_nothing() {
        let frame = Frame::blank(10, 3);
        let output = diff(Some(&frame), &frame);
        assert_eq!(output, "");
    }

    #[test]
    fn first_frame_emits_every_row() {
        let frame = Frame::blank(4, 2);
        let output = diff(None, &frame);
        assert!(output.contains("\x1b[1;1H"));
        assert!(output.contains("\x1b[2;1H"));
    }

    #[test]
    fn only_changed_rows_are_emitted() {
        let mut previous = Frame::blank(5, 2);
        previous.rows[0] = "hello".to_string();
        let mut current = previous.clone();
        current.rows[1] = "world".to_string();

        let output = diff(Some(&previous), &current);
        assert!(!output.contains("\x1b[1;1H"));
        assert!(output.contains("\x1b[2;1H"));
    }

    #[test]
    fn overlay_clips_into_the_row_buffer() {
        let mut frame = Frame::blank(10, 3);
        frame.apply_overlay(&Overlay {
            left: 2,
            top: 1,
            width: 3,
            height: 1,
            rows: vec!["abc".to_string()],
        });
        assert_eq!(&frame.rows[1][2..5], "abc");
    }
}
