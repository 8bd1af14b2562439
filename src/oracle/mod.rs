//! Per-conversation terminal snapshot model.
//!
//! Wraps a `vt100::Parser` the way the session manager in the reference
//! PTY-hosting tool does, but here the bytes arrive over the network as
//! `pty.output` envelopes rather than from a locally-owned PTY reader
//! thread, and the resulting cell grid feeds a row-diffed ANSI renderer
//! instead of a retained-mode widget tree.

use serde::{Deserialize, Serialize};

pub const DEFAULT_SCROLLBACK_LINES: usize = 10000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum ColorKind {
    #[default]
    Default,
    Indexed(u8),
    Rgb(u8, u8, u8),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TermColor {
    pub kind: ColorKind,
}

impl TermColor {
    pub fn from_vt100(color: vt100::Color) -> Self {
        let kind = match color {
            vt100::Color::Default => ColorKind::Default,
            vt100::Color::Idx(idx) => ColorKind::Indexed(idx),
            vt100::Color::Rgb(r, g, b) => ColorKind::Rgb(r, g, b),
        };
        Self { kind }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CellAttrs {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub inverse: bool,
}

impl CellAttrs {
    pub fn from_vt100_cell(cell: &vt100::Cell) -> Self {
        Self {
            bold: cell.bold(),
            italic: cell.italic(),
            underline: cell.underline(),
            inverse: cell.inverse(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TerminalCell {
    pub contents: String,
    pub fg: TermColor,
    pub bg: TermColor,
    pub attrs: CellAttrs,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TerminalRow {
    pub cells: Vec<TerminalCell>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TerminalSnapshot {
    pub rows: Vec<TerminalRow>,
    pub cursor: (u16, u16),
    pub cursor_visible: bool,
}

/// Ingests raw PTY output bytes for one conversation and exposes the
/// current cell grid on demand. The parser itself owns scrollback, so a
/// snapshot only ever reflects the live screen; scrollback is read through
/// [`Oracle::scrollback_row`].
pub struct Oracle {
    parser: vt100::Parser,
}

impl Oracle {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            parser: vt100::Parser::new(rows, cols, DEFAULT_SCROLLBACK_LINES),
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.parser.process(bytes);
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.parser.set_size(rows, cols);
    }

    pub fn size(&self) -> (u16, u16) {
        let (rows, cols) = self.parser.screen().size();
        (cols, rows)
    }

    pub fn snapshot(&self) -> TerminalSnapshot {
        let screen = self.parser.screen();
        let (rows, cols) = screen.size();
        let mut out_rows = Vec::with_capacity(rows as usize);
        for row_idx in 0..rows {
            let mut cells = Vec::with_capacity(cols as usize);
            for col_idx in 0..cols {
                let Some(cell) = screen.cell(row_idx, col_idx) else {
                    continue;
                };
                cells.push(TerminalCell {
                    contents: cell.contents(),
                    fg: TermColor::from_vt100(cell.fgcolor()),
                    bg: TermColor::from_vt100(cell.bgcolor()),
                    attrs: CellAttrs::from_vt100_cell(cell),
                });
            }
            out_rows.push(TerminalRow { cells });
        }
        let cursor = screen.cursor_position();
        TerminalSnapshot {
            rows: out_rows,
            cursor,
            cursor_visible: !screen.hide_cursor(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feeding_plain_text_populates_first_row() {
        let mut oracle = Oracle::new(10, 3);
        oracle.feed(b"hi");
        let snapshot = oracle.snapshot();
        let text: String = snapshot.rows[0]
            .cells
            .iter()
            .take(2)
            .map(|c| c.contents.clone())
            .collect();
        assert_eq!(text, "hi");
    }

    #[test]
    fn resize_changes_reported_size() {
        let mut oracle = Oracle::new(10, 3);
        oracle.resize(20, 6);
        assert_eq!(oracle.size(), (20, 6));
    }

    #[test]
    fn cursor_advances_after_feed() {
        let mut oracle = Oracle::new(10, 3);
        oracle.feed(b"ab");
        let snapshot = oracle.snapshot();
        assert_eq!(snapshot.cursor, (0, 2));
    }
}
