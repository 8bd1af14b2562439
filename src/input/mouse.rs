//! SGR mouse event semantics.

/// A raw decoded SGR mouse sequence, prior to semantic interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MouseToken {
    pub code: i64,
    pub col: i64,
    pub row: i64,
    pub final_byte: char,
    /// The raw sequence text, kept for render-trace / debugging purposes.
    pub sequence: String,
}

/// Wheel scroll direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelDirection {
    Up,
    Down,
}

/// Semantically decoded mouse event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseKind {
    Press { button: u8 },
    Release { button: u8 },
    Motion { button: u8 },
    Wheel { direction: WheelDirection },
}

/// Modifier flags per the SGR convention: `shift=0b0100, alt=0b1000, meta=0b1000_0000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseModifiers {
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

/// The number of rows a single wheel tick scrolls.
pub const WHEEL_SCROLL_STEP: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub kind: MouseKind,
    pub col: i64,
    pub row: i64,
    pub modifiers: MouseModifiers,
    pub is_release: bool,
}

/// Interpret a raw [`MouseToken`] into a semantic [`MouseEvent`].
pub fn interpret(token: &MouseToken) -> MouseEvent {
    let code = token.code;
    let modifiers = MouseModifiers {
        shift: code & 0b0000_0100 != 0,
        alt: code & 0b0000_1000 != 0,
        meta: code & 0b1000_0000 != 0,
    };
    let is_release = token.final_byte == 'm';

    let kind = if code & 0b0100_0000 != 0 {
        let direction = if code & 0b0000_0001 == 0 {
            WheelDirection::Up
        } else {
            WheelDirection::Down
        };
        MouseKind::Wheel { direction }
    } else {
        let button = (code & 0b0000_0011) as u8;
        if code & 0b0010_0000 != 0 {
            MouseKind::Motion { button }
        } else if is_release {
            MouseKind::Release { button }
        } else {
            MouseKind::Press { button }
        }
    };

    MouseEvent {
        kind,
        col: token.col,
        row: token.row,
        modifiers,
        is_release,
    }
}

impl MouseEvent {
    /// A non-wheel, non-motion button press — the class of event that
    /// participates in modal outside-click dismissal and pane focus
    /// routing.
    pub fn is_plain_press(&self) -> bool {
        matches!(self.kind, MouseKind::Press { .. })
    }

    /// Motion reports with the wheel bit unset. By decision,
    /// these are dropped when not in the alt-screen / shell-forwarding path —
    /// current behavior is preserved rather than guessed.
    pub fn is_plain_motion(&self) -> bool {
        matches!(self.kind, MouseKind::Motion { .. })
    }
}
