//! Keystroke decoding: legacy control bytes, `ESC`-prefixed ALT sequences,
//! Kitty keyboard protocol (`CSI code;mods u`) and modifyOtherKeys
//! (`CSI 27;mods;code~`), plus legacy cursor-key sequences needed so the
//! shortcut binding vocabulary (arrows/home/end/page) in [`crate::shortcuts`]
//! has something to match against.

use std::fmt;

/// A decoded key, independent of the wire protocol that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    Escape,
    Space,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Delete,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{c}"),
            Key::Enter => write!(f, "enter"),
            Key::Tab => write!(f, "tab"),
            Key::Escape => write!(f, "escape"),
            Key::Space => write!(f, "space"),
            Key::Backspace => write!(f, "backspace"),
            Key::Up => write!(f, "up"),
            Key::Down => write!(f, "down"),
            Key::Left => write!(f, "left"),
            Key::Right => write!(f, "right"),
            Key::Home => write!(f, "home"),
            Key::End => write!(f, "end"),
            Key::PageUp => write!(f, "pageup"),
            Key::PageDown => write!(f, "pagedown"),
            Key::Delete => write!(f, "delete"),
        }
    }
}

/// A fully decoded keystroke with modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keystroke {
    pub key: Key,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Keystroke {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            alt: false,
            shift: false,
            meta: false,
        }
    }

    fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }
}

/// Decode modifier bits per the Kitty/modifyOtherKeys convention:
/// `(mods - 1)` as bitflags `{shift=1, alt=2, ctrl=4, meta=8}`.
fn decode_mods(mods: u32) -> (bool, bool, bool, bool) {
    let bits = mods.saturating_sub(1);
    (
        bits & 0b0001 != 0, // shift
        bits & 0b0010 != 0, // alt
        bits & 0b0100 != 0, // ctrl
        bits & 0b1000 != 0, // meta
    )
}

/// Map a Kitty/modifyOtherKeys decimal key code to a [`Key`].
fn key_from_code(code: u32) -> Option<Key> {
    match code {
        13 => Some(Key::Enter),
        9 => Some(Key::Tab),
        27 => Some(Key::Escape),
        32 => Some(Key::Space),
        33..=126 => char::from_u32(code).map(|c| Key::Char(c.to_ascii_lowercase())),
        _ => None,
    }
}

/// Decode a single control byte per legacy ASCII control conventions.
fn decode_control_byte(byte: u8) -> Option<Keystroke> {
    match byte {
        0x1B => Some(Keystroke::plain(Key::Escape)),
        b'\r' => Some(Keystroke::plain(Key::Enter)),
        b'\t' => Some(Keystroke::plain(Key::Tab)),
        b' ' => Some(Keystroke::plain(Key::Space)),
        0x7F => Some(Keystroke::plain(Key::Backspace)),
        0x01..=0x1A => {
            let c = (b'a' + (byte - 0x01)) as char;
            Some(Keystroke::plain(Key::Char(c)).with_ctrl())
        }
        0x1C => Some(Keystroke::plain(Key::Char('\\')).with_ctrl()),
        0x1D => Some(Keystroke::plain(Key::Char(']')).with_ctrl()),
        0x1E => Some(Keystroke::plain(Key::Char('^')).with_ctrl()),
        0x1F => Some(Keystroke::plain(Key::Char('_')).with_ctrl()),
        0x20..=0x7E => {
            let c = byte as char;
            if c.is_ascii_uppercase() {
                Some(Keystroke::plain(Key::Char(c.to_ascii_lowercase())).with_shift())
            } else {
                Some(Keystroke::plain(Key::Char(c)))
            }
        }
        _ => None,
    }
}

/// Decode one keystroke starting at `buf[0]`. Returns the keystroke and the
/// number of bytes consumed, or `None` if the prefix is not (yet) a
/// recognized sequence — callers degrade to passthrough on "failure
/// modes".
pub fn decode_one(buf: &[u8]) -> Option<(Keystroke, usize)> {
    if buf.is_empty() {
        return None;
    }

    if buf[0] != 0x1B {
        return decode_control_byte(buf[0]).map(|k| (k, 1));
    }

    // Lone ESC.
    if buf.len() == 1 {
        return Some((Keystroke::plain(Key::Escape), 1));
    }

    // ESC <byte> where <byte> is a control-set byte: alt-prefixed inner stroke.
    if buf.len() >= 2 && buf[1] != b'[' && buf[1] != b'O' {
        if let Some(inner) = decode_control_byte(buf[1]) {
            return Some((inner.with_alt(), 2));
        }
        return None;
    }

    // Legacy cursor/navigation keys: CSI <letter> or SS3 <letter>.
    if buf.len() >= 3 && (buf[1] == b'[' || buf[1] == b'O') {
        if let Some(key) = match buf[2] {
            b'A' => Some(Key::Up),
            b'B' => Some(Key::Down),
            b'C' => Some(Key::Right),
            b'D' => Some(Key::Left),
            b'H' => Some(Key::Home),
            b'F' => Some(Key::End),
            _ => None,
        } {
            return Some((Keystroke::plain(key), 3));
        }
    }

    // CSI sequences: scan for a terminator among {u, ~} while gathering
    // numeric fields separated by `;`.
    if buf.len() >= 3 && buf[1] == b'[' {
        let mut i = 2usize;
        let mut fields: Vec<u32> = vec![];
        let mut current = String::new();
        while i < buf.len() {
            let b = buf[i];
            if b.is_ascii_digit() {
                current.push(b as char);
                i += 1;
            } else if b == b';' {
                fields.push(current.parse().unwrap_or(0));
                current.clear();
                i += 1;
            } else {
                break;
            }
        }
        if i >= buf.len() {
            return None; // incomplete
        }
        if !current.is_empty() {
            fields.push(current.parse().unwrap_or(0));
        }
        let terminator = buf[i];
        let consumed = i + 1;

        match terminator {
            b'u' => {
                // Kitty keyboard protocol: CSI code[;mods] u
                let code = *fields.first()?;
                let mods = fields.get(1).copied().unwrap_or(1);
                let key = key_from_code(code)?;
                let (shift, alt, ctrl, meta) = decode_mods(mods);
                return Some((
                    Keystroke {
                        key,
                        ctrl,
                        alt,
                        shift,
                        meta,
                    },
                    consumed,
                ));
            }
            b'~' => {
                // modifyOtherKeys: CSI 27;mods;code ~  (also legacy nav: CSI 3~, 5~, 6~)
                if fields.len() >= 3 && fields[0] == 27 {
                    let mods = fields[1];
                    let code = fields[2];
                    let key = key_from_code(code)?;
                    let (shift, alt, ctrl, meta) = decode_mods(mods);
                    return Some((
                        Keystroke {
                            key,
                            ctrl,
                            alt,
                            shift,
                            meta,
                        },
                        consumed,
                    ));
                }
                if let Some(&code) = fields.first() {
                    let key = match code {
                        3 => Some(Key::Delete),
                        5 => Some(Key::PageUp),
                        6 => Some(Key::PageDown),
                        _ => None,
                    }?;
                    return Some((Keystroke::plain(key), consumed));
                }
                None
            }
            _ => None,
        }
    } else {
        None
    }
}

/// Decode as many keystrokes as possible out of a buffer, dropping any
/// unrecognized trailing bytes (the caller already routed this buffer as
/// passthrough text, so any remainder here is simply not forwarded as a
/// keystroke — the bytes themselves are still in the original passthrough
/// text for downstream PTY forwarding).
pub fn decode_all(buf: &[u8]) -> Vec<Keystroke> {
    let mut out = vec![];
    let mut offset = 0;
    while offset < buf.len() {
        match decode_one(&buf[offset..]) {
            Some((stroke, consumed)) => {
                out.push(stroke);
                offset += consumed.max(1);
            }
            None => break,
        }
    }
    out
}

/// Reproduce legacy bytes for forwarding a decoded keystroke to a child PTY
/// (forwarding normalization). Shift+Enter is intentionally never
/// collapsed to a bare `CR` — it is preserved as its own protocol sequence.
pub fn to_legacy_bytes(stroke: &Keystroke) -> Vec<u8> {
    if stroke.key == Key::Enter && stroke.shift {
        return b"\x1b[13;2u".to_vec();
    }

    let mut bytes = match stroke.key {
        Key::Char(c) if stroke.ctrl => {
            match c {
                'a'..='z' => vec![(c as u8) - b'a' + 1],
                '\\' => vec![0x1C],
                ']' => vec![0x1D],
                '^' => vec![0x1E],
                '_' => vec![0x1F],
                _ => vec![c as u8],
            }
        }
        Key::Char(c) if stroke.shift => vec![c.to_ascii_uppercase() as u8],
        Key::Char(c) => vec![c as u8],
        Key::Enter => vec![b'\r'],
        Key::Tab => vec![b'\t'],
        Key::Escape => vec![0x1B],
        Key::Space => vec![b' '],
        Key::Backspace => vec![0x7F],
        Key::Up => b"\x1b[A".to_vec(),
        Key::Down => b"\x1b[B".to_vec(),
        Key::Left => b"\x1b[D".to_vec(),
        Key::Right => b"\x1b[C".to_vec(),
        Key::Home => b"\x1b[H".to_vec(),
        Key::End => b"\x1b[F".to_vec(),
        Key::PageUp => b"\x1b[5~".to_vec(),
        Key::PageDown => b"\x1b[6~".to_vec(),
        Key::Delete => b"\x1b[3~".to_vec(),
    };

    if stroke.alt {
        let mut prefixed = vec![0x1B];
        prefixed.append(&mut bytes);
        return prefixed;
    }

    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctrl_letters_decode_from_control_bytes() {
        for (byte, c) in (0x01u8..=0x1A).zip('a'..='z') {
            let (stroke, consumed) = decode_one(&[byte]).unwrap();
            assert_eq!(consumed, 1);
            assert_eq!(stroke.key, Key::Char(c));
            assert!(stroke.ctrl);
        }
    }

    #[test]
    fn ctrl_bracket_family_decodes() {
        assert_eq!(decode_one(&[0x1C]).unwrap().0.key, Key::Char('\\'));
        assert_eq!(decode_one(&[0x1D]).unwrap().0.key, Key::Char(']'));
        assert_eq!(decode_one(&[0x1E]).unwrap().0.key, Key::Char('^'));
        assert_eq!(decode_one(&[0x1F]).unwrap().0.key, Key::Char('_'));
    }

    #[test]
    fn uppercase_ascii_sets_shift() {
        let (stroke, _) = decode_one(b"A").unwrap();
        assert_eq!(stroke.key, Key::Char('a'));
        assert!(stroke.shift);
    }

    #[test]
    fn alt_prefixed_control_byte_sets_alt() {
        let (stroke, consumed) = decode_one(&[0x1B, 0x01]).unwrap();
        assert_eq!(consumed, 2);
        assert_eq!(stroke.key, Key::Char('a'));
        assert!(stroke.ctrl);
        assert!(stroke.alt);
    }

    #[test]
    fn kitty_keyboard_protocol_decodes_modifiers() {
        // CSI 99;7u = 'c' (code 99) with ctrl(4)+alt(2) -> mods=7 => bits=6
        let (stroke, consumed) = decode_one(b"\x1b[99;7u").unwrap();
        assert_eq!(consumed, 8);
        assert_eq!(stroke.key, Key::Char('c'));
        assert!(stroke.ctrl);
        assert!(stroke.alt);
        assert!(!stroke.shift);
    }

    #[test]
    fn modify_other_keys_decodes() {
        // CSI 27;5;99~ = ctrl-c (mods=5 -> bits=4 -> ctrl)
        let (stroke, _) = decode_one(b"\x1b[27;5;99~").unwrap();
        assert_eq!(stroke.key, Key::Char('c'));
        assert!(stroke.ctrl);
    }

    #[test]
    fn legacy_arrow_sequences_decode() {
        assert_eq!(decode_one(b"\x1b[A").unwrap().0.key, Key::Up);
        assert_eq!(decode_one(b"\x1b[B").unwrap().0.key, Key::Down);
        assert_eq!(decode_one(b"\x1b[C").unwrap().0.key, Key::Right);
        assert_eq!(decode_one(b"\x1b[D").unwrap().0.key, Key::Left);
    }

    #[test]
    fn round_trip_identity_on_supported_domain() {
        let strokes = vec![
            Keystroke::plain(Key::Char('a')),
            Keystroke::plain(Key::Char('a')).with_ctrl(),
            Keystroke::plain(Key::Enter),
            Keystroke::plain(Key::Up),
            Keystroke::plain(Key::Tab).with_alt(),
        ];
        for stroke in strokes {
            let bytes = to_legacy_bytes(&stroke);
            let (decoded, consumed) = decode_one(&bytes).unwrap();
            assert_eq!(consumed, bytes.len());
            assert_eq!(decoded.key, stroke.key);
            assert_eq!(decoded.ctrl, stroke.ctrl);
            assert_eq!(decoded.alt, stroke.alt);
        }
    }

    #[test]
    fn shift_enter_is_never_collapsed_to_bare_cr() {
        let stroke = Keystroke::plain(Key::Enter).with_shift();
        let bytes = to_legacy_bytes(&stroke);
        assert_ne!(bytes, vec![b'\r']);
    }
}
