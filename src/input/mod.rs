//! Input decoding and routing.
//!
//! Byte chunks from the TTY are decoded in two passes: [`decoder::decode_chunk`]
//! splits out SGR mouse sequences (carrying an incomplete trailing prefix as
//! `remainder`), then [`keystroke::decode_all`] decodes the remaining
//! passthrough text into individual keystrokes.

pub mod decoder;
pub mod keystroke;
pub mod mouse;

pub use decoder::{decode_chunk, Token};
pub use keystroke::{decode_all as decode_keystrokes, Key, Keystroke};
pub use mouse::{interpret as interpret_mouse, MouseEvent, MouseKind, MouseToken};

/// Decoder state threaded across chunk reads, carrying the remainder per the
/// Owns no I/O; purely a parsing accumulator.
#[derive(Debug, Default, Clone)]
pub struct InputDecoder {
    remainder: String,
}

/// A fully decoded input event ready for routing.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEvent {
    Key(Keystroke),
    Mouse(MouseEvent),
}

impl InputDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of raw TTY bytes, returning ordered decoded events.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<DecodedEvent> {
        let (tokens, remainder) = decoder::decode_chunk(&self.remainder, chunk);
        self.remainder = remainder;

        let mut events = vec![];
        for token in tokens {
            match token {
                Token::Passthrough(text) => {
                    for stroke in keystroke::decode_all(text.as_bytes()) {
                        events.push(DecodedEvent::Key(stroke));
                    }
                }
                Token::Mouse(mouse_token) => {
                    events.push(DecodedEvent::Mouse(mouse::interpret(&mouse_token)));
                }
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_interleaves_keys_and_mouse_in_order() {
        let mut decoder = InputDecoder::new();
        let events = decoder.feed(b"a\x1b[<0;1;1Mb");
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], DecodedEvent::Key(_)));
        assert!(matches!(events[1], DecodedEvent::Mouse(_)));
        assert!(matches!(events[2], DecodedEvent::Key(_)));
    }

    #[test]
    fn feed_carries_remainder_across_calls() {
        let mut decoder = InputDecoder::new();
        let first = decoder.feed(b"\x1b[<0;5");
        assert!(first.is_empty());
        let second = decoder.feed(b";3M");
        assert_eq!(second.len(), 1);
        assert!(matches!(second[0], DecodedEvent::Mouse(_)));
    }
}
