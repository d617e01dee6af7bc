//! Raw key decoding: bytes → Key.
//!
//! A three-state machine. The primary read blocks forever; once ESC is
//! seen, the two continuation bytes share a single bounded deadline.
//! Anything unrecognized yields `None` and the caller reads again.
//! Ctrl-C interrupts in every state, including mid-sequence.

use std::io;
use std::time::{Duration, Instant};

use crate::terminal::{KeySource, CTRL_C};

use super::state::Key;

const ESC: u8 = 0x1b;

/// Decoder progress through a possible escape sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decode {
    /// Waiting for the first byte.
    Start,
    /// Saw ESC, expecting `[`.
    Escape { deadline: Instant },
    /// Saw `ESC [`, expecting the final byte.
    Bracket { deadline: Instant },
}

/// Map a single byte to a command. ESC is handled by the state machine.
pub fn classify_byte(byte: u8) -> Option<Key> {
    match byte {
        b'\r' | b'\n' => Some(Key::Enter),
        b' ' => Some(Key::Space),
        CTRL_C => Some(Key::Interrupt),
        _ => None,
    }
}

/// Map the final byte of `ESC [ x` to a command.
pub fn classify_csi(byte: u8) -> Option<Key> {
    match byte {
        b'A' => Some(Key::Up),
        b'B' => Some(Key::Down),
        _ => None,
    }
}

/// Read exactly one logical command, blocking until input arrives.
///
/// An empty read (end of input) counts as Enter.
pub fn read_key<K: KeySource>(keys: &mut K, escape_timeout: Duration) -> io::Result<Option<Key>> {
    let mut state = Decode::Start;
    loop {
        state = match state {
            Decode::Start => match keys.read_byte()? {
                None => return Ok(Some(Key::Enter)),
                Some(ESC) => Decode::Escape {
                    deadline: Instant::now() + escape_timeout,
                },
                Some(byte) => return Ok(classify_byte(byte)),
            },
            Decode::Escape { deadline } => match read_before(keys, deadline)? {
                Some(b'[') => Decode::Bracket { deadline },
                Some(CTRL_C) => return Ok(Some(Key::Interrupt)),
                Some(other) => {
                    // Second byte is consumed either way; the sequence is dead
                    let _ = read_before(keys, deadline)?;
                    tracing::trace!(byte = other, "discarding unknown escape sequence");
                    return Ok(None);
                }
                None => return Ok(None),
            },
            Decode::Bracket { deadline } => {
                return Ok(match read_before(keys, deadline)? {
                    Some(CTRL_C) => Some(Key::Interrupt),
                    other => other.and_then(classify_csi),
                });
            }
        };
    }
}

/// Timed read against an absolute deadline.
fn read_before<K: KeySource>(keys: &mut K, deadline: Instant) -> io::Result<Option<u8>> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    keys.read_byte_timeout(remaining)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::ScriptedKeys;

    const TIMEOUT: Duration = Duration::from_millis(100);

    fn decode(bytes: &[u8]) -> Option<Key> {
        let mut keys = ScriptedKeys::new(bytes);
        read_key(&mut keys, TIMEOUT).unwrap()
    }

    #[test]
    fn arrow_keys_decode_to_movement() {
        assert_eq!(decode(b"\x1b[A"), Some(Key::Up));
        assert_eq!(decode(b"\x1b[B"), Some(Key::Down));
    }

    #[test]
    fn space_decodes_to_space() {
        assert_eq!(decode(b" "), Some(Key::Space));
    }

    #[test]
    fn carriage_return_and_newline_decode_to_enter() {
        assert_eq!(decode(b"\r"), Some(Key::Enter));
        assert_eq!(decode(b"\n"), Some(Key::Enter));
    }

    #[test]
    fn empty_read_decodes_to_enter() {
        assert_eq!(decode(b""), Some(Key::Enter));
    }

    #[test]
    fn ctrl_c_decodes_to_interrupt() {
        assert_eq!(decode(&[0x03]), Some(Key::Interrupt));
    }

    #[test]
    fn ordinary_characters_are_ignored() {
        assert_eq!(decode(b"q"), None);
        assert_eq!(decode(b"j"), None);
        assert_eq!(decode(&[0x7f]), None);
    }

    #[test]
    fn other_csi_sequences_are_ignored() {
        // Right and left arrows
        assert_eq!(decode(b"\x1b[C"), None);
        assert_eq!(decode(b"\x1b[D"), None);
    }

    #[test]
    fn bare_escape_times_out_to_nothing() {
        let mut keys = ScriptedKeys::new(b"\x1b").pause().then(b" ");
        assert_eq!(read_key(&mut keys, TIMEOUT).unwrap(), None);
        // The byte after the pause belongs to the next read
        assert_eq!(read_key(&mut keys, TIMEOUT).unwrap(), Some(Key::Space));
    }

    #[test]
    fn escape_bracket_then_timeout_is_nothing() {
        let mut keys = ScriptedKeys::new(b"\x1b[").pause().then(b"A");
        assert_eq!(read_key(&mut keys, TIMEOUT).unwrap(), None);
        assert_eq!(read_key(&mut keys, TIMEOUT).unwrap(), None);
    }

    #[test]
    fn escape_followed_by_non_bracket_swallows_two_bytes() {
        let mut keys = ScriptedKeys::new(b"\x1bOA ");
        assert_eq!(read_key(&mut keys, TIMEOUT).unwrap(), None);
        assert_eq!(read_key(&mut keys, TIMEOUT).unwrap(), Some(Key::Space));
    }

    #[test]
    fn ctrl_c_inside_an_escape_sequence_still_interrupts() {
        assert_eq!(decode(b"\x1b\x03"), Some(Key::Interrupt));
        assert_eq!(decode(b"\x1b[\x03"), Some(Key::Interrupt));
    }

    #[test]
    fn consecutive_reads_decode_in_order() {
        let mut keys = ScriptedKeys::new(b"\x1b[B \x1b[A\r");
        let decoded: Vec<_> = (0..4)
            .map(|_| read_key(&mut keys, TIMEOUT).unwrap())
            .collect();
        assert_eq!(
            decoded,
            vec![Some(Key::Down), Some(Key::Space), Some(Key::Up), Some(Key::Enter)]
        );
    }
}
