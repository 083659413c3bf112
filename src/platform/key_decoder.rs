//! Byte-stream to key-event decoding with an escape disambiguation window.
//!
//! A terminal sends a lone Escape keypress as the single byte `0x1b`, and sends keys such as
//! the arrows as `0x1b` followed by a short suffix, usually in one write. Without a terminal
//! capability database the only way to tell them apart is timing: after an escape byte the
//! decoder keeps collecting bytes until the sequence is resolved or the window elapses.
//!
//! The window trades latency for robustness. Every lone Escape is delayed by the full window,
//! while a window shorter than the link's jitter splits real sequences (over slow SSH links
//! for instance). 50 ms is long enough for local and typical remote terminals and short
//! enough not to be felt.

use std::time::{Duration, Instant};

use crate::core::input::{match_escape_suffix, Key, SuffixMatch, DEL, ESC};
use crate::core::input_event::KeyEvent;

/// Default escape disambiguation window.
pub const DEFAULT_ESCAPE_TIMEOUT: Duration = Duration::from_millis(50);

/// Incremental decoder from raw bytes to [`KeyEvent`]s.
///
/// Every input byte ends up in the `raw` field of exactly one emitted event, in input order.
#[derive(Debug)]
pub struct KeyDecoder {
    /// Unresolved bytes: an escape sequence or a partial UTF-8 rune.
    pending: Vec<u8>,
    timeout: Duration,
    flush_deadline: Option<Instant>,
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_ESCAPE_TIMEOUT)
    }
}

impl KeyDecoder {
    pub fn new(timeout: Duration) -> Self {
        Self {
            pending: Vec::new(),
            timeout,
            flush_deadline: None,
        }
    }

    /// Bytes waiting for more input or for the window to elapse.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Decode `data`, which arrived at `now`.
    ///
    /// Resolved events are returned immediately; unresolved bytes stay pending until
    /// [`KeyDecoder::flush_due`] is called past the deadline.
    pub fn process(&mut self, data: &[u8], now: Instant) -> Vec<KeyEvent> {
        let mut events = Vec::new();
        for &byte in data {
            self.push_byte(byte, now, &mut events);
        }
        events
    }

    /// Flush pending bytes as literal events if the window has elapsed at `now`.
    pub fn flush_due(&mut self, now: Instant) -> Vec<KeyEvent> {
        match self.flush_deadline {
            Some(deadline) if now >= deadline => self.flush(),
            _ => Vec::new(),
        }
    }

    /// Flush pending bytes as literal events regardless of the deadline.
    pub fn flush(&mut self) -> Vec<KeyEvent> {
        self.flush_deadline = None;
        let pending = std::mem::take(&mut self.pending);
        let mut events = Vec::new();
        match pending.first() {
            None => {}
            Some(&ESC) => {
                events.push(KeyEvent::new(Key::Escape, [ESC]));
                events.extend(pending[1..].iter().map(|&byte| literal_event(byte)));
            }
            Some(_) => {
                events.extend(pending.iter().map(|&byte| invalid_rune(byte)));
            }
        }
        events
    }

    /// Milliseconds until the pending deadline, capped at `default_ms`.
    pub fn next_timeout_ms(&self, now: Instant, default_ms: i32) -> i32 {
        if let Some(deadline) = self.flush_deadline {
            let remaining = deadline.saturating_duration_since(now);
            let ms = remaining.as_millis().min(i32::MAX as u128) as i32;
            return ms.min(default_ms).max(0);
        }
        default_ms
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.flush_deadline = None;
    }

    fn push_byte(&mut self, byte: u8, now: Instant, events: &mut Vec<KeyEvent>) {
        match self.pending.first() {
            None => self.start_token(byte, now, events),
            Some(&ESC) => self.extend_escape(byte, now, events),
            Some(&lead) => self.extend_rune(lead, byte, now, events),
        }
    }

    fn start_token(&mut self, byte: u8, now: Instant, events: &mut Vec<KeyEvent>) {
        if byte == ESC {
            self.pending.push(byte);
            // Armed once per sequence; later bytes do not extend it.
            self.flush_deadline = Some(now + self.timeout);
            return;
        }
        if byte.is_ascii() {
            events.push(literal_event(byte));
            return;
        }
        if utf8_len(byte).is_some() {
            self.pending.push(byte);
            self.flush_deadline = Some(now + self.timeout);
            return;
        }
        events.push(invalid_rune(byte));
    }

    fn extend_escape(&mut self, byte: u8, now: Instant, events: &mut Vec<KeyEvent>) {
        self.pending.push(byte);
        match match_escape_suffix(&self.pending[1..]) {
            SuffixMatch::Key(key) => {
                self.flush_deadline = None;
                let raw = std::mem::take(&mut self.pending);
                events.push(KeyEvent::new(key, raw));
            }
            SuffixMatch::Partial => {}
            SuffixMatch::Unknown => {
                self.flush_deadline = None;
                let collected = std::mem::take(&mut self.pending);
                events.push(KeyEvent::new(Key::Escape, [ESC]));
                // The rest is decoded as ordinary input, so a second escape byte starts a
                // new sequence.
                for &rest in &collected[1..] {
                    self.push_byte(rest, now, events);
                }
            }
        }
    }

    fn extend_rune(&mut self, lead: u8, byte: u8, now: Instant, events: &mut Vec<KeyEvent>) {
        if !is_continuation(byte) {
            let truncated = std::mem::take(&mut self.pending);
            self.flush_deadline = None;
            events.extend(truncated.iter().map(|&b| invalid_rune(b)));
            self.start_token(byte, now, events);
            return;
        }

        self.pending.push(byte);
        let expected = utf8_len(lead).unwrap_or(1);
        if self.pending.len() < expected {
            return;
        }

        self.flush_deadline = None;
        let raw = std::mem::take(&mut self.pending);
        match std::str::from_utf8(&raw).ok().and_then(|s| s.chars().next()) {
            Some(ch) => events.push(KeyEvent::new(Key::Char(ch), raw)),
            // Overlong encodings and surrogates pass the length check but are not valid.
            None => events.extend(raw.iter().map(|&b| invalid_rune(b))),
        }
    }
}

fn literal_event(byte: u8) -> KeyEvent {
    if byte == ESC {
        return KeyEvent::new(Key::Escape, [byte]);
    }
    if byte < ESC || byte == DEL {
        if let Some(key) = Key::from_control_byte(byte) {
            return KeyEvent::new(key, [byte]);
        }
    }
    if byte.is_ascii() {
        return KeyEvent::new(Key::Char(byte as char), [byte]);
    }
    invalid_rune(byte)
}

fn invalid_rune(byte: u8) -> KeyEvent {
    KeyEvent::new(Key::Char(char::REPLACEMENT_CHARACTER), [byte])
}

fn utf8_len(lead: u8) -> Option<usize> {
    match lead {
        0xc2..=0xdf => Some(2),
        0xe0..=0xef => Some(3),
        0xf0..=0xf4 => Some(4),
        _ => None,
    }
}

fn is_continuation(byte: u8) -> bool {
    (0x80..=0xbf).contains(&byte)
}

#[cfg(test)]
mod tests {
    use super::{KeyDecoder, DEFAULT_ESCAPE_TIMEOUT};
    use crate::core::input::Key;
    use crate::core::input_event::KeyEvent;
    use std::time::{Duration, Instant};

    fn keys(events: &[KeyEvent]) -> Vec<Key> {
        events.iter().map(|event| event.key).collect()
    }

    fn wire(events: &[KeyEvent]) -> Vec<u8> {
        events.iter().flat_map(|event| event.raw.clone()).collect()
    }

    #[test]
    fn arrow_sequences_decode_within_window() {
        let mut decoder = KeyDecoder::default();
        let now = Instant::now();
        let events = decoder.process(b"\x1b[A\x1b[B\x1b[C\x1b[D", now);
        assert_eq!(keys(&events), vec![Key::Up, Key::Down, Key::Right, Key::Left]);
        assert_eq!(events[0].raw, b"\x1b[A");
        assert!(decoder.pending().is_empty());
    }

    #[test]
    fn sequence_split_across_reads_inside_window_still_decodes() {
        let mut decoder = KeyDecoder::default();
        let start = Instant::now();
        assert!(decoder.process(b"\x1b", start).is_empty());
        assert!(decoder.process(b"[", start + Duration::from_millis(5)).is_empty());
        let events = decoder.process(b"3~", start + Duration::from_millis(10));
        assert_eq!(keys(&events), vec![Key::Delete]);
    }

    #[test]
    fn lone_escape_resolves_only_after_window() {
        let mut decoder = KeyDecoder::default();
        let start = Instant::now();
        assert!(decoder.process(b"\x1b", start).is_empty());
        assert!(decoder
            .flush_due(start + Duration::from_millis(49))
            .is_empty());
        let events = decoder.flush_due(start + DEFAULT_ESCAPE_TIMEOUT);
        assert_eq!(keys(&events), vec![Key::Escape]);
        assert!(decoder.flush_due(start + Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn partial_sequence_at_deadline_flushes_as_literals() {
        let mut decoder = KeyDecoder::default();
        let start = Instant::now();
        assert!(decoder.process(b"\x1b[3", start).is_empty());
        let events = decoder.flush_due(start + Duration::from_millis(60));
        assert_eq!(
            keys(&events),
            vec![Key::Escape, Key::Char('['), Key::Char('3')]
        );

        // The late tail is decoded fresh, not glued onto the flushed prefix.
        let late = decoder.process(b"~", start + Duration::from_millis(70));
        assert_eq!(keys(&late), vec![Key::Char('~')]);
    }

    #[test]
    fn window_is_not_rearmed_by_partial_bytes() {
        let mut decoder = KeyDecoder::default();
        let start = Instant::now();
        decoder.process(b"\x1b", start);
        decoder.process(b"[", start + Duration::from_millis(40));
        assert_eq!(decoder.next_timeout_ms(start + Duration::from_millis(40), 1000), 10);
        let events = decoder.flush_due(start + Duration::from_millis(50));
        assert_eq!(keys(&events), vec![Key::Escape, Key::Char('[')]);
    }

    #[test]
    fn unknown_suffix_degrades_to_escape_plus_literals() {
        let mut decoder = KeyDecoder::default();
        let events = decoder.process(b"\x1b[9x", Instant::now());
        assert_eq!(
            keys(&events),
            vec![Key::Escape, Key::Char('['), Key::Char('9'), Key::Char('x')]
        );
        assert_eq!(wire(&events), b"\x1b[9x");
    }

    #[test]
    fn escape_followed_by_sequence_yields_escape_then_key() {
        let mut decoder = KeyDecoder::default();
        let events = decoder.process(b"\x1b\x1b[A", Instant::now());
        assert_eq!(keys(&events), vec![Key::Escape, Key::Up]);
    }

    #[test]
    fn alt_letter_degrades_to_escape_and_rune() {
        let mut decoder = KeyDecoder::default();
        let events = decoder.process(b"\x1bx", Instant::now());
        assert_eq!(keys(&events), vec![Key::Escape, Key::Char('x')]);
    }

    #[test]
    fn control_bytes_and_runes() {
        let mut decoder = KeyDecoder::default();
        let events = decoder.process(b"a\x01\t\r\x7f \x1c", Instant::now());
        assert_eq!(
            keys(&events),
            vec![
                Key::Char('a'),
                Key::Ctrl('a'),
                Key::Tab,
                Key::Enter,
                Key::Backspace,
                Key::Char(' '),
                Key::Char('\x1c'),
            ]
        );
    }

    #[test]
    fn multibyte_runes_decode_whole() {
        let mut decoder = KeyDecoder::default();
        let now = Instant::now();
        let input = "é日🦀".as_bytes();
        let mut events = decoder.process(&input[..3], now);
        events.extend(decoder.process(&input[3..], now));
        assert_eq!(
            keys(&events),
            vec![Key::Char('é'), Key::Char('日'), Key::Char('🦀')]
        );
        assert_eq!(wire(&events), input);
    }

    #[test]
    fn invalid_utf8_becomes_replacement_per_byte() {
        let mut decoder = KeyDecoder::default();
        let now = Instant::now();
        let events = decoder.process(b"\xff\xe6\x97a", now);
        assert_eq!(
            keys(&events),
            vec![
                Key::Char(char::REPLACEMENT_CHARACTER),
                Key::Char(char::REPLACEMENT_CHARACTER),
                Key::Char(char::REPLACEMENT_CHARACTER),
                Key::Char('a'),
            ]
        );
        assert_eq!(wire(&events), b"\xff\xe6\x97a");
    }

    #[test]
    fn truncated_rune_flushes_at_deadline() {
        let mut decoder = KeyDecoder::default();
        let start = Instant::now();
        assert!(decoder.process(b"\xe6\x97", start).is_empty());
        let events = decoder.flush_due(start + DEFAULT_ESCAPE_TIMEOUT);
        assert_eq!(events.len(), 2);
        assert_eq!(wire(&events), b"\xe6\x97");
    }

    #[test]
    fn every_byte_is_emitted_exactly_once() {
        let inputs: [&[u8]; 8] = [
            b"hello\x1b[Aworld",
            b"\x1b\x1b\x1b",
            b"\x1b[",
            b"\x1bO\x1bOP\x1b[5~\x1b[6",
            b"\x00\x1f\x7f\x80\xc3",
            "∂x/∂t\x1b[Z".as_bytes(),
            b"\x1b[1;5A",
            b"\x1bOQ\x1b[2~q",
        ];
        for input in inputs {
            let mut decoder = KeyDecoder::default();
            let now = Instant::now();
            let mut events = Vec::new();
            // Feed one byte at a time to exercise every resumption point.
            for byte in input {
                events.extend(decoder.process(std::slice::from_ref(byte), now));
            }
            events.extend(decoder.flush_due(now + Duration::from_secs(1)));
            assert_eq!(wire(&events), input, "byte conservation for {input:?}");
            assert!(decoder.pending().is_empty());
        }
    }

    #[test]
    fn next_timeout_defaults_when_idle_and_clear_resets() {
        let mut decoder = KeyDecoder::new(Duration::from_millis(25));
        let now = Instant::now();
        assert_eq!(decoder.next_timeout_ms(now, 77), 77);
        decoder.process(b"\x1b", now);
        assert!(decoder.next_timeout_ms(now, 1000) <= 25);
        decoder.clear();
        assert_eq!(decoder.next_timeout_ms(now, 77), 77);
        assert!(decoder.flush().is_empty());
    }
}
