
use std::time::Instant;

use rawline::{Key, KeyDecoder};

fn key_name(key: Key) -> String {
    match key {
        Key::Char(char::REPLACEMENT_CHARACTER) => "invalid".to_string(),
        Key::Char(ch) => format!("char:{ch}"),
        Key::Ctrl(letter) => format!("ctrl-{letter}"),
        Key::F(n) => format!("f{n}"),
        other => format!("{other:?}").to_lowercase(),
    }
}

#[test]
fn key_vectors_match_fixture() {
    let raw = fixture::read_fixture("key_vectors.tsv");
    let mut checked = 0;
    for (idx, line) in raw.lines().enumerate() {
        let line_num = idx + 1;
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split('\t').collect();
        assert!(
            parts.len() == 2,
            "line {line_num}: expected 2 columns, got {}",
            parts.len()
        );
        let input = fixture::unescape_bytes(parts[0]);
        let expected: Vec<&str> = parts[1].split('|').collect();

        let mut decoder = KeyDecoder::default();
        let mut events = decoder.process(&input, Instant::now());
        events.extend(decoder.flush());

        let actual: Vec<String> = events.iter().map(|event| key_name(event.key)).collect();
        assert_eq!(actual, expected, "line {line_num}: decoding {input:?}");

        let wire: Vec<u8> = events.iter().flat_map(|event| event.raw.clone()).collect();
        assert_eq!(wire, input, "line {line_num}: source bytes not conserved");
        checked += 1;
    }
    assert!(checked > 40, "fixture looks truncated: {checked} vectors");
}

#[test]
fn key_vectors_decode_the_same_when_fed_byte_by_byte() {
    let raw = fixture::read_fixture("key_vectors.tsv");
    for line in raw.lines().filter(|line| !line.is_empty() && !line.starts_with('#')) {
        let Some((input, _)) = line.split_once('\t') else {
            continue;
        };
        let input = fixture::unescape_bytes(input);

        let mut whole = KeyDecoder::default();
        let now = Instant::now();
        let mut expected = whole.process(&input, now);
        expected.extend(whole.flush());

        let mut split = KeyDecoder::default();
        let mut actual = Vec::new();
        for byte in &input {
            actual.extend(split.process(std::slice::from_ref(byte), now));
        }
        actual.extend(split.flush());

        assert_eq!(actual, expected, "decoding {input:?} one byte at a time");
    }
}
