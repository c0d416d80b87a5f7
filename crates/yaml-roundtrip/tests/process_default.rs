//! The process-wide default is shared state, so every check that mutates it
//! lives in this one test binary and runs in a single test.

#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use yaml_roundtrip::{
    Decoder, Encoder, from_str, preserve_blank_lines, set_preserve_blank_lines, to_string,
};

const INPUT: &str = "a: 1\n\nb: 2\n";

#[test]
fn default_is_resolved_when_each_operation_runs() {
    set_preserve_blank_lines(false);
    assert!(!preserve_blank_lines());

    // Changed after construction, before decoding.
    let mut decoder = Decoder::new(INPUT.as_bytes());
    set_preserve_blank_lines(true);
    let document = decoder.decode().unwrap().unwrap();
    assert_eq!(document.children[0].children[2].blank_lines_before, 1);

    // An explicit override wins over the default.
    let mut decoder = Decoder::new(INPUT.as_bytes());
    decoder.set_preserve_blank_lines(false);
    let plain = decoder.decode().unwrap().unwrap();
    assert_eq!(plain.children[0].children[2].blank_lines_before, 0);

    // Each encode reads the default again.
    let mut encoder = Encoder::new(Vec::new());
    set_preserve_blank_lines(false);
    encoder.encode(&document).unwrap();
    set_preserve_blank_lines(true);
    encoder.encode(&document).unwrap();
    let output = String::from_utf8(encoder.finish().unwrap()).unwrap();
    assert_eq!(output, "a: 1\nb: 2\n---\na: 1\n\nb: 2\n");

    let mut encoder = Encoder::new(Vec::new());
    encoder.set_preserve_blank_lines(false);
    encoder.encode(&document).unwrap();
    assert_eq!(encoder.finish().unwrap(), b"a: 1\nb: 2\n");

    // A decoder reads the default again for each document.
    set_preserve_blank_lines(false);
    let mut decoder = Decoder::new("a: 1\n\nb: 2\n---\nc: 1\n\nd: 2\n".as_bytes());
    let first = decoder.decode().unwrap().unwrap();
    set_preserve_blank_lines(true);
    let second = decoder.decode().unwrap().unwrap();
    assert_eq!(first.children[0].children[2].blank_lines_before, 0);
    assert_eq!(second.children[0].children[2].blank_lines_before, 1);
    assert!(decoder.decode().unwrap().is_none());

    assert_eq!(to_string(&from_str(INPUT).unwrap()).unwrap(), INPUT);
    set_preserve_blank_lines(false);
    assert_eq!(to_string(&from_str(INPUT).unwrap()).unwrap(), "a: 1\nb: 2\n");
}
