//! Decode/encode round trips with explicit per-instance preservation.
//!
//! Nothing here touches the process-wide default; see `process_default.rs`.

#![allow(clippy::unwrap_used)]

use core::fmt::Write as _;

use pretty_assertions::assert_eq;
use yaml_roundtrip::{Decoder, Encoder, Error, Node, NodeKind, SyntaxErrorKind, from_str};

fn decode_all(input: &str, preserve: bool) -> Result<Vec<Node>, Error> {
    let mut decoder = Decoder::new(input.as_bytes());
    decoder.set_preserve_blank_lines(preserve);
    let mut documents = Vec::new();
    while let Some(document) = decoder.decode()? {
        documents.push(document);
    }
    Ok(documents)
}

fn decode(input: &str, preserve: bool) -> Node {
    decode_all(input, preserve).unwrap().remove(0)
}

fn encode_all(documents: &[Node], preserve: bool) -> String {
    let mut encoder = Encoder::new(Vec::new());
    encoder.set_indent(2);
    encoder.set_preserve_blank_lines(preserve);
    for document in documents {
        encoder.encode(document).unwrap();
    }
    String::from_utf8(encoder.finish().unwrap()).unwrap()
}

fn roundtrip(input: &str, preserve: bool) -> String {
    encode_all(&decode_all(input, preserve).unwrap(), preserve)
}

fn walk<'a>(node: &'a Node, out: &mut Vec<&'a Node>) {
    out.push(node);
    for child in &node.children {
        walk(child, out);
    }
}

fn all_nodes(node: &Node) -> Vec<&Node> {
    let mut nodes = Vec::new();
    walk(node, &mut nodes);
    nodes
}

/// Indented outline of kinds, scalar values and non-zero blank counts.
fn outline(node: &Node) -> String {
    fn visit(node: &Node, depth: usize, out: &mut String) {
        let _ = write!(out, "{}{:?}", "  ".repeat(depth), node.kind);
        if node.kind == NodeKind::Scalar {
            let _ = write!(out, " {:?}", node.value);
        }
        if node.blank_lines_before > 0 {
            let _ = write!(out, " before={}", node.blank_lines_before);
        }
        if node.blank_lines_after > 0 {
            let _ = write!(out, " after={}", node.blank_lines_after);
        }
        out.push('\n');
        for child in &node.children {
            visit(child, depth + 1, out);
        }
    }
    let mut out = String::new();
    visit(node, 0, &mut out);
    out.trim_end().to_string()
}

#[test]
fn single_blank_line_between_keys() {
    let input = "key1: value1\n\nkey2: value2\n";
    let document = decode(input, true);
    let map = &document.children[0];
    assert_eq!(map.children[2].value, "key2");
    assert_eq!(map.children[2].blank_lines_before, 1);
    assert_eq!(roundtrip(input, true), input);
}

#[test]
fn two_blank_lines_between_keys() {
    let input = "key2: value2\n\n\nkey3: value3\n";
    let document = decode(input, true);
    assert_eq!(document.children[0].children[2].blank_lines_before, 2);
    assert_eq!(roundtrip(input, true), input);
}

#[test]
fn blank_line_between_sequence_items() {
    let input = "- item1\n\n- item2\n";
    let document = decode(input, true);
    let seq = &document.children[0];
    assert_eq!(seq.kind, NodeKind::Sequence);
    assert_eq!(seq.children[0].blank_lines_before, 0);
    assert_eq!(seq.children[1].blank_lines_before, 1);
    assert_eq!(roundtrip(input, true), input);
}

#[test]
fn disabled_on_both_sides_drops_blank_lines() {
    let input = "key2: value2\n\n\nkey3: value3\n";
    let output = roundtrip(input, false);
    assert_eq!(output, "key2: value2\nkey3: value3\n");

    let strip = |node: &Node| {
        all_nodes(node)
            .iter()
            .map(|n| (n.kind, n.value.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(strip(&decode(&output, true)), strip(&decode(input, true)));
}

#[test]
fn block_documents_round_trip_exactly() {
    let cases = [
        "key1: value1\n\nkey2: value2\n",
        "key1: value1\n\n\nkey2: value2\n",
        "items:\n  - item1\n\n  - item2\n\n  - item3\n",
        "# Header comment\nkey1: value1\n\n# Comment for key2\nkey2: value2\n\n# Comment for key3\n\nkey3: value3\n",
        "parent:\n  child1: value1\n\n  child2: value2\n\n  nested:\n    - item1\n\n    - item2\n",
        "a: 1\n\n# trailing\n",
        "a:\n  b: 1\n\n",
        "list:\n  - name: one\n    value: 1\n\n  - name: two\n    value: 2\n",
        "key: value # note\nother: 2\n",
        "key: # about key\n  value\n",
        "text: |\n  line one\n  line two\n\nnext: value\n",
        "# Header\n\nkey: v\n",
        "# License\n# line 2\n\n# About a\na: 1\n",
        "# Header\n\n\n- a\n- b\n",
        "# only comment\n",
    ];
    for input in cases {
        assert_eq!(roundtrip(input, true), input, "input: {input:?}");
    }
}

#[test]
fn other_constructs_round_trip() {
    let cases = [
        "a: 1\n---\nb: 2\n",
        "key: {a: 1, b: [x, y]}\n",
        "base: &b\n  x: 1\ncopy: *b\n",
        "tagged: !!str 5\nquoted: 'it''s'\ndouble: \"a\\tb\"\n",
        "- - a\n  - b\n- c\n",
        "empty:\nnull_item:\n  -\n  - x\n",
    ];
    for input in cases {
        assert_eq!(roundtrip(input, false), input, "input: {input:?}");
    }
}

#[test]
fn comments_survive_without_blank_lines() {
    let input = "# Header\nkey1: value1\n\n# Comment for key2\nkey2: value2\n";
    assert_eq!(
        roundtrip(input, false),
        "# Header\nkey1: value1\n# Comment for key2\nkey2: value2\n"
    );
}

#[test]
fn disabled_encode_ignores_stored_counts() {
    let input = "a: 1\n\nb:\n\n  - x\n\n  - y\n\n";
    let documents = decode_all(input, true).unwrap();
    assert!(all_nodes(&documents[0]).iter().any(|n| n.blank_lines_before > 0));
    assert!(!encode_all(&documents, false).contains("\n\n"));

    let mut loud = documents[0].clone();
    let mut stack = vec![&mut loud];
    while let Some(node) = stack.pop() {
        node.blank_lines_before = 3;
        node.blank_lines_after = 3;
        stack.extend(node.children.iter_mut());
    }
    assert!(!encode_all(&[loud], false).contains("\n\n"));
}

#[test]
fn blank_line_count_makes_node_non_empty() {
    let node = Node {
        blank_lines_before: 1,
        ..Node::default()
    };
    assert!(!node.is_zero());
    assert!(Node::default().is_zero());
}

#[test]
fn flow_collections_record_no_blank_lines() {
    for input in ["{a: 1, b: 2}", "{a: 1,\n\n\n  b: 2}\n", "x:\n\n  [1,\n\n  2]\n"] {
        let document = decode(input, true);
        for node in all_nodes(&document) {
            if node.flow || (node.kind == NodeKind::Scalar && node.value != "x") {
                assert_eq!(node.blank_lines_before, 0, "input: {input:?}");
                assert_eq!(node.blank_lines_after, 0, "input: {input:?}");
            }
        }
    }
}

#[test]
fn counts_survive_a_second_round_trip() {
    let input = "a: 1\n\n\nb:\n  c: 2\n\n  d:\n    - x\n\n    - y\n\n";
    let first = decode(input, true);
    let text = encode_all(&[first.clone()], true);
    let second = decode(&text, true);
    let counts = |node: &Node| {
        all_nodes(node)
            .iter()
            .map(|n| (n.blank_lines_before, n.blank_lines_after))
            .collect::<Vec<_>>()
    };
    assert_eq!(counts(&second), counts(&first));
    assert_eq!(text, input);
}

#[test]
fn outline_of_nested_document() {
    let input = "parent:\n  child1: value1\n\n  child2: value2\n\n  nested:\n    - item1\n\n    - item2\n";
    insta::assert_snapshot!(outline(&decode(input, true)), @r#"
    Document
      Mapping
        Scalar "parent"
        Mapping
          Scalar "child1"
          Scalar "value1"
          Scalar "child2" before=1
          Scalar "value2"
          Scalar "nested" before=1
          Sequence
            Scalar "item1"
            Scalar "item2" before=1
    "#);
}

#[test]
fn alias_before_anchor_is_rejected() {
    let err = decode_all("copy: *base\nbase: &base 1\n", true).unwrap_err();
    assert!(matches!(err, Error::UnknownAnchor { ref name, .. } if name == "base"));
}

#[test]
fn syntax_errors_keep_their_kind() {
    let err = decode_all("key: \"unterminated\n", true).unwrap_err();
    assert_eq!(err.syntax_kind(), Some(&SyntaxErrorKind::UnterminatedQuoted));

    let err = decode_all("%FOO bar\n---\na\n", false).unwrap_err();
    assert!(matches!(
        err.syntax_kind(),
        Some(SyntaxErrorKind::UnknownDirective(name)) if name == "FOO"
    ));
}

#[test]
fn leading_comment_blank_run_is_dropped_when_disabled() {
    assert_eq!(
        roundtrip("# Header\n\nkey: v\n", false),
        "# Header\nkey: v\n"
    );
}

#[test]
fn decoder_setting_applies_from_the_next_document() {
    let input = "a: 1\n\nb: 2\n---\nc: 1\n\nd: 2\n---\ne: 1\n\nf: 2\n";
    let mut decoder = Decoder::new(input.as_bytes());
    decoder.set_preserve_blank_lines(false);
    let first = decoder.decode().unwrap().unwrap();
    decoder.set_preserve_blank_lines(true);
    let second = decoder.decode().unwrap().unwrap();
    decoder.set_preserve_blank_lines(false);
    let third = decoder.decode().unwrap().unwrap();
    assert!(decoder.decode().unwrap().is_none());

    let key = |document: &Node| document.children[0].children[2].clone();
    assert_eq!((key(&first).value, key(&first).blank_lines_before), ("b".to_string(), 0));
    assert_eq!((key(&second).value, key(&second).blank_lines_before), ("d".to_string(), 1));
    assert_eq!((key(&third).value, key(&third).blank_lines_before), ("f".to_string(), 0));
}

#[test]
fn decoder_stops_after_a_bad_document() {
    let mut decoder = Decoder::new("a: 1\n---\nb: \"open\n".as_bytes());
    decoder.set_preserve_blank_lines(true);
    assert_eq!(decoder.decode().unwrap().unwrap().children[0].children[0].value, "a");
    assert!(decoder.decode().is_err());
    assert!(decoder.decode().unwrap().is_none());
}

#[test]
fn comment_only_input_keeps_its_comment() {
    let documents = decode_all("# only comment\n", false).unwrap();
    assert_eq!(documents.len(), 1);
    assert!(documents[0].children.is_empty());
    assert_eq!(encode_all(&documents, false), "# only comment\n");
    assert!(decode_all("", false).unwrap().is_empty());
}

#[test]
fn deep_nesting_is_an_error_not_a_crash() {
    let flow = format!("{}{}", "[".repeat(5000), "]".repeat(5000));
    let err = from_str(&flow).unwrap_err();
    assert!(matches!(
        err.syntax_kind(),
        Some(SyntaxErrorKind::MaxDepthExceeded(_))
    ));

    let mut block = String::new();
    for level in 0..200 {
        block.push_str(&" ".repeat(level));
        block.push_str("k:\n");
    }
    let err = from_str(&block).unwrap_err();
    assert!(matches!(
        err.syntax_kind(),
        Some(SyntaxErrorKind::MaxDepthExceeded(_))
    ));

    let shallow = format!("{}{}", "[".repeat(50), "]".repeat(50));
    assert_eq!(from_str(&shallow).unwrap().depth(), 50);
}
