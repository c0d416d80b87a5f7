//! Writes [`Node`] trees as text.
//!
//! Layout per node: blank lines before, head comment, content with its line
//! comment, then the foot comment (written by the parent at the parent's
//! indentation). A block collection writes its trailing blank lines after
//! its last child. Blank lines, stored or inside comment text, are written
//! only when preservation is on.

use crate::error::Error;
use crate::event::ScalarStyle;
use crate::node::{Node, NodeKind};
use crate::parser::MAX_DEPTH;

const INDICATORS: &[char] = &[
    '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@', '`',
];

/// Whether `value` can be written as a plain scalar and read back unchanged.
fn is_plain_safe(value: &str, flow: bool) -> bool {
    let Some(first) = value.chars().next() else {
        return false;
    };
    if value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace)
        || value.chars().any(char::is_control)
        || value.contains(": ")
        || value.contains(" #")
        || value.ends_with(':')
        || value.starts_with("---")
        || value.starts_with("...")
    {
        return false;
    }
    if flow && value.contains([',', '[', ']', '{', '}']) {
        return false;
    }
    if INDICATORS.contains(&first) {
        let second = value.chars().nth(1);
        return matches!(first, '-' | '?' | ':')
            && second.is_some_and(|c| {
                !c.is_whitespace() && !(flow && matches!(c, ',' | '[' | ']' | '{' | '}'))
            });
    }
    true
}

fn write_double_quoted(out: &mut String, value: &str) {
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            '\u{7}' => out.push_str("\\a"),
            '\u{8}' => out.push_str("\\b"),
            '\u{b}' => out.push_str("\\v"),
            '\u{c}' => out.push_str("\\f"),
            '\u{1b}' => out.push_str("\\e"),
            '\u{85}' => out.push_str("\\N"),
            '\u{a0}' => out.push_str("\\_"),
            '\u{2028}' => out.push_str("\\L"),
            '\u{2029}' => out.push_str("\\P"),
            c if c.is_control() => out.push_str(&format!("\\x{:02X}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn write_single_quoted(out: &mut String, value: &str) {
    out.push('\'');
    out.push_str(&value.replace('\'', "''"));
    out.push('\'');
}

pub(crate) struct Emitter {
    out: String,
    step: usize,
    preserve: bool,
}

impl Emitter {
    /// # Errors
    ///
    /// Fails if `indent` is outside `1..=9`, the range a block scalar
    /// indentation indicator can express.
    pub(crate) fn new(indent: usize, preserve: bool) -> Result<Self, Error> {
        if !(1..=9).contains(&indent) {
            return Err(Error::Encode(format!(
                "indent must be between 1 and 9, got {indent}"
            )));
        }
        Ok(Self {
            out: String::new(),
            step: indent,
            preserve,
        })
    }

    pub(crate) fn into_string(self) -> String {
        self.out
    }

    fn pad(&mut self, indent: usize) {
        self.out.extend(core::iter::repeat_n(' ', indent));
    }

    fn blank_lines(&mut self, count: usize) {
        if self.preserve {
            self.out.extend(core::iter::repeat_n('\n', count));
        }
    }

    /// Write comment lines at `indent`. Empty lines in the text are blank
    /// lines.
    fn comment_block(&mut self, text: &str, indent: usize) {
        if text.is_empty() {
            return;
        }
        for line in text.split('\n') {
            if line.is_empty() {
                self.blank_lines(1);
                continue;
            }
            self.pad(indent);
            if !line.starts_with('#') {
                self.out.push_str("# ");
            }
            self.out.push_str(line);
            self.out.push('\n');
        }
    }

    fn line_comment(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.out.push(' ');
        if !text.starts_with('#') {
            self.out.push_str("# ");
        }
        self.out.push_str(text);
    }

    fn has_preamble(&self, node: &Node) -> bool {
        (self.preserve && !node.flow && node.blank_lines_before > 0)
            || !node.head_comment.is_empty()
    }

    /// Blank lines and head comment ahead of a node's first line.
    fn preamble(&mut self, node: &Node, indent: usize) {
        if !node.flow {
            self.blank_lines(node.blank_lines_before);
        }
        self.comment_block(&node.head_comment, indent);
    }

    /// Write `&anchor !tag`; returns whether anything was written.
    fn properties(&mut self, node: &Node) -> bool {
        let mut wrote = false;
        if let Some(anchor) = &node.anchor {
            self.out.push('&');
            self.out.push_str(anchor);
            wrote = true;
        }
        if let Some(tag) = &node.tag {
            if wrote {
                self.out.push(' ');
            }
            self.out.push_str(tag);
            wrote = true;
        }
        wrote
    }

    fn is_block_collection(node: &Node) -> bool {
        node.is_collection() && !node.flow && !node.children.is_empty()
    }

    /// Write one document. Documents after the first start with `---`.
    pub(crate) fn document(&mut self, node: &Node, first: bool) -> Result<(), Error> {
        if node.depth() > MAX_DEPTH {
            return Err(Error::Encode(format!(
                "collections nested deeper than {MAX_DEPTH} levels"
            )));
        }
        let (head, line, root, foot) = match node.kind {
            NodeKind::Document => {
                if node.children.len() > 1 {
                    return Err(Error::Encode(
                        "a document node holds at most one root".to_string(),
                    ));
                }
                (
                    node.head_comment.as_str(),
                    node.line_comment.as_str(),
                    node.children.first(),
                    node.foot_comment.as_str(),
                )
            }
            _ => ("", "", Some(node), ""),
        };
        self.comment_block(head, 0);
        if !first || !line.is_empty() {
            self.out.push_str("---");
            self.line_comment(line);
            self.out.push('\n');
        }
        if let Some(root) = root {
            self.preamble(root, 0);
            self.root(root)?;
            self.comment_block(&root.foot_comment, 0);
        }
        self.comment_block(foot, 0);
        Ok(())
    }

    fn root(&mut self, node: &Node) -> Result<(), Error> {
        if Self::is_block_collection(node) {
            if self.properties(node) {
                self.line_comment(&node.line_comment);
                self.out.push('\n');
            }
            return match node.kind {
                NodeKind::Mapping => self.block_mapping(node, 0, false),
                _ => self.block_sequence(node, 0, false),
            };
        }
        if node.is_implicit_null() && node.line_comment.is_empty() {
            return Ok(());
        }
        self.inline_node(node, self.step)
    }

    /// Write a non-block node, its line comment and the line break. Block
    /// scalars start on this line and continue at `indent`.
    fn inline_node(&mut self, node: &Node, indent: usize) -> Result<(), Error> {
        let separate = self.properties(node);
        let mut content = String::new();
        match node.kind {
            NodeKind::Alias => {
                content.push('*');
                content.push_str(&node.value);
            }
            NodeKind::Scalar if node.style.is_block() => {
                if separate {
                    self.out.push(' ');
                }
                self.block_scalar(node, indent);
                return Ok(());
            }
            NodeKind::Scalar => Self::inline_scalar(&mut content, node, false),
            NodeKind::Mapping | NodeKind::Sequence => Self::flow_node(&mut content, node)?,
            NodeKind::Document => {
                return Err(Error::Encode("document node inside a document".to_string()));
            }
        }
        if separate && !content.is_empty() {
            self.out.push(' ');
        }
        self.out.push_str(&content);
        self.line_comment(&node.line_comment);
        self.out.push('\n');
        Ok(())
    }

    /// Scalars outside block context; block styles fall back to double quotes.
    fn inline_scalar(out: &mut String, node: &Node, flow: bool) {
        let value = node.value.as_str();
        match node.style {
            ScalarStyle::Plain if value.is_empty() => {}
            ScalarStyle::Plain if is_plain_safe(value, flow) => out.push_str(value),
            ScalarStyle::SingleQuoted if !value.contains('\n') => write_single_quoted(out, value),
            _ => write_double_quoted(out, value),
        }
    }

    fn flow_node(out: &mut String, node: &Node) -> Result<(), Error> {
        match node.kind {
            NodeKind::Mapping => {
                if node.children.len() % 2 != 0 {
                    return Err(Error::Encode(
                        "mapping node has an odd number of children".to_string(),
                    ));
                }
                out.push('{');
                for (i, (key, value)) in node.entries().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    Self::flow_item(out, key)?;
                    if key.kind == NodeKind::Alias {
                        out.push(' ');
                    }
                    if !value.is_implicit_null() {
                        out.push_str(": ");
                        Self::flow_item(out, value)?;
                    }
                }
                out.push('}');
            }
            NodeKind::Sequence => {
                out.push('[');
                for (i, item) in node.children.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    Self::flow_item(out, item)?;
                }
                out.push(']');
            }
            _ => Self::flow_item(out, node)?,
        }
        Ok(())
    }

    fn flow_item(out: &mut String, node: &Node) -> Result<(), Error> {
        let mut properties = String::new();
        if let Some(anchor) = &node.anchor {
            properties.push('&');
            properties.push_str(anchor);
        }
        if let Some(tag) = &node.tag {
            if !properties.is_empty() {
                properties.push(' ');
            }
            properties.push_str(tag);
        }
        out.push_str(&properties);
        let mut content = String::new();
        match node.kind {
            NodeKind::Alias => {
                content.push('*');
                content.push_str(&node.value);
            }
            NodeKind::Scalar if node.is_implicit_null() => content.push_str("\"\""),
            NodeKind::Scalar => Self::inline_scalar(&mut content, node, true),
            NodeKind::Mapping | NodeKind::Sequence => Self::flow_node(&mut content, node)?,
            NodeKind::Document => {
                return Err(Error::Encode("document node inside a document".to_string()));
            }
        }
        if !properties.is_empty() && !content.is_empty() {
            out.push(' ');
        }
        out.push_str(&content);
        Ok(())
    }

    /// Literal or folded scalar: header, then the body at `indent`. Folded
    /// text whose lines start with whitespace is written literal.
    fn block_scalar(&mut self, node: &Node, indent: usize) {
        let value = node.value.as_str();
        let content = value.trim_end_matches('\n');
        let trailing = value.len() - content.len();
        let literal = node.style == ScalarStyle::Literal
            || content.split('\n').any(|l| l.starts_with([' ', '\t']));

        self.out.push(if literal { '|' } else { '>' });
        if content.trim_start_matches('\n').starts_with([' ', '\t']) {
            self.out.push_str(&self.step.to_string());
        }
        match (content.is_empty(), trailing) {
            (_, 0) => self.out.push('-'),
            (false, 1) => {}
            _ => self.out.push('+'),
        }
        self.line_comment(&node.line_comment);
        self.out.push('\n');

        if content.is_empty() {
            self.out.extend(core::iter::repeat_n('\n', trailing));
            return;
        }
        let lines: Vec<&str> = content.split('\n').collect();
        for (i, line) in lines.iter().enumerate() {
            if !line.is_empty() {
                self.pad(indent);
                self.out.push_str(line);
            }
            self.out.push('\n');
            if !literal && !line.is_empty() && i + 1 < lines.len() {
                self.out.push('\n');
            }
        }
        self.out
            .extend(core::iter::repeat_n('\n', trailing.saturating_sub(1)));
    }

    /// Keys are always single-line: collections are written in flow style,
    /// multi-line scalars double-quoted.
    fn mapping_key(&mut self, key: &Node) -> Result<(), Error> {
        let separate = self.properties(key);
        let mut content = String::new();
        match key.kind {
            NodeKind::Alias => {
                content.push('*');
                content.push_str(&key.value);
                content.push(' ');
            }
            NodeKind::Scalar if key.is_implicit_null() => content.push_str("\"\""),
            NodeKind::Scalar if key.style.is_block() => write_double_quoted(&mut content, &key.value),
            NodeKind::Scalar => Self::inline_scalar(&mut content, key, false),
            NodeKind::Mapping | NodeKind::Sequence => {
                let mut flow = key.clone();
                flow.flow = true;
                Self::flow_node(&mut content, &flow)?;
            }
            NodeKind::Document => {
                return Err(Error::Encode("document node used as a key".to_string()));
            }
        }
        if separate && !content.is_empty() {
            self.out.push(' ');
        }
        self.out.push_str(&content);
        self.out.push(':');
        Ok(())
    }

    /// Write a mapping's entries at `indent`. With `inline_first` the cursor
    /// already sits where the first key goes.
    fn block_mapping(&mut self, node: &Node, indent: usize, inline_first: bool) -> Result<(), Error> {
        if node.children.len() % 2 != 0 {
            return Err(Error::Encode(
                "mapping node has an odd number of children".to_string(),
            ));
        }
        for (i, (key, value)) in node.entries().enumerate() {
            if i > 0 || !inline_first {
                self.preamble(key, indent);
                self.pad(indent);
            }
            self.mapping_key(key)?;
            self.mapping_value(key, value, indent)?;
            self.comment_block(&key.foot_comment, indent);
            self.comment_block(&value.foot_comment, indent);
        }
        self.blank_lines(node.blank_lines_after);
        Ok(())
    }

    /// Everything after `key:`. The key's line comment goes on the key line.
    fn mapping_value(&mut self, key: &Node, value: &Node, indent: usize) -> Result<(), Error> {
        let child = indent + self.step;
        if Self::is_block_collection(value) {
            if value.anchor.is_some() || value.tag.is_some() {
                self.out.push(' ');
                self.properties(value);
            }
            if key.line_comment.is_empty() {
                self.line_comment(&value.line_comment);
            } else {
                self.line_comment(&key.line_comment);
            }
            self.out.push('\n');
            self.preamble(value, child);
            return match value.kind {
                NodeKind::Mapping => self.block_mapping(value, child, false),
                _ => self.block_sequence(value, child, false),
            };
        }
        if value.is_implicit_null() {
            self.line_comment(&key.line_comment);
            self.line_comment(&value.line_comment);
            self.out.push('\n');
            return Ok(());
        }
        if !key.line_comment.is_empty() || self.has_preamble(value) {
            self.line_comment(&key.line_comment);
            self.out.push('\n');
            self.preamble(value, child);
            self.pad(child);
        } else {
            self.out.push(' ');
        }
        self.inline_node(value, child)
    }

    /// Write a sequence's items at `indent`. With `inline_first` the cursor
    /// already sits where the first `-` goes.
    fn block_sequence(&mut self, node: &Node, indent: usize, inline_first: bool) -> Result<(), Error> {
        for (i, item) in node.children.iter().enumerate() {
            if i > 0 || !inline_first {
                self.preamble(item, indent);
                self.pad(indent);
            }
            self.out.push('-');
            self.sequence_item(item, indent)?;
            self.comment_block(&item.foot_comment, indent);
        }
        self.blank_lines(node.blank_lines_after);
        Ok(())
    }

    /// Everything after `-`. Block collections without properties or
    /// comments on their first line use the compact `- key: value` form.
    fn sequence_item(&mut self, item: &Node, indent: usize) -> Result<(), Error> {
        if Self::is_block_collection(item) {
            let compact = item.anchor.is_none()
                && item.tag.is_none()
                && item.line_comment.is_empty()
                && !self.has_preamble(&item.children[0]);
            if compact {
                self.out.push(' ');
                return match item.kind {
                    NodeKind::Mapping => self.block_mapping(item, indent + 2, true),
                    _ => self.block_sequence(item, indent + 2, true),
                };
            }
            if item.anchor.is_some() || item.tag.is_some() {
                self.out.push(' ');
                self.properties(item);
            }
            self.line_comment(&item.line_comment);
            self.out.push('\n');
            let child = indent + self.step;
            return match item.kind {
                NodeKind::Mapping => self.block_mapping(item, child, false),
                _ => self.block_sequence(item, child, false),
            };
        }
        if item.is_implicit_null() {
            self.line_comment(&item.line_comment);
            self.out.push('\n');
            return Ok(());
        }
        self.out.push(' ');
        self.inline_node(item, indent + self.step)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn emit(node: &Node, preserve: bool) -> String {
        let mut emitter = Emitter::new(2, preserve).unwrap();
        emitter.document(node, true).unwrap();
        emitter.into_string()
    }

    fn pair(key: &str, value: &str) -> (Node, Node) {
        (Node::scalar(key), Node::scalar(value))
    }

    #[test]
    fn plain_safety() {
        assert!(is_plain_safe("hello world", false));
        assert!(is_plain_safe("-x", false));
        assert!(!is_plain_safe("- x", false));
        assert!(!is_plain_safe("a: b", false));
        assert!(!is_plain_safe("a #b", false));
        assert!(!is_plain_safe("#a", false));
        assert!(!is_plain_safe(" a", false));
        assert!(!is_plain_safe("a,b", true));
        assert!(is_plain_safe("a,b", false));
    }

    #[test]
    fn blank_lines_are_written_before_head_comment() {
        let (k, v) = pair("b", "2");
        let map = Node::mapping([
            pair("a", "1"),
            (k.with_blank_lines_before(1).with_head_comment("# about b"), v),
        ]);
        assert_eq!(emit(&map, true), "a: 1\n\n# about b\nb: 2\n");
        assert_eq!(emit(&map, false), "a: 1\n# about b\nb: 2\n");
    }

    #[test]
    fn blank_lines_after_last_child() {
        let map = Node::mapping([pair("a", "1")]).with_blank_lines_after(2);
        assert_eq!(emit(&map, true), "a: 1\n\n\n");
    }

    #[test]
    fn flow_nodes_never_get_blank_lines() {
        let seq = Node::sequence(vec![Node::scalar("a"), Node::scalar("b")])
            .with_flow(true)
            .with_blank_lines_before(3)
            .with_blank_lines_after(3);
        let map = Node::mapping([(Node::scalar("k"), seq)]);
        assert_eq!(emit(&map, true), "k: [a, b]\n");
    }

    #[test]
    fn sequences_under_mappings_are_indented() {
        let seq = Node::sequence(vec![
            Node::scalar("x"),
            Node::mapping([pair("a", "1"), pair("b", "2")]),
            Node::sequence(vec![Node::scalar("y"), Node::scalar("z")]),
        ]);
        let map = Node::mapping([(Node::scalar("items"), seq)]);
        assert_eq!(
            emit(&map, false),
            "items:\n  - x\n  - a: 1\n    b: 2\n  - - y\n    - z\n"
        );
    }

    #[test]
    fn scalar_styles() {
        let map = Node::mapping([
            (Node::scalar("plain"), Node::scalar("needs: quotes")),
            (
                Node::scalar("single"),
                Node::scalar("it's").with_style(ScalarStyle::SingleQuoted),
            ),
            (
                Node::scalar("double"),
                Node::scalar("tab\there").with_style(ScalarStyle::DoubleQuoted),
            ),
            (
                Node::scalar("literal"),
                Node::scalar("line1\nline2\n").with_style(ScalarStyle::Literal),
            ),
            (
                Node::scalar("folded"),
                Node::scalar("one\ntwo").with_style(ScalarStyle::Folded),
            ),
            (Node::scalar("empty"), Node::scalar("")),
        ]);
        assert_eq!(
            emit(&map, false),
            "plain: \"needs: quotes\"\nsingle: 'it''s'\ndouble: \"tab\\there\"\n\
             literal: |\n  line1\n  line2\nfolded: >-\n  one\n\n  two\nempty:\n"
        );
    }

    #[test]
    fn keep_chomping_writes_trailing_lines() {
        let node = Node::scalar("a\n\n").with_style(ScalarStyle::Literal);
        assert_eq!(emit(&node, false), "|+\n  a\n\n");
    }

    #[test]
    fn properties_and_aliases() {
        let map = Node::mapping([
            (
                Node::scalar("base"),
                Node::mapping([pair("x", "1")]).with_anchor("b"),
            ),
            (Node::scalar("copy"), Node::alias("b")),
            (Node::scalar("tagged"), Node::scalar("5").with_tag("!!str")),
        ]);
        assert_eq!(
            emit(&map, false),
            "base: &b\n  x: 1\ncopy: *b\ntagged: !!str 5\n"
        );
    }

    #[test]
    fn comments_around_nodes() {
        let (k, v) = pair("a", "1");
        let map = Node::mapping([(
            k.with_line_comment("# key"),
            v.with_foot_comment("# foot"),
        )])
        .with_head_comment("# top");
        assert_eq!(emit(&map, false), "# top\na: # key\n  1\n# foot\n");
    }

    #[test]
    fn later_documents_get_a_marker() {
        let mut emitter = Emitter::new(2, false).unwrap();
        emitter.document(&Node::scalar("a"), true).unwrap();
        emitter.document(&Node::scalar("b"), false).unwrap();
        assert_eq!(emitter.into_string(), "a\n---\nb\n");
    }

    #[test]
    fn empty_collections_are_flow() {
        let map = Node::mapping([
            (Node::scalar("m"), Node::mapping([])),
            (Node::scalar("s"), Node::sequence(vec![])),
        ]);
        assert_eq!(emit(&map, false), "m: {}\ns: []\n");
    }

    #[test]
    fn odd_mapping_is_rejected() {
        let mut map = Node::mapping([]);
        map.children.push(Node::scalar("lonely"));
        let mut emitter = Emitter::new(2, false).unwrap();
        assert!(matches!(emitter.document(&map, true), Err(Error::Encode(_))));
    }

    #[test]
    fn indent_out_of_range() {
        assert!(Emitter::new(0, false).is_err());
        assert!(Emitter::new(10, false).is_err());
    }

    #[test]
    fn overly_deep_tree_is_rejected() {
        let mut node = Node::scalar("x");
        for _ in 0..MAX_DEPTH {
            node = Node::sequence(vec![node]).with_flow(true);
        }
        assert_eq!(emit(&node, false).matches('[').count(), MAX_DEPTH);

        let deeper = Node::sequence(vec![node]);
        let mut emitter = Emitter::new(2, false).unwrap();
        assert!(matches!(emitter.document(&deeper, true), Err(Error::Encode(_))));
    }
}
