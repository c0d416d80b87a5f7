use crate::event::ScalarStyle;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Sequence,
    Mapping,
    #[default]
    Scalar,
    Alias,
}

/// One element of a composed document tree.
///
/// Children are owned by their parent. A mapping stores its entries as
/// alternating key and value nodes. An alias stores the anchor name it
/// refers to in `value`; see [`Node::find_anchor`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub style: ScalarStyle,
    /// Written in flow style (`[a, b]`, `{a: 1}`).
    pub flow: bool,
    /// Tag as written in the source, e.g. `!!str`.
    pub tag: Option<String>,
    pub anchor: Option<String>,
    pub value: String,
    pub children: Vec<Node>,
    pub head_comment: String,
    pub line_comment: String,
    pub foot_comment: String,
    /// Blank lines before the node's first line, ahead of its head comment.
    pub blank_lines_before: usize,
    /// Blank lines after the last child of a collection.
    pub blank_lines_after: usize,
    /// 0-based source position; zero for nodes built in code.
    pub line: usize,
    pub column: usize,
}

impl Node {
    pub fn document(root: Node) -> Self {
        Self {
            kind: NodeKind::Document,
            children: vec![root],
            ..Self::default()
        }
    }

    pub fn scalar(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn sequence(items: Vec<Node>) -> Self {
        Self {
            kind: NodeKind::Sequence,
            children: items,
            ..Self::default()
        }
    }

    /// Build a mapping from key/value pairs.
    pub fn mapping(entries: impl IntoIterator<Item = (Node, Node)>) -> Self {
        Self {
            kind: NodeKind::Mapping,
            children: entries.into_iter().flat_map(|(k, v)| [k, v]).collect(),
            ..Self::default()
        }
    }

    pub fn alias(name: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Alias,
            value: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_style(mut self, style: ScalarStyle) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn with_flow(mut self, flow: bool) -> Self {
        self.flow = flow;
        self
    }

    #[must_use]
    pub fn with_blank_lines_before(mut self, count: usize) -> Self {
        self.blank_lines_before = count;
        self
    }

    #[must_use]
    pub fn with_blank_lines_after(mut self, count: usize) -> Self {
        self.blank_lines_after = count;
        self
    }

    #[must_use]
    pub fn with_head_comment(mut self, text: impl Into<String>) -> Self {
        self.head_comment = text.into();
        self
    }

    #[must_use]
    pub fn with_line_comment(mut self, text: impl Into<String>) -> Self {
        self.line_comment = text.into();
        self
    }

    #[must_use]
    pub fn with_foot_comment(mut self, text: impl Into<String>) -> Self {
        self.foot_comment = text.into();
        self
    }

    #[must_use]
    pub fn with_anchor(mut self, name: impl Into<String>) -> Self {
        self.anchor = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Whether every field, blank-line counts included, has its default value.
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.kind, NodeKind::Sequence | NodeKind::Mapping)
    }

    /// A plain empty scalar with no properties, written as nothing.
    pub(crate) fn is_implicit_null(&self) -> bool {
        self.kind == NodeKind::Scalar
            && self.style == ScalarStyle::Plain
            && self.value.is_empty()
            && self.anchor.is_none()
            && self.tag.is_none()
    }

    /// The content node of a document, or `self` for any other node.
    pub fn root(&self) -> Option<&Node> {
        match self.kind {
            NodeKind::Document => self.children.first(),
            _ => Some(self),
        }
    }

    /// Key/value pairs of a mapping.
    pub fn entries(&self) -> impl Iterator<Item = (&Node, &Node)> {
        self.children.chunks_exact(2).map(|pair| (&pair[0], &pair[1]))
    }

    /// Value of the first entry whose scalar key equals `key`.
    pub fn get(&self, key: &str) -> Option<&Node> {
        if self.kind != NodeKind::Mapping {
            return None;
        }
        self.entries()
            .find(|(k, _)| k.kind == NodeKind::Scalar && k.value == key)
            .map(|(_, v)| v)
    }

    /// Find the node carrying `name` as its anchor. When an anchor is
    /// redefined the later definition is returned.
    pub fn find_anchor(&self, name: &str) -> Option<&Node> {
        let mut found = None;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.anchor.as_deref() == Some(name) {
                found = Some(node);
            }
            stack.extend(node.children.iter().rev());
        }
        found
    }

    /// Number of nested collection levels, 0 for a scalar or alias.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 0)];
        while let Some((node, above)) = stack.pop() {
            let level = above + usize::from(node.is_collection());
            deepest = deepest.max(level);
            stack.extend(node.children.iter().map(|child| (child, level)));
        }
        deepest
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_node_is_zero() {
        assert!(Node::default().is_zero());
    }

    #[test]
    fn blank_lines_make_a_node_non_zero() {
        assert!(!Node::default().with_blank_lines_before(1).is_zero());
        assert!(!Node::default().with_blank_lines_after(1).is_zero());
    }

    #[test]
    fn mapping_lookup() {
        let map = Node::mapping([
            (Node::scalar("a"), Node::scalar("1")),
            (Node::scalar("b"), Node::scalar("2")),
        ]);
        assert_eq!(map.get("b").unwrap().value, "2");
        assert!(map.get("c").is_none());
        assert_eq!(map.entries().count(), 2);
    }

    #[test]
    fn find_anchor_prefers_later_definition() {
        let doc = Node::document(Node::sequence(vec![
            Node::scalar("first").with_anchor("x"),
            Node::sequence(vec![Node::scalar("second").with_anchor("x")]),
            Node::alias("x"),
        ]));
        assert_eq!(doc.find_anchor("x").unwrap().value, "second");
        assert!(doc.find_anchor("y").is_none());
    }

    #[test]
    fn root_of_document() {
        let doc = Node::document(Node::scalar("a"));
        assert_eq!(doc.root().unwrap().value, "a");
        assert_eq!(Node::scalar("b").root().unwrap().value, "b");
    }

    #[test]
    fn depth_counts_collection_levels() {
        assert_eq!(Node::scalar("a").depth(), 0);
        let nested = Node::document(Node::mapping([(
            Node::scalar("a"),
            Node::sequence(vec![Node::scalar("x"), Node::sequence(vec![])]),
        )]));
        assert_eq!(nested.depth(), 3);
    }
}
