//! Builds [`Node`] documents from the event stream.

use core::iter::Peekable;
use core::mem;
use std::collections::HashSet;

use crate::error::{Error, Mark, SyntaxErrorKind};
use crate::event::{CollectionStyle, Event, EventKind};
use crate::node::{Node, NodeKind};
use crate::parser::Parser;

/// Pulls one document at a time out of a [`Parser`].
pub struct Composer<'a> {
    parser: Peekable<Parser<'a>>,
    anchors: HashSet<String>,
    started: bool,
    finished: bool,
}

impl<'a> Composer<'a> {
    pub fn new(parser: Parser<'a>) -> Self {
        Self {
            parser: parser.peekable(),
            anchors: HashSet::new(),
            started: false,
            finished: false,
        }
    }

    fn next_event(&mut self) -> Result<Event, Error> {
        self.parser
            .next()
            .unwrap_or_else(|| Err(Error::syntax(SyntaxErrorKind::UnexpectedEnd, Mark::default())))
    }

    /// Compose the next document, or `None` at the end of the stream.
    ///
    /// # Errors
    ///
    /// Returns the first syntax error of the document, or
    /// [`Error::UnknownAnchor`] for an alias to an anchor not defined earlier
    /// in the same document.
    pub fn next_document(&mut self) -> Result<Option<Node>, Error> {
        if self.finished {
            return Ok(None);
        }
        if !self.started {
            self.started = true;
            let event = self.next_event()?;
            if event.kind != EventKind::StreamStart {
                return Err(Error::syntax(
                    SyntaxErrorKind::Expected("<stream start>"),
                    event.start,
                ));
            }
        }

        let start = self.next_event()?;
        match start.kind {
            EventKind::StreamEnd => {
                self.finished = true;
                // Comments in a stream without content form an empty document.
                if start.comments.foot.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(Node {
                    kind: NodeKind::Document,
                    foot_comment: start.comments.foot,
                    line: start.start.line,
                    ..Node::default()
                }));
            }
            EventKind::DocumentStart { .. } => {}
            _ => {
                return Err(Error::syntax(
                    SyntaxErrorKind::Expected("<document start>"),
                    start.start,
                ));
            }
        }

        self.anchors.clear();
        let mut document = Node {
            kind: NodeKind::Document,
            head_comment: start.comments.head,
            line_comment: start.comments.line,
            line: start.start.line,
            column: start.start.column,
            ..Node::default()
        };
        let first = self.next_event()?;
        let root = self.compose_node(first)?;
        document.children.push(root);

        let end = self.next_event()?;
        if !matches!(end.kind, EventKind::DocumentEnd { .. }) {
            return Err(Error::syntax(
                SyntaxErrorKind::Expected("<document end>"),
                end.start,
            ));
        }
        document.foot_comment = end.comments.foot;
        // Comments after a final `...` ride on the stream end.
        if let Some(Ok(next)) = self.parser.peek_mut() {
            if next.kind == EventKind::StreamEnd && !next.comments.foot.is_empty() {
                let trailing = mem::take(&mut next.comments.foot);
                if !document.foot_comment.is_empty() {
                    document.foot_comment.push('\n');
                }
                document.foot_comment.push_str(&trailing);
            }
        }
        tracing::debug!(
            line = document.line,
            anchors = self.anchors.len(),
            "composed document"
        );
        Ok(Some(document))
    }

    fn register_anchor(&mut self, anchor: Option<&String>) {
        if let Some(name) = anchor {
            tracing::trace!(anchor = %name, "anchor");
            self.anchors.insert(name.clone());
        }
    }

    fn compose_node(&mut self, event: Event) -> Result<Node, Error> {
        let mut node = Node {
            head_comment: event.comments.head,
            line_comment: event.comments.line,
            foot_comment: event.comments.foot,
            blank_lines_before: event.blank_lines_before,
            line: event.start.line,
            column: event.start.column,
            ..Node::default()
        };
        match event.kind {
            EventKind::Alias { name } => {
                if !self.anchors.contains(&name) {
                    return Err(Error::unknown_anchor(&name, event.start));
                }
                node.kind = NodeKind::Alias;
                node.value = name;
            }
            EventKind::Scalar {
                anchor,
                tag,
                value,
                style,
            } => {
                self.register_anchor(anchor.as_ref());
                node.kind = NodeKind::Scalar;
                node.anchor = anchor;
                node.tag = tag;
                node.value = value;
                node.style = style;
            }
            EventKind::SequenceStart { anchor, tag, style } => {
                self.register_anchor(anchor.as_ref());
                node.kind = NodeKind::Sequence;
                node.anchor = anchor;
                node.tag = tag;
                self.compose_children(&mut node, style, &EventKind::SequenceEnd)?;
            }
            EventKind::MappingStart { anchor, tag, style } => {
                self.register_anchor(anchor.as_ref());
                node.kind = NodeKind::Mapping;
                node.anchor = anchor;
                node.tag = tag;
                self.compose_children(&mut node, style, &EventKind::MappingEnd)?;
            }
            _ => {
                return Err(Error::syntax(
                    SyntaxErrorKind::Expected("node"),
                    event.start,
                ));
            }
        }
        Ok(node)
    }

    /// Read children up to the closing event, which carries the collection's
    /// foot comment and trailing blank lines.
    fn compose_children(
        &mut self,
        node: &mut Node,
        style: CollectionStyle,
        end: &EventKind,
    ) -> Result<(), Error> {
        loop {
            let event = self.next_event()?;
            if event.kind == *end {
                node.foot_comment = event.comments.foot;
                if node.line_comment.is_empty() {
                    node.line_comment = event.comments.line;
                }
                node.blank_lines_after = event.blank_lines_after;
                break;
            }
            let child = self.compose_node(event)?;
            node.children.push(child);
        }
        if style == CollectionStyle::Flow {
            node.flow = true;
            node.blank_lines_before = 0;
            node.blank_lines_after = 0;
        }
        Ok(())
    }
}

impl Iterator for Composer<'_> {
    type Item = Result<Node, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_document() {
            Ok(Some(document)) => Some(Ok(document)),
            Ok(None) => None,
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}
