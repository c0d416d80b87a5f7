use crate::error::Mark;

/// How a scalar is written in the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScalarStyle {
    #[default]
    Plain,
    SingleQuoted,
    DoubleQuoted,
    /// `|`
    Literal,
    /// `>`
    Folded,
}

impl ScalarStyle {
    pub fn is_block(self) -> bool {
        matches!(self, Self::Literal | Self::Folded)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollectionStyle {
    #[default]
    Block,
    Flow,
}

/// Comment text attached to a construct.
///
/// Each field holds whole comment lines (including the `#`) joined by `\n`.
/// When blank lines are preserved, a blank line between comment lines of one
/// group is kept as an empty line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comments {
    /// Lines directly above the construct.
    pub head: String,
    /// Trailing comment on the construct's line.
    pub line: String,
    /// Lines directly below the construct.
    pub foot: String,
}

impl Comments {
    pub fn is_empty(&self) -> bool {
        self.head.is_empty() && self.line.is_empty() && self.foot.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    StreamStart,
    StreamEnd,
    DocumentStart {
        implicit: bool,
        version: Option<(u32, u32)>,
        tags: Vec<(String, String)>,
    },
    DocumentEnd {
        implicit: bool,
    },
    Alias {
        name: String,
    },
    Scalar {
        anchor: Option<String>,
        tag: Option<String>,
        value: String,
        style: ScalarStyle,
    },
    SequenceStart {
        anchor: Option<String>,
        tag: Option<String>,
        style: CollectionStyle,
    },
    SequenceEnd,
    MappingStart {
        anchor: Option<String>,
        tag: Option<String>,
        style: CollectionStyle,
    },
    MappingEnd,
}

/// A structural signal produced by the [`Parser`](crate::Parser).
///
/// `blank_lines_before` is set on node start events (scalar, alias,
/// collection start). `blank_lines_after` is set on collection end events.
/// On node events `comments.foot` is the foot of the node the event
/// completes; on `DocumentEnd` it holds the document's trailing comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub start: Mark,
    pub end: Mark,
    pub comments: Comments,
    pub blank_lines_before: usize,
    pub blank_lines_after: usize,
}

impl Event {
    pub(crate) fn new(kind: EventKind, start: Mark, end: Mark) -> Self {
        Self {
            kind,
            start,
            end,
            comments: Comments::default(),
            blank_lines_before: 0,
            blank_lines_after: 0,
        }
    }

    /// Whether this event opens or is a node.
    pub fn starts_node(&self) -> bool {
        matches!(
            self.kind,
            EventKind::Alias { .. }
                | EventKind::Scalar { .. }
                | EventKind::SequenceStart { .. }
                | EventKind::MappingStart { .. }
        )
    }

    /// Whether this event completes a node.
    pub fn ends_node(&self) -> bool {
        matches!(
            self.kind,
            EventKind::Alias { .. }
                | EventKind::Scalar { .. }
                | EventKind::SequenceEnd
                | EventKind::MappingEnd
        )
    }
}
