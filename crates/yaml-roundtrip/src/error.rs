use core::fmt;

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// A position in the source text.
///
/// `line` and `column` are 0-based; `Display` prints them 1-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mark {
    /// Byte offset into the input.
    pub index: usize,
    pub line: usize,
    /// Column in characters.
    pub column: usize,
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} column {}", self.line + 1, self.column + 1)
    }
}

/// The kind of lexical or structural problem found in the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SyntaxErrorKind {
    #[error("unterminated quoted scalar")]
    UnterminatedQuoted,
    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),
    #[error("invalid block scalar header")]
    InvalidBlockHeader,
    #[error("block scalar content is less indented than its header requires")]
    BadBlockIndentation,
    #[error("bad indentation of a mapping entry")]
    BadIndentation,
    #[error("mapping values are not allowed in this context")]
    UnexpectedValue,
    #[error("block sequence entries are not allowed in this context")]
    UnexpectedBlockEntry,
    #[error("could not find expected ':'")]
    MissingValue,
    #[error("unknown directive '%{0}'")]
    UnknownDirective(String),
    #[error("malformed %{0} directive")]
    MalformedDirective(&'static str),
    #[error("duplicate %YAML directive")]
    DuplicateVersion,
    #[error("undefined tag handle '{0}'")]
    UndefinedTagHandle(String),
    #[error("malformed tag")]
    MalformedTag,
    #[error("anchor or alias name is empty")]
    EmptyAnchor,
    #[error("tabs are not allowed for indentation")]
    TabIndentation,
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("did not find expected {0}")]
    Expected(&'static str),
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("collections nested deeper than {0} levels")]
    MaxDepthExceeded(usize),
}

/// Errors surfaced by decoding and encoding.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// The input is not well-formed.
    #[error("{kind} at {mark}")]
    #[diagnostic(code(yaml::syntax))]
    Syntax {
        kind: SyntaxErrorKind,
        mark: Mark,
        #[label("here")]
        span: SourceSpan,
    },

    /// An alias refers to an anchor that has not been defined earlier in the
    /// same document.
    #[error("unknown anchor '{name}' at {mark}")]
    #[diagnostic(
        code(yaml::unknown_anchor),
        help("anchors must be defined before they are referenced")
    )]
    UnknownAnchor {
        name: String,
        mark: Mark,
        #[label("referenced here")]
        span: SourceSpan,
    },

    /// The node handed to the encoder cannot be written.
    #[error("cannot encode node: {0}")]
    #[diagnostic(code(yaml::encode))]
    Encode(String),

    #[error(transparent)]
    #[diagnostic(code(yaml::io))]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn syntax(kind: SyntaxErrorKind, mark: Mark) -> Self {
        Self::Syntax {
            kind,
            mark,
            span: SourceSpan::from((mark.index, 0)),
        }
    }

    pub(crate) fn unknown_anchor(name: &str, mark: Mark) -> Self {
        Self::UnknownAnchor {
            name: name.to_string(),
            mark,
            span: SourceSpan::from((mark.index, name.len() + 1)),
        }
    }

    /// The source position the error refers to, if any.
    pub fn mark(&self) -> Option<Mark> {
        match self {
            Self::Syntax { mark, .. } | Self::UnknownAnchor { mark, .. } => Some(*mark),
            Self::Encode(_) | Self::Io(_) => None,
        }
    }

    /// The syntax error kind, for `Error::Syntax`.
    pub fn syntax_kind(&self) -> Option<&SyntaxErrorKind> {
        match self {
            Self::Syntax { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_one_based() {
        let mark = Mark {
            index: 10,
            line: 2,
            column: 4,
        };
        let err = Error::syntax(SyntaxErrorKind::UnterminatedQuoted, mark);
        assert_eq!(
            err.to_string(),
            "unterminated quoted scalar at line 3 column 5"
        );
        assert_eq!(err.mark(), Some(mark));
    }

    #[test]
    fn unknown_anchor_span_covers_alias() {
        let err = Error::unknown_anchor("base", Mark::default());
        match err {
            Error::UnknownAnchor { span, .. } => assert_eq!(span.len(), 5),
            other => panic!("unexpected error: {other}"),
        }
    }
}
