//! Lexer: turns source text into a lazy stream of [`Token`]s.
//!
//! Whitespace between tokens is collected as a gap of blank lines and
//! whole-line comments. That gap is the single source for both comment
//! grouping (head/foot) and blank-line spacing; it is split when the next
//! token is queued.

use alloc::borrow::Cow;
use alloc::collections::VecDeque;
use core::mem;

use crate::error::{Error, Mark, SyntaxErrorKind};
use crate::event::{Comments, ScalarStyle};

/// Simple keys further than this from their `:` are not keys.
const MAX_SIMPLE_KEY_LENGTH: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    StreamStart,
    StreamEnd,
    VersionDirective { major: u32, minor: u32 },
    TagDirective { handle: String, prefix: String },
    DocumentStart,
    DocumentEnd,
    BlockSequenceStart,
    BlockMappingStart,
    BlockEnd,
    FlowSequenceStart,
    FlowSequenceEnd,
    FlowMappingStart,
    FlowMappingEnd,
    BlockEntry,
    FlowEntry,
    Key,
    Value,
    Alias(String),
    Anchor(String),
    /// Tag as written, e.g. `!!str`, `!local`, `!e!tag`, `!<verbatim>`.
    Tag(String),
    Scalar { value: String, style: ScalarStyle },
}

/// A lexical token.
///
/// `comments.foot` belongs to the node before this token; for `BlockEnd` it
/// is the foot of the closing collection's last child. `blank_lines_before`
/// on a `BlockEnd` is the run between the last child and the close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: Mark,
    pub end: Mark,
    pub blank_lines_before: usize,
    pub comments: Comments,
}

impl Token {
    fn new(kind: TokenKind, start: Mark, end: Mark) -> Self {
        Self {
            kind,
            start,
            end,
            blank_lines_before: 0,
            comments: Comments::default(),
        }
    }

    /// Move the gap-derived fields (head, foot, blank lines) into `other`.
    fn hand_gap_to(&mut self, other: &mut Token) {
        other.blank_lines_before = mem::take(&mut self.blank_lines_before);
        other.comments.head = mem::take(&mut self.comments.head);
        other.comments.foot = mem::take(&mut self.comments.foot);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum GapLine {
    Blank,
    Comment { column: usize, text: String },
}

/// Render gap lines as comment text. Blank lines become empty lines only when
/// preserving.
fn render_gap(lines: &[GapLine], preserve: bool) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in lines {
        match line {
            GapLine::Comment { text, .. } => out.push(text),
            GapLine::Blank if preserve => out.push(""),
            GapLine::Blank => {}
        }
    }
    if out.iter().all(|l| l.is_empty()) {
        return String::new();
    }
    out.join("\n")
}

#[derive(Debug, Clone, Copy, Default)]
struct SimpleKey {
    possible: bool,
    required: bool,
    token_number: usize,
    mark: Mark,
}

#[derive(Debug, Clone, Copy)]
struct Position {
    pos: usize,
    line: usize,
    column: usize,
    line_start: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chomping {
    Strip,
    Clip,
    Keep,
}

fn is_break(c: Option<char>) -> bool {
    matches!(c, Some('\n' | '\r'))
}

fn is_blank(c: Option<char>) -> bool {
    matches!(c, Some(' ' | '\t'))
}

fn is_blankz(c: Option<char>) -> bool {
    c.is_none() || is_blank(c) || is_break(c)
}

fn is_flow_indicator(c: Option<char>) -> bool {
    matches!(c, Some(',' | '[' | ']' | '{' | '}'))
}

/// Lazy tokenizer over a string slice.
pub struct Scanner<'a> {
    input: Cow<'a, str>,
    pos: usize,
    line: usize,
    column: usize,
    line_start: usize,
    preserve: bool,
    tokens: VecDeque<Token>,
    tokens_taken: usize,
    stream_start_produced: bool,
    stream_end_produced: bool,
    failed: bool,
    indent: isize,
    indents: Vec<isize>,
    flow_level: usize,
    simple_key_allowed: bool,
    simple_keys: Vec<SimpleKey>,
    /// A `:` directly after a quoted scalar or flow end is a value indicator.
    adjacent_value_allowed: bool,
    gap: Vec<GapLine>,
}

impl<'a> Scanner<'a> {
    /// Create a scanner. With `preserve_blank_lines` off, every token reports
    /// zero blank lines and comment text carries no empty lines.
    pub fn new(input: impl Into<Cow<'a, str>>, preserve_blank_lines: bool) -> Self {
        Self {
            input: input.into(),
            pos: 0,
            line: 0,
            column: 0,
            line_start: 0,
            preserve: preserve_blank_lines,
            tokens: VecDeque::new(),
            tokens_taken: 0,
            stream_start_produced: false,
            stream_end_produced: false,
            failed: false,
            indent: -1,
            indents: Vec::new(),
            flow_level: 0,
            simple_key_allowed: false,
            simple_keys: vec![SimpleKey::default()],
            adjacent_value_allowed: false,
            gap: Vec::new(),
        }
    }

    fn mark(&self) -> Mark {
        Mark {
            index: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(n)
    }

    fn column_isize(&self) -> isize {
        isize::try_from(self.column).unwrap_or(isize::MAX)
    }

    fn advance(&mut self) {
        let Some(c) = self.peek() else {
            return;
        };
        self.pos += c.len_utf8();
        match c {
            '\r' if self.peek() == Some('\n') => {}
            '\n' | '\r' => {
                self.line += 1;
                self.column = 0;
                self.line_start = self.pos;
            }
            _ => self.column += 1,
        }
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    /// Consume one line break (`\n`, `\r` or `\r\n`).
    fn skip_break(&mut self) {
        if self.peek() == Some('\r') {
            self.advance();
        }
        if self.peek() == Some('\n') {
            self.advance();
        }
    }

    fn save(&self) -> Position {
        Position {
            pos: self.pos,
            line: self.line,
            column: self.column,
            line_start: self.line_start,
        }
    }

    fn restore(&mut self, saved: Position) {
        self.pos = saved.pos;
        self.line = saved.line;
        self.column = saved.column;
        self.line_start = saved.line_start;
    }

    /// Only whitespace precedes the cursor on the current line.
    fn at_line_start(&self) -> bool {
        self.input[self.line_start..self.pos]
            .chars()
            .all(|c| c == ' ' || c == '\t')
    }

    fn at_document_indicator(&self) -> bool {
        if self.column != 0 {
            return false;
        }
        let rest = &self.input[self.pos..];
        (rest.starts_with("---") || rest.starts_with("..."))
            && is_blankz(rest[3..].chars().next())
    }

    fn error(&self, kind: SyntaxErrorKind) -> Error {
        Error::syntax(kind, self.mark())
    }

    /// Queue a token, splitting the pending gap into the previous node's foot,
    /// the blank run and this token's head comment.
    fn push_token(&mut self, kind: TokenKind, start: Mark, end: Mark) {
        let mut token = Token::new(kind, start, end);
        let gap = mem::take(&mut self.gap);
        // Comment lines directly under the previous node are its foot only
        // when a blank line separates them from what follows.
        let foot_len = gap
            .iter()
            .position(|l| *l == GapLine::Blank)
            .unwrap_or(0);
        let rest = &gap[foot_len..];
        let blanks = rest.iter().take_while(|l| **l == GapLine::Blank).count();
        token.comments.foot = render_gap(&gap[..foot_len], self.preserve);
        token.comments.head = render_gap(&rest[blanks..], self.preserve);
        if self.preserve {
            token.blank_lines_before = blanks;
        }
        tracing::trace!(kind = ?token.kind, blanks = token.blank_lines_before, "token");
        self.tokens.push_back(token);
    }

    /// Insert a token in front of an already queued one, taking over that
    /// token's gap.
    fn insert_token(&mut self, index: usize, kind: TokenKind, mark: Mark) {
        let mut token = Token::new(kind, mark, mark);
        if let Some(existing) = self.tokens.get_mut(index) {
            existing.hand_gap_to(&mut token);
        }
        self.tokens.insert(index, token);
    }

    fn fetch_more_tokens(&mut self) -> Result<(), Error> {
        loop {
            if self.stream_end_produced {
                return Ok(());
            }
            // Keep one token of lookahead so a trailing comment is attached
            // before its token is handed out.
            let mut need_more = self.tokens.len() < 2;
            if !need_more {
                self.stale_simple_keys()?;
                need_more = self
                    .simple_keys
                    .iter()
                    .any(|k| k.possible && k.token_number == self.tokens_taken);
            }
            if !need_more {
                return Ok(());
            }
            self.fetch_next_token()?;
        }
    }

    fn fetch_next_token(&mut self) -> Result<(), Error> {
        if !self.stream_start_produced {
            self.fetch_stream_start();
            return Ok(());
        }
        self.scan_to_next_token()?;
        self.stale_simple_keys()?;
        self.unroll_indent(self.column_isize());

        let Some(c) = self.peek() else {
            return self.fetch_stream_end();
        };
        if self.column == 0 && c == '%' {
            return self.fetch_directive();
        }
        if self.at_document_indicator() {
            let kind = if c == '-' {
                TokenKind::DocumentStart
            } else {
                TokenKind::DocumentEnd
            };
            return self.fetch_document_indicator(kind);
        }

        let next = self.peek_at(1);
        let adjacent_value = mem::take(&mut self.adjacent_value_allowed);
        match c {
            '[' => self.fetch_flow_collection_start(TokenKind::FlowSequenceStart),
            '{' => self.fetch_flow_collection_start(TokenKind::FlowMappingStart),
            ']' => self.fetch_flow_collection_end(TokenKind::FlowSequenceEnd),
            '}' => self.fetch_flow_collection_end(TokenKind::FlowMappingEnd),
            ',' => self.fetch_flow_entry(),
            '-' if is_blankz(next) => self.fetch_block_entry(),
            '?' if is_blankz(next) => self.fetch_key(),
            ':' if is_blankz(next)
                || (self.flow_level > 0 && (is_flow_indicator(next) || adjacent_value)) =>
            {
                self.fetch_value()
            }
            '*' => self.fetch_anchor(true),
            '&' => self.fetch_anchor(false),
            '!' => self.fetch_tag(),
            '|' if self.flow_level == 0 => self.fetch_block_scalar(ScalarStyle::Literal),
            '>' if self.flow_level == 0 => self.fetch_block_scalar(ScalarStyle::Folded),
            '\'' => self.fetch_quoted_scalar(true),
            '"' => self.fetch_quoted_scalar(false),
            _ if self.is_plain_start(c, next) => self.fetch_plain_scalar(),
            _ => Err(self.error(SyntaxErrorKind::UnexpectedChar(c))),
        }
    }

    fn is_plain_start(&self, c: char, next: Option<char>) -> bool {
        match c {
            '-' | '?' | ':' => {
                !is_blankz(next) && !(self.flow_level > 0 && is_flow_indicator(next))
            }
            ',' | '[' | ']' | '{' | '}' | '#' | '&' | '*' | '!' | '|' | '>' | '\'' | '"'
            | '%' | '@' | '`' => false,
            _ => !is_blankz(Some(c)),
        }
    }

    /// Skip whitespace, line breaks and comments up to the next token,
    /// recording blank lines and whole-line comments in the gap.
    fn scan_to_next_token(&mut self) -> Result<(), Error> {
        loop {
            let mut tab_in_indent = false;
            while is_blank(self.peek()) {
                if self.peek() == Some('\t') && self.at_line_start() {
                    tab_in_indent = true;
                }
                self.advance();
            }

            if self.peek() == Some('#') {
                let column = self.column;
                let whole_line = self.at_line_start();
                let start = self.pos;
                while !is_break(self.peek()) && self.peek().is_some() {
                    self.advance();
                }
                let text = self.input[start..self.pos].trim_end().to_string();
                if whole_line {
                    self.gap.push(GapLine::Comment { column, text });
                } else {
                    self.attach_line_comment(text);
                }
            }

            if is_break(self.peek()) {
                if self.at_line_start() && self.flow_level == 0 {
                    self.gap.push(GapLine::Blank);
                }
                self.skip_break();
                if self.flow_level == 0 {
                    self.simple_key_allowed = true;
                }
                continue;
            }

            if tab_in_indent && self.flow_level == 0 && self.peek().is_some() {
                return Err(self.error(SyntaxErrorKind::TabIndentation));
            }
            return Ok(());
        }
    }

    fn attach_line_comment(&mut self, text: String) {
        match self.tokens.back_mut() {
            Some(token) if token.comments.line.is_empty() => token.comments.line = text,
            Some(token) => {
                token.comments.line.push(' ');
                token.comments.line.push_str(&text);
            }
            None => self.gap.push(GapLine::Comment {
                column: self.column,
                text,
            }),
        }
    }

    fn stale_simple_keys(&mut self) -> Result<(), Error> {
        let (line, pos) = (self.line, self.pos);
        for key in &mut self.simple_keys {
            if key.possible
                && (key.mark.line < line || key.mark.index + MAX_SIMPLE_KEY_LENGTH < pos)
            {
                if key.required {
                    return Err(Error::syntax(SyntaxErrorKind::MissingValue, key.mark));
                }
                key.possible = false;
            }
        }
        Ok(())
    }

    fn save_simple_key(&mut self) -> Result<(), Error> {
        if !self.simple_key_allowed {
            return Ok(());
        }
        let key = SimpleKey {
            possible: true,
            required: self.flow_level == 0 && self.indent == self.column_isize(),
            token_number: self.tokens_taken + self.tokens.len(),
            mark: self.mark(),
        };
        self.remove_simple_key()?;
        if let Some(last) = self.simple_keys.last_mut() {
            *last = key;
        }
        Ok(())
    }

    fn remove_simple_key(&mut self) -> Result<(), Error> {
        if let Some(key) = self.simple_keys.last_mut() {
            if key.possible && key.required {
                return Err(Error::syntax(SyntaxErrorKind::MissingValue, key.mark));
            }
            key.possible = false;
        }
        Ok(())
    }

    /// Open a block collection if `column` is deeper than the current indent.
    /// `token_number` places the start token in front of a queued simple key.
    fn roll_indent(
        &mut self,
        column: usize,
        token_number: Option<usize>,
        kind: TokenKind,
        mark: Mark,
    ) {
        if self.flow_level > 0 {
            return;
        }
        let column = isize::try_from(column).unwrap_or(isize::MAX);
        if self.indent < column {
            self.indents.push(self.indent);
            self.indent = column;
            match token_number {
                Some(number) => self.insert_token(number - self.tokens_taken, kind, mark),
                None => self.push_token(kind, mark, mark),
            }
        }
    }

    /// Close every block collection indented deeper than `column`. Each close
    /// takes the comment lines at or beyond its own indentation as the foot of
    /// its last child. At a document boundary (`column == -1`) the outermost
    /// close also takes the trailing blank run.
    fn unroll_indent(&mut self, column: isize) {
        if self.flow_level > 0 {
            return;
        }
        while self.indent > column {
            let level = usize::try_from(self.indent).unwrap_or(0);
            let mut taken = 0;
            for (i, line) in self.gap.iter().enumerate() {
                match line {
                    GapLine::Blank => {}
                    GapLine::Comment { column, .. } if *column >= level => taken = i + 1,
                    GapLine::Comment { .. } => break,
                }
            }
            let foot: Vec<GapLine> = self.gap.drain(..taken).collect();
            self.indent = self.indents.pop().unwrap_or(-1);

            let mark = self.mark();
            let mut token = Token::new(TokenKind::BlockEnd, mark, mark);
            token.comments.foot = render_gap(&foot, self.preserve);
            if column < 0 && self.indent < 0 {
                let blanks = self.gap.iter().take_while(|l| **l == GapLine::Blank).count();
                self.gap.drain(..blanks);
                if self.preserve {
                    token.blank_lines_before = blanks;
                }
            }
            self.tokens.push_back(token);
        }
    }

    fn fetch_stream_start(&mut self) {
        if self.peek() == Some('\u{feff}') {
            self.pos += '\u{feff}'.len_utf8();
            self.line_start = self.pos;
        }
        self.indent = -1;
        self.simple_key_allowed = true;
        self.stream_start_produced = true;
        let mark = self.mark();
        self.push_token(TokenKind::StreamStart, mark, mark);
    }

    fn fetch_stream_end(&mut self) -> Result<(), Error> {
        if self.column != 0 {
            self.column = 0;
            self.line += 1;
        }
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let mark = self.mark();
        self.push_token(TokenKind::StreamEnd, mark, mark);
        self.stream_end_produced = true;
        Ok(())
    }

    fn fetch_directive(&mut self) -> Result<(), Error> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let start = self.mark();
        let kind = self.scan_directive()?;
        let end = self.mark();
        self.push_token(kind, start, end);
        Ok(())
    }

    fn fetch_document_indicator(&mut self, kind: TokenKind) -> Result<(), Error> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let start = self.mark();
        self.advance_by(3);
        let end = self.mark();
        self.push_token(kind, start, end);
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, kind: TokenKind) -> Result<(), Error> {
        self.save_simple_key()?;
        self.simple_keys.push(SimpleKey::default());
        self.flow_level += 1;
        self.simple_key_allowed = true;
        let start = self.mark();
        self.advance();
        let end = self.mark();
        self.push_token(kind, start, end);
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, kind: TokenKind) -> Result<(), Error> {
        self.remove_simple_key()?;
        if self.flow_level > 0 {
            self.flow_level -= 1;
            self.simple_keys.pop();
        }
        self.simple_key_allowed = false;
        self.adjacent_value_allowed = true;
        let start = self.mark();
        self.advance();
        let end = self.mark();
        self.push_token(kind, start, end);
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> Result<(), Error> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let start = self.mark();
        self.advance();
        let end = self.mark();
        self.push_token(TokenKind::FlowEntry, start, end);
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> Result<(), Error> {
        let start = self.mark();
        if self.flow_level > 0 {
            return Err(self.error(SyntaxErrorKind::UnexpectedBlockEntry));
        }
        if !self.simple_key_allowed {
            return Err(self.error(SyntaxErrorKind::UnexpectedBlockEntry));
        }
        self.roll_indent(self.column, None, TokenKind::BlockSequenceStart, start);
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        self.advance();
        let end = self.mark();
        self.push_token(TokenKind::BlockEntry, start, end);
        Ok(())
    }

    fn fetch_key(&mut self) -> Result<(), Error> {
        let start = self.mark();
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return Err(self.error(SyntaxErrorKind::UnexpectedValue));
            }
            self.roll_indent(self.column, None, TokenKind::BlockMappingStart, start);
        }
        self.remove_simple_key()?;
        self.simple_key_allowed = self.flow_level == 0;
        self.advance();
        let end = self.mark();
        self.push_token(TokenKind::Key, start, end);
        Ok(())
    }

    fn fetch_value(&mut self) -> Result<(), Error> {
        let start = self.mark();
        let key = self.simple_keys.last().copied().unwrap_or_default();
        if key.possible {
            let index = key.token_number - self.tokens_taken;
            self.insert_token(index, TokenKind::Key, key.mark);
            self.roll_indent(
                key.mark.column,
                Some(key.token_number),
                TokenKind::BlockMappingStart,
                key.mark,
            );
            if let Some(last) = self.simple_keys.last_mut() {
                last.possible = false;
            }
            self.simple_key_allowed = false;
        } else {
            if self.flow_level == 0 {
                if !self.simple_key_allowed {
                    return Err(self.error(SyntaxErrorKind::UnexpectedValue));
                }
                self.roll_indent(self.column, None, TokenKind::BlockMappingStart, start);
            }
            self.simple_key_allowed = self.flow_level == 0;
        }
        self.advance();
        let end = self.mark();
        self.push_token(TokenKind::Value, start, end);
        Ok(())
    }

    fn fetch_anchor(&mut self, alias: bool) -> Result<(), Error> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let start = self.mark();
        self.advance();
        let name_start = self.pos;
        while !is_blankz(self.peek()) && !is_flow_indicator(self.peek()) {
            self.advance();
        }
        let name = self.input[name_start..self.pos].to_string();
        if name.is_empty() {
            return Err(Error::syntax(SyntaxErrorKind::EmptyAnchor, start));
        }
        let end = self.mark();
        let kind = if alias {
            TokenKind::Alias(name)
        } else {
            TokenKind::Anchor(name)
        };
        self.push_token(kind, start, end);
        Ok(())
    }

    fn fetch_tag(&mut self) -> Result<(), Error> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let start = self.mark();
        let tag_start = self.pos;
        self.advance();
        if self.peek() == Some('<') {
            while self.peek() != Some('>') {
                if is_blankz(self.peek()) {
                    return Err(self.error(SyntaxErrorKind::MalformedTag));
                }
                self.advance();
            }
            self.advance();
        } else {
            while !is_blankz(self.peek())
                && !(self.flow_level > 0 && is_flow_indicator(self.peek()))
            {
                self.advance();
            }
        }
        if !is_blankz(self.peek()) && !is_flow_indicator(self.peek()) {
            return Err(self.error(SyntaxErrorKind::MalformedTag));
        }
        let tag = self.input[tag_start..self.pos].to_string();
        let end = self.mark();
        self.push_token(TokenKind::Tag(tag), start, end);
        Ok(())
    }

    fn scan_directive(&mut self) -> Result<TokenKind, Error> {
        self.advance();
        let name_start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            self.advance();
        }
        let name = self.input[name_start..self.pos].to_string();
        let kind = match name.as_str() {
            "YAML" => {
                self.skip_blanks();
                let major = self.scan_number("YAML")?;
                if self.peek() != Some('.') {
                    return Err(self.error(SyntaxErrorKind::MalformedDirective("YAML")));
                }
                self.advance();
                let minor = self.scan_number("YAML")?;
                TokenKind::VersionDirective { major, minor }
            }
            "TAG" => {
                self.skip_blanks();
                let handle = self.scan_word("TAG")?;
                if !handle.starts_with('!') || !handle.ends_with('!') {
                    return Err(self.error(SyntaxErrorKind::MalformedDirective("TAG")));
                }
                self.skip_blanks();
                let prefix = self.scan_word("TAG")?;
                TokenKind::TagDirective { handle, prefix }
            }
            _ => return Err(self.error(SyntaxErrorKind::UnknownDirective(name))),
        };
        self.skip_blanks();
        if !is_blankz(self.peek()) && self.peek() != Some('#') {
            return Err(self.error(SyntaxErrorKind::MalformedDirective(
                if matches!(kind, TokenKind::TagDirective { .. }) {
                    "TAG"
                } else {
                    "YAML"
                },
            )));
        }
        Ok(kind)
    }

    fn skip_blanks(&mut self) {
        while is_blank(self.peek()) {
            self.advance();
        }
    }

    fn scan_number(&mut self, directive: &'static str) -> Result<u32, Error> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        self.input[start..self.pos]
            .parse()
            .map_err(|_| self.error(SyntaxErrorKind::MalformedDirective(directive)))
    }

    fn scan_word(&mut self, directive: &'static str) -> Result<String, Error> {
        let start = self.pos;
        while !is_blankz(self.peek()) {
            self.advance();
        }
        if start == self.pos {
            return Err(self.error(SyntaxErrorKind::MalformedDirective(directive)));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn fetch_plain_scalar(&mut self) -> Result<(), Error> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let start = self.mark();
        let (value, end) = self.scan_plain_scalar();
        self.push_token(
            TokenKind::Scalar {
                value,
                style: ScalarStyle::Plain,
            },
            start,
            end,
        );
        Ok(())
    }

    /// Scan a plain scalar, folding continuation lines. Whitespace read past
    /// the last content character is given back so the gap scanner sees it.
    fn scan_plain_scalar(&mut self) -> (String, Mark) {
        let indent = self.indent + 1;
        let mut value = String::new();
        let mut whitespace = String::new();
        let mut trailing_breaks = 0usize;
        let mut leading_blanks = false;
        let mut end = self.mark();
        let mut uncommitted: Option<Position> = None;

        loop {
            if self.at_document_indicator() || self.peek() == Some('#') {
                break;
            }
            while let Some(c) = self.peek().filter(|c| !is_blankz(Some(*c))) {
                let next = self.peek_at(1);
                if c == ':'
                    && (is_blankz(next) || (self.flow_level > 0 && is_flow_indicator(next)))
                {
                    break;
                }
                if self.flow_level > 0 && is_flow_indicator(Some(c)) {
                    break;
                }
                uncommitted = None;
                if leading_blanks {
                    if trailing_breaks == 0 {
                        value.push(' ');
                    } else {
                        value.extend(core::iter::repeat_n('\n', trailing_breaks));
                    }
                    trailing_breaks = 0;
                    leading_blanks = false;
                } else {
                    value.push_str(&whitespace);
                }
                whitespace.clear();
                value.push(c);
                self.advance();
                end = self.mark();
            }
            if !is_blank(self.peek()) && !is_break(self.peek()) {
                break;
            }
            if uncommitted.is_none() {
                uncommitted = Some(self.save());
            }
            while is_blank(self.peek()) || is_break(self.peek()) {
                if is_blank(self.peek()) {
                    if !leading_blanks {
                        whitespace.push(self.peek().unwrap_or(' '));
                    }
                    self.advance();
                } else {
                    if leading_blanks {
                        trailing_breaks += 1;
                    } else {
                        whitespace.clear();
                        leading_blanks = true;
                    }
                    self.skip_break();
                }
            }
            if self.flow_level == 0 && self.column_isize() < indent {
                break;
            }
        }
        if let Some(saved) = uncommitted {
            self.restore(saved);
        }
        (value, end)
    }

    fn fetch_quoted_scalar(&mut self, single: bool) -> Result<(), Error> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let start = self.mark();
        let value = self.scan_quoted_scalar(single, start)?;
        let end = self.mark();
        self.adjacent_value_allowed = true;
        let style = if single {
            ScalarStyle::SingleQuoted
        } else {
            ScalarStyle::DoubleQuoted
        };
        self.push_token(TokenKind::Scalar { value, style }, start, end);
        Ok(())
    }

    fn scan_quoted_scalar(&mut self, single: bool, start: Mark) -> Result<String, Error> {
        let quote = if single { '\'' } else { '"' };
        let unterminated = || Error::syntax(SyntaxErrorKind::UnterminatedQuoted, start);
        self.advance();
        let mut value = String::new();
        loop {
            if self.peek().is_none() || self.at_document_indicator() {
                return Err(unterminated());
            }
            let mut escaped_break = false;
            while let Some(c) = self.peek().filter(|c| !is_blankz(Some(*c))) {
                if single && c == '\'' && self.peek_at(1) == Some('\'') {
                    value.push('\'');
                    self.advance_by(2);
                } else if c == quote {
                    break;
                } else if !single && c == '\\' && is_break(self.peek_at(1)) {
                    self.advance();
                    self.skip_break();
                    escaped_break = true;
                    break;
                } else if !single && c == '\\' {
                    value.push(self.scan_escape()?);
                } else {
                    value.push(c);
                    self.advance();
                }
            }
            if self.peek() == Some(quote) {
                break;
            }

            let mut whitespace = String::new();
            let mut breaks = 0usize;
            while is_blank(self.peek()) || is_break(self.peek()) {
                if is_blank(self.peek()) {
                    if breaks == 0 && !escaped_break {
                        whitespace.push(self.peek().unwrap_or(' '));
                    }
                    self.advance();
                } else {
                    breaks += 1;
                    self.skip_break();
                }
            }
            if self.peek().is_none() {
                return Err(unterminated());
            }
            if escaped_break {
                value.extend(core::iter::repeat_n('\n', breaks));
            } else if breaks == 0 {
                value.push_str(&whitespace);
            } else if breaks == 1 {
                value.push(' ');
            } else {
                value.extend(core::iter::repeat_n('\n', breaks - 1));
            }
        }
        self.advance();
        Ok(value)
    }

    fn scan_escape(&mut self) -> Result<char, Error> {
        self.advance();
        let Some(c) = self.peek() else {
            return Err(self.error(SyntaxErrorKind::UnterminatedQuoted));
        };
        let simple = match c {
            '0' => Some('\0'),
            'a' => Some('\u{07}'),
            'b' => Some('\u{08}'),
            't' | '\t' => Some('\t'),
            'n' => Some('\n'),
            'v' => Some('\u{0b}'),
            'f' => Some('\u{0c}'),
            'r' => Some('\r'),
            'e' => Some('\u{1b}'),
            ' ' => Some(' '),
            '"' => Some('"'),
            '/' => Some('/'),
            '\\' => Some('\\'),
            'N' => Some('\u{85}'),
            '_' => Some('\u{a0}'),
            'L' => Some('\u{2028}'),
            'P' => Some('\u{2029}'),
            _ => None,
        };
        if let Some(ch) = simple {
            self.advance();
            return Ok(ch);
        }
        let width = match c {
            'x' => 2,
            'u' => 4,
            'U' => 8,
            _ => return Err(self.error(SyntaxErrorKind::InvalidEscape(c))),
        };
        self.advance();
        let start = self.pos;
        for _ in 0..width {
            if !self.peek().is_some_and(|h| h.is_ascii_hexdigit()) {
                return Err(self.error(SyntaxErrorKind::InvalidEscape(c)));
            }
            self.advance();
        }
        u32::from_str_radix(&self.input[start..self.pos], 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error(SyntaxErrorKind::InvalidEscape(c)))
    }

    fn fetch_block_scalar(&mut self, style: ScalarStyle) -> Result<(), Error> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let start = self.mark();
        let (value, line_comment, trailing_blanks) = self.scan_block_scalar(style)?;
        let end = self.mark();
        self.push_token(TokenKind::Scalar { value, style }, start, end);
        if let Some(token) = self.tokens.back_mut() {
            token.comments.line = line_comment;
        }
        self.gap
            .extend(core::iter::repeat_n(GapLine::Blank, trailing_blanks));
        Ok(())
    }

    fn scan_block_header(&mut self) -> Result<(Chomping, usize, String), Error> {
        let mut chomping = Chomping::Clip;
        let mut increment = 0;
        for _ in 0..2 {
            match self.peek() {
                Some('+') if chomping == Chomping::Clip => chomping = Chomping::Keep,
                Some('-') if chomping == Chomping::Clip => chomping = Chomping::Strip,
                Some(d @ '1'..='9') if increment == 0 => {
                    increment = d.to_digit(10).map_or(0, |n| n as usize);
                }
                _ => break,
            }
            self.advance();
        }
        self.skip_blanks();
        let mut comment = String::new();
        if self.peek() == Some('#') {
            let start = self.pos;
            while !is_break(self.peek()) && self.peek().is_some() {
                self.advance();
            }
            comment = self.input[start..self.pos].trim_end().to_string();
        }
        if !is_break(self.peek()) && self.peek().is_some() {
            return Err(self.error(SyntaxErrorKind::InvalidBlockHeader));
        }
        self.skip_break();
        Ok((chomping, increment, comment))
    }

    /// Skip indentation and empty lines before block scalar content, counting
    /// the line breaks. With `indent == 0` the indentation is detected.
    fn scan_block_breaks(&mut self, indent: &mut usize, min_indent: usize) -> usize {
        let mut breaks = 0;
        let mut max_indent = 0;
        loop {
            while (*indent == 0 || self.column < *indent) && self.peek() == Some(' ') {
                self.advance();
            }
            max_indent = max_indent.max(self.column);
            if !is_break(self.peek()) {
                break;
            }
            breaks += 1;
            self.skip_break();
        }
        if *indent == 0 {
            *indent = max_indent.max(min_indent).max(1);
        }
        breaks
    }

    /// Returns the value, the header comment and the number of blank lines
    /// after the content that chomping removed from the value.
    fn scan_block_scalar(&mut self, style: ScalarStyle) -> Result<(String, String, usize), Error> {
        self.advance();
        let (chomping, increment, comment) = self.scan_block_header()?;
        let parent = usize::try_from(self.indent).unwrap_or(0);
        let min_indent = if self.indent < 0 { 1 } else { parent + 1 };
        let mut indent = if increment > 0 {
            if self.indent < 0 {
                increment
            } else {
                parent + increment
            }
        } else {
            0
        };

        let mut value = String::new();
        let mut leading_break = false;
        let mut leading_blank = false;
        let mut trailing_breaks = self.scan_block_breaks(&mut indent, min_indent);

        while self.column == indent && self.peek().is_some() {
            let trailing_blank = is_blank(self.peek());
            if style == ScalarStyle::Folded
                && leading_break
                && !leading_blank
                && !trailing_blank
            {
                if trailing_breaks == 0 {
                    value.push(' ');
                }
            } else if leading_break {
                value.push('\n');
            }
            value.extend(core::iter::repeat_n('\n', trailing_breaks));
            leading_blank = trailing_blank;

            let start = self.pos;
            while !is_break(self.peek()) && self.peek().is_some() {
                self.advance();
            }
            value.push_str(&self.input[start..self.pos]);
            if self.peek().is_none() {
                leading_break = false;
                trailing_breaks = 0;
                break;
            }
            self.skip_break();
            leading_break = true;
            trailing_breaks = self.scan_block_breaks(&mut indent, min_indent);
        }

        let mut removed = 0;
        if chomping != Chomping::Strip && leading_break {
            value.push('\n');
        }
        if chomping == Chomping::Keep {
            value.extend(core::iter::repeat_n('\n', trailing_breaks));
        } else {
            removed = trailing_breaks;
        }
        Ok((value, comment, removed))
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Token, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || (self.stream_end_produced && self.tokens.is_empty()) {
            return None;
        }
        if let Err(err) = self.fetch_more_tokens() {
            self.failed = true;
            return Some(Err(err));
        }
        let token = self.tokens.pop_front()?;
        self.tokens_taken += 1;
        Some(Ok(token))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn tokens(input: &str, preserve: bool) -> Vec<Token> {
        Scanner::new(input, preserve)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokens(input, false).into_iter().map(|t| t.kind).collect()
    }

    fn plain(value: &str) -> TokenKind {
        TokenKind::Scalar {
            value: value.to_string(),
            style: ScalarStyle::Plain,
        }
    }

    #[test]
    fn simple_mapping_tokens() {
        assert_eq!(
            kinds("a: 1\nb: 2\n"),
            vec![
                TokenKind::StreamStart,
                TokenKind::BlockMappingStart,
                TokenKind::Key,
                plain("a"),
                TokenKind::Value,
                plain("1"),
                TokenKind::Key,
                plain("b"),
                TokenKind::Value,
                plain("2"),
                TokenKind::BlockEnd,
                TokenKind::StreamEnd,
            ]
        );
    }

    #[test]
    fn blank_lines_land_on_the_key_token() {
        let toks = tokens("key1: value1\n\n\nkey2: value2\n", true);
        let key2 = toks
            .iter()
            .position(|t| t.kind == plain("key2"))
            .unwrap();
        assert_eq!(toks[key2 - 1].kind, TokenKind::Key);
        assert_eq!(toks[key2 - 1].blank_lines_before, 2);
        assert!(toks.iter().filter(|t| t.blank_lines_before > 0).count() == 1);
    }

    #[test]
    fn disabled_mode_reports_zero() {
        let toks = tokens("key1: value1\n\n\nkey2: value2\n", false);
        assert!(toks.iter().all(|t| t.blank_lines_before == 0));
    }

    #[test]
    fn comment_line_resets_the_blank_run() {
        let toks = tokens("a: 1\n\n# c\nb: 2\n", true);
        let key = toks
            .iter()
            .filter(|t| t.kind == TokenKind::Key)
            .nth(1)
            .unwrap();
        assert_eq!(key.blank_lines_before, 1);
        assert_eq!(key.comments.head, "# c");
        assert_eq!(key.comments.foot, "");
    }

    #[test]
    fn comment_followed_by_blank_is_a_foot() {
        let toks = tokens("a: 1\n# after a\n\nb: 2\n", true);
        let key = toks
            .iter()
            .filter(|t| t.kind == TokenKind::Key)
            .nth(1)
            .unwrap();
        assert_eq!(key.comments.foot, "# after a");
        assert_eq!(key.blank_lines_before, 1);
        assert_eq!(key.comments.head, "");
    }

    #[test]
    fn flow_blank_lines_are_ignored() {
        let toks = tokens("{a: 1,\n\n\n b: 2}\n", true);
        assert!(toks.iter().all(|t| t.blank_lines_before == 0));
    }

    #[test]
    fn trailing_blank_run_goes_to_outermost_block_end() {
        let toks = tokens("a:\n  b: 1\n\n\n", true);
        let ends: Vec<&Token> = toks
            .iter()
            .filter(|t| t.kind == TokenKind::BlockEnd)
            .collect();
        assert_eq!(ends.len(), 2);
        assert_eq!(ends[0].blank_lines_before, 0);
        assert_eq!(ends[1].blank_lines_before, 2);
    }

    #[test]
    fn line_comment_attaches_to_previous_token() {
        let toks = tokens("a: 1 # one\n", false);
        let one = toks.iter().find(|t| t.kind == plain("1")).unwrap();
        assert_eq!(one.comments.line, "# one");
    }

    #[test]
    fn plain_scalar_folds_lines() {
        assert_eq!(kinds("a b\n  c\n")[1], plain("a b c"));
    }

    #[test]
    fn quoted_scalars() {
        let toks = kinds("- 'it''s'\n- \"a\\tb\\u00e9\"\n");
        assert!(toks.contains(&TokenKind::Scalar {
            value: "it's".into(),
            style: ScalarStyle::SingleQuoted
        }));
        assert!(toks.contains(&TokenKind::Scalar {
            value: "a\tb\u{e9}".into(),
            style: ScalarStyle::DoubleQuoted
        }));
    }

    #[test]
    fn literal_block_scalar_clip_feeds_blank_lines_back() {
        let toks = tokens("a: |\n  x\n  y\n\nb: 1\n", true);
        assert!(toks.iter().any(|t| t.kind
            == TokenKind::Scalar {
                value: "x\ny\n".into(),
                style: ScalarStyle::Literal
            }));
        let key_b = toks
            .iter()
            .filter(|t| t.kind == TokenKind::Key)
            .nth(1)
            .unwrap();
        assert_eq!(key_b.blank_lines_before, 1);
    }

    #[test]
    fn folded_block_scalar_keep() {
        let toks = kinds(">+\n  a\n  b\n\n");
        assert_eq!(
            toks[1],
            TokenKind::Scalar {
                value: "a b\n\n".into(),
                style: ScalarStyle::Folded
            }
        );
    }

    #[test]
    fn directives_and_document_markers() {
        let toks = kinds("%YAML 1.2\n%TAG !e! tag:example.com,2000:\n---\n!e!x a\n...\n");
        assert_eq!(toks[1], TokenKind::VersionDirective { major: 1, minor: 2 });
        assert_eq!(
            toks[2],
            TokenKind::TagDirective {
                handle: "!e!".into(),
                prefix: "tag:example.com,2000:".into()
            }
        );
        assert_eq!(toks[3], TokenKind::DocumentStart);
        assert_eq!(toks[4], TokenKind::Tag("!e!x".into()));
        assert_eq!(toks[6], TokenKind::DocumentEnd);
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        let err = Scanner::new("a: 'open\n", false)
            .collect::<Result<Vec<_>, _>>()
            .unwrap_err();
        assert_eq!(
            err.syntax_kind(),
            Some(&SyntaxErrorKind::UnterminatedQuoted)
        );
    }

    #[test]
    fn unknown_directive_is_an_error() {
        let err = Scanner::new("%FOO bar\n---\na\n", false)
            .collect::<Result<Vec<_>, _>>()
            .unwrap_err();
        assert_eq!(
            err.syntax_kind(),
            Some(&SyntaxErrorKind::UnknownDirective("FOO".into()))
        );
    }
}
