//! Event parser: applies the block/flow grammar to the token stream.
//!
//! Comment and blank-line ownership:
//! - a node start event takes the gap of the first token of its construct,
//!   including indicators (`-`, `?`, `:`) and properties before it; when two
//!   constructs open on the same token the outermost keeps the blank run;
//! - when a node completes, the next token's foot comment moves onto it;
//! - the first node of a document never gets blank lines before it.

use alloc::borrow::Cow;
use core::mem;

use crate::error::{Error, Mark, SyntaxErrorKind};
use crate::event::{CollectionStyle, Event, EventKind, ScalarStyle};
use crate::scanner::{Scanner, Token, TokenKind};

/// Collections may nest this deep before parsing fails.
pub(crate) const MAX_DEPTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    StreamStart,
    ImplicitDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    BlockNode,
    BlockSequenceFirstEntry,
    BlockSequenceEntry,
    IndentlessSequenceEntry,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingValue,
    FlowSequenceFirstEntry,
    FlowSequenceEntry,
    FlowSequenceEntryMappingKey,
    FlowSequenceEntryMappingValue,
    FlowSequenceEntryMappingEnd,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingValue,
    FlowMappingEmptyValue,
    End,
}

/// Gap carried from indicator tokens to the node they introduce.
#[derive(Debug, Default)]
struct Pending {
    blank_lines: usize,
    head: String,
}

impl Pending {
    fn is_empty(&self) -> bool {
        self.blank_lines == 0 && self.head.is_empty()
    }
}

fn push_lines(dst: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !dst.is_empty() {
        dst.push('\n');
    }
    dst.push_str(text);
}

/// Lazy event stream over a [`Scanner`].
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    peeked: Option<Token>,
    state: State,
    states: Vec<State>,
    tag_handles: Vec<(String, String)>,
    pending: Pending,
    first_node_in_document: bool,
    depth: usize,
    failed: bool,
}

impl<'a> Parser<'a> {
    pub fn new(input: impl Into<Cow<'a, str>>, preserve_blank_lines: bool) -> Self {
        Self::from_scanner(Scanner::new(input, preserve_blank_lines))
    }

    pub fn from_scanner(scanner: Scanner<'a>) -> Self {
        Self {
            scanner,
            peeked: None,
            state: State::StreamStart,
            states: Vec::new(),
            tag_handles: Vec::new(),
            pending: Pending::default(),
            first_node_in_document: false,
            depth: 0,
            failed: false,
        }
    }

    fn peek_token(&mut self) -> Result<&mut Token, Error> {
        if self.peeked.is_none() {
            match self.scanner.next() {
                Some(Ok(token)) => self.peeked = Some(token),
                Some(Err(err)) => return Err(err),
                None => {}
            }
        }
        match self.peeked.as_mut() {
            Some(token) => Ok(token),
            None => Err(Error::syntax(SyntaxErrorKind::UnexpectedEnd, Mark::default())),
        }
    }

    fn peek_kind(&mut self) -> Result<&TokenKind, Error> {
        Ok(&self.peek_token()?.kind)
    }

    fn take_token(&mut self) -> Result<Token, Error> {
        self.peek_token()?;
        self.peeked
            .take()
            .ok_or_else(|| Error::syntax(SyntaxErrorKind::UnexpectedEnd, Mark::default()))
    }

    fn pop_state(&mut self) -> State {
        self.states.pop().unwrap_or(State::End)
    }

    fn enter_collection(&mut self, mark: Mark) -> Result<(), Error> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::syntax(SyntaxErrorKind::MaxDepthExceeded(MAX_DEPTH), mark));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave_collection(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Move a token's gap and stray comments into the pending slot.
    ///
    /// Before the first node of a document there is no node to own a foot, so
    /// leading comments and the blank run after them stay one comment block.
    fn absorb(&mut self, token: &mut Token) {
        let blank_lines = mem::take(&mut token.blank_lines_before);
        let foot = mem::take(&mut token.comments.foot);
        let head = mem::take(&mut token.comments.head);
        if self.pending.is_empty() {
            self.pending.blank_lines = blank_lines;
        }
        push_lines(&mut self.pending.head, &foot);
        if self.first_node_in_document && !foot.is_empty() && blank_lines > 0 {
            self.pending.blank_lines = 0;
            self.pending.head.extend(core::iter::repeat_n('\n', blank_lines));
            if !head.is_empty() {
                self.pending.head.push('\n');
                self.pending.head.push_str(&head);
            }
        } else {
            push_lines(&mut self.pending.head, &head);
        }
        if !matches!(token.kind, TokenKind::Scalar { .. } | TokenKind::Alias(_)) {
            let line = mem::take(&mut token.comments.line);
            push_lines(&mut self.pending.head, &line);
        }
    }

    fn absorb_next(&mut self) -> Result<(), Error> {
        self.peek_token()?;
        if let Some(mut token) = self.peeked.take() {
            self.absorb(&mut token);
            self.peeked = Some(token);
        }
        Ok(())
    }

    /// Build a node start event from the pending gap.
    fn node_event(&mut self, kind: EventKind, start: Mark, end: Mark) -> Event {
        let mut event = Event::new(kind, start, end);
        let pending = mem::take(&mut self.pending);
        let first = mem::take(&mut self.first_node_in_document);
        event.blank_lines_before = if first { 0 } else { pending.blank_lines };
        event.comments.head = pending.head;
        event
    }

    /// Attach the next token's foot comment to a completed node. A trailing
    /// comment on the `:` after a key becomes the key's line comment.
    fn finish_node(&mut self, event: &mut Event) -> Result<(), Error> {
        let token = self.peek_token()?;
        let foot = mem::take(&mut token.comments.foot);
        let line = if token.kind == TokenKind::Value && event.comments.line.is_empty() {
            mem::take(&mut token.comments.line)
        } else {
            String::new()
        };
        push_lines(&mut event.comments.foot, &foot);
        if !line.is_empty() {
            event.comments.line = line;
        }
        Ok(())
    }

    fn empty_scalar(&mut self, mark: Mark) -> Result<Event, Error> {
        let mut event = self.node_event(
            EventKind::Scalar {
                anchor: None,
                tag: None,
                value: String::new(),
                style: ScalarStyle::Plain,
            },
            mark,
            mark,
        );
        self.finish_node(&mut event)?;
        Ok(event)
    }

    fn state_machine(&mut self) -> Result<Event, Error> {
        match self.state {
            State::StreamStart => self.parse_stream_start(),
            State::ImplicitDocumentStart => self.parse_document_start(true),
            State::DocumentStart => self.parse_document_start(false),
            State::DocumentContent => self.parse_document_content(),
            State::DocumentEnd => self.parse_document_end(),
            State::BlockNode => self.parse_node(true, false),
            State::BlockSequenceFirstEntry => {
                self.take_token()?;
                self.parse_block_sequence_entry()
            }
            State::BlockSequenceEntry => self.parse_block_sequence_entry(),
            State::IndentlessSequenceEntry => self.parse_indentless_sequence_entry(),
            State::BlockMappingFirstKey => {
                self.take_token()?;
                self.parse_block_mapping_key()
            }
            State::BlockMappingKey => self.parse_block_mapping_key(),
            State::BlockMappingValue => self.parse_block_mapping_value(),
            State::FlowSequenceFirstEntry => {
                self.take_token()?;
                self.parse_flow_sequence_entry(true)
            }
            State::FlowSequenceEntry => self.parse_flow_sequence_entry(false),
            State::FlowSequenceEntryMappingKey => self.parse_flow_sequence_entry_mapping_key(),
            State::FlowSequenceEntryMappingValue => {
                self.parse_flow_sequence_entry_mapping_value()
            }
            State::FlowSequenceEntryMappingEnd => {
                let mark = self.peek_token()?.start;
                self.leave_collection();
                self.state = State::FlowSequenceEntry;
                Ok(Event::new(EventKind::MappingEnd, mark, mark))
            }
            State::FlowMappingFirstKey => {
                self.take_token()?;
                self.parse_flow_mapping_key(true)
            }
            State::FlowMappingKey => self.parse_flow_mapping_key(false),
            State::FlowMappingValue => self.parse_flow_mapping_value(false),
            State::FlowMappingEmptyValue => self.parse_flow_mapping_value(true),
            State::End => Err(Error::syntax(SyntaxErrorKind::UnexpectedEnd, Mark::default())),
        }
    }

    fn parse_stream_start(&mut self) -> Result<Event, Error> {
        let token = self.take_token()?;
        if token.kind != TokenKind::StreamStart {
            return Err(Error::syntax(
                SyntaxErrorKind::Expected("<stream start>"),
                token.start,
            ));
        }
        self.state = State::ImplicitDocumentStart;
        Ok(Event::new(EventKind::StreamStart, token.start, token.end))
    }

    fn parse_document_start(&mut self, implicit: bool) -> Result<Event, Error> {
        if !implicit {
            while *self.peek_kind()? == TokenKind::DocumentEnd {
                self.take_token()?;
            }
        }
        let token = self.peek_token()?;
        let start = token.start;
        let is_stream_end = token.kind == TokenKind::StreamEnd;
        let is_explicit_marker = matches!(
            token.kind,
            TokenKind::VersionDirective { .. }
                | TokenKind::TagDirective { .. }
                | TokenKind::DocumentStart
                | TokenKind::StreamEnd
        );

        if implicit && !is_explicit_marker {
            self.tag_handles.clear();
            self.states.push(State::DocumentEnd);
            self.state = State::BlockNode;
            self.first_node_in_document = true;
            return Ok(Event::new(
                EventKind::DocumentStart {
                    implicit: true,
                    version: None,
                    tags: Vec::new(),
                },
                start,
                start,
            ));
        }

        if is_stream_end {
            let token = self.take_token()?;
            self.state = State::End;
            let mut event = Event::new(EventKind::StreamEnd, token.start, token.end);
            push_lines(&mut event.comments.foot, &token.comments.foot);
            push_lines(&mut event.comments.foot, &token.comments.head);
            return Ok(event);
        }

        let (version, tags) = self.process_directives()?;
        let token = self.take_token()?;
        if token.kind != TokenKind::DocumentStart {
            return Err(Error::syntax(
                SyntaxErrorKind::Expected("<document start>"),
                token.start,
            ));
        }
        self.states.push(State::DocumentEnd);
        self.state = State::DocumentContent;
        self.first_node_in_document = true;
        let mut event = Event::new(
            EventKind::DocumentStart {
                implicit: false,
                version,
                tags,
            },
            start,
            token.end,
        );
        event.comments.head = token.comments.head;
        event.comments.line = token.comments.line;
        Ok(event)
    }

    fn process_directives(&mut self) -> Result<(Option<(u32, u32)>, Vec<(String, String)>), Error> {
        let mut version = None;
        let mut tags = Vec::new();
        loop {
            let token = self.peek_token()?;
            match &token.kind {
                TokenKind::VersionDirective { major, minor } => {
                    if version.is_some() {
                        return Err(Error::syntax(SyntaxErrorKind::DuplicateVersion, token.start));
                    }
                    version = Some((*major, *minor));
                }
                TokenKind::TagDirective { handle, prefix } => {
                    tags.push((handle.clone(), prefix.clone()));
                }
                _ => break,
            }
            self.take_token()?;
        }
        self.tag_handles.clone_from(&tags);
        Ok((version, tags))
    }

    fn parse_document_content(&mut self) -> Result<Event, Error> {
        let token = self.peek_token()?;
        if matches!(
            token.kind,
            TokenKind::VersionDirective { .. }
                | TokenKind::TagDirective { .. }
                | TokenKind::DocumentStart
                | TokenKind::DocumentEnd
                | TokenKind::StreamEnd
        ) {
            let mark = token.start;
            self.state = self.pop_state();
            return self.empty_scalar(mark);
        }
        self.parse_node(true, false)
    }

    /// The trailing comments of a document ride on the token that ends it.
    fn parse_document_end(&mut self) -> Result<Event, Error> {
        let token = self.peek_token()?;
        let start = token.start;
        let mut trailing = mem::take(&mut token.comments.foot);
        let head = mem::take(&mut token.comments.head);
        if !trailing.is_empty() && !head.is_empty() {
            trailing.push_str(&"\n".repeat(token.blank_lines_before));
        }
        push_lines(&mut trailing, &head);
        token.blank_lines_before = 0;

        let mut implicit = true;
        let mut end = start;
        let mut line = String::new();
        if token.kind == TokenKind::DocumentEnd {
            let token = self.take_token()?;
            implicit = false;
            end = token.end;
            line = token.comments.line;
        }
        let pending = mem::take(&mut self.pending);
        let mut foot = pending.head;
        push_lines(&mut foot, &trailing);

        self.tag_handles.clear();
        self.state = State::DocumentStart;
        let mut event = Event::new(EventKind::DocumentEnd { implicit }, start, end);
        event.comments.foot = foot;
        event.comments.line = line;
        Ok(event)
    }

    fn check_tag(&self, tag: &str, mark: Mark) -> Result<(), Error> {
        if tag.starts_with("!<") {
            return Ok(());
        }
        let Some(second) = tag[1..].find('!') else {
            return Ok(());
        };
        let handle = &tag[..second + 2];
        if handle == "!!" || self.tag_handles.iter().any(|(h, _)| h == handle) {
            Ok(())
        } else {
            Err(Error::syntax(
                SyntaxErrorKind::UndefinedTagHandle(handle.to_string()),
                mark,
            ))
        }
    }

    fn parse_node(&mut self, block: bool, indentless: bool) -> Result<Event, Error> {
        if let TokenKind::Alias(_) = self.peek_kind()? {
            let mut token = self.take_token()?;
            self.absorb(&mut token);
            let name = match token.kind {
                TokenKind::Alias(name) => name,
                _ => String::new(),
            };
            self.state = self.pop_state();
            let mut event = self.node_event(EventKind::Alias { name }, token.start, token.end);
            event.comments.line = token.comments.line;
            self.finish_node(&mut event)?;
            return Ok(event);
        }

        let start = self.peek_token()?.start;
        let (anchor, tag, end) = self.parse_properties(start)?;

        match self.peek_kind()?.clone() {
            TokenKind::BlockEntry if indentless => {
                self.enter_collection(start)?;
                self.absorb_next()?;
                self.state = State::IndentlessSequenceEntry;
                let mark = self.peek_token()?.start;
                Ok(self.node_event(
                    EventKind::SequenceStart {
                        anchor,
                        tag,
                        style: CollectionStyle::Block,
                    },
                    start,
                    mark,
                ))
            }
            TokenKind::Scalar { value, style } => {
                let mut token = self.take_token()?;
                self.absorb(&mut token);
                self.state = self.pop_state();
                let kind = EventKind::Scalar {
                    anchor,
                    tag,
                    value,
                    style,
                };
                let mut event = self.node_event(kind, start, token.end);
                event.comments.line = token.comments.line;
                self.finish_node(&mut event)?;
                Ok(event)
            }
            token @ (TokenKind::FlowSequenceStart | TokenKind::FlowMappingStart) => {
                self.collection_start(&token, anchor, tag, start)
            }
            token @ (TokenKind::BlockSequenceStart | TokenKind::BlockMappingStart) if block => {
                self.collection_start(&token, anchor, tag, start)
            }
            _ if anchor.is_some() || tag.is_some() => {
                self.state = self.pop_state();
                let kind = EventKind::Scalar {
                    anchor,
                    tag,
                    value: String::new(),
                    style: ScalarStyle::Plain,
                };
                let mut event = self.node_event(kind, start, end);
                self.finish_node(&mut event)?;
                Ok(event)
            }
            _ => {
                let mark = self.peek_token()?.start;
                let expected = if block {
                    "block content"
                } else {
                    "flow content"
                };
                Err(Error::syntax(SyntaxErrorKind::Expected(expected), mark))
            }
        }
    }

    /// Consume an anchor and a tag, in either order.
    fn parse_properties(
        &mut self,
        start: Mark,
    ) -> Result<(Option<String>, Option<String>, Mark), Error> {
        let mut end = start;
        let mut anchor = None;
        let mut tag = None;
        loop {
            match self.peek_kind()? {
                TokenKind::Anchor(_) if anchor.is_none() => {}
                TokenKind::Tag(_) if tag.is_none() => {}
                _ => break,
            }
            let mut token = self.take_token()?;
            self.absorb(&mut token);
            end = token.end;
            match token.kind {
                TokenKind::Anchor(name) => anchor = Some(name),
                TokenKind::Tag(text) => {
                    self.check_tag(&text, token.start)?;
                    tag = Some(text);
                }
                _ => {}
            }
        }
        Ok((anchor, tag, end))
    }

    /// Open a collection whose start token is still queued; the matching
    /// entry state consumes it.
    fn collection_start(
        &mut self,
        token: &TokenKind,
        anchor: Option<String>,
        tag: Option<String>,
        start: Mark,
    ) -> Result<Event, Error> {
        self.enter_collection(start)?;
        let (style, state) = match token {
            TokenKind::FlowSequenceStart => (CollectionStyle::Flow, State::FlowSequenceFirstEntry),
            TokenKind::FlowMappingStart => (CollectionStyle::Flow, State::FlowMappingFirstKey),
            TokenKind::BlockSequenceStart => {
                (CollectionStyle::Block, State::BlockSequenceFirstEntry)
            }
            _ => (CollectionStyle::Block, State::BlockMappingFirstKey),
        };
        let kind = if matches!(
            token,
            TokenKind::FlowSequenceStart | TokenKind::BlockSequenceStart
        ) {
            EventKind::SequenceStart { anchor, tag, style }
        } else {
            EventKind::MappingStart { anchor, tag, style }
        };
        self.absorb_next()?;
        let end = self.peek_token()?.end;
        self.state = state;
        let mut event = self.node_event(kind, start, end);
        if style == CollectionStyle::Flow {
            event.blank_lines_before = 0;
        }
        Ok(event)
    }

    /// Close a block collection on a `BlockEnd` token.
    fn block_end(&mut self, kind: EventKind) -> Result<Event, Error> {
        let token = self.take_token()?;
        self.leave_collection();
        self.state = self.pop_state();
        let mut event = Event::new(kind, token.start, token.end);
        event.blank_lines_after = token.blank_lines_before;
        let stray = mem::take(&mut self.pending);
        push_lines(&mut event.comments.foot, &stray.head);
        push_lines(&mut event.comments.foot, &token.comments.foot);
        self.finish_node(&mut event)?;
        Ok(event)
    }

    fn parse_block_sequence_entry(&mut self) -> Result<Event, Error> {
        match self.peek_kind()? {
            TokenKind::BlockEntry => {
                let mut token = self.take_token()?;
                self.absorb(&mut token);
                if matches!(
                    self.peek_kind()?,
                    TokenKind::BlockEntry | TokenKind::BlockEnd
                ) {
                    self.state = State::BlockSequenceEntry;
                    self.empty_scalar(token.end)
                } else {
                    self.states.push(State::BlockSequenceEntry);
                    self.parse_node(true, false)
                }
            }
            TokenKind::BlockEnd => self.block_end(EventKind::SequenceEnd),
            _ => {
                let mark = self.peek_token()?.start;
                Err(Error::syntax(SyntaxErrorKind::Expected("'-' indicator"), mark))
            }
        }
    }

    fn parse_indentless_sequence_entry(&mut self) -> Result<Event, Error> {
        if *self.peek_kind()? == TokenKind::BlockEntry {
            let mut token = self.take_token()?;
            self.absorb(&mut token);
            if matches!(
                self.peek_kind()?,
                TokenKind::BlockEntry | TokenKind::Key | TokenKind::Value | TokenKind::BlockEnd
            ) {
                self.state = State::IndentlessSequenceEntry;
                return self.empty_scalar(token.end);
            }
            self.states.push(State::IndentlessSequenceEntry);
            return self.parse_node(true, false);
        }
        let mark = self.peek_token()?.start;
        self.leave_collection();
        self.state = self.pop_state();
        let mut event = Event::new(EventKind::SequenceEnd, mark, mark);
        self.finish_node(&mut event)?;
        Ok(event)
    }

    fn parse_block_mapping_key(&mut self) -> Result<Event, Error> {
        match self.peek_kind()? {
            TokenKind::Key => {
                let mut token = self.take_token()?;
                self.absorb(&mut token);
                if matches!(
                    self.peek_kind()?,
                    TokenKind::Key | TokenKind::Value | TokenKind::BlockEnd
                ) {
                    self.state = State::BlockMappingValue;
                    self.empty_scalar(token.end)
                } else {
                    self.states.push(State::BlockMappingValue);
                    self.parse_node(true, true)
                }
            }
            TokenKind::Value => {
                let mark = self.peek_token()?.start;
                self.state = State::BlockMappingValue;
                self.empty_scalar(mark)
            }
            TokenKind::BlockEnd => self.block_end(EventKind::MappingEnd),
            _ => {
                let mark = self.peek_token()?.start;
                Err(Error::syntax(SyntaxErrorKind::BadIndentation, mark))
            }
        }
    }

    fn parse_block_mapping_value(&mut self) -> Result<Event, Error> {
        if *self.peek_kind()? == TokenKind::Value {
            let mut token = self.take_token()?;
            self.absorb(&mut token);
            if matches!(
                self.peek_kind()?,
                TokenKind::Key | TokenKind::Value | TokenKind::BlockEnd
            ) {
                self.state = State::BlockMappingKey;
                return self.empty_scalar(token.end);
            }
            self.states.push(State::BlockMappingKey);
            return self.parse_node(true, true);
        }
        let mark = self.peek_token()?.start;
        self.state = State::BlockMappingKey;
        self.empty_scalar(mark)
    }

    /// Close a flow collection. Blank lines never apply inside flow context.
    fn flow_end(&mut self, kind: EventKind) -> Result<Event, Error> {
        let token = self.take_token()?;
        self.pending = Pending::default();
        self.leave_collection();
        self.state = self.pop_state();
        let mut event = Event::new(kind, token.start, token.end);
        event.comments.line = token.comments.line;
        self.finish_node(&mut event)?;
        Ok(event)
    }

    fn parse_flow_sequence_entry(&mut self, first: bool) -> Result<Event, Error> {
        if *self.peek_kind()? != TokenKind::FlowSequenceEnd {
            if !first {
                if *self.peek_kind()? == TokenKind::FlowEntry {
                    self.take_token()?;
                } else {
                    let mark = self.peek_token()?.start;
                    return Err(Error::syntax(SyntaxErrorKind::Expected("',' or ']'"), mark));
                }
            }
            match self.peek_kind()? {
                TokenKind::Key => {
                    let mut token = self.take_token()?;
                    self.enter_collection(token.start)?;
                    self.absorb(&mut token);
                    self.state = State::FlowSequenceEntryMappingKey;
                    let mut event = self.node_event(
                        EventKind::MappingStart {
                            anchor: None,
                            tag: None,
                            style: CollectionStyle::Flow,
                        },
                        token.start,
                        token.end,
                    );
                    event.blank_lines_before = 0;
                    return Ok(event);
                }
                TokenKind::FlowSequenceEnd => {}
                _ => {
                    self.states.push(State::FlowSequenceEntry);
                    return self.parse_node(false, false);
                }
            }
        }
        self.flow_end(EventKind::SequenceEnd)
    }

    fn parse_flow_sequence_entry_mapping_key(&mut self) -> Result<Event, Error> {
        if matches!(
            self.peek_kind()?,
            TokenKind::Value | TokenKind::FlowEntry | TokenKind::FlowSequenceEnd
        ) {
            let mark = self.peek_token()?.start;
            self.state = State::FlowSequenceEntryMappingValue;
            return self.empty_scalar(mark);
        }
        self.states.push(State::FlowSequenceEntryMappingValue);
        self.parse_node(false, false)
    }

    fn parse_flow_sequence_entry_mapping_value(&mut self) -> Result<Event, Error> {
        if *self.peek_kind()? == TokenKind::Value {
            self.take_token()?;
            if !matches!(
                self.peek_kind()?,
                TokenKind::FlowEntry | TokenKind::FlowSequenceEnd
            ) {
                self.states.push(State::FlowSequenceEntryMappingEnd);
                return self.parse_node(false, false);
            }
        }
        let mark = self.peek_token()?.start;
        self.state = State::FlowSequenceEntryMappingEnd;
        self.empty_scalar(mark)
    }

    fn parse_flow_mapping_key(&mut self, first: bool) -> Result<Event, Error> {
        if *self.peek_kind()? != TokenKind::FlowMappingEnd {
            if !first {
                if *self.peek_kind()? == TokenKind::FlowEntry {
                    self.take_token()?;
                } else {
                    let mark = self.peek_token()?.start;
                    return Err(Error::syntax(SyntaxErrorKind::Expected("',' or '}'"), mark));
                }
            }
            match self.peek_kind()? {
                TokenKind::Key => {
                    let mut token = self.take_token()?;
                    self.absorb(&mut token);
                    if matches!(
                        self.peek_kind()?,
                        TokenKind::Value | TokenKind::FlowEntry | TokenKind::FlowMappingEnd
                    ) {
                        self.state = State::FlowMappingValue;
                        return self.empty_scalar(token.end);
                    }
                    self.states.push(State::FlowMappingValue);
                    return self.parse_node(false, false);
                }
                TokenKind::FlowMappingEnd => {}
                _ => {
                    self.states.push(State::FlowMappingEmptyValue);
                    return self.parse_node(false, false);
                }
            }
        }
        self.flow_end(EventKind::MappingEnd)
    }

    fn parse_flow_mapping_value(&mut self, empty: bool) -> Result<Event, Error> {
        let mark = self.peek_token()?.start;
        if empty {
            self.state = State::FlowMappingKey;
            return self.empty_scalar(mark);
        }
        if *self.peek_kind()? == TokenKind::Value {
            self.take_token()?;
            if !matches!(
                self.peek_kind()?,
                TokenKind::FlowEntry | TokenKind::FlowMappingEnd
            ) {
                self.states.push(State::FlowMappingKey);
                return self.parse_node(false, false);
            }
        }
        self.state = State::FlowMappingKey;
        let mark = self.peek_token()?.start;
        self.empty_scalar(mark)
    }
}

impl Iterator for Parser<'_> {
    type Item = Result<Event, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.state == State::End {
            return None;
        }
        match self.state_machine() {
            Ok(event) => Some(Ok(event)),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
