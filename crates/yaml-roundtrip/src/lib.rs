#![doc = include_str!("../README.md")]
extern crate alloc;

mod composer;
mod config;
mod emitter;
mod error;
mod event;
mod node;
mod parser;
mod scanner;

use alloc::collections::VecDeque;
use std::io::{Read, Write};

pub use crate::composer::Composer;
pub use crate::config::{
    DecodeOptions, EncodeOptions, Preservation, RoundtripConfig, preserve_blank_lines,
    set_preserve_blank_lines,
};
pub use crate::error::{Error, Mark, SyntaxErrorKind};
pub use crate::event::{CollectionStyle, Comments, Event, EventKind, ScalarStyle};
pub use crate::node::{Node, NodeKind};
pub use crate::parser::Parser;
pub use crate::scanner::{Scanner, Token, TokenKind};

use crate::emitter::Emitter;

/// Compose every document in `input`.
fn compose_all(input: &str, preserve: bool) -> Result<VecDeque<Node>, Error> {
    Composer::new(Parser::new(input, preserve)).collect()
}

/// A composer over the decoder's own copy of the input, and the setting it
/// was built with.
struct Stream {
    composer: Composer<'static>,
    preserve: bool,
}

/// Reads documents from a byte source.
///
/// The source is read to the end on the first call to [`Decoder::decode`].
/// Documents are then composed one per call, and blank-line preservation is
/// resolved on every call.
pub struct Decoder<R> {
    reader: R,
    preservation: Preservation,
    source: Option<String>,
    stream: Option<Stream>,
    decoded: usize,
    done: bool,
}

impl<R: Read> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, DecodeOptions::default())
    }

    pub fn with_options(reader: R, options: DecodeOptions) -> Self {
        Self {
            reader,
            preservation: options.preserve_blank_lines.into(),
            source: None,
            stream: None,
            decoded: 0,
            done: false,
        }
    }

    /// Override the process-wide default for this decoder. Takes effect from
    /// the next document.
    pub fn set_preserve_blank_lines(&mut self, enabled: bool) {
        self.preservation = enabled.into();
    }

    /// Return the next document node, or `None` once the stream is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if reading fails, and the first syntax or alias
    /// error of the next document. No partial document is returned, and the
    /// decoder yields nothing after an error.
    #[tracing::instrument(skip_all)]
    pub fn decode(&mut self) -> Result<Option<Node>, Error> {
        if self.done {
            return Ok(None);
        }
        let preserve = self.preservation.resolve();
        let result = self.next_document(preserve);
        match &result {
            Ok(Some(_)) => self.decoded += 1,
            Ok(None) | Err(_) => self.done = true,
        }
        result
    }

    fn next_document(&mut self, preserve: bool) -> Result<Option<Node>, Error> {
        if self.source.is_none() {
            let mut input = String::new();
            self.reader.read_to_string(&mut input)?;
            tracing::debug!(bytes = input.len(), "read stream");
            self.source = Some(input);
        }
        // Queued tokens carry the old setting: recompose from the start and
        // skip the documents already returned.
        if self.stream.as_ref().is_none_or(|s| s.preserve != preserve) {
            let source = self.source.clone().unwrap_or_default();
            tracing::debug!(preserve, skip = self.decoded, "starting composer");
            let mut composer = Composer::new(Parser::new(source, preserve));
            for _ in 0..self.decoded {
                composer.next_document()?;
            }
            self.stream = Some(Stream { composer, preserve });
        }
        match self.stream.as_mut() {
            Some(stream) => stream.composer.next_document(),
            None => Ok(None),
        }
    }
}

/// Writes documents to a byte sink.
pub struct Encoder<W> {
    writer: W,
    indent: usize,
    preservation: Preservation,
    documents: usize,
}

impl<W: Write> Encoder<W> {
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, EncodeOptions::default())
    }

    pub fn with_options(writer: W, options: EncodeOptions) -> Self {
        Self {
            writer,
            indent: options.indent,
            preservation: options.preserve_blank_lines.into(),
            documents: 0,
        }
    }

    /// Spaces per indentation level, 1 through 9.
    pub fn set_indent(&mut self, indent: usize) {
        self.indent = indent;
    }

    /// Override the process-wide default for this encoder.
    pub fn set_preserve_blank_lines(&mut self, enabled: bool) {
        self.preservation = enabled.into();
    }

    /// Write one document. A node that is not a document is written as the
    /// root of one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encode`] for an invalid indent or a malformed tree
    /// and [`Error::Io`] if writing fails.
    #[tracing::instrument(skip_all)]
    pub fn encode(&mut self, node: &Node) -> Result<(), Error> {
        let preserve = self.preservation.resolve();
        let mut emitter = Emitter::new(self.indent, preserve)?;
        emitter.document(node, self.documents == 0)?;
        let text = emitter.into_string();
        tracing::debug!(bytes = text.len(), preserve, "encoded document");
        self.writer.write_all(text.as_bytes())?;
        self.documents += 1;
        Ok(())
    }

    /// Flush and return the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if flushing fails.
    pub fn finish(mut self) -> Result<W, Error> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Parse the first document of `input` using the process-wide default.
///
/// An input without documents yields an empty document node.
///
/// # Errors
///
/// Returns the first syntax or alias error in the input.
pub fn from_str(input: &str) -> Result<Node, Error> {
    from_str_with(input, DecodeOptions::default())
}

/// Parse the first document of `input`.
///
/// # Errors
///
/// Returns the first syntax or alias error in the input.
pub fn from_str_with(input: &str, options: DecodeOptions) -> Result<Node, Error> {
    let preserve = Preservation::from(options.preserve_blank_lines).resolve();
    let document = compose_all(input, preserve)?.pop_front();
    Ok(document.unwrap_or_else(|| Node {
        kind: NodeKind::Document,
        ..Node::default()
    }))
}

/// Write a node as one document using the process-wide default.
///
/// # Errors
///
/// Returns [`Error::Encode`] for a malformed tree.
pub fn to_string(node: &Node) -> Result<String, Error> {
    to_string_with(node, &EncodeOptions::default())
}

/// Write a node as one document.
///
/// # Errors
///
/// Returns [`Error::Encode`] for an invalid indent or a malformed tree.
pub fn to_string_with(node: &Node, options: &EncodeOptions) -> Result<String, Error> {
    let preserve = Preservation::from(options.preserve_blank_lines).resolve();
    let mut emitter = Emitter::new(options.indent, preserve)?;
    emitter.document(node, true)?;
    Ok(emitter.into_string())
}
