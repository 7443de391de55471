//! YAML 1.2 parser.
//!
//! Turns a character stream into a sequence of documents whose nodes are
//! scalars, sequences, mappings and aliases, each with optional anchor and
//! tag properties.
//!
//! # Parsing Pipeline
//!
//! The parser operates in four layers:
//!
//! 1. **Input**: A [`CharStream`] over a [`Source`] detects the encoding,
//!    normalizes line breaks and offers line lookahead.
//!
//! 2. **Scalar processors**: [`PlainScalar`], [`SingleQuoted`],
//!    [`DoubleQuoted`] and block scalars consume one line at a time through
//!    the [`MultiLine`] contract and fold the lines into a value.
//!
//! 3. **Node parser**: Recursive descent over the block and flow grammar,
//!    selecting character classes by grammar [`Context`].
//!
//! 4. **Document and stream parsers**: Directives, document markers, anchor
//!    and alias checks, and tag resolution against the [`CoreSchema`].

mod block_scalar;
mod comment;
mod directive;
mod document;
mod encoding;
mod error;
mod events;
mod grammar;
mod input;
mod node;
mod options;
mod parser;
mod plain;
mod quoted;
mod scalar;
mod schema;
mod stream;

use std::io::{BufReader, Read};

pub use block_scalar::{BlockScalar, BlockStyle, Chomping};
pub use directive::{Directive, Version};
pub use document::{Document, DocumentKind};
pub use encoding::Encoding;
pub use error::{FailurePoint, ParseContext, ParseError, Result};
pub use events::to_events;
pub use grammar::Context;
pub use input::{CharStream, Mark, ReaderSource, Source, StrSource};
pub use node::{Anchor, CollectionStyle, Node, NodeKind, Scalar, ScalarStyle, TagProperty};
pub use options::ParseOptions;
pub use plain::PlainScalar;
pub use quoted::{DoubleQuoted, SingleQuoted};
pub use scalar::{LineResult, LineType, MultiLine};
pub use schema::{CoreSchema, TagResolver};
pub use stream::YamlStream;

/// Parse a YAML stream from a string.
///
/// # Example
///
/// ```
/// use libyaml12::parse;
///
/// let stream = parse("answer: 42\n").unwrap();
/// let root = stream.documents()[0].root().unwrap();
/// assert_eq!(root.get("answer").and_then(|n| n.as_str()), Some("42"));
/// ```
pub fn parse(input: &str) -> Result<YamlStream> {
    parse_with_filename(input, None)
}

/// Parse a YAML stream from a string with a filename for error messages.
pub fn parse_with_filename(input: &str, filename: Option<&str>) -> Result<YamlStream> {
    let options = ParseOptions {
        filename: filename.map(String::from),
        ..ParseOptions::default()
    };
    parse_with_options(input, &options)
}

/// Parse a YAML stream from a string with explicit limits and switches.
pub fn parse_with_options(input: &str, options: &ParseOptions) -> Result<YamlStream> {
    let mut stream = CharStream::from_text(input).with_cancellation(options.cancellation.clone());
    stream::parse_stream(&mut stream, options)
}

/// Parse a YAML stream from a reader. The encoding is detected from the
/// first bytes (UTF-8, UTF-16 or UTF-32, with or without a byte order mark).
pub fn parse_reader<R: Read>(reader: R, options: &ParseOptions) -> Result<YamlStream> {
    let source = ReaderSource::new(BufReader::new(reader));
    let mut stream = CharStream::new(source).with_cancellation(options.cancellation.clone());
    stream::parse_stream(&mut stream, options)
}

/// Read all of `reader`, then parse it as with [`parse_reader`]. The
/// cancellation flag is checked before every read.
#[cfg(feature = "async")]
pub async fn parse_async<R>(mut reader: R, options: &ParseOptions) -> Result<YamlStream>
where
    R: tokio::io::AsyncRead + Unpin,
{
    use tokio::io::AsyncReadExt;

    let mut bytes = Vec::new();
    let mut chunk = vec![0u8; ASYNC_CHUNK_SIZE];
    loop {
        if options.is_cancelled() {
            return Err(ParseError::Cancelled);
        }
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..n]);
    }
    parse_reader(std::io::Cursor::new(bytes), options)
}

#[cfg(feature = "async")]
const ASYNC_CHUNK_SIZE: usize = 8 * 1024;
