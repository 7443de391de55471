//! Character stream: the parser's only I/O boundary.
//!
//! The stream buffers characters pulled from a [`Source`] and exposes a
//! cursor. Lookahead (`peek*`) never moves the cursor; only `read*` and
//! `advance_by` do, so a grammar rule can attempt a match on buffered
//! lookahead and back out without rewinding anything.
//!
//! Line breaks are normalized on the way in: `\r\n` and a lone `\r` both
//! become `\n`.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::encoding::{Decoded, Encoding};
use crate::error::{ParseError, Result};

/// Consumed characters kept before the buffer is compacted.
const COMPACT_THRESHOLD: usize = 8 * 1024;

/// A producer of input characters.
///
/// Each pull is a (possibly blocking) read; the parser never pulls from two
/// places at once.
pub trait Source {
    /// Append the next chunk of characters, normally one line with its break,
    /// to `buf`. Returns `Ok(false)` once the input is exhausted.
    fn pull(&mut self, buf: &mut Vec<char>) -> Result<bool>;

    /// Encoding the source decodes from.
    fn encoding(&self) -> Encoding {
        Encoding::Utf8
    }
}

/// Source over an in-memory string.
pub struct StrSource<'a> {
    rest: &'a str,
}

impl<'a> StrSource<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { rest: input }
    }
}

impl Source for StrSource<'_> {
    fn pull(&mut self, buf: &mut Vec<char>) -> Result<bool> {
        if self.rest.is_empty() {
            return Ok(false);
        }
        let end = self.rest.find('\n').map_or(self.rest.len(), |i| i + 1);
        let (chunk, rest) = self.rest.split_at(end);
        push_normalized(buf, chunk);
        self.rest = rest;
        Ok(true)
    }
}

/// Source over a byte reader with encoding detection.
///
/// The encoding is detected from the first bytes on the first pull and used
/// for the remainder of the stream.
pub struct ReaderSource<R> {
    reader: R,
    bytes: Vec<u8>,
    decoded_bytes: usize,
    encoding: Option<Encoding>,
}

impl<R: BufRead> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            bytes: Vec::new(),
            decoded_bytes: 0,
            encoding: None,
        }
    }

    fn read_more(&mut self) -> Result<bool> {
        let data = self.reader.fill_buf()?;
        if data.is_empty() {
            return Ok(false);
        }
        let n = data.len();
        self.bytes.extend_from_slice(data);
        self.reader.consume(n);
        Ok(true)
    }
}

impl<R: BufRead> Source for ReaderSource<R> {
    fn pull(&mut self, buf: &mut Vec<char>) -> Result<bool> {
        let encoding = match self.encoding {
            Some(encoding) => encoding,
            None => {
                while self.bytes.len() < 4 && self.read_more()? {}
                let detected = Encoding::detect(&self.bytes);
                self.encoding = Some(detected);
                detected
            }
        };

        let mut chunk = String::new();
        let mut pos = 0;
        loop {
            match encoding.decode_char(&self.bytes[pos..]) {
                Decoded::Char(ch, len) => {
                    pos += len;
                    chunk.push(ch);
                    if ch == '\n' {
                        break;
                    }
                }
                Decoded::Incomplete => {
                    if !self.read_more()? {
                        if pos < self.bytes.len() {
                            return Err(ParseError::InvalidEncoding(
                                encoding.name(),
                                self.decoded_bytes + pos,
                            ));
                        }
                        break;
                    }
                }
                Decoded::Invalid => {
                    return Err(ParseError::InvalidEncoding(
                        encoding.name(),
                        self.decoded_bytes + pos,
                    ));
                }
            }
        }

        self.bytes.drain(..pos);
        self.decoded_bytes += pos;
        if chunk.is_empty() {
            return Ok(false);
        }
        push_normalized(buf, &chunk);
        Ok(true)
    }

    fn encoding(&self) -> Encoding {
        self.encoding.unwrap_or(Encoding::Utf8)
    }
}

/// Append `chunk` to `buf`, turning `\r\n` and lone `\r` into `\n`.
fn push_normalized(buf: &mut Vec<char>, chunk: &str) {
    let mut chars = chunk.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\r' {
            if chars.peek() != Some(&'\n') {
                buf.push('\n');
            }
        } else {
            buf.push(ch);
        }
    }
}

/// A position in the input. All fields are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mark {
    pub index: usize,
    pub line: usize,
    pub column: usize,
}

/// Positioned, peekable view over the characters of a [`Source`].
pub struct CharStream<S> {
    source: S,
    buf: Vec<char>,
    cursor: usize,
    compacted: usize,
    line: usize,
    column: usize,
    exhausted: bool,
    /// Buffer range `(start, end)` of a scanned line, `end` at its break.
    line_span: Option<(usize, usize)>,
    cancellation: Option<Arc<AtomicBool>>,
}

impl<'a> CharStream<StrSource<'a>> {
    /// Stream over an in-memory string.
    pub fn from_text(input: &'a str) -> Self {
        CharStream::new(StrSource::new(input))
    }
}

impl<S: Source> CharStream<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            buf: Vec::new(),
            cursor: 0,
            compacted: 0,
            line: 0,
            column: 0,
            exhausted: false,
            line_span: None,
            cancellation: None,
        }
    }

    /// Abort reads with [`ParseError::Cancelled`] once `flag` is raised.
    pub fn with_cancellation(mut self, flag: Option<Arc<AtomicBool>>) -> Self {
        self.cancellation = flag;
        self
    }

    /// Encoding reported by the source.
    pub fn encoding(&self) -> Encoding {
        self.source.encoding()
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancellation {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(ParseError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Make sure the buffer holds the character at buffer index `index`.
    fn fill(&mut self, index: usize) -> Result<bool> {
        while self.buf.len() <= index {
            if self.exhausted {
                return Ok(false);
            }
            self.check_cancelled()?;
            if !self.source.pull(&mut self.buf)? {
                self.exhausted = true;
            }
        }
        Ok(true)
    }

    /// The current character.
    pub fn peek(&mut self) -> Result<Option<char>> {
        self.peek_at(0)
    }

    /// The character `k` positions after the cursor.
    pub fn peek_at(&mut self, k: usize) -> Result<Option<char>> {
        let index = self.cursor + k;
        if !self.fill(index)? {
            return Ok(None);
        }
        Ok(Some(self.buf[index]))
    }

    /// The rest of the current line, break excluded.
    pub fn peek_line(&mut self) -> Result<String> {
        Ok(self.peek_line_at(0)?.unwrap_or_default())
    }

    /// The text from `k` positions after the cursor up to the next break, or
    /// `None` when `k` is past the end of input.
    pub fn peek_line_at(&mut self, k: usize) -> Result<Option<String>> {
        Ok(self.line_view_at(k)?.map(|line| line.iter().collect()))
    }

    /// Borrowed rest of the current line, break excluded. Empty at the end
    /// of input.
    pub fn line_view(&mut self) -> Result<&[char]> {
        Ok(self.line_view_at(0)?.unwrap_or(&[]))
    }

    /// Borrowed form of [`peek_line_at`](Self::peek_line_at).
    ///
    /// The end of the line is remembered, so repeated views into one long
    /// line scan it only once.
    pub fn line_view_at(&mut self, k: usize) -> Result<Option<&[char]>> {
        let start = self.cursor + k;
        if !self.fill(start)? {
            return Ok(None);
        }
        let end = match self.line_span {
            Some((first, end)) if first <= start && start <= end => end,
            _ => {
                let mut end = start;
                while self.fill(end)? && self.buf[end] != '\n' {
                    end += 1;
                }
                self.line_span = Some((start, end));
                end
            }
        };
        Ok(Some(&self.buf[start..end]))
    }

    /// Consume one character.
    pub fn read(&mut self) -> Result<Option<char>> {
        let ch = self.peek()?;
        if ch.is_some() {
            self.advance_by(1)?;
        }
        Ok(ch)
    }

    /// Consume the rest of the current line including its break and return
    /// it without the break.
    pub fn read_line(&mut self) -> Result<String> {
        let line = self.peek_line()?;
        self.advance_by(line.chars().count())?;
        if self.peek()? == Some('\n') {
            self.advance_by(1)?;
        }
        Ok(line)
    }

    /// Consume exactly `n` characters, or up to the end of input.
    ///
    /// Crossing a line break with more than 8 KiB of consumed characters in
    /// the buffer drops them.
    pub fn advance_by(&mut self, n: usize) -> Result<()> {
        self.check_cancelled()?;
        let mut crossed_break = false;
        for _ in 0..n {
            if !self.fill(self.cursor)? {
                break;
            }
            if self.buf[self.cursor] == '\n' {
                self.line += 1;
                self.column = 0;
                crossed_break = true;
            } else {
                self.column += 1;
            }
            self.cursor += 1;
        }
        if crossed_break && self.cursor > COMPACT_THRESHOLD {
            self.compact();
        }
        Ok(())
    }

    fn compact(&mut self) {
        self.buf.drain(..self.cursor);
        self.compacted += self.cursor;
        self.cursor = 0;
        self.line_span = None;
    }

    /// Consume a byte order mark at the cursor. The column is left unchanged
    /// so the following content keeps its indentation.
    pub fn skip_byte_order_mark(&mut self) -> Result<bool> {
        if self.peek()? != Some('\u{FEFF}') {
            return Ok(false);
        }
        self.check_cancelled()?;
        self.cursor += 1;
        Ok(true)
    }

    /// Whether the cursor sits at the start of a line.
    pub fn is_at_start_of_line(&self) -> bool {
        self.column == 0
    }

    /// Whether the input is exhausted.
    pub fn at_end(&mut self) -> Result<bool> {
        Ok(self.peek()?.is_none())
    }

    /// Absolute character position of the cursor.
    pub fn position(&self) -> usize {
        self.compacted + self.cursor
    }

    /// Zero-based column of the cursor.
    pub fn column(&self) -> usize {
        self.column
    }

    /// Current position as a mark.
    pub fn mark(&self) -> Mark {
        Mark {
            index: self.position(),
            line: self.line,
            column: self.column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_peek_does_not_advance() {
        let mut stream = CharStream::from_text("ab\ncd");
        assert_eq!(stream.peek().unwrap(), Some('a'));
        assert_eq!(stream.peek_at(3).unwrap(), Some('c'));
        assert_eq!(stream.peek_line().unwrap(), "ab");
        assert_eq!(stream.position(), 0);
        assert!(stream.is_at_start_of_line());
    }

    #[test]
    fn test_read_line_consumes_break() {
        let mut stream = CharStream::from_text("ab\ncd");
        assert_eq!(stream.read_line().unwrap(), "ab");
        assert_eq!(stream.mark(), Mark { index: 3, line: 1, column: 0 });
        assert_eq!(stream.read_line().unwrap(), "cd");
        assert!(stream.at_end().unwrap());
        assert_eq!(stream.read_line().unwrap(), "");
        assert_eq!(stream.read().unwrap(), None);
    }

    #[test]
    fn test_peek_line_at_next_line() {
        let mut stream = CharStream::from_text("ab\ncd\n");
        assert_eq!(stream.peek_line_at(3).unwrap(), Some("cd".to_string()));
        assert_eq!(stream.peek_line_at(6).unwrap(), None);
    }

    #[test]
    fn test_advance_tracks_columns() {
        let mut stream = CharStream::from_text("abc");
        stream.advance_by(2).unwrap();
        assert_eq!(stream.column(), 2);
        assert!(!stream.is_at_start_of_line());
        stream.advance_by(10).unwrap();
        assert_eq!(stream.position(), 3);
    }

    #[test]
    fn test_crlf_normalized() {
        let mut stream = CharStream::from_text("a\r\nb\rc");
        assert_eq!(stream.read_line().unwrap(), "a");
        assert_eq!(stream.read_line().unwrap(), "b");
        assert_eq!(stream.read_line().unwrap(), "c");
    }

    #[test]
    fn test_reader_source_utf16() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "a: 1\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let mut stream = CharStream::new(ReaderSource::new(Cursor::new(bytes)));
        assert_eq!(stream.read().unwrap(), Some('\u{FEFF}'));
        assert_eq!(stream.read_line().unwrap(), "a: 1");
        assert_eq!(stream.encoding(), Encoding::Utf16Le);
    }

    #[test]
    fn test_byte_order_mark_keeps_column() {
        let mut stream = CharStream::from_text("\u{FEFF}key");
        assert!(stream.skip_byte_order_mark().unwrap());
        assert!(stream.is_at_start_of_line());
        assert_eq!(stream.peek().unwrap(), Some('k'));
        assert!(!stream.skip_byte_order_mark().unwrap());
    }

    #[test]
    fn test_reader_source_invalid_utf8() {
        let mut stream = CharStream::new(ReaderSource::new(Cursor::new(vec![b'a', 0xFF])));
        assert!(matches!(
            stream.peek_line(),
            Err(ParseError::InvalidEncoding("UTF-8", 1))
        ));
    }

    #[test]
    fn test_line_view_reuses_scanned_end() {
        let mut stream = CharStream::from_text("a, b, c\nd");
        assert_eq!(stream.line_view().unwrap(), &['a', ',', ' ', 'b', ',', ' ', 'c']);
        stream.advance_by(3).unwrap();
        assert_eq!(stream.line_view().unwrap(), &['b', ',', ' ', 'c']);
        assert_eq!(stream.line_view_at(5).unwrap(), Some(&['d'][..]));
        stream.advance_by(6).unwrap();
        assert!(stream.line_view().unwrap().is_empty());
        assert_eq!(stream.line_view_at(0).unwrap(), None);
    }

    #[test]
    fn test_buffer_compacted_while_parsing() {
        let input = "- item\n".repeat(20_000);
        let source = ReaderSource::new(Cursor::new(input.into_bytes()));
        let mut stream = CharStream::new(source);
        let options = crate::options::ParseOptions::default();
        let parsed = crate::stream::parse_stream(&mut stream, &options).unwrap();
        let items = parsed.documents()[0].root().and_then(|n| n.as_sequence());
        assert_eq!(items.map(|items| items.len()), Some(20_000));
        assert!(stream.compacted > 0);
        assert!(stream.buf.len() <= COMPACT_THRESHOLD + 8);
    }

    #[test]
    fn test_cancellation() {
        let flag = Arc::new(AtomicBool::new(true));
        let mut stream = CharStream::from_text("a").with_cancellation(Some(flag));
        assert!(matches!(stream.peek(), Err(ParseError::Cancelled)));
    }
}
