//! Comment parsers.
//!
//! A comment runs from `#` to the end of its line. The one-line parser
//! consumes a single comment and leaves the line break in place; the
//! multi-line parser consumes whole runs of comment and blank lines.

use crate::error::{ParseContext, ParseError, Result};
use crate::grammar::is_white;
use crate::input::{CharStream, Source};

/// Parses one `#` comment.
#[derive(Debug, Clone)]
pub struct CommentParser {
    max_length: usize,
}

impl CommentParser {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    /// If the stream is at `#`, consume the comment up to the line break and
    /// return its text without the `#`.
    pub fn try_process<S: Source>(
        &self,
        stream: &mut CharStream<S>,
        ctx: &ParseContext,
    ) -> Result<Option<String>> {
        if stream.peek()? != Some('#') {
            return Ok(None);
        }
        let mark = stream.mark();
        let line = stream.line_view()?;
        let consumed = line.len();
        if consumed - 1 > self.max_length {
            return Err(ParseError::CommentTooLong(
                self.max_length,
                ctx.loc_suffix(mark.line, mark.column),
            ));
        }
        let text: String = line[1..].iter().collect();
        stream.advance_by(consumed)?;
        Ok(Some(text))
    }
}

/// Parses a run of comment-only and blank lines.
#[derive(Debug, Clone)]
pub struct MultiLineCommentParser {
    line_parser: CommentParser,
}

impl MultiLineCommentParser {
    pub fn new(max_length: usize) -> Self {
        Self {
            line_parser: CommentParser::new(max_length),
        }
    }

    /// Consume whole comment and blank lines from the start of the current
    /// line. Stops, without consuming its indentation, at the first line that
    /// holds anything else.
    pub fn process<S: Source>(
        &self,
        stream: &mut CharStream<S>,
        ctx: &ParseContext,
    ) -> Result<Vec<String>> {
        let mut comments = Vec::new();
        loop {
            let mut k = 0;
            while let Some(c) = stream.peek_at(k)? {
                if !is_white(c) {
                    break;
                }
                k += 1;
            }
            match stream.peek_at(k)? {
                Some('#') => {
                    stream.advance_by(k)?;
                    if let Some(text) = self.line_parser.try_process(stream, ctx)? {
                        comments.push(text);
                    }
                    stream.read()?;
                }
                Some('\n') => stream.advance_by(k + 1)?,
                None => {
                    stream.advance_by(k)?;
                    break;
                }
                Some(_) => break,
            }
        }
        Ok(comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_line_comment() {
        let ctx = ParseContext::new(None);
        let mut stream = CharStream::from_text("# hello\nvalue");
        let parser = CommentParser::new(80);
        let comment = parser.try_process(&mut stream, &ctx).unwrap();
        assert_eq!(comment.as_deref(), Some(" hello"));
        assert_eq!(stream.peek().unwrap(), Some('\n'));
    }

    #[test]
    fn test_not_a_comment() {
        let ctx = ParseContext::new(None);
        let mut stream = CharStream::from_text("value # trailing");
        let parser = CommentParser::new(80);
        assert_eq!(parser.try_process(&mut stream, &ctx).unwrap(), None);
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn test_comment_length_limit() {
        let ctx = ParseContext::new(None);
        let parser = CommentParser::new(5);

        let mut stream = CharStream::from_text("#abcde\n");
        assert!(parser.try_process(&mut stream, &ctx).is_ok());

        let mut stream = CharStream::from_text("#abcdef\n");
        let err = parser.try_process(&mut stream, &ctx).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Comment exceeds maximum length of 5 characters at 1:1"
        );
    }

    #[test]
    fn test_multi_line_comments() {
        let ctx = ParseContext::new(None);
        let mut stream = CharStream::from_text("# one\n\n  # two\n   \nkey: value\n");
        let parser = MultiLineCommentParser::new(80);
        let comments = parser.process(&mut stream, &ctx).unwrap();
        assert_eq!(comments, vec![" one".to_string(), " two".to_string()]);
        assert_eq!(stream.peek_line().unwrap(), "key: value");
    }

    #[test]
    fn test_multi_line_stops_before_indentation() {
        let ctx = ParseContext::new(None);
        let mut stream = CharStream::from_text("#c\n  - item\n");
        let parser = MultiLineCommentParser::new(80);
        parser.process(&mut stream, &ctx).unwrap();
        assert_eq!(stream.peek_line().unwrap(), "  - item");
        assert!(stream.is_at_start_of_line());
    }
}
