//! Plain (unquoted) scalars.

use crate::error::{ParseError, Result};
use crate::grammar::{
    count_indent, grammar_rule, is_document_marker, is_plain_first, is_white, Construct, Context,
};
use crate::scalar::{fold_join, LineResult, LineType, MultiLine, Progress};

/// Why a plain line scan stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlainStop {
    /// Reached the end of the line.
    LineEnd,
    /// Reached a ` #` comment.
    Comment,
    /// Reached a `:` value indicator or a flow indicator.
    Indicator,
}

/// Scan plain content from `start`. Returns the index just past the last
/// non-space content character and the reason the scan stopped.
pub fn scan_plain(chars: &[char], start: usize, context: Context) -> (usize, PlainStop) {
    let safe = grammar_rule(context, Construct::PlainSafe);
    let mut end = start;
    let mut i = start;
    while i < chars.len() {
        let c = chars[i];
        if c == ':' {
            if chars.get(i + 1).map_or(true, |&n| !safe(n)) {
                return (end, PlainStop::Indicator);
            }
        } else if c == '#' && i > start && is_white(chars[i - 1]) {
            return (end, PlainStop::Comment);
        } else if !is_white(c) && !safe(c) {
            return (end, PlainStop::Indicator);
        }
        if !is_white(c) {
            end = i + 1;
        }
        i += 1;
    }
    (end, PlainStop::LineEnd)
}

/// Plain scalar processor.
///
/// Continuation lines must be indented at least `min_indent` spaces. Key
/// contexts never continue past their first line.
#[derive(Debug)]
pub struct PlainScalar {
    context: Context,
    min_indent: usize,
    progress: Progress,
    value: String,
    pending_breaks: usize,
}

impl PlainScalar {
    pub fn new(context: Context, min_indent: usize) -> Self {
        Self {
            context,
            min_indent,
            progress: Progress::Fresh,
            value: String::new(),
            pending_breaks: 0,
        }
    }

    fn accept(&mut self, chars: &[char], start: usize, end: usize, stop: PlainStop) -> LineResult {
        let extracted: String = chars[start..end].iter().collect();
        self.value.push_str(&extracted);
        let closed = stop != PlainStop::LineEnd || self.context.is_key();
        if closed {
            self.progress = Progress::Closed;
        }
        LineResult {
            line_type: LineType::Content,
            extracted,
            consumed: if stop == PlainStop::LineEnd {
                chars.len()
            } else {
                end
            },
            closed,
        }
    }
}

impl MultiLine for PlainScalar {
    fn process_first(&mut self, chars: &[char]) -> Result<LineResult> {
        self.progress.begin_first("plain scalar");
        let starts_plain = chars
            .first()
            .map_or(false, |&c| is_plain_first(c, chars.get(1).copied(), self.context));
        if !starts_plain {
            let line = chars.iter().collect();
            return Err(ParseError::MalformedScalar(line, String::new()));
        }
        let (end, stop) = scan_plain(chars, 0, self.context);
        self.progress = Progress::Open;
        Ok(self.accept(chars, 0, end, stop))
    }

    fn process_next(&mut self, chars: &[char]) -> Result<LineResult> {
        self.progress.begin_next("plain scalar");
        if is_document_marker(chars) {
            return Ok(LineResult::invalid());
        }
        let start = chars.iter().take_while(|&&c| is_white(c)).count();
        if start == chars.len() {
            self.pending_breaks += 1;
            return Ok(LineResult::empty(chars.len()));
        }
        if count_indent(chars) < self.min_indent {
            return Ok(LineResult::invalid());
        }

        let first = chars[start];
        let safe = grammar_rule(self.context, Construct::PlainSafe);
        let continues = match first {
            '#' => false,
            ':' => chars.get(start + 1).map_or(false, |&n| safe(n)),
            c => safe(c),
        };
        if !continues {
            return Ok(LineResult::invalid());
        }

        let (end, stop) = scan_plain(chars, start, self.context);
        // A `key:` line ends a block scalar rather than continuing it.
        if stop == PlainStop::Indicator && !self.context.is_flow() {
            return Ok(LineResult::invalid());
        }

        self.value.push_str(&fold_join(self.pending_breaks));
        self.pending_breaks = 0;
        Ok(self.accept(chars, start, end, stop))
    }

    fn is_closed(&self) -> bool {
        self.progress == Progress::Closed
    }

    fn into_value(self) -> String {
        self.value
    }
}
