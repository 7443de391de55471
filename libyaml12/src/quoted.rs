//! Single- and double-quoted scalars.
//!
//! Both styles fold line breaks the same way: a break between two content
//! lines becomes a space, each blank line in between becomes `\n`, trailing
//! whitespace of a folded line and leading whitespace of a continuation are
//! dropped. A double-quoted line ending in `\` joins the next line with no
//! space and keeps the whitespace before the backslash.

use crate::error::{ParseError, Result};
use crate::grammar::{count_indent, is_document_marker, is_white};
use crate::scalar::{LineResult, LineType, MultiLine, Progress};

/// What one line of a quoted scalar contributed.
struct Segment {
    text: String,
    /// Index just past the closing quote, or the line length.
    end: usize,
    closed: bool,
    escaped_break: bool,
}

/// Folding state shared by both quoting styles.
#[derive(Debug)]
struct QuotedCore {
    style: &'static str,
    quote: char,
    min_indent: usize,
    progress: Progress,
    value: String,
    pending_breaks: usize,
    escaped_break: bool,
}

impl QuotedCore {
    fn new(style: &'static str, quote: char, min_indent: usize) -> Self {
        Self {
            style,
            quote,
            min_indent,
            progress: Progress::Fresh,
            value: String::new(),
            pending_breaks: 0,
            escaped_break: false,
        }
    }

    fn first_line(&mut self, chars: &[char]) -> Result<LineResult> {
        self.progress.begin_first(self.style);
        if chars.first() != Some(&self.quote) {
            let line = chars.iter().collect();
            return Err(ParseError::MalformedScalar(line, String::new()));
        }
        self.progress = Progress::Open;
        let segment = self.scan(chars, 1)?;
        Ok(self.absorb(segment))
    }

    fn next_line(&mut self, chars: &[char]) -> Result<LineResult> {
        self.progress.begin_next(self.style);
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

        if self.pending_breaks > 0 {
            self.value.push_str(&"\n".repeat(self.pending_breaks));
        } else if !self.escaped_break {
            self.value.push(' ');
        }
        self.pending_breaks = 0;
        self.escaped_break = false;

        let segment = self.scan(chars, start)?;
        Ok(self.absorb(segment))
    }

    fn scan(&self, chars: &[char], start: usize) -> Result<Segment> {
        match self.quote {
            '"' => scan_double(chars, start),
            _ => scan_single(chars, start),
        }
    }

    fn absorb(&mut self, segment: Segment) -> LineResult {
        self.value.push_str(&segment.text);
        self.escaped_break = segment.escaped_break;
        if segment.closed {
            self.progress = Progress::Closed;
        }
        LineResult {
            line_type: if segment.escaped_break {
                LineType::EscapedBreak
            } else {
                LineType::Content
            },
            extracted: segment.text,
            consumed: segment.end,
            closed: segment.closed,
        }
    }
}

/// Single-quoted scalar processor. `''` stands for one quote.
#[derive(Debug)]
pub struct SingleQuoted {
    core: QuotedCore,
}

impl SingleQuoted {
    /// `min_indent` is the indentation continuation lines must reach.
    pub fn new(min_indent: usize) -> Self {
        Self {
            core: QuotedCore::new("single-quoted scalar", '\'', min_indent),
        }
    }
}

impl MultiLine for SingleQuoted {
    fn process_first(&mut self, line: &[char]) -> Result<LineResult> {
        self.core.first_line(line)
    }

    fn process_next(&mut self, line: &[char]) -> Result<LineResult> {
        self.core.next_line(line)
    }

    fn is_closed(&self) -> bool {
        self.core.progress == Progress::Closed
    }

    fn into_value(self) -> String {
        self.core.value
    }
}

/// Double-quoted scalar processor with escape sequences.
#[derive(Debug)]
pub struct DoubleQuoted {
    core: QuotedCore,
}

impl DoubleQuoted {
    /// `min_indent` is the indentation continuation lines must reach.
    pub fn new(min_indent: usize) -> Self {
        Self {
            core: QuotedCore::new("double-quoted scalar", '"', min_indent),
        }
    }
}

impl MultiLine for DoubleQuoted {
    fn process_first(&mut self, line: &[char]) -> Result<LineResult> {
        self.core.first_line(line)
    }

    fn process_next(&mut self, line: &[char]) -> Result<LineResult> {
        self.core.next_line(line)
    }

    fn is_closed(&self) -> bool {
        self.core.progress == Progress::Closed
    }

    fn into_value(self) -> String {
        self.core.value
    }
}

fn scan_single(chars: &[char], start: usize) -> Result<Segment> {
    let mut text = String::new();
    let mut keep = 0;
    let mut i = start;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            if chars.get(i + 1) == Some(&'\'') {
                text.push('\'');
                keep = text.len();
                i += 2;
                continue;
            }
            return Ok(Segment {
                text,
                end: i + 1,
                closed: true,
                escaped_break: false,
            });
        }
        text.push(c);
        if !is_white(c) {
            keep = text.len();
        }
        i += 1;
    }
    text.truncate(keep);
    Ok(Segment {
        text,
        end: chars.len(),
        closed: false,
        escaped_break: false,
    })
}

fn scan_double(chars: &[char], start: usize) -> Result<Segment> {
    let mut text = String::new();
    let mut keep = 0;
    let mut i = start;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                return Ok(Segment {
                    text,
                    end: i + 1,
                    closed: true,
                    escaped_break: false,
                });
            }
            '\\' if i + 1 == chars.len() => {
                return Ok(Segment {
                    text,
                    end: chars.len(),
                    closed: false,
                    escaped_break: true,
                });
            }
            '\\' => {
                let (ch, len) = unescape(chars, i)?;
                text.push(ch);
                keep = text.len();
                i += len;
            }
            _ => {
                text.push(c);
                if !is_white(c) {
                    keep = text.len();
                }
                i += 1;
            }
        }
    }
    text.truncate(keep);
    Ok(Segment {
        text,
        end: chars.len(),
        closed: false,
        escaped_break: false,
    })
}

/// Decode the escape sequence whose backslash is at `i`. Returns the
/// character and the number of source characters it spans.
fn unescape(chars: &[char], i: usize) -> Result<(char, usize)> {
    let code = chars[i + 1];
    let simple = match code {
        '0' => Some('\0'),
        'a' => Some('\u{07}'),
        'b' => Some('\u{08}'),
        't' | '\t' => Some('\t'),
        'n' => Some('\n'),
        'v' => Some('\u{0B}'),
        'f' => Some('\u{0C}'),
        'r' => Some('\r'),
        'e' => Some('\u{1B}'),
        ' ' => Some(' '),
        '"' => Some('"'),
        '/' => Some('/'),
        '\\' => Some('\\'),
        'N' => Some('\u{85}'),
        '_' => Some('\u{A0}'),
        'L' => Some('\u{2028}'),
        'P' => Some('\u{2029}'),
        _ => None,
    };
    if let Some(ch) = simple {
        return Ok((ch, 2));
    }

    match code {
        'x' => {
            let value = hex_escape(chars, i, 2)?;
            let ch = char::from_u32(value)
                .ok_or_else(|| bad_unicode(chars, i, 2))?;
            Ok((ch, 4))
        }
        'u' => {
            let value = hex_escape(chars, i, 4)?;
            match value {
                0xD800..=0xDBFF => {
                    let j = i + 6;
                    let paired = chars.get(j) == Some(&'\\') && chars.get(j + 1) == Some(&'u');
                    if !paired {
                        return Err(ParseError::IllegalSurrogate(String::new()));
                    }
                    let low = hex_escape(chars, j, 4)?;
                    if !(0xDC00..=0xDFFF).contains(&low) {
                        return Err(ParseError::IllegalSurrogate(String::new()));
                    }
                    let combined = 0x10000 + ((value - 0xD800) << 10) + (low - 0xDC00);
                    let ch = char::from_u32(combined)
                        .ok_or_else(|| ParseError::IllegalSurrogate(String::new()))?;
                    Ok((ch, 12))
                }
                0xDC00..=0xDFFF => Err(ParseError::IllegalSurrogate(String::new())),
                _ => {
                    let ch = char::from_u32(value).ok_or_else(|| bad_unicode(chars, i, 4))?;
                    Ok((ch, 6))
                }
            }
        }
        'U' => {
            let value = hex_escape(chars, i, 8)?;
            match value {
                0xD800..=0xDFFF => Err(ParseError::IllegalSurrogate(String::new())),
                _ => {
                    let ch = char::from_u32(value).ok_or_else(|| bad_unicode(chars, i, 8))?;
                    Ok((ch, 10))
                }
            }
        }
        other => Err(ParseError::BadEscapedChar(
            format!("\\{}", other),
            String::new(),
        )),
    }
}

/// Read the `width` hex digits following the escape letter at `i + 1`.
fn hex_escape(chars: &[char], i: usize, width: usize) -> Result<u32> {
    let digits = chars.get(i + 2..i + 2 + width);
    match digits {
        Some(digits) if digits.iter().all(|c| c.is_ascii_hexdigit()) => {
            let text: String = digits.iter().collect();
            u32::from_str_radix(&text, 16).map_err(|_| bad_unicode(chars, i, width))
        }
        _ => Err(bad_unicode(chars, i, width)),
    }
}

fn bad_unicode(chars: &[char], i: usize, width: usize) -> ParseError {
    let end = (i + 2 + width).min(chars.len());
    ParseError::BadUnicodeEscape(chars[i..end].iter().collect(), String::new())
}
