//! Literal (`|`) and folded (`>`) block scalars.

use crate::error::{ParseError, Result};
use crate::grammar::{count_indent, is_document_marker, is_white};
use crate::scalar::{LineResult, LineType, MultiLine, Progress};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    Literal,
    Folded,
}

/// Treatment of the final line break and trailing blank lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chomping {
    /// `-`: drop the final break and trailing blank lines.
    Strip,
    /// Default: keep the final break only.
    Clip,
    /// `+`: keep the final break and trailing blank lines.
    Keep,
}

/// Block scalar processor.
///
/// The first line is the header (`|` or `>`, optional indentation and
/// chomping indicators, optional comment). Content indentation is either
/// given by the header or taken from the first non-blank line.
#[derive(Debug)]
pub struct BlockScalar {
    parent_indent: isize,
    style: BlockStyle,
    chomping: Chomping,
    indent: Option<usize>,
    progress: Progress,
    /// Body lines with the indentation removed; `None` for blank lines.
    lines: Vec<Option<String>>,
    leading_spaces: usize,
    terminated: bool,
}

impl BlockScalar {
    /// `parent_indent` is the indentation of the enclosing node, `-1` at the
    /// document root.
    pub fn new(parent_indent: isize) -> Self {
        Self {
            parent_indent,
            style: BlockStyle::Literal,
            chomping: Chomping::Clip,
            indent: None,
            progress: Progress::Fresh,
            lines: Vec::new(),
            leading_spaces: 0,
            terminated: true,
        }
    }

    pub fn style(&self) -> BlockStyle {
        self.style
    }

    pub fn chomping(&self) -> Chomping {
        self.chomping
    }

    /// Record that the input ended right after the last line, with no final
    /// line break.
    pub fn end_without_break(&mut self) {
        if let Some(None) = self.lines.last() {
            self.lines.pop();
        } else {
            self.terminated = false;
        }
    }

    fn min_content_indent(&self) -> usize {
        (self.parent_indent + 1).max(0) as usize
    }

    fn parse_header(&mut self, chars: &[char]) -> Option<usize> {
        self.style = match chars.first()? {
            '|' => BlockStyle::Literal,
            '>' => BlockStyle::Folded,
            _ => return None,
        };
        let mut digit = None;
        let mut chomping = None;
        let mut i = 1;
        while let Some(&c) = chars.get(i) {
            match c {
                '1'..='9' if digit.is_none() => digit = c.to_digit(10),
                '-' if chomping.is_none() => chomping = Some(Chomping::Strip),
                '+' if chomping.is_none() => chomping = Some(Chomping::Keep),
                _ => break,
            }
            i += 1;
        }
        self.chomping = chomping.unwrap_or(Chomping::Clip);
        if let Some(d) = digit {
            let d = d as usize;
            self.indent = Some(if self.parent_indent >= 0 {
                self.parent_indent as usize + d
            } else {
                d
            });
        }

        let indicators_end = i;
        while chars.get(i).map_or(false, |&c| is_white(c)) {
            i += 1;
        }
        match chars.get(i) {
            None => Some(i),
            Some('#') if i > indicators_end => Some(i),
            Some(_) => None,
        }
    }

    fn content(&mut self, text: String) -> LineResult {
        let consumed = self.indent.unwrap_or(0) + text.chars().count();
        self.lines.push(Some(text.clone()));
        LineResult {
            line_type: LineType::Content,
            extracted: text,
            consumed,
            closed: false,
        }
    }

    fn folded_body(body: &[Option<String>]) -> String {
        let mut out = String::new();
        let mut prev_spaced = None;
        let mut empties = 0;
        for line in body {
            let text = match line {
                Some(text) => text,
                None => {
                    empties += 1;
                    continue;
                }
            };
            let spaced = text.starts_with(|c: char| is_white(c));
            match prev_spaced {
                None => out.push_str(&"\n".repeat(empties)),
                Some(false) if !spaced => {
                    if empties == 0 {
                        out.push(' ');
                    } else {
                        out.push_str(&"\n".repeat(empties));
                    }
                }
                Some(_) => out.push_str(&"\n".repeat(empties + 1)),
            }
            out.push_str(text);
            prev_spaced = Some(spaced);
            empties = 0;
        }
        out
    }
}

impl MultiLine for BlockScalar {
    fn process_first(&mut self, chars: &[char]) -> Result<LineResult> {
        self.progress.begin_first("block scalar");
        let consumed = self.parse_header(chars).ok_or_else(|| {
            ParseError::BadBlockHeader(chars.iter().collect(), String::new())
        })?;
        self.progress = Progress::Open;
        Ok(LineResult {
            line_type: LineType::Content,
            extracted: String::new(),
            consumed,
            closed: false,
        })
    }

    fn process_next(&mut self, chars: &[char]) -> Result<LineResult> {
        self.progress.begin_next("block scalar");
        if is_document_marker(chars) {
            return Ok(LineResult::invalid());
        }
        let spaces = count_indent(chars);
        let blank = chars[spaces..].iter().all(|&c| is_white(c));

        if blank {
            let tabbed = chars.get(spaces) == Some(&'\t');
            match self.indent {
                Some(indent) if spaces >= indent && (tabbed || spaces > indent) => {
                    return Ok(self.content(chars[indent..].iter().collect()));
                }
                Some(_) if tabbed => {
                    return Err(ParseError::TabInBlankLine(String::new()));
                }
                None if tabbed => {
                    if spaces < self.min_content_indent() || spaces < self.leading_spaces {
                        return Err(ParseError::TabInBlankLine(String::new()));
                    }
                    self.indent = Some(spaces);
                    return Ok(self.content(chars[spaces..].iter().collect()));
                }
                None => self.leading_spaces = self.leading_spaces.max(spaces),
                Some(_) => {}
            }
            self.lines.push(None);
            return Ok(LineResult::empty(chars.len()));
        }

        let indent = match self.indent {
            Some(indent) => indent,
            None => {
                if spaces < self.min_content_indent() {
                    return Ok(LineResult::invalid());
                }
                if self.leading_spaces > spaces {
                    return Err(ParseError::BadIndentation(String::new()));
                }
                self.indent = Some(spaces);
                spaces
            }
        };
        if spaces < indent {
            return Ok(LineResult::invalid());
        }
        Ok(self.content(chars[indent..].iter().collect()))
    }

    fn is_closed(&self) -> bool {
        false
    }

    fn into_value(self) -> String {
        let last_content = self.lines.iter().rposition(Option::is_some);
        let Some(last) = last_content else {
            return match self.chomping {
                Chomping::Keep => "\n".repeat(self.lines.len()),
                _ => String::new(),
            };
        };
        let trailing = self.lines.len() - last - 1;
        let body_lines = &self.lines[..=last];
        let mut value = match self.style {
            BlockStyle::Literal => body_lines
                .iter()
                .map(|line| line.as_deref().unwrap_or(""))
                .collect::<Vec<_>>()
                .join("\n"),
            BlockStyle::Folded => Self::folded_body(body_lines),
        };
        let final_break = self.terminated || trailing > 0;
        match self.chomping {
            Chomping::Strip => {}
            Chomping::Clip => {
                if final_break {
                    value.push('\n');
                }
            }
            Chomping::Keep => {
                if final_break {
                    value.push('\n');
                }
                value.push_str(&"\n".repeat(trailing));
            }
        }
        value
    }
}
