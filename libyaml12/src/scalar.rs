//! Shared line-driven interface of the scalar style processors.
//!
//! A multi-line scalar is fed one physical line at a time: the line holding
//! the scalar's start, then each following line until the scalar closes or a
//! line is rejected. The caller commits exactly `consumed` characters of each
//! accepted line.

use crate::error::Result;

/// Classification of one physical line of a multi-line scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    /// The line contributed content.
    Content,
    /// A blank line; folds into a line break.
    Empty,
    /// Content ending in an escaped line break (double-quoted only).
    EscapedBreak,
    /// The line is not part of the scalar.
    Invalid,
}

/// Outcome of feeding one line to a [`MultiLine`] processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineResult {
    pub line_type: LineType,
    /// Text this line contributed, before folding.
    pub extracted: String,
    /// Characters of the line the processor used.
    pub consumed: usize,
    /// Whether the scalar ended on this line.
    pub closed: bool,
}

impl LineResult {
    pub(crate) fn invalid() -> Self {
        Self {
            line_type: LineType::Invalid,
            extracted: String::new(),
            consumed: 0,
            closed: false,
        }
    }

    pub(crate) fn empty(consumed: usize) -> Self {
        Self {
            line_type: LineType::Empty,
            extracted: String::new(),
            consumed,
            closed: false,
        }
    }
}

/// A scalar style processed line by line.
///
/// Lines arrive as borrowed character slices without their break. Feeding
/// the first line twice, or a following line before the first one or after
/// the scalar closed, is a contract violation and panics.
pub trait MultiLine {
    /// Feed the line that starts with the scalar's first character.
    fn process_first(&mut self, line: &[char]) -> Result<LineResult>;

    /// Feed a complete following line.
    fn process_next(&mut self, line: &[char]) -> Result<LineResult>;

    /// [`process_first`](Self::process_first) over a string.
    fn process_first_line(&mut self, line: &str) -> Result<LineResult> {
        let chars: Vec<char> = line.chars().collect();
        self.process_first(&chars)
    }

    /// [`process_next`](Self::process_next) over a string.
    fn process_next_line(&mut self, line: &str) -> Result<LineResult> {
        let chars: Vec<char> = line.chars().collect();
        self.process_next(&chars)
    }

    /// Whether the scalar has ended.
    fn is_closed(&self) -> bool;

    /// The folded value.
    fn into_value(self) -> String
    where
        Self: Sized;
}

/// Progress of a processor through the [`MultiLine`] contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Progress {
    Fresh,
    Open,
    Closed,
}

impl Progress {
    pub(crate) fn begin_first(self, style: &str) {
        if self != Progress::Fresh {
            panic!("{}: process_first_line called twice", style);
        }
    }

    pub(crate) fn begin_next(self, style: &str) {
        match self {
            Progress::Fresh => panic!(
                "{}: process_next_line called before process_first_line",
                style
            ),
            Progress::Closed => panic!(
                "{}: process_next_line called after the scalar closed",
                style
            ),
            Progress::Open => {}
        }
    }
}

/// Join text for a folded line break followed by `pending` blank lines.
pub(crate) fn fold_join(pending: usize) -> String {
    if pending == 0 {
        " ".to_string()
    } else {
        "\n".repeat(pending)
    }
}
