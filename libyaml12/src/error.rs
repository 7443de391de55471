//! Error types for YAML parsing.

use std::fmt;

use thiserror::Error;

/// Result type for YAML parsing operations.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Parse context carrying filename for error reporting.
#[derive(Clone, Debug, Default)]
pub struct ParseContext {
    pub filename: Option<String>,
}

impl ParseContext {
    /// Create a new parse context.
    pub fn new(filename: Option<&str>) -> Self {
        Self {
            filename: filename.map(String::from),
        }
    }

    /// Format a location suffix for error messages.
    ///
    /// `line` and `col` are zero-based; the message uses one-based numbers.
    pub fn loc_suffix(&self, line: usize, col: usize) -> String {
        match &self.filename {
            Some(name) => format!(" at {}:{} of <{}>", line + 1, col + 1, name),
            None => format!(" at {}:{}", line + 1, col + 1),
        }
    }
}

/// Classification of failures that are not plain syntax errors.
///
/// Callers use this to tell "bad input" apart from "unsupported tag".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    /// A suffix-less document was followed by a document without `---`.
    IllFormedStream,
    /// A named tag handle has no matching `%TAG` directive.
    UnresolvedTag,
    /// No resolver claims the tag.
    UnrecognizedTag,
    /// A resolver claims the tag but the node cannot produce its type.
    UnavailableTag,
}

impl fmt::Display for FailurePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailurePoint::IllFormedStream => "Ill-formed stream",
            FailurePoint::UnresolvedTag => "Unresolved tag",
            FailurePoint::UnrecognizedTag => "Unrecognized tag",
            FailurePoint::UnavailableTag => "Unavailable tag",
        };
        f.write_str(name)
    }
}

/// Error type for YAML parsing.
///
/// Variants carrying a trailing `String` hold the location suffix produced by
/// [`ParseContext::loc_suffix`].
#[derive(Error, Debug)]
pub enum ParseError {
    /// Reading the underlying source failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input bytes are not valid in the detected encoding.
    #[error("Invalid {0} input at byte {1}")]
    InvalidEncoding(&'static str, usize),

    /// The cancellation flag was raised.
    #[error("Parse cancelled")]
    Cancelled,

    /// Nesting deeper than the configured maximum.
    #[error("Nesting depth exceeds {0}{1}")]
    DepthLimit(usize, String),

    /// More documents than the configured maximum.
    #[error("Stream exceeds {0} documents")]
    TooManyDocuments(usize),

    /// Comment longer than the configured maximum.
    #[error("Comment exceeds maximum length of {0} characters{1}")]
    CommentTooLong(usize, String),

    /// A blank line whose leading whitespace starts with a tab.
    #[error("Tab at start of a blank line{0}")]
    TabInBlankLine(String),

    /// Tab character used as block indentation.
    #[error("Tab not allowed in indentation{0}")]
    TabIndentation(String),

    /// Line that is neither a mapping entry nor a valid continuation.
    #[error("Malformed mapping line \"{0}\"{1}")]
    MalformedMapping(String, String),

    /// Bad sequence or flow collection entry.
    #[error("Malformed collection item \"{0}\"{1}")]
    MalformedCollectionItem(String, String),

    /// Scalar that cannot be parsed in the current context.
    #[error("Malformed scalar \"{0}\"{1}")]
    MalformedScalar(String, String),

    /// Alias with an empty or invalid name.
    #[error("Malformed alias \"{0}\"{1}")]
    MalformedAlias(String, String),

    /// Anchor with an empty or invalid name.
    #[error("Malformed anchor \"{0}\"{1}")]
    MalformedAnchor(String, String),

    /// Tag property that does not follow the tag grammar.
    #[error("Malformed tag \"{0}\"{1}")]
    MalformedTag(String, String),

    /// Anchor or tag attached to an alias.
    #[error("Alias cannot carry an anchor or tag{0}")]
    PropertiesOnAlias(String),

    /// Quoted scalar not closed before the end of its valid lines.
    #[error("Unterminated string{0}")]
    UnterminatedString(String),

    /// Unknown escape in a double-quoted scalar.
    #[error("Bad escaped character \"{0}\"{1}")]
    BadEscapedChar(String, String),

    /// Malformed hex escape in a double-quoted scalar.
    #[error("Bad Unicode escape \"{0}\"{1}")]
    BadUnicodeEscape(String, String),

    /// Unpaired surrogate in a Unicode escape.
    #[error("Illegal surrogate{0}")]
    IllegalSurrogate(String),

    /// Block scalar header that does not follow the grammar.
    #[error("Bad block scalar header \"{0}\"{1}")]
    BadBlockHeader(String, String),

    /// Indentation inconsistent with the enclosing construct.
    #[error("Bad indentation{0}")]
    BadIndentation(String),

    /// Content where none is allowed.
    #[error("Unexpected content \"{0}\"{1}")]
    UnexpectedContent(String, String),

    /// Directive line that does not follow the directive grammar.
    #[error("Malformed directive \"{0}\"{1}")]
    MalformedDirective(String, String),

    /// Second `%YAML` directive for the same document.
    #[error("Duplicate %YAML directive{0}")]
    DuplicateYamlDirective(String),

    /// `%YAML` directive with an unsupported major version.
    #[error("Unsupported YAML version {0}{1}")]
    UnsupportedVersion(String, String),

    /// Second `%TAG` directive for the same handle.
    #[error("Duplicate %TAG handle \"{0}\"{1}")]
    DuplicateTagHandle(String, String),

    /// Directives not followed by `---`.
    #[error("Directives must be followed by a document start marker{0}")]
    MissingDocumentStart(String),

    /// Anchor name defined twice in one document.
    #[error("Duplicate anchor \"{0}\"{1}")]
    DuplicateAnchor(String, String),

    /// Alias naming an anchor not defined earlier in the document.
    #[error("Undefined alias \"{0}\"{1}")]
    UndefinedAlias(String, String),

    /// Stream-structure and tag-resolution failures.
    #[error("{0}: {1}")]
    Failure(FailurePoint, String),
}

impl ParseError {
    /// Replace the location suffix of an error raised without one.
    pub fn with_location(self, ctx: &ParseContext, line: usize, col: usize) -> Self {
        let suffix = ctx.loc_suffix(line, col);
        match self {
            ParseError::DepthLimit(max, _) => ParseError::DepthLimit(max, suffix),
            ParseError::CommentTooLong(max, _) => ParseError::CommentTooLong(max, suffix),
            ParseError::TabInBlankLine(_) => ParseError::TabInBlankLine(suffix),
            ParseError::TabIndentation(_) => ParseError::TabIndentation(suffix),
            ParseError::MalformedMapping(text, _) => ParseError::MalformedMapping(text, suffix),
            ParseError::MalformedCollectionItem(text, _) => {
                ParseError::MalformedCollectionItem(text, suffix)
            }
            ParseError::MalformedScalar(text, _) => ParseError::MalformedScalar(text, suffix),
            ParseError::MalformedAlias(text, _) => ParseError::MalformedAlias(text, suffix),
            ParseError::MalformedAnchor(text, _) => ParseError::MalformedAnchor(text, suffix),
            ParseError::MalformedTag(text, _) => ParseError::MalformedTag(text, suffix),
            ParseError::PropertiesOnAlias(_) => ParseError::PropertiesOnAlias(suffix),
            ParseError::UnterminatedString(_) => ParseError::UnterminatedString(suffix),
            ParseError::BadEscapedChar(text, _) => ParseError::BadEscapedChar(text, suffix),
            ParseError::BadUnicodeEscape(text, _) => ParseError::BadUnicodeEscape(text, suffix),
            ParseError::IllegalSurrogate(_) => ParseError::IllegalSurrogate(suffix),
            ParseError::BadBlockHeader(text, _) => ParseError::BadBlockHeader(text, suffix),
            ParseError::BadIndentation(_) => ParseError::BadIndentation(suffix),
            ParseError::UnexpectedContent(text, _) => ParseError::UnexpectedContent(text, suffix),
            ParseError::MalformedDirective(text, _) => {
                ParseError::MalformedDirective(text, suffix)
            }
            ParseError::DuplicateYamlDirective(_) => ParseError::DuplicateYamlDirective(suffix),
            ParseError::UnsupportedVersion(text, _) => {
                ParseError::UnsupportedVersion(text, suffix)
            }
            ParseError::DuplicateTagHandle(text, _) => {
                ParseError::DuplicateTagHandle(text, suffix)
            }
            ParseError::MissingDocumentStart(_) => ParseError::MissingDocumentStart(suffix),
            ParseError::DuplicateAnchor(text, _) => ParseError::DuplicateAnchor(text, suffix),
            ParseError::UndefinedAlias(text, _) => ParseError::UndefinedAlias(text, suffix),
            other => other,
        }
    }

    /// The failure classification, if this error carries one.
    pub fn failure_point(&self) -> Option<FailurePoint> {
        match self {
            ParseError::Failure(point, _) => Some(*point),
            _ => None,
        }
    }

    /// Whether the error is a structural error raised at document or stream
    /// assembly rather than at the point of a syntax violation.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ParseError::DuplicateAnchor(..)
                | ParseError::UndefinedAlias(..)
                | ParseError::DuplicateTagHandle(..)
                | ParseError::Failure(FailurePoint::IllFormedStream, _)
        )
    }
}
