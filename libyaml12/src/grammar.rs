//! Grammar contexts and character classes.
//!
//! Every grammar rule receives a [`Context`]; the character classes that
//! depend on it are looked up in a fixed table through [`grammar_rule`].

/// The grammar mode at a parse position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    BlockIn,
    BlockOut,
    BlockKey,
    FlowIn,
    FlowOut,
    FlowKey,
}

impl Context {
    fn index(self) -> usize {
        match self {
            Context::BlockIn => 0,
            Context::BlockOut => 1,
            Context::BlockKey => 2,
            Context::FlowIn => 3,
            Context::FlowOut => 4,
            Context::FlowKey => 5,
        }
    }

    /// Whether the context is nested inside a flow collection.
    pub fn is_flow(self) -> bool {
        matches!(self, Context::FlowIn | Context::FlowOut | Context::FlowKey)
    }

    /// Whether the context is an implicit key position.
    pub fn is_key(self) -> bool {
        matches!(self, Context::BlockKey | Context::FlowKey)
    }

    /// Context for the entries of a flow collection opened in `self`.
    pub fn in_flow(self) -> Context {
        match self {
            Context::BlockKey | Context::FlowKey => Context::FlowKey,
            _ => Context::FlowIn,
        }
    }
}

/// Character class predicate.
pub type CharClass = fn(char) -> bool;

/// Grammar constructs whose character classes are looked up per context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct {
    /// Characters allowed inside a plain scalar.
    PlainSafe,
    /// Characters allowed in anchor and alias names.
    AnchorChar,
    /// Characters allowed in a tag shorthand suffix.
    TagChar,
    /// Characters allowed in a verbatim tag or `%TAG` prefix.
    UriChar,
    /// Characters allowed in a named tag handle.
    WordChar,
}

/// Plain-safe class per context, indexed by [`Context::index`].
///
/// Inside flow collections (and flow keys) the flow indicators end a plain
/// scalar; everywhere else any non-space character is allowed.
const PLAIN_SAFE: [CharClass; 6] = [
    is_ns_char,
    is_ns_char,
    is_ns_char,
    is_plain_safe_in_flow,
    is_ns_char,
    is_plain_safe_in_flow,
];

/// The character class of `construct` in `context`.
pub fn grammar_rule(context: Context, construct: Construct) -> CharClass {
    match construct {
        Construct::PlainSafe => PLAIN_SAFE[context.index()],
        Construct::AnchorChar => is_anchor_char,
        Construct::TagChar => is_tag_char,
        Construct::UriChar => is_uri_char,
        Construct::WordChar => is_word_char,
    }
}

pub fn is_white(c: char) -> bool {
    c == ' ' || c == '\t'
}

pub fn is_break(c: char) -> bool {
    c == '\n' || c == '\r'
}

/// Whitespace, line break or end of input.
pub fn is_blank_or_end(c: Option<char>) -> bool {
    c.map_or(true, |c| is_white(c) || is_break(c))
}

/// YAML printable characters.
pub fn is_printable(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{7E}'
        | '\u{85}'
        | '\u{A0}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Printable, non-space, non-break character.
pub fn is_ns_char(c: char) -> bool {
    is_printable(c) && !is_white(c) && !is_break(c) && c != '\u{FEFF}'
}

pub fn is_indicator(c: char) -> bool {
    matches!(
        c,
        '-' | '?' | ':' | ',' | '[' | ']' | '{' | '}' | '#' | '&' | '*' | '!' | '|' | '>'
            | '\'' | '"' | '%' | '@' | '`'
    )
}

pub fn is_flow_indicator(c: char) -> bool {
    matches!(c, ',' | '[' | ']' | '{' | '}')
}

fn is_plain_safe_in_flow(c: char) -> bool {
    is_ns_char(c) && !is_flow_indicator(c)
}

fn is_anchor_char(c: char) -> bool {
    is_ns_char(c) && !is_flow_indicator(c)
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

fn is_uri_char(c: char) -> bool {
    is_word_char(c)
        || matches!(
            c,
            '%' | '#' | ';' | '/' | '?' | ':' | '@' | '&' | '=' | '+' | '$' | ',' | '_' | '.'
                | '!' | '~' | '*' | '\'' | '(' | ')' | '[' | ']'
        )
}

fn is_tag_char(c: char) -> bool {
    is_uri_char(c) && c != '!' && !is_flow_indicator(c)
}

/// Whether `c` (followed by `next`) may start a plain scalar in `context`.
pub fn is_plain_first(c: char, next: Option<char>, context: Context) -> bool {
    if is_ns_char(c) && !is_indicator(c) {
        return true;
    }
    let safe = grammar_rule(context, Construct::PlainSafe);
    matches!(c, '?' | ':' | '-') && next.map_or(false, safe)
}

/// Whether a line (starting at column 0) is a `---` or `...` marker.
pub fn is_document_marker(line: &[char]) -> bool {
    is_document_start(line) || is_document_end(line)
}

/// Whether a line (starting at column 0) is a `---` marker.
pub fn is_document_start(line: &[char]) -> bool {
    is_marker(line, '-')
}

/// Whether a line (starting at column 0) is a `...` marker.
pub fn is_document_end(line: &[char]) -> bool {
    is_marker(line, '.')
}

fn is_marker(line: &[char], c: char) -> bool {
    line.len() >= 3 && line[..3].iter().all(|&m| m == c) && is_blank_or_end(line.get(3).copied())
}

/// Number of leading spaces.
pub fn count_indent(line: &[char]) -> usize {
    line.iter().take_while(|&&c| c == ' ').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_safe_depends_on_context() {
        let block = grammar_rule(Context::BlockKey, Construct::PlainSafe);
        let flow = grammar_rule(Context::FlowKey, Construct::PlainSafe);
        assert!(block(','));
        assert!(!flow(','));
        assert!(flow('a'));
        assert!(!block(' '));
    }

    #[test]
    fn test_in_flow() {
        assert_eq!(Context::BlockOut.in_flow(), Context::FlowIn);
        assert_eq!(Context::FlowOut.in_flow(), Context::FlowIn);
        assert_eq!(Context::BlockKey.in_flow(), Context::FlowKey);
        assert_eq!(Context::FlowKey.in_flow(), Context::FlowKey);
    }

    #[test]
    fn test_plain_first() {
        assert!(is_plain_first('a', None, Context::BlockOut));
        assert!(is_plain_first('-', Some('1'), Context::BlockOut));
        assert!(!is_plain_first('-', Some(' '), Context::BlockOut));
        assert!(is_plain_first(':', Some(','), Context::BlockOut));
        assert!(!is_plain_first(':', Some(','), Context::FlowIn));
        assert!(!is_plain_first('&', Some('a'), Context::BlockOut));
    }

    fn chars(text: &str) -> Vec<char> {
        text.chars().collect()
    }

    #[test]
    fn test_document_markers() {
        assert!(is_document_marker(&chars("---")));
        assert!(is_document_marker(&chars("--- a")));
        assert!(is_document_marker(&chars("...")));
        assert!(!is_document_marker(&chars("---a")));
        assert!(!is_document_marker(&chars("--")));
        assert!(!is_document_marker(&chars("-.-")));
        assert!(is_document_start(&chars("--- |")));
        assert!(!is_document_end(&chars("---")));
    }

    #[test]
    fn test_count_indent() {
        assert_eq!(count_indent(&chars("   a")), 3);
        assert_eq!(count_indent(&chars("\t a")), 0);
        assert_eq!(count_indent(&[]), 0);
    }

    #[test]
    fn test_tag_chars() {
        let tag = grammar_rule(Context::FlowIn, Construct::TagChar);
        assert!(tag('a'));
        assert!(tag('%'));
        assert!(!tag('!'));
        assert!(!tag(','));
        let uri = grammar_rule(Context::FlowIn, Construct::UriChar);
        assert!(uri('!'));
        assert!(uri(','));
    }
}
