//! Event dump in the line notation of the YAML test suite.
//!
//! ```text
//! +STR
//! +DOC ---
//! +MAP {} &a <tag:yaml.org,2002:map>
//! =VAL :key
//! =ALI *b
//! -MAP
//! -DOC ...
//! -STR
//! ```

use std::fmt::Write;

use crate::document::DocumentKind;
use crate::node::{CollectionStyle, Node, NodeKind, ScalarStyle, TagProperty};
use crate::stream::YamlStream;

/// Render every document of `stream` as one event per line.
pub fn to_events(stream: &YamlStream) -> String {
    let mut out = String::from("+STR\n");
    for document in stream {
        out.push_str("+DOC");
        if document.kind() == DocumentKind::Explicit {
            out.push_str(" ---");
        }
        out.push('\n');
        match document.root() {
            Some(root) => write_node(&mut out, root),
            None => out.push_str("=VAL :\n"),
        }
        out.push_str("-DOC");
        if document.with_suffix() {
            out.push_str(" ...");
        }
        out.push('\n');
    }
    out.push_str("-STR\n");
    out
}

fn write_node(out: &mut String, node: &Node) {
    match &node.kind {
        NodeKind::Alias(name) => {
            let _ = writeln!(out, "=ALI *{}", name);
        }
        NodeKind::Scalar(scalar) => {
            out.push_str("=VAL");
            write_properties(out, node);
            let style = match scalar.style {
                ScalarStyle::Plain => ':',
                ScalarStyle::SingleQuoted => '\'',
                ScalarStyle::DoubleQuoted => '"',
                ScalarStyle::Literal => '|',
                ScalarStyle::Folded => '>',
            };
            out.push(' ');
            out.push(style);
            escape_into(out, &scalar.value);
            out.push('\n');
        }
        NodeKind::Sequence { items, style } => {
            out.push_str("+SEQ");
            if *style == CollectionStyle::Flow {
                out.push_str(" []");
            }
            write_properties(out, node);
            out.push('\n');
            for item in items {
                write_node(out, item);
            }
            out.push_str("-SEQ\n");
        }
        NodeKind::Mapping { pairs, style } => {
            out.push_str("+MAP");
            if *style == CollectionStyle::Flow {
                out.push_str(" {}");
            }
            write_properties(out, node);
            out.push('\n');
            for (key, value) in pairs {
                write_node(out, key);
                write_node(out, value);
            }
            out.push_str("-MAP\n");
        }
    }
}

fn write_properties(out: &mut String, node: &Node) {
    if let Some(anchor) = &node.anchor {
        let _ = write!(out, " &{}", anchor);
    }
    match &node.tag {
        None => {}
        Some(TagProperty::NonSpecific) => out.push_str(" <!>"),
        Some(TagProperty::Verbatim(uri)) => {
            let _ = write!(out, " <{}>", uri);
        }
        Some(tag @ TagProperty::Shorthand { .. }) => {
            let _ = write!(out, " <{}>", tag);
        }
    }
}

fn escape_into(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{8}' => out.push_str("\\b"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::CharStream;
    use crate::options::ParseOptions;
    use crate::stream::parse_stream;

    fn events(input: &str) -> String {
        let stream =
            parse_stream(&mut CharStream::from_text(input), &ParseOptions::default()).unwrap();
        to_events(&stream)
    }

    #[test]
    fn test_block_mapping_events() {
        assert_eq!(
            events("a: 1\nb: [x, 'y']\n"),
            "+STR\n+DOC\n+MAP\n=VAL :a\n=VAL :1\n=VAL :b\n+SEQ []\n=VAL :x\n=VAL 'y\n-SEQ\n-MAP\n-DOC\n-STR\n"
        );
    }

    #[test]
    fn test_properties_and_aliases() {
        let expected = [
            "+STR",
            "+DOC ---",
            "=VAL &a <tag:yaml.org,2002:str> :x",
            "-DOC ...",
            "+DOC ---",
            "+SEQ []",
            "=VAL &b :y",
            "=ALI *b",
            "-SEQ",
            "-DOC",
            "-STR",
        ];
        let dump = events("--- &a !!str x\n...\n--- [&b y, *b]\n");
        assert_eq!(dump.lines().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_escaped_values() {
        assert_eq!(
            events("\"a\\tb\\\\\"\n"),
            "+STR\n+DOC\n=VAL \"a\\tb\\\\\n-DOC\n-STR\n"
        );
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(events("---\n"), "+STR\n+DOC ---\n=VAL :\n-DOC\n-STR\n");
        assert_eq!(events(""), "+STR\n-STR\n");
    }
}
