//! Stream parser.

use crate::document::{Document, DocumentParser};
use crate::error::{ParseContext, ParseError, Result};
use crate::input::{CharStream, Source};
use crate::options::ParseOptions;
use crate::schema::CoreSchema;

/// All documents of a YAML stream, in order.
#[derive(Debug, Clone, Default)]
pub struct YamlStream {
    documents: Vec<Document>,
}

impl YamlStream {
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.documents.iter()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Document> {
        self.documents.get(index)
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.documents
    }
}

impl<'a> IntoIterator for &'a YamlStream {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}

/// Parse every document of `stream`. A document that ends without `...`
/// must be followed by `---` or the end of input.
pub fn parse_stream<S: Source>(
    stream: &mut CharStream<S>,
    options: &ParseOptions,
) -> Result<YamlStream> {
    let ctx = ParseContext::new(options.filename.as_deref());
    let schema = CoreSchema;
    let mut parser = DocumentParser::new(stream, &ctx, options, &schema);

    let mut documents: Vec<Document> = Vec::new();
    loop {
        let require_explicit = documents.last().map_or(false, |d| !d.with_suffix());
        let Some(document) = parser.next_document(require_explicit)? else {
            break;
        };
        if documents.len() >= options.max_documents {
            return Err(ParseError::TooManyDocuments(options.max_documents));
        }
        documents.push(document);
    }
    Ok(YamlStream { documents })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailurePoint;
    use crate::node::Node;

    fn parse(input: &str) -> Result<YamlStream> {
        parse_stream(&mut CharStream::from_text(input), &ParseOptions::default())
    }

    #[test]
    fn test_document_boundaries() {
        let err = parse("\"first\"\n\"second\"\n").unwrap_err();
        assert_eq!(err.failure_point(), Some(FailurePoint::IllFormedStream));
        assert!(err.is_structural());

        let stream = parse("\"first\"\n---\n\"second\"\n").unwrap();
        assert_eq!(stream.len(), 2);
        let values: Vec<_> = stream
            .iter()
            .filter_map(|d| d.root().and_then(Node::as_str))
            .collect();
        assert_eq!(values, ["first", "second"]);
    }

    #[test]
    fn test_suffix_allows_implicit_document() {
        let stream = parse("a\n...\nb\n").unwrap();
        assert_eq!(stream.len(), 2);
        assert!(stream.get(0).map_or(false, Document::with_suffix));
    }

    #[test]
    fn test_empty_stream() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("\n# comment\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_comment_limit_at_stream_level() {
        let options = ParseOptions {
            max_comment_length: 4,
            ..ParseOptions::default()
        };
        let mut input = CharStream::from_text("a: 1 # too long\n");
        assert!(matches!(
            parse_stream(&mut input, &options),
            Err(ParseError::CommentTooLong(4, _))
        ));
        let mut input = CharStream::from_text("a: 1 #ok\n");
        assert!(parse_stream(&mut input, &options).is_ok());
    }

    #[test]
    fn test_comment_at_length_limit_keeps_following_entries() {
        let options = ParseOptions {
            max_comment_length: 10,
            ..ParseOptions::default()
        };
        for comment in ["#123456789", "#1234567890"] {
            let text = format!("a: 1 {}\nb: 2\nc: 3\n", comment);
            let mut input = CharStream::from_text(&text);
            let parsed = parse_stream(&mut input, &options).unwrap();
            let root = parsed.documents()[0].root().unwrap();
            assert_eq!(root.as_mapping().map(|pairs| pairs.len()), Some(3));
            assert_eq!(root.get("b").and_then(|n| n.as_str()), Some("2"));
            assert_eq!(root.get("c").and_then(|n| n.as_str()), Some("3"));
        }

        let mut input = CharStream::from_text("a: 1 #12345678901\nb: 2\n");
        let err = parse_stream(&mut input, &options).unwrap_err();
        assert!(matches!(err, ParseError::CommentTooLong(10, _)));
        assert_eq!(err.to_string(), "Comment exceeds maximum length of 10 characters at 1:6");
    }

    #[test]
    fn test_max_documents() {
        let options = ParseOptions {
            max_documents: 2,
            ..ParseOptions::default()
        };
        let mut input = CharStream::from_text("--- a\n--- b\n--- c\n");
        assert!(matches!(
            parse_stream(&mut input, &options),
            Err(ParseError::TooManyDocuments(2))
        ));
    }

    #[test]
    fn test_filename_in_errors() {
        let options = ParseOptions::default().with_filename("app.yaml");
        let mut input = CharStream::from_text("a: *missing\n");
        let err = parse_stream(&mut input, &options).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Undefined alias \"missing\" at 1:4 of <app.yaml>"
        );
    }
}
