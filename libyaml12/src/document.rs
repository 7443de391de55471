//! Document parser and assembly.
//!
//! A document is read in four steps:
//! 1. prefix: byte order marks, comment and blank lines, stray `...` lines
//! 2. directives, which require a following `---`
//! 3. the root node, after `---` or at the first content line
//! 4. suffix: an optional `...` line
//!
//! Assembly then walks the tree in document order to register anchors,
//! check aliases and resolve tags.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::comment::{CommentParser, MultiLineCommentParser};
use crate::directive::{parse_directive, Directive, DirectiveSet, Version};
use crate::error::{FailurePoint, ParseContext, ParseError, Result};
use crate::grammar::{is_document_end, is_document_start, is_white};
use crate::input::{CharStream, Source};
use crate::node::{Anchor, Node, NodeKind, TagProperty};
use crate::options::ParseOptions;
use crate::parser::NodeParser;
use crate::schema::{TagResolver, YAML_TAG_PREFIX};

/// How a document was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Content without a `---` marker.
    Implicit,
    /// Started by `---`.
    Explicit,
}

/// A parsed YAML document.
#[derive(Debug, Clone)]
pub struct Document {
    kind: DocumentKind,
    directives: Vec<Directive>,
    nodes: Vec<Node>,
    with_suffix: bool,
    anchors: HashMap<String, Node>,
}

impl Document {
    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// The `%YAML` version, if declared.
    pub fn version(&self) -> Option<Version> {
        self.directives.iter().find_map(|d| match d {
            Directive::Yaml { version } => Some(*version),
            _ => None,
        })
    }

    /// Top-level nodes; empty when the document has no content.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.first()
    }

    /// Whether the document was closed by `...`.
    pub fn with_suffix(&self) -> bool {
        self.with_suffix
    }

    pub fn anchor(&self, name: &str) -> Option<Anchor<'_>> {
        self.anchors
            .get_key_value(name)
            .map(|(name, value)| Anchor { name, value })
    }

    pub fn anchors(&self) -> impl Iterator<Item = Anchor<'_>> {
        self.anchors
            .iter()
            .map(|(name, value)| Anchor { name, value })
    }

    /// The node an alias refers to; any other node resolves to itself.
    pub fn resolve<'a>(&'a self, node: &'a Node) -> Option<&'a Node> {
        match &node.kind {
            NodeKind::Alias(name) => self.anchors.get(name),
            _ => Some(node),
        }
    }
}

/// Reads documents one at a time from a shared stream.
pub struct DocumentParser<'a, S> {
    stream: &'a mut CharStream<S>,
    ctx: &'a ParseContext,
    options: &'a ParseOptions,
    resolver: &'a dyn TagResolver,
}

impl<'a, S: Source> DocumentParser<'a, S> {
    pub fn new(
        stream: &'a mut CharStream<S>,
        ctx: &'a ParseContext,
        options: &'a ParseOptions,
        resolver: &'a dyn TagResolver,
    ) -> Self {
        Self {
            stream,
            ctx,
            options,
            resolver,
        }
    }

    /// Read the next document, or `None` at the end of the stream. With
    /// `require_explicit` an implicit document is an ill-formed stream.
    pub fn next_document(&mut self, require_explicit: bool) -> Result<Option<Document>> {
        let Some(directives) = self.prefix_and_directives()? else {
            return Ok(None);
        };

        let mark = self.stream.mark();
        let kind = if self.stream.is_at_start_of_line()
            && is_document_start(self.stream.line_view()?)
        {
            self.stream.advance_by(3)?;
            DocumentKind::Explicit
        } else if !directives.is_empty() {
            return Err(ParseError::MissingDocumentStart(
                self.ctx.loc_suffix(mark.line, mark.column),
            ));
        } else if require_explicit {
            return Err(ParseError::Failure(
                FailurePoint::IllFormedStream,
                format!(
                    "document without \"...\" followed by content without \"---\"{}",
                    self.ctx.loc_suffix(mark.line, mark.column)
                ),
            ));
        } else {
            DocumentKind::Implicit
        };

        let (mut root, with_suffix) = {
            let mut parser = NodeParser::new(self.stream, self.ctx, self.options);
            let root = parser.parse_root()?;
            parser.skip_separation()?;
            (root, self.suffix()?)
        };

        let mut assembler = Assembler {
            ctx: self.ctx,
            options: self.options,
            resolver: self.resolver,
            directives: &directives,
            seen: HashSet::new(),
            anchors: HashMap::new(),
        };
        assembler.visit(&mut root)?;
        let anchors = assembler.anchors;

        let nodes = if root.is_empty() && root.anchor.is_none() {
            Vec::new()
        } else {
            vec![root]
        };
        debug!(
            ?kind,
            with_suffix,
            nodes = nodes.len(),
            line = mark.line + 1,
            "document parsed"
        );
        Ok(Some(Document {
            kind,
            directives: directives.into_vec(),
            nodes,
            with_suffix,
            anchors,
        }))
    }

    /// Skip everything before a document and collect its directives.
    /// Returns `None` at the end of the stream.
    fn prefix_and_directives(&mut self) -> Result<Option<DirectiveSet>> {
        let comments = MultiLineCommentParser::new(self.options.max_comment_length);
        let mut directives = DirectiveSet::new();
        loop {
            comments.process(self.stream, self.ctx)?;
            let mark = self.stream.mark();
            if self.stream.at_end()? {
                if !directives.is_empty() {
                    return Err(ParseError::MissingDocumentStart(
                        self.ctx.loc_suffix(mark.line, mark.column),
                    ));
                }
                return Ok(None);
            }
            if !self.stream.is_at_start_of_line() {
                return Ok(Some(directives));
            }
            if self.stream.skip_byte_order_mark()? {
                continue;
            }
            let line = self.stream.line_view()?;
            if line.first() == Some(&'%') {
                let line = line.to_vec();
                self.directive(&line, &mut directives)?;
            } else if is_document_end(line) && directives.is_empty() {
                self.stream.advance_by(3)?;
                self.end_of_marker_line()?;
            } else {
                return Ok(Some(directives));
            }
        }
    }

    fn directive(&mut self, chars: &[char], directives: &mut DirectiveSet) -> Result<()> {
        let mark = self.stream.mark();
        let text_end = (1..chars.len())
            .find(|&i| chars[i] == '#' && is_white(chars[i - 1]))
            .unwrap_or(chars.len());
        let text: String = chars[..text_end].iter().collect();
        let locate = |e: ParseError| e.with_location(self.ctx, mark.line, mark.column);
        let directive = parse_directive(text.trim_end()).map_err(locate)?;
        directives.add(directive).map_err(locate)?;
        self.stream.advance_by(text_end)?;
        self.end_of_marker_line()
    }

    /// After the root node: consume a `...` line if one follows.
    fn suffix(&mut self) -> Result<bool> {
        if self.stream.at_end()? || !self.stream.is_at_start_of_line() {
            return Ok(false);
        }
        if !is_document_end(self.stream.line_view()?) {
            return Ok(false);
        }
        self.stream.advance_by(3)?;
        self.end_of_marker_line()?;
        Ok(true)
    }

    /// Only whitespace and a comment may follow a marker or directive.
    fn end_of_marker_line(&mut self) -> Result<()> {
        while self.stream.peek()?.map_or(false, is_white) {
            self.stream.advance_by(1)?;
        }
        CommentParser::new(self.options.max_comment_length).try_process(self.stream, self.ctx)?;
        match self.stream.peek()? {
            None => Ok(()),
            Some('\n') => self.stream.advance_by(1),
            Some(_) => {
                let mark = self.stream.mark();
                Err(ParseError::UnexpectedContent(
                    self.stream.peek_line()?,
                    self.ctx.loc_suffix(mark.line, mark.column),
                ))
            }
        }
    }
}

/// Walk checking aliases and resolving tags, registering each anchor after
/// its node's children.
struct Assembler<'a> {
    ctx: &'a ParseContext,
    options: &'a ParseOptions,
    resolver: &'a dyn TagResolver,
    directives: &'a DirectiveSet,
    seen: HashSet<String>,
    anchors: HashMap<String, Node>,
}

impl Assembler<'_> {
    fn visit(&mut self, node: &mut Node) -> Result<()> {
        let suffix = self.ctx.loc_suffix(node.mark.line, node.mark.column);
        if let NodeKind::Alias(name) = &node.kind {
            if !self.seen.contains(name) {
                return Err(ParseError::UndefinedAlias(name.clone(), suffix));
            }
        }
        if let Some(tag) = node.tag.take() {
            let resolved = self.resolve_tag(tag, &suffix)?;
            node.tag = Some(resolved);
        }
        self.check_tag(node, &suffix)?;

        match &mut node.kind {
            NodeKind::Sequence { items, .. } => {
                for item in items {
                    self.visit(item)?;
                }
            }
            NodeKind::Mapping { pairs, .. } => {
                for (key, value) in pairs {
                    self.visit(key)?;
                    self.visit(value)?;
                }
            }
            NodeKind::Scalar(_) | NodeKind::Alias(_) => {}
        }

        // An anchor is visible only once its node is complete.
        if let Some(name) = &node.anchor {
            if !self.seen.insert(name.clone()) {
                return Err(ParseError::DuplicateAnchor(name.clone(), suffix));
            }
            self.anchors.insert(name.clone(), node.clone());
        }
        Ok(())
    }

    fn resolve_tag(&self, tag: TagProperty, suffix: &str) -> Result<TagProperty> {
        let TagProperty::Shorthand { handle, suffix: tail } = tag else {
            return Ok(tag);
        };
        let prefix = match (self.directives.tag_prefix(&handle), handle.as_str()) {
            (Some(prefix), _) => prefix,
            (None, "!") => "!",
            (None, "!!") => YAML_TAG_PREFIX,
            (None, _) => {
                return Err(ParseError::Failure(
                    FailurePoint::UnresolvedTag,
                    format!("{}{}{}", handle, tail, suffix),
                ));
            }
        };
        Ok(TagProperty::Verbatim(format!(
            "{}{}",
            prefix,
            percent_decode(&tail)
        )))
    }

    fn check_tag(&self, node: &Node, suffix: &str) -> Result<()> {
        let Some(uri) = node.tag_uri() else {
            return Ok(());
        };
        if self.resolver.claims(uri) {
            if !self.resolver.accepts(uri, node) {
                return Err(ParseError::Failure(
                    FailurePoint::UnavailableTag,
                    format!("<{}> cannot hold this node{}", uri, suffix),
                ));
            }
            return Ok(());
        }
        if uri.starts_with(YAML_TAG_PREFIX) || self.options.strict_tags {
            return Err(ParseError::Failure(
                FailurePoint::UnrecognizedTag,
                format!("<{}>{}", uri, suffix),
            ));
        }
        Ok(())
    }
}

/// Decode `%XX` escapes in a tag suffix. Invalid escapes are kept as written.
fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|_| text.to_string())
}
