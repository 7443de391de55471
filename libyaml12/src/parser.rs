//! Node parser
//!
//! Recursive descent over the character stream. Every rule receives the
//! indentation `n` of the enclosing block node (`-1` at the document root)
//! and the grammar [`Context`]. Alternatives are chosen by lookahead on the
//! current line before anything is consumed.
//!
//! Block structure:
//! - `- ` entries form a block sequence at the column of the dash
//! - `? ` entries and single-line `key:` entries form a block mapping
//! - `- `, `? ` and explicit `: ` may be followed by a compact nested
//!   collection on the same line
//! - a block sequence may sit at the indentation of its mapping key
//!
//! Scalars are delegated to the [`MultiLine`] processors one line at a time.

use tracing::trace;

use crate::block_scalar::{BlockScalar, BlockStyle};
use crate::comment::CommentParser;
use crate::error::{ParseContext, ParseError, Result};
use crate::grammar::{
    grammar_rule, is_blank_or_end, is_document_marker, is_flow_indicator, is_plain_first,
    is_white, Construct, Context,
};
use crate::input::{CharStream, Mark, Source};
use crate::node::{CollectionStyle, Node, NodeKind, ScalarStyle, TagProperty};
use crate::options::ParseOptions;
use crate::plain::{scan_plain, PlainScalar, PlainStop};
use crate::quoted::{DoubleQuoted, SingleQuoted};
use crate::scalar::{LineType, MultiLine};

/// Anchor and tag written before a node.
#[derive(Debug, Default)]
struct Properties {
    anchor: Option<String>,
    tag: Option<TagProperty>,
    mark: Option<Mark>,
}

impl Properties {
    fn is_empty(&self) -> bool {
        self.anchor.is_none() && self.tag.is_none()
    }

    fn apply(self, node: Node) -> Node {
        if self.is_empty() {
            return node;
        }
        let mark = self.mark.unwrap_or(node.mark);
        node.with_properties(self.anchor, self.tag, mark)
    }

    fn empty_node(self, mark: Mark) -> Node {
        self.apply(Node::empty(mark))
    }
}

/// Parses the nodes of one document from a shared stream.
pub struct NodeParser<'a, S> {
    stream: &'a mut CharStream<S>,
    ctx: &'a ParseContext,
    options: &'a ParseOptions,
    comments: CommentParser,
    depth: usize,
    /// Leading spaces of the most recently entered line, up to its first tab.
    indent_spaces: usize,
    /// Whether the leading whitespace of that line holds a tab.
    tab_indent: bool,
}

impl<'a, S: Source> NodeParser<'a, S> {
    pub fn new(
        stream: &'a mut CharStream<S>,
        ctx: &'a ParseContext,
        options: &'a ParseOptions,
    ) -> Self {
        Self {
            stream,
            ctx,
            options,
            comments: CommentParser::new(options.max_comment_length),
            depth: 0,
            indent_spaces: 0,
            tab_indent: false,
        }
    }

    /// Parse the root node of a document, starting either on the `---` line
    /// or at the start of the first content line.
    pub fn parse_root(&mut self) -> Result<Node> {
        self.block_node(-1, Context::BlockIn, false)
    }

    /// Consume whitespace, comments and line breaks. Returns whether a line
    /// break was crossed.
    pub fn skip_separation(&mut self) -> Result<bool> {
        let mut crossed = false;
        let mut head = self.stream.is_at_start_of_line();
        if head {
            self.begin_line();
        }
        loop {
            match self.stream.peek()? {
                Some(' ') => {
                    if head && !self.tab_indent {
                        self.indent_spaces += 1;
                    }
                    self.stream.advance_by(1)?;
                }
                Some('\t') => {
                    if head {
                        self.tab_indent = true;
                    }
                    self.stream.advance_by(1)?;
                }
                Some('#') => {
                    self.comments.try_process(self.stream, self.ctx)?;
                    head = false;
                }
                Some('\n') => {
                    self.stream.advance_by(1)?;
                    crossed = true;
                    head = true;
                    self.begin_line();
                }
                _ => break,
            }
        }
        Ok(crossed)
    }

    fn begin_line(&mut self) {
        self.indent_spaces = 0;
        self.tab_indent = false;
    }

    fn here(&self) -> Mark {
        self.stream.mark()
    }

    fn locate(&self, err: ParseError, mark: Mark) -> ParseError {
        err.with_location(self.ctx, mark.line, mark.column)
    }

    fn error_here(&self, err: ParseError) -> ParseError {
        self.locate(err, self.here())
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(self.error_here(ParseError::DepthLimit(
                self.options.max_depth,
                String::new(),
            )));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn skip_spaces(&mut self) -> Result<()> {
        while let Some(c) = self.stream.peek()? {
            if !is_white(c) {
                break;
            }
            self.stream.advance_by(1)?;
        }
        Ok(())
    }

    /// Whether the current character is `indicator` followed by a blank.
    fn at_indicator(&mut self, indicator: char) -> Result<bool> {
        Ok(self.stream.peek()? == Some(indicator) && is_blank_or_end(self.stream.peek_at(1)?))
    }

    /// Whether the stream sits at a `---` or `...` line.
    fn at_document_marker(&mut self) -> Result<bool> {
        if self.stream.column() != 0 {
            return Ok(false);
        }
        Ok(is_document_marker(self.stream.line_view()?))
    }

    /// Consume trailing whitespace, an optional comment and the line break.
    fn finish_line(&mut self) -> Result<()> {
        self.skip_spaces()?;
        self.comments.try_process(self.stream, self.ctx)?;
        match self.stream.peek()? {
            None => Ok(()),
            Some('\n') => {
                self.stream.advance_by(1)?;
                self.begin_line();
                Ok(())
            }
            Some(_) => Err(self.unexpected_content()?),
        }
    }

    fn unexpected_content(&mut self) -> Result<ParseError> {
        let text = self.stream.peek_line()?;
        Ok(self.error_here(ParseError::UnexpectedContent(text, String::new())))
    }

    /// A block node following an indicator or a `---` marker, or starting at
    /// the beginning of a line. `compact` allows a nested block collection
    /// to start on the current line.
    fn block_node(&mut self, n: isize, context: Context, compact: bool) -> Result<Node> {
        if self.stream.is_at_start_of_line() {
            return self.block_after_line(n, context, Properties::default());
        }
        self.skip_spaces()?;
        let column = self.stream.column();

        if compact {
            if self.at_indicator('-')? {
                trace!(column, "compact block sequence");
                return self.block_sequence(column);
            }
            if self.at_indicator('?')? || self.implicit_key_ahead()? {
                trace!(column, "compact block mapping");
                return self.block_mapping(column);
            }
        }

        let props = self.parse_properties(context)?;
        self.skip_spaces()?;
        match self.stream.peek()? {
            None | Some('\n') | Some('#') => {
                self.finish_line()?;
                self.block_after_line(n, context, props)
            }
            Some('|') | Some('>') => {
                let node = self.block_scalar(n)?;
                Ok(props.apply(node))
            }
            Some(_) => {
                let node = self.inline_node(n, context, props)?;
                self.finish_line()?;
                Ok(node)
            }
        }
    }

    /// Content of a block node that starts on a following line. Returns an
    /// empty node when the next content belongs to an enclosing node.
    fn block_after_line(&mut self, n: isize, context: Context, props: Properties) -> Result<Node> {
        self.skip_separation()?;
        let mark = self.here();
        if self.stream.at_end()? || self.at_document_marker()? {
            return Ok(props.empty_node(mark));
        }
        let m = self.stream.column();
        let nested = m as isize > n
            || (context == Context::BlockOut && m as isize == n && self.at_indicator('-')?);
        if !nested {
            return Ok(props.empty_node(mark));
        }
        self.block_content(n, m, context, props)
    }

    /// A block node whose first line starts at column `m`.
    fn block_content(
        &mut self,
        n: isize,
        m: usize,
        context: Context,
        props: Properties,
    ) -> Result<Node> {
        let collection =
            self.at_indicator('-')? || self.at_indicator('?')? || self.implicit_key_ahead()?;
        if self.tab_indent && (collection || self.indent_spaces as isize <= n) {
            return Err(self.error_here(ParseError::TabIndentation(String::new())));
        }

        if self.at_indicator('-')? {
            trace!(column = m, "block sequence");
            let node = self.block_sequence(m)?;
            return Ok(props.apply(node));
        }
        if collection {
            trace!(column = m, "block mapping");
            let node = self.block_mapping(m)?;
            return Ok(props.apply(node));
        }

        let props = if props.is_empty() {
            let props = self.parse_properties(context)?;
            self.skip_spaces()?;
            if !props.is_empty() && matches!(self.stream.peek()?, None | Some('\n') | Some('#')) {
                self.finish_line()?;
                return self.block_after_line(n, context, props);
            }
            props
        } else {
            props
        };

        match self.stream.peek()? {
            Some('|') | Some('>') => {
                let node = self.block_scalar(n)?;
                Ok(props.apply(node))
            }
            _ => {
                let node = self.inline_node(n, context, props)?;
                self.finish_line()?;
                Ok(node)
            }
        }
    }

    /// A block sequence whose dashes sit at column `m`.
    fn block_sequence(&mut self, m: usize) -> Result<Node> {
        self.enter()?;
        let mark = self.here();
        let mut items = Vec::new();
        loop {
            self.stream.advance_by(1)?;
            items.push(self.block_node(m as isize, Context::BlockIn, true)?);

            self.skip_separation()?;
            if self.stream.at_end()? || self.at_document_marker()? {
                break;
            }
            let column = self.stream.column();
            if column < m {
                break;
            }
            if self.tab_indent {
                return Err(self.error_here(ParseError::TabIndentation(String::new())));
            }
            if column > m {
                let text = self.stream.peek_line()?;
                return Err(
                    self.error_here(ParseError::MalformedCollectionItem(text, String::new()))
                );
            }
            if !self.at_indicator('-')? {
                break;
            }
        }
        self.leave();
        Ok(Node::new(
            NodeKind::Sequence {
                items,
                style: CollectionStyle::Block,
            },
            mark,
        ))
    }

    /// A block mapping whose keys start at column `m`.
    fn block_mapping(&mut self, m: usize) -> Result<Node> {
        self.enter()?;
        let mark = self.here();
        let mut pairs = Vec::new();
        loop {
            let pair = if self.at_indicator('?')? {
                self.explicit_entry(m)?
            } else if self.implicit_key_ahead()? {
                self.implicit_entry(m)?
            } else {
                let text = self.stream.peek_line()?;
                return Err(self.error_here(ParseError::MalformedMapping(text, String::new())));
            };
            pairs.push(pair);

            self.skip_separation()?;
            if self.stream.at_end()? || self.at_document_marker()? {
                break;
            }
            let column = self.stream.column();
            if column < m {
                break;
            }
            if self.tab_indent {
                return Err(self.error_here(ParseError::TabIndentation(String::new())));
            }
            if column > m {
                let text = self.stream.peek_line()?;
                return Err(self.error_here(ParseError::MalformedMapping(text, String::new())));
            }
        }
        self.leave();
        Ok(Node::new(
            NodeKind::Mapping {
                pairs,
                style: CollectionStyle::Block,
            },
            mark,
        ))
    }

    fn explicit_entry(&mut self, m: usize) -> Result<(Node, Node)> {
        self.stream.advance_by(1)?;
        let key = self.block_node(m as isize, Context::BlockOut, true)?;
        self.skip_separation()?;
        let at_value = !self.stream.at_end()?
            && self.stream.column() == m
            && !self.at_document_marker()?
            && self.at_indicator(':')?;
        let value = if at_value {
            self.stream.advance_by(1)?;
            self.block_node(m as isize, Context::BlockOut, true)?
        } else {
            Node::empty(self.here())
        };
        Ok((key, value))
    }

    fn implicit_entry(&mut self, m: usize) -> Result<(Node, Node)> {
        let props = self.parse_properties(Context::BlockKey)?;
        self.skip_spaces()?;
        let key = if self.stream.peek()? == Some(':') {
            props.empty_node(self.here())
        } else {
            self.inline_node(m as isize, Context::BlockKey, props)?
        };
        self.skip_spaces()?;
        if self.stream.peek()? != Some(':') {
            let text = self.stream.peek_line()?;
            return Err(self.error_here(ParseError::MalformedMapping(text, String::new())));
        }
        self.stream.advance_by(1)?;
        let value = self.block_node(m as isize, Context::BlockOut, false)?;
        Ok((key, value))
    }

    /// Whether the current line holds a single-line implicit key followed by
    /// a `:` value indicator. Nothing is consumed.
    fn implicit_key_ahead(&mut self) -> Result<bool> {
        let line = self.stream.line_view()?;
        let Some(start) = skip_property_text(line, 0) else {
            return Ok(false);
        };
        let mut i = start;
        match line.get(i) {
            Some(':') => {}
            Some('*') => {
                let anchor = grammar_rule(Context::BlockKey, Construct::AnchorChar);
                i += 1;
                while line.get(i).map_or(false, |&c| anchor(c)) {
                    i += 1;
                }
            }
            Some('"') | Some('\'') => match quoted_end(line, i) {
                Some(end) => i = end,
                None => return Ok(false),
            },
            Some('[') | Some('{') => match bracket_end(line, i) {
                Some(end) => i = end,
                None => return Ok(false),
            },
            Some(&c) if is_plain_first(c, line.get(i + 1).copied(), Context::BlockKey) => {
                let (end, stop) = scan_plain(line, i, Context::BlockKey);
                if stop != PlainStop::Indicator {
                    return Ok(false);
                }
                i = end;
            }
            _ => return Ok(false),
        }
        while line.get(i).map_or(false, |&c| is_white(c)) {
            i += 1;
        }
        let is_key = line.get(i) == Some(&':') && is_blank_or_end(line.get(i + 1).copied());
        Ok(is_key && i <= self.options.max_implicit_key_length)
    }

    fn block_scalar(&mut self, n: isize) -> Result<Node> {
        let mark = self.here();
        let mut scalar = BlockScalar::new(n);
        let first = {
            let line = self.stream.line_view()?;
            scalar.process_first(line)
        };
        let first = first.map_err(|e| self.locate(e, mark))?;
        self.stream.advance_by(first.consumed)?;
        self.comments.try_process(self.stream, self.ctx)?;
        self.continue_lines(&mut scalar)?;
        if self.stream.peek()?.is_none() {
            scalar.end_without_break();
        }
        let style = match scalar.style() {
            BlockStyle::Literal => ScalarStyle::Literal,
            BlockStyle::Folded => ScalarStyle::Folded,
        };
        let node = Node::scalar(scalar.into_value(), style, mark);
        self.finish_line()?;
        Ok(node)
    }

    /// A node that starts on the current line: alias, flow collection,
    /// quoted or plain scalar. With properties and no content the node is
    /// empty.
    fn inline_node(&mut self, n: isize, context: Context, props: Properties) -> Result<Node> {
        let mark = self.here();
        let c = self.stream.peek()?;
        let next = self.stream.peek_at(1)?;
        trace!(?c, ?context, "inline node");
        match c {
            Some('*') => {
                if !props.is_empty() {
                    return Err(self.error_here(ParseError::PropertiesOnAlias(String::new())));
                }
                self.alias(context)
            }
            Some('[') => {
                let node = self.flow_sequence(n, context)?;
                Ok(props.apply(node))
            }
            Some('{') => {
                let node = self.flow_mapping(n, context)?;
                Ok(props.apply(node))
            }
            Some('"') => {
                let scalar = self.quoted(DoubleQuoted::new(flow_indent(n)), mark)?;
                Ok(props.apply(Node::scalar(scalar, ScalarStyle::DoubleQuoted, mark)))
            }
            Some('\'') => {
                let scalar = self.quoted(SingleQuoted::new(flow_indent(n)), mark)?;
                Ok(props.apply(Node::scalar(scalar, ScalarStyle::SingleQuoted, mark)))
            }
            Some(c) if is_plain_first(c, next, context) => {
                let mut plain = PlainScalar::new(context, flow_indent(n));
                self.first_line(&mut plain, mark)?;
                self.continue_lines(&mut plain)?;
                Ok(props.apply(Node::scalar(plain.into_value(), ScalarStyle::Plain, mark)))
            }
            _ if !props.is_empty() => Ok(props.empty_node(mark)),
            _ => {
                let text = self.stream.peek_line()?;
                Err(self.error_here(ParseError::MalformedScalar(text, String::new())))
            }
        }
    }

    fn quoted<M: MultiLine>(&mut self, mut scalar: M, mark: Mark) -> Result<String> {
        self.first_line(&mut scalar, mark)?;
        self.continue_lines(&mut scalar)?;
        if !scalar.is_closed() {
            return Err(self.locate(ParseError::UnterminatedString(String::new()), mark));
        }
        Ok(scalar.into_value())
    }

    fn first_line<M: MultiLine>(&mut self, scalar: &mut M, mark: Mark) -> Result<()> {
        let result = {
            let line = self.stream.line_view()?;
            scalar.process_first(line)
        };
        let result = result.map_err(|e| self.locate(e, mark))?;
        self.stream.advance_by(result.consumed)
    }

    /// Feed following lines until the scalar closes or rejects a line.
    fn continue_lines<M: MultiLine>(&mut self, scalar: &mut M) -> Result<()> {
        while !scalar.is_closed() && self.stream.peek()? == Some('\n') {
            let line_mark = Mark {
                index: self.stream.position() + 1,
                line: self.stream.mark().line + 1,
                column: 0,
            };
            let result = match self.stream.line_view_at(1)? {
                Some(line) => scalar.process_next(line),
                None => break,
            };
            let result = result.map_err(|e| self.locate(e, line_mark))?;
            if result.line_type == LineType::Invalid {
                break;
            }
            self.stream.advance_by(1 + result.consumed)?;
        }
        Ok(())
    }

    fn alias(&mut self, context: Context) -> Result<Node> {
        let mark = self.here();
        self.stream.advance_by(1)?;
        let name = self.read_while(grammar_rule(context, Construct::AnchorChar))?;
        if name.is_empty() {
            let text = self.stream.peek_line()?;
            return Err(self.locate(
                ParseError::MalformedAlias(format!("*{}", text), String::new()),
                mark,
            ));
        }
        Ok(Node::new(NodeKind::Alias(name), mark))
    }

    fn read_while(&mut self, class: fn(char) -> bool) -> Result<String> {
        let mut text = String::new();
        while let Some(c) = self.stream.peek()? {
            if !class(c) {
                break;
            }
            text.push(c);
            self.stream.advance_by(1)?;
        }
        Ok(text)
    }

    /// Anchor and tag in either order, at most one of each.
    fn parse_properties(&mut self, context: Context) -> Result<Properties> {
        let mut props = Properties::default();
        loop {
            let mark = self.here();
            match self.stream.peek()? {
                Some('&') => {
                    self.stream.advance_by(1)?;
                    let name = self.read_while(grammar_rule(context, Construct::AnchorChar))?;
                    if name.is_empty() || props.anchor.is_some() {
                        return Err(self.locate(
                            ParseError::MalformedAnchor(format!("&{}", name), String::new()),
                            mark,
                        ));
                    }
                    props.anchor = Some(name);
                }
                Some('!') => {
                    let tag = self.parse_tag()?;
                    if props.tag.is_some() {
                        return Err(self.locate(
                            ParseError::MalformedTag(tag.to_string(), String::new()),
                            mark,
                        ));
                    }
                    props.tag = Some(tag);
                }
                _ => break,
            }
            props.mark.get_or_insert(mark);
            let next = self.stream.peek()?;
            if !is_blank_or_end(next) && !next.map_or(false, is_flow_indicator) {
                let text = self.stream.peek_line()?;
                return Err(self.error_here(ParseError::UnexpectedContent(text, String::new())));
            }
            self.skip_spaces()?;
        }
        Ok(props)
    }

    fn parse_tag(&mut self) -> Result<TagProperty> {
        let mark = self.here();
        self.stream.advance_by(1)?;
        let malformed = |this: &Self, text: String| -> ParseError {
            this.locate(ParseError::MalformedTag(text, String::new()), mark)
        };

        if self.stream.peek()? == Some('<') {
            self.stream.advance_by(1)?;
            let uri = self.read_while(grammar_rule(Context::FlowIn, Construct::UriChar))?;
            if uri.is_empty() || self.stream.peek()? != Some('>') {
                return Err(malformed(self, format!("!<{}", uri)));
            }
            self.stream.advance_by(1)?;
            return Ok(TagProperty::Verbatim(uri));
        }

        let tag_char = grammar_rule(Context::FlowIn, Construct::TagChar);
        let handle = if self.stream.peek()? == Some('!') {
            self.stream.advance_by(1)?;
            "!!".to_string()
        } else {
            let word = self.read_while(grammar_rule(Context::FlowIn, Construct::WordChar))?;
            if !word.is_empty() && self.stream.peek()? == Some('!') {
                self.stream.advance_by(1)?;
                format!("!{}!", word)
            } else {
                let rest = self.read_while(tag_char)?;
                let suffix = format!("{}{}", word, rest);
                if suffix.is_empty() {
                    return Ok(TagProperty::NonSpecific);
                }
                return Ok(TagProperty::Shorthand {
                    handle: "!".to_string(),
                    suffix,
                });
            }
        };
        let suffix = self.read_while(tag_char)?;
        if suffix.is_empty() {
            return Err(malformed(self, handle));
        }
        Ok(TagProperty::Shorthand { handle, suffix })
    }

    /// Skip separation inside a flow collection. Continuation lines must be
    /// indented past the enclosing block node and may not be markers.
    fn flow_separation(&mut self, n: isize) -> Result<()> {
        let crossed = self.skip_separation()?;
        if !crossed || self.stream.at_end()? {
            return Ok(());
        }
        if self.at_document_marker()? {
            let text = self.stream.peek_line()?;
            return Err(self.error_here(ParseError::UnexpectedContent(text, String::new())));
        }
        if self.indent_spaces < flow_indent(n) {
            return Err(self.error_here(ParseError::BadIndentation(String::new())));
        }
        Ok(())
    }

    fn malformed_item(&mut self, mark: Mark) -> Result<ParseError> {
        let text = match self.stream.peek()? {
            Some(_) => self.stream.peek_line()?,
            None => String::new(),
        };
        Ok(self.locate(
            ParseError::MalformedCollectionItem(text, String::new()),
            mark,
        ))
    }

    fn flow_sequence(&mut self, n: isize, context: Context) -> Result<Node> {
        self.enter()?;
        let mark = self.here();
        let inner = context.in_flow();
        self.stream.advance_by(1)?;
        let mut items = Vec::new();
        loop {
            self.flow_separation(n)?;
            match self.stream.peek()? {
                Some(']') => {
                    self.stream.advance_by(1)?;
                    break;
                }
                Some(',') => {
                    let here = self.here();
                    return Err(self.malformed_item(here)?);
                }
                None => return Err(self.malformed_item(mark)?),
                _ => {}
            }
            items.push(self.flow_sequence_entry(n, inner)?);
            self.flow_separation(n)?;
            match self.stream.peek()? {
                Some(',') => self.stream.advance_by(1)?,
                Some(']') => {
                    self.stream.advance_by(1)?;
                    break;
                }
                Some(_) => {
                    let here = self.here();
                    return Err(self.malformed_item(here)?);
                }
                None => return Err(self.malformed_item(mark)?),
            }
        }
        self.leave();
        Ok(Node::new(
            NodeKind::Sequence {
                items,
                style: CollectionStyle::Flow,
            },
            mark,
        ))
    }

    /// A flow sequence entry; `key: value` and `? key` entries become
    /// single-pair mappings.
    fn flow_sequence_entry(&mut self, n: isize, context: Context) -> Result<Node> {
        let mark = self.here();
        let (key, value) = if self.at_flow_indicator('?')? {
            self.stream.advance_by(1)?;
            self.flow_separation(n)?;
            let key = self.flow_key(n, context)?;
            self.flow_separation(n)?;
            (key, self.flow_value(n, context, false)?)
        } else {
            let key = self.flow_key(n, context)?;
            let adjacent = is_json_like(&key);
            self.skip_spaces()?;
            if !self.at_value_indicator(adjacent)? {
                return Ok(key);
            }
            (key, self.flow_value(n, context, adjacent)?)
        };
        let value = value.unwrap_or_else(|| Node::empty(self.here()));
        Ok(Node::new(
            NodeKind::Mapping {
                pairs: vec![(key, value)],
                style: CollectionStyle::Flow,
            },
            mark,
        ))
    }

    fn flow_mapping(&mut self, n: isize, context: Context) -> Result<Node> {
        self.enter()?;
        let mark = self.here();
        let inner = context.in_flow();
        self.stream.advance_by(1)?;
        let mut pairs = Vec::new();
        loop {
            self.flow_separation(n)?;
            match self.stream.peek()? {
                Some('}') => {
                    self.stream.advance_by(1)?;
                    break;
                }
                Some(',') => {
                    let here = self.here();
                    return Err(self.malformed_item(here)?);
                }
                None => return Err(self.malformed_item(mark)?),
                _ => {}
            }
            if self.at_flow_indicator('?')? {
                self.stream.advance_by(1)?;
                self.flow_separation(n)?;
            }
            let key = self.flow_key(n, inner)?;
            let json_like = is_json_like(&key);
            self.flow_separation(n)?;
            let value = self.flow_value(n, inner, json_like)?;
            pairs.push((key, value.unwrap_or_else(|| Node::empty(self.here()))));
            self.flow_separation(n)?;
            match self.stream.peek()? {
                Some(',') => self.stream.advance_by(1)?,
                Some('}') => {
                    self.stream.advance_by(1)?;
                    break;
                }
                Some(_) => {
                    let here = self.here();
                    return Err(self.malformed_item(here)?);
                }
                None => return Err(self.malformed_item(mark)?),
            }
        }
        self.leave();
        Ok(Node::new(
            NodeKind::Mapping {
                pairs,
                style: CollectionStyle::Flow,
            },
            mark,
        ))
    }

    /// Whether the current character is `indicator` followed by a blank or a
    /// flow indicator.
    fn at_flow_indicator(&mut self, indicator: char) -> Result<bool> {
        if self.stream.peek()? != Some(indicator) {
            return Ok(false);
        }
        let next = self.stream.peek_at(1)?;
        Ok(is_blank_or_end(next) || next.map_or(false, is_flow_indicator))
    }

    /// Whether the stream is at a `:` value indicator. After a quoted or
    /// flow collection key the `:` may be adjacent to the value.
    fn at_value_indicator(&mut self, adjacent: bool) -> Result<bool> {
        if adjacent {
            Ok(self.stream.peek()? == Some(':'))
        } else {
            self.at_flow_indicator(':')
        }
    }

    /// A flow key, empty when the entry starts with its `:` or, after `?`,
    /// ends at once.
    fn flow_key(&mut self, n: isize, context: Context) -> Result<Node> {
        let mark = self.here();
        if self.at_flow_indicator(':')? || matches!(self.stream.peek()?, Some(',' | ']' | '}')) {
            return Ok(Node::empty(mark));
        }
        self.flow_node(n, context)
    }

    /// The value after an optional `:` indicator. `None` when there is no
    /// indicator or nothing follows it.
    fn flow_value(&mut self, n: isize, context: Context, adjacent: bool) -> Result<Option<Node>> {
        if !self.at_value_indicator(adjacent)? {
            return Ok(None);
        }
        self.stream.advance_by(1)?;
        self.flow_separation(n)?;
        if matches!(self.stream.peek()?, Some(',' | ']' | '}') | None) {
            return Ok(None);
        }
        Ok(Some(self.flow_node(n, context)?))
    }

    fn flow_node(&mut self, n: isize, context: Context) -> Result<Node> {
        let props = self.parse_properties(context)?;
        if !props.is_empty() {
            self.flow_separation(n)?;
        }
        self.inline_node(n, context, props)
    }
}

/// Minimum indentation of continuation lines of a flow node nested in the
/// block node at `n`.
fn flow_indent(n: isize) -> usize {
    (n + 1).max(0) as usize
}

fn is_json_like(node: &Node) -> bool {
    match &node.kind {
        NodeKind::Scalar(scalar) => matches!(
            scalar.style,
            ScalarStyle::SingleQuoted | ScalarStyle::DoubleQuoted
        ),
        NodeKind::Sequence { .. } | NodeKind::Mapping { .. } => true,
        NodeKind::Alias(_) => false,
    }
}

/// Skip `&anchor` and `!tag` tokens and the whitespace after them. Returns
/// `None` when a property runs into something that cannot follow it.
fn skip_property_text(line: &[char], mut i: usize) -> Option<usize> {
    while matches!(line.get(i), Some('&') | Some('!')) {
        if line[i] == '!' && line.get(i + 1) == Some(&'<') {
            while line.get(i).map_or(false, |&c| c != '>') {
                i += 1;
            }
            i += 1;
        }
        while line.get(i).map_or(false, |&c| !is_white(c)) {
            i += 1;
        }
        if i >= line.len() {
            return None;
        }
        while line.get(i).map_or(false, |&c| is_white(c)) {
            i += 1;
        }
    }
    Some(i)
}

/// Index just past the quote closing the scalar opened at `start`, if it
/// closes on this line.
fn quoted_end(line: &[char], start: usize) -> Option<usize> {
    let quote = line[start];
    let mut i = start + 1;
    while i < line.len() {
        match line[i] {
            '\\' if quote == '"' => i += 2,
            '\'' if quote == '\'' && line.get(i + 1) == Some(&'\'') => i += 2,
            c if c == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

/// Index just past the bracket closing the flow collection opened at
/// `start`, if it closes on this line.
fn bracket_end(line: &[char], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = start;
    while i < line.len() {
        match line[i] {
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            '"' | '\'' => {
                i = quoted_end(line, i)?;
                continue;
            }
            '#' if i > 0 && is_white(line[i - 1]) => return None,
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_node(input: &str) -> Result<Node> {
        let ctx = ParseContext::new(None);
        let options = ParseOptions::default();
        let mut stream = CharStream::from_text(input);
        let mut parser = NodeParser::new(&mut stream, &ctx, &options);
        parser.parse_root()
    }

    fn scalar(node: &Node) -> &str {
        node.as_str().expect("scalar")
    }

    #[test]
    fn test_block_mapping() {
        let node = parse_node("a: 1\nb:\n  c: 2\n").unwrap();
        assert_eq!(node.get("a").map(scalar), Some("1"));
        let b = node.get("b").unwrap();
        assert_eq!(b.get("c").map(scalar), Some("2"));
    }

    #[test]
    fn test_sequence_at_key_indentation() {
        let node = parse_node("key:\n- a\n- b\nnext: c\n").unwrap();
        let items = node.get("key").and_then(Node::as_sequence).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(node.get("next").map(scalar), Some("c"));
    }

    #[test]
    fn test_compact_collections() {
        let node = parse_node("- - a\n  - b\n- c: 1\n  d: 2\n").unwrap();
        let items = node.as_sequence().unwrap();
        assert_eq!(items[0].as_sequence().unwrap().len(), 2);
        assert_eq!(items[1].get("d").map(scalar), Some("2"));
    }

    #[test]
    fn test_explicit_keys() {
        let node = parse_node("? a\n: 1\n? b\n").unwrap();
        let pairs = node.as_mapping().unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(scalar(&pairs[0].1), "1");
        assert!(pairs[1].1.is_empty());
    }

    #[test]
    fn test_flow_collections() {
        let node = parse_node("{a: [1, 2], b: {c: d}, e}\n").unwrap();
        let a = node.get("a").and_then(Node::as_sequence).unwrap();
        assert_eq!(a.iter().map(scalar).collect::<Vec<_>>(), ["1", "2"]);
        assert_eq!(node.get("b").and_then(|b| b.get("c")).map(scalar), Some("d"));
        assert!(node.get("e").unwrap().is_empty());
    }

    #[test]
    fn test_flow_single_pair() {
        let node = parse_node("[a: b, \"c\":d, e]\n").unwrap();
        let items = node.as_sequence().unwrap();
        assert_eq!(items[0].get("a").map(scalar), Some("b"));
        assert_eq!(items[1].get("c").map(scalar), Some("d"));
        assert_eq!(scalar(&items[2]), "e");
    }

    #[test]
    fn test_properties() {
        let node = parse_node("a: &x !!str value\nb: !local &y\n  - 1\n").unwrap();
        let a = node.get("a").unwrap();
        assert_eq!(a.anchor.as_deref(), Some("x"));
        assert_eq!(
            a.tag,
            Some(TagProperty::Shorthand {
                handle: "!!".to_string(),
                suffix: "str".to_string()
            })
        );
        let b = node.get("b").unwrap();
        assert_eq!(b.anchor.as_deref(), Some("y"));
        assert!(b.as_sequence().is_some());
    }

    #[test]
    fn test_properties_on_alias() {
        let err = parse_node("a: &x *y\n").unwrap_err();
        assert!(matches!(err, ParseError::PropertiesOnAlias(_)));
    }

    #[test]
    fn test_multi_line_plain_value() {
        let node = parse_node("a: one\n  two\n\n  three\nb: x\n").unwrap();
        assert_eq!(node.get("a").map(scalar), Some("one two\nthree"));
    }

    #[test]
    fn test_block_scalar_value() {
        let node = parse_node("a: |\n  line\n  more\nb: >-\n  folded\n  text\n").unwrap();
        assert_eq!(node.get("a").map(scalar), Some("line\nmore\n"));
        assert_eq!(node.get("b").map(scalar), Some("folded text"));
    }

    #[test]
    fn test_malformed_mapping_line() {
        let err = parse_node("a: 1\n  b: 2\n").unwrap_err();
        assert_eq!(err.to_string(), "Malformed mapping line \"b: 2\" at 2:3");
    }

    #[test]
    fn test_unterminated_string() {
        let err = parse_node("a: \"open\nb: 1\n").unwrap_err();
        assert_eq!(err.to_string(), "Unterminated string at 1:4");
    }

    #[test]
    fn test_tab_indentation() {
        let err = parse_node("a:\n\t- b\n").unwrap_err();
        assert!(matches!(err, ParseError::TabIndentation(_)));
    }

    #[test]
    fn test_depth_limit() {
        let ctx = ParseContext::new(None);
        let options = ParseOptions {
            max_depth: 3,
            ..ParseOptions::default()
        };
        let mut stream = CharStream::from_text("[[[[a]]]]\n");
        let mut parser = NodeParser::new(&mut stream, &ctx, &options);
        assert!(matches!(
            parser.parse_root(),
            Err(ParseError::DepthLimit(3, _))
        ));
    }

    #[test]
    fn test_implicit_key_length_limit() {
        let ctx = ParseContext::new(None);
        let options = ParseOptions {
            max_implicit_key_length: 3,
            ..ParseOptions::default()
        };
        let mut stream = CharStream::from_text("abcd: 1\n");
        let mut parser = NodeParser::new(&mut stream, &ctx, &options);
        assert!(parser.parse_root().is_err());

        let mut stream = CharStream::from_text("abc: 1\n");
        let mut parser = NodeParser::new(&mut stream, &ctx, &options);
        assert!(parser.parse_root().is_ok());
    }

    #[test]
    fn test_flow_continuation_indentation() {
        assert!(parse_node("a: [1,\n  2]\n").is_ok());
        assert!(matches!(
            parse_node("a: [1,\n2]\n"),
            Err(ParseError::BadIndentation(_))
        ));
    }

    #[test]
    fn test_empty_flow_entries_rejected() {
        let err = parse_node("[,]\n").unwrap_err();
        assert_eq!(err.to_string(), "Malformed collection item \",]\" at 1:2");
        let err = parse_node("[a,,b]\n").unwrap_err();
        assert_eq!(err.to_string(), "Malformed collection item \",b]\" at 1:4");
        assert!(matches!(
            parse_node("{, a: 1}\n"),
            Err(ParseError::MalformedCollectionItem(..))
        ));
    }

    #[test]
    fn test_flow_trailing_comma() {
        let node = parse_node("[a, b, ]\n").unwrap();
        assert_eq!(node.as_sequence().map(|items| items.len()), Some(2));
        let node = parse_node("{a: 1,}\n").unwrap();
        assert_eq!(node.get("a").map(scalar), Some("1"));
    }

    #[test]
    fn test_long_flow_line() {
        let input = format!("[{}x]\n", "abc, ".repeat(20_000));
        let node = parse_node(&input).unwrap();
        let items = node.as_sequence().unwrap();
        assert_eq!(items.len(), 20_001);
        assert_eq!(scalar(&items[19_999]), "abc");
        assert_eq!(scalar(&items[20_000]), "x");
    }

    #[test]
    fn test_node_marks_are_zero_based() {
        let node = parse_node("a: 1\nb:\n  c: 2\n").unwrap();
        assert_eq!(node.mark, Mark { index: 0, line: 0, column: 0 });
        let c = node.get("b").and_then(|b| b.get("c")).unwrap();
        assert_eq!(c.mark, Mark { index: 13, line: 2, column: 5 });
    }

    #[test]
    fn test_property_text_skipping() {
        let line: Vec<char> = "&a !t key: v".chars().collect();
        assert_eq!(skip_property_text(&line, 0), Some(6));
        let line: Vec<char> = "&a".chars().collect();
        assert_eq!(skip_property_text(&line, 0), None);
    }

    #[test]
    fn test_bracket_end() {
        let line: Vec<char> = "[a, \"]\", {b: c}]: x".chars().collect();
        assert_eq!(bracket_end(&line, 0), Some(16));
    }
}
