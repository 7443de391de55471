//! YAML node representation.

use std::fmt;

use crate::input::Mark;

/// Presentation style of a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

/// Presentation style of a sequence or mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionStyle {
    Block,
    Flow,
}

/// Scalar content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar {
    pub value: String,
    pub style: ScalarStyle,
}

/// Tag annotation of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagProperty {
    /// The non-specific tag `!`.
    NonSpecific,
    /// A tag written as `handle` + `suffix`, e.g. `!!` + `str`.
    Shorthand { handle: String, suffix: String },
    /// A global tag URI, written `!<uri>` or resolved from a shorthand.
    Verbatim(String),
}

impl TagProperty {
    /// The resolved URI, if this tag is verbatim.
    pub fn uri(&self) -> Option<&str> {
        match self {
            TagProperty::Verbatim(uri) => Some(uri),
            _ => None,
        }
    }
}

impl fmt::Display for TagProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagProperty::NonSpecific => write!(f, "!"),
            TagProperty::Shorthand { handle, suffix } => write!(f, "{}{}", handle, suffix),
            TagProperty::Verbatim(uri) => write!(f, "!<{}>", uri),
        }
    }
}

/// Node content.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Scalar(Scalar),
    Sequence {
        items: Vec<Node>,
        style: CollectionStyle,
    },
    /// Key/value pairs in document order.
    Mapping {
        pairs: Vec<(Node, Node)>,
        style: CollectionStyle,
    },
    /// Reference to an anchor defined earlier in the same document.
    Alias(String),
}

/// A node of the document tree with its properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub anchor: Option<String>,
    pub tag: Option<TagProperty>,
    /// Where the node starts, properties included.
    pub mark: Mark,
}

impl Node {
    pub fn new(kind: NodeKind, mark: Mark) -> Self {
        Self {
            kind,
            anchor: None,
            tag: None,
            mark,
        }
    }

    pub fn scalar(value: impl Into<String>, style: ScalarStyle, mark: Mark) -> Self {
        Node::new(
            NodeKind::Scalar(Scalar {
                value: value.into(),
                style,
            }),
            mark,
        )
    }

    /// The empty node: a plain scalar with no content.
    pub fn empty(mark: Mark) -> Self {
        Node::scalar(String::new(), ScalarStyle::Plain, mark)
    }

    /// Returns `true` for an untagged plain scalar with no content.
    pub fn is_empty(&self) -> bool {
        match &self.kind {
            NodeKind::Scalar(scalar) => {
                scalar.style == ScalarStyle::Plain && scalar.value.is_empty() && self.tag.is_none()
            }
            _ => false,
        }
    }

    /// Returns the scalar value if this is a scalar.
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Scalar(scalar) => Some(&scalar.value),
            _ => None,
        }
    }

    /// Returns the items if this is a sequence.
    pub fn as_sequence(&self) -> Option<&[Node]> {
        match &self.kind {
            NodeKind::Sequence { items, .. } => Some(items),
            _ => None,
        }
    }

    /// Returns the pairs if this is a mapping.
    pub fn as_mapping(&self) -> Option<&[(Node, Node)]> {
        match &self.kind {
            NodeKind::Mapping { pairs, .. } => Some(pairs),
            _ => None,
        }
    }

    /// Returns the anchor name if this is an alias.
    pub fn as_alias(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Alias(name) => Some(name),
            _ => None,
        }
    }

    /// Looks up the value of the first mapping entry whose key is the scalar
    /// `key`.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_mapping()?
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    /// Resolved tag URI, if any.
    pub fn tag_uri(&self) -> Option<&str> {
        self.tag.as_ref().and_then(TagProperty::uri)
    }

    pub(crate) fn with_properties(
        mut self,
        anchor: Option<String>,
        tag: Option<TagProperty>,
        mark: Mark,
    ) -> Self {
        self.anchor = anchor;
        self.tag = tag;
        self.mark = mark;
        self
    }
}

/// An anchored node as registered in its document.
#[derive(Debug, Clone, Copy)]
pub struct Anchor<'a> {
    pub name: &'a str,
    pub value: &'a Node,
}
