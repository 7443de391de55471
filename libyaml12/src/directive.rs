//! `%YAML`, `%TAG` and reserved directives.

use std::fmt;

use tracing::{debug, warn};

use crate::error::{ParseError, Result};
use crate::grammar::{grammar_rule, is_white, Construct, Context};

/// A `%YAML` version number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A directive line preceding a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Yaml { version: Version },
    Tag { handle: String, prefix: String },
    /// Any other directive; kept but otherwise ignored.
    Reserved { name: String, parameters: Vec<String> },
}

/// Parse the text of a directive line, comment excluded. Errors carry no
/// location.
pub fn parse_directive(text: &str) -> Result<Directive> {
    let malformed = || ParseError::MalformedDirective(text.to_string(), String::new());
    let body = text.strip_prefix('%').ok_or_else(malformed)?;
    let mut words = body.split(is_white).filter(|w| !w.is_empty());
    let name = words.next().ok_or_else(malformed)?;
    let parameters: Vec<&str> = words.collect();

    match name {
        "YAML" => {
            let [version] = parameters.as_slice() else {
                return Err(malformed());
            };
            let version = parse_version(version).ok_or_else(malformed)?;
            if version.major != 1 {
                return Err(ParseError::UnsupportedVersion(
                    version.to_string(),
                    String::new(),
                ));
            }
            if version.minor > 2 {
                warn!(%version, "document declares a newer YAML 1.x version");
            }
            Ok(Directive::Yaml { version })
        }
        "TAG" => {
            let [handle, prefix] = parameters.as_slice() else {
                return Err(malformed());
            };
            if !is_tag_handle(handle) || !is_tag_prefix(prefix) {
                return Err(malformed());
            }
            Ok(Directive::Tag {
                handle: handle.to_string(),
                prefix: prefix.to_string(),
            })
        }
        _ => {
            debug!(name, "ignoring reserved directive");
            Ok(Directive::Reserved {
                name: name.to_string(),
                parameters: parameters.iter().map(|p| p.to_string()).collect(),
            })
        }
    }
}

fn parse_version(text: &str) -> Option<Version> {
    let (major, minor) = text.split_once('.')?;
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(major) || !digits(minor) {
        return None;
    }
    Some(Version {
        major: major.parse().ok()?,
        minor: minor.parse().ok()?,
    })
}

/// `!`, `!!` or `!word!`.
pub fn is_tag_handle(handle: &str) -> bool {
    let word = grammar_rule(Context::FlowIn, Construct::WordChar);
    match handle {
        "!" | "!!" => true,
        _ => {
            handle.len() > 2
                && handle.starts_with('!')
                && handle.ends_with('!')
                && handle[1..handle.len() - 1].chars().all(word)
        }
    }
}

fn is_tag_prefix(prefix: &str) -> bool {
    let uri = grammar_rule(Context::FlowIn, Construct::UriChar);
    !prefix.is_empty() && prefix.chars().all(uri)
}

/// Directives of one document, with duplicate checks.
#[derive(Debug, Default)]
pub struct DirectiveSet {
    directives: Vec<Directive>,
}

impl DirectiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Add a directive. Errors carry no location.
    pub fn add(&mut self, directive: Directive) -> Result<()> {
        match &directive {
            Directive::Yaml { .. } if self.version().is_some() => {
                return Err(ParseError::DuplicateYamlDirective(String::new()));
            }
            Directive::Tag { handle, .. } if self.tag_prefix(handle).is_some() => {
                return Err(ParseError::DuplicateTagHandle(
                    handle.clone(),
                    String::new(),
                ));
            }
            _ => {}
        }
        self.directives.push(directive);
        Ok(())
    }

    pub fn version(&self) -> Option<Version> {
        self.directives.iter().find_map(|d| match d {
            Directive::Yaml { version } => Some(*version),
            _ => None,
        })
    }

    /// The prefix a `%TAG` directive assigns to `handle`.
    pub fn tag_prefix(&self, handle: &str) -> Option<&str> {
        self.directives.iter().find_map(|d| match d {
            Directive::Tag { handle: h, prefix } if h == handle => Some(prefix.as_str()),
            _ => None,
        })
    }

    pub fn into_vec(self) -> Vec<Directive> {
        self.directives
    }
}
