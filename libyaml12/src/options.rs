//! Parser configuration and resource limits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Configurable limits and switches for a parse.
///
/// Limits bound the resources a single parse may consume. The defaults
/// accept every reasonable document.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Maximum comment length in characters, `#` excluded (default: 1024).
    pub max_comment_length: usize,
    /// Maximum length of an implicit mapping key in characters (default: 1024).
    pub max_implicit_key_length: usize,
    /// Maximum collection nesting depth (default: 256).
    pub max_depth: usize,
    /// Maximum number of documents in one stream (default: unlimited).
    pub max_documents: usize,
    /// Reject tags no resolver claims, not just unknown core tags (default: false).
    pub strict_tags: bool,
    /// Checked each time the parser pulls input; set it to abort the parse.
    pub cancellation: Option<Arc<AtomicBool>>,
    /// File name used in error locations.
    pub filename: Option<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_comment_length: 1024,
            max_implicit_key_length: 1024,
            max_depth: 256,
            max_documents: usize::MAX,
            strict_tags: false,
            cancellation: None,
            filename: None,
        }
    }
}

impl ParseOptions {
    /// Options with no numeric limits (for testing).
    pub fn unlimited() -> Self {
        Self {
            max_comment_length: usize::MAX,
            max_implicit_key_length: usize::MAX,
            max_depth: usize::MAX,
            max_documents: usize::MAX,
            ..Self::default()
        }
    }

    /// Set the file name reported in error messages.
    pub fn with_filename(mut self, filename: &str) -> Self {
        self.filename = Some(filename.to_string());
        self
    }

    /// Attach a cancellation flag.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancellation = Some(flag);
        self
    }

    /// Whether the cancellation flag has been raised.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ParseOptions::default();
        assert_eq!(options.max_comment_length, 1024);
        assert_eq!(options.max_implicit_key_length, 1024);
        assert_eq!(options.max_depth, 256);
        assert!(!options.strict_tags);
        assert!(!options.is_cancelled());
    }

    #[test]
    fn test_unlimited_keeps_switches() {
        let options = ParseOptions::unlimited().with_filename("x.yaml");
        assert_eq!(options.max_depth, usize::MAX);
        assert_eq!(options.filename.as_deref(), Some("x.yaml"));
        assert!(!options.strict_tags);
    }

    #[test]
    fn test_cancellation_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let options = ParseOptions::default().with_cancellation(flag.clone());
        assert!(!options.is_cancelled());
        flag.store(true, Ordering::Relaxed);
        assert!(options.is_cancelled());
    }
}
