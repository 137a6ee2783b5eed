//! Start markers and separators.

use regex::Regex;

use crate::error::CommandError;

/// A start marker or separator.
///
/// Literals match verbatim; regular expressions must match at the very
/// beginning of the text to count as a start marker.
#[derive(Debug, Clone)]
pub enum Pattern {
    Literal(String),
    Regex(Regex),
}

impl Pattern {
    /// A literal pattern.
    pub fn literal(text: impl Into<String>) -> Self {
        Pattern::Literal(text.into())
    }

    /// Compiles a regular-expression pattern.
    pub fn regex(pattern: &str) -> Result<Self, CommandError> {
        Regex::new(pattern)
            .map(Pattern::Regex)
            .map_err(|err| CommandError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: err.to_string(),
            })
    }

    /// Returns the prefix of `text` this pattern matches, if any.
    pub(crate) fn match_start<'t>(&self, text: &'t str) -> Option<&'t str> {
        match self {
            Pattern::Literal(marker) => text
                .starts_with(marker.as_str())
                .then(|| &text[..marker.len()]),
            Pattern::Regex(re) => re
                .find(text)
                .filter(|m| m.start() == 0)
                .map(|m| m.as_str()),
        }
    }

    /// Splits `text` on every occurrence of this pattern.
    pub(crate) fn split<'t>(&self, text: &'t str) -> Vec<&'t str> {
        match self {
            Pattern::Literal(sep) if sep.is_empty() => vec![text],
            Pattern::Literal(sep) => text.split(sep.as_str()).collect(),
            Pattern::Regex(re) => re.split(text).collect(),
        }
    }
}

impl From<&str> for Pattern {
    fn from(text: &str) -> Self {
        Pattern::literal(text)
    }
}

impl From<String> for Pattern {
    fn from(text: String) -> Self {
        Pattern::Literal(text)
    }
}

impl From<Regex> for Pattern {
    fn from(re: Regex) -> Self {
        Pattern::Regex(re)
    }
}

/// The start markers and separators used to recognize commands.
#[derive(Debug, Clone)]
pub struct CommandSyntax {
    pub starts: Vec<Pattern>,
    pub separators: Vec<Pattern>,
}

impl CommandSyntax {
    /// Builds a syntax from start markers and separators.
    pub fn new(
        starts: impl IntoIterator<Item = impl Into<Pattern>>,
        separators: impl IntoIterator<Item = impl Into<Pattern>>,
    ) -> Self {
        Self {
            starts: starts.into_iter().map(Into::into).collect(),
            separators: separators.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for CommandSyntax {
    /// `/` as the only start marker and `.` as the only separator.
    fn default() -> Self {
        Self::new(["/"], ["."])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_start_must_anchor_at_zero() {
        let pattern = Pattern::regex("[!！]").unwrap();
        assert_eq!(pattern.match_start("!ping"), Some("!"));
        assert_eq!(pattern.match_start("say !ping"), None);
    }

    #[test]
    fn test_literal_split() {
        let sep = Pattern::literal(".");
        assert_eq!(sep.split("a.b.c"), vec!["a", "b", "c"]);
        assert_eq!(Pattern::literal("").split("a.b"), vec!["a.b"]);
    }

    #[test]
    fn test_invalid_regex_is_reported() {
        assert!(matches!(
            Pattern::regex("("),
            Err(CommandError::InvalidPattern { .. })
        ));
    }
}
