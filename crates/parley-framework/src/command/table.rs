//! Command names, the command table and the resolver.

use std::collections::{HashMap, HashSet};
use std::fmt;

use parking_lot::RwLock;
use tracing::{trace, warn};

use super::pattern::{CommandSyntax, Pattern};

// ============================================================================
// Command Name
// ============================================================================

/// A command identifier: one or more segments, e.g. `weather.today`.
///
/// Segments are lowercased on construction so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandName(Vec<String>);

impl CommandName {
    /// Builds a name from its segments.
    pub fn new<S: AsRef<str>>(segments: impl IntoIterator<Item = S>) -> Self {
        Self(
            segments
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
        )
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new name with `child`'s segments appended.
    pub fn join(&self, child: &CommandName) -> CommandName {
        let mut segments = self.0.clone();
        segments.extend(child.0.iter().cloned());
        CommandName(segments)
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl From<&str> for CommandName {
    /// A single-segment name. The text is not split on separators.
    fn from(name: &str) -> Self {
        Self::new([name])
    }
}

impl From<String> for CommandName {
    fn from(name: String) -> Self {
        Self::new([name])
    }
}

impl<const N: usize> From<[&str; N]> for CommandName {
    fn from(segments: [&str; N]) -> Self {
        Self::new(segments)
    }
}

impl From<Vec<String>> for CommandName {
    fn from(segments: Vec<String>) -> Self {
        Self::new(segments)
    }
}

impl From<(&str, &str)> for CommandName {
    fn from((a, b): (&str, &str)) -> Self {
        Self::new([a, b])
    }
}

/// A command recognized in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    /// The matched command.
    pub name: CommandName,
    /// Everything after the command token, with leading whitespace removed.
    pub arg: String,
}

// ============================================================================
// Command Table
// ============================================================================

#[derive(Debug, Default)]
struct TableInner {
    commands: HashSet<CommandName>,
    aliases: HashMap<String, CommandName>,
}

/// The set of known commands and their aliases.
///
/// Mutation and lookup may happen concurrently; a lookup sees the table
/// either before or after any single insert.
#[derive(Debug, Default)]
pub struct CommandTable {
    inner: RwLock<TableInner>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command. Returns `false` for an empty name.
    pub fn insert(&self, name: CommandName) -> bool {
        if name.is_empty() {
            warn!("Ignoring command with no segments");
            return false;
        }
        self.inner.write().commands.insert(name);
        true
    }

    /// Maps a single token to a command. The alias is case-insensitive.
    pub fn alias(&self, alias: &str, name: CommandName) {
        self.inner.write().aliases.insert(alias.to_lowercase(), name);
    }

    pub fn contains(&self, name: &CommandName) -> bool {
        self.inner.read().commands.contains(name)
    }

    /// Returns the command an alias points at.
    pub fn alias_target(&self, alias: &str) -> Option<CommandName> {
        self.inner.read().aliases.get(&alias.to_lowercase()).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().commands.is_empty()
    }

    /// Recognizes a command at the beginning of `text`.
    ///
    /// 1. The longest start marker matching at the beginning is stripped,
    ///    then leading whitespace.
    /// 2. The first whitespace-delimited token becomes the candidate.
    /// 3. An alias wins outright. Otherwise every separator splits the
    ///    token and the split with the most segments is kept, earliest
    ///    separator on ties.
    /// 4. The name must be registered.
    ///
    /// Text after the token, minus leading whitespace, becomes the argument.
    pub fn resolve(&self, syntax: &CommandSyntax, text: &str) -> Option<ResolvedCommand> {
        let text = text.trim_start();

        let mut marker: Option<&str> = None;
        for start in &syntax.starts {
            if let Some(found) = start.match_start(text)
                && marker.is_none_or(|prev| found.len() > prev.len())
            {
                marker = Some(found);
            }
        }
        let marker = marker?;

        let body = text[marker.len()..].trim_start();
        if body.is_empty() {
            return None;
        }

        let (token, arg) = match body.split_once(char::is_whitespace) {
            Some((token, rest)) => (token, rest.trim_start()),
            None => (body, ""),
        };

        let inner = self.inner.read();
        let name = match inner.aliases.get(&token.to_lowercase()) {
            Some(name) => name.clone(),
            None => split_token(&syntax.separators, token),
        };

        if !inner.commands.contains(&name) {
            trace!(token, "Token is not a registered command");
            return None;
        }

        Some(ResolvedCommand {
            name,
            arg: arg.to_string(),
        })
    }
}

fn split_token(separators: &[Pattern], token: &str) -> CommandName {
    let mut best: Option<Vec<&str>> = None;
    for separator in separators {
        let parts = separator.split(token);
        if best.as_ref().is_none_or(|b| parts.len() > b.len()) {
            best = Some(parts);
        }
    }
    match best {
        Some(parts) => CommandName::new(parts),
        None => CommandName::from(token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(names: &[CommandName]) -> CommandTable {
        let table = CommandTable::new();
        for name in names {
            table.insert(name.clone());
        }
        table
    }

    #[test]
    fn test_resolve_multi_segment_with_alternate_start() {
        let table = table(&[CommandName::from(("a", "b"))]);
        let syntax = CommandSyntax::new(["/", "#"], ["."]);

        let resolved = table.resolve(&syntax, "#a.b hello").unwrap();
        assert_eq!(resolved.name, CommandName::from(("a", "b")));
        assert_eq!(resolved.arg, "hello");
    }

    #[test]
    fn test_longest_start_marker_wins() {
        let table = table(&[CommandName::from("echo")]);
        let syntax = CommandSyntax::new(["/", "//"], ["."]);

        let resolved = table.resolve(&syntax, "// echo  hi there  ").unwrap();
        assert_eq!(resolved.name, CommandName::from("echo"));
        assert_eq!(resolved.arg, "hi there  ");
    }

    #[test]
    fn test_separator_with_most_segments_wins() {
        let table = table(&[CommandName::from(["x", "y", "z"])]);
        let syntax = CommandSyntax::new(["/"], [".", "-"]);

        let resolved = table.resolve(&syntax, "/x-y-z").unwrap();
        assert_eq!(resolved.name, CommandName::from(["x", "y", "z"]));
        assert_eq!(resolved.arg, "");
    }

    #[test]
    fn test_alias_resolution_is_case_insensitive() {
        let table = table(&[CommandName::from(("weather", "today"))]);
        table.alias("WT", CommandName::from(("weather", "today")));

        let resolved = table
            .resolve(&CommandSyntax::default(), "/wt Tokyo")
            .unwrap();
        assert_eq!(resolved.name, CommandName::from(("weather", "today")));
        assert_eq!(resolved.arg, "Tokyo");
        assert_eq!(resolved.name.to_string(), "weather.today");
    }

    #[test]
    fn test_unrecognized_inputs() {
        let table = table(&[CommandName::from("echo")]);
        let syntax = CommandSyntax::default();

        assert_eq!(table.resolve(&syntax, "echo hi"), None);
        assert_eq!(table.resolve(&syntax, "/"), None);
        assert_eq!(table.resolve(&syntax, "/   "), None);
        assert_eq!(table.resolve(&syntax, "/unknown"), None);
    }

    #[test]
    fn test_regex_start_marker() {
        let table = table(&[CommandName::from("ping")]);
        let syntax = CommandSyntax {
            starts: vec![Pattern::regex(r"[!！]+").unwrap()],
            separators: vec![Pattern::literal(".")],
        };

        assert!(table.resolve(&syntax, "!!ping").is_some());
        assert!(table.resolve(&syntax, "x!ping").is_none());
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let table = CommandTable::new();
        assert!(!table.insert(CommandName::new(Vec::<String>::new())));
        assert!(table.is_empty());
    }
}
