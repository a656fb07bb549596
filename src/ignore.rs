//! Ignore file loading and path filtering
//!
//! An ignore file holds one pattern per line; blank lines and lines
//! starting with `#` are skipped. Patterns are matched against the whole
//! relative path of an entry, not just its file name.
//!
//! The default [`IgnoreSyntax::Legacy`] treats only the *first* `*` of a
//! pattern as a wildcard. Everything else, including any later `*`, matches
//! literally. [`IgnoreSyntax::Glob`] turns every `*` and `?` into a wildcard
//! and has to be selected explicitly.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::models::VideoEntry;

/// How the text of an ignore pattern is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IgnoreSyntax {
    /// First `*` matches any substring, the rest is literal
    #[default]
    Legacy,
    /// Every `*` matches any substring and `?` matches one character
    Glob,
}

/// A compiled ignore pattern, anchored to the whole path
#[derive(Debug, Clone)]
pub struct IgnorePattern {
    source: String,
    regex: Regex,
}

impl IgnorePattern {
    /// Compile a pattern with the default syntax
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Self::with_syntax(pattern, IgnoreSyntax::Legacy)
    }

    /// Compile a pattern with the given syntax
    pub fn with_syntax(pattern: &str, syntax: IgnoreSyntax) -> Result<Self, regex::Error> {
        let body = match syntax {
            IgnoreSyntax::Legacy => legacy_to_regex(pattern),
            IgnoreSyntax::Glob => glob_to_regex(pattern),
        };
        let regex = Regex::new(&format!("^{}$", body))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as written in the ignore file
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `path` matches this pattern in full
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

fn legacy_to_regex(pattern: &str) -> String {
    match pattern.split_once('*') {
        Some((head, tail)) => format!("{}.*{}", regex::escape(head), regex::escape(tail)),
        None => regex::escape(pattern),
    }
}

fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            _ => out.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }
    out
}

/// Parse ignore file contents into compiled patterns
///
/// Lines are trimmed. A pattern that fails to compile is logged and dropped.
pub fn parse(contents: &str, syntax: IgnoreSyntax) -> Vec<IgnorePattern> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| match IgnorePattern::with_syntax(line, syntax) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                log::warn!("Skipping ignore pattern {:?}: {}", line, e);
                None
            }
        })
        .collect()
}

/// Load patterns from an ignore file using the default syntax
pub fn load(path: &Path) -> Vec<IgnorePattern> {
    load_with_syntax(path, IgnoreSyntax::Legacy)
}

/// Load patterns from an ignore file.
///
/// A missing or unreadable file is logged and yields no patterns.
pub fn load_with_syntax(path: &Path, syntax: IgnoreSyntax) -> Vec<IgnorePattern> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let patterns = parse(&contents, syntax);
            log::debug!("Loaded {} ignore patterns from {:?}", patterns.len(), path);
            patterns
        }
        Err(e) => {
            log::error!("Error reading ignore file {:?}: {}", path, e);
            Vec::new()
        }
    }
}

/// Whether `entry` matches any of `patterns`
pub fn is_ignored(entry: &VideoEntry, patterns: &[IgnorePattern]) -> bool {
    patterns.iter().any(|p| p.is_match(entry.as_str()))
}

/// Drop every entry that matches one of `patterns`, keeping order
pub fn filter(entries: Vec<VideoEntry>, patterns: &[IgnorePattern]) -> Vec<VideoEntry> {
    if patterns.is_empty() {
        return entries;
    }
    entries
        .into_iter()
        .filter(|entry| !is_ignored(entry, patterns))
        .collect()
}
