//! Core data models for the video scanner

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Video extensions recognized by default (lowercase, without dot)
pub const DEFAULT_VIDEO_EXTENSIONS: [&str; 5] = ["mkv", "mp4", "avi", "mov", "wmv"];

/// A video file found by the scanner, as a path relative to the scan root
///
/// Separators are always `/`, whatever the host platform uses.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoEntry(String);

impl VideoEntry {
    /// Create an entry from a relative path string, normalizing `\` to `/`
    pub fn new(relative: impl Into<String>) -> Self {
        let relative = relative.into();
        if relative.contains('\\') {
            Self(relative.replace('\\', "/"))
        } else {
            Self(relative)
        }
    }

    /// Build an entry from a relative `Path`.
    ///
    /// Returns `None` when a component is not valid UTF-8.
    pub fn from_relative_path(relative: &Path) -> Option<Self> {
        let mut parts = Vec::new();
        for component in relative.components() {
            parts.push(component.as_os_str().to_str()?);
        }
        Some(Self(parts.join("/")))
    }

    /// The relative path, `/`-separated
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path component
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// File name with its extension stripped.
    ///
    /// A leading dot does not start an extension, so `.hidden` stays `.hidden`.
    pub fn title(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        }
    }
}

impl fmt::Display for VideoEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoEntry {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VideoEntry {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for VideoEntry {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Case-insensitive set of file extensions that count as video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionSet {
    extensions: HashSet<String>,
}

impl Default for ExtensionSet {
    fn default() -> Self {
        Self::new(DEFAULT_VIDEO_EXTENSIONS)
    }
}

impl ExtensionSet {
    /// Build a set; a leading dot on any extension is ignored
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self { extensions }
    }

    /// Check a bare extension (no dot), ignoring case
    pub fn contains(&self, ext: &str) -> bool {
        self.extensions.contains(&ext.to_lowercase())
    }

    /// Check whether the file name at `path` carries a listed extension
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.contains(e))
            .unwrap_or(false)
    }

    /// Number of extensions in the set
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

/// One playlist item: the `#EXTINF` title and the URL line under it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistLine {
    /// Display title
    pub title: String,
    /// Resolved URL
    pub url: String,
}

impl PlaylistLine {
    /// Render as the two M3U lines, each terminated by `\n`
    pub fn render_into(&self, out: &mut String) {
        out.push_str("#EXTINF:-1,");
        out.push_str(&self.title);
        out.push('\n');
        out.push_str(&self.url);
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_extensions() {
        let set = ExtensionSet::default();
        assert_eq!(set.len(), 5);
        assert!(set.contains("mkv"));
        assert!(set.contains("MKV"));
        assert!(set.contains("Mov"));
        assert!(!set.contains("flv"));
        assert!(!set.contains("txt"));
    }

    #[test]
    fn test_extension_matches_path() {
        let set = ExtensionSet::default();
        assert!(set.matches(Path::new("movie.MKV")));
        assert!(set.matches(Path::new("sub/clip.mp4")));
        assert!(!set.matches(Path::new("readme.txt")));
        assert!(!set.matches(Path::new("mp4")));
        assert!(!set.matches(Path::new(".mp4")));
    }

    #[test]
    fn test_custom_extensions_strip_dot() {
        let set = ExtensionSet::new([".WEBM", "m4v", ""]);
        assert_eq!(set.len(), 2);
        assert!(set.contains("webm"));
        assert!(set.contains("M4V"));
    }

    #[test]
    fn test_entry_normalizes_backslashes() {
        let entry = VideoEntry::new("shows\\season 1\\ep1.mkv");
        assert_eq!(entry.as_str(), "shows/season 1/ep1.mkv");
    }

    #[test]
    fn test_entry_from_relative_path() {
        let rel: PathBuf = ["sub", "clip.mp4"].iter().collect();
        let entry = VideoEntry::from_relative_path(&rel).unwrap();
        assert_eq!(entry.as_str(), "sub/clip.mp4");
    }

    #[test]
    fn test_entry_title() {
        assert_eq!(VideoEntry::new("a/b.mp4").title(), "b");
        assert_eq!(VideoEntry::new("movie.MKV").title(), "movie");
        assert_eq!(VideoEntry::new("x/some.movie.2020.avi").title(), "some.movie.2020");
        assert_eq!(VideoEntry::new("x/.hidden").title(), ".hidden");
        assert_eq!(VideoEntry::new("noext").title(), "noext");
    }

    #[test]
    fn test_playlist_line_render() {
        let line = PlaylistLine {
            title: "b".to_string(),
            url: "http://host/a/b.mp4".to_string(),
        };
        let mut out = String::new();
        line.render_into(&mut out);
        assert_eq!(out, "#EXTINF:-1,b\nhttp://host/a/b.mp4\n");
    }
}
