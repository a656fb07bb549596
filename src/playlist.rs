//! M3U playlist generation

use crate::models::{PlaylistLine, VideoEntry};

/// Playlist header line
pub const M3U_HEADER: &str = "#EXTM3U";

/// Turns a relative video path into the URL written to the playlist
pub trait UrlResolver {
    /// Resolve a `/`-separated path relative to the scan root
    fn resolve(&self, relative_path: &str) -> String;
}

impl<F> UrlResolver for F
where
    F: Fn(&str) -> String,
{
    fn resolve(&self, relative_path: &str) -> String {
        self(relative_path)
    }
}

fn strip_trailing_slashes(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// Base URL + `/` + relative path
#[derive(Debug, Clone)]
pub struct PlainUrl {
    base: String,
}

impl PlainUrl {
    /// Trailing slashes on `base` are dropped
    pub fn new(base: impl AsRef<str>) -> Self {
        Self {
            base: strip_trailing_slashes(base.as_ref()).to_string(),
        }
    }
}

impl UrlResolver for PlainUrl {
    fn resolve(&self, relative_path: &str) -> String {
        format!("{}/{}", self.base, relative_path)
    }
}

/// Like [`PlainUrl`], with `user:password@` placed in the authority
///
/// Both credentials are percent-encoded. A base URL without `://` is used
/// unchanged.
#[derive(Clone)]
pub struct AuthenticatedUrl {
    base: String,
}

impl AuthenticatedUrl {
    /// Trailing slashes on `base` are dropped, as for [`PlainUrl`]
    pub fn new(base: impl AsRef<str>, username: &str, password: &str) -> Self {
        let base = strip_trailing_slashes(base.as_ref());
        let credentials = format!(
            "://{}:{}@",
            urlencoding::encode(username),
            urlencoding::encode(password)
        );
        Self {
            base: base.replacen("://", &credentials, 1),
        }
    }
}

// The base URL carries the password.
impl std::fmt::Debug for AuthenticatedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedUrl").finish_non_exhaustive()
    }
}

impl UrlResolver for AuthenticatedUrl {
    fn resolve(&self, relative_path: &str) -> String {
        format!("{}/{}", self.base, relative_path)
    }
}

/// Default title: base name without extension
pub fn default_title(entry: &VideoEntry) -> String {
    entry.title().to_string()
}

/// Compute the playlist lines for `entries`, in order
pub fn lines<T, R>(entries: &[VideoEntry], title_of: T, resolver: &R) -> Vec<PlaylistLine>
where
    T: Fn(&VideoEntry) -> String,
    R: UrlResolver + ?Sized,
{
    entries
        .iter()
        .map(|entry| {
            let normalized = entry.as_str().replace('\\', "/");
            PlaylistLine {
                title: title_of(entry),
                url: resolver.resolve(&normalized),
            }
        })
        .collect()
}

/// Render a playlist with default titles
pub fn build<R>(entries: &[VideoEntry], resolver: &R) -> String
where
    R: UrlResolver + ?Sized,
{
    build_with(entries, default_title, resolver)
}

/// Render a playlist with a custom title function
pub fn build_with<T, R>(entries: &[VideoEntry], title_of: T, resolver: &R) -> String
where
    T: Fn(&VideoEntry) -> String,
    R: UrlResolver + ?Sized,
{
    let mut content = String::from(M3U_HEADER);
    content.push('\n');
    for line in lines(entries, title_of, resolver) {
        line.render_into(&mut content);
    }
    content
}
