//! Recursive video scanner and M3U playlist builder
//!
//! This library walks a directory tree for video files in parallel with
//! rayon, filters the result through an optional ignore file, and renders an
//! M3U playlist. The `server` module exposes the playlist and the files
//! themselves over HTTP.

pub mod auth;
pub mod config;
pub mod error;
pub mod ignore;
pub mod models;
pub mod playlist;
pub mod scanner;
pub mod server;

use std::path::Path;

pub use config::{ScanConfig, ServerConfig};
pub use error::{PlaylistError, ScanError, ScanErrorKind};
pub use ignore::{IgnorePattern, IgnoreSyntax};
pub use models::{ExtensionSet, PlaylistLine, VideoEntry};
pub use playlist::{AuthenticatedUrl, PlainUrl, UrlResolver};
pub use scanner::{scan, scan_with, CancelToken};

/// Scan `root` and drop entries matched by the configured ignore file
pub fn collect_videos(
    root: &Path,
    config: &ScanConfig,
    cancel: &CancelToken,
) -> Result<Vec<VideoEntry>, ScanError> {
    let entries = scanner::scan_with(root, config, cancel)?;
    let Some(ignore_file) = config.ignore_file.as_deref() else {
        return Ok(entries);
    };
    let patterns = ignore::load_with_syntax(ignore_file, config.ignore_syntax);
    Ok(ignore::filter(entries, &patterns))
}

/// Write an M3U playlist of the videos under `directory` to `output_file`.
///
/// URLs are `base_url` joined with each relative path. Returns the number of
/// playlist entries written.
pub fn create_playlist(
    directory: &Path,
    output_file: &Path,
    base_url: &str,
    config: &ScanConfig,
) -> Result<usize, PlaylistError> {
    let entries = collect_videos(directory, config, &CancelToken::new())?;
    let content = playlist::build(&entries, &PlainUrl::new(base_url));

    std::fs::write(output_file, content).map_err(|source| PlaylistError::Write {
        path: output_file.to_path_buf(),
        source,
    })?;

    log::info!("Playlist generated successfully: {:?}", output_file);
    log::info!("Found {} video files", entries.len());
    Ok(entries.len())
}
