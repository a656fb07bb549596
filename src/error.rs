//! Error types for the scanner, the playlist writer and the HTTP layer

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Error kinds that can occur during scanning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanErrorKind {
    /// Permission denied when accessing a file or directory
    PermissionDenied,
    /// File or directory not found (includes dangling symlinks)
    NotFound,
    /// Any other I/O error while listing or stat-ing
    IoError,
    /// The scan root is not a directory
    InvalidPath,
    /// The scan was cancelled by the caller
    Cancelled,
}

/// Represents an error that aborted a scan
#[derive(Debug, Error)]
#[error("{kind:?}: {message} (path: {path:?})")]
pub struct ScanError {
    /// The kind of error
    pub kind: ScanErrorKind,
    /// The path where the error occurred
    pub path: Option<PathBuf>,
    /// Human-readable error message
    pub message: String,
}

impl ScanError {
    /// Create a new scan error
    pub fn new(kind: ScanErrorKind, path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path,
            message: message.into(),
        }
    }

    /// Wrap an I/O error that happened at `path`
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let mut scan_err = Self::from(err);
        scan_err.path = Some(path.into());
        scan_err
    }

    /// Create an invalid path error
    pub fn invalid_path(path: PathBuf, message: impl Into<String>) -> Self {
        Self::new(ScanErrorKind::InvalidPath, Some(path), message)
    }

    /// Create a cancellation error
    pub fn cancelled(path: Option<PathBuf>) -> Self {
        Self::new(ScanErrorKind::Cancelled, path, "Scan cancelled")
    }

    /// Whether the scan stopped because the caller cancelled it
    pub fn is_cancelled(&self) -> bool {
        self.kind == ScanErrorKind::Cancelled
    }
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::PermissionDenied => ScanErrorKind::PermissionDenied,
            std::io::ErrorKind::NotFound => ScanErrorKind::NotFound,
            _ => ScanErrorKind::IoError,
        };
        Self::new(kind, None, err.to_string())
    }
}

impl From<walkdir::Error> for ScanError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(|p| p.to_path_buf());
        let message = err.to_string();
        match err.into_io_error() {
            Some(io) => {
                let mut scan_err = Self::from(io);
                scan_err.path = path;
                scan_err
            }
            None => Self::new(ScanErrorKind::IoError, path, message),
        }
    }
}

/// Errors from writing a playlist to disk
#[derive(Debug, Error)]
pub enum PlaylistError {
    /// The directory scan failed
    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),
    /// The playlist file could not be written
    #[error("failed to write playlist {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors surfaced by the HTTP layer
#[derive(Debug, Error)]
pub enum ServerError {
    /// A required setting is missing
    #[error("{0}")]
    Config(&'static str),
    /// No API key in the query or headers
    #[error("API key is required")]
    MissingApiKey,
    /// API key does not match the configured secret
    #[error("Invalid API key")]
    InvalidApiKey,
    /// The scan behind a playlist request failed
    #[error("Failed to generate playlist")]
    Playlist(#[from] ScanError),
    /// The blocking scan task panicked or was aborted
    #[error("Failed to generate playlist")]
    Task(#[from] tokio::task::JoinError),
}

impl ServerError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::MissingApiKey => StatusCode::UNAUTHORIZED,
            ServerError::InvalidApiKey => StatusCode::FORBIDDEN,
            ServerError::Config(_) | ServerError::Playlist(_) | ServerError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ServerError::Playlist(e) => log::error!("Error generating playlist: {}", e),
            ServerError::Task(e) => log::error!("Playlist task failed: {}", e),
            ServerError::Config(what) => log::error!("Configuration error: {}", what),
            ServerError::MissingApiKey | ServerError::InvalidApiKey => {}
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_kind_mapping() {
        let err = ScanError::from(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(err.kind, ScanErrorKind::NotFound);

        let err = ScanError::io(
            "/videos/locked",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert_eq!(err.kind, ScanErrorKind::PermissionDenied);
        assert_eq!(err.path, Some(PathBuf::from("/videos/locked")));
    }

    #[test]
    fn test_cancelled() {
        let err = ScanError::cancelled(None);
        assert!(err.is_cancelled());
        assert!(err.to_string().starts_with("Cancelled"));
    }

    #[test]
    fn test_server_error_status() {
        assert_eq!(ServerError::MissingApiKey.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ServerError::InvalidApiKey.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ServerError::Config("Videos path not configured").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let scan_err = ScanError::cancelled(None);
        let err = ServerError::from(scan_err);
        assert_eq!(err.to_string(), "Failed to generate playlist");
    }
}
