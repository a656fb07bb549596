//! Configuration for the scanner and the HTTP server
//!
//! Both structs are built once at startup and passed down explicitly;
//! nothing below `main` reads the process environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ignore::IgnoreSyntax;
use crate::models::ExtensionSet;

/// Default ignore file, resolved against the working directory
pub const DEFAULT_IGNORE_FILE: &str = ".fileignore";

/// Default listen port for `serve`
pub const DEFAULT_PORT: u16 = 3000;

/// Configuration for a scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Extensions that count as video
    pub extensions: ExtensionSet,

    /// Ignore file to load after scanning; `None` disables filtering
    pub ignore_file: Option<PathBuf>,

    /// How ignore patterns are interpreted
    pub ignore_syntax: IgnoreSyntax,

    /// Number of threads for the directory walk
    /// 0 means auto-detect, 1 walks sequentially on the calling thread
    pub num_threads: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: ExtensionSet::default(),
            ignore_file: Some(PathBuf::from(DEFAULT_IGNORE_FILE)),
            ignore_syntax: IgnoreSyntax::default(),
            num_threads: 0,
        }
    }
}

impl ScanConfig {
    /// Create a config builder
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::new()
    }

    /// Get the effective number of threads
    pub fn effective_threads(&self) -> usize {
        if self.num_threads == 0 {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        } else {
            self.num_threads
        }
    }

    /// Whether the walk should run sequentially
    pub fn is_sequential(&self) -> bool {
        self.num_threads == 1
    }
}

/// Builder for ScanConfig
#[derive(Debug, Default)]
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl ScanConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the recognized extensions
    pub fn extensions(mut self, extensions: ExtensionSet) -> Self {
        self.config.extensions = extensions;
        self
    }

    /// Set the ignore file path
    pub fn ignore_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ignore_file = Some(path.into());
        self
    }

    /// Disable ignore filtering
    pub fn no_ignore_file(mut self) -> Self {
        self.config.ignore_file = None;
        self
    }

    /// Set the ignore pattern syntax
    pub fn ignore_syntax(mut self, syntax: IgnoreSyntax) -> Self {
        self.config.ignore_syntax = syntax;
        self
    }

    /// Set the number of threads
    pub fn num_threads(mut self, threads: usize) -> Self {
        self.config.num_threads = threads;
        self
    }

    /// Build the config
    pub fn build(self) -> ScanConfig {
        self.config
    }
}

/// Configuration for the HTTP server
///
/// Values stay optional here; handlers report what is missing at request
/// time, so a partially configured server still answers `/health`.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Root directory holding the videos (`VIDEOS_PATH`)
    pub videos_path: Option<PathBuf>,
    /// Public base URL of the video files (`BASE_URL`)
    pub base_url: Option<String>,
    /// Secret for `/playlist` (`API_KEY`)
    pub api_key: Option<String>,
    /// Basic-auth user for `/videos` (`HTTP_AUTH_USERNAME`)
    pub auth_username: Option<String>,
    /// Basic-auth password for `/videos` (`HTTP_AUTH_PASSWORD`)
    pub auth_password: Option<String>,
    /// Listen port (`PORT`)
    pub port: u16,
    /// Scan settings used by `/playlist`
    pub scan: ScanConfig,
}

impl ServerConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let port = match get("PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                log::warn!("Invalid PORT {:?}, using {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        let mut scan = ScanConfig::default();
        if let Some(path) = get("IGNORE_FILE") {
            scan.ignore_file = Some(PathBuf::from(path));
        }

        Self {
            videos_path: get("VIDEOS_PATH").map(PathBuf::from),
            base_url: get("BASE_URL"),
            api_key: get("API_KEY"),
            auth_username: get("HTTP_AUTH_USERNAME"),
            auth_password: get("HTTP_AUTH_PASSWORD"),
            port,
            scan,
        }
    }
}
