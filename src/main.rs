//! M3U Scanner CLI
//!
//! Scans a directory for videos and writes, lists or serves an M3U playlist.

use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

use m3u_scanner::{
    collect_videos, create_playlist, CancelToken, ExtensionSet, IgnoreSyntax, ScanConfig,
    ServerConfig,
};

const ABOUT: &str = r#"
M3U Scanner - build M3U playlists from a video directory

Examples:
  m3u_scanner generate -d /media/videos -b http://nas:3000/videos
  m3u_scanner generate -d /media/videos -o movies.m3u --ignore-file .fileignore
  m3u_scanner list -d /media/videos --json
  m3u_scanner serve --port 8080            (reads VIDEOS_PATH, BASE_URL, ... from env / .env)
"#;

/// Build M3U playlists from a video directory
#[derive(Parser)]
#[command(name = "m3u_scanner")]
#[command(author, version, about = ABOUT, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a playlist file
    Generate {
        /// Directory to scan
        #[arg(short = 'd', long)]
        dir: PathBuf,

        /// Output playlist file
        #[arg(short = 'o', long, default_value = "playlist.m3u")]
        output: PathBuf,

        /// Base URL prepended to every video path
        #[arg(short = 'b', long, default_value = "")]
        base_url: String,

        #[command(flatten)]
        scan: ScanArgs,
    },
    /// Print the videos that would go into the playlist
    List {
        /// Directory to scan
        #[arg(short = 'd', long)]
        dir: PathBuf,

        /// Print a JSON array instead of one path per line
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        scan: ScanArgs,
    },
    /// Serve the playlist and the videos over HTTP
    Serve {
        /// Listen port (overrides PORT)
        #[arg(short = 'p', long)]
        port: Option<u16>,

        /// Load environment from this file instead of ./.env
        #[arg(long)]
        env_file: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Ignore file with one pattern per line
    #[arg(long, default_value = m3u_scanner::config::DEFAULT_IGNORE_FILE)]
    ignore_file: PathBuf,

    /// Do not read any ignore file
    #[arg(long, conflicts_with = "ignore_file")]
    no_ignore: bool,

    /// Treat every `*` and `?` in ignore patterns as wildcards
    #[arg(long)]
    glob: bool,

    /// Video extension to look for (repeatable, replaces the defaults)
    #[arg(short = 'e', long = "ext")]
    extensions: Vec<String>,

    /// Walker threads (0 = auto, 1 = sequential)
    #[arg(short = 't', long, default_value = "0")]
    threads: usize,
}

impl ScanArgs {
    fn to_config(&self) -> ScanConfig {
        let mut builder = ScanConfig::builder().num_threads(self.threads);
        builder = if self.no_ignore {
            builder.no_ignore_file()
        } else {
            builder.ignore_file(&self.ignore_file)
        };
        if self.glob {
            builder = builder.ignore_syntax(IgnoreSyntax::Glob);
        }
        if !self.extensions.is_empty() {
            builder = builder.extensions(ExtensionSet::new(&self.extensions));
        }
        builder.build()
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            dir,
            output,
            base_url,
            scan,
        } => {
            info!("Scanning {:?}", dir);
            let config = scan.to_config();
            match create_playlist(&dir, &output, &base_url, &config) {
                Ok(_) => ExitCode::SUCCESS,
                Err(e) => {
                    error!("Error generating playlist: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Commands::List { dir, json, scan } => {
            let config = scan.to_config();
            let entries = match collect_videos(&dir, &config, &CancelToken::new()) {
                Ok(entries) => entries,
                Err(e) => {
                    error!("Error scanning {:?}: {}", dir, e);
                    return ExitCode::FAILURE;
                }
            };
            if json {
                match serde_json::to_string_pretty(&entries) {
                    Ok(text) => println!("{}", text),
                    Err(e) => {
                        error!("Failed to serialize entries: {}", e);
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                for entry in &entries {
                    println!("{}", entry);
                }
            }
            ExitCode::SUCCESS
        }
        Commands::Serve { port, env_file } => {
            let loaded = match &env_file {
                Some(path) => dotenvy::from_path(path).map(|_| Some(path.clone())),
                None => dotenvy::dotenv().map(Some),
            };
            match loaded {
                Ok(path) => info!("Loaded environment from {:?}", path),
                Err(e) if e.not_found() => {}
                Err(e) => {
                    error!("Failed to load environment file: {}", e);
                    return ExitCode::FAILURE;
                }
            }

            let mut config = ServerConfig::from_env();
            if let Some(port) = port {
                config.port = port;
            }

            let runtime = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    error!("Failed to start runtime: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            match runtime.block_on(m3u_scanner::server::serve(config)) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!("Server error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}
