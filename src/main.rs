// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use notekit::constants::{APP_DIR_NAME, files};
use notekit::i18n;
use std::path::PathBuf;
use std::sync::Mutex;

mod cli;

#[derive(Parser)]
#[command(name = "notekit")]
#[command(about = "Camera, voice memo and barcode scanner for interview notes")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full-screen terminal interface (default)
    Terminal,

    /// List cameras and microphones
    Devices,

    /// Take a photo
    Photo {
        /// Use the front camera instead of the configured one
        #[arg(short, long)]
        front: bool,

        /// Output file path (default: ~/Pictures/notekit/<timestamp>.jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Browse the photo gallery
    Gallery {
        #[command(subcommand)]
        action: GalleryAction,
    },

    /// Record a voice memo
    Record {
        /// Recording duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,
    },

    /// Play a recording (default: the most recent one)
    Play { path: Option<PathBuf> },

    /// Scan a QR code
    Scan {
        /// Decode an image file instead of the camera
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Do not retry on a magnified centre crop
        #[arg(long)]
        no_auto_zoom: bool,
    },
}

#[derive(Subcommand)]
enum GalleryAction {
    /// List photos, newest first
    List,
    /// Delete a photo
    Delete { path: PathBuf },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, None | Some(Commands::Terminal));
    init_logging(interactive);

    // Get the system's preferred languages.
    let requested_languages = i18n_embed::DesktopLanguageRequester::requested_languages();
    i18n::init(&requested_languages);

    match cli.command {
        None | Some(Commands::Terminal) => notekit::terminal::run(),
        Some(Commands::Devices) => cli::list_devices(),
        Some(Commands::Photo { front, output }) => cli::take_photo(front, output),
        Some(Commands::Gallery { action }) => match action {
            GalleryAction::List => cli::list_gallery(),
            GalleryAction::Delete { path } => cli::delete_photo(path),
        },
        Some(Commands::Record { duration }) => cli::record(duration),
        Some(Commands::Play { path }) => cli::play(path),
        Some(Commands::Scan {
            image,
            no_auto_zoom,
        }) => cli::scan(image, !no_auto_zoom),
    }
}

/// Set up tracing
///
/// Set RUST_LOG to control the level, e.g. RUST_LOG=debug or
/// RUST_LOG=notekit=info. The terminal interface owns the screen, so it logs
/// to `~/.cache/notekit/notekit.log` instead of stderr.
fn init_logging(to_file: bool) {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };

    if to_file && let Some(file) = open_log_file() {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
            .with_level(true)
            .init();
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_target(true)
        .with_level(true)
        .init();
}

fn open_log_file() -> Option<std::fs::File> {
    let dir = dirs::cache_dir()?.join(APP_DIR_NAME);
    std::fs::create_dir_all(&dir).ok()?;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(files::LOG_FILE))
        .ok()
}
