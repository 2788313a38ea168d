use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::reorder::{SortDirection, SortKey};

/// plsort - Reorder your YouTube playlists
///
/// Sort playlist items by title, artist, release date or position and
/// write the new order back to YouTube one move at a time.
#[derive(Parser, Debug)]
#[command(name = "plsort")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding config, credentials and journals
    #[arg(long, global = true, default_value = ".plsort")]
    pub data_dir: PathBuf,

    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in to YouTube
    Auth,
    /// Delete stored credentials
    Logout,
    /// Show the stored credential
    Whoami,
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// List your playlists
    Playlists {
        /// Only show playlists whose title contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// List the items of a playlist
    Items {
        /// Playlist URL or ID
        playlist: String,
        #[command(flatten)]
        sort: SortArgs,
        /// Only show items whose title or artist contains this text
        #[arg(short, long)]
        filter: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Sort a playlist and write the new order back
    Reorder {
        /// Playlist URL or ID
        playlist: String,
        #[command(flatten)]
        sort: SortArgs,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Show the moves without applying them
        #[arg(long)]
        dry_run: bool,
    },
    /// Add a video to a playlist
    Insert {
        /// Playlist URL or ID
        playlist: String,
        video_id: String,
        /// Zero-based position (appends when omitted)
        #[arg(short, long)]
        position: Option<u32>,
    },
    /// Move one item to a new position
    Move {
        /// Playlist URL or ID
        playlist: String,
        item_id: String,
        /// Zero-based target position
        position: u32,
    },
    /// Remove one item from a playlist
    Delete {
        /// Playlist URL or ID
        playlist: String,
        item_id: String,
    },
    /// Show the change journal of a playlist
    History {
        /// Playlist URL or ID
        playlist: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct SortArgs {
    /// Sort column; repeat to cycle asc -> desc -> none, like clicking a header
    #[arg(short, long = "sort", value_enum)]
    pub sort: Vec<SortKey>,
    /// Force the direction for the last sort column
    #[arg(short, long, value_enum)]
    pub order: Option<SortDirection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}
