//! cliptrim CLI: command-line interface for trimming and exporting clips.
//!
//! Every editing command works on an edit document stored next to the
//! source (`<source>.cliptrim.json`); pass either the source or the
//! document path.
//!
//! Usage:
//!   cliptrim init <SOURCE>          Probe a source and create its document
//!   cliptrim info <PATH>            Show segments, regions and history
//!   cliptrim split <PATH>           Split at the playhead or `--at`
//!   cliptrim autocut <PATH>         Keep only the non-silent parts
//!   cliptrim plan <PATH>            Print the ffmpeg command for an export
//!   cliptrim export <PATH>          Export the edit
//!   cliptrim check                  Check ffmpeg and encoder availability

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cliptrim_common::AppConfig;

mod commands;

use commands::{EdgeArg, ModeArg, RegionAction};

#[derive(Parser)]
#[command(
    name = "cliptrim",
    about = "Trim, clean up and export short clips with ffmpeg",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the standard location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe a source file and create its edit document
    Init {
        /// Source media file
        source: PathBuf,

        /// Overwrite an existing document
        #[arg(long)]
        force: bool,
    },

    /// Show the current edit
    Info {
        /// Source or document path
        path: PathBuf,
    },

    /// Split the segment under a position
    Split {
        /// Source or document path
        path: PathBuf,

        /// Position in milliseconds (defaults to the playhead)
        #[arg(long)]
        at: Option<i64>,
    },

    /// Delete segments by index
    Delete {
        /// Source or document path
        path: PathBuf,

        /// Zero-based segment indices
        #[arg(required = true)]
        indices: Vec<usize>,
    },

    /// Move one edge of a segment
    Resize {
        /// Source or document path
        path: PathBuf,

        /// Zero-based segment index
        index: usize,

        /// Which edge to move
        #[arg(value_enum)]
        edge: EdgeArg,

        /// New edge time in milliseconds
        time_ms: i64,
    },

    /// Undo the last timeline edit
    Undo {
        /// Source or document path
        path: PathBuf,
    },

    /// Redo the last undone edit
    Redo {
        /// Source or document path
        path: PathBuf,
    },

    /// Mute segments (or unmute with --off)
    Mute {
        /// Source or document path
        path: PathBuf,

        /// Zero-based segment indices
        #[arg(required = true)]
        indices: Vec<usize>,

        /// Unmute instead
        #[arg(long, conflicts_with = "toggle")]
        off: bool,

        /// Flip each segment's mute state
        #[arg(long)]
        toggle: bool,
    },

    /// Set the audio gain of segments
    Volume {
        /// Source or document path
        path: PathBuf,

        /// Gain, 1.0 is unchanged
        level: f32,

        /// Zero-based segment indices
        #[arg(required = true)]
        indices: Vec<usize>,
    },

    /// Move the playhead
    Seek {
        /// Source or document path
        path: PathBuf,

        /// Absolute position in milliseconds
        #[arg(long, conflicts_with_all = ["forward", "back"])]
        to: Option<i64>,

        /// Step forward
        #[arg(long, conflicts_with = "back")]
        forward: bool,

        /// Step back
        #[arg(long)]
        back: bool,

        /// Use the fine step instead of the coarse one
        #[arg(long)]
        fine: bool,
    },

    /// Replace the timeline with the non-silent parts of the source
    Autocut {
        /// Source or document path
        path: PathBuf,

        /// Silence threshold in dB
        #[arg(long)]
        noise_db: Option<f64>,

        /// Minimum silence length in seconds
        #[arg(long)]
        min_silence: Option<f64>,

        /// Seconds kept around speech
        #[arg(long)]
        padding: Option<f64>,
    },

    /// Set or reset the crop rectangle
    Crop {
        /// Source or document path
        path: PathBuf,

        /// Normalized edges as `left,top,right,bottom`
        #[arg(long, conflicts_with = "reset")]
        rect: Option<String>,

        /// Remove the crop
        #[arg(long)]
        reset: bool,
    },

    /// Manage privacy filter regions
    Region {
        /// Source or document path
        path: PathBuf,

        #[command(subcommand)]
        action: RegionAction,
    },

    /// Show or change the selected audio track
    Tracks {
        /// Source or document path
        path: PathBuf,

        /// Zero-based track to select
        #[arg(long, conflicts_with = "cycle")]
        select: Option<usize>,

        /// Advance to the next track
        #[arg(long)]
        cycle: bool,
    },

    /// Set or clear the custom export name
    Name {
        /// Source or document path
        path: PathBuf,

        /// File name without extension; omit to use the generated name
        name: Option<String>,
    },

    /// Print the ffmpeg command an export would run
    Plan {
        /// Source or document path
        path: PathBuf,

        /// Export mode
        #[arg(long, value_enum, default_value = "video")]
        mode: ModeArg,

        /// Probe for the hardware encoder instead of assuming libx264
        #[arg(long)]
        probe_encoder: bool,
    },

    /// Export the edit
    Export {
        /// Source or document path
        path: PathBuf,

        /// Export mode
        #[arg(long, value_enum, default_value = "video")]
        mode: ModeArg,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check ffmpeg, ffprobe and encoder availability
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    // Initialize logging
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    cliptrim_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Init { source, force } => commands::init::run(&config, source, force).await,
        Commands::Info { path } => commands::info::run(&config, path),
        Commands::Split { path, at } => commands::edit::split(&config, path, at),
        Commands::Delete { path, indices } => commands::edit::delete(&config, path, indices),
        Commands::Resize {
            path,
            index,
            edge,
            time_ms,
        } => commands::edit::resize(&config, path, index, edge, time_ms),
        Commands::Undo { path } => commands::edit::undo(&config, path),
        Commands::Redo { path } => commands::edit::redo(&config, path),
        Commands::Mute {
            path,
            indices,
            off,
            toggle,
        } => commands::edit::mute(&config, path, indices, off, toggle),
        Commands::Volume {
            path,
            level,
            indices,
        } => commands::edit::volume(&config, path, indices, level),
        Commands::Seek {
            path,
            to,
            forward,
            back,
            fine,
        } => commands::edit::seek(&config, path, to, forward, back, fine),
        Commands::Autocut {
            path,
            noise_db,
            min_silence,
            padding,
        } => {
            if let Some(noise_db) = noise_db {
                config.silence.noise_db = noise_db;
            }
            if let Some(min_silence) = min_silence {
                config.silence.min_silence_s = min_silence;
            }
            if let Some(padding) = padding {
                config.silence.padding_s = padding;
            }
            commands::autocut::run(&config, path).await
        }
        Commands::Crop { path, rect, reset } => commands::regions::crop(&config, path, rect, reset),
        Commands::Region { path, action } => commands::regions::region(&config, path, action),
        Commands::Tracks {
            path,
            select,
            cycle,
        } => commands::tracks::run(&config, path, select, cycle),
        Commands::Name { path, name } => commands::edit::name(&config, path, name),
        Commands::Plan {
            path,
            mode,
            probe_encoder,
        } => commands::plan::run(&config, path, mode, probe_encoder).await,
        Commands::Export { path, mode, output } => {
            commands::export::run(&config, path, mode, output).await
        }
        Commands::Check => commands::check::run(&config).await,
    }
}
