//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::enums::{Effect, Resolution, Stage, Style, Voice};

/// Turn a short text prompt into a narrated slideshow video
#[derive(Parser, Debug)]
#[command(name = "storyreel")]
#[command(version, about = "AI-narrated slideshow video generator", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Video idea to generate from
    pub prompt: Option<String>,

    /// Number of scenes (1-10)
    #[arg(short = 'n', long, default_value = "3")]
    pub scenes: usize,

    /// Narrative style
    #[arg(long, default_value = "cinematic")]
    pub style: Style,

    /// Output resolution
    #[arg(long, default_value = "landscape")]
    pub resolution: Resolution,

    /// Output frame rate
    #[arg(long, default_value = "30")]
    pub fps: u32,

    /// Narration voice
    #[arg(long, default_value = "alloy")]
    pub voice: Voice,

    /// Force one effect onto every scene
    #[arg(long)]
    pub effect: Option<Effect>,

    /// Cross-fade between scenes in seconds
    #[arg(long, default_value = "0.5")]
    pub cross_fade: f64,

    /// Disable cross-fades (hard cuts)
    #[arg(long)]
    pub no_cross_fade: bool,

    /// Per-scene concurrency for provider calls
    #[arg(long, default_value = "4")]
    pub concurrency: usize,

    /// Directory to create the project under
    #[arg(short, long, default_value = "outputs")]
    pub output_dir: PathBuf,

    /// Config file path
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Re-run a persisted project from a stage
    Resume {
        /// Project directory to resume
        project_dir: PathBuf,

        /// Stage to restart from (default: inferred from project state)
        #[arg(long)]
        from: Option<Stage>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}
