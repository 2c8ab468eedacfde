//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing, enums, and subcommand handlers.

mod args;
mod commands;
mod enums;

pub use args::{Args, Command, ConfigAction};
pub use commands::{
    handle_config_action, options_from_args, project_dir_name, run_generate, run_resume,
};
pub use enums::{Effect, Resolution, Stage, Style, Voice};
