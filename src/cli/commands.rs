//! Subcommand handlers for generation, resume, and config actions.

use std::path::PathBuf;

use super::args::{Args, ConfigAction};
use crate::config::{default_path as default_config_path, ProviderConfig};
use crate::pipeline::{self, CancelToken, PipelineOptions, StartStage};
use crate::project::Project;

/// Build pipeline options from parsed arguments.
pub fn options_from_args(args: &Args) -> PipelineOptions {
    PipelineOptions {
        num_scenes: args.scenes,
        style: args.style.into(),
        resolution: args.resolution.into(),
        fps: args.fps,
        voice: args.voice.into(),
        effect: args.effect.map(Into::into),
        cross_fade: if args.no_cross_fade { 0.0 } else { args.cross_fade },
        concurrency: args.concurrency,
    }
}

/// Directory name for a new project: a prompt slug plus a timestamp.
pub fn project_dir_name(prompt: &str, now: chrono::DateTime<chrono::Utc>) -> String {
    let slug: String = prompt
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let slug = if slug.is_empty() {
        "project".to_string()
    } else {
        slug.chars().take(32).collect()
    };
    format!("{}_{}", slug, now.format("%Y%m%d_%H%M%S"))
}

/// Run the full pipeline for a prompt and print the outcome.
pub async fn run_generate(prompt: &str, args: &Args, config: &ProviderConfig) {
    let options = options_from_args(args);
    let root = args
        .output_dir
        .join(project_dir_name(prompt, chrono::Utc::now()));

    let cancel = CancelToken::new();
    if let Err(e) = cancel.install_ctrlc_handler() {
        log::warn!("could not install Ctrl+C handler: {}", e);
    }

    match pipeline::run_pipeline(prompt, &options, config, root, &cancel).await {
        Ok(project) => print_summary(&project),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Resume a persisted project and print the outcome.
pub async fn run_resume(
    project_dir: PathBuf,
    from: Option<StartStage>,
    args: &Args,
    config: &ProviderConfig,
) {
    let options = options_from_args(args);

    let cancel = CancelToken::new();
    if let Err(e) = cancel.install_ctrlc_handler() {
        log::warn!("could not install Ctrl+C handler: {}", e);
    }

    match pipeline::resume(&project_dir, from, &options, config, &cancel).await {
        Ok(project) => print_summary(&project),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_summary(project: &Project) {
    println!("Project: {}", project.root().display());
    println!("State:   {:?}", project.state);
    println!("Scenes:  {}", project.scenes.len());
    for scene in &project.scenes {
        println!(
            "  {}. {} ({:.1}s)",
            scene.index + 1,
            scene.title,
            scene.duration_seconds
        );
    }
    if let Some(video) = &project.video_path {
        println!("Video:   {}", video.display());
    }
    if !project.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &project.warnings {
            println!("  - {}", warning);
        }
    }
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction, config_path: Option<PathBuf>) {
    let config_path = config_path.unwrap_or_else(default_config_path);

    match action {
        ConfigAction::Show => {
            match ProviderConfig::load(Some(&config_path)) {
                Ok(config) => {
                    println!("Configured providers:");
                    println!(
                        "  OpenAI:      {} (model {}, image {}, tts {})",
                        key_status(config.openai.api_key.as_deref()),
                        config.openai.model,
                        config.openai.image_model,
                        config.openai.tts_model,
                    );
                    println!(
                        "  Gemini:      {} (model {})",
                        key_status(config.gemini.api_key.as_deref()),
                        config.gemini.model,
                    );
                    println!(
                        "  ElevenLabs:  {} (voice {})",
                        key_status(config.elevenlabs.api_key.as_deref()),
                        config.elevenlabs.voice_id,
                    );
                    println!(
                        "  Pollinations: {} (keyless)",
                        if config.pollinations.enabled {
                            "enabled"
                        } else {
                            "disabled"
                        },
                    );
                    println!();
                    if config_path.exists() {
                        println!("Config file: {} (exists)", config_path.display());
                    } else {
                        println!("Config file: {} (not found)", config_path.display());
                    }
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Init => {
            if config_path.exists() {
                eprintln!("Config file already exists: {}", config_path.display());
                eprintln!("Use 'storyreel config show' to view current settings.");
                std::process::exit(1);
            }

            if let Some(parent) = config_path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    eprintln!("Error creating config directory: {}", e);
                    std::process::exit(1);
                }
            }

            let default_config = r#"# storyreel configuration
#
# API keys can also come from the environment (OPENAI_API_KEY,
# GEMINI_API_KEY, ELEVENLABS_API_KEY); environment values win.

[openai]
# api_key = "sk-..."
model = "gpt-4o-mini"
image_model = "dall-e-3"
tts_model = "tts-1"

[gemini]
# api_key = "..."
model = "gemini-2.5-flash"

[elevenlabs]
# api_key = "..."
voice_id = "21m00Tcm4TlvDq8ikWAM"

[pollinations]
# Keyless image provider, used as the fallback tail of the image chain.
enabled = true
# model = "flux"
"#;

            if let Err(e) = std::fs::write(&config_path, default_config) {
                eprintln!("Error writing config file: {}", e);
                std::process::exit(1);
            }

            println!("Created config file: {}", config_path.display());
        }
    }
}

fn key_status(key: Option<&str>) -> &'static str {
    match key {
        Some(k) if !k.is_empty() => "configured",
        _ => "no key",
    }
}
