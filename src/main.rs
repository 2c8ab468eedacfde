//! storyreel binary entry point.

use clap::Parser;

use storyreel::cli::{self, Args, Command};
use storyreel::config::ProviderConfig;

#[tokio::main]
async fn main() {
    // dotenv::dotenv() returns Err if .env doesn't exist, which is fine
    let _ = dotenv::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = match ProviderConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match &args.command {
        Some(Command::Config { action }) => {
            cli::handle_config_action(action.clone(), args.config.clone());
        }
        Some(Command::Resume { project_dir, from }) => {
            cli::run_resume(
                project_dir.clone(),
                (*from).map(Into::into),
                &args,
                &config,
            )
            .await;
        }
        None => match &args.prompt {
            Some(prompt) => {
                cli::run_generate(prompt, &args, &config).await;
            }
            None => {
                eprintln!("Error: provide a prompt or a subcommand (see --help)");
                std::process::exit(2);
            }
        },
    }
}
