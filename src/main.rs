use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;

mod app;

use app::App;
use pageflow::config::Config;
use pageflow::logging;
use pageflow::ui::install_panic_hook;
use pageflow::walk::{parse_script, Walk};

#[derive(Parser)]
#[command(name = "pageflow")]
#[command(about = "Step-by-step onboarding flow in the terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Present the flow as an interactive terminal card (default)
    Run,

    /// Drive the flow from a script and print every step as JSON lines
    Walk {
        /// Actions separated by commas or spaces:
        /// select:N, continue, confirm, back, dismiss, wait:MS
        #[arg(short, long)]
        script: String,

        /// Save the favorite to the config if the walk completes the flow
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;

    let is_tui_mode = matches!(cli.command, None | Some(Commands::Run));

    // Initialize logging (file-based for TUI, stderr otherwise)
    let logging_handle = logging::init_logging(&config, is_tui_mode, cli.debug)?;

    match cli.command {
        Some(Commands::Walk { script, save }) => {
            cmd_walk(config, &script, save)?;
        }
        Some(Commands::Run) | None => {
            run_tui(config, logging_handle.log_file_path)?;
        }
    }

    Ok(())
}

fn run_tui(mut config: Config, log_file_path: Option<PathBuf>) -> Result<()> {
    install_panic_hook();

    let mut app = App::new(config.clone())?;
    let result = app.run();
    drop(app);

    // Print log file path on exit if logs were written
    if let Some(log_path) = log_file_path {
        if let Ok(metadata) = log_path.metadata() {
            if metadata.len() > 0 {
                eprintln!("Session log: {}", log_path.display());
            }
        }
    }

    if let Some(favorite) = result? {
        save_favorite(&mut config, favorite)?;
    }
    Ok(())
}

fn cmd_walk(mut config: Config, script: &str, save: bool) -> Result<()> {
    let actions = parse_script(script)?;
    let mut walk = Walk::start(&config.flow)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = walk.run(&actions, &mut out)?;
    out.flush()?;

    eprintln!(
        "Flow {} at depth {}, {} action(s) rejected",
        summary.state, summary.depth, summary.rejected
    );

    match summary.favorite {
        Some(favorite) if save => save_favorite(&mut config, favorite)?,
        Some(favorite) => eprintln!("Completed with {} (not saved)", favorite),
        None => {}
    }
    Ok(())
}

fn save_favorite(config: &mut Config, favorite: String) -> Result<()> {
    config.record_favorite(favorite.clone());
    config.save().context("Failed to save favorite")?;
    tracing::info!(%favorite, "favorite saved");
    eprintln!(
        "{} saved as your favorite in {}",
        favorite,
        Config::local_config_path().display()
    );
    Ok(())
}
