mod cli;
mod error;
mod provider;
mod reorder;
mod session;
mod state;
mod utils;

use std::env;
use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Commands, ConfigCommand};
use error::PlaylistError;
use state::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (ignores if missing)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            if matches!(err.downcast_ref::<PlaylistError>(), Some(PlaylistError::Auth(_))) {
                eprintln!("Run 'plsort auth' to sign in again.");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Config {
        command: ConfigCommand::Init { force },
    } = cli.command
    {
        return cli::commands::config::init(&cli.data_dir, force);
    }

    let config = Config::load_or_default(&cli.data_dir)?;

    match cli.command {
        Commands::Auth => cli::commands::auth::run(&config).await?,
        Commands::Logout => cli::commands::auth::logout(&config).await?,
        Commands::Whoami => cli::commands::auth::whoami(&config).await?,
        Commands::Config { command } => match command {
            ConfigCommand::Show => cli::commands::config::show(&config)?,
            ConfigCommand::Init { .. } => unreachable!("handled before loading config"),
        },
        Commands::Playlists { filter } => {
            cli::commands::playlists::list(filter.as_deref(), &config).await?;
        }
        Commands::Items {
            playlist,
            sort,
            filter,
            format,
        } => {
            cli::commands::items::list(&playlist, &sort, filter.as_deref(), format, &config)
                .await?;
        }
        Commands::Reorder {
            playlist,
            sort,
            yes,
            dry_run,
        } => {
            cli::commands::reorder::run(&playlist, &sort, yes, dry_run, &config).await?;
        }
        Commands::Insert {
            playlist,
            video_id,
            position,
        } => {
            cli::commands::edit::insert(&playlist, &video_id, position, &config).await?;
        }
        Commands::Move {
            playlist,
            item_id,
            position,
        } => {
            cli::commands::edit::move_item(&playlist, &item_id, position, &config).await?;
        }
        Commands::Delete { playlist, item_id } => {
            cli::commands::edit::delete(&playlist, &item_id, &config).await?;
        }
        Commands::History { playlist } => cli::commands::history::log(&playlist, &config)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("PLSORT_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "plsort=debug,info"
        } else {
            "plsort=info,warn"
        })
    });

    let format = env::var("PLSORT_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}
