use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{
    cli::SortArgs,
    provider::{YoutubeAuth, YoutubeClient},
    reorder::{SortDirection, SortKey, SortState},
    session::Session,
    state::{credentials, Config, JournalEntry},
};

/// OAuth client built from `YOUTUBE_CLIENT_ID` / `YOUTUBE_CLIENT_SECRET`.
pub fn create_authenticator(config: &Config) -> Result<YoutubeAuth> {
    let client_id = std::env::var("YOUTUBE_CLIENT_ID").context("YOUTUBE_CLIENT_ID not set")?;
    let client_secret =
        std::env::var("YOUTUBE_CLIENT_SECRET").context("YOUTUBE_CLIENT_SECRET not set")?;

    let auth = YoutubeAuth::new(client_id, client_secret, config.request_timeout())?
        .with_endpoints(&config.auth_url, &config.token_url);
    Ok(auth)
}

/// The playlist client and a session seeded from the stored credential.
pub fn connect(config: &Config) -> Result<(YoutubeClient, Session<YoutubeAuth>)> {
    let token = credentials::load(&config.data_dir)?
        .context("No credentials found. Please run 'plsort auth' first.")?;

    let client = YoutubeClient::new(config.request_timeout())?
        .with_api_base(&config.api_base)
        .with_api_key(std::env::var("YOUTUBE_API_KEY").ok())
        .with_page_size(config.page_size)?;

    let session = Session::new(create_authenticator(config)?, token).persisted_in(&config.data_dir);
    Ok((client, session))
}

/// Token cancelled by the first Ctrl-C. A second Ctrl-C exits.
///
/// Only fetches watch the token, so an interrupted commit batch still runs
/// to the end.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let watched = token.clone();

    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if watched.is_cancelled() {
                std::process::exit(130);
            }
            warn!("interrupted, press Ctrl-C again to quit");
            watched.cancel();
        }
    });

    token
}

/// Ask a yes/no question on stdin. Anything but `y`/`yes` is a no.
pub fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Fold the `--sort` occurrences as header clicks, then apply `--order`.
pub fn resolve_sort(args: &SortArgs) -> SortState {
    let folded = args
        .sort
        .iter()
        .fold(SortState::default(), |state, key| state.select(*key));

    match args.order {
        None => folded,
        Some(SortDirection::None) => SortState::default(),
        Some(direction) => SortState {
            key: Some(
                args.sort
                    .last()
                    .copied()
                    .unwrap_or(SortKey::Position),
            ),
            direction,
        },
    }
}

pub fn record(config: &Config, entry: &JournalEntry) -> Result<()> {
    let path = JournalEntry::journal_path(&config.data_dir, &entry.playlist_id)?;
    JournalEntry::append(&path, entry)
}

pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut short: String = text.chars().take(width.saturating_sub(1)).collect();
    short.push('…');
    short
}
