use anyhow::{Context, Result};

use crate::{
    cli::{
        commands::utils::{cancel_on_ctrl_c, connect, resolve_sort, truncate},
        OutputFormat, SortArgs,
    },
    provider::{youtube::extract_playlist_id, PlaylistItem},
    reorder::{filter_view, Snapshot},
    state::Config,
};

pub async fn list(
    playlist: &str,
    sort: &SortArgs,
    filter: Option<&str>,
    format: OutputFormat,
    config: &Config,
) -> Result<()> {
    let playlist_id = extract_playlist_id(playlist);
    let (client, session) = connect(config)?;
    let cancel = cancel_on_ctrl_c();

    let token = session.valid_token().await?;
    let snapshot = Snapshot::fetch(&client, &playlist_id, &token, &cancel).await?;

    let view = resolve_sort(sort).apply(&snapshot.items);
    let shown: Vec<&PlaylistItem> = match filter {
        Some(query) => filter_view(&view, query),
        None => view.iter().collect(),
    };

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&shown).context("Failed to render JSON")?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&shown).context("Failed to render YAML")?;
            print!("{}", yaml);
        }
        OutputFormat::Table => print_table(&snapshot, &shown),
    }

    Ok(())
}

fn print_table(snapshot: &Snapshot, shown: &[&PlaylistItem]) {
    println!("\nPlaylist: {}", snapshot.playlist_id);
    println!(
        "Items: {} (fetched {})\n",
        snapshot.items.len(),
        snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S")
    );

    println!(
        "{:>4}  {:<40}  {:<24}  {:<10}  {}",
        "POS", "TITLE", "ARTIST", "RELEASED", "LABEL"
    );
    for item in shown {
        let released = item
            .published_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:>4}  {:<40}  {:<24}  {:<10}  {}",
            item.position,
            truncate(&item.title, 40),
            truncate(item.author_label.as_deref().unwrap_or("-"), 24),
            released,
            item.extracted_label.as_deref().unwrap_or("")
        );
    }

    if shown.len() != snapshot.items.len() {
        println!("\n{} of {} item(s) match", shown.len(), snapshot.items.len());
    }
}
