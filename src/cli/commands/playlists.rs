use anyhow::Result;

use crate::{
    cli::commands::utils::{cancel_on_ctrl_c, connect, truncate},
    reorder::fetch_playlists,
    state::Config,
};

pub async fn list(filter: Option<&str>, config: &Config) -> Result<()> {
    let (client, session) = connect(config)?;
    let cancel = cancel_on_ctrl_c();

    let token = session.valid_token().await?;
    let mut playlists = fetch_playlists(&client, &token, &cancel).await?;

    if let Some(query) = filter {
        let query = query.to_lowercase();
        playlists.retain(|p| p.title.to_lowercase().contains(&query));
    }

    if playlists.is_empty() {
        println!("No playlists found.");
        return Ok(());
    }

    println!("\n{:<36}  {:>6}  {}", "ID", "ITEMS", "TITLE");
    for playlist in &playlists {
        println!(
            "{:<36}  {:>6}  {}",
            playlist.id,
            playlist.item_count,
            truncate(&playlist.title, 60)
        );
    }
    println!("\n{} playlist(s)", playlists.len());

    Ok(())
}
