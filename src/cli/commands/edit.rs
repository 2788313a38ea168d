use anyhow::{bail, Context, Result};

use crate::{
    cli::commands::utils::{cancel_on_ctrl_c, connect, record},
    provider::{youtube::extract_playlist_id, PlaylistStore},
    reorder::Snapshot,
    state::{Config, JournalEntry, Operation},
};

pub async fn insert(
    playlist: &str,
    video_id: &str,
    position: Option<u32>,
    config: &Config,
) -> Result<()> {
    let playlist_id = extract_playlist_id(playlist);
    let (client, session) = connect(config)?;
    let cancel = cancel_on_ctrl_c();

    let token = session.valid_token().await?;
    let snapshot = Snapshot::fetch(&client, &playlist_id, &token, &cancel).await?;
    if let Some(position) = position {
        check_position(position, snapshot.items.len() + 1)?;
    }

    let entry = JournalEntry::new(Operation::Insert, &playlist_id, snapshot.fingerprint());
    let result = client
        .insert_item(&playlist_id, video_id, position, &token)
        .await;

    match result {
        Ok(item) => {
            record(
                config,
                &entry
                    .with_counts(1, 0, 0)
                    .with_message(format!("insert {} at {}", video_id, item.position)),
            )?;
            println!(
                "Added '{}' at position {} ({})",
                item.title,
                item.position,
                item.watch_url()
            );
            Ok(())
        }
        Err(err) => {
            record(config, &entry.with_counts(0, 1, 0).with_message(err.to_string()))?;
            Err(err).context("Failed to insert item")
        }
    }
}

pub async fn move_item(
    playlist: &str,
    item_id: &str,
    position: u32,
    config: &Config,
) -> Result<()> {
    let playlist_id = extract_playlist_id(playlist);
    let (client, session) = connect(config)?;
    let cancel = cancel_on_ctrl_c();

    let token = session.valid_token().await?;
    let snapshot = Snapshot::fetch(&client, &playlist_id, &token, &cancel).await?;
    check_position(position, snapshot.items.len())?;

    let item = snapshot
        .find(item_id)
        .with_context(|| format!("Item {} is not in playlist {}", item_id, playlist_id))?;
    if item.position == position {
        println!("'{}' is already at position {}", item.title, position);
        return Ok(());
    }

    let entry = JournalEntry::new(Operation::Move, &playlist_id, snapshot.fingerprint());
    let message = format!("move {} {} -> {}", item_id, item.position, position);

    match client
        .update_item_position(&playlist_id, item, position, &token)
        .await
    {
        Ok(updated) => {
            record(config, &entry.with_counts(1, 0, 0).with_message(message))?;
            println!("Moved '{}' to position {}", updated.title, updated.position);
            Ok(())
        }
        Err(err) => {
            record(config, &entry.with_counts(0, 1, 0).with_message(message))?;
            Err(err).context("Failed to move item")
        }
    }
}

pub async fn delete(playlist: &str, item_id: &str, config: &Config) -> Result<()> {
    let playlist_id = extract_playlist_id(playlist);
    let (client, session) = connect(config)?;
    let cancel = cancel_on_ctrl_c();

    let token = session.valid_token().await?;
    let snapshot = Snapshot::fetch(&client, &playlist_id, &token, &cancel).await?;
    let item = snapshot
        .find(item_id)
        .with_context(|| format!("Item {} is not in playlist {}", item_id, playlist_id))?;

    let entry = JournalEntry::new(Operation::Delete, &playlist_id, snapshot.fingerprint());
    let message = format!("delete {} from {}", item_id, item.position);

    match client.delete_item(&playlist_id, item_id, &token).await {
        Ok(()) => {
            record(config, &entry.with_counts(1, 0, 0).with_message(message))?;
            println!("Removed '{}'", item.title);
            Ok(())
        }
        Err(err) => {
            record(config, &entry.with_counts(0, 1, 0).with_message(message))?;
            Err(err).context("Failed to delete item")
        }
    }
}

/// `len` is the number of valid slots, so positions run `0..len`.
fn check_position(position: u32, len: usize) -> Result<()> {
    if position as usize >= len {
        bail!(
            "Position {} is out of range, the playlist has positions 0..{}",
            position,
            len.saturating_sub(1)
        );
    }
    Ok(())
}
