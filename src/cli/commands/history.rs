use anyhow::Result;

use crate::{
    provider::youtube::extract_playlist_id,
    state::{Config, JournalEntry, Operation},
};

pub fn log(playlist: &str, config: &Config) -> Result<()> {
    let playlist_id = extract_playlist_id(playlist);
    let journal_path = JournalEntry::journal_path(&config.data_dir, &playlist_id)?;
    let entries = JournalEntry::read_all(&journal_path)?;

    if entries.is_empty() {
        println!("No history yet.");
        return Ok(());
    }

    println!("\nHistory of {}:\n", playlist_id);

    for entry in entries.iter().rev() {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S");
        let operation = match entry.operation {
            Operation::Reorder => "reorder",
            Operation::Move => "move",
            Operation::Insert => "insert",
            Operation::Delete => "delete",
        };
        let after = entry.after.as_deref().unwrap_or("?");

        match &entry.message {
            Some(msg) => println!(
                "[{} -> {}] {} | {} | {}",
                entry.before, after, timestamp, operation, msg
            ),
            None => println!("[{} -> {}] {} | {}", entry.before, after, timestamp, operation),
        }

        let mut counts = format!("{} ok", entry.succeeded);
        if entry.failed > 0 {
            counts.push_str(&format!(", {} failed", entry.failed));
        }
        if entry.skipped > 0 {
            counts.push_str(&format!(", {} skipped", entry.skipped));
        }
        println!("  {}", counts);
    }

    Ok(())
}
