use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{
    cli::{
        commands::utils::{cancel_on_ctrl_c, confirm, connect, record, resolve_sort, truncate},
        SortArgs,
    },
    error::PlaylistError,
    provider::{youtube::extract_playlist_id, Authenticator, PlaylistItem, PlaylistStore},
    reorder::{
        commit, commit_order, compute_diff, project, CommitOutcome, PositionChange, Snapshot,
        SortKey, SortState,
    },
    session::Session,
    state::{Config, JournalEntry, Operation},
};

pub async fn run(
    playlist: &str,
    sort: &SortArgs,
    yes: bool,
    dry_run: bool,
    config: &Config,
) -> Result<()> {
    let playlist_id = extract_playlist_id(playlist);
    let state = resolve_sort(sort);

    let (client, session) = connect(config)?;
    let cancel = cancel_on_ctrl_c();

    println!("Fetching playlist {}...", playlist_id);
    let token = session.valid_token().await?;
    let snapshot = Snapshot::fetch(&client, &playlist_id, &token, &cancel).await?;

    let (view, changes) = plan(&state, &snapshot.items);
    if changes.is_empty() {
        println!("\nAlready in order. Nothing to commit.");
        return Ok(());
    }

    let key = state.key.unwrap_or(SortKey::Position);
    println!(
        "\n{} of {} item(s) move when sorting by {:?} {:?}:\n",
        changes.len(),
        snapshot.items.len(),
        key,
        state.direction
    );
    for change in commit_order(&changes) {
        println!(
            "  {:>4} -> {:<4} {}",
            change.from,
            change.to,
            truncate(&change.item.title, 60)
        );
    }

    if dry_run {
        println!("\nPredicted order:\n");
        for (index, item) in project(&snapshot.items, &changes).iter().enumerate() {
            println!("  {:>4}  {}", index, truncate(&item.title, 60));
        }
        println!("\nDry run, nothing written.");
        return Ok(());
    }

    if !yes && !confirm("\nApply these moves to YouTube?")? {
        println!("Aborted.");
        return Ok(());
    }

    println!("\nWriting the new order. Do not close the terminal until it finishes.\n");
    let message = format!("sort {:?} {:?}", key, state.direction);
    let (outcome, after) =
        execute(&client, &session, &snapshot, &changes, &cancel, config, message).await?;

    report(&outcome, &view, after.as_ref())
}

/// The sorted view and the moves that produce it. Without a sort key the
/// view is the fetched order and nothing moves.
fn plan(state: &SortState, items: &[PlaylistItem]) -> (Vec<PlaylistItem>, Vec<PositionChange>) {
    let view = state.apply(items);
    let changes = match state.key {
        Some(_) => compute_diff(&view),
        None => Vec::new(),
    };
    (view, changes)
}

/// Commit `changes`, wait for the store to settle, re-read the playlist and
/// journal the batch.
///
/// `cancel` only covers the initial fetch. The re-read gets its own token so
/// an interrupted batch still reports the order the store ended up with.
async fn execute<A: Authenticator>(
    store: &dyn PlaylistStore,
    session: &Session<A>,
    snapshot: &Snapshot,
    changes: &[PositionChange],
    cancel: &CancellationToken,
    config: &Config,
    message: String,
) -> Result<(CommitOutcome, Option<Snapshot>)> {
    let playlist_id = snapshot.playlist_id.as_str();
    let outcome = commit(changes, move |change| {
        move_item(store, session, playlist_id, change)
    })
    .await;

    if cancel.is_cancelled() {
        warn!("interrupted during the commit, re-reading the playlist anyway");
    }
    let reread = CancellationToken::new();

    tokio::time::sleep(config.settle_delay()).await;
    let after = match session.valid_token().await {
        Ok(token) => Snapshot::fetch(store, playlist_id, &token, &reread).await,
        Err(err) => Err(err),
    };
    let after = match after {
        Ok(after) => Some(after),
        Err(err) => {
            warn!("could not re-read playlist after commit: {}", err);
            None
        }
    };

    let entry = JournalEntry::new(Operation::Reorder, playlist_id, snapshot.fingerprint())
        .with_counts(
            outcome.succeeded.len(),
            outcome.failed.len(),
            outcome.skipped.len(),
        )
        .with_after(after.as_ref().map(Snapshot::fingerprint))
        .with_message(message);
    record(config, &entry)?;

    Ok((outcome, after))
}

async fn move_item<A: Authenticator>(
    store: &dyn PlaylistStore,
    session: &Session<A>,
    playlist_id: &str,
    change: PositionChange,
) -> crate::error::Result<()> {
    println!(
        "Updating the position of '{}' to {}",
        truncate(&change.item.title, 60),
        change.to
    );
    let token = session.valid_token().await?;
    store
        .update_item_position(playlist_id, &change.item, change.to, &token)
        .await?;
    Ok(())
}

fn report(
    outcome: &CommitOutcome,
    view: &[PlaylistItem],
    after: Option<&Snapshot>,
) -> Result<()> {
    let total = outcome.attempted() + outcome.skipped.len();

    if outcome.is_complete() {
        println!("\nMoved {} item(s).", outcome.succeeded.len());
    } else {
        println!(
            "\nThe reorder could not complete in full: {} of {} move(s) applied.",
            outcome.succeeded.len(),
            total
        );
        for failed in &outcome.failed {
            println!(
                "  failed  {} ({}): {}",
                truncate(&failed.change.item.title, 50),
                failed.change.item.id,
                failed.error
            );
        }
        if !outcome.skipped.is_empty() {
            println!("  {} move(s) not attempted", outcome.skipped.len());
        }
    }

    match after {
        Some(after) if matches_view(after, view) => println!("Playlist now matches the sorted view."),
        Some(_) => println!(
            "Playlist does not fully match the sorted view yet. Run the same reorder again to finish."
        ),
        None => println!("Could not re-read the playlist; check it on YouTube."),
    }

    if outcome.auth_failed() {
        return Err(PlaylistError::Auth("credential rejected during reorder".to_string()).into());
    }
    if !outcome.is_complete() {
        bail!("reorder could not complete in full");
    }
    Ok(())
}

fn matches_view(after: &Snapshot, view: &[PlaylistItem]) -> bool {
    let mut ordered: Vec<_> = after.items.iter().collect();
    ordered.sort_by_key(|item| item.position);

    ordered.len() == view.len() && ordered.iter().zip(view).all(|(a, b)| a.id == b.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{OAuthToken, Page, PlaylistSummary};
    use crate::reorder::sort::tests::item;
    use crate::reorder::SortDirection;
    use crate::state::credentials;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Re-indexes on every move like YouTube does. Updates to `failing`
    /// return a 500, and every update cancels `interrupt`.
    struct MemoryStore {
        items: Mutex<Vec<PlaylistItem>>,
        lists: AtomicUsize,
        failing: &'static str,
        interrupt: CancellationToken,
    }

    impl MemoryStore {
        fn new(items: Vec<PlaylistItem>, failing: &'static str, interrupt: CancellationToken) -> Self {
            Self {
                items: Mutex::new(items),
                lists: AtomicUsize::new(0),
                failing,
                interrupt,
            }
        }
    }

    #[async_trait]
    impl PlaylistStore for MemoryStore {
        async fn list_playlists_page(
            &self,
            _page_token: Option<String>,
            _access_token: &str,
        ) -> crate::error::Result<Page<PlaylistSummary>> {
            unimplemented!()
        }

        async fn list_items_page(
            &self,
            _playlist_id: &str,
            page_token: Option<String>,
            _access_token: &str,
        ) -> crate::error::Result<Page<PlaylistItem>> {
            assert!(page_token.is_none());
            self.lists.fetch_add(1, Ordering::SeqCst);
            Ok(Page::last(self.items.lock().unwrap().clone()))
        }

        async fn insert_item(
            &self,
            _playlist_id: &str,
            _video_id: &str,
            _position: Option<u32>,
            _access_token: &str,
        ) -> crate::error::Result<PlaylistItem> {
            unimplemented!()
        }

        async fn update_item_position(
            &self,
            _playlist_id: &str,
            item: &PlaylistItem,
            position: u32,
            _access_token: &str,
        ) -> crate::error::Result<PlaylistItem> {
            self.interrupt.cancel();
            if item.id == self.failing {
                return Err(PlaylistError::Upstream {
                    status: Some(500),
                    message: "backendError".into(),
                });
            }

            let mut items = self.items.lock().unwrap();
            let index = items.iter().position(|i| i.id == item.id).unwrap();
            let moved = items.remove(index);
            let at = (position as usize).min(items.len());
            items.insert(at, moved);
            for (i, entry) in items.iter_mut().enumerate() {
                entry.position = i as u32;
            }
            Ok(items[at].clone())
        }

        async fn delete_item(
            &self,
            _playlist_id: &str,
            _item_id: &str,
            _access_token: &str,
        ) -> crate::error::Result<()> {
            unimplemented!()
        }
    }

    struct StaticAuth;

    #[async_trait]
    impl Authenticator for StaticAuth {
        fn oauth_url(&self, _redirect_uri: &str, _state: &str) -> String {
            String::new()
        }

        async fn exchange_code(
            &self,
            _code: &str,
            _redirect_uri: &str,
        ) -> crate::error::Result<OAuthToken> {
            unimplemented!()
        }

        async fn refresh_token(&self, _token: &OAuthToken) -> crate::error::Result<OAuthToken> {
            unimplemented!()
        }
    }

    fn session() -> Session<StaticAuth> {
        Session::new(
            StaticAuth,
            OAuthToken {
                access_token: "tok".into(),
                refresh_token: None,
                expires_at: Some(credentials::now_secs() + 3600),
                token_type: "Bearer".into(),
                scope: None,
            },
        )
    }

    fn scenario() -> Vec<PlaylistItem> {
        vec![item("A", 0, "Zeta"), item("B", 1, "Alpha"), item("C", 2, "Mango")]
    }

    fn ids<'a>(items: impl IntoIterator<Item = &'a PlaylistItem>) -> Vec<&'a str> {
        items.into_iter().map(|i| i.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_execute_records_partial_batch_and_rereads_after_interrupt() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp.path().to_path_buf(),
            settle_delay_ms: 0,
            ..Config::default()
        };
        let cancel = CancellationToken::new();
        let store = MemoryStore::new(scenario(), "C", cancel.clone());
        let session = session();

        let snapshot = Snapshot::fetch(&store, "PL1", "tok", &cancel).await.unwrap();
        let state = SortState {
            key: Some(SortKey::Title),
            direction: SortDirection::Descending,
        };
        let (view, changes) = plan(&state, &snapshot.items);
        assert_eq!(ids(&view), vec!["A", "C", "B"]);

        let (outcome, after) = execute(
            &store,
            &session,
            &snapshot,
            &changes,
            &cancel,
            &config,
            "sort Title Descending".to_string(),
        )
        .await
        .unwrap();

        assert!(cancel.is_cancelled());
        assert_eq!(ids(outcome.succeeded.iter().map(|c| &c.item)), vec!["B"]);
        assert_eq!(ids(outcome.failed.iter().map(|f| &f.change.item)), vec!["C"]);
        assert!(outcome.skipped.is_empty());

        assert_eq!(store.lists.load(Ordering::SeqCst), 2);
        let after = after.expect("playlist re-read after the interrupt");
        assert_eq!(ids(&after.items), vec!["A", "C", "B"]);

        let path = JournalEntry::journal_path(temp.path(), "PL1").unwrap();
        let entries = JournalEntry::read_all(&path).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.operation, Operation::Reorder);
        assert_eq!(entry.before, snapshot.fingerprint());
        assert_eq!(entry.after.as_deref(), Some(after.fingerprint().as_str()));
        assert_eq!((entry.succeeded, entry.failed, entry.skipped), (1, 1, 0));
        assert_eq!(entry.message.as_deref(), Some("sort Title Descending"));

        let err = report(&outcome, &view, Some(&after)).unwrap_err();
        assert!(err.to_string().contains("could not complete in full"));
    }

    #[tokio::test]
    async fn test_execute_complete_batch_matches_view() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp.path().to_path_buf(),
            settle_delay_ms: 0,
            ..Config::default()
        };
        let cancel = CancellationToken::new();
        let store = MemoryStore::new(scenario(), "none", CancellationToken::new());

        let snapshot = Snapshot::fetch(&store, "PL1", "tok", &cancel).await.unwrap();
        let state = SortState {
            key: Some(SortKey::Title),
            direction: SortDirection::Ascending,
        };
        let (view, changes) = plan(&state, &snapshot.items);

        let (outcome, after) = execute(
            &store,
            &session(),
            &snapshot,
            &changes,
            &cancel,
            &config,
            "sort Title Ascending".to_string(),
        )
        .await
        .unwrap();

        assert!(outcome.is_complete());
        assert!(report(&outcome, &view, after.as_ref()).is_ok());
    }

    #[test]
    fn test_plan_without_key_moves_nothing() {
        let thrice = resolve_sort(&SortArgs {
            sort: vec![SortKey::Title; 3],
            order: None,
        });
        let reset = resolve_sort(&SortArgs {
            sort: vec![SortKey::Title],
            order: Some(SortDirection::None),
        });
        let sparse = vec![item("A", 0, "Zeta"), item("B", 2, "Alpha")];

        for state in [thrice, reset] {
            let (view, changes) = plan(&state, &scenario());
            assert!(changes.is_empty());
            assert_eq!(ids(&view), vec!["A", "B", "C"]);
            assert!(plan(&state, &sparse).1.is_empty());
        }

        let once = resolve_sort(&SortArgs {
            sort: vec![SortKey::Title],
            order: None,
        });
        assert_eq!(plan(&once, &scenario()).1.len(), 3);
    }

    #[test]
    fn test_matches_view_by_server_position() {
        let view = vec![item("b", 1, "b"), item("a", 0, "a")];

        let done = Snapshot::new("PL", vec![item("a", 1, "a"), item("b", 0, "b")]);
        assert!(matches_view(&done, &view));

        let untouched = Snapshot::new("PL", vec![item("a", 0, "a"), item("b", 1, "b")]);
        assert!(!matches_view(&untouched, &view));
    }
}
