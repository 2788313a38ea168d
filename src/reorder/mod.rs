//! Re-sequencing of a playlist against the store's authoritative ordering:
//! fetch every page, derive a sorted view, diff it against the fetched
//! positions, and replay the diff one move at a time.

pub mod commit;
pub mod diff;
pub mod paginate;
pub mod sort;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::Result;
use crate::provider::{PlaylistItem, PlaylistStore, PlaylistSummary};

pub use commit::{commit, commit_order, CommitOutcome};
pub use diff::{compute_diff, project, PositionChange};
pub use paginate::fetch_all;
pub use sort::{filter_view, SortDirection, SortKey, SortState};

/// A full, immutable read of one playlist.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub playlist_id: String,
    pub items: Vec<PlaylistItem>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(playlist_id: &str, items: Vec<PlaylistItem>) -> Self {
        let snapshot = Self {
            playlist_id: playlist_id.to_string(),
            items,
            fetched_at: Utc::now(),
        };
        if !snapshot.is_dense() {
            warn!(
                "playlist {} positions are not a permutation of 0..{}",
                snapshot.playlist_id,
                snapshot.items.len()
            );
        }
        snapshot
    }

    /// Read every page of `playlist_id` from the store.
    pub async fn fetch(
        store: &dyn PlaylistStore,
        playlist_id: &str,
        access_token: &str,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let items = fetch_all(cancel, move |page_token| {
            store.list_items_page(playlist_id, page_token, access_token)
        })
        .await?;

        Ok(Self::new(playlist_id, items))
    }

    /// True when positions form a permutation of `0..n`.
    pub fn is_dense(&self) -> bool {
        let mut seen = vec![false; self.items.len()];
        for item in &self.items {
            match seen.get_mut(item.position as usize) {
                Some(slot) if !*slot => *slot = true,
                _ => return false,
            }
        }
        true
    }

    /// Short digest of the `(id, position)` sequence.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for item in &self.items {
            hasher.update(item.id.as_bytes());
            hasher.update(b":");
            hasher.update(item.position.to_be_bytes());
            hasher.update(b"\n");
        }
        let result = hasher.finalize();

        result
            .iter()
            .take(6) //6 bytes = 12 hex chars
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    pub fn find(&self, item_id: &str) -> Option<&PlaylistItem> {
        self.items.iter().find(|i| i.id == item_id)
    }
}

/// Every playlist owned by the signed-in user.
pub async fn fetch_playlists(
    store: &dyn PlaylistStore,
    access_token: &str,
    cancel: &CancellationToken,
) -> Result<Vec<PlaylistSummary>> {
    fetch_all(cancel, move |page_token| {
        store.list_playlists_page(page_token, access_token)
    })
    .await
}
