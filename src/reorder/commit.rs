use std::future::Future;

use tracing::{info, warn};

use crate::error::{PlaylistError, Result};
use crate::reorder::PositionChange;

#[derive(Debug)]
pub struct FailedChange {
    pub change: PositionChange,
    pub error: PlaylistError,
}

/// What happened to each change in a batch. Callers re-fetch the playlist
/// afterwards rather than trusting the predicted order.
#[derive(Debug, Default)]
pub struct CommitOutcome {
    pub succeeded: Vec<PositionChange>,
    pub failed: Vec<FailedChange>,
    /// Not attempted because the credential was rejected mid-batch
    pub skipped: Vec<PositionChange>,
}

impl CommitOutcome {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    pub fn auth_failed(&self) -> bool {
        self.failed.iter().any(|f| f.error.is_auth())
    }
}

/// Order in which a batch is replayed: smallest displacement first, ties in
/// diff order.
///
/// The store re-indexes every later position after each move, so a large
/// jump applied early shifts the targets of items not yet moved. Going small
/// to large keeps that drift low for the usual adjacent-swap reorders. It is a
/// heuristic: it does not guarantee every precomputed target survives.
pub fn commit_order(changes: &[PositionChange]) -> Vec<PositionChange> {
    let mut ordered = changes.to_vec();
    ordered.sort_by_key(PositionChange::displacement);
    ordered
}

/// Replay `changes` against the store one at a time.
///
/// Each `apply_one` call is awaited before the next starts, since every
/// successful move shifts the store's positions. A failing item is logged and
/// the batch moves on. The exception is an auth failure, after which nothing
/// else can succeed: the rest of the batch is reported as skipped.
pub async fn commit<F, Fut>(changes: &[PositionChange], mut apply_one: F) -> CommitOutcome
where
    F: FnMut(PositionChange) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let ordered = commit_order(changes);
    let total = ordered.len();
    let mut outcome = CommitOutcome::default();
    let mut pending = ordered.into_iter().enumerate();

    while let Some((index, change)) = pending.next() {
        info!(
            "[{}/{}] moving '{}' {} -> {}",
            index + 1,
            total,
            change.item.title,
            change.from,
            change.to
        );

        match apply_one(change.clone()).await {
            Ok(()) => outcome.succeeded.push(change),
            Err(error) => {
                warn!(
                    "failed to move '{}' ({}) to {}: {}",
                    change.item.title, change.item.id, change.to, error
                );
                let stop = error.is_auth();
                outcome.failed.push(FailedChange { change, error });

                if stop {
                    outcome.skipped.extend(pending.by_ref().map(|(_, c)| c));
                    warn!(
                        "credential rejected, {} remaining change(s) not attempted",
                        outcome.skipped.len()
                    );
                    break;
                }
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reorder::sort::tests::item;
    use crate::reorder::sort::{sort_view, SortDirection, SortKey};
    use crate::reorder::compute_diff;
    use std::cell::RefCell;

    fn ids(changes: &[PositionChange]) -> Vec<&str> {
        changes.iter().map(|c| c.item.id.as_str()).collect()
    }

    fn scenario_diff() -> Vec<PositionChange> {
        let snapshot = vec![item("A", 0, "Zeta"), item("B", 1, "Alpha"), item("C", 2, "Mango")];
        compute_diff(&sort_view(&snapshot, SortKey::Title, SortDirection::Descending))
    }

    #[tokio::test]
    async fn test_equal_displacement_keeps_diff_order() {
        let calls = RefCell::new(Vec::new());

        let outcome = commit(&scenario_diff(), |change| {
            calls.borrow_mut().push((change.item.id.clone(), change.to));
            async { Ok(()) }
        })
        .await;

        assert_eq!(
            *calls.borrow(),
            vec![("C".to_string(), 1), ("B".to_string(), 2)]
        );
        assert!(outcome.is_complete());
        assert_eq!(ids(&outcome.succeeded), vec!["C", "B"]);
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_batch() {
        let outcome = commit(&scenario_diff(), |change| async move {
            if change.item.id == "C" {
                Err(PlaylistError::from_status(500, "backendError"))
            } else {
                Ok(())
            }
        })
        .await;

        assert_eq!(ids(&outcome.succeeded), vec!["B"]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].change.item.id, "C");
        assert!(outcome.skipped.is_empty());
        assert!(!outcome.is_complete());
        assert_eq!(outcome.attempted(), 2);
    }

    #[tokio::test]
    async fn test_auth_failure_skips_rest() {
        let changes = compute_diff(&[
            item("w", 1, "w"),
            item("x", 0, "x"),
            item("y", 4, "y"),
            item("z", 2, "z"),
            item("v", 3, "v"),
        ]);
        let mut calls = 0;

        let outcome = commit(&changes, |_change| {
            calls += 1;
            async { Err(PlaylistError::Auth("token revoked".into())) }
        })
        .await;

        assert_eq!(calls, 1);
        assert_eq!(outcome.failed.len(), 1);
        assert!(outcome.auth_failed());
        assert_eq!(outcome.skipped.len(), changes.len() - 1);
        assert_eq!(outcome.attempted(), 1);
    }

    #[test]
    fn test_commit_order_smallest_first() {
        let changes = compute_diff(&[
            item("far", 4, "far"),
            item("a", 0, "a"),
            item("b", 1, "b"),
            item("near", 2, "near"),
            item("mid", 3, "mid"),
        ]);
        // far 4->0 (4), a 0->1, b 1->2, near 2->3, mid 3->4 (1 each)
        let ordered = commit_order(&changes);
        assert_eq!(ids(&ordered), vec!["a", "b", "near", "mid", "far"]);
    }

    #[tokio::test]
    async fn test_empty_diff_is_noop() {
        let mut calls = 0;
        let outcome = commit(&[], |_change| {
            calls += 1;
            async { Ok(()) }
        })
        .await;

        assert_eq!(calls, 0);
        assert!(outcome.is_complete());
        assert_eq!(outcome.attempted(), 0);
    }
}
