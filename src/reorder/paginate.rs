use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{PlaylistError, Result};
use crate::provider::Page;

/// Fetch every page of a paged listing and concatenate the items in response
/// order.
///
/// `fetch_page` is called first with `None`, then with each returned
/// continuation token until a page comes back without one (or with an empty
/// one). Any failing page fails the whole call and the items merged so far are
/// dropped. `cancel` is checked at every page boundary.
pub async fn fetch_all<T, F, Fut>(cancel: &CancellationToken, mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut merged = Vec::new();
    let mut requested: Option<String> = None;
    let mut pages = 0usize;

    loop {
        if cancel.is_cancelled() {
            return Err(PlaylistError::Cancelled);
        }

        let page = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PlaylistError::Cancelled),
            page = fetch_page(requested.clone()) => page?,
        };
        pages += 1;
        merged.extend(page.items);

        match page.next_token {
            Some(next) if !next.is_empty() => {
                if requested.as_deref() == Some(next.as_str()) {
                    return Err(PlaylistError::Upstream {
                        status: None,
                        message: format!("pagination did not advance past token {}", next),
                    });
                }
                requested = Some(next);
            }
            _ => break,
        }
    }

    debug!("merged {} items from {} page(s)", merged.len(), pages);
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn page(range: std::ops::Range<u32>, next: Option<&str>) -> Page<u32> {
        Page {
            items: range.collect(),
            next_token: next.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_merges_three_pages_in_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&calls);
        let cancel = CancellationToken::new();

        let items = fetch_all(&cancel, move |token: Option<String>| {
            seen.lock().unwrap().push(token.clone());
            async move {
                Ok(match token.as_deref() {
                    None => page(0..50, Some("p2")),
                    Some("p2") => page(50..100, Some("p3")),
                    Some("p3") => page(100..107, None),
                    Some(other) => panic!("unexpected token {}", other),
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(items.len(), 107);
        assert_eq!(items, (0..107).collect::<Vec<_>>());
        assert_eq!(
            *calls.lock().unwrap(),
            vec![None, Some("p2".to_string()), Some("p3".to_string())]
        );
    }

    #[tokio::test]
    async fn test_empty_token_stops() {
        let cancel = CancellationToken::new();
        let mut calls = 0;

        let items = fetch_all(&cancel, |_token| {
            calls += 1;
            async { Ok(page(0..3, Some(""))) }
        })
        .await
        .unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_failing_page_discards_partial_results() {
        let cancel = CancellationToken::new();

        let result = fetch_all(&cancel, |token: Option<String>| async move {
            match token {
                None => Ok(page(0..50, Some("p2"))),
                Some(_) => Err(PlaylistError::from_status(500, "boom")),
            }
        })
        .await;

        assert!(matches!(
            result,
            Err(PlaylistError::Upstream {
                status: Some(500),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_repeated_token_is_rejected() {
        let cancel = CancellationToken::new();

        let result = fetch_all(&cancel, |_token| async { Ok(page(0..1, Some("same"))) }).await;

        assert!(matches!(result, Err(PlaylistError::Upstream { .. })));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut calls = 0;

        let result = fetch_all(&cancel, |_token| {
            calls += 1;
            async { Ok(page(0..1, None)) }
        })
        .await;

        assert!(matches!(result, Err(PlaylistError::Cancelled)));
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_cancelled_between_pages() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let result = fetch_all(&cancel, move |token: Option<String>| {
            if token.is_some() {
                trigger.cancel();
            }
            async move {
                if token.is_some() {
                    std::future::pending::<()>().await;
                }
                Ok(page(0..50, Some("p2")))
            }
        })
        .await;

        assert!(matches!(result, Err(PlaylistError::Cancelled)));
    }
}
