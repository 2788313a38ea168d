use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::provider::PlaylistItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Position,
    Title,
    /// Channel title, shown as the artist
    #[value(alias = "artist", alias = "channel")]
    Author,
    #[value(name = "published", alias = "release-date", alias = "date")]
    PublishedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[value(name = "asc", alias = "ascending")]
    Ascending,
    #[value(name = "desc", alias = "descending")]
    Descending,
    #[default]
    None,
}

/// Column-header sort state: selecting the active key cycles
/// ascending -> descending -> none, selecting another key starts over at
/// ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortState {
    pub key: Option<SortKey>,
    pub direction: SortDirection,
}

impl SortState {
    pub fn select(self, key: SortKey) -> Self {
        let direction = if self.key == Some(key) {
            match self.direction {
                SortDirection::Ascending => SortDirection::Descending,
                SortDirection::Descending => SortDirection::None,
                SortDirection::None => SortDirection::Ascending,
            }
        } else {
            SortDirection::Ascending
        };

        match direction {
            SortDirection::None => Self::default(),
            _ => Self {
                key: Some(key),
                direction,
            },
        }
    }

    /// The ordered view for this state; the snapshot's own order when unsorted.
    pub fn apply(&self, snapshot: &[PlaylistItem]) -> Vec<PlaylistItem> {
        match self.key {
            Some(key) => sort_view(snapshot, key, self.direction),
            None => sort_view(snapshot, SortKey::Position, SortDirection::None),
        }
    }
}

enum SortValue {
    Number(u32),
    Text(String),
    Date(DateTime<Utc>),
    Missing,
}

impl SortValue {
    fn of(item: &PlaylistItem, key: SortKey) -> Self {
        match key {
            SortKey::Position => SortValue::Number(item.position),
            SortKey::Title => SortValue::Text(item.title.to_lowercase()),
            SortKey::Author => item
                .author_label
                .as_ref()
                .map_or(SortValue::Missing, |a| SortValue::Text(a.to_lowercase())),
            SortKey::PublishedAt => item.published_at.map_or(SortValue::Missing, SortValue::Date),
        }
    }

    // Values of different kinds (a missing field included) compare equal.
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortValue::Number(a), SortValue::Number(b)) => a.cmp(b),
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            (SortValue::Date(a), SortValue::Date(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Derive an ordered view of `snapshot`. The snapshot itself is untouched.
///
/// `SortDirection::None` returns the items in position order. Ties keep their
/// snapshot order in both directions.
pub fn sort_view(
    snapshot: &[PlaylistItem],
    key: SortKey,
    direction: SortDirection,
) -> Vec<PlaylistItem> {
    let (key, descending) = match direction {
        SortDirection::Ascending => (key, false),
        SortDirection::Descending => (key, true),
        SortDirection::None => (SortKey::Position, false),
    };

    let values: Vec<SortValue> = snapshot.iter().map(|i| SortValue::of(i, key)).collect();
    let mut order: Vec<usize> = (0..snapshot.len()).collect();

    merge_sort_by(&mut order, &|a: &usize, b: &usize| {
        let ord = values[*a].compare(&values[*b]);
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });

    order.into_iter().map(|i| snapshot[i].clone()).collect()
}

/// Case-insensitive substring match on title or author, or an exact match on
/// the uploader's channel id. Display only.
pub fn filter_view<'a>(items: &'a [PlaylistItem], query: &str) -> Vec<&'a PlaylistItem> {
    let channel = query.trim();
    let query = query.to_lowercase();
    items
        .iter()
        .filter(|item| {
            item.title.to_lowercase().contains(&query)
                || item
                    .author_label
                    .as_ref()
                    .is_some_and(|a| a.to_lowercase().contains(&query))
                || item.author_id.as_deref() == Some(channel)
        })
        .collect()
}

// `slice::sort_by` may panic when the comparator is not a total order, which
// "missing compares equal" is not. A plain top-down merge sort is stable and
// tolerates it.
fn merge_sort_by<T: Copy, F>(items: &mut [T], cmp: &F)
where
    F: Fn(&T, &T) -> Ordering,
{
    if items.len() < 2 {
        return;
    }

    let mid = items.len() / 2;
    merge_sort_by(&mut items[..mid], cmp);
    merge_sort_by(&mut items[mid..], cmp);

    let mut merged = Vec::with_capacity(items.len());
    let (left, right) = items.split_at(mid);
    let (mut i, mut j) = (0, 0);

    while i < left.len() && j < right.len() {
        if cmp(&right[j], &left[i]) == Ordering::Less {
            merged.push(right[j]);
            j += 1;
        } else {
            merged.push(left[i]);
            i += 1;
        }
    }
    merged.extend_from_slice(&left[i..]);
    merged.extend_from_slice(&right[j..]);

    items.copy_from_slice(&merged);
}
