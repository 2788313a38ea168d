use serde::Serialize;
use std::collections::HashMap;

use crate::provider::PlaylistItem;

/// One item whose index in the reordered view differs from its fetched
/// position. `item` is a copy carrying `target_position = Some(to)`.
#[derive(Debug, Clone, Serialize)]
pub struct PositionChange {
    pub item: PlaylistItem,
    pub from: u32,
    pub to: u32,
}

impl PositionChange {
    pub fn displacement(&self) -> u32 {
        self.from.abs_diff(self.to)
    }
}

/// Changes needed to turn the fetched ordering into `view`, in view order.
/// Empty when the view already matches.
pub fn compute_diff(view: &[PlaylistItem]) -> Vec<PositionChange> {
    view.iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let to = u32::try_from(index).ok()?;
            if item.position == to {
                return None;
            }

            let mut moved = item.clone();
            moved.target_position = Some(to);
            Some(PositionChange {
                item: moved,
                from: item.position,
                to,
            })
        })
        .collect()
}

/// The ordering predicted by applying `changes` to `snapshot`. Only for
/// previews; after a commit the store is re-read instead.
pub fn project(snapshot: &[PlaylistItem], changes: &[PositionChange]) -> Vec<PlaylistItem> {
    let targets: HashMap<&str, u32> = changes
        .iter()
        .map(|c| (c.item.id.as_str(), c.to))
        .collect();

    let mut projected: Vec<PlaylistItem> = snapshot.to_vec();
    projected.sort_by_key(|item| {
        targets
            .get(item.id.as_str())
            .copied()
            .unwrap_or(item.position)
    });
    projected
}
