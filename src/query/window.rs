//! Streaming windows: the set of chunks a client should hold, and how it changes as the
//! client moves.
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use hashbrown::HashSet;

use crate::ring::{ChunkKey, ChunkRange};

/// The chunk keys a client holds, nearest first
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkWindow {
    /// Keys in streaming order
    keys: Vec<ChunkKey>,
}

/// What changed between two windows
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WindowDelta {
    /// Keys to start streaming, in the new window's order
    pub added: Vec<ChunkKey>,
    /// Keys to let go of, in the old window's order
    pub removed: Vec<ChunkKey>,
    /// The new window in full
    pub current: Vec<ChunkKey>,
}

impl WindowDelta {
    /// Whether the window did not change membership
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl ChunkWindow {
    /// The window covering a range, nearest chunk first
    pub fn from_range(range: &ChunkRange) -> Self {
        let floor = range.floor();
        Self {
            keys: range
                .iter_outward()
                .map(|index| ChunkKey::new(index, floor))
                .collect(),
        }
    }

    /// The union of several ranges, typically one per floor, without duplicates
    pub fn from_ranges<'a>(ranges: impl IntoIterator<Item = &'a ChunkRange>) -> Self {
        let mut seen = HashSet::new();
        let keys = ranges
            .into_iter()
            .flat_map(|range| {
                let floor = range.floor();
                range
                    .iter_outward()
                    .map(move |index| ChunkKey::new(index, floor))
                    .collect::<Vec<_>>()
            })
            .filter(|key| seen.insert(*key))
            .collect();
        Self { keys }
    }

    /// Keys in streaming order
    pub fn keys(&self) -> &[ChunkKey] {
        &self.keys
    }
    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }
    /// Whether the window is empty
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
    /// Whether a key is in the window
    pub fn contains(&self, key: ChunkKey) -> bool {
        self.keys.contains(&key)
    }

    /// What a client moving from `previous` to `next` has to load and drop
    pub fn diff(previous: &ChunkWindow, next: &ChunkWindow) -> WindowDelta {
        let before: HashSet<ChunkKey> = previous.keys.iter().copied().collect();
        let after: HashSet<ChunkKey> = next.keys.iter().copied().collect();
        WindowDelta {
            added: next
                .keys
                .iter()
                .filter(|key| !before.contains(*key))
                .copied()
                .collect(),
            removed: previous
                .keys
                .iter()
                .filter(|key| !after.contains(*key))
                .copied()
                .collect(),
            current: next.keys.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::chunks_in_range;
    use crate::ring::{Floor, RingSpace};

    fn ids(keys: &[ChunkKey]) -> Vec<String> {
        keys.iter().map(|key| key.to_string()).collect()
    }

    #[test]
    fn test_window_is_nearest_first() {
        let space = RingSpace::default();
        let range = chunks_in_range(&space, 500.0, 1_000.0, Floor(0)).unwrap();
        let window = ChunkWindow::from_range(&range);
        assert_eq!(ids(window.keys()), vec!["0_0", "0_1", "0_263999"]);
    }

    #[test]
    fn test_moving_across_the_seam() {
        let space = RingSpace::default();
        let before = ChunkWindow::from_range(
            &chunks_in_range(&space, 1_500.0, 1_000.0, Floor(0)).unwrap(),
        );
        let after = ChunkWindow::from_range(
            &chunks_in_range(&space, -500.0, 1_000.0, Floor(0)).unwrap(),
        );
        let delta = ChunkWindow::diff(&before, &after);
        assert_eq!(ids(&delta.added), vec!["0_263999", "0_263998"]);
        assert_eq!(ids(&delta.removed), vec!["0_1", "0_2"]);
        assert_eq!(delta.current, after.keys().to_vec());
        assert!(ChunkWindow::diff(&after, &after).is_empty());
    }

    #[test]
    fn test_union_of_floors() {
        let space = RingSpace::default();
        let ground = chunks_in_range(&space, 500.0, 0.0, Floor(0)).unwrap();
        let upstairs = chunks_in_range(&space, 500.0, 0.0, Floor(1)).unwrap();
        let window = ChunkWindow::from_ranges([&ground, &upstairs, &ground]);
        assert_eq!(ids(window.keys()), vec!["0_0", "1_0"]);
        assert!(window.contains(ChunkKey::new(ground.center(), Floor(1))));
    }
}
