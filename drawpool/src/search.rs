use std::sync::Arc;

use crate::item::Item;

/// Sums this close to 1 are treated as exactly 1 when normalising.
const NORMALISE_TOLERANCE: f64 = 1e-15;

/// Immutable cumulative probability table.
///
/// Each entry holds the lower bound of its item's interval. Intervals are
/// closed at the bottom and open at the top, so a value equal to a threshold
/// belongs to the item that starts there. Values below the first threshold
/// fall back to the leftmost item.
#[derive(Debug)]
pub struct SearchLine<T> {
    leftmost: Arc<Item<T>>,
    entries: Vec<(f64, Arc<Item<T>>)>,
    contains_limited: bool,
    generation: u64,
}

impl<T> SearchLine<T> {
    /// Lays `items` out in the given order, each taking an interval as wide as
    /// its share of the total `real_probability`. Items without mass are left
    /// out. When nothing has mass, every lookup yields `fallback`.
    pub fn from_items(items: &[Arc<Item<T>>], fallback: Arc<Item<T>>) -> Self {
        let weighted: Vec<_> = items
            .iter()
            .filter(|item| item.real_probability() > 0.0)
            .collect();

        let mut sum: f64 = weighted.iter().map(|item| item.real_probability()).sum();
        if (1.0 - sum).abs() < NORMALISE_TOLERANCE {
            sum = 1.0;
        }

        let mut threshold = 0.0;
        let entries: Vec<_> = weighted
            .into_iter()
            .map(|item| {
                let entry = (threshold, item.clone());
                threshold += item.real_probability() / sum;
                entry
            })
            .collect();

        let leftmost = entries
            .first()
            .map_or(fallback, |(_, item)| item.clone());
        let contains_limited = entries.iter().any(|(_, item)| item.is_limited());

        Self {
            leftmost,
            entries,
            contains_limited,
            generation: 0,
        }
    }

    #[must_use]
    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Resolves `probability` in `[0, 1)` to an item in `O(log n)`.
    pub fn search(&self, probability: f64) -> &Arc<Item<T>> {
        let after = self
            .entries
            .partition_point(|(threshold, _)| *threshold <= probability);
        match after.checked_sub(1) {
            Some(index) => &self.entries[index].1,
            None => &self.leftmost,
        }
    }

    /// A line over the entries accepted by `keep`, renormalised to cover
    /// `[0, 1)` on its own. Removed items are always dropped.
    pub fn restrict(
        &self,
        keep: impl Fn(&Item<T>) -> bool,
        fallback: Arc<Item<T>>,
    ) -> Self {
        let kept: Vec<_> = self
            .entries
            .iter()
            .map(|(_, item)| item)
            .filter(|item| !item.is_removed() && keep(item))
            .cloned()
            .collect();
        Self::from_items(&kept, fallback).with_generation(self.generation)
    }

    pub fn leftmost(&self) -> &Arc<Item<T>> {
        &self.leftmost
    }

    pub fn thresholds(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|(threshold, _)| *threshold)
    }

    pub fn items(&self) -> impl Iterator<Item = &Arc<Item<T>>> + '_ {
        self.entries.iter().map(|(_, item)| item)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn contains_limited(&self) -> bool {
        self.contains_limited
    }

    /// Build counter of the pool that produced this line.
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}
