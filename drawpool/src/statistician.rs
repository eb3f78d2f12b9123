use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use drawpool_core::Rarity;
use itertools::Itertools;
use parking_lot::RwLock;

use crate::item::{Item, ItemId};

struct Record<T> {
    item: Arc<Item<T>>,
    count: AtomicU64,
}

/// Counts how often each item came out of a pool.
///
/// Items are keyed by [`ItemId`], so sentinels and items added after the
/// statistician was created are tracked like any other.
pub struct Statistician<T> {
    records: RwLock<HashMap<ItemId, Record<T>>>,
    recorded_times: AtomicU64,
}

impl<T> Default for Statistician<T> {
    fn default() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            recorded_times: AtomicU64::new(0),
        }
    }
}

impl<T> Statistician<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure `items` appear in reports even before they are drawn.
    pub fn track<'a>(&self, items: impl IntoIterator<Item = &'a Arc<Item<T>>>)
    where
        T: 'a,
    {
        let mut records = self.records.write();
        for item in items {
            records.entry(item.id()).or_insert_with(|| Record {
                item: item.clone(),
                count: AtomicU64::new(0),
            });
        }
    }

    pub fn record(&self, item: &Arc<Item<T>>) {
        self.recorded_times.fetch_add(1, Ordering::Relaxed);
        {
            let records = self.records.read();
            if let Some(record) = records.get(&item.id()) {
                record.count.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        self.records
            .write()
            .entry(item.id())
            .or_insert_with(|| Record {
                item: item.clone(),
                count: AtomicU64::new(0),
            })
            .count
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn recorded_times(&self) -> u64 {
        self.recorded_times.load(Ordering::Relaxed)
    }

    pub fn count_of(&self, id: ItemId) -> u64 {
        self.records
            .read()
            .get(&id)
            .map_or(0, |record| record.count.load(Ordering::Relaxed))
    }

    /// Snapshot of every tracked item, ordered by rarity and creation.
    pub fn report(&self) -> DrawReport
    where
        T: fmt::Display,
    {
        let records = self.records.read();
        let total_draws = self.recorded_times();
        let stats: Vec<_> = records
            .values()
            .sorted_by_key(|record| (record.item.rarity(), record.item.id()))
            .map(|record| {
                let drawn = record.count.load(Ordering::Relaxed);
                ItemStatistics {
                    id: record.item.id(),
                    name: record.item.display_name(),
                    rarity: record.item.rarity(),
                    expected_probability: record.item.real_probability(),
                    drawn,
                    actual_probability: if total_draws == 0 {
                        0.0
                    } else {
                        drawn as f64 / total_draws as f64
                    },
                }
            })
            .collect();

        DrawReport {
            total_draws,
            total_probability: stats.iter().map(|stat| stat.expected_probability).sum(),
            stats,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemStatistics {
    pub id: ItemId,
    pub name: String,
    pub rarity: Rarity,
    pub expected_probability: f64,
    pub drawn: u64,
    pub actual_probability: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawReport {
    pub total_draws: u64,
    pub total_probability: f64,
    pub stats: Vec<ItemStatistics>,
}

impl DrawReport {
    pub fn get(&self, id: ItemId) -> Option<&ItemStatistics> {
        self.stats.iter().find(|stat| stat.id == id)
    }
}

impl fmt::Display for DrawReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = "-".repeat(80);
        writeln!(
            f,
            "{:<20}{:<15}{:<10}{:<15}{:<15}",
            "ItemName", "ExpectProb", "Rarity", "DrawnCount", "ExactProb"
        )?;
        writeln!(f, "{separator}")?;
        for stat in &self.stats {
            writeln!(
                f,
                "{:<20}{:<15}{:<10}{:<15}{:<15}",
                stat.name,
                format!("{:.4}%", stat.expected_probability * 100.0),
                stat.rarity.to_string(),
                stat.drawn,
                format!("{:.4}%", stat.actual_probability * 100.0)
            )?;
        }
        writeln!(f, "{separator}")?;
        writeln!(f, "total draws: {}", self.total_draws)?;
        write!(f, "sum of all probability: {}", self.total_probability)
    }
}
