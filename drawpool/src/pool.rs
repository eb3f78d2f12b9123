use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    hash::Hash,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use drawpool_core::{random::RandomSource, Rarity};
use parking_lot::{RwLock, RwLockUpgradableReadGuard, RwLockWriteGuard};

use crate::{builder, error::PoolError, item::Item, search::SearchLine};

struct PoolState<T> {
    /// Members in insertion order. Removed items stay here for good.
    items: Vec<Arc<Item<T>>>,
    members: HashSet<Arc<Item<T>>>,
    rarity_probabilities: BTreeMap<Rarity, f64>,
    remainder: Arc<Item<T>>,
    line: Option<Arc<SearchLine<T>>>,
}

/// A set of items that can be drawn from concurrently.
///
/// Mutations only mark the pool dirty; the next draw (or an explicit
/// [`Pool::build`]) recomputes probabilities and publishes a fresh
/// [`SearchLine`]. Readers hold the lock while they resolve a draw, so they
/// always see one complete line.
///
/// Draws normally share a read lock. When the published line holds a depletable
/// item they take the upgradable read lock instead, which lets the draw that
/// takes an item's last unit escalate in place and retire it before any other
/// depletable draw can run.
pub struct Pool<T> {
    state: RwLock<PoolState<T>>,
    dirty: AtomicBool,
    contains_limited: AtomicBool,
    generation: AtomicU64,
    random: Arc<dyn RandomSource>,
}

impl<T: Eq + Hash> Pool<T> {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self {
            state: RwLock::new(PoolState {
                items: Vec::new(),
                members: HashSet::new(),
                rarity_probabilities: BTreeMap::new(),
                remainder: Arc::new(Item::nothing()),
                line: None,
            }),
            dirty: AtomicBool::new(true),
            contains_limited: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            random,
        }
    }

    pub fn with_items(
        random: Arc<dyn RandomSource>,
        items: impl IntoIterator<Item = Arc<Item<T>>>,
    ) -> Self {
        let pool = Self::new(random);
        pool.add_items(items);
        pool
    }

    /// Adds items that are not members yet and returns how many were new.
    ///
    /// A "nothing" sentinel is not stored as a member: it replaces the pool's
    /// remainder item instead.
    pub fn add_items(&self, items: impl IntoIterator<Item = Arc<Item<T>>>) -> usize {
        let mut state = self.state.write();
        self.dirty.store(true, Ordering::Release);

        let mut added = 0;
        for item in items {
            if item.is_nothing() {
                state.remainder = item;
            } else if state.members.insert(item.clone()) {
                state.items.push(item);
                added += 1;
            }
        }
        added
    }

    /// Flags the pool's members equal to `items` as removed. They keep their
    /// identity but lose all probability from the next build on.
    pub fn remove_items<'a>(&self, items: impl IntoIterator<Item = &'a Arc<Item<T>>>)
    where
        T: 'a,
    {
        let state = self.state.write();
        self.dirty.store(true, Ordering::Release);

        for item in items {
            match state.members.get(item) {
                Some(member) => member.mark_removed(),
                None => log::warn!("Tried to remove item {} which is not in the pool", item.id()),
            }
        }
    }

    pub fn set_rarity_probability(&self, rarity: Rarity, probability: f64) -> &Self {
        let mut state = self.state.write();
        self.dirty.store(true, Ordering::Release);
        state.rarity_probabilities.insert(rarity, probability);
        self
    }

    pub fn rarity_probability(&self, rarity: Rarity) -> Option<f64> {
        self.state.read().rarity_probabilities.get(&rarity).copied()
    }

    /// Members followed by the remainder item when it currently holds mass.
    pub fn items(&self) -> Vec<Arc<Item<T>>> {
        let state = self.state.read();
        let mut items = state.items.clone();
        if state.remainder.real_probability() > 0.0 {
            items.push(state.remainder.clone());
        }
        items
    }

    pub fn remainder(&self) -> Arc<Item<T>> {
        self.state.read().remainder.clone()
    }

    /// Latest published line, if any build has succeeded.
    pub fn search_line(&self) -> Option<Arc<SearchLine<T>>> {
        self.state.read().line.clone()
    }

    /// Number of successful builds so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn contains_limited(&self) -> bool {
        self.contains_limited.load(Ordering::Acquire)
    }

    /// Recomputes every probability and publishes a new line.
    pub fn build(&self) -> Result<(), PoolError> {
        let mut state = self.state.write();
        self.build_locked(&mut state)
    }

    fn build_locked(&self, state: &mut PoolState<T>) -> Result<(), PoolError> {
        let line = builder::build(&state.items, &state.rarity_probabilities, &state.remainder)
            .inspect_err(PoolError::log)?;

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let line = line.with_generation(generation);
        log::debug!(
            "Built pool generation {} with {} entries (limited items: {})",
            generation,
            line.len(),
            line.contains_limited()
        );

        self.contains_limited
            .store(line.contains_limited(), Ordering::Release);
        state.line = Some(Arc::new(line));
        self.dirty.store(false, Ordering::Release);
        Ok(())
    }

    fn ensure_built(&self) -> Result<(), PoolError> {
        if !self.dirty.load(Ordering::Acquire) {
            return Ok(());
        }
        let mut state = self.state.write();
        if self.dirty.load(Ordering::Acquire) {
            self.build_locked(&mut state)?;
        }
        Ok(())
    }

    pub fn draw(&self) -> Result<Arc<Item<T>>, PoolError> {
        self.draw_internal(None)
    }

    /// Draws among the non-removed items of one rarity, in proportion to their
    /// probabilities. Yields the remainder item when that rarity has none.
    pub fn draw_rarity(&self, rarity: Rarity) -> Result<Arc<Item<T>>, PoolError> {
        self.draw_matching(|item| !item.is_nothing() && item.rarity() == rarity)
    }

    /// Draws among the members equal to one of `included`.
    pub fn draw_include(&self, included: &[Arc<Item<T>>]) -> Result<Arc<Item<T>>, PoolError> {
        self.draw_matching(|item| included.iter().any(|candidate| **candidate == *item))
    }

    /// Draws among everything except the members equal to one of `excluded`.
    pub fn draw_except(&self, excluded: &[Arc<Item<T>>]) -> Result<Arc<Item<T>>, PoolError> {
        self.draw_matching(|item| excluded.iter().all(|candidate| **candidate != *item))
    }

    /// Draws from a line restricted to the items `keep` accepts. The restricted
    /// line is cut from the published one while the pool lock is held.
    pub fn draw_matching(
        &self,
        keep: impl Fn(&Item<T>) -> bool,
    ) -> Result<Arc<Item<T>>, PoolError> {
        let keep: &dyn Fn(&Item<T>) -> bool = &keep;
        self.draw_internal(Some(keep))
    }

    fn resolve(
        &self,
        state: &PoolState<T>,
        line: &SearchLine<T>,
        keep: Option<&dyn Fn(&Item<T>) -> bool>,
    ) -> Arc<Item<T>> {
        let probability = self.random.next_f64();
        match keep {
            None => line.search(probability).clone(),
            Some(keep) => line
                .restrict(keep, state.remainder.clone())
                .search(probability)
                .clone(),
        }
    }

    fn draw_internal(
        &self,
        keep: Option<&dyn Fn(&Item<T>) -> bool>,
    ) -> Result<Arc<Item<T>>, PoolError> {
        self.ensure_built()?;

        if !self.contains_limited.load(Ordering::Acquire) {
            let state = self.state.read();
            let line = state.line.as_ref().ok_or(PoolError::NotBuilt)?;
            // The hint may be older than the line; only trust the line itself.
            if !line.contains_limited() && !self.dirty.load(Ordering::Acquire) {
                return Ok(self.resolve(&state, line, keep));
            }
        }

        let state = self.state.upgradable_read();
        let state = if self.dirty.load(Ordering::Acquire) {
            let mut writable = RwLockUpgradableReadGuard::upgrade(state);
            self.build_locked(&mut writable)?;
            RwLockWriteGuard::downgrade_to_upgradable(writable)
        } else {
            state
        };

        let line = state.line.clone().ok_or(PoolError::NotBuilt)?;
        let item = self.resolve(&state, &line, keep);
        if item.is_limited() {
            let remaining = item.try_take().inspect_err(PoolError::log)?;
            if remaining == 0 {
                let _writable = RwLockUpgradableReadGuard::upgrade(state);
                item.mark_removed();
                self.dirty.store(true, Ordering::Release);
                log::debug!("Item {} ran out of supply", item.id());
            }
        }
        Ok(item)
    }
}

impl<T: Eq + Hash + fmt::Display> Pool<T> {
    /// Human readable table of every item's expected probability.
    pub fn probability_summary(&self) -> Result<String, PoolError> {
        self.ensure_built()?;
        Ok(ProbabilitySummary(&self.items()).to_string())
    }
}

struct ProbabilitySummary<'a, T>(&'a [Arc<Item<T>>]);

impl<T: fmt::Display> fmt::Display for ProbabilitySummary<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = "-".repeat(45);
        writeln!(f, "{:<20}{:<15}{:<10}", "ItemName", "ExpectProb", "Rarity")?;
        writeln!(f, "{separator}")?;
        for item in self.0 {
            writeln!(
                f,
                "{:<20}{:<15}{:<10}",
                item.display_name(),
                format!("{:.4}%", item.real_probability() * 100.0),
                item.rarity().to_string()
            )?;
        }
        writeln!(f, "{separator}")?;
        let total: f64 = self.0.iter().map(|item| item.real_probability()).sum();
        write!(f, "sum of all probability: {total}")
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc, thread};

    use drawpool_core::{
        random::{LockedRandom, RandomSource, ThreadRandom, Xoroshiro},
        Rarity,
    };
    use rayon::prelude::*;

    use super::Pool;
    use crate::{error::PoolError, item::Item};

    fn seeded() -> Arc<dyn RandomSource> {
        Arc::new(LockedRandom::<Xoroshiro>::from_seed(0x5eed))
    }

    fn two_tier_pool() -> (Pool<u32>, Vec<Arc<Item<u32>>>) {
        let pool = Pool::new(seeded());
        let mut items = Item::batch(Rarity::OneStar, [1, 2]);
        items.extend(Item::batch(Rarity::TwoStar, [3]));
        pool.add_items(items.clone());
        pool.set_rarity_probability(Rarity::OneStar, 0.7)
            .set_rarity_probability(Rarity::TwoStar, 0.3);
        (pool, items)
    }

    #[test]
    fn add_is_set_like() {
        let pool = Pool::new(seeded());
        let first = Arc::new(Item::new(Rarity::OneStar, 1));
        assert_eq!(pool.add_items([first.clone()]), 1);
        assert_eq!(pool.add_items([Arc::new(Item::new(Rarity::TwoStar, 1))]), 0);
        assert_eq!(pool.items().len(), 1);
        assert_eq!(pool.items()[0].id(), first.id());
    }

    #[test]
    fn mutation_marks_dirty_and_draw_builds() {
        let (pool, _) = two_tier_pool();
        assert!(pool.is_dirty());
        assert_eq!(pool.generation(), 0);

        pool.draw().unwrap();
        assert!(!pool.is_dirty());
        assert_eq!(pool.generation(), 1);

        pool.draw().unwrap();
        assert_eq!(pool.generation(), 1);

        pool.set_rarity_probability(Rarity::TwoStar, 0.2);
        assert!(pool.is_dirty());
        pool.draw().unwrap();
        assert_eq!(pool.generation(), 2);
        assert_eq!(pool.search_line().unwrap().generation(), 2);
    }

    #[test]
    fn build_probabilities_sum_to_one() {
        let (pool, items) = two_tier_pool();
        pool.build().unwrap();

        let one_star: f64 = items[..2].iter().map(|item| item.real_probability()).sum();
        assert!((one_star - 0.7).abs() < 1e-9);
        assert!((items[2].real_probability() - 0.3).abs() < 1e-9);

        let total: f64 = pool.items().iter().map(|item| item.real_probability()).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn build_twice_is_identical() {
        let (pool, _) = two_tier_pool();
        pool.build().unwrap();
        let first = pool.search_line().unwrap();
        pool.build().unwrap();
        let second = pool.search_line().unwrap();

        assert!(first.thresholds().eq(second.thresholds()));
        assert!(first
            .items()
            .map(|item| item.id())
            .eq(second.items().map(|item| item.id())));
    }

    #[test]
    fn frequencies_follow_targets() {
        let (pool, _) = two_tier_pool();
        let draws = 100_000;
        let mut by_rarity: HashMap<Rarity, usize> = HashMap::new();
        for _ in 0..draws {
            *by_rarity.entry(pool.draw().unwrap().rarity()).or_default() += 1;
        }
        let one_star = by_rarity[&Rarity::OneStar] as f64 / draws as f64;
        let two_star = by_rarity[&Rarity::TwoStar] as f64 / draws as f64;
        assert!((one_star - 0.7).abs() < 0.02, "one star frequency {one_star}");
        assert!((two_star - 0.3).abs() < 0.02, "two star frequency {two_star}");
    }

    #[test]
    fn remainder_is_drawn_when_mass_is_left() {
        let pool = Pool::new(seeded());
        pool.add_items(Item::batch(Rarity::OneStar, [1]));
        pool.set_rarity_probability(Rarity::OneStar, 0.5);

        let nothing = (0..2_000)
            .filter(|_| pool.draw().unwrap().is_nothing())
            .count();
        assert!((800..1_200).contains(&nothing), "drew nothing {nothing} times");
        assert!(pool.items().iter().any(|item| item.is_nothing()));
    }

    #[test]
    fn custom_sentinel_is_used_as_remainder() {
        let pool = Pool::new(seeded());
        let sentinel = Arc::new(Item::<u32>::nothing().with_rarity(Rarity::TenStar));
        pool.add_items([sentinel.clone()]);
        pool.add_items(Item::batch(Rarity::OneStar, [1]));
        pool.set_rarity_probability(Rarity::OneStar, 0.25);
        pool.build().unwrap();

        assert_eq!(pool.remainder().id(), sentinel.id());
        assert!((sentinel.real_probability() - 0.75).abs() < 1e-12);
        assert_eq!(pool.items().len(), 2);
    }

    #[test]
    fn removed_items_are_never_drawn() {
        let (pool, items) = two_tier_pool();
        pool.build().unwrap();
        pool.remove_items([&items[0]]);

        for _ in 0..1_000 {
            assert_ne!(pool.draw().unwrap().id(), items[0].id());
        }
        assert!(items[0].is_removed());
        assert_eq!(items[0].real_probability(), 0.0);
        assert_eq!(pool.items().len(), 3);
    }

    #[test]
    fn fully_removed_pool_draws_remainder() {
        let (pool, items) = two_tier_pool();
        pool.build().unwrap();
        pool.remove_items(&items);

        for _ in 0..100 {
            assert!(pool.draw().unwrap().is_nothing());
        }
        assert_eq!(pool.remainder().real_probability(), 1.0);
        assert!(items.iter().all(|item| item.real_probability() == 0.0));
    }

    #[test]
    fn fully_depleted_pool_draws_remainder() {
        let pool = Pool::new(seeded());
        let limited = Arc::new(Item::new(Rarity::OneStar, 7).with_limit(3));
        pool.add_items([limited.clone()]);

        let drawn: Vec<_> = (0..6).map(|_| pool.draw().unwrap()).collect();
        assert!(drawn[..3].iter().all(|item| item.id() == limited.id()));
        assert!(drawn[3..].iter().all(|item| item.is_nothing()));
        assert!(limited.is_removed());
    }

    #[test]
    fn failed_build_keeps_published_state() {
        let (pool, items) = two_tier_pool();
        pool.build().unwrap();
        let line = pool.search_line().unwrap();
        let before: Vec<_> = items.iter().map(|item| item.real_probability()).collect();

        pool.set_rarity_probability(Rarity::TwoStar, 0.5);
        assert!(pool.build().is_err());

        let after: Vec<_> = items.iter().map(|item| item.real_probability()).collect();
        assert_eq!(before, after);
        let published = pool.search_line().unwrap();
        assert!(Arc::ptr_eq(&line, &published));
        let total: f64 = published.items().map(|item| item.real_probability()).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(pool.generation(), 1);
    }

    #[test]
    fn removing_unknown_item_is_a_no_op() {
        let (pool, _) = two_tier_pool();
        let stranger = Arc::new(Item::new(Rarity::OneStar, 99));
        pool.remove_items([&stranger]);
        assert!(!stranger.is_removed());
        pool.draw().unwrap();
    }

    #[test]
    fn configuration_errors_surface_on_draw() {
        let pool: Pool<u32> = Pool::new(seeded());
        assert_eq!(pool.draw().unwrap_err(), PoolError::EmptyPool);

        let (pool, _) = two_tier_pool();
        pool.set_rarity_probability(Rarity::TwoStar, 0.5);
        assert!(matches!(
            pool.draw(),
            Err(PoolError::ProbabilityOverflow { .. })
        ));
        // Still dirty, so the error repeats instead of drawing from a stale line.
        assert!(pool.is_dirty());
        assert!(pool.draw().is_err());
    }

    #[test]
    fn restricted_draws_stay_in_subset() {
        let (pool, items) = two_tier_pool();
        for _ in 0..500 {
            assert_eq!(pool.draw_rarity(Rarity::TwoStar).unwrap().id(), items[2].id());
            let included = pool.draw_include(&items[..1]).unwrap();
            assert_eq!(included.id(), items[0].id());
            let excepted = pool.draw_except(&items[..2]).unwrap();
            assert_eq!(excepted.id(), items[2].id());
        }
        assert!(pool.draw_rarity(Rarity::NineStar).unwrap().is_nothing());
    }

    #[test]
    fn limited_item_yields_exactly_its_supply() {
        let (pool, _) = two_tier_pool();
        let limited = Arc::new(Item::new(Rarity::OneStar, 999).with_limit(5));
        pool.add_items([limited.clone()]);
        pool.build().unwrap();
        assert!(pool.contains_limited());

        let hits = (0..10)
            .map(|_| pool.draw_include(&[limited.clone()]).unwrap())
            .filter(|item| item.id() == limited.id())
            .count();
        assert_eq!(hits, 5);
        assert!(limited.is_removed());
        assert_eq!(limited.remaining_count(), Some(0));

        pool.draw().unwrap();
        assert!(!pool.contains_limited());
    }

    #[test]
    fn concurrent_draws_never_overshoot_supply() {
        let threads = 8;
        let per_thread = 2_000;
        let supply = threads * per_thread / 2;

        let pool = Pool::new(Arc::new(ThreadRandom));
        let limited = Arc::new(Item::new(Rarity::OneStar, 0).with_limit(supply as u32));
        pool.add_items([limited.clone()]);
        pool.add_items(Item::batch(Rarity::TwoStar, 1..=4));
        pool.set_rarity_probability(Rarity::OneStar, 0.9);

        let hits = thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    let pool = &pool;
                    let limited = &limited;
                    scope.spawn(move || {
                        let mut hits = 0;
                        for _ in 0..per_thread {
                            let item = pool.draw_include(&[limited.clone()]).unwrap();
                            if item.id() == limited.id() {
                                hits += 1;
                            }
                        }
                        hits
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .sum::<usize>()
        });

        assert_eq!(hits, supply);
        assert!(limited.is_removed());
        assert_eq!(limited.remaining_count(), Some(0));
    }

    #[test]
    fn parallel_unrestricted_draws_stay_consistent() {
        let pool = Pool::new(Arc::new(ThreadRandom));
        let limited = Arc::new(Item::new(Rarity::OneStar, 0).with_limit(3_000));
        pool.add_items([limited.clone()]);
        pool.add_items(Item::batch(Rarity::OneStar, 1..=3));

        let hits = (0..40_000)
            .into_par_iter()
            .map(|_| pool.draw().unwrap())
            .filter(|item| item.id() == limited.id())
            .count();

        assert!(hits <= 3_000);
        assert_eq!(
            limited.remaining_count(),
            Some(3_000 - u32::try_from(hits).unwrap())
        );
    }

    #[test]
    fn summary_lists_items() {
        let pool = Pool::new(seeded());
        pool.add_items([Arc::new(Item::new(Rarity::OneStar, "sword"))]);
        pool.set_rarity_probability(Rarity::OneStar, 1.0);

        let summary = pool.probability_summary().unwrap();
        assert!(summary.contains("sword"));
        assert!(summary.contains("100.0000%"));
        assert!(summary.contains("sum of all probability: 1"));
    }
}
