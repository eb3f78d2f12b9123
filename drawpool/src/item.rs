use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
        Arc,
    },
};

use crossbeam::atomic::AtomicCell;
use drawpool_core::Rarity;

use crate::error::PoolError;

static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(0);

/// Stable identity handed out when an item is created.
///
/// Statistics are keyed by this instead of payload equality, since every
/// "nothing" sentinel compares equal to every other one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(u64);

impl ItemId {
    fn next() -> Self {
        Self(NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One drawable unit.
///
/// The configuration (rarity, preset, ratio, supply) is fixed once the item is
/// shared. The pool writes `real_probability` while building and the draw path
/// consumes the supply, both through atomics.
///
/// An item without a payload is the "nothing" sentinel: it soaks up whatever
/// probability the real items leave over.
#[derive(Debug)]
pub struct Item<T> {
    id: ItemId,
    payload: Option<T>,
    rarity: Rarity,
    preset_probability: Option<f64>,
    ratio_in_rarity: Option<f64>,
    total_count: Option<u32>,
    remaining: AtomicU32,
    real_probability: AtomicCell<f64>,
    removed: AtomicBool,
}

impl<T> Item<T> {
    fn with_payload(rarity: Rarity, payload: Option<T>) -> Self {
        Self {
            id: ItemId::next(),
            payload,
            rarity,
            preset_probability: None,
            ratio_in_rarity: None,
            total_count: None,
            remaining: AtomicU32::new(0),
            real_probability: AtomicCell::new(0.0),
            removed: AtomicBool::new(false),
        }
    }

    pub fn new(rarity: Rarity, payload: T) -> Self {
        Self::with_payload(rarity, Some(payload))
    }

    pub fn nothing() -> Self {
        Self::with_payload(Rarity::default(), None)
    }

    /// One shared item per payload, all of the same rarity.
    pub fn batch(rarity: Rarity, payloads: impl IntoIterator<Item = T>) -> Vec<Arc<Self>> {
        payloads
            .into_iter()
            .map(|payload| Arc::new(Self::new(rarity, payload)))
            .collect()
    }

    #[must_use]
    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = rarity;
        self
    }

    /// Pins the absolute probability of the item. Redistribution never touches it.
    #[must_use]
    pub fn with_preset_probability(mut self, probability: f64) -> Self {
        self.preset_probability = Some(probability);
        self
    }

    /// Requests this share of the rarity's target probability.
    #[must_use]
    pub fn with_ratio_in_rarity(mut self, ratio: f64) -> Self {
        self.ratio_in_rarity = Some(ratio);
        self
    }

    /// Gives the item a finite supply. A limit of zero means unlimited.
    #[must_use]
    pub fn with_limit(mut self, total: u32) -> Self {
        self.total_count = (total > 0).then_some(total);
        self.remaining = AtomicU32::new(total);
        self
    }

    pub const fn id(&self) -> ItemId {
        self.id
    }

    pub const fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    pub const fn is_nothing(&self) -> bool {
        self.payload.is_none()
    }

    pub const fn rarity(&self) -> Rarity {
        self.rarity
    }

    pub const fn preset_probability(&self) -> Option<f64> {
        self.preset_probability
    }

    pub const fn ratio_in_rarity(&self) -> Option<f64> {
        self.ratio_in_rarity
    }

    pub const fn is_fixed_probability(&self) -> bool {
        self.preset_probability.is_some()
    }

    pub const fn is_limited(&self) -> bool {
        self.total_count.is_some()
    }

    pub const fn total_count(&self) -> Option<u32> {
        self.total_count
    }

    pub fn remaining_count(&self) -> Option<u32> {
        self.total_count
            .map(|_| self.remaining.load(Ordering::Acquire))
    }

    pub fn real_probability(&self) -> f64 {
        self.real_probability.load()
    }

    pub(crate) fn set_real_probability(&self, probability: f64) {
        self.real_probability.store(probability);
    }

    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    /// Removal is permanent and drops the item's mass right away.
    pub(crate) fn mark_removed(&self) {
        self.removed.store(true, Ordering::Release);
        self.set_real_probability(0.0);
    }

    /// Consumes one unit of supply and returns what is left.
    ///
    /// Exactly one caller can take the last unit; anyone after that gets
    /// [`PoolError::Exhausted`].
    pub(crate) fn try_take(&self) -> Result<u32, PoolError> {
        self.remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| left.checked_sub(1))
            .map(|previous| previous - 1)
            .map_err(|_| PoolError::Exhausted { item: self.id })
    }
}

impl<T: fmt::Display> Item<T> {
    pub fn display_name(&self) -> String {
        self.payload
            .as_ref()
            .map_or_else(|| "Nothing".to_string(), ToString::to_string)
    }
}

impl<T: fmt::Display> fmt::Display for Item<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {:.5}%",
            self.display_name(),
            self.rarity,
            self.real_probability() * 100.0
        )
    }
}

/// Items are equal when their payloads are; all sentinels are equal to each other.
impl<T: PartialEq> PartialEq for Item<T> {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
    }
}

impl<T: Eq> Eq for Item<T> {}

impl<T: Hash> Hash for Item<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.payload.hash(state);
    }
}
