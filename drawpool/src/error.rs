use drawpool_core::Rarity;
use thiserror::Error;

use crate::item::ItemId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoolError {
    #[error("The pool holds no items to draw")]
    EmptyPool,
    #[error("Total probability {total} of the pool is above 100%")]
    ProbabilityOverflow { total: f64 },
    #[error("Ratios within rarity {rarity} add up to {total}, which is above 1")]
    RatioOverflow { rarity: Rarity, total: f64 },
    #[error("Item {item} has an invalid probability {value}")]
    InvalidItemProbability { item: ItemId, value: f64 },
    #[error("Rarity {rarity} has an invalid probability {value}")]
    InvalidRarityProbability { rarity: Rarity, value: f64 },
    #[error("The pool has not been built")]
    NotBuilt,
    /// A depletable item was resolved after its last unit was gone. The draw
    /// locking rules out this case, so seeing it means that locking is broken.
    #[error("Limited item {item} was drawn with no remaining supply")]
    Exhausted { item: ItemId },
}

impl PoolError {
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Exhausted { .. } | Self::NotBuilt)
    }

    pub const fn severity(&self) -> log::Level {
        if self.is_internal() {
            log::Level::Error
        } else {
            log::Level::Warn
        }
    }

    pub fn log(&self) {
        log::log!(self.severity(), "{}", self);
    }
}
