//! Weighted random draw pools.
//!
//! A [`Pool`] holds shared [`Item`]s grouped by [`Rarity`]. Building a pool
//! turns rarity targets, presets and ratios into one probability per item and
//! lays them out on a [`SearchLine`]; draws then resolve a uniform value
//! against that line. Items may carry a finite supply and leave the pool once
//! it runs out, even while many threads draw at the same time.

pub mod builder;
pub mod drawer;
pub mod error;
pub mod item;
pub mod loader;
pub mod manager;
pub mod pool;
pub mod search;
pub mod statistician;

pub use builder::PROBABILITY_EPSILON;
pub use drawer::Drawer;
pub use drawpool_core::Rarity;
pub use error::PoolError;
pub use item::{Item, ItemId};
pub use loader::{ConfigPoolLoader, LoadError, PoolLoader};
pub use manager::PoolManager;
pub use pool::Pool;
pub use search::SearchLine;
pub use statistician::{DrawReport, ItemStatistics, Statistician};
