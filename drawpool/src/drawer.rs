use std::{fmt, hash::Hash, sync::Arc};

use drawpool_core::Rarity;

use crate::{
    error::PoolError,
    item::Item,
    pool::Pool,
    statistician::{DrawReport, Statistician},
};

/// Draws from a shared [`Pool`] and keeps statistics of what came out.
pub struct Drawer<T> {
    pool: Arc<Pool<T>>,
    statistician: Statistician<T>,
}

impl<T: Eq + Hash> Drawer<T> {
    pub fn new(pool: Arc<Pool<T>>) -> Self {
        Self {
            pool,
            statistician: Statistician::new(),
        }
    }

    fn recorded(&self, drawn: Result<Arc<Item<T>>, PoolError>) -> Result<Arc<Item<T>>, PoolError> {
        let item = drawn?;
        self.statistician.record(&item);
        Ok(item)
    }

    pub fn draw(&self) -> Result<Arc<Item<T>>, PoolError> {
        self.recorded(self.pool.draw())
    }

    pub fn draw_rarity(&self, rarity: Rarity) -> Result<Arc<Item<T>>, PoolError> {
        self.recorded(self.pool.draw_rarity(rarity))
    }

    pub fn draw_include(&self, included: &[Arc<Item<T>>]) -> Result<Arc<Item<T>>, PoolError> {
        self.recorded(self.pool.draw_include(included))
    }

    pub fn draw_except(&self, excluded: &[Arc<Item<T>>]) -> Result<Arc<Item<T>>, PoolError> {
        self.recorded(self.pool.draw_except(excluded))
    }

    pub fn draw_matching(
        &self,
        keep: impl Fn(&Item<T>) -> bool,
    ) -> Result<Arc<Item<T>>, PoolError> {
        self.recorded(self.pool.draw_matching(keep))
    }

    pub fn pool(&self) -> &Arc<Pool<T>> {
        &self.pool
    }

    pub fn statistician(&self) -> &Statistician<T> {
        &self.statistician
    }
}

impl<T: Eq + Hash + fmt::Display> Drawer<T> {
    /// Statistics for every item of the pool, drawn or not.
    pub fn report(&self) -> DrawReport {
        self.statistician.track(&self.pool.items());
        self.statistician.report()
    }
}
