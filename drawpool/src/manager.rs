use std::{collections::HashMap, hash::Hash, sync::Arc};

use parking_lot::RwLock;

use crate::{drawer::Drawer, pool::Pool};

/// Named registry of pools, each with a lazily created [`Drawer`].
///
/// Locks are always taken pools first, then drawers.
pub struct PoolManager<T> {
    pools: RwLock<HashMap<String, Arc<Pool<T>>>>,
    drawers: RwLock<HashMap<String, Arc<Drawer<T>>>>,
}

impl<T> Default for PoolManager<T> {
    fn default() -> Self {
        Self {
            pools: RwLock::new(HashMap::new()),
            drawers: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Eq + Hash> PoolManager<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_pool(&self, name: &str) -> Option<Arc<Pool<T>>> {
        self.pools.read().get(name).cloned()
    }

    /// The drawer of pool `name`, created on first use and shared afterwards.
    pub fn get_drawer(&self, name: &str) -> Option<Arc<Drawer<T>>> {
        let pools = self.pools.read();
        let pool = pools.get(name)?;
        if let Some(drawer) = self.drawers.read().get(name) {
            return Some(drawer.clone());
        }
        let drawer = self
            .drawers
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Drawer::new(pool.clone())))
            .clone();
        Some(drawer)
    }

    pub fn pool_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.pools.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Registers `pool` under `name`, replacing any previous pool and dropping
    /// its drawer along with the statistics it gathered.
    pub fn add_or_update_pool(&self, name: impl Into<String>, pool: Arc<Pool<T>>) {
        let name = name.into();
        let mut pools = self.pools.write();
        if pools.insert(name.clone(), pool).is_some() {
            log::info!("Replaced pool '{name}'");
        } else {
            log::debug!("Registered pool '{name}'");
        }
        self.drawers.write().remove(&name);
    }

    pub fn remove_pool(&self, name: &str) -> Option<Arc<Pool<T>>> {
        let mut pools = self.pools.write();
        let removed = pools.remove(name);
        self.drawers.write().remove(name);
        removed
    }
}
