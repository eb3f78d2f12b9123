use std::sync::Arc;

use drawpool_config::{ConfigError, DrawConfiguration, PoolConfig, RandomConfig};
use drawpool_core::random::{LockedRandom, RandomSource, ThreadRandom, Xoroshiro};
use thiserror::Error;

use crate::{error::PoolError, item::Item, manager::PoolManager, pool::Pool};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Pool '{pool}' is misconfigured: {source}")]
    Pool { pool: String, source: PoolError },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Fills a [`PoolManager`] from some external description of pools.
pub trait PoolLoader<T> {
    fn load_pools(&self, manager: &PoolManager<T>) -> Result<(), LoadError>;
}

/// The random source a configuration asks for: a seeded, shared generator or
/// one entropy seeded generator per thread.
pub fn random_source(config: &RandomConfig) -> Arc<dyn RandomSource> {
    match config.seed {
        Some(seed) => Arc::new(LockedRandom::<Xoroshiro>::from_seed(seed)),
        None => Arc::new(ThreadRandom),
    }
}

/// Loads the `[[pools]]` of a [`DrawConfiguration`]. Items use their
/// configured name as payload.
pub struct ConfigPoolLoader<'a> {
    config: &'a DrawConfiguration,
    random: Arc<dyn RandomSource>,
}

impl<'a> ConfigPoolLoader<'a> {
    pub fn new(config: &'a DrawConfiguration) -> Self {
        Self {
            config,
            random: random_source(&config.random),
        }
    }

    #[must_use]
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Creates and builds the pool for `config`, so bad probabilities fail
    /// here instead of on the first draw.
    pub fn build_pool(&self, config: &PoolConfig) -> Result<Pool<String>, LoadError> {
        let items = config.items.iter().map(|item| {
            let mut built = Item::new(item.rarity, item.name.clone());
            if let Some(preset) = item.preset_probability {
                built = built.with_preset_probability(preset);
            }
            if let Some(ratio) = item.ratio_in_rarity {
                built = built.with_ratio_in_rarity(ratio);
            }
            if let Some(limit) = item.limit {
                built = built.with_limit(limit);
            }
            Arc::new(built)
        });

        let pool = Pool::with_items(self.random.clone(), items);
        for setting in &config.rarities {
            pool.set_rarity_probability(setting.rarity, setting.probability);
        }
        pool.build().map_err(|source| LoadError::Pool {
            pool: config.name.clone(),
            source,
        })?;
        Ok(pool)
    }
}

impl PoolLoader<String> for ConfigPoolLoader<'_> {
    fn load_pools(&self, manager: &PoolManager<String>) -> Result<(), LoadError> {
        for config in &self.config.pools {
            let pool = self.build_pool(config)?;
            log::info!(
                "Loaded pool '{}' with {} items",
                config.name,
                config.items.len()
            );
            manager.add_or_update_pool(config.name.clone(), Arc::new(pool));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use drawpool_config::{
        DrawConfiguration, ItemConfig, LoadTomlConfiguration, PoolConfig, RarityProbabilityConfig,
    };
    use drawpool_core::Rarity;

    use super::{ConfigPoolLoader, LoadError, PoolLoader};
    use crate::{error::PoolError, manager::PoolManager};

    #[test]
    fn default_configuration_loads() {
        let config = DrawConfiguration::default();
        let manager = PoolManager::new();
        ConfigPoolLoader::new(&config).load_pools(&manager).unwrap();

        assert_eq!(manager.pool_names(), ["standard"]);
        let pool = manager.get_pool("standard").unwrap();
        assert_eq!(pool.generation(), 1);
        assert!(pool.contains_limited());
        assert_eq!(pool.rarity_probability(Rarity::TwoStar), Some(0.3));

        let total: f64 = pool.items().iter().map(|item| item.real_probability()).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn item_settings_are_carried_over() {
        let config = DrawConfiguration::from_toml_str(
            r#"
            [demo]
            pool = "chest"

            [[pools]]
            name = "chest"
            rarities = [{ rarity = "three_star", probability = 0.5 }]

            [[pools.items]]
            name = "gem"
            rarity = "three_star"
            ratio_in_rarity = 0.2
            limit = 3

            [[pools.items]]
            name = "coin"
            rarity = "three_star"
            "#,
        )
        .unwrap();

        let pool = ConfigPoolLoader::new(&config)
            .build_pool(&config.pools[0])
            .unwrap();
        let items = pool.items();
        let gem = items
            .iter()
            .find(|item| item.payload().map(String::as_str) == Some("gem"))
            .unwrap();
        assert_eq!(gem.total_count(), Some(3));
        assert!((gem.real_probability() - 0.1).abs() < 1e-12);
        assert!(items.iter().any(|item| item.is_nothing()));
    }

    #[test]
    fn misconfigured_pool_is_reported_by_name() {
        let mut overflowing = PoolConfig {
            name: "broken".to_string(),
            rarities: vec![
                RarityProbabilityConfig {
                    rarity: Rarity::OneStar,
                    probability: 0.8,
                },
                RarityProbabilityConfig {
                    rarity: Rarity::TwoStar,
                    probability: 0.8,
                },
            ],
            items: vec![
                ItemConfig::new("a", Rarity::OneStar),
                ItemConfig::new("b", Rarity::TwoStar),
            ],
        };
        let config = DrawConfiguration {
            pools: vec![overflowing.clone()],
            ..DrawConfiguration::default()
        };

        let manager = PoolManager::new();
        let err = ConfigPoolLoader::new(&config)
            .load_pools(&manager)
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Pool { ref pool, source: PoolError::ProbabilityOverflow { .. } } if pool == "broken"
        ));
        assert!(manager.get_pool("broken").is_none());

        overflowing.items.clear();
        let err = ConfigPoolLoader::new(&config)
            .build_pool(&overflowing)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            LoadError::Pool {
                source: PoolError::EmptyPool,
                ..
            }
        ));
    }
}
