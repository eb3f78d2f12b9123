use std::collections::HashSet;

use drawpool_core::Rarity;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One named pool: the target mass of each rarity and the items it holds.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct PoolConfig {
    pub name: String,
    #[serde(default)]
    pub rarities: Vec<RarityProbabilityConfig>,
    #[serde(default)]
    pub items: Vec<ItemConfig>,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
pub struct RarityProbabilityConfig {
    pub rarity: Rarity,
    pub probability: f64,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ItemConfig {
    pub name: String,
    #[serde(default)]
    pub rarity: Rarity,
    /// Absolute probability within the whole pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_probability: Option<f64>,
    /// Share of the rarity's target probability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio_in_rarity: Option<f64>,
    /// Finite supply. The item leaves the pool once it has been drawn this many times.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl ItemConfig {
    pub fn new(name: impl Into<String>, rarity: Rarity) -> Self {
        Self {
            name: name.into(),
            rarity,
            preset_probability: None,
            ratio_in_rarity: None,
            limit: None,
        }
    }
}

fn check_probability(what: impl FnOnce() -> String, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{} must be between 0 and 1, got {value}",
            what()
        )))
    }
}

impl PoolConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("pool name must not be empty".into()));
        }

        let mut rarities = HashSet::new();
        for setting in &self.rarities {
            if !rarities.insert(setting.rarity) {
                return Err(ConfigError::Invalid(format!(
                    "pool '{}' sets rarity {} more than once",
                    self.name, setting.rarity
                )));
            }
            check_probability(
                || format!("pool '{}' rarity {}", self.name, setting.rarity),
                setting.probability,
            )?;
        }

        for item in &self.items {
            if item.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "pool '{}' contains an item without a name",
                    self.name
                )));
            }
            if let Some(preset) = item.preset_probability {
                check_probability(
                    || format!("preset probability of '{}'", item.name),
                    preset,
                )?;
            }
            if let Some(ratio) = item.ratio_in_rarity {
                check_probability(|| format!("rarity ratio of '{}'", item.name), ratio)?;
            }
            if item.limit == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "limit of '{}' must be greater than 0",
                    item.name
                )));
            }
        }
        Ok(())
    }

    /// The pool the stock configuration ships with.
    pub(crate) fn standard() -> Self {
        let mut items: Vec<ItemConfig> = (1..=5)
            .map(|n| ItemConfig::new(format!("card-{n}"), Rarity::OneStar))
            .chain((6..=10).map(|n| ItemConfig::new(format!("card-{n}"), Rarity::TwoStar)))
            .collect();
        items[1].limit = Some(50_000);
        items[4].preset_probability = Some(0.000_001);

        Self {
            name: "standard".to_string(),
            rarities: vec![RarityProbabilityConfig {
                rarity: Rarity::TwoStar,
                probability: 0.3,
            }],
            items,
        }
    }
}
