use log::warn;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

pub mod demo;
pub mod logging;
pub mod pool;
pub mod random;

pub use demo::DemoConfig;
pub use logging::LoggingConfig;
pub use pool::{ItemConfig, PoolConfig, RarityProbabilityConfig};
pub use random::RandomConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Couldn't read configuration file at {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Couldn't parse configuration at {path:?}. Reason: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Everything the draw service reads at startup.
///
/// A missing file is replaced by the default configuration, which ships a
/// single `standard` pool.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DrawConfiguration {
    pub logging: LoggingConfig,
    pub random: RandomConfig,
    pub demo: DemoConfig,
    pub pools: Vec<PoolConfig>,
}

impl Default for DrawConfiguration {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            random: RandomConfig::default(),
            demo: DemoConfig::default(),
            pools: vec![PoolConfig::standard()],
        }
    }
}

impl DrawConfiguration {
    pub fn pool(&self, name: &str) -> Option<&PoolConfig> {
        self.pools.iter().find(|pool| pool.name == name)
    }
}

pub trait LoadTomlConfiguration {
    fn load(path: &Path) -> Result<Self, ConfigError>
    where
        Self: Sized + Default + Serialize + DeserializeOwned,
    {
        let config = if path.exists() {
            let file_content =
                fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;

            toml::from_str(&file_content).map_err(|err| ConfigError::Parse {
                path: path.to_path_buf(),
                message: err.message().to_string(),
            })?
        } else {
            let content = Self::default();

            match toml::to_string(&content) {
                Ok(serialized) => {
                    if let Err(err) = fs::write(path, serialized) {
                        warn!("Couldn't write default config to {:?}. Reason: {}", path, err);
                    }
                }
                Err(err) => warn!("Couldn't serialize default config. Reason: {}", err),
            }

            content
        };

        config.validate()?;
        Ok(config)
    }

    fn from_toml_str(content: &str) -> Result<Self, ConfigError>
    where
        Self: Sized + DeserializeOwned,
    {
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse {
            path: PathBuf::new(),
            message: err.message().to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn default_path() -> &'static Path;

    fn validate(&self) -> Result<(), ConfigError>;
}

impl LoadTomlConfiguration for DrawConfiguration {
    fn default_path() -> &'static Path {
        Path::new("drawpool.toml")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for pool in &self.pools {
            pool.validate()?;
            if !names.insert(pool.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "pool '{}' is defined more than once",
                    pool.name
                )));
            }
        }
        if !self.pools.is_empty() && !names.contains(self.demo.pool.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "demo pool '{}' is not defined",
                self.demo.pool
            )));
        }
        Ok(())
    }
}
