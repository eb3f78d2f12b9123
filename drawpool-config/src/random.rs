use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct RandomConfig {
    /// Seeds one shared, mutex guarded generator so runs can be replayed.
    /// Without a seed every thread draws from its own entropy seeded generator.
    pub seed: Option<u64>,
}
