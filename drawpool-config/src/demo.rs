use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    /// Name of the pool the demo draws from.
    pub pool: String,
    pub threads: usize,
    pub draws_per_thread: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            pool: "standard".to_string(),
            threads: 8,
            draws_per_thread: 100_000,
        }
    }
}
