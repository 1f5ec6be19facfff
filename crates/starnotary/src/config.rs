//! Notary configuration.

use serde::{Deserialize, Serialize};

use starnotary_core::GENESIS_BODY;
use starnotary_pool::PoolConfig;

/// Configuration for the Notary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotaryConfig {
    /// Validation pool configuration.
    pub pool: PoolConfig,
    /// Body of the genesis block written to an empty store.
    pub genesis_body: String,
}

impl Default for NotaryConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            genesis_body: GENESIS_BODY.to_string(),
        }
    }
}
