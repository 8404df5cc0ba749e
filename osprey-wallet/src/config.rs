//! Wallet database configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use osprey_chain::parameters::Network;

/// Configuration for the wallet database.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// The root directory for storing cached data.
    pub cache_dir: PathBuf,

    /// Whether to use an ephemeral database.
    ///
    /// Ephemeral databases are stored in memory-backed temporary storage
    /// and deleted when the handle is dropped. Used by tests.
    pub ephemeral: bool,
}

impl Config {
    /// Generate the appropriate `sled::Config` for `network`, based on the
    /// provided `osprey_wallet::Config`.
    pub(crate) fn sled_config(&self, network: Network) -> sled::Config {
        let path = self.cache_dir.join("wallet").join(network.name());

        sled::Config::default()
            .path(path)
            .temporary(self.ephemeral)
    }

    /// A configuration that stores nothing on disk. Used by tests.
    pub fn ephemeral() -> Config {
        Config {
            ephemeral: true,
            ..Config::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap().join("cache"))
            .join("osprey");

        Self {
            cache_dir,
            ephemeral: false,
        }
    }
}
