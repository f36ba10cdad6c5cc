//! Command implementations, one module per command group.

use std::sync::Arc;

use sokoni_console::storage::FileStore;
use sokoni_console::stores::{CartStore, CatalogStore, SessionStore};
use sokoni_console::{ApiClient, Config, MediaClient, SharedKv};

pub mod account;
pub mod cart;
pub mod media;
pub mod products;

/// Execution context for commands: configuration, the backend client, and
/// the on-disk persistence port the stores share.
pub struct Context {
    pub config: Config,
    pub api: ApiClient,
    pub kv: SharedKv,
}

impl Context {
    /// Load configuration and open the state file under the data directory.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::from_env()?;
        let store = FileStore::open(config.data_dir.join("state.json"))?;
        let kv: SharedKv = Arc::new(store);
        let api = ApiClient::new(&config.api_base_url);
        Ok(Self { config, api, kv })
    }

    pub fn session(&self) -> SessionStore {
        SessionStore::new(self.api.clone(), Arc::clone(&self.kv))
    }

    pub fn cart(&self) -> CartStore {
        CartStore::new(Arc::clone(&self.kv))
    }

    pub fn catalog(&self) -> CatalogStore {
        CatalogStore::new(self.api.clone())
    }

    pub fn media(&self) -> MediaClient {
        MediaClient::new(&self.config.media)
    }
}
