use std::sync::Arc;

use rocket::{
    fairing::{Fairing, Info, Kind},
    time::Duration,
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{
    mongodb::MongoStore,
    store::{MemoryStore, Store},
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_auth_ttl")]
    auth_ttl: u32,
}

fn default_auth_ttl() -> u32 {
    3600
}

impl Config {
    /// Valid lifetime of voter session cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the store fairing and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        Ok(rocket.manage(config))
    }
}

/// Which store backs the registry and tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum StoreKind {
    #[default]
    #[serde(rename = "mongodb")]
    MongoDb,
    /// Volatile, for local experiments. Everything is lost on shutdown.
    #[serde(rename = "memory")]
    Memory,
}

/// Configuration for the store.
#[derive(Debug, Deserialize)]
struct StoreConfig {
    #[serde(default)]
    store: StoreKind,
    // secrets
    db_uri: Option<String>,
    #[serde(default = "default_db_name")]
    db_name: String,
}

fn default_db_name() -> String {
    "votebox".to_string()
}

/// A fairing that loads the store config, connects to the database if there
/// is one, performs any setup necessary, and places the [`Store`] into
/// managed state.
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<StoreConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load store config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let store: Store = match config.store {
            StoreKind::Memory => {
                warn!("Using the in-memory store, nothing will be persisted");
                Arc::new(MemoryStore::default())
            }
            StoreKind::MongoDb => {
                let Some(db_uri) = config.db_uri else {
                    error!("Failed to load store config: `db_uri` is required for MongoDB");
                    return Err(rocket);
                };
                info!("Loaded database config, connecting to {}...", config.db_name);
                match MongoStore::connect(&db_uri, &config.db_name).await {
                    Ok(store) => {
                        info!("...database connection online!");
                        Arc::new(store)
                    }
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                }
            }
        };

        Ok(rocket.manage(store))
    }
}
