#[macro_use]
extern crate rocket;
#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use std::sync::Arc;

use mongodb::{error::Error as DbError, Database};
use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, DatabaseFairing, VotingFairing};
use crate::directory::{ElectionDirectory, MemoryDirectory, MongoDirectory};
use crate::ledger::{MemoryLedger, MongoLedger, VoteLedger};
use crate::logging::LoggerFairing;
use crate::model::mongodb::ensure_indexes_exist;

pub mod admission;
pub mod api;
pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod logging;
pub mod model;
pub mod tally;

/// The storage the voting core runs on. Managed state.
pub struct Storage {
    pub directory: Arc<dyn ElectionDirectory>,
    pub ledger: Arc<dyn VoteLedger>,
}

impl Storage {
    /// MongoDB-backed storage. Creates the indexes the ledger relies on.
    pub async fn mongo(db: &Database) -> Result<Self, DbError> {
        ensure_indexes_exist(db).await?;
        Ok(Self {
            directory: Arc::new(MongoDirectory::new(db)),
            ledger: Arc::new(MongoLedger::new(db)),
        })
    }

    /// Process-local storage.
    pub fn memory(directory: Arc<MemoryDirectory>, ledger: Arc<MemoryLedger>) -> Self {
        Self {
            directory,
            ledger,
        }
    }
}

pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(VotingFairing::default())
        .mount("/", api::routes())
}

/// Application config for tests, in place of `Rocket.toml`.
#[cfg(test)]
fn test_figment() -> rocket::figment::Figment {
    rocket::Config::figment()
        .merge(("jwt_secret", "test-jwt-secret"))
        .merge(("auth_ttl", 3600))
        .merge(("directory_timeout_ms", 200))
        .merge(("ledger_timeout_ms", 1000))
}

/// A rocket on the given storage and clock, with no database connection.
#[cfg(test)]
pub(crate) fn rocket_with_storage(
    storage: Storage,
    clock: Arc<dyn clock::TimeSource>,
) -> Rocket<Build> {
    rocket::custom(test_figment())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .manage(storage)
        .attach(VotingFairing::with_clock(clock))
        .mount("/", api::routes())
}

#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    let db_uri = rocket::Config::figment()
        .extract_inner::<String>("db_uri")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    mongodb::Client::with_uri_str(db_uri).await.unwrap()
}

#[cfg(test)]
pub(crate) fn database() -> String {
    config::get_database_name()
}

/// A rocket on MongoDB storage in the named database.
#[cfg(test)]
pub(crate) async fn rocket_for_db(client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    let db = client.database(db_name);
    let storage = Storage::mongo(&db).await.unwrap();
    rocket::custom(test_figment())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .manage(client)
        .manage(db)
        .manage(storage)
        .attach(VotingFairing::default())
        .mount("/", api::routes())
}
