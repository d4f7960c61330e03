use std::sync::Arc;

use chrono::Duration;
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::{
    admission::AdmissionController,
    clock::{SystemTimeSource, TimeSource},
    identity::JwtIdentityVerifier,
    tally::TallyAggregator,
    Storage,
};

/// Default bound on a single election directory lookup.
const DEFAULT_DIRECTORY_TIMEOUT_MS: u64 = 2_000;

/// Default bound on a single vote ledger commit.
const DEFAULT_LEDGER_TIMEOUT_MS: u64 = 5_000;

fn default_directory_timeout_ms() -> u64 {
    DEFAULT_DIRECTORY_TIMEOUT_MS
}

fn default_ledger_timeout_ms() -> u64 {
    DEFAULT_LEDGER_TIMEOUT_MS
}

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    #[serde(default = "default_directory_timeout_ms")]
    directory_timeout_ms: u64,
    #[serde(default = "default_ledger_timeout_ms")]
    ledger_timeout_ms: u64,
    // secrets
    jwt_secret: String,
}

impl Config {
    /// Valid lifetime of auth tokens in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// How long a vote attempt may wait on the election directory before
    /// it is abandoned.
    pub fn directory_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.directory_timeout_ms)
    }

    /// How long a vote commit may take before the attempt is reported as
    /// unavailable. The vote may still land afterwards.
    pub fn ledger_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.ledger_timeout_ms)
    }

    /// Secret key used to verify JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
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

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// performs any setup necessary, and places a `Client`, a `Database` and the
/// MongoDB-backed [`Storage`] into managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        // Construct the connection.
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&get_database_name());

        // Set up the vote ledger; this creates the unique vote index.
        let storage = match Storage::mongo(&db).await {
            Ok(storage) => storage,
            Err(e) => {
                error!("Failed to prepare database: {e}");
                return Err(rocket);
            }
        };
        info!("...database connection online!");

        // Manage the state.
        rocket = rocket.manage(client).manage(db).manage(storage);
        Ok(rocket)
    }
}

/// Get the name of the database to use (production version).
#[cfg(not(test))]
fn get_database_name() -> String {
    "evote".to_string()
}

/// Get the name of the database to use (test version).
/// Use a random name to avoid collisions between tests.
#[cfg(test)]
pub(crate) fn get_database_name() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    info!("Using database {db}");
    db
}

/// A fairing that assembles the voting core from the managed [`Config`] and
/// [`Storage`], and manages the [`AdmissionController`] and
/// [`TallyAggregator`].
///
/// Must be attached after the fairings providing those.
pub struct VotingFairing {
    clock: Arc<dyn TimeSource>,
}

impl VotingFairing {
    /// Use a specific clock instead of the system one.
    pub fn with_clock(clock: Arc<dyn TimeSource>) -> Self {
        Self { clock }
    }
}

impl Default for VotingFairing {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemTimeSource))
    }
}

#[rocket::async_trait]
impl Fairing for VotingFairing {
    fn info(&self) -> Info {
        Info {
            name: "Voting core",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let (controller, aggregator) = {
            let config = match rocket.state::<Config>() {
                Some(config) => config,
                None => {
                    error!("Voting core needs the application config");
                    return Err(rocket);
                }
            };
            let storage = match rocket.state::<Storage>() {
                Some(storage) => storage,
                None => {
                    error!("Voting core needs a vote ledger and election directory");
                    return Err(rocket);
                }
            };
            let controller = AdmissionController::new(
                Arc::new(JwtIdentityVerifier::new(config)),
                storage.directory.clone(),
                storage.ledger.clone(),
                self.clock.clone(),
            )
            .with_directory_timeout(config.directory_timeout())
            .with_ledger_timeout(config.ledger_timeout());
            let aggregator =
                TallyAggregator::new(storage.directory.clone(), storage.ledger.clone());
            (controller, aggregator)
        };
        info!("Voting core ready");

        Ok(rocket.manage(controller).manage(aggregator))
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Config {
        pub fn example() -> Self {
            Self {
                auth_ttl: 3600,
                directory_timeout_ms: 200,
                ledger_timeout_ms: 1_000,
                jwt_secret: "test-jwt-secret".to_string(),
            }
        }
    }
}
