//! Read-only access to elections and candidates.
//!
//! Elections and candidates are managed by the administration service; the
//! voting core only ever looks them up.

use chrono::{DateTime, Utc};
use mongodb::error::Error as DbError;
use rocket::http::Status;
use thiserror::Error;

use crate::model::{
    db::{candidate::Candidate, election::Election},
    mongodb::Id,
};

mod memory;
mod mongo;

pub use memory::MemoryDirectory;
pub use mongo::MongoDirectory;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Election directory unavailable: {0}")]
    Unavailable(#[from] DbError),
    #[error("Election directory timed out")]
    Timeout,
}

impl DirectoryError {
    pub fn status(&self) -> Status {
        Status::ServiceUnavailable
    }
}

#[rocket::async_trait]
pub trait ElectionDirectory: Send + Sync {
    async fn get_election(&self, election_id: Id) -> Result<Option<Election>, DirectoryError>;

    async fn get_candidate(&self, candidate_id: Id) -> Result<Option<Candidate>, DirectoryError>;

    /// All candidates standing in an election, in the order they were created.
    async fn candidates_for(&self, election_id: Id) -> Result<Vec<Candidate>, DirectoryError>;

    /// Elections, most recently started first. With `active_at`, only those
    /// whose voting window contains that instant.
    async fn list_elections(
        &self,
        active_at: Option<DateTime<Utc>>,
    ) -> Result<Vec<Election>, DirectoryError>;
}
