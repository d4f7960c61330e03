//! The vote ledger: the only place committed votes are written, and the
//! only place the one-vote-per-voter-per-election rule is enforced.

use std::collections::HashMap;

use mongodb::error::Error as DbError;
use rocket::http::Status;
use thiserror::Error;

use crate::model::{
    db::vote::{NewVote, Vote},
    mongodb::{is_transient_error, Id},
};

mod memory;
mod mongo;

pub use memory::MemoryLedger;
pub use mongo::MongoLedger;
#[cfg(test)]
pub(crate) use memory::StalledLedger;

/// Result of a commit attempt that reached the storage layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The vote was recorded.
    Committed(Vote),
    /// A vote for this voter and election already exists; nothing was written.
    AlreadyVoted,
}

/// Storage-level failures. None of these is ever a duplicate vote.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Storage could not be reached; the operation may or may not have applied.
    #[error("Vote ledger unavailable: {0}")]
    Unavailable(#[source] DbError),
    /// Storage did not answer in time; the operation may or may not have applied.
    #[error("Vote ledger timed out")]
    Timeout,
    /// Storage reported a non-transient failure.
    #[error("Vote ledger storage failure: {0}")]
    Storage(#[source] DbError),
    /// Storage returned data that does not have the expected shape.
    #[error("Vote ledger holds inconsistent data: {0}")]
    Corrupt(String),
}

impl LedgerError {
    /// May the caller retry, after re-checking whether the vote landed?
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout)
    }

    pub fn status(&self) -> Status {
        if self.is_transient() {
            Status::ServiceUnavailable
        } else {
            Status::InternalServerError
        }
    }
}

impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        if is_transient_error(&err) {
            Self::Unavailable(err)
        } else {
            Self::Storage(err)
        }
    }
}

/// Durable, concurrency-safe storage of committed votes.
#[rocket::async_trait]
pub trait VoteLedger: Send + Sync {
    /// Record `vote` unless its voter already has a vote in its election.
    ///
    /// The existence check and the insert are one indivisible step with
    /// respect to every other `try_commit` for the same voter and election.
    async fn try_commit(&self, vote: NewVote) -> Result<CommitOutcome, LedgerError>;

    /// Number of votes per candidate in an election. Candidates with no
    /// votes may be absent. A snapshot; never blocks commits for longer than
    /// a single storage operation.
    async fn counts_by_candidate(&self, election_id: Id) -> Result<HashMap<Id, u64>, LedgerError>;

    /// Has this voter voted in this election? Advisory only: duplicates are
    /// rejected by [`VoteLedger::try_commit`], never by checking this first.
    async fn has_voted(&self, voter_id: Id, election_id: Id) -> Result<bool, LedgerError>;

    /// The vote this voter cast in this election, if any.
    async fn find_vote(&self, voter_id: Id, election_id: Id) -> Result<Option<Vote>, LedgerError>;
}
