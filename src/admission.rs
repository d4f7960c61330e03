//! Admission of a single vote attempt.
//!
//! Each attempt walks `Received -> IdentityResolved -> WindowChecked ->
//! MembershipChecked` and ends either `Committed` or `Rejected`. Every
//! collaborator lookup happens before the ledger is touched, so an attempt
//! that stops early (rejection, timeout, storage fault) writes nothing.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rocket::{http::Status, tokio::time::timeout};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::TimeSource;
use crate::directory::{DirectoryError, ElectionDirectory};
use crate::identity::{IdentityVerifier, RequestContext};
use crate::ledger::{CommitOutcome, LedgerError, VoteLedger};
use crate::model::{
    db::{
        candidate::Candidate,
        election::{Election, WindowPosition},
        vote::{NewVote, Vote},
    },
    mongodb::Id,
};

const DEFAULT_DIRECTORY_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_LEDGER_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a vote attempt was turned away. Every reason is permanent for the
/// attempt that produced it; none of them is retryable as-is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    Unauthenticated,
    ElectionNotFound,
    ElectionNotStarted,
    ElectionClosed,
    CandidateNotFound,
    AlreadyVoted,
}

impl Rejection {
    /// Stable, user-facing text for this reason.
    pub fn message(self) -> &'static str {
        match self {
            Self::Unauthenticated => "Not authenticated",
            Self::ElectionNotFound => "Election not found",
            Self::ElectionNotStarted => "Election has not started yet",
            Self::ElectionClosed => "Election has ended",
            Self::CandidateNotFound => "Candidate not found in this election",
            Self::AlreadyVoted => "You have already voted in this election",
        }
    }

    pub fn status(self) -> Status {
        match self {
            Self::Unauthenticated => Status::Unauthorized,
            Self::ElectionNotFound | Self::CandidateNotFound => Status::NotFound,
            Self::ElectionNotStarted | Self::ElectionClosed => Status::Forbidden,
            Self::AlreadyVoted => Status::Conflict,
        }
    }

    /// The rejection for voting at `now`, if the window does not allow it.
    fn for_window(election: &Election, now: DateTime<Utc>) -> Option<Self> {
        match election.window_position(now) {
            WindowPosition::NotStarted => Some(Self::ElectionNotStarted),
            WindowPosition::Open => None,
            WindowPosition::Closed => Some(Self::ElectionClosed),
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Failures that stop an attempt without a verdict. The ledger is left
/// untouched unless the error is an ambiguous commit (see
/// [`AdmissionError::is_transient`]).
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl AdmissionError {
    /// Worth retrying. After a transient ledger error the vote may or may
    /// not have landed, so check the vote status before resubmitting.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Ledger(err) => err.is_transient(),
            Self::Directory(_) => true,
        }
    }
}

/// A vote that made it into the ledger, with the records it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedVote {
    pub vote: Vote,
    pub election: Election,
    pub candidate: Candidate,
}

/// The verdict on one vote attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Committed(CommittedVote),
    Rejected(Rejection),
}

/// Whether a voter has voted in an election.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteStatus {
    pub has_voted: bool,
    pub vote: Option<Vote>,
}

/// Progress of a single attempt.
#[derive(Debug)]
enum AttemptState {
    Received,
    IdentityResolved {
        voter_id: Id,
    },
    WindowChecked {
        voter_id: Id,
        election: Election,
    },
    MembershipChecked {
        voter_id: Id,
        election: Election,
        candidate: Candidate,
    },
}

enum Step {
    Next(AttemptState),
    Done(Admission),
}

/// What the voter asked for.
#[derive(Debug, Copy, Clone)]
struct Ballot {
    election_id: Id,
    candidate_id: Id,
}

/// Validates vote attempts and drives them to a ledger commit or a rejection.
pub struct AdmissionController {
    identity: Arc<dyn IdentityVerifier>,
    directory: Arc<dyn ElectionDirectory>,
    ledger: Arc<dyn VoteLedger>,
    clock: Arc<dyn TimeSource>,
    directory_timeout: Duration,
    ledger_timeout: Duration,
}

impl AdmissionController {
    pub fn new(
        identity: Arc<dyn IdentityVerifier>,
        directory: Arc<dyn ElectionDirectory>,
        ledger: Arc<dyn VoteLedger>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            identity,
            directory,
            ledger,
            clock,
            directory_timeout: DEFAULT_DIRECTORY_TIMEOUT,
            ledger_timeout: DEFAULT_LEDGER_TIMEOUT,
        }
    }

    /// Bound each election directory lookup.
    pub fn with_directory_timeout(mut self, limit: Duration) -> Self {
        self.directory_timeout = limit;
        self
    }

    /// Bound the ledger commit.
    pub fn with_ledger_timeout(mut self, limit: Duration) -> Self {
        self.ledger_timeout = limit;
        self
    }

    /// The server's current time.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Run one vote attempt to completion.
    pub async fn cast_vote(
        &self,
        ctx: &RequestContext,
        election_id: Id,
        candidate_id: Id,
    ) -> Result<Admission, AdmissionError> {
        let ballot = Ballot {
            election_id,
            candidate_id,
        };
        let mut state = AttemptState::Received;
        loop {
            state = match self.advance(ctx, ballot, state).await? {
                Step::Next(next) => next,
                Step::Done(admission) => return Ok(admission),
            };
        }
    }

    /// Take one transition.
    async fn advance(
        &self,
        ctx: &RequestContext,
        ballot: Ballot,
        state: AttemptState,
    ) -> Result<Step, AdmissionError> {
        let step = match state {
            AttemptState::Received => match self.identity.resolve_identity(ctx) {
                Some(voter_id) => Step::Next(AttemptState::IdentityResolved { voter_id }),
                None => {
                    info!("Unauthenticated vote attempt in election {}", ballot.election_id);
                    Step::Done(Admission::Rejected(Rejection::Unauthenticated))
                }
            },

            AttemptState::IdentityResolved { voter_id } => {
                let election = self
                    .lookup(self.directory.get_election(ballot.election_id))
                    .await?;
                match election {
                    None => self.reject(voter_id, ballot, Rejection::ElectionNotFound),
                    Some(election) => match Rejection::for_window(&election, self.now()) {
                        Some(rejection) => self.reject(voter_id, ballot, rejection),
                        None => Step::Next(AttemptState::WindowChecked { voter_id, election }),
                    },
                }
            }

            AttemptState::WindowChecked { voter_id, election } => {
                let candidate = self
                    .lookup(self.directory.get_candidate(ballot.candidate_id))
                    .await?;
                match candidate {
                    Some(candidate) if candidate.stands_in(election.id) => {
                        Step::Next(AttemptState::MembershipChecked {
                            voter_id,
                            election,
                            candidate,
                        })
                    }
                    // Unknown, or standing in a different election.
                    _ => self.reject(voter_id, ballot, Rejection::CandidateNotFound),
                }
            }

            AttemptState::MembershipChecked {
                voter_id,
                election,
                candidate,
            } => {
                // The window may have closed during the lookups; the vote
                // must carry a timestamp inside it.
                let cast_at = self.now();
                if let Some(rejection) = Rejection::for_window(&election, cast_at) {
                    return Ok(self.reject(voter_id, ballot, rejection));
                }
                let vote = NewVote {
                    voter_id,
                    election_id: election.id,
                    candidate_id: candidate.id,
                    cast_at,
                };
                let outcome = timeout(self.ledger_timeout, self.ledger.try_commit(vote))
                    .await
                    .map_err(|_| LedgerError::Timeout);
                match outcome.and_then(|result| result) {
                    Ok(CommitOutcome::Committed(vote)) => {
                        info!(
                            "Voter {voter_id} voted in election {} (vote {})",
                            election.id, vote.id
                        );
                        Step::Done(Admission::Committed(CommittedVote {
                            vote,
                            election,
                            candidate,
                        }))
                    }
                    Ok(CommitOutcome::AlreadyVoted) => {
                        self.reject(voter_id, ballot, Rejection::AlreadyVoted)
                    }
                    Err(e) => {
                        error!(
                            "Commit failed for voter {voter_id} in election {}: {e}",
                            election.id
                        );
                        return Err(e.into());
                    }
                }
            }
        };
        Ok(step)
    }

    fn reject(&self, voter_id: Id, ballot: Ballot, rejection: Rejection) -> Step {
        info!(
            "Vote by {voter_id} for {} in election {} rejected: {rejection:?}",
            ballot.candidate_id, ballot.election_id
        );
        Step::Done(Admission::Rejected(rejection))
    }

    /// Run a directory lookup under the configured time limit.
    async fn lookup<T>(
        &self,
        query: impl Future<Output = Result<T, DirectoryError>> + Send,
    ) -> Result<T, DirectoryError> {
        match timeout(self.directory_timeout, query).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Election directory lookup exceeded {:?}",
                    self.directory_timeout
                );
                Err(DirectoryError::Timeout)
            }
        }
    }

    /// Has the requesting voter voted in the election? `None` if the request
    /// carries no valid voter identity.
    ///
    /// This is for display only; it plays no part in admitting votes.
    pub async fn vote_status(
        &self,
        ctx: &RequestContext,
        election_id: Id,
    ) -> Result<Option<VoteStatus>, AdmissionError> {
        let voter_id = match self.identity.resolve_identity(ctx) {
            Some(voter_id) => voter_id,
            None => return Ok(None),
        };
        let has_voted = self.ledger.has_voted(voter_id, election_id).await?;
        let vote = if has_voted {
            self.ledger.find_vote(voter_id, election_id).await?
        } else {
            None
        };
        Ok(Some(VoteStatus { has_voted, vote }))
    }
}
