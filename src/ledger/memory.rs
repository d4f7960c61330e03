use std::collections::{hash_map::Entry, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::model::{
    db::vote::{NewVote, Vote},
    mongodb::Id,
};

use super::{CommitOutcome, LedgerError, VoteLedger};

/// Votes keyed by `(voter_id, election_id)`, plus running per-election tallies.
#[derive(Debug, Default)]
struct LedgerState {
    votes: HashMap<(Id, Id), Vote>,
    tallies: HashMap<Id, HashMap<Id, u64>>,
}

/// A process-local ledger, for tests and single-node development.
///
/// The lock is only ever held for a map lookup or insert, never across an
/// `.await`.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>, LedgerError> {
        self.state
            .lock()
            .map_err(|_| LedgerError::Corrupt("ledger lock poisoned".to_string()))
    }

    /// Total number of committed votes, across all elections. Panics if the
    /// lock is poisoned.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().votes.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[rocket::async_trait]
impl VoteLedger for MemoryLedger {
    async fn try_commit(&self, vote: NewVote) -> Result<CommitOutcome, LedgerError> {
        let mut state = self.lock()?;
        let LedgerState { votes, tallies } = &mut *state;
        match votes.entry((vote.voter_id, vote.election_id)) {
            Entry::Occupied(_) => Ok(CommitOutcome::AlreadyVoted),
            Entry::Vacant(slot) => {
                *tallies
                    .entry(vote.election_id)
                    .or_default()
                    .entry(vote.candidate_id)
                    .or_default() += 1;
                let vote = Vote {
                    id: Id::new(),
                    vote,
                };
                slot.insert(vote.clone());
                Ok(CommitOutcome::Committed(vote))
            }
        }
    }

    async fn counts_by_candidate(&self, election_id: Id) -> Result<HashMap<Id, u64>, LedgerError> {
        let state = self.lock()?;
        Ok(state.tallies.get(&election_id).cloned().unwrap_or_default())
    }

    async fn has_voted(&self, voter_id: Id, election_id: Id) -> Result<bool, LedgerError> {
        Ok(self.lock()?.votes.contains_key(&(voter_id, election_id)))
    }

    async fn find_vote(&self, voter_id: Id, election_id: Id) -> Result<Option<Vote>, LedgerError> {
        Ok(self.lock()?.votes.get(&(voter_id, election_id)).cloned())
    }
}

/// A ledger whose commits never return.
#[cfg(test)]
pub(crate) struct StalledLedger;

#[cfg(test)]
#[rocket::async_trait]
impl VoteLedger for StalledLedger {
    async fn try_commit(&self, _: NewVote) -> Result<CommitOutcome, LedgerError> {
        std::future::pending().await
    }

    async fn counts_by_candidate(&self, _: Id) -> Result<HashMap<Id, u64>, LedgerError> {
        Ok(HashMap::new())
    }

    async fn has_voted(&self, _: Id, _: Id) -> Result<bool, LedgerError> {
        Ok(false)
    }

    async fn find_vote(&self, _: Id, _: Id) -> Result<Option<Vote>, LedgerError> {
        Ok(None)
    }
}
