use std::sync::{RwLock, RwLockReadGuard};

use chrono::{DateTime, Utc};

use crate::model::{
    db::{
        candidate::{Candidate, NewCandidate},
        election::{Election, NewElection},
    },
    mongodb::Id,
};

use super::{DirectoryError, ElectionDirectory};

#[derive(Debug, Default)]
struct DirectoryState {
    elections: Vec<Election>,
    candidates: Vec<Candidate>,
}

/// A process-local directory, for tests and single-node development.
/// Records keep their insertion order.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    state: RwLock<DirectoryState>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an election, returning it with its new ID.
    pub fn insert_election(&self, election: NewElection) -> Election {
        let election = Election::from_new(election);
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .elections
            .push(election.clone());
        election
    }

    /// Add a candidate, returning it with its new ID.
    pub fn insert_candidate(&self, candidate: NewCandidate) -> Candidate {
        let candidate = Candidate::from_new(candidate);
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .candidates
            .push(candidate.clone());
        candidate
    }

    fn read(&self) -> RwLockReadGuard<'_, DirectoryState> {
        // Records are only ever appended, so a poisoned lock still holds valid data.
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[rocket::async_trait]
impl ElectionDirectory for MemoryDirectory {
    async fn get_election(&self, election_id: Id) -> Result<Option<Election>, DirectoryError> {
        Ok(self
            .read()
            .elections
            .iter()
            .find(|e| e.id == election_id)
            .cloned())
    }

    async fn get_candidate(&self, candidate_id: Id) -> Result<Option<Candidate>, DirectoryError> {
        Ok(self
            .read()
            .candidates
            .iter()
            .find(|c| c.id == candidate_id)
            .cloned())
    }

    async fn candidates_for(&self, election_id: Id) -> Result<Vec<Candidate>, DirectoryError> {
        Ok(self
            .read()
            .candidates
            .iter()
            .filter(|c| c.stands_in(election_id))
            .cloned()
            .collect())
    }

    async fn list_elections(
        &self,
        active_at: Option<DateTime<Utc>>,
    ) -> Result<Vec<Election>, DirectoryError> {
        let mut elections = self
            .read()
            .elections
            .iter()
            .filter(|e| active_at.map_or(true, |now| e.is_open_at(now)))
            .cloned()
            .collect::<Vec<_>>();
        // Stable, so equal start times keep insertion order.
        elections.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(elections)
    }
}
