use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core candidate data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    /// Foreign Key election ID. A candidate stands in exactly one election.
    pub election_id: Id,
    /// Display name.
    pub name: String,
    /// Party affiliation, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profession: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
///
/// Sorting by ID gives the order in which candidates were added to their
/// election, to within a second (see [`Id::new`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Candidate {
    /// Attach a fresh ID to a new candidate.
    pub fn from_new(candidate: NewCandidate) -> Self {
        Self {
            id: Id::new(),
            candidate,
        }
    }

    /// Does this candidate stand in the given election?
    pub fn stands_in(&self, election_id: Id) -> bool {
        self.election_id == election_id
    }
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}
