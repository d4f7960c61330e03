use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    db::{candidate::Candidate, election::Election},
    mongodb::{hex_id, Id},
};

/// A summary of an election, as shown in listings and results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSummary {
    /// Election unique ID.
    #[serde(with = "hex_id")]
    pub id: Id,
    /// Election title.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// First instant at which votes are accepted.
    pub start_time: DateTime<Utc>,
    /// Last instant at which votes are accepted.
    pub end_time: DateTime<Utc>,
}

impl From<Election> for ElectionSummary {
    fn from(election: Election) -> Self {
        Self {
            id: election.id,
            title: election.election.title,
            description: election.election.description,
            start_time: election.election.start_time,
            end_time: election.election.end_time,
        }
    }
}

/// A candidate standing in an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSummary {
    #[serde(with = "hex_id")]
    pub id: Id,
    #[serde(with = "hex_id")]
    pub election_id: Id,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profession: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
}

impl From<Candidate> for CandidateSummary {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id,
            election_id: candidate.candidate.election_id,
            name: candidate.candidate.name,
            party: candidate.candidate.party,
            profession: candidate.candidate.profession,
            education: candidate.candidate.education,
        }
    }
}
