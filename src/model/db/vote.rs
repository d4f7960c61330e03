use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime, Document};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core vote data, as stored in the database.
///
/// At most one vote exists per `(voter_id, election_id)`; the votes
/// collection carries a unique index on that pair. Votes are never
/// updated or deleted once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    /// Opaque voter identity, as resolved from the request credential.
    pub voter_id: Id,
    /// Foreign Key election ID.
    pub election_id: Id,
    /// Foreign Key candidate ID.
    pub candidate_id: Id,
    /// Server time at which the vote was admitted.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

impl VoteCore {
    /// Filter matching the (unique) vote of a voter in an election.
    pub fn key_filter(voter_id: Id, election_id: Id) -> Document {
        doc! {
            "voter_id": voter_id,
            "election_id": election_id,
        }
    }
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A committed vote from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}
