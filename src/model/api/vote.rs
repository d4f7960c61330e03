use chrono::{DateTime, Utc};
use rocket::{
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use serde::{Deserialize, Serialize};

use crate::admission::{CommittedVote, Rejection, VoteStatus};
use crate::model::{
    api::election::CandidateSummary,
    db::vote::Vote,
    mongodb::{hex_id, Id},
};

/// Body of a vote submission. The election comes from the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastRequest {
    #[serde(with = "hex_id")]
    pub candidate_id: Id,
}

/// A committed vote, as shown to the voter who cast it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceipt {
    #[serde(with = "hex_id")]
    pub id: Id,
    #[serde(with = "hex_id")]
    pub election_id: Id,
    #[serde(with = "hex_id")]
    pub candidate_id: Id,
    pub cast_at: DateTime<Utc>,
}

impl From<Vote> for VoteReceipt {
    fn from(vote: Vote) -> Self {
        Self {
            id: vote.id,
            election_id: vote.vote.election_id,
            candidate_id: vote.vote.candidate_id,
            cast_at: vote.vote.cast_at,
        }
    }
}

/// Response to a committed vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastConfirmation {
    pub vote: VoteReceipt,
    pub candidate: CandidateSummary,
    pub message: String,
}

impl From<CommittedVote> for CastConfirmation {
    fn from(committed: CommittedVote) -> Self {
        let message = format!(
            "Successfully voted for {} in {}",
            committed.candidate.name, committed.election.title
        );
        Self {
            vote: committed.vote.into(),
            candidate: committed.candidate.into(),
            message,
        }
    }
}

/// Body of a rejected vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionBody {
    pub reason: Rejection,
    pub message: String,
}

impl From<Rejection> for RejectionBody {
    fn from(reason: Rejection) -> Self {
        Self {
            reason,
            message: reason.message().to_string(),
        }
    }
}

/// Rejections are ordinary outcomes, so they carry a body unlike [`crate::error::Error`].
impl<'r, 'o: 'r> Responder<'r, 'o> for Rejection {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        (self.status(), Json(RejectionBody::from(self))).respond_to(req)
    }
}

/// The requesting voter's status in an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatusResponse {
    pub has_voted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote: Option<VoteReceipt>,
}

impl From<VoteStatus> for VoteStatusResponse {
    fn from(status: VoteStatus) -> Self {
        Self {
            has_voted: status.has_voted,
            vote: status.vote.map(VoteReceipt::from),
        }
    }
}
