use serde::{Deserialize, Serialize};

use crate::model::{
    api::election::ElectionSummary,
    mongodb::{hex_id, Id},
};

/// One candidate's line in the results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResult {
    #[serde(with = "hex_id")]
    pub candidate_id: Id,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profession: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
    pub vote_count: u64,
    /// Share of `total_votes`, in percent to two decimal places.
    pub percentage: f64,
}

/// Live results for an election.
///
/// `per_candidate` is ordered by vote count descending, then by the order in
/// which candidates were created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionResults {
    pub election: ElectionSummary,
    pub per_candidate: Vec<CandidateResult>,
    pub total_votes: u64,
    pub total_candidates: usize,
}
