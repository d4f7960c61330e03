//! Live election results.
//!
//! The aggregator only reads: it never takes part in admitting a vote, and
//! the ledger snapshot it reads is taken after the call starts.

use std::sync::Arc;

use crate::directory::ElectionDirectory;
use crate::error::Result;
use crate::ledger::VoteLedger;
use crate::model::{
    api::results::{CandidateResult, ElectionResults},
    db::candidate::Candidate,
    mongodb::Id,
};

pub struct TallyAggregator {
    directory: Arc<dyn ElectionDirectory>,
    ledger: Arc<dyn VoteLedger>,
}

impl TallyAggregator {
    pub fn new(directory: Arc<dyn ElectionDirectory>, ledger: Arc<dyn VoteLedger>) -> Self {
        Self { directory, ledger }
    }

    /// Results for an election, or `None` if there is no such election.
    pub async fn compute_results(&self, election_id: Id) -> Result<Option<ElectionResults>> {
        let election = match self.directory.get_election(election_id).await? {
            Some(election) => election,
            None => return Ok(None),
        };
        let candidates = self.directory.candidates_for(election_id).await?;
        let mut counts = self.ledger.counts_by_candidate(election_id).await?;

        let tallies = candidates
            .into_iter()
            .map(|candidate| {
                let count = counts.remove(&candidate.id).unwrap_or(0);
                (candidate, count)
            })
            .collect::<Vec<_>>();
        if !counts.is_empty() {
            warn!(
                "Election {election_id} has votes for {} unlisted candidate(s); leaving them out",
                counts.len()
            );
        }

        let total_candidates = tallies.len();
        let (per_candidate, total_votes) = rank(tallies);
        Ok(Some(ElectionResults {
            election: election.into(),
            per_candidate,
            total_votes,
            total_candidates,
        }))
    }
}

/// Order candidates by vote count, highest first. `tallies` must be in
/// candidate creation order, which breaks ties.
fn rank(mut tallies: Vec<(Candidate, u64)>) -> (Vec<CandidateResult>, u64) {
    let total_votes = tallies.iter().map(|(_, count)| count).sum();
    // Stable sort.
    tallies.sort_by(|(_, a), (_, b)| b.cmp(a));
    let results = tallies
        .into_iter()
        .map(|(candidate, vote_count)| CandidateResult {
            candidate_id: candidate.id,
            name: candidate.candidate.name,
            party: candidate.candidate.party,
            profession: candidate.candidate.profession,
            education: candidate.candidate.education,
            vote_count,
            percentage: percentage(vote_count, total_votes),
        })
        .collect();
    (results, total_votes)
}

/// `count` as a percentage of `total`, rounded to two decimal places.
/// Zero when there are no votes at all.
pub fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 10_000.0).round() / 100.0
}
