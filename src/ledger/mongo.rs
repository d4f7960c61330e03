use std::collections::HashMap;

use mongodb::{
    bson::{doc, Bson, Document},
    options::CountOptions,
    Database,
};
use rocket::futures::TryStreamExt;

use crate::model::{
    db::vote::{NewVote, Vote, VoteCore},
    mongodb::{is_duplicate_key_error, Coll, Id},
};

use super::{CommitOutcome, LedgerError, VoteLedger};

/// A ledger backed by the `votes` collection.
///
/// Uniqueness is enforced by MongoDB itself through the unique
/// `{voter_id, election_id}` index created by
/// [`ensure_indexes_exist`](crate::model::mongodb::ensure_indexes_exist).
#[derive(Clone)]
pub struct MongoLedger {
    votes: Coll<Vote>,
}

impl MongoLedger {
    pub fn new(db: &Database) -> Self {
        Self {
            votes: Coll::from_db(db),
        }
    }
}

#[rocket::async_trait]
impl VoteLedger for MongoLedger {
    async fn try_commit(&self, vote: NewVote) -> Result<CommitOutcome, LedgerError> {
        // The ID is chosen here rather than by the server, so that if the
        // driver retries an insert that had in fact succeeded, the resulting
        // duplicate can be recognised as our own write.
        let vote = Vote {
            id: Id::new(),
            vote,
        };

        let err = match self.votes.insert_one(&vote, None).await {
            Ok(_) => return Ok(CommitOutcome::Committed(vote)),
            Err(err) => err,
        };
        if !is_duplicate_key_error(&err) {
            return Err(err.into());
        }

        let existing = self
            .votes
            .find_one(VoteCore::key_filter(vote.voter_id, vote.election_id), None)
            .await?;
        match existing {
            Some(existing) if existing.id == vote.id => {
                debug!("Vote {} was committed by a retried insert", vote.id);
                Ok(CommitOutcome::Committed(existing))
            }
            Some(_) => Ok(CommitOutcome::AlreadyVoted),
            None => Err(LedgerError::Corrupt(format!(
                "duplicate key reported for voter {} in election {}, but no vote found",
                vote.voter_id, vote.election_id
            ))),
        }
    }

    async fn counts_by_candidate(&self, election_id: Id) -> Result<HashMap<Id, u64>, LedgerError> {
        let pipeline = [
            doc! { "$match": { "election_id": election_id } },
            doc! { "$group": { "_id": "$candidate_id", "count": { "$sum": 1 } } },
        ];
        let groups: Vec<Document> = self
            .votes
            .aggregate(pipeline, None)
            .await?
            .try_collect()
            .await?;

        groups
            .into_iter()
            .map(|group| {
                let candidate_id = group
                    .get_object_id("_id")
                    .map_err(|e| LedgerError::Corrupt(format!("vote group without candidate: {e}")))?;
                let count = match group.get("count") {
                    Some(Bson::Int32(n)) => u64::try_from(*n).ok(),
                    Some(Bson::Int64(n)) => u64::try_from(*n).ok(),
                    _ => None,
                }
                .ok_or_else(|| {
                    LedgerError::Corrupt(format!("bad vote count for candidate {candidate_id}"))
                })?;
                Ok((Id::from(candidate_id), count))
            })
            .collect()
    }

    async fn has_voted(&self, voter_id: Id, election_id: Id) -> Result<bool, LedgerError> {
        let options = CountOptions::builder().limit(1).build();
        let count = self
            .votes
            .count_documents(VoteCore::key_filter(voter_id, election_id), options)
            .await?;
        Ok(count > 0)
    }

    async fn find_vote(&self, voter_id: Id, election_id: Id) -> Result<Option<Vote>, LedgerError> {
        let vote = self
            .votes
            .find_one(VoteCore::key_filter(voter_id, election_id), None)
            .await?;
        Ok(vote)
    }
}
