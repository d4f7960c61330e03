use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, DateTime as BsonDateTime},
    options::FindOptions,
    Database,
};
use rocket::futures::TryStreamExt;

use crate::model::{
    db::{candidate::Candidate, election::Election},
    mongodb::{Coll, Id},
};

use super::{DirectoryError, ElectionDirectory};

/// Reads the `elections` and `candidates` collections.
#[derive(Clone)]
pub struct MongoDirectory {
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
}

impl MongoDirectory {
    pub fn new(db: &Database) -> Self {
        Self {
            elections: Coll::from_db(db),
            candidates: Coll::from_db(db),
        }
    }
}

#[rocket::async_trait]
impl ElectionDirectory for MongoDirectory {
    async fn get_election(&self, election_id: Id) -> Result<Option<Election>, DirectoryError> {
        Ok(self.elections.find_one(election_id.as_doc(), None).await?)
    }

    async fn get_candidate(&self, candidate_id: Id) -> Result<Option<Candidate>, DirectoryError> {
        Ok(self.candidates.find_one(candidate_id.as_doc(), None).await?)
    }

    async fn candidates_for(&self, election_id: Id) -> Result<Vec<Candidate>, DirectoryError> {
        // Creation order, to the second. Candidates added by different
        // processes within the same second may come out in either order.
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        let candidates = self
            .candidates
            .find(doc! {"election_id": election_id}, options)
            .await?
            .try_collect()
            .await?;
        Ok(candidates)
    }

    async fn list_elections(
        &self,
        active_at: Option<DateTime<Utc>>,
    ) -> Result<Vec<Election>, DirectoryError> {
        let filter = active_at.map(|now| {
            let now = BsonDateTime::from_chrono(now);
            doc! {
                "start_time": {"$lte": now},
                "end_time": {"$gte": now},
            }
        });
        let options = FindOptions::builder()
            .sort(doc! {"start_time": -1, "_id": 1})
            .build();
        let elections = self
            .elections
            .find(filter, options)
            .await?
            .try_collect()
            .await?;
        Ok(elections)
    }
}
