use rocket::{serde::json::Json, Route, State};

use crate::error::{Error, Result};
use crate::model::{api::results::ElectionResults, mongodb::Id};
use crate::tally::TallyAggregator;

pub fn routes() -> Vec<Route> {
    routes![election_results]
}

#[get("/elections/<election_id>/results")]
async fn election_results(
    election_id: Id,
    aggregator: &State<TallyAggregator>,
) -> Result<Json<ElectionResults>> {
    aggregator
        .compute_results(election_id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found(format!("Election with ID '{election_id}'")))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rocket::{
        http::{ContentType, Status},
        serde::json::{json, serde_json},
    };

    use crate::api::testing::Backend;
    use crate::clock::TimeSource;
    use crate::model::db::{candidate::NewCandidate, election::NewElection};

    use super::*;

    #[rocket::async_test]
    async fn results_follow_committed_votes() {
        let backend = Backend::new().await;
        let election = backend.directory.insert_election(NewElection {
            title: "Mayor".to_string(),
            description: String::new(),
            start_time: backend.clock.now(),
            end_time: backend.clock.now() + Duration::hours(1),
        });
        let c1 = backend
            .directory
            .insert_candidate(NewCandidate::example1(election.id));
        let c2 = backend
            .directory
            .insert_candidate(NewCandidate::example2(election.id));
        let (v1, v2) = (Id::new(), Id::new());

        for (offset, voter, candidate, expected) in [
            (1, v1, c1.id, Status::Created),
            (2, v1, c2.id, Status::Conflict),
            (3, v2, c1.id, Status::Created),
        ] {
            backend
                .clock
                .set(election.start_time + Duration::seconds(offset));
            let response = backend
                .client
                .post(format!("/elections/{}/votes", election.id))
                .header(ContentType::JSON)
                .cookie(backend.voter_cookie(voter))
                .body(json!({ "candidateId": candidate.to_string() }).to_string())
                .dispatch()
                .await;
            assert_eq!(expected, response.status());
        }

        let response = backend
            .client
            .get(uri!(election_results(election.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let results: ElectionResults =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();

        assert_eq!(results.election.id, election.id);
        assert_eq!(results.total_votes, 2);
        assert_eq!(results.total_candidates, 2);
        let lines = results
            .per_candidate
            .iter()
            .map(|r| (r.candidate_id, r.vote_count, r.percentage))
            .collect::<Vec<_>>();
        assert_eq!(lines, vec![(c1.id, 2, 100.0), (c2.id, 0, 0.0)]);
    }

    #[rocket::async_test]
    async fn results_use_camel_case() {
        let backend = Backend::new().await;
        let election = backend
            .directory
            .insert_election(NewElection::current_example());
        backend
            .directory
            .insert_candidate(NewCandidate::example1(election.id));

        let response = backend
            .client
            .get(uri!(election_results(election.id)))
            .dispatch()
            .await;
        let raw: serde_json::Value =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(raw["totalVotes"], json!(0));
        assert_eq!(raw["perCandidate"][0]["voteCount"], json!(0));
        assert_eq!(raw["perCandidate"][0]["name"], json!("Chris Riches"));
        assert_eq!(raw["perCandidate"][0]["profession"], json!("Software engineer"));
        assert_eq!(raw["perCandidate"][0]["education"], json!("MEng Computer Science"));
    }

    #[rocket::async_test]
    async fn unknown_election_is_not_found() {
        let backend = Backend::new().await;
        let response = backend
            .client
            .get(uri!(election_results(Id::new())))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }
}
