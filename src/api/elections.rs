use rocket::{serde::json::Json, Route, State};

use crate::admission::AdmissionController;
use crate::error::{Error, Result};
use crate::model::{
    api::election::{CandidateSummary, ElectionSummary},
    mongodb::Id,
};
use crate::Storage;

pub fn routes() -> Vec<Route> {
    routes![elections, election, election_candidates]
}

/// Elections, most recently started first. `active=true` keeps only those
/// accepting votes right now.
#[get("/elections?<active>")]
async fn elections(
    active: Option<bool>,
    storage: &State<Storage>,
    controller: &State<AdmissionController>,
) -> Result<Json<Vec<ElectionSummary>>> {
    let active_at = active.unwrap_or(false).then(|| controller.now());
    let elections = storage.directory.list_elections(active_at).await?;
    Ok(Json(elections.into_iter().map(Into::into).collect()))
}

#[get("/elections/<election_id>")]
async fn election(election_id: Id, storage: &State<Storage>) -> Result<Json<ElectionSummary>> {
    let election = storage
        .directory
        .get_election(election_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election with ID '{election_id}'")))?;
    Ok(Json(election.into()))
}

#[get("/elections/<election_id>/candidates")]
async fn election_candidates(
    election_id: Id,
    storage: &State<Storage>,
) -> Result<Json<Vec<CandidateSummary>>> {
    if storage.directory.get_election(election_id).await?.is_none() {
        return Err(Error::not_found(format!("Election with ID '{election_id}'")));
    }
    let candidates = storage.directory.candidates_for(election_id).await?;
    Ok(Json(candidates.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use rocket::{http::Status, serde::json::serde_json};

    use crate::api::testing::Backend;
    use crate::model::db::{candidate::NewCandidate, election::NewElection};

    use super::*;

    #[rocket::async_test]
    async fn list_all_or_only_active() {
        let backend = Backend::new().await;
        let current = backend
            .directory
            .insert_election(NewElection::current_example());
        let future = backend
            .directory
            .insert_election(NewElection::future_example());
        let finished = backend
            .directory
            .insert_election(NewElection::finished_example());

        let response = backend
            .client
            .get(uri!(elections(Some(true))))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let active: Vec<ElectionSummary> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(active, vec![current.clone().into()]);

        let response = backend
            .client
            .get(uri!(elections(_)))
            .dispatch()
            .await;
        let all: Vec<ElectionSummary> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        let ids = all.iter().map(|e| e.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![future.id, current.id, finished.id]);
    }

    #[rocket::async_test]
    async fn candidates_in_creation_order() {
        let backend = Backend::new().await;
        let election = backend
            .directory
            .insert_election(NewElection::current_example());
        let first = backend
            .directory
            .insert_candidate(NewCandidate::example1(election.id));
        let second = backend
            .directory
            .insert_candidate(NewCandidate::example2(election.id));

        let response = backend
            .client
            .get(uri!(election_candidates(election.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let candidates: Vec<CandidateSummary> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(candidates, vec![first.into(), second.into()]);

        let response = backend
            .client
            .get(uri!(election_candidates(Id::new())))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[rocket::async_test]
    async fn single_election_by_id() {
        let backend = Backend::new().await;
        let election = backend
            .directory
            .insert_election(NewElection::current_example());

        let response = backend
            .client
            .get(uri!(election(election.id)))
            .dispatch()
            .await;
        let summary: ElectionSummary =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(summary.title, election.title);

        let response = backend
            .client
            .get(uri!(election(Id::new())))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }
}
