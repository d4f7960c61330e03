use rocket::{
    http::Status,
    response::status::Created,
    serde::json::Json,
    Route, State,
};

use crate::admission::{Admission, AdmissionController, Rejection};
use crate::error::{Error, Result};
use crate::identity::RequestContext;
use crate::model::{
    api::vote::{CastConfirmation, CastRequest, VoteStatusResponse},
    mongodb::Id,
};

pub fn routes() -> Vec<Route> {
    routes![cast_vote, vote_status]
}

#[derive(rocket::Responder)]
enum CastResponse {
    Committed(Created<Json<CastConfirmation>>),
    Rejected(Rejection),
}

#[post("/elections/<election_id>/votes", data = "<request>", format = "json")]
async fn cast_vote(
    ctx: RequestContext,
    election_id: Id,
    request: Json<CastRequest>,
    controller: &State<AdmissionController>,
) -> Result<CastResponse> {
    let admission = controller
        .cast_vote(&ctx, election_id, request.candidate_id)
        .await?;

    Ok(match admission {
        Admission::Committed(committed) => {
            let location = uri!(vote_status(election_id)).to_string();
            CastResponse::Committed(Created::new(location).body(Json(committed.into())))
        }
        Admission::Rejected(rejection) => CastResponse::Rejected(rejection),
    })
}

#[get("/elections/<election_id>/votes/status")]
async fn vote_status(
    ctx: RequestContext,
    election_id: Id,
    controller: &State<AdmissionController>,
) -> Result<Json<VoteStatusResponse>> {
    let status = controller
        .vote_status(&ctx, election_id)
        .await?
        .ok_or_else(|| {
            Error::Status(
                Status::Unauthorized,
                Rejection::Unauthenticated.message().to_string(),
            )
        })?;
    Ok(Json(status.into()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, SubsecRound, Utc};
    use mongodb::Database;
    use rocket::{
        futures::future::join_all,
        http::{ContentType, Status},
        local::asynchronous::{Client, LocalResponse},
        serde::json::{json, serde_json},
    };

    use crate::api::testing::Backend;
    use crate::clock::FixedTimeSource;
    use crate::config::Config;
    use crate::directory::MemoryDirectory;
    use crate::identity::bearer_header;
    use crate::ledger::StalledLedger;
    use crate::model::{
        api::{auth::AuthToken, vote::RejectionBody},
        db::{
            candidate::{Candidate, NewCandidate},
            election::{Election, NewElection},
        },
        mongodb::Coll,
    };
    use crate::Storage;

    use super::*;

    fn body(candidate_id: Id) -> String {
        json!({ "candidateId": candidate_id.to_string() }).to_string()
    }

    async fn rejection(response: LocalResponse<'_>) -> RejectionBody {
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    fn seed(backend: &Backend) -> (Election, Candidate, Candidate) {
        let election = backend
            .directory
            .insert_election(NewElection::current_example());
        let c1 = backend
            .directory
            .insert_candidate(NewCandidate::example1(election.id));
        let c2 = backend
            .directory
            .insert_candidate(NewCandidate::example2(election.id));
        (election, c1, c2)
    }

    #[rocket::async_test]
    async fn cast_then_conflict() {
        let backend = Backend::new().await;
        let (election, c1, c2) = seed(&backend);
        let voter = Id::new();

        let response = backend
            .client
            .post(uri!(cast_vote(election.id)))
            .header(ContentType::JSON)
            .cookie(backend.voter_cookie(voter))
            .body(body(c1.id))
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        let location = response.headers().get_one("Location").map(str::to_string);
        assert_eq!(
            location,
            Some(uri!(vote_status(election.id)).to_string())
        );
        let confirmation: CastConfirmation =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(confirmation.vote.candidate_id, c1.id);
        assert_eq!(confirmation.vote.election_id, election.id);
        assert_eq!(
            confirmation.message,
            format!("Successfully voted for {} in {}", c1.name, election.title)
        );

        let response = backend
            .client
            .post(uri!(cast_vote(election.id)))
            .header(ContentType::JSON)
            .cookie(backend.voter_cookie(voter))
            .body(body(c2.id))
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());
        let body = rejection(response).await;
        assert_eq!(body.reason, Rejection::AlreadyVoted);
        assert_eq!(body.message, "You have already voted in this election");

        assert_eq!(backend.ledger.len(), 1);
    }

    #[rocket::async_test]
    async fn bearer_header_is_accepted() {
        let backend = Backend::new().await;
        let (election, c1, _) = seed(&backend);
        let jwt = AuthToken::voter(Id::new())
            .into_jwt(backend.config().jwt_secret(), backend.config().auth_ttl())
            .unwrap();

        let response = backend
            .client
            .post(uri!(cast_vote(election.id)))
            .header(ContentType::JSON)
            .header(bearer_header(&jwt))
            .body(body(c1.id))
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
    }

    #[rocket::async_test]
    async fn rejections_map_to_statuses() {
        let backend = Backend::new().await;
        let (election, c1, _) = seed(&backend);
        let elsewhere = backend
            .directory
            .insert_election(NewElection::current_example());
        let outsider = backend
            .directory
            .insert_candidate(NewCandidate::example1(elsewhere.id));
        let cookie = || backend.voter_cookie(Id::new());

        // No credential.
        let response = backend
            .client
            .post(uri!(cast_vote(election.id)))
            .header(ContentType::JSON)
            .body(body(c1.id))
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(rejection(response).await.reason, Rejection::Unauthenticated);

        // Unknown election.
        let response = backend
            .client
            .post(uri!(cast_vote(Id::new())))
            .header(ContentType::JSON)
            .cookie(cookie())
            .body(body(c1.id))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
        assert_eq!(rejection(response).await.reason, Rejection::ElectionNotFound);

        // Candidate standing elsewhere.
        let response = backend
            .client
            .post(uri!(cast_vote(election.id)))
            .header(ContentType::JSON)
            .cookie(cookie())
            .body(body(outsider.id))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
        assert_eq!(rejection(response).await.reason, Rejection::CandidateNotFound);

        // After the window.
        backend
            .clock
            .set(election.end_time + Duration::milliseconds(1));
        let response = backend
            .client
            .post(uri!(cast_vote(election.id)))
            .header(ContentType::JSON)
            .cookie(cookie())
            .body(body(c1.id))
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());
        assert_eq!(rejection(response).await.reason, Rejection::ElectionClosed);

        assert!(backend.ledger.is_empty());
    }

    #[rocket::async_test]
    async fn stalled_commit_is_unavailable() {
        let directory = Arc::new(MemoryDirectory::new());
        let election = directory.insert_election(NewElection::current_example());
        let candidate = directory.insert_candidate(NewCandidate::example1(election.id));
        let storage = Storage {
            directory,
            ledger: Arc::new(StalledLedger),
        };
        let clock = Arc::new(FixedTimeSource::new(Utc::now().trunc_subsecs(3)));
        let client = Client::tracked(crate::rocket_with_storage(storage, clock))
            .await
            .unwrap();
        let config = client.rocket().state::<Config>().unwrap();

        let response = client
            .post(uri!(cast_vote(election.id)))
            .header(ContentType::JSON)
            .cookie(AuthToken::voter(Id::new()).into_cookie(config))
            .body(body(candidate.id))
            .dispatch()
            .await;
        assert_eq!(Status::ServiceUnavailable, response.status());
    }

    #[rocket::async_test]
    async fn malformed_body_is_unprocessable() {
        let backend = Backend::new().await;
        let (election, _, _) = seed(&backend);

        let response = backend
            .client
            .post(uri!(cast_vote(election.id)))
            .header(ContentType::JSON)
            .cookie(backend.voter_cookie(Id::new()))
            .body(json!({"candidateId": "not-an-id"}).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::UnprocessableEntity, response.status());
        assert!(backend.ledger.is_empty());
    }

    #[rocket::async_test]
    async fn status_follows_the_vote() {
        let backend = Backend::new().await;
        let (election, _, c2) = seed(&backend);
        let voter = Id::new();

        let response = backend
            .client
            .get(uri!(vote_status(election.id)))
            .cookie(backend.voter_cookie(voter))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let before: VoteStatusResponse =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(
            before,
            VoteStatusResponse {
                has_voted: false,
                vote: None
            }
        );

        backend
            .client
            .post(uri!(cast_vote(election.id)))
            .header(ContentType::JSON)
            .cookie(backend.voter_cookie(voter))
            .body(body(c2.id))
            .dispatch()
            .await;

        let response = backend
            .client
            .get(uri!(vote_status(election.id)))
            .cookie(backend.voter_cookie(voter))
            .dispatch()
            .await;
        let after: VoteStatusResponse =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(after.has_voted);
        assert_eq!(after.vote.map(|v| v.candidate_id), Some(c2.id));

        let response = backend
            .client
            .get(uri!(vote_status(election.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[backend_test]
    async fn one_commit_per_voter_through_mongo(client: Client, db: Database) {
        let election = Election::from_new(NewElection::current_example());
        let candidate = Candidate::from_new(NewCandidate::example1(election.id));
        Coll::<Election>::from_db(&db)
            .insert_one(&election, None)
            .await
            .unwrap();
        Coll::<Candidate>::from_db(&db)
            .insert_one(&candidate, None)
            .await
            .unwrap();

        let config = client.rocket().state::<Config>().unwrap();
        let voter = Id::new();
        let attempts = (0..8).map(|_| {
            client
                .post(uri!(cast_vote(election.id)))
                .header(ContentType::JSON)
                .cookie(AuthToken::voter(voter).into_cookie(config))
                .body(body(candidate.id))
                .dispatch()
        });
        let statuses = join_all(attempts)
            .await
            .iter()
            .map(LocalResponse::status)
            .collect::<Vec<_>>();

        assert_eq!(statuses.iter().filter(|s| **s == Status::Created).count(), 1);
        assert_eq!(statuses.iter().filter(|s| **s == Status::Conflict).count(), 7);
    }
}
