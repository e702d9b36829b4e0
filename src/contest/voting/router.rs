use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::contest::domain::{ParticipantId, UserId};
use crate::contest::store::{ParticipantStore, RatingStore, StoreError};

use super::engine::{RatingEngine, VoteError};

/// Router builder for the public voting surface.
pub fn voting_router<S>(engine: Arc<RatingEngine<S>>) -> Router
where
    S: RatingStore + ParticipantStore + 'static,
{
    Router::new()
        .route("/api/v1/participants/:id/card", get(card_handler::<S>))
        .route("/api/v1/participants/:id/rating", post(rate_handler::<S>))
        .with_state(engine)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CardQuery {
    voter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RateRequest {
    voter: Option<String>,
    value: u8,
}

pub(crate) async fn card_handler<S>(
    State(engine): State<Arc<RatingEngine<S>>>,
    Path(id): Path<String>,
    Query(query): Query<CardQuery>,
) -> Response
where
    S: RatingStore + ParticipantStore + 'static,
{
    let participant = ParticipantId(id);
    let voter = query.voter.map(UserId);

    match engine.card(&participant, voter.as_ref()) {
        Ok(card) => (StatusCode::OK, axum::Json(card.view())).into_response(),
        Err(err) => vote_error_response(err),
    }
}

pub(crate) async fn rate_handler<S>(
    State(engine): State<Arc<RatingEngine<S>>>,
    Path(id): Path<String>,
    axum::Json(request): axum::Json<RateRequest>,
) -> Response
where
    S: RatingStore + ParticipantStore + 'static,
{
    let participant = ParticipantId(id);
    let voter = request.voter.map(UserId);

    match engine.cast_or_update(voter.as_ref(), &participant, request.value, Utc::now()) {
        Ok(outcome) => {
            let payload = json!({
                "average_rating": outcome.aggregate.average,
                "total_votes": outcome.aggregate.votes,
                "action": outcome.action.label(),
            });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(err) => vote_error_response(err),
    }
}

/// One mapping for every voting error so both endpoints stay consistent.
/// `Write` failures advertise that a retry is safe.
fn vote_error_response(err: VoteError) -> Response {
    let (status, retryable, sign_in) = match &err {
        VoteError::Unauthenticated => (StatusCode::UNAUTHORIZED, false, true),
        VoteError::VotingClosed | VoteError::NotVoting(_) => (StatusCode::CONFLICT, false, false),
        VoteError::InvalidRating(_) => (StatusCode::UNPROCESSABLE_ENTITY, false, false),
        VoteError::Write(_) => (StatusCode::SERVICE_UNAVAILABLE, true, false),
        VoteError::Store(StoreError::NotFound) => (StatusCode::NOT_FOUND, false, false),
        VoteError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, false, false),
    };

    let mut payload = json!({ "error": err.to_string() });
    if retryable {
        payload["retryable"] = json!(true);
    }
    if sign_in {
        payload["sign_in_required"] = json!(true);
    }
    (status, axum::Json(payload)).into_response()
}
