//! Administrative surface: status transitions, audit trail inspection,
//! voter rollups, and soft delete/restore.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::config::VotingConfig;
use crate::contest::activity::{ActivityAggregator, CrossActivity, VoterActivity};
use crate::contest::domain::{Actor, AdminStatus, ParticipantId, UserId};
use crate::contest::history::{reconstruct, ActorDirectory, ReconstructSettings, ReconstructedHistory};
use crate::contest::lifecycle::{
    LifecycleError, ReasonCatalog, StatusChange, StatusLifecycleManager,
};
use crate::contest::store::{ActivityStore, ParticipantStore, RatingStore, StoreError};

/// Facade composing the lifecycle manager, the reconstructor, and the
/// activity aggregator for the admin endpoints.
pub struct AdminService<S> {
    manager: StatusLifecycleManager<S>,
    activity: ActivityAggregator<S>,
    store: Arc<S>,
    directory: ActorDirectory,
    config: VotingConfig,
}

impl<S> AdminService<S>
where
    S: ParticipantStore + RatingStore + ActivityStore,
{
    pub fn new(
        store: Arc<S>,
        reasons: ReasonCatalog,
        directory: ActorDirectory,
        config: VotingConfig,
    ) -> Self {
        Self {
            manager: StatusLifecycleManager::new(store.clone(), reasons),
            activity: ActivityAggregator::new(store.clone()),
            store,
            directory,
            config,
        }
    }

    pub fn manager(&self) -> &StatusLifecycleManager<S> {
        &self.manager
    }

    pub fn set_status(
        &self,
        id: &ParticipantId,
        target: &str,
        change: StatusChange,
    ) -> Result<AdminStatus, LifecycleError> {
        self.manager.set_status(id, target, change)
    }

    /// Normalized audit trail, timestamps shifted to the requesting
    /// admin's display offset.
    pub fn status_history(
        &self,
        id: &ParticipantId,
        offset_minutes: i32,
    ) -> Result<ReconstructedHistory, LifecycleError> {
        let participant = self.store.participant(id)?;
        let settings = ReconstructSettings::from_config(&self.config, offset_minutes);
        Ok(reconstruct(
            &participant.status_history,
            participant.created_at,
            participant.submitted_at,
            &self.directory,
            &settings,
        ))
    }

    pub fn voters(&self, id: &ParticipantId) -> Result<Vec<VoterActivity>, LifecycleError> {
        let participant = self.store.participant(id)?;
        Ok(self.activity.participant_activity(&participant)?)
    }

    pub fn voter_activity(
        &self,
        id: &ParticipantId,
        voter: &UserId,
    ) -> Result<CrossActivity, LifecycleError> {
        Ok(self.activity.voter_cross_activity(voter, id)?)
    }

    pub fn set_deleted(&self, id: &ParticipantId, deleted: bool) -> Result<(), LifecycleError> {
        if deleted {
            self.manager.soft_delete(id, Utc::now())
        } else {
            self.manager.restore(id)
        }
    }
}

/// Router builder for the admin surface.
pub fn admin_router<S>(service: Arc<AdminService<S>>) -> Router
where
    S: ParticipantStore + RatingStore + ActivityStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/admin/participants/:id/status",
            put(set_status_handler::<S>),
        )
        .route(
            "/api/v1/admin/participants/:id/history",
            get(history_handler::<S>),
        )
        .route(
            "/api/v1/admin/participants/:id/voters",
            get(voters_handler::<S>),
        )
        .route(
            "/api/v1/admin/participants/:id/voters/:voter/activity",
            get(voter_activity_handler::<S>),
        )
        .route(
            "/api/v1/admin/participants/:id/deleted",
            post(deleted_handler::<S>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SetStatusRequest {
    status: String,
    actor: Option<String>,
    #[serde(default)]
    reason_codes: Vec<String>,
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryQuery {
    offset_minutes: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeletedRequest {
    deleted: bool,
}

pub(crate) async fn set_status_handler<S>(
    State(service): State<Arc<AdminService<S>>>,
    Path(id): Path<String>,
    axum::Json(request): axum::Json<SetStatusRequest>,
) -> Response
where
    S: ParticipantStore + RatingStore + ActivityStore + 'static,
{
    let actor = match request.actor {
        Some(id) => Actor::Admin(UserId(id)),
        None => Actor::System,
    };
    let mut change = StatusChange::by(actor, Utc::now());
    change.reason_codes = request.reason_codes;
    change.note = request.note;

    match service.set_status(&ParticipantId(id), &request.status, change) {
        Ok(status) => {
            let payload = json!({ "status": status.label() });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => lifecycle_error_response(err),
    }
}

pub(crate) async fn history_handler<S>(
    State(service): State<Arc<AdminService<S>>>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response
where
    S: ParticipantStore + RatingStore + ActivityStore + 'static,
{
    let offset = query.offset_minutes.unwrap_or(0);
    match service.status_history(&ParticipantId(id), offset) {
        Ok(history) => {
            let payload = json!({
                "entries": history.entries,
                "anomalies": history.anomalies,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => lifecycle_error_response(err),
    }
}

pub(crate) async fn voters_handler<S>(
    State(service): State<Arc<AdminService<S>>>,
    Path(id): Path<String>,
) -> Response
where
    S: ParticipantStore + RatingStore + ActivityStore + 'static,
{
    match service.voters(&ParticipantId(id)) {
        Ok(voters) => (StatusCode::OK, axum::Json(voters)).into_response(),
        Err(err) => lifecycle_error_response(err),
    }
}

pub(crate) async fn voter_activity_handler<S>(
    State(service): State<Arc<AdminService<S>>>,
    Path((id, voter)): Path<(String, String)>,
) -> Response
where
    S: ParticipantStore + RatingStore + ActivityStore + 'static,
{
    match service.voter_activity(&ParticipantId(id), &UserId(voter)) {
        Ok(activity) => (StatusCode::OK, axum::Json(activity)).into_response(),
        Err(err) => lifecycle_error_response(err),
    }
}

pub(crate) async fn deleted_handler<S>(
    State(service): State<Arc<AdminService<S>>>,
    Path(id): Path<String>,
    axum::Json(request): axum::Json<DeletedRequest>,
) -> Response
where
    S: ParticipantStore + RatingStore + ActivityStore + 'static,
{
    match service.set_deleted(&ParticipantId(id), request.deleted) {
        Ok(()) => {
            let payload = json!({ "deleted": request.deleted });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => lifecycle_error_response(err),
    }
}

fn lifecycle_error_response(err: LifecycleError) -> Response {
    let status = match &err {
        LifecycleError::UnknownStatus(_)
        | LifecycleError::IncompleteRejection
        | LifecycleError::UnknownReasonCode(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LifecycleError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        LifecycleError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
