use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use crate::config::VotingConfig;
use crate::contest::domain::{AdminStatus, Participant, ParticipantId, UserId};
use crate::contest::memory::InMemoryContestStore;
use crate::contest::store::{ParticipantStore, RatingStore, StoreError};
use crate::contest::voting::domain::{HistoryKey, Rating, RatingHistoryEntry};
use crate::contest::voting::engine::RatingEngine;

pub(super) fn ts(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 6, 7, 12, minute, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn participant(id: &str, status: AdminStatus) -> Participant {
    Participant {
        id: ParticipantId(id.to_string()),
        owner: UserId(format!("owner-{id}")),
        name: format!("Entrant {id}"),
        location: Some("Riga".to_string()),
        admin_status: status,
        average_rating: 0.0,
        total_votes: 0,
        final_rank: None,
        status_history: json!([]),
        created_at: ts(0),
        submitted_at: ts(0),
        deleted_at: None,
        is_sample: false,
    }
}

pub(super) fn open_store() -> Arc<InMemoryContestStore> {
    let store = Arc::new(InMemoryContestStore::default());
    store
        .insert_participant(participant("p1", AdminStatus::ThisWeek))
        .expect("seed open participant");
    store
        .insert_participant(participant("closed", AdminStatus::NextWeek))
        .expect("seed closed participant");
    store
}

pub(super) fn engine(store: Arc<InMemoryContestStore>) -> RatingEngine<InMemoryContestStore> {
    RatingEngine::new(store, VotingConfig::default())
}

pub(super) fn voter(id: &str) -> UserId {
    UserId(id.to_string())
}

pub(super) fn open_id() -> ParticipantId {
    ParticipantId("p1".to_string())
}

/// Delegating store whose rating writes always fail, for rollback tests.
pub(super) struct FailingWriteStore {
    pub(super) inner: Arc<InMemoryContestStore>,
}

impl RatingStore for FailingWriteStore {
    fn user_rating(
        &self,
        voter: &UserId,
        participant: &ParticipantId,
    ) -> Result<Option<Rating>, StoreError> {
        self.inner.user_rating(voter, participant)
    }

    fn upsert_rating(&self, _rating: Rating) -> Result<Rating, StoreError> {
        Err(StoreError::Unavailable("rating write refused".to_string()))
    }

    fn participant_ratings(&self, participant: &ParticipantId) -> Result<Vec<Rating>, StoreError> {
        self.inner.participant_ratings(participant)
    }

    fn append_rating_history(&self, entry: RatingHistoryEntry) -> Result<(), StoreError> {
        self.inner.append_rating_history(entry)
    }

    fn rating_history(&self, key: &HistoryKey) -> Result<Vec<RatingHistoryEntry>, StoreError> {
        self.inner.rating_history(key)
    }
}

impl ParticipantStore for FailingWriteStore {
    fn participant(&self, id: &ParticipantId) -> Result<Participant, StoreError> {
        self.inner.participant(id)
    }

    fn participants(&self) -> Result<Vec<Participant>, StoreError> {
        self.inner.participants()
    }

    fn update_status(
        &self,
        id: &ParticipantId,
        status: AdminStatus,
        status_history: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.inner.update_status(id, status, status_history)
    }

    fn set_deleted(
        &self,
        id: &ParticipantId,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.inner.set_deleted(id, deleted_at)
    }
}

pub(super) fn failing_engine(
    inner: Arc<InMemoryContestStore>,
) -> RatingEngine<FailingWriteStore> {
    RatingEngine::new(
        Arc::new(FailingWriteStore { inner }),
        VotingConfig::default(),
    )
}
