//! Typed contracts for the remote relational store.
//!
//! The engine and lifecycle manager only ever talk to these traits; the
//! store performs the authoritative aggregate recomputation and the
//! in-memory implementation mirrors that so tests can compare engine
//! projections against store truth.

use chrono::{DateTime, Utc};

use crate::contest::domain::{AdminStatus, Participant, ParticipantId, UserId};
use crate::contest::voting::domain::{HistoryKey, LikeAction, Rating, RatingHistoryEntry};

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Rating reads and writes. `upsert_rating` is keyed on the
/// (voter, participant) pair: a second write with a different value
/// updates the existing row rather than creating a duplicate.
pub trait RatingStore: Send + Sync {
    fn user_rating(
        &self,
        voter: &UserId,
        participant: &ParticipantId,
    ) -> Result<Option<Rating>, StoreError>;

    fn upsert_rating(&self, rating: Rating) -> Result<Rating, StoreError>;

    fn participant_ratings(&self, participant: &ParticipantId) -> Result<Vec<Rating>, StoreError>;

    fn append_rating_history(&self, entry: RatingHistoryEntry) -> Result<(), StoreError>;

    fn rating_history(&self, key: &HistoryKey) -> Result<Vec<RatingHistoryEntry>, StoreError>;
}

/// Participant reads plus the two lifecycle writes. `update_status`
/// persists the new status together with the already-appended history
/// blob in one call; it must leave the rating aggregate fields untouched.
pub trait ParticipantStore: Send + Sync {
    fn participant(&self, id: &ParticipantId) -> Result<Participant, StoreError>;

    fn participants(&self) -> Result<Vec<Participant>, StoreError>;

    fn update_status(
        &self,
        id: &ParticipantId,
        status: AdminStatus,
        status_history: serde_json::Value,
    ) -> Result<(), StoreError>;

    fn set_deleted(
        &self,
        id: &ParticipantId,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;
}

/// Cross-participant reads used by the voter activity rollup.
pub trait ActivityStore: Send + Sync {
    fn voter_ratings(&self, voter: &UserId) -> Result<Vec<Rating>, StoreError>;

    fn voter_likes(&self, voter: &UserId) -> Result<Vec<LikeAction>, StoreError>;
}
