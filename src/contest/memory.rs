//! In-memory reference implementation of the store contracts.
//!
//! Backs the dev server and the test suites. Upserts recompute the
//! participant aggregate from the full rating set, which is exactly what
//! the remote store does authoritatively, so engine projections can be
//! checked against it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::contest::domain::{AdminStatus, Participant, ParticipantId, UserId};
use crate::contest::store::{ActivityStore, ParticipantStore, RatingStore, StoreError};
use crate::contest::voting::domain::{HistoryKey, LikeAction, Rating, RatingHistoryEntry};

#[derive(Default, Clone)]
pub struct InMemoryContestStore {
    participants: Arc<Mutex<HashMap<ParticipantId, Participant>>>,
    ratings: Arc<Mutex<HashMap<(UserId, ParticipantId), Rating>>>,
    rating_history: Arc<Mutex<Vec<RatingHistoryEntry>>>,
    likes: Arc<Mutex<Vec<LikeAction>>>,
}

impl InMemoryContestStore {
    pub fn insert_participant(&self, participant: Participant) -> Result<(), StoreError> {
        let mut guard = self.participants.lock().map_err(poisoned)?;
        if guard.contains_key(&participant.id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(participant.id.clone(), participant);
        Ok(())
    }

    pub fn insert_like(&self, like: LikeAction) -> Result<(), StoreError> {
        self.likes.lock().map_err(poisoned)?.push(like);
        Ok(())
    }

    fn recompute_aggregate(&self, participant: &ParticipantId) -> Result<(), StoreError> {
        let ratings = self.ratings.lock().map_err(poisoned)?;
        let values: Vec<f64> = ratings
            .values()
            .filter(|rating| &rating.participant == participant)
            .map(|rating| rating.value.as_f64())
            .collect();
        drop(ratings);

        let mut guard = self.participants.lock().map_err(poisoned)?;
        let record = guard.get_mut(participant).ok_or(StoreError::NotFound)?;
        record.total_votes = values.len() as u32;
        record.average_rating = if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        };
        Ok(())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Unavailable("store mutex poisoned".to_string())
}

impl RatingStore for InMemoryContestStore {
    fn user_rating(
        &self,
        voter: &UserId,
        participant: &ParticipantId,
    ) -> Result<Option<Rating>, StoreError> {
        let guard = self.ratings.lock().map_err(poisoned)?;
        Ok(guard.get(&(voter.clone(), participant.clone())).cloned())
    }

    fn upsert_rating(&self, rating: Rating) -> Result<Rating, StoreError> {
        let key = (rating.voter.clone(), rating.participant.clone());
        let participant = rating.participant.clone();
        self.ratings
            .lock()
            .map_err(poisoned)?
            .insert(key, rating.clone());
        self.recompute_aggregate(&participant)?;
        Ok(rating)
    }

    fn participant_ratings(&self, participant: &ParticipantId) -> Result<Vec<Rating>, StoreError> {
        let guard = self.ratings.lock().map_err(poisoned)?;
        let mut ratings: Vec<Rating> = guard
            .values()
            .filter(|rating| &rating.participant == participant)
            .cloned()
            .collect();
        ratings.sort_by(|a, b| a.voter.cmp(&b.voter));
        Ok(ratings)
    }

    fn append_rating_history(&self, entry: RatingHistoryEntry) -> Result<(), StoreError> {
        self.rating_history.lock().map_err(poisoned)?.push(entry);
        Ok(())
    }

    fn rating_history(&self, key: &HistoryKey) -> Result<Vec<RatingHistoryEntry>, StoreError> {
        let guard = self.rating_history.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .filter(|entry| &entry.key == key)
            .cloned()
            .collect())
    }
}

impl ParticipantStore for InMemoryContestStore {
    fn participant(&self, id: &ParticipantId) -> Result<Participant, StoreError> {
        let guard = self.participants.lock().map_err(poisoned)?;
        guard.get(id).cloned().ok_or(StoreError::NotFound)
    }

    fn participants(&self) -> Result<Vec<Participant>, StoreError> {
        let guard = self.participants.lock().map_err(poisoned)?;
        let mut all: Vec<Participant> = guard.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    fn update_status(
        &self,
        id: &ParticipantId,
        status: AdminStatus,
        status_history: serde_json::Value,
    ) -> Result<(), StoreError> {
        let mut guard = self.participants.lock().map_err(poisoned)?;
        let record = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        record.admin_status = status;
        record.status_history = status_history;
        Ok(())
    }

    fn set_deleted(
        &self,
        id: &ParticipantId,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let mut guard = self.participants.lock().map_err(poisoned)?;
        let record = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        record.deleted_at = deleted_at;
        Ok(())
    }
}

impl ActivityStore for InMemoryContestStore {
    fn voter_ratings(&self, voter: &UserId) -> Result<Vec<Rating>, StoreError> {
        let guard = self.ratings.lock().map_err(poisoned)?;
        let mut ratings: Vec<Rating> = guard
            .values()
            .filter(|rating| &rating.voter == voter)
            .cloned()
            .collect();
        ratings.sort_by(|a, b| a.rated_at.cmp(&b.rated_at));
        Ok(ratings)
    }

    fn voter_likes(&self, voter: &UserId) -> Result<Vec<LikeAction>, StoreError> {
        let guard = self.likes.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .filter(|like| &like.voter == voter)
            .cloned()
            .collect())
    }
}
