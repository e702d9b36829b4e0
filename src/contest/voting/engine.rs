use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::VotingConfig;
use crate::contest::domain::{ParticipantId, RatingAggregate, UserId};
use crate::contest::store::{ParticipantStore, RatingStore, StoreError};

use super::card::VoteCard;
use super::domain::{
    HistoryKey, Rating, RatingAction, RatingHistoryEntry, RatingOutcome, RatingValue,
};

/// Error raised on the voting path.
///
/// `Write` means the idempotent upsert (or its history append) failed
/// after validation passed; retrying is safe because the write is keyed
/// on the (voter, participant) pair.
#[derive(Debug, thiserror::Error)]
pub enum VoteError {
    #[error("no signed-in voter")]
    Unauthenticated,
    #[error("voting is closed for this participant")]
    VotingClosed,
    #[error("rating {0} is outside the allowed scale")]
    InvalidRating(u8),
    #[error("no rating in progress (card state {0})")]
    NotVoting(&'static str),
    #[error("rating write failed: {0}")]
    Write(#[source] StoreError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Recompute the aggregate after one voter's write without the full
/// rating set: subtract the voter's own prior contribution (0 if none),
/// add the new one. First votes and revotes go through the same formula.
pub fn project(
    current: RatingAggregate,
    previous: Option<RatingValue>,
    value: RatingValue,
) -> RatingAggregate {
    let votes = if previous.is_some() {
        current.votes
    } else {
        current.votes + 1
    };
    let sum = current.average * current.votes as f64
        - previous.map(RatingValue::as_f64).unwrap_or(0.0)
        + value.as_f64();
    let average = if votes > 0 { sum / votes as f64 } else { 0.0 };
    RatingAggregate { average, votes }
}

/// Owns the one-vote-per-user invariant: every write funnels through the
/// store's upsert keyed on (voter, participant), and every write appends
/// a rating history row.
pub struct RatingEngine<S> {
    store: Arc<S>,
    config: VotingConfig,
}

impl<S> RatingEngine<S>
where
    S: RatingStore + ParticipantStore,
{
    pub fn new(store: Arc<S>, config: VotingConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &VotingConfig {
        &self.config
    }

    /// Cast a first vote or update an existing one. Validation runs in
    /// order (identity, scale, cohort) before any write; the returned
    /// outcome carries the locally recomputed aggregate so callers can
    /// render without a confirmatory read.
    pub fn cast_or_update(
        &self,
        voter: Option<&UserId>,
        participant_id: &ParticipantId,
        raw_value: u8,
        now: DateTime<Utc>,
    ) -> Result<RatingOutcome, VoteError> {
        let voter = voter.ok_or(VoteError::Unauthenticated)?;

        // Out-of-scale values are rejected before any store call.
        let value = RatingValue::try_new(raw_value, self.config.rating_bounds())
            .ok_or(VoteError::InvalidRating(raw_value))?;

        let participant = self.store.participant(participant_id)?;
        if !participant.is_open_for_voting() {
            return Err(VoteError::VotingClosed);
        }

        let previous = self.store.user_rating(voter, participant_id)?;
        let previous_value = previous.as_ref().map(|rating| rating.value);

        let aggregate = project(participant.aggregate(), previous_value, value);

        self.store
            .upsert_rating(Rating {
                voter: voter.clone(),
                participant: participant_id.clone(),
                value,
                rated_at: now,
            })
            .map_err(VoteError::Write)?;

        let action = if previous_value.is_some() {
            RatingAction::Update
        } else {
            RatingAction::Create
        };

        self.store
            .append_rating_history(RatingHistoryEntry {
                voter: voter.clone(),
                key: HistoryKey::Participant(participant_id.clone()),
                old_value: previous_value,
                new_value: value,
                action,
                recorded_at: now,
            })
            .map_err(VoteError::Write)?;

        debug!(
            participant = %participant_id.0,
            action = action.label(),
            votes = aggregate.votes,
            "rating recorded"
        );

        Ok(RatingOutcome {
            aggregate,
            previous: previous_value,
            action,
        })
    }

    /// The voter's own active rating, read by the stable pair key so
    /// every component observing the same pair sees the same value.
    pub fn current_user_rating(
        &self,
        voter: &UserId,
        participant_id: &ParticipantId,
    ) -> Result<Option<Rating>, VoteError> {
        Ok(self.store.user_rating(voter, participant_id)?)
    }

    /// Store-confirmed aggregate for one participant.
    pub fn aggregate(&self, participant_id: &ParticipantId) -> Result<RatingAggregate, VoteError> {
        Ok(self.store.participant(participant_id)?.aggregate())
    }

    /// Build the per-card view state for one viewer from store truth.
    pub fn card(
        &self,
        participant_id: &ParticipantId,
        voter: Option<&UserId>,
    ) -> Result<VoteCard, VoteError> {
        let participant = self.store.participant(participant_id)?;
        let own = match voter {
            Some(voter) => self.store.user_rating(voter, participant_id)?,
            None => None,
        };
        Ok(VoteCard::open(
            &participant,
            own.as_ref(),
            voter.is_some(),
            &self.config,
        ))
    }
}
