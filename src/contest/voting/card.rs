use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::VotingConfig;
use crate::contest::domain::{Participant, ParticipantId, RatingAggregate, UserId};
use crate::contest::store::{ParticipantStore, RatingStore};

use super::domain::{Rating, RatingValue};
use super::engine::{project, RatingEngine, VoteError};

/// Per-card voting state for one (viewer, participant) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VoteState {
    #[serde(rename = "unvoted")]
    Unvoted,
    #[serde(rename = "voting")]
    Voting,
    #[serde(rename = "thank_you")]
    ThankYou,
    #[serde(rename = "settled")]
    Settled,
    #[serde(rename = "editing")]
    Editing,
}

impl VoteState {
    pub const fn label(self) -> &'static str {
        match self {
            VoteState::Unvoted => "unvoted",
            VoteState::Voting => "voting",
            VoteState::ThankYou => "thank_you",
            VoteState::Settled => "settled",
            VoteState::Editing => "editing",
        }
    }
}

/// Whether this card accepts votes at all. Closed cohorts, sample
/// entrants, and soft-deleted participants are read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CardAccess {
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "read_only")]
    ReadOnly,
}

impl CardAccess {
    pub const fn label(self) -> &'static str {
        match self {
            CardAccess::Open => "open",
            CardAccess::ReadOnly => "read_only",
        }
    }
}

/// The card tracks two aggregates: `displayed` moves optimistically the
/// moment a vote is submitted, `confirmed` only after the store write
/// settles. A failed write is a real transition back to `confirmed`.
#[derive(Debug, Clone)]
pub struct VoteCard {
    state: VoteState,
    access: CardAccess,
    authenticated: bool,
    displayed: RatingAggregate,
    confirmed: RatingAggregate,
    own_rating: Option<RatingValue>,
    thanks_until: Option<DateTime<Utc>>,
    config: VotingConfig,
}

impl VoteCard {
    pub fn open(
        participant: &Participant,
        own: Option<&Rating>,
        authenticated: bool,
        config: &VotingConfig,
    ) -> Self {
        let aggregate = participant.aggregate();
        let own_rating = own.map(|rating| rating.value);
        Self {
            state: if own_rating.is_some() {
                VoteState::Settled
            } else {
                VoteState::Unvoted
            },
            access: if participant.is_open_for_voting() {
                CardAccess::Open
            } else {
                CardAccess::ReadOnly
            },
            authenticated,
            displayed: aggregate,
            confirmed: aggregate,
            own_rating,
            thanks_until: None,
            config: config.clone(),
        }
    }

    pub fn state(&self) -> VoteState {
        self.state
    }

    pub fn access(&self) -> CardAccess {
        self.access
    }

    pub fn displayed(&self) -> RatingAggregate {
        self.displayed
    }

    pub fn confirmed(&self) -> RatingAggregate {
        self.confirmed
    }

    pub fn own_rating(&self) -> Option<RatingValue> {
        self.own_rating
    }

    fn ensure_open(&self) -> Result<(), VoteError> {
        if self.access == CardAccess::ReadOnly {
            return Err(VoteError::VotingClosed);
        }
        if !self.authenticated {
            return Err(VoteError::Unauthenticated);
        }
        Ok(())
    }

    /// `Unvoted -> Voting`. Unauthenticated viewers are diverted to
    /// sign-in with no state change.
    pub fn begin_voting(&mut self) -> Result<(), VoteError> {
        self.ensure_open()?;
        match self.state {
            VoteState::Unvoted => {
                self.state = VoteState::Voting;
                Ok(())
            }
            other => Err(VoteError::NotVoting(other.label())),
        }
    }

    /// `Settled -> Editing`, the revote re-entry.
    pub fn begin_edit(&mut self) -> Result<(), VoteError> {
        self.ensure_open()?;
        match self.state {
            VoteState::Settled => {
                self.state = VoteState::Editing;
                Ok(())
            }
            other => Err(VoteError::NotVoting(other.label())),
        }
    }

    /// Submit the active rating. The displayed aggregate moves before the
    /// write; on success it is reconciled to the engine's outcome and the
    /// card enters `ThankYou`, on failure it rolls back to the last
    /// confirmed values and the card stays where it was.
    pub fn submit<S>(
        &mut self,
        engine: &RatingEngine<S>,
        voter: Option<&UserId>,
        participant: &ParticipantId,
        raw_value: u8,
        now: DateTime<Utc>,
    ) -> Result<(), VoteError>
    where
        S: RatingStore + ParticipantStore,
    {
        self.ensure_open()?;
        if !matches!(self.state, VoteState::Voting | VoteState::Editing) {
            return Err(VoteError::NotVoting(self.state.label()));
        }

        // Out-of-scale values are rejected before anything moves.
        let value = RatingValue::try_new(raw_value, self.config.rating_bounds())
            .ok_or(VoteError::InvalidRating(raw_value))?;

        self.displayed = project(self.confirmed, self.own_rating, value);

        match engine.cast_or_update(voter, participant, raw_value, now) {
            Ok(outcome) => {
                self.confirmed = outcome.aggregate;
                self.displayed = outcome.aggregate;
                self.own_rating = Some(value);
                self.state = VoteState::ThankYou;
                self.thanks_until = Some(now + self.config.thank_you_delay());
                Ok(())
            }
            Err(err) => {
                self.displayed = self.confirmed;
                self.thanks_until = None;
                Err(err)
            }
        }
    }

    /// Settle an expired thank-you. The expiry deadline lives in the card
    /// state, so tearing the card down cannot leave a timer behind.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if let Some(until) = self.thanks_until {
            if self.state == VoteState::ThankYou && now >= until {
                self.state = VoteState::Settled;
                self.thanks_until = None;
            }
        }
    }

    pub fn view(&self) -> VoteCardView {
        VoteCardView {
            state: self.state.label(),
            access: self.access.label(),
            average_rating: self.displayed.average,
            total_votes: self.displayed.votes,
            current_user_rating: self.own_rating.map(RatingValue::get),
        }
    }
}

/// Sanitized card snapshot exposed to the surrounding UI.
#[derive(Debug, Clone, Serialize)]
pub struct VoteCardView {
    pub state: &'static str,
    pub access: &'static str,
    pub average_rating: f64,
    pub total_votes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_user_rating: Option<u8>,
}
