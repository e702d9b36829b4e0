use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::contest::domain::{ParticipantId, RatingAggregate, UserId};

/// A validated rating on the platform's 1-10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RatingValue(u8);

impl RatingValue {
    pub fn try_new(raw: u8, bounds: RangeInclusive<u8>) -> Option<Self> {
        bounds.contains(&raw).then_some(Self(raw))
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    pub const fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

/// One voter's current evaluation of one participant. At most one active
/// row exists per (voter, participant) pair; revotes mutate in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub voter: UserId,
    pub participant: ParticipantId,
    pub value: RatingValue,
    pub rated_at: DateTime<Utc>,
}

/// What a history row records about a rating write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatingAction {
    #[serde(rename = "create")]
    Create,
    #[serde(rename = "update")]
    Update,
}

impl RatingAction {
    pub const fn label(self) -> &'static str {
        match self {
            RatingAction::Create => "create",
            RatingAction::Update => "update",
        }
    }
}

/// Rating history rows are keyed by participant id; rows that predate
/// participant-keyed logging are keyed by the owning account instead.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HistoryKey {
    Participant(ParticipantId),
    Owner(UserId),
}

/// Append-only record of one rating change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingHistoryEntry {
    pub voter: UserId,
    pub key: HistoryKey,
    pub old_value: Option<RatingValue>,
    pub new_value: RatingValue,
    pub action: RatingAction,
    pub recorded_at: DateTime<Utc>,
}

/// What the engine hands back after a successful cast so callers can
/// render immediately without a confirmatory read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingOutcome {
    pub aggregate: RatingAggregate,
    pub previous: Option<RatingValue>,
    pub action: RatingAction,
}

/// A "like" against uploaded content, referenced by the structured
/// `photo:<participant-name>:<index>` convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikeAction {
    pub voter: UserId,
    pub content_ref: String,
    pub liked_at: DateTime<Utc>,
}
