use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for contest participants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub String);

/// Identifier wrapper for platform accounts (voters, contestants, admins).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Admin-controlled lifecycle state governing which week a participant
/// appears in. There is no enforced transition graph; any state may follow
/// any other via explicit admin selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdminStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "rejected")]
    Rejected,
    #[serde(rename = "pre next week")]
    PreNextWeek,
    #[serde(rename = "next week")]
    NextWeek,
    #[serde(rename = "next week on site")]
    NextWeekOnSite,
    #[serde(rename = "this week")]
    ThisWeek,
    #[serde(rename = "past")]
    Past,
}

impl AdminStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AdminStatus::Pending => "pending",
            AdminStatus::Rejected => "rejected",
            AdminStatus::PreNextWeek => "pre next week",
            AdminStatus::NextWeek => "next week",
            AdminStatus::NextWeekOnSite => "next week on site",
            AdminStatus::ThisWeek => "this week",
            AdminStatus::Past => "past",
        }
    }

    /// Parse a wire label. Unknown values are rejected, not coerced.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|status| status.label() == normalized)
    }

    /// Only the "this week" cohort accepts new votes.
    pub const fn is_open_cohort(self) -> bool {
        matches!(self, AdminStatus::ThisWeek)
    }

    /// States tied to a concrete contest week, labelled in the audit trail.
    pub const fn is_week_scoped(self) -> bool {
        matches!(
            self,
            AdminStatus::PreNextWeek
                | AdminStatus::NextWeek
                | AdminStatus::NextWeekOnSite
                | AdminStatus::ThisWeek
        )
    }

    pub fn ordered() -> [AdminStatus; 7] {
        [
            AdminStatus::Pending,
            AdminStatus::Rejected,
            AdminStatus::PreNextWeek,
            AdminStatus::NextWeek,
            AdminStatus::NextWeekOnSite,
            AdminStatus::ThisWeek,
            AdminStatus::Past,
        ]
    }
}

/// Who performed a lifecycle action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    Admin(UserId),
    Contestant,
    System,
}

/// Marker literal stored for actions taken by the contestant themselves.
pub const CONTESTANT_MARKER: &str = "user";

impl Actor {
    /// The marker persisted in the status history blob. Admin actions store
    /// the raw account id so later lookups can resolve a display name.
    pub fn marker(&self) -> String {
        match self {
            Actor::Admin(id) => id.0.clone(),
            Actor::Contestant => CONTESTANT_MARKER.to_string(),
            Actor::System => "system".to_string(),
        }
    }
}

/// Store-confirmed rating rollup for one participant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingAggregate {
    pub average: f64,
    pub votes: u32,
}

impl RatingAggregate {
    pub const fn empty() -> Self {
        Self {
            average: 0.0,
            votes: 0,
        }
    }
}

/// A contest entrant for a given submission cycle.
///
/// `average_rating` and `total_votes` are owned by the rating engine and
/// the store's authoritative recomputation; status changes never touch
/// them. Soft deletion is a marker, never a hard removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub owner: UserId,
    pub name: String,
    pub location: Option<String>,
    pub admin_status: AdminStatus,
    pub average_rating: f64,
    pub total_votes: u32,
    pub final_rank: Option<u32>,
    pub status_history: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub submitted_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub is_sample: bool,
}

impl Participant {
    pub fn aggregate(&self) -> RatingAggregate {
        RatingAggregate {
            average: self.average_rating,
            votes: self.total_votes,
        }
    }

    /// Sample entrants and soft-deleted rows never accept votes, open
    /// cohort or not.
    pub fn is_open_for_voting(&self) -> bool {
        self.admin_status.is_open_cohort() && !self.is_sample && self.deleted_at.is_none()
    }
}

/// One status transition as persisted in the modern blob encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryRecord {
    pub status: String,
    pub at: DateTime<Utc>,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// One normalized audit entry, timestamps already converted to the
/// requesting admin's display offset and actors resolved to labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusHistoryEntry {
    pub status: String,
    pub at: DateTime<FixedOffset>,
    pub actor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
