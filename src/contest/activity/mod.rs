//! Per-voter rating rollups for administrative inspection.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::contest::domain::{Participant, ParticipantId, UserId};
use crate::contest::store::{ActivityStore, ParticipantStore, RatingStore, StoreError};
use crate::contest::voting::domain::{HistoryKey, Rating, RatingAction, RatingValue};

/// One step of a voter's rating history for a participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<RatingValue>,
    pub new_value: RatingValue,
    pub action: RatingAction,
    pub at: DateTime<Utc>,
}

/// Everything an admin sees about one voter on one participant.
///
/// `detailed` is false when no history rows survive for the voter and the
/// rollup degraded to a single entry synthesized from the active rating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoterActivity {
    pub voter: UserId,
    pub latest: RatingValue,
    pub history: Vec<RatingChange>,
    pub detailed: bool,
}

/// A like correlated back to a participant through the content-ref
/// naming convention.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantLike {
    pub participant: ParticipantId,
    pub participant_name: String,
    pub liked_at: DateTime<Utc>,
}

/// A voter's activity against other participants, fetched on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossActivity {
    pub ratings: Vec<Rating>,
    pub likes: Vec<ParticipantLike>,
}

/// Extract the participant name from a `photo:<name>:<index>` reference.
/// Names may themselves contain colons, so the index splits from the right.
pub fn parse_photo_ref(content_ref: &str) -> Option<&str> {
    let rest = content_ref.strip_prefix("photo:")?;
    let (name, index) = rest.rsplit_once(':')?;
    if name.is_empty() || index.parse::<u32>().is_err() {
        return None;
    }
    Some(name)
}

pub struct ActivityAggregator<S> {
    store: Arc<S>,
}

impl<S> ActivityAggregator<S>
where
    S: RatingStore + ParticipantStore + ActivityStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Group the participant's rating history by voter. Voters holding an
    /// active rating with no surviving history rows still appear, with a
    /// single synthesized entry instead of a full trail.
    pub fn participant_activity(
        &self,
        participant: &Participant,
    ) -> Result<Vec<VoterActivity>, StoreError> {
        let mut rows = self
            .store
            .rating_history(&HistoryKey::Participant(participant.id.clone()))?;
        if rows.is_empty() {
            rows = self
                .store
                .rating_history(&HistoryKey::Owner(participant.owner.clone()))?;
        }

        let mut by_voter: BTreeMap<UserId, Vec<RatingChange>> = BTreeMap::new();
        for row in rows {
            by_voter
                .entry(row.voter.clone())
                .or_default()
                .push(RatingChange {
                    old_value: row.old_value,
                    new_value: row.new_value,
                    action: row.action,
                    at: row.recorded_at,
                });
        }

        let mut activities: Vec<VoterActivity> = by_voter
            .into_iter()
            .filter_map(|(voter, mut history)| {
                history.sort_by(|a, b| a.at.cmp(&b.at));
                let latest = history.last().map(|change| change.new_value)?;
                Some(VoterActivity {
                    voter,
                    latest,
                    history,
                    detailed: true,
                })
            })
            .collect();

        for rating in self.store.participant_ratings(&participant.id)? {
            if activities
                .iter()
                .any(|activity| activity.voter == rating.voter)
            {
                continue;
            }
            activities.push(VoterActivity {
                voter: rating.voter.clone(),
                latest: rating.value,
                history: vec![RatingChange {
                    old_value: None,
                    new_value: rating.value,
                    action: RatingAction::Create,
                    at: rating.rated_at,
                }],
                detailed: false,
            });
        }

        activities.sort_by(|a, b| a.voter.cmp(&b.voter));
        Ok(activities)
    }

    /// The voter's activity against other participants: their remaining
    /// ratings plus likes resolved through the content-ref convention.
    /// Unresolvable references are skipped, not errors.
    pub fn voter_cross_activity(
        &self,
        voter: &UserId,
        exclude: &ParticipantId,
    ) -> Result<CrossActivity, StoreError> {
        let ratings = self
            .store
            .voter_ratings(voter)?
            .into_iter()
            .filter(|rating| &rating.participant != exclude)
            .collect();

        let participants = self.store.participants()?;
        let by_name: BTreeMap<&str, &Participant> = participants
            .iter()
            .map(|participant| (participant.name.as_str(), participant))
            .collect();

        let mut likes = Vec::new();
        for like in self.store.voter_likes(voter)? {
            let Some(name) = parse_photo_ref(&like.content_ref) else {
                debug!(content_ref = %like.content_ref, "skipping unparseable like reference");
                continue;
            };
            let Some(participant) = by_name.get(name) else {
                debug!(name, "like does not match any participant");
                continue;
            };
            if &participant.id == exclude {
                continue;
            }
            likes.push(ParticipantLike {
                participant: participant.id.clone(),
                participant_name: participant.name.clone(),
                liked_at: like.liked_at,
            });
        }

        Ok(CrossActivity { ratings, likes })
    }
}
