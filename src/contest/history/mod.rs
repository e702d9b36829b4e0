//! Reconstruction of a participant's audit trail.
//!
//! The stored blob is not canonical; this module is the compatibility
//! layer that turns any of its encodings into one chronological sequence.
//! Reconstruction is pure: the same blob and supporting data always
//! produce the same ordered output.

pub mod blob;

use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use serde_json::Value;

use crate::config::VotingConfig;
use crate::contest::domain::{StatusHistoryEntry, CONTESTANT_MARKER};

use blob::{classify, RawHistoryEvent};

/// Display status for entries synthesized from a resubmission.
pub const RESUBMITTED_STATUS: &str = "pending (re-submitted)";

/// Display status for the synthesized creation entry.
pub const CREATED_STATUS: &str = "created";

const CONTESTANT_LABEL: &str = "Contestant";
const SYSTEM_LABEL: &str = "System";

/// Largest supported display offset, fourteen hours either way.
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

/// Lookup from stored actor markers to display names or emails.
#[derive(Debug, Default, Clone)]
pub struct ActorDirectory {
    names: HashMap<String, String>,
}

impl ActorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, marker: impl Into<String>, display: impl Into<String>) {
        self.names.insert(marker.into(), display.into());
    }

    /// The literal contestant marker short-circuits; unknown markers fall
    /// back to the generic system label.
    pub fn resolve(&self, marker: Option<&str>) -> String {
        match marker {
            Some(CONTESTANT_MARKER) => CONTESTANT_LABEL.to_string(),
            Some(id) => self
                .names
                .get(id)
                .cloned()
                .unwrap_or_else(|| SYSTEM_LABEL.to_string()),
            None => SYSTEM_LABEL.to_string(),
        }
    }
}

/// Knobs for one reconstruction run.
#[derive(Debug, Clone)]
pub struct ReconstructSettings {
    pub resubmission_threshold: Duration,
    pub display_offset: FixedOffset,
}

impl ReconstructSettings {
    pub fn from_config(config: &VotingConfig, offset_minutes: i32) -> Self {
        Self {
            resubmission_threshold: config.resubmission_threshold(),
            display_offset: display_offset(offset_minutes),
        }
    }
}

impl Default for ReconstructSettings {
    fn default() -> Self {
        Self {
            resubmission_threshold: VotingConfig::default().resubmission_threshold(),
            display_offset: Utc.fix(),
        }
    }
}

/// Clamped minutes-east-of-UTC to a valid offset.
pub fn display_offset(minutes: i32) -> FixedOffset {
    let clamped = minutes.clamp(-MAX_OFFSET_MINUTES, MAX_OFFSET_MINUTES);
    FixedOffset::east_opt(clamped * 60).unwrap_or_else(|| Utc.fix())
}

#[derive(Debug, Clone)]
pub struct ReconstructedHistory {
    pub entries: Vec<StatusHistoryEntry>,
    pub anomalies: usize,
}

/// Rebuild the chronological audit trail, newest first.
pub fn reconstruct(
    status_history: &Value,
    created_at: DateTime<Utc>,
    submitted_at: DateTime<Utc>,
    directory: &ActorDirectory,
    settings: &ReconstructSettings,
) -> ReconstructedHistory {
    let classified = classify(status_history);
    let offset = settings.display_offset;

    let mut entries: Vec<StatusHistoryEntry> = classified
        .events
        .into_iter()
        .map(|event| normalize(event, directory, offset))
        .collect();

    entries.push(StatusHistoryEntry {
        status: CREATED_STATUS.to_string(),
        at: created_at.with_timezone(&offset),
        actor: CONTESTANT_LABEL.to_string(),
        week: None,
        reason: None,
    });

    // A submission timestamp well past creation means the application
    // was re-submitted before structured logging captured it.
    let already_recorded = entries.iter().any(|entry| entry.status == RESUBMITTED_STATUS);
    if submitted_at - created_at > settings.resubmission_threshold && !already_recorded {
        entries.push(StatusHistoryEntry {
            status: RESUBMITTED_STATUS.to_string(),
            at: submitted_at.with_timezone(&offset),
            actor: CONTESTANT_LABEL.to_string(),
            week: None,
            reason: None,
        });
    }

    entries.sort_by(|a, b| b.at.cmp(&a.at));

    ReconstructedHistory {
        entries,
        anomalies: classified.anomalies,
    }
}

fn normalize(
    event: RawHistoryEvent,
    directory: &ActorDirectory,
    offset: FixedOffset,
) -> StatusHistoryEntry {
    match event {
        RawHistoryEvent::Structured(record) => StatusHistoryEntry {
            status: record.status,
            at: record.at.with_timezone(&offset),
            actor: directory.resolve(Some(&record.actor)),
            week: record.week,
            reason: record.reason,
        },
        RawHistoryEvent::DatedChange {
            at,
            old_status,
            new_status,
            actor,
            week,
        } => {
            let old_label = old_status.as_deref().unwrap_or("unknown").to_string();
            let status = new_status
                .or(old_status)
                .unwrap_or_else(|| "unknown".to_string());
            StatusHistoryEntry {
                reason: Some(format!("Changed from {old_label} to {status}")),
                status,
                at: at.with_timezone(&offset),
                actor: directory.resolve(actor.as_deref()),
                week,
            }
        }
        RawHistoryEvent::Resubmission { at, actor } => StatusHistoryEntry {
            status: RESUBMITTED_STATUS.to_string(),
            at: at.with_timezone(&offset),
            actor: match actor {
                Some(marker) => directory.resolve(Some(&marker)),
                None => CONTESTANT_LABEL.to_string(),
            },
            week: None,
            reason: None,
        },
        RawHistoryEvent::NamedStatus {
            status,
            at,
            actor,
            week,
        } => StatusHistoryEntry {
            status,
            at: at.with_timezone(&offset),
            actor: directory.resolve(actor.as_deref()),
            week,
            reason: None,
        },
    }
}
