//! Admin-controlled participant status lifecycle.
//!
//! Transitions are permissive (any enumerated state may follow any
//! other, including reassertion of the current one) but every accepted
//! change appends an audit record, and a rejection without a structured
//! reason or note is refused outright.

pub mod reasons;

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use tracing::info;

use crate::contest::domain::{Actor, AdminStatus, ParticipantId, StatusHistoryRecord};
use crate::contest::history::blob::append_record;
use crate::contest::store::{ParticipantStore, StoreError};

pub use reasons::{ReasonCatalog, ReasonEntry};

/// Error raised by the lifecycle manager.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("unknown participant status '{0}'")]
    UnknownStatus(String),
    #[error("rejection requires at least one reason code or a note")]
    IncompleteRejection,
    #[error("unknown rejection reason code '{0}'")]
    UnknownReasonCode(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Payload describing one admin-triggered transition.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub actor: Actor,
    pub at: DateTime<Utc>,
    pub reason_codes: Vec<String>,
    pub note: Option<String>,
}

impl StatusChange {
    pub fn by(actor: Actor, at: DateTime<Utc>) -> Self {
        Self {
            actor,
            at,
            reason_codes: Vec::new(),
            note: None,
        }
    }

    fn trimmed_note(&self) -> Option<&str> {
        self.note
            .as_deref()
            .map(str::trim)
            .filter(|note| !note.is_empty())
    }
}

/// ISO week label attached to week-scoped statuses in the audit trail.
pub fn week_label(at: DateTime<Utc>) -> String {
    let iso = at.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}

pub struct StatusLifecycleManager<S> {
    store: Arc<S>,
    reasons: ReasonCatalog,
}

impl<S> StatusLifecycleManager<S>
where
    S: ParticipantStore,
{
    pub fn new(store: Arc<S>, reasons: ReasonCatalog) -> Self {
        Self { store, reasons }
    }

    pub fn reasons(&self) -> &ReasonCatalog {
        &self.reasons
    }

    /// Swap in a revised reason dictionary snapshot.
    pub fn adopt_reasons(&mut self, reasons: ReasonCatalog) {
        self.reasons = reasons;
    }

    /// Apply an admin-selected status. The target is wire input and must
    /// parse to a known state; the audit record is appended in the same
    /// store write that persists the status, and rating aggregates are
    /// never part of that write.
    pub fn set_status(
        &self,
        id: &ParticipantId,
        target: &str,
        change: StatusChange,
    ) -> Result<AdminStatus, LifecycleError> {
        let status = AdminStatus::parse(target)
            .ok_or_else(|| LifecycleError::UnknownStatus(target.to_string()))?;

        let reason = if status == AdminStatus::Rejected {
            Some(self.rejection_reason(&change)?)
        } else {
            change.trimmed_note().map(str::to_string)
        };

        let participant = self.store.participant(id)?;
        let record = StatusHistoryRecord {
            status: status.label().to_string(),
            at: change.at,
            actor: change.actor.marker(),
            week: status.is_week_scoped().then(|| week_label(change.at)),
            reason,
        };

        let mut history = participant.status_history.clone();
        append_record(&mut history, &record, Some(participant.admin_status.label()));
        self.store.update_status(id, status, history)?;

        info!(
            participant = %id.0,
            from = participant.admin_status.label(),
            to = status.label(),
            "participant status changed"
        );
        Ok(status)
    }

    /// Mark a participant soft-deleted. Status and aggregates survive.
    pub fn soft_delete(
        &self,
        id: &ParticipantId,
        at: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        self.store.set_deleted(id, Some(at))?;
        info!(participant = %id.0, "participant soft-deleted");
        Ok(())
    }

    /// Clear the soft-delete marker. The participant resumes with the
    /// status it already had.
    pub fn restore(&self, id: &ParticipantId) -> Result<(), LifecycleError> {
        self.store.set_deleted(id, None)?;
        info!(participant = %id.0, "participant restored");
        Ok(())
    }

    fn rejection_reason(&self, change: &StatusChange) -> Result<String, LifecycleError> {
        let note = change.trimmed_note();
        if change.reason_codes.is_empty() && note.is_none() {
            return Err(LifecycleError::IncompleteRejection);
        }

        let mut labels = Vec::with_capacity(change.reason_codes.len());
        for code in &change.reason_codes {
            let label = self
                .reasons
                .label_for(code)
                .ok_or_else(|| LifecycleError::UnknownReasonCode(code.clone()))?;
            labels.push(label.to_string());
        }

        let mut text = labels.join(", ");
        if let Some(note) = note {
            if !text.is_empty() {
                text.push_str("; ");
            }
            text.push_str(note);
        }
        Ok(text)
    }
}
