//! Backend for the weekly photo contest platform.
//!
//! The interesting parts live under [`contest`]: the rating engine with its
//! one-vote-per-user invariant, the per-card voting state machine, the
//! admin status lifecycle, and the reconstruction of the schema-drifted
//! status history blob.

pub mod config;
pub mod contest;
pub mod error;
pub mod telemetry;
