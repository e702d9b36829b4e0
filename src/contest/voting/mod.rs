//! Rating casting, optimistic aggregate recomputation, and the per-card
//! voting state machine.

pub mod card;
pub mod domain;
pub mod engine;
pub mod router;

#[cfg(test)]
mod tests;

pub use card::{CardAccess, VoteCard, VoteCardView, VoteState};
pub use domain::{
    HistoryKey, LikeAction, Rating, RatingAction, RatingHistoryEntry, RatingOutcome, RatingValue,
};
pub use engine::{project, RatingEngine, VoteError};
pub use router::voting_router;
