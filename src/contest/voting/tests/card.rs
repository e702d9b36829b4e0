use super::common::*;
use crate::config::VotingConfig;
use crate::contest::domain::AdminStatus;
use crate::contest::store::RatingStore;
use crate::contest::voting::card::{CardAccess, VoteState};
use crate::contest::voting::engine::VoteError;

#[test]
fn cards_open_unvoted_or_settled_from_store_truth() {
    let store = open_store();
    let engine = engine(store.clone());

    let fresh = engine
        .card(&open_id(), Some(&voter("a")))
        .expect("card builds");
    assert_eq!(fresh.state(), VoteState::Unvoted);
    assert_eq!(fresh.access(), CardAccess::Open);

    engine
        .cast_or_update(Some(&voter("a")), &open_id(), 7, ts(1))
        .expect("vote");
    let returning = engine
        .card(&open_id(), Some(&voter("a")))
        .expect("card builds");
    assert_eq!(returning.state(), VoteState::Settled);
    assert_eq!(returning.own_rating().map(|v| v.get()), Some(7));
}

#[test]
fn closed_cohort_cards_are_read_only() {
    let store = open_store();
    let engine = engine(store.clone());

    let card = engine
        .card(
            &crate::contest::domain::ParticipantId("closed".into()),
            Some(&voter("a")),
        )
        .expect("card builds");
    assert_eq!(card.access(), CardAccess::ReadOnly);

    let mut card = card;
    match card.begin_voting() {
        Err(VoteError::VotingClosed) => {}
        other => panic!("expected voting closed, got {other:?}"),
    }
}

#[test]
fn sample_entrants_never_transition() {
    let store = open_store();
    let mut sample = participant("sample", AdminStatus::ThisWeek);
    sample.is_sample = true;
    store.insert_participant(sample).expect("seed sample");
    let engine = engine(store);

    let mut card = engine
        .card(
            &crate::contest::domain::ParticipantId("sample".into()),
            Some(&voter("a")),
        )
        .expect("card builds");
    assert_eq!(card.access(), CardAccess::ReadOnly);
    assert!(card.begin_voting().is_err());
}

#[test]
fn unauthenticated_viewers_are_diverted_to_sign_in() {
    let store = open_store();
    let engine = engine(store);

    let mut card = engine.card(&open_id(), None).expect("card builds");
    match card.begin_voting() {
        Err(VoteError::Unauthenticated) => {}
        other => panic!("expected unauthenticated, got {other:?}"),
    }
    // No state change happened.
    assert_eq!(card.state(), VoteState::Unvoted);
}

#[test]
fn vote_flows_through_thank_you_into_settled() {
    let store = open_store();
    let engine = engine(store);
    let config = VotingConfig::default();

    let mut card = engine
        .card(&open_id(), Some(&voter("a")))
        .expect("card builds");
    card.begin_voting().expect("voting begins");
    assert_eq!(card.state(), VoteState::Voting);

    card.submit(&engine, Some(&voter("a")), &open_id(), 8, ts(1))
        .expect("vote accepted");
    assert_eq!(card.state(), VoteState::ThankYou);
    assert_eq!(card.displayed().average, 8.0);
    assert_eq!(card.displayed().votes, 1);
    assert_eq!(card.confirmed(), card.displayed());

    // The confirmation banner holds until its deadline passes.
    card.tick(ts(1));
    assert_eq!(card.state(), VoteState::ThankYou);
    card.tick(ts(1) + config.thank_you_delay());
    assert_eq!(card.state(), VoteState::Settled);
}

#[test]
fn revote_reenters_through_editing() {
    let store = open_store();
    let engine = engine(store.clone());

    engine
        .cast_or_update(Some(&voter("a")), &open_id(), 8, ts(1))
        .expect("vote a");
    engine
        .cast_or_update(Some(&voter("b")), &open_id(), 6, ts(2))
        .expect("vote b");

    let mut card = engine
        .card(&open_id(), Some(&voter("a")))
        .expect("card builds");
    assert_eq!(card.state(), VoteState::Settled);

    card.begin_edit().expect("edit begins");
    assert_eq!(card.state(), VoteState::Editing);

    card.submit(&engine, Some(&voter("a")), &open_id(), 10, ts(3))
        .expect("revote accepted");
    assert_eq!(card.displayed().average, 8.0);
    assert_eq!(card.displayed().votes, 2);

    // The revote reused the idempotent path, no second row appeared.
    let ratings = store.participant_ratings(&open_id()).expect("ratings read");
    assert_eq!(ratings.len(), 2);
}

#[test]
fn submit_requires_an_active_voting_state() {
    let store = open_store();
    let engine = engine(store);

    let mut card = engine
        .card(&open_id(), Some(&voter("a")))
        .expect("card builds");
    match card.submit(&engine, Some(&voter("a")), &open_id(), 8, ts(1)) {
        Err(VoteError::NotVoting(state)) => assert_eq!(state, "unvoted"),
        other => panic!("expected state guard, got {other:?}"),
    }
}

#[test]
fn failed_write_rolls_the_display_back_to_confirmed() {
    let inner = open_store();
    let engine = failing_engine(inner.clone());

    let mut card = engine
        .card(&open_id(), Some(&voter("a")))
        .expect("card builds");
    let before = card.displayed();

    card.begin_voting().expect("voting begins");
    match card.submit(&engine, Some(&voter("a")), &open_id(), 8, ts(1)) {
        Err(VoteError::Write(_)) => {}
        other => panic!("expected write failure, got {other:?}"),
    }

    // Displayed aggregate and state are exactly the pre-attempt values.
    assert_eq!(card.displayed(), before);
    assert_eq!(card.confirmed(), before);
    assert_eq!(card.state(), VoteState::Voting);
    assert_eq!(card.own_rating(), None);
}

#[test]
fn invalid_value_is_rejected_before_the_display_moves() {
    let store = open_store();
    let engine = engine(store);

    let mut card = engine
        .card(&open_id(), Some(&voter("a")))
        .expect("card builds");
    card.begin_voting().expect("voting begins");
    let before = card.displayed();

    match card.submit(&engine, Some(&voter("a")), &open_id(), 0, ts(1)) {
        Err(VoteError::InvalidRating(0)) => {}
        other => panic!("expected invalid rating, got {other:?}"),
    }
    assert_eq!(card.displayed(), before);
    assert_eq!(card.state(), VoteState::Voting);
}

#[test]
fn views_expose_labels_and_the_displayed_aggregate() {
    let store = open_store();
    let engine = engine(store);

    let mut card = engine
        .card(&open_id(), Some(&voter("a")))
        .expect("card builds");
    card.begin_voting().expect("voting begins");
    card.submit(&engine, Some(&voter("a")), &open_id(), 9, ts(1))
        .expect("vote accepted");

    let view = card.view();
    assert_eq!(view.state, "thank_you");
    assert_eq!(view.access, "open");
    assert_eq!(view.average_rating, 9.0);
    assert_eq!(view.total_votes, 1);
    assert_eq!(view.current_user_rating, Some(9));
}
