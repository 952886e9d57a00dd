#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! The ballot box: accepts encrypted ballots as cast or spoiled and stores
//! their submitted forms.
//!
//! Stored ballots always carry a terminal state. A ballot id is accepted at
//! most once; resubmission is refused no matter which state is requested.
//! Ballot-validity policy beyond the cryptographic (style matching, missing
//! contests) belongs to an external validator that runs before this point.

use std::collections::BTreeMap;

use tracing::warn;

use crate::ballot::{from_ciphertext_ballot, BallotBoxState, CiphertextBallot, SubmittedBallot};

/// An in-memory store of submitted ballots, keyed by ballot id.
#[derive(Clone, Debug, Default)]
pub struct BallotStore {
    ballots: BTreeMap<String, SubmittedBallot>,
}

impl BallotStore {
    pub fn new() -> Self {
        BallotStore::default()
    }

    /// Looks up a submitted ballot by id.
    pub fn get(&self, ballot_id: &str) -> Option<&SubmittedBallot> {
        self.ballots.get(ballot_id)
    }

    /// Whether the store already holds this ballot id.
    pub fn contains(&self, ballot_id: &str) -> bool {
        self.ballots.contains_key(ballot_id)
    }

    /// All submitted ballots, in id order.
    pub fn all(&self) -> impl Iterator<Item = &SubmittedBallot> {
        self.ballots.values()
    }

    /// All ballots in the given state, in id order.
    pub fn by_state(&self, state: BallotBoxState) -> impl Iterator<Item = &SubmittedBallot> {
        self.ballots.values().filter(move |b| b.state == state)
    }

    fn insert(&mut self, ballot: SubmittedBallot) -> &SubmittedBallot {
        let object_id = ballot.object_id.clone();
        self.ballots.insert(object_id.clone(), ballot);
        // The entry was just inserted under this key.
        #[allow(clippy::unwrap_used)]
        self.ballots.get(&object_id).unwrap()
    }
}

/// Accepts ballots into a [`BallotStore`] with terminal states.
#[derive(Clone, Debug, Default)]
pub struct BallotBox {
    store: BallotStore,
}

impl BallotBox {
    pub fn new() -> Self {
        BallotBox::default()
    }

    /// Accepts a ballot as cast.
    pub fn cast(&mut self, ballot: &CiphertextBallot) -> Option<&SubmittedBallot> {
        self.accept(ballot, BallotBoxState::Cast)
    }

    /// Accepts a ballot as spoiled.
    pub fn spoil(&mut self, ballot: &CiphertextBallot) -> Option<&SubmittedBallot> {
        self.accept(ballot, BallotBoxState::Spoiled)
    }

    /// Accepts a ballot with the given terminal state, refusing duplicates
    /// and the UNKNOWN state.
    pub fn accept(
        &mut self,
        ballot: &CiphertextBallot,
        state: BallotBoxState,
    ) -> Option<&SubmittedBallot> {
        if self.store.contains(&ballot.object_id) {
            warn!(
                object_id = %ballot.object_id,
                "ballot already submitted; resubmission refused"
            );
            return None;
        }

        let submitted = from_ciphertext_ballot(ballot, state)?;
        Some(self.store.insert(submitted))
    }

    /// The underlying store.
    pub fn store(&self) -> &BallotStore {
        &self.store
    }
}
