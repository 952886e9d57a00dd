#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! Homomorphic tallying of cast ballots.
//!
//! The ciphertext tally starts at the ElGamal identity for every real
//! selection in the manifest and multiplies in each cast ballot's selection
//! ciphertexts. Accumulation is a commutative monoid: batch order never
//! changes the result. Placeholder selections ride along inside contest
//! accumulations on the ballots but are not tallied; their only job is
//! making the per-contest constant-sum proofs possible.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use util::algebra::{FieldElement, GroupElement};

use crate::{
    ballot::{
        BallotBoxState, CiphertextBallotSelection, CiphertextContest, CiphertextSelection,
        SubmittedBallot,
    },
    decryption_share::CiphertextDecryptionSelection,
    el_gamal::{elgamal_add, elgamal_homomorphic_zero, ElGamalCiphertext},
    election_context::CiphertextElectionContext,
    fixed_parameters::FixedParameters,
    manifest::InternalManifest,
};

/// The accumulator for one real selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextTallySelection {
    pub object_id: String,
    pub sequence_order: u32,
    pub description_hash: FieldElement,

    /// The running homomorphic sum; starts at `(1, 1)`.
    pub ciphertext: ElGamalCiphertext,
}

impl CiphertextTallySelection {
    fn elgamal_accumulate(
        &mut self,
        ciphertext: &ElGamalCiphertext,
        fixed_parameters: &FixedParameters,
    ) {
        self.ciphertext = elgamal_add([&self.ciphertext, ciphertext], fixed_parameters);
    }
}

/// The accumulators for one contest's real selections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextTallyContest {
    pub object_id: String,
    pub sequence_order: u32,
    pub description_hash: FieldElement,

    /// Accumulators keyed by selection object id.
    pub selections: BTreeMap<String, CiphertextTallySelection>,
}

impl CiphertextTallyContest {
    /// Multiplies a cast contest's real selections into the accumulators.
    ///
    /// Placeholders are skipped; a real selection the tally does not know,
    /// or a known selection the ballot lacks, fails the whole contest.
    fn accumulate_contest(
        &mut self,
        contest_selections: &[CiphertextBallotSelection],
        fixed_parameters: &FixedParameters,
    ) -> bool {
        if contest_selections.is_empty() {
            warn!(
                object_id = %self.object_id,
                "accumulate cannot add missing selections"
            );
            return false;
        }

        let ballot_selection_ids: BTreeSet<&str> = contest_selections
            .iter()
            .filter(|s| !s.is_placeholder_selection)
            .map(|s| s.object_id.as_str())
            .collect();
        let tally_selection_ids: BTreeSet<&str> =
            self.selections.keys().map(String::as_str).collect();
        if ballot_selection_ids != tally_selection_ids {
            warn!(
                object_id = %self.object_id,
                "accumulate cannot add mismatched selections"
            );
            return false;
        }

        for selection in contest_selections {
            if selection.is_placeholder_selection {
                continue;
            }
            if let Some(tally_selection) = self.selections.get_mut(&selection.object_id) {
                tally_selection.elgamal_accumulate(&selection.ciphertext, fixed_parameters);
            }
        }
        true
    }

    /// The decryption-facing view of this contest.
    pub fn to_ciphertext_contest(&self) -> CiphertextContest {
        CiphertextContest {
            object_id: self.object_id.clone(),
            description_hash: self.description_hash.clone(),
            selections: self
                .selections
                .values()
                .map(|s| CiphertextSelection {
                    object_id: s.object_id.clone(),
                    description_hash: s.description_hash.clone(),
                    ciphertext: s.ciphertext.clone(),
                })
                .collect(),
        }
    }
}

/// The election-wide ciphertext tally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextTally {
    pub object_id: String,

    /// Ballot ids already accumulated; the double-cast guard.
    cast_ballot_ids: BTreeSet<String>,

    /// Ballot ids seen spoiled; retained for the record, never accumulated.
    spoiled_ballot_ids: BTreeSet<String>,

    /// Contests keyed by object id.
    pub contests: BTreeMap<String, CiphertextTallyContest>,
}

impl CiphertextTally {
    /// An empty tally shaped by the manifest: every real selection starts
    /// at the ElGamal identity.
    pub fn new(
        object_id: impl Into<String>,
        internal_manifest: &InternalManifest,
        fixed_parameters: &FixedParameters,
    ) -> Self {
        let field = &fixed_parameters.field;
        let contests = internal_manifest
            .contests
            .iter()
            .map(|description| {
                let contest = &description.contest;
                let selections = contest
                    .selections
                    .iter()
                    .map(|selection| {
                        (
                            selection.object_id.clone(),
                            CiphertextTallySelection {
                                object_id: selection.object_id.clone(),
                                sequence_order: selection.sequence_order,
                                description_hash: selection.crypto_hash(field),
                                ciphertext: elgamal_homomorphic_zero(),
                            },
                        )
                    })
                    .collect();
                (
                    contest.object_id.clone(),
                    CiphertextTallyContest {
                        object_id: contest.object_id.clone(),
                        sequence_order: contest.sequence_order,
                        description_hash: contest.crypto_hash(field),
                        selections,
                    },
                )
            })
            .collect();

        CiphertextTally {
            object_id: object_id.into(),
            cast_ballot_ids: BTreeSet::new(),
            spoiled_ballot_ids: BTreeSet::new(),
            contests,
        }
    }

    /// The number of cast ballots accumulated so far.
    pub fn cast_count(&self) -> usize {
        self.cast_ballot_ids.len()
    }

    /// The ids of spoiled ballots seen so far.
    pub fn spoiled_ballot_ids(&self) -> impl Iterator<Item = &str> {
        self.spoiled_ballot_ids.iter().map(String::as_str)
    }

    /// Whether a ballot id has already been accumulated or spoiled.
    pub fn contains(&self, ballot_id: &str) -> bool {
        self.cast_ballot_ids.contains(ballot_id) || self.spoiled_ballot_ids.contains(ballot_id)
    }

    /// Appends one submitted ballot.
    ///
    /// Cast ballots accumulate; spoiled ballots are only recorded. A
    /// repeated ballot id, an UNKNOWN state, or (when `validate` is set) a
    /// failed proof check rejects the ballot without touching the tally.
    pub fn append(
        &mut self,
        ballot: &SubmittedBallot,
        validate: bool,
        context: &CiphertextElectionContext,
        fixed_parameters: &FixedParameters,
    ) -> bool {
        if ballot.state == BallotBoxState::Unknown {
            warn!(
                object_id = %ballot.object_id,
                "cannot append a ballot without a terminal state"
            );
            return false;
        }
        if self.contains(&ballot.object_id) {
            info!(
                object_id = %ballot.object_id,
                "ballot already counted; append is a no-op"
            );
            return false;
        }
        if validate
            && !ballot.is_valid_encryption(
                &context.manifest_hash,
                &context.elgamal_public_key,
                &context.crypto_extended_base_hash,
                fixed_parameters,
            )
        {
            warn!(object_id = %ballot.object_id, "ballot failed validation");
            return false;
        }

        match ballot.state {
            BallotBoxState::Cast => self.add_cast(ballot, fixed_parameters),
            BallotBoxState::Spoiled => {
                self.spoiled_ballot_ids.insert(ballot.object_id.clone());
                true
            }
            BallotBoxState::Unknown => false,
        }
    }

    /// Appends a batch of ballots, returning how many were accepted.
    ///
    /// Accumulation commutes, so any grouping of the same ballots produces
    /// the identical tally.
    pub fn batch_append<'a>(
        &mut self,
        ballots: impl IntoIterator<Item = &'a SubmittedBallot>,
        validate: bool,
        context: &CiphertextElectionContext,
        fixed_parameters: &FixedParameters,
    ) -> usize {
        ballots
            .into_iter()
            .filter(|ballot| self.append(ballot, validate, context, fixed_parameters))
            .count()
    }

    fn add_cast(&mut self, ballot: &SubmittedBallot, fixed_parameters: &FixedParameters) -> bool {
        // Every contest must accumulate; a mismatch part-way through would
        // leave the tally corrupted, so check membership first.
        for contest in &ballot.contests {
            if !self.contests.contains_key(&contest.object_id) {
                warn!(
                    ballot_id = %ballot.object_id,
                    contest_id = %contest.object_id,
                    "ballot contains a contest not in the tally"
                );
                return false;
            }
        }

        for contest in &ballot.contests {
            if let Some(tally_contest) = self.contests.get_mut(&contest.object_id) {
                if !tally_contest.accumulate_contest(&contest.ballot_selections, fixed_parameters)
                {
                    return false;
                }
            }
        }

        self.cast_ballot_ids.insert(ballot.object_id.clone());
        true
    }

    /// The publishable form of the tally, without the internal ballot-id
    /// bookkeeping.
    pub fn publish(&self) -> crate::election_record::PublishedCiphertextTally {
        crate::election_record::PublishedCiphertextTally {
            object_id: self.object_id.clone(),
            contests: self.contests.clone(),
        }
    }
}

/// One decrypted selection total.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaintextTallySelection {
    pub object_id: String,

    /// The integer tally recovered by discrete log.
    pub tally: u64,

    /// `g^tally`, the value the shares decrypted to.
    pub value: GroupElement,

    /// The ciphertext this selection was decrypted from.
    pub message: ElGamalCiphertext,

    /// The decryption shares that produced this value, for the record.
    pub shares: Vec<CiphertextDecryptionSelection>,
}

/// One decrypted contest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaintextTallyContest {
    pub object_id: String,
    pub selections: BTreeMap<String, PlaintextTallySelection>,
}

/// A decrypted tally (or a decrypted spoiled ballot, which shares the
/// shape).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaintextTally {
    pub object_id: String,
    pub contests: BTreeMap<String, PlaintextTallyContest>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use util::{csprng::Csprng, pow_radix::PowRadixOption};

    use crate::{
        ballot::{from_ciphertext_ballot, BallotBoxState, PlaintextBallot, PlaintextBallotContest, PlaintextBallotSelection},
        el_gamal::{elgamal_combine_public_keys, ElGamalKeyPair},
        election_context::make_ciphertext_election_context,
        encrypt::encrypt_ballot,
        manifest::{ContestDescription, InternalManifest, SelectionDescription},
        standard_parameters::test_parameters,
    };

    fn simple_manifest(fixed_parameters: &FixedParameters) -> InternalManifest {
        let contest = ContestDescription {
            object_id: "contest-1".to_owned(),
            sequence_order: 0,
            number_elected: 1,
            selections: vec![
                SelectionDescription::new("selection-a", 0),
                SelectionDescription::new("selection-b", 1),
            ],
        };
        let manifest_hash = FieldElement::from(71_u8, &fixed_parameters.field);
        InternalManifest::new(vec![contest], manifest_hash)
    }

    fn ballot_for(object_id: &str, selection_id: &str) -> PlaintextBallot {
        PlaintextBallot {
            object_id: object_id.to_owned(),
            style_id: "style-1".to_owned(),
            contests: vec![PlaintextBallotContest {
                object_id: "contest-1".to_owned(),
                ballot_selections: vec![PlaintextBallotSelection {
                    object_id: selection_id.to_owned(),
                    vote: 1,
                    is_placeholder_selection: false,
                }],
            }],
        }
    }

    struct Setup {
        fp: FixedParameters,
        csprng: Csprng,
        manifest: InternalManifest,
        context: crate::election_context::CiphertextElectionContext,
    }

    fn setup(seed: &[u8]) -> Setup {
        let fp = test_parameters(PowRadixOption::NoAcceleration);
        let mut csprng = Csprng::new(seed);
        let keypair = ElGamalKeyPair::random(&mut csprng, &fp);
        let joint_key = elgamal_combine_public_keys([&keypair.public_key], &fp);
        let manifest = simple_manifest(&fp);
        let commitment_hash = fp.field.random_field_elem(&mut csprng);
        let context = make_ciphertext_election_context(
            &crate::varying_parameters::VaryingParameters { n: 1, k: 1 },
            joint_key,
            commitment_hash,
            manifest.manifest_hash.clone(),
            &fp,
        );
        Setup {
            fp,
            csprng,
            manifest,
            context,
        }
    }

    fn submitted(
        s: &mut Setup,
        object_id: &str,
        selection_id: &str,
        state: BallotBoxState,
    ) -> SubmittedBallot {
        let ballot = ballot_for(object_id, selection_id);
        let encrypted = encrypt_ballot(
            &ballot,
            &s.manifest,
            &s.context,
            FieldElement::from(3_u8, &s.fp.field),
            None,
            1_660_000_000,
            true,
            &mut s.csprng,
            &s.fp,
        )
        .unwrap();
        from_ciphertext_ballot(&encrypted, state).unwrap()
    }

    #[test]
    fn duplicate_ballot_ids_are_rejected() {
        let mut s = setup(b"tally duplicate");
        let ballot = submitted(&mut s, "ballot-1", "selection-a", BallotBoxState::Cast);

        let mut tally = CiphertextTally::new("tally", &s.manifest, &s.fp);
        assert!(tally.append(&ballot, true, &s.context, &s.fp));
        assert!(!tally.append(&ballot, true, &s.context, &s.fp), "double cast");
        assert_eq!(tally.cast_count(), 1);
    }

    #[test]
    fn spoiled_ballots_do_not_accumulate() {
        let mut s = setup(b"tally spoiled");
        let cast = submitted(&mut s, "ballot-1", "selection-a", BallotBoxState::Cast);
        let spoiled = submitted(&mut s, "ballot-2", "selection-a", BallotBoxState::Spoiled);

        let mut tally = CiphertextTally::new("tally", &s.manifest, &s.fp);
        assert!(tally.append(&cast, true, &s.context, &s.fp));
        assert!(tally.append(&spoiled, true, &s.context, &s.fp));
        assert_eq!(tally.cast_count(), 1);
        assert_eq!(tally.spoiled_ballot_ids().count(), 1);

        // Only the cast ballot is in the accumulator.
        let with_only_cast = {
            let mut t = CiphertextTally::new("tally", &s.manifest, &s.fp);
            t.append(&cast, true, &s.context, &s.fp);
            t
        };
        assert_eq!(
            tally.contests["contest-1"].selections["selection-a"].ciphertext,
            with_only_cast.contests["contest-1"].selections["selection-a"].ciphertext
        );
    }

    #[test]
    fn accumulation_is_order_independent() {
        let mut s = setup(b"tally order");
        let b1 = submitted(&mut s, "ballot-1", "selection-a", BallotBoxState::Cast);
        let b2 = submitted(&mut s, "ballot-2", "selection-b", BallotBoxState::Cast);
        let b3 = submitted(&mut s, "ballot-3", "selection-a", BallotBoxState::Cast);

        let mut forward = CiphertextTally::new("tally", &s.manifest, &s.fp);
        assert_eq!(forward.batch_append([&b1, &b2, &b3], true, &s.context, &s.fp), 3);

        let mut backward = CiphertextTally::new("tally", &s.manifest, &s.fp);
        assert_eq!(backward.batch_append([&b3, &b1, &b2], true, &s.context, &s.fp), 3);

        assert_eq!(forward.contests, backward.contests);
    }
}
