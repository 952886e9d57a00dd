#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! Plaintext and ciphertext ballots.
//!
//! The plaintext and ciphertext hierarchies mirror each other (ballot,
//! contest, selection) but share no storage; encryption converts one into
//! the other. Every
//! ciphertext layer carries a `crypto_hash` folding in the layer below, so
//! a ballot hash commits to every ciphertext on it. Retained nonces allow
//! proofs to be re-derived later; submission strips them.

use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{info, warn};

use util::algebra::{FieldElement, GroupElement};

use crate::{
    ballot_code::get_ballot_code,
    chaum_pedersen::{
        make_constant_chaum_pedersen, make_disjunctive_chaum_pedersen,
        ConstantChaumPedersenProof, DisjunctiveChaumPedersenProof,
    },
    el_gamal::{elgamal_add, ElGamalCiphertext},
    fixed_parameters::FixedParameters,
    hash::HashInput,
    hash_elems,
};

//=================================================================================================
// Plaintext forms
//=================================================================================================

/// A voter's mark (or its absence) for one selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaintextBallotSelection {
    /// The selection's object id from the manifest.
    pub object_id: String,

    /// 1 for an affirmative vote, 0 otherwise.
    pub vote: u64,

    /// True for synthesized placeholder selections.
    pub is_placeholder_selection: bool,
}

impl PlaintextBallotSelection {
    /// Checks the selection matches its description and carries a 0/1 vote.
    pub fn is_valid(&self, expected_object_id: &str) -> bool {
        if self.object_id != expected_object_id {
            warn!(
                object_id = %self.object_id,
                expected_object_id,
                "invalid selection: object id mismatch"
            );
            return false;
        }
        if self.vote > 1 {
            warn!(vote = self.vote, "invalid selection: vote out of range");
            return false;
        }
        true
    }
}

/// A voter's marks for one contest; unmentioned selections count as 0.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaintextBallotContest {
    /// The contest's object id from the manifest.
    pub object_id: String,

    /// The marked (and possibly some unmarked) selections.
    pub ballot_selections: Vec<PlaintextBallotSelection>,
}

impl PlaintextBallotContest {
    /// Checks contest identity, selection count, vote ranges, and that the
    /// total does not exceed the number of seats (an overvote).
    pub fn is_valid(
        &self,
        expected_object_id: &str,
        expected_number_selections: usize,
        expected_number_elected: u64,
    ) -> bool {
        if self.object_id != expected_object_id {
            warn!(
                object_id = %self.object_id,
                expected_object_id,
                "invalid contest: object id mismatch"
            );
            return false;
        }
        if self.ballot_selections.len() > expected_number_selections {
            warn!(
                count = self.ballot_selections.len(),
                expected_number_selections,
                "invalid contest: too many selections"
            );
            return false;
        }

        let mut votes = 0u64;
        for selection in &self.ballot_selections {
            if selection.vote > 1 {
                warn!(vote = selection.vote, "invalid contest: vote out of range");
                return false;
            }
            votes += selection.vote;
        }
        if votes > expected_number_elected {
            warn!(
                votes,
                expected_number_elected, "invalid contest: overvote"
            );
            return false;
        }
        true
    }
}

/// A voter's ballot as input to encryption.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaintextBallot {
    /// The ballot's object id; doubles as its tracking key.
    pub object_id: String,

    /// The ballot style the external validator checks against.
    pub style_id: String,

    /// The voter's contests; contests absent here encrypt as all zeros.
    pub contests: Vec<PlaintextBallotContest>,
}

//=================================================================================================
// Generic ciphertext views
//=================================================================================================

/// The minimal view of an encrypted selection that decryption needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextSelection {
    pub object_id: String,
    pub description_hash: FieldElement,
    pub ciphertext: ElGamalCiphertext,
}

/// The minimal view of an encrypted contest that decryption needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextContest {
    pub object_id: String,
    pub description_hash: FieldElement,
    pub selections: Vec<CiphertextSelection>,
}

//=================================================================================================
// Ciphertext forms
//=================================================================================================

/// One encrypted selection with its 0-or-1 proof.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CiphertextBallotSelection {
    /// The selection's object id from the manifest.
    pub object_id: String,

    /// The selection's position within its contest.
    pub sequence_order: u32,

    /// The hash of the selection's description.
    pub description_hash: FieldElement,

    /// The encrypted 0/1 vote.
    pub ciphertext: ElGamalCiphertext,

    /// `H(object_id, description_hash, H(ciphertext))`.
    pub crypto_hash: FieldElement,

    /// True for the synthesized placeholder selections.
    pub is_placeholder_selection: bool,

    /// The encryption nonce; retained only until submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<FieldElement>,

    /// Proof the ciphertext encrypts zero or one.
    pub proof: Option<DisjunctiveChaumPedersenProof>,
}

fn selection_crypto_hash(
    object_id: &str,
    description_hash: &FieldElement,
    ciphertext: &ElGamalCiphertext,
    fixed_parameters: &FixedParameters,
) -> FieldElement {
    let ciphertext_hash = ciphertext.crypto_hash(fixed_parameters);
    hash_elems!(&fixed_parameters.field; object_id, description_hash, &ciphertext_hash)
}

/// Constructs a [`CiphertextBallotSelection`], deriving the crypto hash and
/// the disjunctive proof.
#[allow(clippy::too_many_arguments)]
pub fn make_ciphertext_ballot_selection(
    object_id: String,
    sequence_order: u32,
    description_hash: FieldElement,
    ciphertext: ElGamalCiphertext,
    elgamal_public_key: &GroupElement,
    crypto_extended_base_hash: &FieldElement,
    proof_seed: &FieldElement,
    selection_representation: u64,
    is_placeholder_selection: bool,
    nonce: FieldElement,
    fixed_parameters: &FixedParameters,
) -> Option<CiphertextBallotSelection> {
    let crypto_hash =
        selection_crypto_hash(&object_id, &description_hash, &ciphertext, fixed_parameters);

    let proof = make_disjunctive_chaum_pedersen(
        &ciphertext,
        &nonce,
        elgamal_public_key,
        crypto_extended_base_hash,
        proof_seed,
        selection_representation,
        fixed_parameters,
    )?;

    Some(CiphertextBallotSelection {
        object_id,
        sequence_order,
        description_hash,
        ciphertext,
        crypto_hash,
        is_placeholder_selection,
        nonce: Some(nonce),
        proof: Some(proof),
    })
}

impl CiphertextBallotSelection {
    /// Verifies this selection against the seed it was encrypted under:
    /// the hash chain is intact and the disjunctive proof holds.
    pub fn is_valid_encryption(
        &self,
        encryption_seed: &FieldElement,
        elgamal_public_key: &GroupElement,
        crypto_extended_base_hash: &FieldElement,
        fixed_parameters: &FixedParameters,
    ) -> bool {
        if *encryption_seed != self.description_hash {
            warn!(
                object_id = %self.object_id,
                "selection encryption seed does not match the description hash"
            );
            return false;
        }

        let expected_crypto_hash = selection_crypto_hash(
            &self.object_id,
            encryption_seed,
            &self.ciphertext,
            fixed_parameters,
        );
        if expected_crypto_hash != self.crypto_hash {
            warn!(
                object_id = %self.object_id,
                "selection crypto hash does not match the ciphertext"
            );
            return false;
        }

        let Some(proof) = &self.proof else {
            warn!(object_id = %self.object_id, "selection is missing its proof");
            return false;
        };
        proof.is_valid(
            &self.ciphertext,
            elgamal_public_key,
            crypto_extended_base_hash,
            fixed_parameters,
        )
    }
}

/// One encrypted contest: the selections, their homomorphic accumulation,
/// and the constant-sum proof.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CiphertextBallotContest {
    /// The contest's object id from the manifest.
    pub object_id: String,

    /// The contest's position within the manifest.
    pub sequence_order: u32,

    /// The hash of the contest's description.
    pub description_hash: FieldElement,

    /// Real selections first, then placeholders, in sequence order.
    pub ballot_selections: Vec<CiphertextBallotSelection>,

    /// The componentwise product of all selection ciphertexts.
    pub ciphertext_accumulation: ElGamalCiphertext,

    /// `H(object_id, description_hash, selection crypto hashes)`.
    pub crypto_hash: FieldElement,

    /// The contest nonce; retained only until submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<FieldElement>,

    /// Proof that the accumulation encrypts `number_elected`.
    pub proof: Option<ConstantChaumPedersenProof>,
}

fn contest_crypto_hash(
    object_id: &str,
    description_hash: &FieldElement,
    selections: &[CiphertextBallotSelection],
    fixed_parameters: &FixedParameters,
) -> FieldElement {
    let selection_hashes: Vec<&FieldElement> =
        selections.iter().map(|s| &s.crypto_hash).collect();
    hash_elems!(
        &fixed_parameters.field;
        object_id,
        description_hash,
        HashInput::sequence(selection_hashes.iter().copied().map(HashInput::from))
    )
}

/// The componentwise product of the given selections' ciphertexts.
pub fn ciphertext_ballot_elgamal_accumulate(
    selections: &[CiphertextBallotSelection],
    fixed_parameters: &FixedParameters,
) -> ElGamalCiphertext {
    elgamal_add(selections.iter().map(|s| &s.ciphertext), fixed_parameters)
}

/// The sum of the selections' nonces, the witness for the constant-sum
/// proof. `None` when any nonce has been stripped.
pub fn ciphertext_ballot_contest_aggregate_nonce(
    selections: &[CiphertextBallotSelection],
    fixed_parameters: &FixedParameters,
) -> Option<FieldElement> {
    let field = &fixed_parameters.field;
    let mut aggregate = util::algebra::ScalarField::zero();
    for selection in selections {
        aggregate = aggregate.add(selection.nonce.as_ref()?, field);
    }
    Some(aggregate)
}

/// Constructs a [`CiphertextBallotContest`], accumulating the selections
/// and attaching the constant-sum proof.
#[allow(clippy::too_many_arguments)]
pub fn make_ciphertext_ballot_contest(
    object_id: String,
    sequence_order: u32,
    description_hash: FieldElement,
    ballot_selections: Vec<CiphertextBallotSelection>,
    elgamal_public_key: &GroupElement,
    crypto_extended_base_hash: &FieldElement,
    proof_seed: &FieldElement,
    number_elected: u64,
    nonce: FieldElement,
    fixed_parameters: &FixedParameters,
) -> Option<CiphertextBallotContest> {
    let crypto_hash = contest_crypto_hash(
        &object_id,
        &description_hash,
        &ballot_selections,
        fixed_parameters,
    );
    let ciphertext_accumulation =
        ciphertext_ballot_elgamal_accumulate(&ballot_selections, fixed_parameters);

    let Some(aggregate_nonce) =
        ciphertext_ballot_contest_aggregate_nonce(&ballot_selections, fixed_parameters)
    else {
        warn!(%object_id, "cannot prove a contest whose selection nonces are gone");
        return None;
    };

    let proof = make_constant_chaum_pedersen(
        &ciphertext_accumulation,
        number_elected,
        &aggregate_nonce,
        elgamal_public_key,
        proof_seed,
        crypto_extended_base_hash,
        fixed_parameters,
    );

    Some(CiphertextBallotContest {
        object_id,
        sequence_order,
        description_hash,
        ballot_selections,
        ciphertext_accumulation,
        crypto_hash,
        nonce: Some(nonce),
        proof: Some(proof),
    })
}

impl CiphertextBallotContest {
    /// Verifies the contest's hash chain, its accumulation, its constant-sum
    /// proof, and every selection within it.
    pub fn is_valid_encryption(
        &self,
        encryption_seed: &FieldElement,
        elgamal_public_key: &GroupElement,
        crypto_extended_base_hash: &FieldElement,
        fixed_parameters: &FixedParameters,
    ) -> bool {
        if *encryption_seed != self.description_hash {
            warn!(
                object_id = %self.object_id,
                "contest encryption seed does not match the description hash"
            );
            return false;
        }

        let expected_crypto_hash = contest_crypto_hash(
            &self.object_id,
            encryption_seed,
            &self.ballot_selections,
            fixed_parameters,
        );
        if expected_crypto_hash != self.crypto_hash {
            warn!(
                object_id = %self.object_id,
                "contest crypto hash does not match its selections"
            );
            return false;
        }

        for selection in &self.ballot_selections {
            if !selection.is_valid_encryption(
                &selection.description_hash,
                elgamal_public_key,
                crypto_extended_base_hash,
                fixed_parameters,
            ) {
                return false;
            }
        }

        let expected_accumulation =
            ciphertext_ballot_elgamal_accumulate(&self.ballot_selections, fixed_parameters);
        if expected_accumulation != self.ciphertext_accumulation {
            warn!(
                object_id = %self.object_id,
                "contest accumulation does not match its selections"
            );
            return false;
        }

        let Some(proof) = &self.proof else {
            warn!(object_id = %self.object_id, "contest is missing its proof");
            return false;
        };
        proof.is_valid(
            &self.ciphertext_accumulation,
            elgamal_public_key,
            crypto_extended_base_hash,
            fixed_parameters,
        )
    }

    /// The decryption-facing view of this contest: every selection,
    /// placeholders included.
    pub fn to_ciphertext_contest(&self) -> CiphertextContest {
        CiphertextContest {
            object_id: self.object_id.clone(),
            description_hash: self.description_hash.clone(),
            selections: self
                .ballot_selections
                .iter()
                .map(|s| CiphertextSelection {
                    object_id: s.object_id.clone(),
                    description_hash: s.description_hash.clone(),
                    ciphertext: s.ciphertext.clone(),
                })
                .collect(),
        }
    }
}

/// One fully encrypted ballot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CiphertextBallot {
    /// The ballot's object id.
    pub object_id: String,

    /// The ballot style it claims.
    pub style_id: String,

    /// The manifest hash it was encrypted against.
    pub manifest_hash: FieldElement,

    /// The previous ballot code on this device, or the device hash.
    pub code_seed: FieldElement,

    /// The encrypted contests in manifest order.
    pub contests: Vec<CiphertextBallotContest>,

    /// `H(code_seed, timestamp, crypto_hash)`, the voter-facing code.
    pub code: FieldElement,

    /// Caller-supplied integer timestamp.
    pub timestamp: u64,

    /// `H(object_id, manifest_hash, contest crypto hashes)`.
    pub crypto_hash: FieldElement,

    /// The master nonce; retained only until submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<FieldElement>,
}

fn ballot_crypto_hash(
    object_id: &str,
    manifest_hash: &FieldElement,
    contests: &[CiphertextBallotContest],
    fixed_parameters: &FixedParameters,
) -> FieldElement {
    let contest_hashes: Vec<&FieldElement> = contests.iter().map(|c| &c.crypto_hash).collect();
    hash_elems!(
        &fixed_parameters.field;
        object_id,
        manifest_hash,
        HashInput::sequence(contest_hashes.iter().copied().map(HashInput::from))
    )
}

/// Derives the seed every contest and selection nonce on a ballot descends
/// from.
pub fn ballot_nonce_seed(
    manifest_hash: &FieldElement,
    object_id: &str,
    nonce: &FieldElement,
    fixed_parameters: &FixedParameters,
) -> FieldElement {
    hash_elems!(&fixed_parameters.field; manifest_hash, object_id, nonce)
}

/// Constructs a [`CiphertextBallot`], deriving its crypto hash and code.
#[allow(clippy::too_many_arguments)]
pub fn make_ciphertext_ballot(
    object_id: String,
    style_id: String,
    manifest_hash: FieldElement,
    code_seed: FieldElement,
    contests: Vec<CiphertextBallotContest>,
    nonce: Option<FieldElement>,
    timestamp: u64,
    fixed_parameters: &FixedParameters,
) -> CiphertextBallot {
    let crypto_hash =
        ballot_crypto_hash(&object_id, &manifest_hash, &contests, fixed_parameters);
    let code = get_ballot_code(&code_seed, timestamp, &crypto_hash, &fixed_parameters.field);

    CiphertextBallot {
        object_id,
        style_id,
        manifest_hash,
        code_seed,
        contests,
        code,
        timestamp,
        crypto_hash,
        nonce,
    }
}

impl CiphertextBallot {
    /// Verifies the ballot's hash chain and every contest and selection
    /// proof against the expected manifest hash.
    pub fn is_valid_encryption(
        &self,
        expected_manifest_hash: &FieldElement,
        elgamal_public_key: &GroupElement,
        crypto_extended_base_hash: &FieldElement,
        fixed_parameters: &FixedParameters,
    ) -> bool {
        ballot_encryption_is_valid(
            &self.object_id,
            &self.manifest_hash,
            &self.crypto_hash,
            &self.contests,
            expected_manifest_hash,
            elgamal_public_key,
            crypto_extended_base_hash,
            fixed_parameters,
        )
    }
}

#[allow(clippy::too_many_arguments)]
fn ballot_encryption_is_valid(
    object_id: &str,
    manifest_hash: &FieldElement,
    crypto_hash: &FieldElement,
    contests: &[CiphertextBallotContest],
    expected_manifest_hash: &FieldElement,
    elgamal_public_key: &GroupElement,
    crypto_extended_base_hash: &FieldElement,
    fixed_parameters: &FixedParameters,
) -> bool {
    if manifest_hash != expected_manifest_hash {
        warn!(
            object_id,
            "ballot was encrypted against a different manifest"
        );
        return false;
    }

    let expected_crypto_hash =
        ballot_crypto_hash(object_id, manifest_hash, contests, fixed_parameters);
    if expected_crypto_hash != *crypto_hash {
        warn!(object_id, "ballot crypto hash does not match its contests");
        return false;
    }

    contests.iter().all(|contest| {
        contest.is_valid_encryption(
            &contest.description_hash,
            elgamal_public_key,
            crypto_extended_base_hash,
            fixed_parameters,
        )
    })
}

//=================================================================================================
// Submission
//=================================================================================================

/// The terminal (or not-yet-terminal) state of a submitted ballot.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
pub enum BallotBoxState {
    /// Counted into the tally.
    Cast,
    /// Retained for individual decryption, never counted.
    Spoiled,
    /// Not yet determined; not storable.
    Unknown,
}

/// A ballot as it enters the record: nonces stripped, state attached.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmittedBallot {
    pub object_id: String,
    pub style_id: String,
    pub manifest_hash: FieldElement,
    pub code_seed: FieldElement,
    pub contests: Vec<CiphertextBallotContest>,
    pub code: FieldElement,
    pub timestamp: u64,
    pub crypto_hash: FieldElement,
    pub state: BallotBoxState,
}

/// Converts an encrypted ballot into its submitted form, removing every
/// retained nonce.
///
/// Returns `None` for [`BallotBoxState::Unknown`]: stored ballots must
/// carry a terminal state.
pub fn from_ciphertext_ballot(
    ballot: &CiphertextBallot,
    state: BallotBoxState,
) -> Option<SubmittedBallot> {
    if state == BallotBoxState::Unknown {
        info!(
            object_id = %ballot.object_id,
            "ballots may only be submitted as cast or spoiled"
        );
        return None;
    }

    let contests = ballot
        .contests
        .iter()
        .map(|contest| {
            let ballot_selections = contest
                .ballot_selections
                .iter()
                .map(|selection| CiphertextBallotSelection {
                    nonce: None,
                    ..selection.clone()
                })
                .collect();
            CiphertextBallotContest {
                ballot_selections,
                nonce: None,
                ..contest.clone()
            }
        })
        .collect();

    Some(SubmittedBallot {
        object_id: ballot.object_id.clone(),
        style_id: ballot.style_id.clone(),
        manifest_hash: ballot.manifest_hash.clone(),
        code_seed: ballot.code_seed.clone(),
        contests,
        code: ballot.code.clone(),
        timestamp: ballot.timestamp,
        crypto_hash: ballot.crypto_hash.clone(),
        state,
    })
}

impl SubmittedBallot {
    /// Verifies the submitted ballot exactly as [`CiphertextBallot::is_valid_encryption`]
    /// does; submission never touches the proofs.
    pub fn is_valid_encryption(
        &self,
        expected_manifest_hash: &FieldElement,
        elgamal_public_key: &GroupElement,
        crypto_extended_base_hash: &FieldElement,
        fixed_parameters: &FixedParameters,
    ) -> bool {
        ballot_encryption_is_valid(
            &self.object_id,
            &self.manifest_hash,
            &self.crypto_hash,
            &self.contests,
            expected_manifest_hash,
            elgamal_public_key,
            crypto_extended_base_hash,
            fixed_parameters,
        )
    }
}
