#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! Computing decryption shares: direct, compensated, and reconstructed.
//!
//! A present guardian raises each ciphertext pad to its secret share and
//! proves it did so. For a missing guardian, each present guardian does the
//! same with the missing guardian's backup coordinate, proving against the
//! recovery public key derived from the missing guardian's commitments.
//! Lagrange interpolation in the exponent then reassembles the missing
//! guardian's share from any quorum of compensated shares.

use std::collections::BTreeMap;

use tracing::warn;

use util::algebra::{FieldElement, Group, GroupElement, ScalarField};
use util::csprng::Csprng;

use crate::{
    ballot::{CiphertextContest, CiphertextSelection, SubmittedBallot},
    chaum_pedersen::{make_chaum_pedersen, ChaumPedersenProof},
    decryption_share::{
        create_ciphertext_decryption_selection, create_recovered_ciphertext_decryption_selection,
        CiphertextCompensatedDecryptionContest, CiphertextCompensatedDecryptionSelection,
        CiphertextDecryptionContest, CiphertextDecryptionSelection, CompensatedDecryptionShare,
        DecryptionShare,
    },
    el_gamal::ElGamalCiphertext,
    election_context::CiphertextElectionContext,
    election_polynomial::compute_lagrange_coefficient,
    fixed_parameters::FixedParameters,
    key_ceremony::{ElectionKeyPair, ElectionPublicKey},
    tally::CiphertextTally,
    GuardianId,
};

/// Computes a guardian's decryption share of a whole ciphertext tally.
pub fn compute_decryption_share(
    key_pair: &ElectionKeyPair,
    tally: &CiphertextTally,
    context: &CiphertextElectionContext,
    csprng: &mut Csprng,
    fixed_parameters: &FixedParameters,
) -> Option<DecryptionShare> {
    let mut contests = BTreeMap::new();
    for contest in tally.contests.values() {
        let contest_share = compute_decryption_share_for_contest(
            key_pair,
            &contest.to_ciphertext_contest(),
            context,
            csprng,
            fixed_parameters,
        )?;
        contests.insert(contest.object_id.clone(), contest_share);
    }

    Some(DecryptionShare {
        object_id: tally.object_id.clone(),
        guardian_id: key_pair.owner_id.clone(),
        public_key: key_pair.key_pair.public_key.clone(),
        contests,
    })
}

/// Computes a guardian's decryption share of a single (spoiled) ballot.
pub fn compute_decryption_share_for_ballot(
    key_pair: &ElectionKeyPair,
    ballot: &SubmittedBallot,
    context: &CiphertextElectionContext,
    csprng: &mut Csprng,
    fixed_parameters: &FixedParameters,
) -> Option<DecryptionShare> {
    let mut contests = BTreeMap::new();
    for contest in &ballot.contests {
        let contest_share = compute_decryption_share_for_contest(
            key_pair,
            &contest.to_ciphertext_contest(),
            context,
            csprng,
            fixed_parameters,
        )?;
        contests.insert(contest.object_id.clone(), contest_share);
    }

    Some(DecryptionShare {
        object_id: ballot.object_id.clone(),
        guardian_id: key_pair.owner_id.clone(),
        public_key: key_pair.key_pair.public_key.clone(),
        contests,
    })
}

fn compute_decryption_share_for_contest(
    key_pair: &ElectionKeyPair,
    contest: &CiphertextContest,
    context: &CiphertextElectionContext,
    csprng: &mut Csprng,
    fixed_parameters: &FixedParameters,
) -> Option<CiphertextDecryptionContest> {
    let mut selections = BTreeMap::new();
    for selection in &contest.selections {
        let selection_share = compute_decryption_share_for_selection(
            key_pair,
            selection,
            context,
            csprng,
            fixed_parameters,
        )?;
        selections.insert(selection.object_id.clone(), selection_share);
    }

    Some(CiphertextDecryptionContest {
        object_id: contest.object_id.clone(),
        guardian_id: key_pair.owner_id.clone(),
        description_hash: contest.description_hash.clone(),
        selections,
    })
}

/// Computes a guardian's partial decryption of one selection, with proof,
/// and self-checks the proof before returning it.
pub fn compute_decryption_share_for_selection(
    key_pair: &ElectionKeyPair,
    selection: &CiphertextSelection,
    context: &CiphertextElectionContext,
    csprng: &mut Csprng,
    fixed_parameters: &FixedParameters,
) -> Option<CiphertextDecryptionSelection> {
    let nonce_seed = fixed_parameters.field.random_field_elem(csprng);
    let (decryption, proof) = partially_decrypt(
        key_pair,
        &selection.ciphertext,
        &context.crypto_extended_base_hash,
        &nonce_seed,
        fixed_parameters,
    );

    if !proof.is_valid(
        &selection.ciphertext,
        &key_pair.key_pair.public_key,
        &decryption,
        &context.crypto_extended_base_hash,
        fixed_parameters,
    ) {
        warn!(
            guardian_id = %key_pair.owner_id,
            object_id = %selection.object_id,
            "decryption share proof failed self-verification"
        );
        return None;
    }

    Some(create_ciphertext_decryption_selection(
        selection.object_id.clone(),
        key_pair.owner_id.clone(),
        decryption,
        proof,
    ))
}

/// Computes `M_i = A^{s_i}` with a Chaum-Pedersen proof under the
/// guardian's own public key.
pub fn partially_decrypt(
    key_pair: &ElectionKeyPair,
    elgamal: &ElGamalCiphertext,
    extended_base_hash: &FieldElement,
    nonce_seed: &FieldElement,
    fixed_parameters: &FixedParameters,
) -> (GroupElement, ChaumPedersenProof) {
    let partial_decryption =
        elgamal.partial_decrypt(&key_pair.key_pair.secret_key, fixed_parameters);
    let proof = make_chaum_pedersen(
        elgamal,
        &key_pair.key_pair.secret_key,
        &partial_decryption,
        nonce_seed,
        extended_base_hash,
        fixed_parameters,
    );
    (partial_decryption, proof)
}

/// Computes `A^{P_m(l)}` from a backup coordinate, with a Chaum-Pedersen
/// proof under the corresponding recovery public key.
pub fn decrypt_with_threshold(
    missing_guardian_coordinate: &FieldElement,
    elgamal: &ElGamalCiphertext,
    extended_base_hash: &FieldElement,
    nonce_seed: &FieldElement,
    fixed_parameters: &FixedParameters,
) -> (GroupElement, ChaumPedersenProof) {
    let partial_decryption =
        elgamal.partial_decrypt(missing_guardian_coordinate, fixed_parameters);
    let proof = make_chaum_pedersen(
        elgamal,
        missing_guardian_coordinate,
        &partial_decryption,
        nonce_seed,
        extended_base_hash,
        fixed_parameters,
    );
    (partial_decryption, proof)
}

/// Computes a present guardian's compensated share of a whole tally for one
/// missing guardian.
pub fn compute_compensated_decryption_share(
    missing_guardian_coordinate: &FieldElement,
    present_guardian_key: &ElectionPublicKey,
    missing_guardian_key: &ElectionPublicKey,
    tally: &CiphertextTally,
    context: &CiphertextElectionContext,
    csprng: &mut Csprng,
    fixed_parameters: &FixedParameters,
) -> Option<CompensatedDecryptionShare> {
    let mut contests = BTreeMap::new();
    for contest in tally.contests.values() {
        let contest_share = compute_compensated_decryption_share_for_contest(
            missing_guardian_coordinate,
            present_guardian_key,
            missing_guardian_key,
            &contest.to_ciphertext_contest(),
            context,
            csprng,
            fixed_parameters,
        )?;
        contests.insert(contest.object_id.clone(), contest_share);
    }

    Some(CompensatedDecryptionShare {
        object_id: tally.object_id.clone(),
        guardian_id: present_guardian_key.owner_id.clone(),
        missing_guardian_id: missing_guardian_key.owner_id.clone(),
        public_key: present_guardian_key.key.clone(),
        contests,
    })
}

/// Computes a present guardian's compensated share of a single ballot for
/// one missing guardian.
#[allow(clippy::too_many_arguments)]
pub fn compute_compensated_decryption_share_for_ballot(
    missing_guardian_coordinate: &FieldElement,
    present_guardian_key: &ElectionPublicKey,
    missing_guardian_key: &ElectionPublicKey,
    ballot: &SubmittedBallot,
    context: &CiphertextElectionContext,
    csprng: &mut Csprng,
    fixed_parameters: &FixedParameters,
) -> Option<CompensatedDecryptionShare> {
    let mut contests = BTreeMap::new();
    for contest in &ballot.contests {
        let contest_share = compute_compensated_decryption_share_for_contest(
            missing_guardian_coordinate,
            present_guardian_key,
            missing_guardian_key,
            &contest.to_ciphertext_contest(),
            context,
            csprng,
            fixed_parameters,
        )?;
        contests.insert(contest.object_id.clone(), contest_share);
    }

    Some(CompensatedDecryptionShare {
        object_id: ballot.object_id.clone(),
        guardian_id: present_guardian_key.owner_id.clone(),
        missing_guardian_id: missing_guardian_key.owner_id.clone(),
        public_key: present_guardian_key.key.clone(),
        contests,
    })
}

#[allow(clippy::too_many_arguments)]
fn compute_compensated_decryption_share_for_contest(
    missing_guardian_coordinate: &FieldElement,
    present_guardian_key: &ElectionPublicKey,
    missing_guardian_key: &ElectionPublicKey,
    contest: &CiphertextContest,
    context: &CiphertextElectionContext,
    csprng: &mut Csprng,
    fixed_parameters: &FixedParameters,
) -> Option<CiphertextCompensatedDecryptionContest> {
    let mut selections = BTreeMap::new();
    for selection in &contest.selections {
        let selection_share = compute_compensated_decryption_share_for_selection(
            missing_guardian_coordinate,
            present_guardian_key,
            missing_guardian_key,
            selection,
            context,
            csprng,
            fixed_parameters,
        )?;
        selections.insert(selection.object_id.clone(), selection_share);
    }

    Some(CiphertextCompensatedDecryptionContest {
        object_id: contest.object_id.clone(),
        guardian_id: present_guardian_key.owner_id.clone(),
        missing_guardian_id: missing_guardian_key.owner_id.clone(),
        description_hash: contest.description_hash.clone(),
        selections,
    })
}

/// Computes one compensated selection share, proving it against the
/// recovery public key, and self-checks the proof.
#[allow(clippy::too_many_arguments)]
pub fn compute_compensated_decryption_share_for_selection(
    missing_guardian_coordinate: &FieldElement,
    present_guardian_key: &ElectionPublicKey,
    missing_guardian_key: &ElectionPublicKey,
    selection: &CiphertextSelection,
    context: &CiphertextElectionContext,
    csprng: &mut Csprng,
    fixed_parameters: &FixedParameters,
) -> Option<CiphertextCompensatedDecryptionSelection> {
    let nonce_seed = fixed_parameters.field.random_field_elem(csprng);
    let (share, proof) = decrypt_with_threshold(
        missing_guardian_coordinate,
        &selection.ciphertext,
        &context.crypto_extended_base_hash,
        &nonce_seed,
        fixed_parameters,
    );

    let recovery_key =
        compute_recovery_public_key(present_guardian_key, missing_guardian_key, fixed_parameters);

    if !proof.is_valid(
        &selection.ciphertext,
        &recovery_key,
        &share,
        &context.crypto_extended_base_hash,
        fixed_parameters,
    ) {
        warn!(
            guardian_id = %present_guardian_key.owner_id,
            missing_guardian_id = %missing_guardian_key.owner_id,
            object_id = %selection.object_id,
            "compensated decryption share proof failed self-verification"
        );
        return None;
    }

    Some(CiphertextCompensatedDecryptionSelection {
        object_id: selection.object_id.clone(),
        guardian_id: present_guardian_key.owner_id.clone(),
        missing_guardian_id: missing_guardian_key.owner_id.clone(),
        share,
        recovery_key,
        proof,
    })
}

/// The public key a compensated share verifies against:
/// `∏_j commitments_m[j]^(l^j) = g^{P_m(l)}` for present-guardian sequence
/// order `l` and missing guardian `m`.
pub fn compute_recovery_public_key(
    guardian_key: &ElectionPublicKey,
    missing_guardian_key: &ElectionPublicKey,
    fixed_parameters: &FixedParameters,
) -> GroupElement {
    let field = &fixed_parameters.field;
    let group = &fixed_parameters.group;
    let sequence_order = FieldElement::from(guardian_key.sequence_order, field);

    missing_guardian_key
        .coefficient_commitments
        .iter()
        .enumerate()
        .fold(Group::one(), |key, (j, commitment)| {
            let exponent = sequence_order.pow(j as u32, field);
            key.mul(&commitment.exp(&exponent, group), group)
        })
}

/// Reconstructs a missing guardian's tally share from compensated shares.
pub fn reconstruct_decryption_share(
    missing_guardian_key: &ElectionPublicKey,
    tally: &CiphertextTally,
    shares: &BTreeMap<GuardianId, CompensatedDecryptionShare>,
    lagrange_coefficients: &BTreeMap<GuardianId, FieldElement>,
    fixed_parameters: &FixedParameters,
) -> Option<DecryptionShare> {
    let mut contests = BTreeMap::new();
    for contest in tally.contests.values() {
        let reconstructed = reconstruct_decryption_contest(
            &missing_guardian_key.owner_id,
            &contest.to_ciphertext_contest(),
            shares,
            lagrange_coefficients,
            fixed_parameters,
        )?;
        contests.insert(contest.object_id.clone(), reconstructed);
    }

    Some(DecryptionShare {
        object_id: tally.object_id.clone(),
        guardian_id: missing_guardian_key.owner_id.clone(),
        public_key: missing_guardian_key.key.clone(),
        contests,
    })
}

/// Reconstructs a missing guardian's share of a single ballot.
pub fn reconstruct_decryption_share_for_ballot(
    missing_guardian_key: &ElectionPublicKey,
    ballot: &SubmittedBallot,
    shares: &BTreeMap<GuardianId, CompensatedDecryptionShare>,
    lagrange_coefficients: &BTreeMap<GuardianId, FieldElement>,
    fixed_parameters: &FixedParameters,
) -> Option<DecryptionShare> {
    let mut contests = BTreeMap::new();
    for contest in &ballot.contests {
        let reconstructed = reconstruct_decryption_contest(
            &missing_guardian_key.owner_id,
            &contest.to_ciphertext_contest(),
            shares,
            lagrange_coefficients,
            fixed_parameters,
        )?;
        contests.insert(contest.object_id.clone(), reconstructed);
    }

    Some(DecryptionShare {
        object_id: ballot.object_id.clone(),
        guardian_id: missing_guardian_key.owner_id.clone(),
        public_key: missing_guardian_key.key.clone(),
        contests,
    })
}

fn reconstruct_decryption_contest(
    missing_guardian_id: &str,
    contest: &CiphertextContest,
    shares: &BTreeMap<GuardianId, CompensatedDecryptionShare>,
    lagrange_coefficients: &BTreeMap<GuardianId, FieldElement>,
    fixed_parameters: &FixedParameters,
) -> Option<CiphertextDecryptionContest> {
    let group = &fixed_parameters.group;

    if shares.is_empty() {
        warn!(
            missing_guardian_id,
            "no compensated shares to reconstruct from"
        );
        return None;
    }

    let mut selections = BTreeMap::new();
    for selection in &contest.selections {
        let mut recovered_parts = BTreeMap::new();
        let mut reconstructed_share = Group::one();

        for (available_guardian_id, compensated_share) in shares {
            let Some(part) = compensated_share
                .contests
                .get(&contest.object_id)
                .and_then(|c| c.selections.get(&selection.object_id))
            else {
                warn!(
                    missing_guardian_id,
                    available_guardian_id = %available_guardian_id,
                    object_id = %selection.object_id,
                    "compensated share is missing a selection"
                );
                return None;
            };
            let Some(coefficient) = lagrange_coefficients.get(available_guardian_id) else {
                warn!(
                    available_guardian_id = %available_guardian_id,
                    "no Lagrange coefficient for guardian"
                );
                return None;
            };

            reconstructed_share =
                reconstructed_share.mul(&part.share.exp(coefficient, group), group);
            recovered_parts.insert(available_guardian_id.clone(), part.clone());
        }

        selections.insert(
            selection.object_id.clone(),
            create_recovered_ciphertext_decryption_selection(
                selection.object_id.clone(),
                missing_guardian_id.to_owned(),
                reconstructed_share,
                recovered_parts,
            ),
        );
    }

    Some(CiphertextDecryptionContest {
        object_id: contest.object_id.clone(),
        guardian_id: missing_guardian_id.to_owned(),
        description_hash: contest.description_hash.clone(),
        selections,
    })
}

/// Computes the Lagrange coefficient of every available guardian against
/// the others, keyed by guardian id.
///
/// Returns `None` when sequence orders collide; they are required to be
/// unique across the ceremony.
pub fn compute_lagrange_coefficients_for_guardians(
    available_guardian_keys: &[ElectionPublicKey],
    field: &ScalarField,
) -> Option<BTreeMap<GuardianId, FieldElement>> {
    let mut coefficients = BTreeMap::new();
    for guardian_key in available_guardian_keys {
        let other_orders: Vec<u32> = available_guardian_keys
            .iter()
            .filter(|other| other.owner_id != guardian_key.owner_id)
            .map(|other| other.sequence_order)
            .collect();
        let coefficient =
            compute_lagrange_coefficient(guardian_key.sequence_order, &other_orders, field)?;
        coefficients.insert(guardian_key.owner_id.clone(), coefficient);
    }
    Some(coefficients)
}
