#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! Decryption shares: one guardian's contribution to decrypting a tally or
//! a spoiled ballot.
//!
//! A present guardian produces a [`CiphertextDecryptionSelection`] per
//! selection with a Chaum-Pedersen proof. For a missing guardian, each
//! present guardian produces [`CiphertextCompensatedDecryptionSelection`]s
//! from the missing guardian's backup coordinate; the reconstructed
//! selection then carries those recovered parts in place of a single proof.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use util::algebra::{FieldElement, GroupElement};

use crate::{
    chaum_pedersen::ChaumPedersenProof, el_gamal::ElGamalCiphertext,
    fixed_parameters::FixedParameters, GuardianId,
};

/// A share of one missing guardian's partial decryption, computed by one
/// present guardian.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CiphertextCompensatedDecryptionSelection {
    /// The selection this share decrypts.
    pub object_id: String,

    /// The present guardian who computed the share.
    pub guardian_id: GuardianId,

    /// The missing guardian being compensated for.
    pub missing_guardian_id: GuardianId,

    /// `A^{P_m(l)}` for ciphertext pad `A`, missing guardian `m`, present
    /// guardian sequence order `l`.
    pub share: GroupElement,

    /// `g^{P_m(l)}`, derived publicly from the missing guardian's
    /// commitments; the key the proof verifies against.
    pub recovery_key: GroupElement,

    /// Proof the share was computed with the backup coordinate.
    pub proof: ChaumPedersenProof,
}

/// One guardian's (real or reconstructed) partial decryption of one
/// selection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CiphertextDecryptionSelection {
    /// The selection this share decrypts.
    pub object_id: String,

    /// The guardian the share belongs to (the missing one, if
    /// reconstructed).
    pub guardian_id: GuardianId,

    /// The partial decryption `M_i = A^{s_i}`.
    pub share: GroupElement,

    /// Proof of correct partial decryption; present on directly computed
    /// shares.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<ChaumPedersenProof>,

    /// The compensated parts a reconstructed share was assembled from,
    /// keyed by the present guardian that computed each; present instead of
    /// `proof`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovered_parts: Option<BTreeMap<GuardianId, CiphertextCompensatedDecryptionSelection>>,
}

/// Builds a directly computed selection share.
pub fn create_ciphertext_decryption_selection(
    object_id: String,
    guardian_id: GuardianId,
    share: GroupElement,
    proof: ChaumPedersenProof,
) -> CiphertextDecryptionSelection {
    CiphertextDecryptionSelection {
        object_id,
        guardian_id,
        share,
        proof: Some(proof),
        recovered_parts: None,
    }
}

/// Builds a reconstructed selection share from compensated parts.
pub fn create_recovered_ciphertext_decryption_selection(
    object_id: String,
    missing_guardian_id: GuardianId,
    share: GroupElement,
    recovered_parts: BTreeMap<GuardianId, CiphertextCompensatedDecryptionSelection>,
) -> CiphertextDecryptionSelection {
    CiphertextDecryptionSelection {
        object_id,
        guardian_id: missing_guardian_id,
        share,
        proof: None,
        recovered_parts: Some(recovered_parts),
    }
}

impl CiphertextDecryptionSelection {
    /// Verifies this share against the ciphertext it decrypts.
    ///
    /// A direct share verifies its own proof against the guardian's public
    /// key. A reconstructed share verifies every recovered part against its
    /// recovery key. A share with neither proof nor parts is invalid.
    pub fn is_valid(
        &self,
        message: &ElGamalCiphertext,
        election_public_key: &GroupElement,
        extended_base_hash: &FieldElement,
        fixed_parameters: &FixedParameters,
    ) -> bool {
        match (&self.proof, &self.recovered_parts) {
            (Some(proof), _) => proof.is_valid(
                message,
                election_public_key,
                &self.share,
                extended_base_hash,
                fixed_parameters,
            ),
            (None, Some(parts)) => parts.values().all(|part| {
                part.proof.is_valid(
                    message,
                    &part.recovery_key,
                    &part.share,
                    extended_base_hash,
                    fixed_parameters,
                )
            }),
            (None, None) => {
                warn!(
                    object_id = %self.object_id,
                    guardian_id = %self.guardian_id,
                    "decryption selection has neither proof nor recovered parts"
                );
                false
            }
        }
    }
}

/// One guardian's selection shares for one contest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CiphertextDecryptionContest {
    pub object_id: String,
    pub guardian_id: GuardianId,
    pub description_hash: FieldElement,
    pub selections: BTreeMap<String, CiphertextDecryptionSelection>,
}

/// One present guardian's compensated selection shares for one contest of
/// one missing guardian.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CiphertextCompensatedDecryptionContest {
    pub object_id: String,
    pub guardian_id: GuardianId,
    pub missing_guardian_id: GuardianId,
    pub description_hash: FieldElement,
    pub selections: BTreeMap<String, CiphertextCompensatedDecryptionSelection>,
}

/// A guardian's full decryption share of one tally or ballot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecryptionShare {
    /// The tally or ballot this share decrypts.
    pub object_id: String,

    /// The guardian the share belongs to.
    pub guardian_id: GuardianId,

    /// The guardian's election public key.
    pub public_key: GroupElement,

    /// Contest shares keyed by contest object id.
    pub contests: BTreeMap<String, CiphertextDecryptionContest>,
}

/// A present guardian's full compensated share for one missing guardian.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompensatedDecryptionShare {
    /// The tally or ballot this share decrypts.
    pub object_id: String,

    /// The present guardian who computed the share.
    pub guardian_id: GuardianId,

    /// The missing guardian being compensated for.
    pub missing_guardian_id: GuardianId,

    /// The present guardian's election public key.
    pub public_key: GroupElement,

    /// Contest shares keyed by contest object id.
    pub contests: BTreeMap<String, CiphertextCompensatedDecryptionContest>,
}

/// Collects, for one selection, every guardian's share together with the
/// public key to validate it against.
pub fn get_shares_for_selection<'a>(
    selection_id: &str,
    shares: &'a BTreeMap<GuardianId, DecryptionShare>,
) -> BTreeMap<GuardianId, (GroupElement, &'a CiphertextDecryptionSelection)> {
    let mut found = BTreeMap::new();
    for (guardian_id, share) in shares {
        for contest in share.contests.values() {
            if let Some(selection) = contest.selections.get(selection_id) {
                found.insert(
                    guardian_id.clone(),
                    (share.public_key.clone(), selection),
                );
            }
        }
    }
    found
}
