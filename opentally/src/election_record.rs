#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! The publishable records external verifiers consume.
//!
//! Serialization formats and file layout are a caller concern; these types
//! only fix the content: guardian records, the published tally, and the
//! Lagrange coefficients used during decryption.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use util::algebra::{FieldElement, GroupElement};

use crate::{
    key_ceremony::ElectionPublicKey, schnorr::SchnorrProof, tally::CiphertextTallyContest,
    GuardianId,
};

/// The published record of one guardian's ceremony output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GuardianRecord {
    pub guardian_id: GuardianId,
    pub sequence_order: u32,
    pub election_public_key: GroupElement,
    pub election_commitments: Vec<GroupElement>,
    pub election_proofs: Vec<SchnorrProof>,
}

impl From<&ElectionPublicKey> for GuardianRecord {
    fn from(key: &ElectionPublicKey) -> Self {
        GuardianRecord {
            guardian_id: key.owner_id.clone(),
            sequence_order: key.sequence_order,
            election_public_key: key.key.clone(),
            election_commitments: key.coefficient_commitments.clone(),
            election_proofs: key.coefficient_proofs.clone(),
        }
    }
}

/// The ciphertext tally as published: accumulators only, no ballot-id
/// bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedCiphertextTally {
    pub object_id: String,
    pub contests: BTreeMap<String, CiphertextTallyContest>,
}

/// The Lagrange coefficients used to reconstruct missing shares, published
/// so verifiers can recompute the reconstruction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LagrangeCoefficientsRecord {
    pub coefficients: BTreeMap<GuardianId, FieldElement>,
}
