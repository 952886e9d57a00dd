#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! The threshold key ceremony's data types and round operations.
//!
//! Each guardian generates an [`ElectionKeyPair`] whose secret is the
//! constant term of a secret polynomial. Guardians exchange encrypted
//! backups of each other's polynomial coordinates, verify what they
//! receive, and can challenge a backup publicly when verification fails.
//! Once every backup verifies, the guardians' public keys combine into the
//! [`ElectionJointKey`] every ballot is encrypted under.
//!
//! Backup transport is hashed ElGamal under the recipient's election public
//! key; there is no separate auxiliary key layer.

use serde::{Deserialize, Serialize};
use tracing::warn;
use zeroize::Zeroize;

use util::algebra::{FieldElement, GroupElement};
use util::csprng::Csprng;

use crate::{
    el_gamal::{
        elgamal_combine_public_keys, hashed_elgamal_encrypt, ElGamalKeyPair,
        HashedElGamalCiphertext,
    },
    election_polynomial::{
        compute_polynomial_coordinate, generate_polynomial, verify_polynomial_coordinate,
        ElectionPolynomial,
    },
    fixed_parameters::FixedParameters,
    hash::HashInput,
    hash_elems,
    schnorr::SchnorrProof,
    GuardianId,
};

/// How many guardians there are, and how many must cooperate to decrypt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CeremonyDetails {
    pub number_of_guardians: u32,
    pub quorum: u32,
}

/// The public part of a guardian's election key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElectionPublicKey {
    /// The owning guardian.
    pub owner_id: GuardianId,

    /// The guardian's sequence order; doubles as its Lagrange coordinate.
    pub sequence_order: u32,

    /// The election public key `K_i = g^{a_{i,0}}`; equal to the first
    /// coefficient commitment.
    pub key: GroupElement,

    /// The polynomial coefficient commitments `g^{a_{i,j}}`.
    pub coefficient_commitments: Vec<GroupElement>,

    /// A Schnorr proof of knowledge per coefficient.
    pub coefficient_proofs: Vec<SchnorrProof>,
}

impl PartialEq for ElectionPublicKey {
    fn eq(&self, other: &Self) -> bool {
        // Proofs are transcripts, not identity; two records for the same
        // guardian and commitments describe the same key.
        self.owner_id == other.owner_id
            && self.sequence_order == other.sequence_order
            && self.key == other.key
            && self.coefficient_commitments == other.coefficient_commitments
    }
}

impl ElectionPublicKey {
    /// Verifies every coefficient proof.
    pub fn is_valid(&self, fixed_parameters: &FixedParameters) -> bool {
        if self.coefficient_commitments.len() != self.coefficient_proofs.len() {
            warn!(
                owner_id = %self.owner_id,
                "public key has mismatched commitment and proof counts"
            );
            return false;
        }
        self.coefficient_proofs
            .iter()
            .zip(&self.coefficient_commitments)
            .all(|(proof, commitment)| {
                proof.public_key == *commitment && proof.is_valid(fixed_parameters)
            })
    }
}

/// A guardian's full election key: the key pair plus the polynomial that
/// shares it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElectionKeyPair {
    pub owner_id: GuardianId,
    pub sequence_order: u32,
    pub key_pair: ElGamalKeyPair,
    pub polynomial: ElectionPolynomial,
}

impl Zeroize for ElectionKeyPair {
    fn zeroize(&mut self) {
        self.key_pair.zeroize();
        self.polynomial.zeroize();
    }
}

impl ElectionKeyPair {
    /// Generates a fresh key pair for a guardian: a polynomial with
    /// `quorum` coefficients whose constant term is the secret key.
    pub fn generate(
        owner_id: impl Into<GuardianId>,
        sequence_order: u32,
        quorum: u32,
        csprng: &mut Csprng,
        seed: Option<&FieldElement>,
        fixed_parameters: &FixedParameters,
    ) -> Self {
        let polynomial = generate_polynomial(quorum, csprng, seed, fixed_parameters);
        let key_pair = ElGamalKeyPair {
            secret_key: polynomial.coefficients[0].clone(),
            public_key: polynomial.coefficient_commitments[0].clone(),
        };
        ElectionKeyPair {
            owner_id: owner_id.into(),
            sequence_order,
            key_pair,
            polynomial,
        }
    }

    /// The publishable part of the key.
    pub fn share(&self) -> ElectionPublicKey {
        ElectionPublicKey {
            owner_id: self.owner_id.clone(),
            sequence_order: self.sequence_order,
            key: self.key_pair.public_key.clone(),
            coefficient_commitments: self.polynomial.coefficient_commitments.clone(),
            coefficient_proofs: self.polynomial.coefficient_proofs.clone(),
        }
    }
}

/// The joint election key, published at the end of the ceremony.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionJointKey {
    /// `K = ∏ K_i mod p`.
    pub joint_public_key: GroupElement,

    /// The hash of every guardian's coefficient commitments, in sequence
    /// order.
    pub commitment_hash: FieldElement,
}

/// An encrypted backup of one polynomial coordinate, sent from its owner to
/// the designated guardian.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionPartialKeyBackup {
    /// The guardian whose polynomial was evaluated.
    pub owner_id: GuardianId,

    /// The guardian the backup is encrypted to.
    pub designated_id: GuardianId,

    /// The designated guardian's sequence order, the evaluation point.
    pub designated_sequence_order: u32,

    /// `P_owner(designated_sequence_order)`, encrypted to the designated
    /// guardian's election public key.
    pub encrypted_coordinate: HashedElGamalCiphertext,
}

/// One guardian's verdict on one backup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionPartialKeyVerification {
    pub owner_id: GuardianId,
    pub designated_id: GuardianId,
    pub verifier_id: GuardianId,
    pub verified: bool,
}

/// A public challenge: the disputed coordinate in the clear, with the
/// commitments anyone can verify it against.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElectionPartialKeyChallenge {
    pub owner_id: GuardianId,
    pub designated_id: GuardianId,
    pub designated_sequence_order: u32,
    pub value: FieldElement,
    pub coefficient_commitments: Vec<GroupElement>,
    pub coefficient_proofs: Vec<SchnorrProof>,
}

/// The seed binding a backup's encryption to its sender and recipient.
pub fn get_backup_seed(
    owner_id: &str,
    designated_sequence_order: u32,
    fixed_parameters: &FixedParameters,
) -> FieldElement {
    hash_elems!(&fixed_parameters.field; "backup", owner_id, designated_sequence_order)
}

/// Evaluates the owner's polynomial at the designated guardian's sequence
/// order and encrypts the coordinate to them.
pub fn generate_election_partial_key_backup(
    owner_id: &str,
    polynomial: &ElectionPolynomial,
    designated_key: &ElectionPublicKey,
    csprng: &mut Csprng,
    fixed_parameters: &FixedParameters,
) -> Option<ElectionPartialKeyBackup> {
    let field = &fixed_parameters.field;
    let coordinate =
        compute_polynomial_coordinate(designated_key.sequence_order, polynomial, field);
    let seed = get_backup_seed(owner_id, designated_key.sequence_order, fixed_parameters);
    let nonce = field.random_field_elem_min(csprng, 1_u8);

    let encrypted_coordinate = hashed_elgamal_encrypt(
        &coordinate.to_32_be_bytes(),
        &nonce,
        &designated_key.key,
        &seed,
        fixed_parameters,
    )?;

    Some(ElectionPartialKeyBackup {
        owner_id: owner_id.to_owned(),
        designated_id: designated_key.owner_id.clone(),
        designated_sequence_order: designated_key.sequence_order,
        encrypted_coordinate,
    })
}

/// Decrypts a backup addressed to `recipient_key_pair` and returns the
/// coordinate, or `None` when the MAC fails.
pub fn decrypt_backup(
    backup: &ElectionPartialKeyBackup,
    recipient_key_pair: &ElectionKeyPair,
    fixed_parameters: &FixedParameters,
) -> Option<FieldElement> {
    let seed = get_backup_seed(
        &backup.owner_id,
        backup.designated_sequence_order,
        fixed_parameters,
    );
    let bytes = backup
        .encrypted_coordinate
        .decrypt(&recipient_key_pair.key_pair.secret_key, &seed, fixed_parameters)
        .ok()?;
    Some(FieldElement::from_bytes_be(&bytes, &fixed_parameters.field))
}

/// Decrypts a received backup and checks the coordinate against the owner's
/// published commitments.
pub fn verify_election_partial_key_backup(
    verifier_id: &str,
    backup: &ElectionPartialKeyBackup,
    owner_public_key: &ElectionPublicKey,
    recipient_key_pair: &ElectionKeyPair,
    fixed_parameters: &FixedParameters,
) -> ElectionPartialKeyVerification {
    let verified = match decrypt_backup(backup, recipient_key_pair, fixed_parameters) {
        Some(coordinate) => verify_polynomial_coordinate(
            &coordinate,
            backup.designated_sequence_order,
            &owner_public_key.coefficient_commitments,
            fixed_parameters,
        ),
        None => {
            warn!(
                owner_id = %backup.owner_id,
                designated_id = %backup.designated_id,
                "backup failed to decrypt"
            );
            false
        }
    };

    ElectionPartialKeyVerification {
        owner_id: backup.owner_id.clone(),
        designated_id: backup.designated_id.clone(),
        verifier_id: verifier_id.to_owned(),
        verified,
    }
}

/// Produces the owner's answer to a failed verification: the coordinate in
/// the clear plus the commitments, for any guardian to check.
pub fn generate_election_partial_key_challenge(
    backup: &ElectionPartialKeyBackup,
    polynomial: &ElectionPolynomial,
    fixed_parameters: &FixedParameters,
) -> ElectionPartialKeyChallenge {
    ElectionPartialKeyChallenge {
        owner_id: backup.owner_id.clone(),
        designated_id: backup.designated_id.clone(),
        designated_sequence_order: backup.designated_sequence_order,
        value: compute_polynomial_coordinate(
            backup.designated_sequence_order,
            polynomial,
            &fixed_parameters.field,
        ),
        coefficient_commitments: polynomial.coefficient_commitments.clone(),
        coefficient_proofs: polynomial.coefficient_proofs.clone(),
    }
}

/// Verifies a published challenge. Any guardian can act as the alternate
/// verifier; no secrets are involved.
pub fn verify_election_partial_key_challenge(
    verifier_id: &str,
    challenge: &ElectionPartialKeyChallenge,
    fixed_parameters: &FixedParameters,
) -> ElectionPartialKeyVerification {
    ElectionPartialKeyVerification {
        owner_id: challenge.owner_id.clone(),
        designated_id: challenge.designated_id.clone(),
        verifier_id: verifier_id.to_owned(),
        verified: verify_polynomial_coordinate(
            &challenge.value,
            challenge.designated_sequence_order,
            &challenge.coefficient_commitments,
            fixed_parameters,
        ),
    }
}

/// Combines guardian public keys into the joint key and the commitment
/// hash. Keys are folded in sequence order regardless of input order.
pub fn combine_election_public_keys(
    election_public_keys: &[ElectionPublicKey],
    fixed_parameters: &FixedParameters,
) -> ElectionJointKey {
    let mut keys: Vec<&ElectionPublicKey> = election_public_keys.iter().collect();
    keys.sort_by_key(|k| k.sequence_order);

    let joint_public_key =
        elgamal_combine_public_keys(keys.iter().map(|k| &k.key), fixed_parameters);

    let commitments: Vec<&GroupElement> = keys
        .iter()
        .flat_map(|k| k.coefficient_commitments.iter())
        .collect();
    let commitment_hash = hash_elems!(
        &fixed_parameters.field;
        HashInput::sequence(commitments.iter().copied().map(HashInput::from))
    );

    ElectionJointKey {
        joint_public_key,
        commitment_hash,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use util::pow_radix::PowRadixOption;

    use crate::standard_parameters::test_parameters;

    fn setup() -> (FixedParameters, Csprng) {
        (
            test_parameters(PowRadixOption::NoAcceleration),
            Csprng::new(b"key ceremony test"),
        )
    }

    #[test]
    fn public_key_share_is_valid() {
        let (fp, mut csprng) = setup();
        let key_pair = ElectionKeyPair::generate("guardian-1", 1, 3, &mut csprng, None, &fp);
        let public_key = key_pair.share();
        assert!(public_key.is_valid(&fp));
        assert_eq!(public_key.key, public_key.coefficient_commitments[0]);
    }

    #[test]
    fn backup_round_trip_verifies() {
        let (fp, mut csprng) = setup();
        let owner = ElectionKeyPair::generate("guardian-1", 1, 2, &mut csprng, None, &fp);
        let designated = ElectionKeyPair::generate("guardian-2", 2, 2, &mut csprng, None, &fp);

        let backup = generate_election_partial_key_backup(
            &owner.owner_id,
            &owner.polynomial,
            &designated.share(),
            &mut csprng,
            &fp,
        )
        .unwrap();

        let verification = verify_election_partial_key_backup(
            "guardian-2",
            &backup,
            &owner.share(),
            &designated,
            &fp,
        );
        assert!(verification.verified);

        // The wrong recipient cannot even decrypt it.
        let outsider = ElectionKeyPair::generate("guardian-3", 3, 2, &mut csprng, None, &fp);
        let verification =
            verify_election_partial_key_backup("guardian-3", &backup, &owner.share(), &outsider, &fp);
        assert!(!verification.verified);
    }

    #[test]
    fn challenge_resolves_disputes() {
        let (fp, mut csprng) = setup();
        let owner = ElectionKeyPair::generate("guardian-1", 1, 2, &mut csprng, None, &fp);
        let designated = ElectionKeyPair::generate("guardian-2", 2, 2, &mut csprng, None, &fp);

        let backup = generate_election_partial_key_backup(
            &owner.owner_id,
            &owner.polynomial,
            &designated.share(),
            &mut csprng,
            &fp,
        )
        .unwrap();

        // An honest owner's challenge passes the alternate verifier.
        let challenge = generate_election_partial_key_challenge(&backup, &owner.polynomial, &fp);
        let verification = verify_election_partial_key_challenge("guardian-3", &challenge, &fp);
        assert!(verification.verified);

        // A challenge whose value is not on the polynomial fails.
        let mut forged = challenge;
        forged.value = forged.value.add(&util::algebra::ScalarField::one(), &fp.field);
        let verification = verify_election_partial_key_challenge("guardian-3", &forged, &fp);
        assert!(!verification.verified);
    }

    #[test]
    fn joint_key_is_input_order_independent() {
        let (fp, mut csprng) = setup();
        let keys: Vec<ElectionPublicKey> = (1u32..=3)
            .map(|i| {
                ElectionKeyPair::generate(format!("guardian-{i}"), i, 2, &mut csprng, None, &fp)
                    .share()
            })
            .collect();

        let forward = combine_election_public_keys(&keys, &fp);
        let reversed: Vec<ElectionPublicKey> = keys.iter().rev().cloned().collect();
        let backward = combine_election_public_keys(&reversed, &fp);

        assert_eq!(forward, backward);
    }
}
