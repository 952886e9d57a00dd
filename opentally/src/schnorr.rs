#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! Schnorr proofs of knowledge of an ElGamal secret key.
//!
//! The prover shows it knows `s` with `K = g^s` without revealing `s`. The
//! guardian key ceremony attaches one of these to every polynomial
//! coefficient commitment.

use serde::{Deserialize, Serialize};
use tracing::warn;

use util::algebra::{FieldElement, GroupElement};

use crate::{el_gamal::ElGamalKeyPair, fixed_parameters::FixedParameters, hash_elems};

/// A non-interactive Schnorr proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchnorrProof {
    /// The public key `K` the proof speaks for.
    pub public_key: GroupElement,

    /// Commitment `g^u` for the random nonce `u`.
    pub commitment: GroupElement,

    /// Challenge `c = H(K, commitment)`.
    pub challenge: FieldElement,

    /// Response `u + c * s mod q`.
    pub response: FieldElement,
}

/// Produces a proof of knowledge of `keypair.secret_key`.
///
/// The nonce must be drawn fresh for every proof; reusing one across two
/// proofs reveals the secret key.
pub fn make_schnorr_proof(
    keypair: &ElGamalKeyPair,
    nonce: &FieldElement,
    fixed_parameters: &FixedParameters,
) -> SchnorrProof {
    let field = &fixed_parameters.field;
    let group = &fixed_parameters.group;

    let commitment = group.g_exp(nonce);
    let challenge = hash_elems!(field; &keypair.public_key, &commitment);
    let response = nonce.add(&keypair.secret_key.mul(&challenge, field), field);

    SchnorrProof {
        public_key: keypair.public_key.clone(),
        commitment,
        challenge,
        response,
    }
}

impl SchnorrProof {
    /// Verifies the proof:
    /// the public key is a valid residue, the commitment and response are in
    /// bounds, the challenge matches the transcript hash, and
    /// `g^response == commitment * K^challenge`.
    pub fn is_valid(&self, fixed_parameters: &FixedParameters) -> bool {
        let field = &fixed_parameters.field;
        let group = &fixed_parameters.group;

        let valid_public_key = self.public_key.is_valid(group);
        let in_bounds_commitment = self.commitment.as_biguint() < group.modulus();
        let in_bounds_response = self.response.is_valid(field);

        let challenge = hash_elems!(field; &self.public_key, &self.commitment);
        let consistent_challenge = challenge == self.challenge;

        let consistent_response = group.g_exp(&self.response)
            == self
                .commitment
                .mul(&self.public_key.exp(&self.challenge, group), group);

        let success = valid_public_key
            && in_bounds_commitment
            && in_bounds_response
            && consistent_challenge
            && consistent_response;
        if !success {
            warn!(
                valid_public_key,
                in_bounds_commitment,
                in_bounds_response,
                consistent_challenge,
                consistent_response,
                "found an invalid Schnorr proof"
            );
        }
        success
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use util::{csprng::Csprng, pow_radix::PowRadixOption};

    use crate::standard_parameters::test_parameters;

    fn setup() -> (FixedParameters, Csprng) {
        (
            test_parameters(PowRadixOption::NoAcceleration),
            Csprng::new(b"schnorr test"),
        )
    }

    #[test]
    fn valid_proofs_verify() {
        let (fp, mut csprng) = setup();
        for _ in 0..10 {
            let keypair = ElGamalKeyPair::random(&mut csprng, &fp);
            let nonce = fp.field.random_field_elem(&mut csprng);
            let proof = make_schnorr_proof(&keypair, &nonce, &fp);
            assert!(proof.is_valid(&fp));
        }
    }

    #[test]
    fn any_tampered_component_fails() {
        let (fp, mut csprng) = setup();
        let keypair = ElGamalKeyPair::random(&mut csprng, &fp);
        let other = ElGamalKeyPair::random(&mut csprng, &fp);
        let nonce = fp.field.random_field_elem(&mut csprng);
        let proof = make_schnorr_proof(&keypair, &nonce, &fp);
        let one = util::algebra::ScalarField::one();

        let mut forged = proof.clone();
        forged.public_key = other.public_key.clone();
        assert!(!forged.is_valid(&fp), "tampered public key");

        let mut forged = proof.clone();
        forged.commitment = fp.group.g_exp(&fp.field.random_field_elem(&mut csprng));
        assert!(!forged.is_valid(&fp), "tampered commitment");

        let mut forged = proof.clone();
        forged.challenge = proof.challenge.add(&one, &fp.field);
        assert!(!forged.is_valid(&fp), "tampered challenge");

        let mut forged = proof.clone();
        forged.response = proof.response.add(&one, &fp.field);
        assert!(!forged.is_valid(&fp), "tampered response");
    }

    #[test]
    fn wrong_witness_fails() {
        let (fp, mut csprng) = setup();
        let keypair = ElGamalKeyPair::random(&mut csprng, &fp);
        let other = ElGamalKeyPair::random(&mut csprng, &fp);
        let nonce = fp.field.random_field_elem(&mut csprng);

        // A proof generated with someone else's secret but this public key.
        let mismatched = ElGamalKeyPair {
            secret_key: other.secret_key.clone(),
            public_key: keypair.public_key.clone(),
        };
        let proof = make_schnorr_proof(&mismatched, &nonce, &fp);
        assert!(!proof.is_valid(&fp));
    }
}
