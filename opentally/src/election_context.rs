#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! The ciphertext election context: everything an encrypter or verifier
//! needs to know about one election's cryptographic setup.
//!
//! The base hash `Q` binds the parameters `p`, `q`, `g`, the guardian
//! counts, and the manifest hash. The extended base hash `Q'` additionally
//! binds the joint public key, and is the hash header of every proof
//! challenge in the election.

use serde::{Deserialize, Serialize};

use util::algebra::{FieldElement, GroupElement};

use crate::{
    fixed_parameters::FixedParameters, hash_elems, varying_parameters::VaryingParameters,
};

/// The public cryptographic context of one election.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextElectionContext {
    /// The number of guardians `n`.
    pub number_of_guardians: u32,

    /// The quorum `k` required to decrypt.
    pub quorum: u32,

    /// The joint public key `K = ∏ K_i`.
    pub elgamal_public_key: GroupElement,

    /// The hash of all guardians' coefficient commitments.
    pub commitment_hash: FieldElement,

    /// The hash of the external manifest.
    pub manifest_hash: FieldElement,

    /// The base hash `Q = H(p, q, g, n, k, manifest_hash)`.
    pub crypto_base_hash: FieldElement,

    /// The extended base hash `Q' = H(Q, K)`.
    pub crypto_extended_base_hash: FieldElement,
}

/// Builds the context, deriving the base and extended base hashes.
pub fn make_ciphertext_election_context(
    varying_parameters: &VaryingParameters,
    elgamal_public_key: GroupElement,
    commitment_hash: FieldElement,
    manifest_hash: FieldElement,
    fixed_parameters: &FixedParameters,
) -> CiphertextElectionContext {
    let field = &fixed_parameters.field;

    let crypto_base_hash = hash_elems!(
        field;
        fixed_parameters.group.modulus(),
        field.order(),
        fixed_parameters.group.generator().as_biguint(),
        varying_parameters.n,
        varying_parameters.k,
        &manifest_hash
    );
    let crypto_extended_base_hash = hash_elems!(field; &crypto_base_hash, &elgamal_public_key);

    CiphertextElectionContext {
        number_of_guardians: varying_parameters.n,
        quorum: varying_parameters.k,
        elgamal_public_key,
        commitment_hash,
        manifest_hash,
        crypto_base_hash,
        crypto_extended_base_hash,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use util::{csprng::Csprng, pow_radix::PowRadixOption};

    use crate::{el_gamal::ElGamalKeyPair, standard_parameters::test_parameters};

    #[test]
    fn hashes_bind_the_joint_key() {
        let fp = test_parameters(PowRadixOption::NoAcceleration);
        let mut csprng = Csprng::new(b"context test");
        let manifest_hash = fp.field.random_field_elem(&mut csprng);
        let commitment_hash = fp.field.random_field_elem(&mut csprng);

        let key_1 = ElGamalKeyPair::random(&mut csprng, &fp);
        let key_2 = ElGamalKeyPair::random(&mut csprng, &fp);

        let varying_parameters = VaryingParameters { n: 3, k: 2 };
        let context_1 = make_ciphertext_election_context(
            &varying_parameters,
            key_1.public_key.clone(),
            commitment_hash.clone(),
            manifest_hash.clone(),
            &fp,
        );
        let context_2 = make_ciphertext_election_context(
            &varying_parameters,
            key_2.public_key.clone(),
            commitment_hash,
            manifest_hash,
            &fp,
        );

        // Same parameters, same base hash; different joint keys, different
        // extended base hashes.
        assert_eq!(context_1.crypto_base_hash, context_2.crypto_base_hash);
        assert_ne!(
            context_1.crypto_extended_base_hash,
            context_2.crypto_extended_base_hash
        );
    }
}
