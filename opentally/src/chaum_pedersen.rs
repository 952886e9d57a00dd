#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! Chaum-Pedersen proofs over ElGamal ciphertexts.
//!
//! Three variants cover the crate's needs:
//!
//! - [`DisjunctiveChaumPedersenProof`]: a ciphertext encrypts 0 **or** 1,
//!   attached to every ballot selection. The prover runs the real branch
//!   honestly and simulates the other, splitting one hash challenge across
//!   both.
//! - [`ConstantChaumPedersenProof`]: a ciphertext encrypts a known constant,
//!   attached to every contest accumulation to pin the selection total to
//!   the number of seats.
//! - [`ChaumPedersenProof`]: a guardian's partial decryption share was
//!   computed with the same secret as its public key (equality of discrete
//!   logs).
//!
//! All challenges are Fiat-Shamir hashes bound to the extended base hash, so
//! a transcript for one election never verifies in another. Proof nonces
//! come from a [`Nonces`] stream over a caller-supplied seed; generation
//! never touches a system RNG.

use serde::{Deserialize, Serialize};
use tracing::warn;

use util::algebra::{FieldElement, GroupElement};

use crate::{
    el_gamal::ElGamalCiphertext,
    fixed_parameters::FixedParameters,
    hash::HashInput,
    hash_elems,
    nonces::Nonces,
};

/// Proof that a ciphertext encrypts zero or one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisjunctiveChaumPedersenProof {
    /// `a0`, the zero-branch pad commitment.
    pub proof_zero_pad: GroupElement,
    /// `b0`, the zero-branch data commitment.
    pub proof_zero_data: GroupElement,
    /// `a1`, the one-branch pad commitment.
    pub proof_one_pad: GroupElement,
    /// `b1`, the one-branch data commitment.
    pub proof_one_data: GroupElement,
    /// `c0`, the zero-branch challenge.
    pub proof_zero_challenge: FieldElement,
    /// `c1`, the one-branch challenge.
    pub proof_one_challenge: FieldElement,
    /// `c = c0 + c1`, the joint hash challenge.
    pub challenge: FieldElement,
    /// `v0`, the zero-branch response.
    pub proof_zero_response: FieldElement,
    /// `v1`, the one-branch response.
    pub proof_one_response: FieldElement,
}

/// Proof of equality of discrete logs: a partial decryption share `M_i` was
/// raised with the same secret that defines the guardian's public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaumPedersenProof {
    /// `a = g^u`.
    pub pad: GroupElement,
    /// `b = A^u` for the ciphertext pad `A`.
    pub data: GroupElement,
    /// The hash challenge.
    pub challenge: FieldElement,
    /// `v = u + c * s mod q`.
    pub response: FieldElement,
}

/// Proof that a ciphertext encrypts a fixed, publicly known constant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantChaumPedersenProof {
    /// `a = g^u`.
    pub pad: GroupElement,
    /// `b = K^u`.
    pub data: GroupElement,
    /// The hash challenge.
    pub challenge: FieldElement,
    /// `v = u + c * r mod q` for the aggregate nonce `r`.
    pub response: FieldElement,
    /// The constant being proven, e.g. the contest's number of seats.
    pub constant: u64,
}

/// Produces a disjunctive proof for a ciphertext known to encrypt zero.
///
/// The one-branch is simulated with challenge and response drawn from the
/// seeded stream; the zero-branch runs honestly.
pub fn make_disjunctive_chaum_pedersen_zero(
    message: &ElGamalCiphertext,
    nonce: &FieldElement,
    public_key: &GroupElement,
    extended_base_hash: &FieldElement,
    seed: &FieldElement,
    fixed_parameters: &FixedParameters,
) -> DisjunctiveChaumPedersenProof {
    let field = &fixed_parameters.field;
    let group = &fixed_parameters.group;
    let (alpha, beta) = (&message.pad, &message.data);

    let nonces = Nonces::with_headers(
        seed,
        &[HashInput::Str("disjoint-chaum-pedersen-proof")],
        field,
    );
    let (c1, v1, u0) = (nonces.get(0), nonces.get(1), nonces.get(2));

    let a0 = group.g_exp(&u0);
    let b0 = public_key.exp(&u0, group);
    let q_minus_c1 = c1.negate(field);
    let a1 = group.g_exp(&v1).mul(&alpha.exp(&q_minus_c1, group), group);
    let b1 = public_key
        .exp(&v1, group)
        .mul(&group.g_exp(&c1), group)
        .mul(&beta.exp(&q_minus_c1, group), group);

    let challenge = hash_elems!(field; extended_base_hash, alpha, beta, &a0, &b0, &a1, &b1);
    let c0 = challenge.sub(&c1, field);
    let v0 = u0.add(&c0.mul(nonce, field), field);

    DisjunctiveChaumPedersenProof {
        proof_zero_pad: a0,
        proof_zero_data: b0,
        proof_one_pad: a1,
        proof_one_data: b1,
        proof_zero_challenge: c0,
        proof_one_challenge: c1,
        challenge,
        proof_zero_response: v0,
        proof_one_response: v1,
    }
}

/// Produces a disjunctive proof for a ciphertext known to encrypt one.
///
/// Mirror image of [`make_disjunctive_chaum_pedersen_zero`]: the zero-branch
/// is simulated, the one-branch runs honestly.
pub fn make_disjunctive_chaum_pedersen_one(
    message: &ElGamalCiphertext,
    nonce: &FieldElement,
    public_key: &GroupElement,
    extended_base_hash: &FieldElement,
    seed: &FieldElement,
    fixed_parameters: &FixedParameters,
) -> DisjunctiveChaumPedersenProof {
    let field = &fixed_parameters.field;
    let group = &fixed_parameters.group;
    let (alpha, beta) = (&message.pad, &message.data);

    let nonces = Nonces::with_headers(
        seed,
        &[HashInput::Str("disjoint-chaum-pedersen-proof")],
        field,
    );
    let (c0, v0, u1) = (nonces.get(0), nonces.get(1), nonces.get(2));

    let q_minus_c0 = c0.negate(field);
    let a0 = group.g_exp(&v0).mul(&alpha.exp(&q_minus_c0, group), group);
    let b0 = public_key
        .exp(&v0, group)
        .mul(&beta.exp(&q_minus_c0, group), group);
    let a1 = group.g_exp(&u1);
    let b1 = public_key.exp(&u1, group);

    let challenge = hash_elems!(field; extended_base_hash, alpha, beta, &a0, &b0, &a1, &b1);
    let c1 = challenge.sub(&c0, field);
    let v1 = u1.add(&c1.mul(nonce, field), field);

    DisjunctiveChaumPedersenProof {
        proof_zero_pad: a0,
        proof_zero_data: b0,
        proof_one_pad: a1,
        proof_one_data: b1,
        proof_zero_challenge: c0,
        proof_one_challenge: c1,
        challenge,
        proof_zero_response: v0,
        proof_one_response: v1,
    }
}

/// Produces a disjunctive proof for a ciphertext encrypting `plaintext`.
///
/// Returns `None` for any plaintext other than 0 or 1; the proof shape
/// cannot express anything else.
pub fn make_disjunctive_chaum_pedersen(
    message: &ElGamalCiphertext,
    nonce: &FieldElement,
    public_key: &GroupElement,
    extended_base_hash: &FieldElement,
    seed: &FieldElement,
    plaintext: u64,
    fixed_parameters: &FixedParameters,
) -> Option<DisjunctiveChaumPedersenProof> {
    match plaintext {
        0 => Some(make_disjunctive_chaum_pedersen_zero(
            message,
            nonce,
            public_key,
            extended_base_hash,
            seed,
            fixed_parameters,
        )),
        1 => Some(make_disjunctive_chaum_pedersen_one(
            message,
            nonce,
            public_key,
            extended_base_hash,
            seed,
            fixed_parameters,
        )),
        _ => {
            warn!(plaintext, "disjunctive proofs require a plaintext of 0 or 1");
            None
        }
    }
}

impl DisjunctiveChaumPedersenProof {
    /// Verifies the proof against a ciphertext and public key.
    pub fn is_valid(
        &self,
        message: &ElGamalCiphertext,
        public_key: &GroupElement,
        extended_base_hash: &FieldElement,
        fixed_parameters: &FixedParameters,
    ) -> bool {
        let field = &fixed_parameters.field;
        let group = &fixed_parameters.group;
        let (alpha, beta) = (&message.pad, &message.data);
        let (a0, b0) = (&self.proof_zero_pad, &self.proof_zero_data);
        let (a1, b1) = (&self.proof_one_pad, &self.proof_one_data);
        let (c0, c1, c) = (
            &self.proof_zero_challenge,
            &self.proof_one_challenge,
            &self.challenge,
        );
        let (v0, v1) = (&self.proof_zero_response, &self.proof_one_response);

        let in_bounds_alpha = alpha.is_valid(group);
        let in_bounds_beta = beta.is_valid(group);
        let in_bounds_a0 = a0.is_valid(group);
        let in_bounds_b0 = b0.is_valid(group);
        let in_bounds_a1 = a1.is_valid(group);
        let in_bounds_b1 = b1.is_valid(group);
        let in_bounds_c0 = c0.is_valid(field);
        let in_bounds_c1 = c1.is_valid(field);
        let in_bounds_v0 = v0.is_valid(field);
        let in_bounds_v1 = v1.is_valid(field);

        let expected_challenge =
            hash_elems!(field; extended_base_hash, alpha, beta, a0, b0, a1, b1);
        let consistent_c = *c == expected_challenge && *c == c0.add(c1, field);

        // Branch equations.
        let consistent_gv0 = group.g_exp(v0) == a0.mul(&alpha.exp(c0, group), group);
        let consistent_gv1 = group.g_exp(v1) == a1.mul(&alpha.exp(c1, group), group);
        let consistent_kv0 = public_key.exp(v0, group) == b0.mul(&beta.exp(c0, group), group);
        let consistent_gc1kv1 = group.g_exp(c1).mul(&public_key.exp(v1, group), group)
            == b1.mul(&beta.exp(c1, group), group);

        let success = in_bounds_alpha
            && in_bounds_beta
            && in_bounds_a0
            && in_bounds_b0
            && in_bounds_a1
            && in_bounds_b1
            && in_bounds_c0
            && in_bounds_c1
            && in_bounds_v0
            && in_bounds_v1
            && consistent_c
            && consistent_gv0
            && consistent_gv1
            && consistent_kv0
            && consistent_gc1kv1;
        if !success {
            warn!(
                in_bounds_alpha,
                in_bounds_beta,
                in_bounds_a0,
                in_bounds_b0,
                in_bounds_a1,
                in_bounds_b1,
                in_bounds_c0,
                in_bounds_c1,
                in_bounds_v0,
                in_bounds_v1,
                consistent_c,
                consistent_gv0,
                consistent_gv1,
                consistent_kv0,
                consistent_gc1kv1,
                "found an invalid disjunctive Chaum-Pedersen proof"
            );
        }
        success
    }
}

/// Produces a proof that `m = A^s` for the ciphertext `(A, B)` and the
/// secret `s` behind the prover's public key.
pub fn make_chaum_pedersen(
    message: &ElGamalCiphertext,
    secret: &FieldElement,
    m: &GroupElement,
    seed: &FieldElement,
    extended_base_hash: &FieldElement,
    fixed_parameters: &FixedParameters,
) -> ChaumPedersenProof {
    let field = &fixed_parameters.field;
    let group = &fixed_parameters.group;
    let (alpha, beta) = (&message.pad, &message.data);

    let nonces = Nonces::with_headers(seed, &[HashInput::Str("chaum-pedersen-proof")], field);
    let u = nonces.get(0);

    let pad = group.g_exp(&u);
    let data = alpha.exp(&u, group);
    let challenge = hash_elems!(field; extended_base_hash, alpha, beta, &pad, &data, m);
    let response = u.add(&challenge.mul(secret, field), field);

    ChaumPedersenProof {
        pad,
        data,
        challenge,
        response,
    }
}

impl ChaumPedersenProof {
    /// Verifies the proof against a ciphertext, the prover's public key, and
    /// the claimed partial decryption `m`.
    pub fn is_valid(
        &self,
        message: &ElGamalCiphertext,
        public_key: &GroupElement,
        m: &GroupElement,
        extended_base_hash: &FieldElement,
        fixed_parameters: &FixedParameters,
    ) -> bool {
        let field = &fixed_parameters.field;
        let group = &fixed_parameters.group;
        let (alpha, beta) = (&message.pad, &message.data);
        let (a, b) = (&self.pad, &self.data);
        let (c, v) = (&self.challenge, &self.response);

        let in_bounds_alpha = alpha.is_valid(group);
        let in_bounds_beta = beta.is_valid(group);
        let in_bounds_a = a.is_valid(group);
        let in_bounds_b = b.is_valid(group);
        let in_bounds_response = v.is_valid(field);

        let expected_challenge = hash_elems!(field; extended_base_hash, alpha, beta, a, b, m);
        let consistent_c = *c == expected_challenge;

        // g^v == a * K^c
        let consistent_gv = group.g_exp(v) == a.mul(&public_key.exp(c, group), group);

        // A^v == b * M^c
        let consistent_av = alpha.exp(v, group) == b.mul(&m.exp(c, group), group);

        let success = in_bounds_alpha
            && in_bounds_beta
            && in_bounds_a
            && in_bounds_b
            && in_bounds_response
            && consistent_c
            && consistent_gv
            && consistent_av;
        if !success {
            warn!(
                in_bounds_alpha,
                in_bounds_beta,
                in_bounds_a,
                in_bounds_b,
                in_bounds_response,
                consistent_c,
                consistent_gv,
                consistent_av,
                "found an invalid Chaum-Pedersen proof"
            );
        }
        success
    }
}

/// Produces a proof that a ciphertext encrypts `constant`, using the
/// aggregate nonce `r` of the accumulated ciphertext as witness.
pub fn make_constant_chaum_pedersen(
    message: &ElGamalCiphertext,
    constant: u64,
    nonce: &FieldElement,
    public_key: &GroupElement,
    seed: &FieldElement,
    extended_base_hash: &FieldElement,
    fixed_parameters: &FixedParameters,
) -> ConstantChaumPedersenProof {
    let field = &fixed_parameters.field;
    let group = &fixed_parameters.group;
    let (alpha, beta) = (&message.pad, &message.data);

    let nonces = Nonces::with_headers(
        seed,
        &[HashInput::Str("constant-chaum-pedersen-proof")],
        field,
    );
    let u = nonces.get(0);

    let pad = group.g_exp(&u);
    let data = public_key.exp(&u, group);
    let challenge = hash_elems!(field; extended_base_hash, alpha, beta, &pad, &data);
    let response = u.add(&challenge.mul(nonce, field), field);

    ConstantChaumPedersenProof {
        pad,
        data,
        challenge,
        response,
        constant,
    }
}

impl ConstantChaumPedersenProof {
    /// Verifies the proof against a ciphertext and public key.
    pub fn is_valid(
        &self,
        message: &ElGamalCiphertext,
        public_key: &GroupElement,
        extended_base_hash: &FieldElement,
        fixed_parameters: &FixedParameters,
    ) -> bool {
        let field = &fixed_parameters.field;
        let group = &fixed_parameters.group;
        let (alpha, beta) = (&message.pad, &message.data);
        let (a, b) = (&self.pad, &self.data);
        let (c, v) = (&self.challenge, &self.response);

        let in_bounds_alpha = alpha.is_valid(group);
        let in_bounds_beta = beta.is_valid(group);
        let in_bounds_a = a.is_valid(group);
        let in_bounds_b = b.is_valid(group);
        let in_bounds_response = v.is_valid(field);

        let expected_challenge = hash_elems!(field; extended_base_hash, alpha, beta, a, b);
        let consistent_c = *c == expected_challenge;

        // g^v == a * A^c
        let consistent_gv = group.g_exp(v) == a.mul(&alpha.exp(c, group), group);

        // g^(L * c) * K^v == b * B^c
        let constant = FieldElement::from(self.constant, field);
        let consistent_constant = group
            .g_exp(&constant.mul(c, field))
            .mul(&public_key.exp(v, group), group)
            == b.mul(&beta.exp(c, group), group);

        let success = in_bounds_alpha
            && in_bounds_beta
            && in_bounds_a
            && in_bounds_b
            && in_bounds_response
            && consistent_c
            && consistent_gv
            && consistent_constant;
        if !success {
            warn!(
                in_bounds_alpha,
                in_bounds_beta,
                in_bounds_a,
                in_bounds_b,
                in_bounds_response,
                consistent_c,
                consistent_gv,
                consistent_constant,
                "found an invalid constant Chaum-Pedersen proof"
            );
        }
        success
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use util::{csprng::Csprng, pow_radix::PowRadixOption};

    use crate::{
        el_gamal::{elgamal_add, elgamal_encrypt, ElGamalKeyPair},
        standard_parameters::test_parameters,
    };

    struct Setup {
        fp: FixedParameters,
        csprng: Csprng,
        keypair: ElGamalKeyPair,
        extended_base_hash: FieldElement,
    }

    fn setup(seed: &[u8]) -> Setup {
        let fp = test_parameters(PowRadixOption::NoAcceleration);
        let mut csprng = Csprng::new(seed);
        let keypair = ElGamalKeyPair::random(&mut csprng, &fp);
        let extended_base_hash = fp.field.random_field_elem(&mut csprng);
        Setup {
            fp,
            csprng,
            keypair,
            extended_base_hash,
        }
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn disjunctive_proofs_complete() {
        let mut s = setup(b"disjunctive completeness");
        for plaintext in [0u64, 1] {
            let nonce = s.fp.field.random_field_elem_min(&mut s.csprng, 1_u8);
            let seed = s.fp.field.random_field_elem(&mut s.csprng);
            let message =
                elgamal_encrypt(plaintext, &nonce, &s.keypair.public_key, &s.fp).unwrap();
            let proof = make_disjunctive_chaum_pedersen(
                &message,
                &nonce,
                &s.keypair.public_key,
                &s.extended_base_hash,
                &seed,
                plaintext,
                &s.fp,
            )
            .unwrap();
            assert!(proof.is_valid(
                &message,
                &s.keypair.public_key,
                &s.extended_base_hash,
                &s.fp
            ));
        }
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn disjunctive_proof_rejects_two() {
        let mut s = setup(b"disjunctive two");
        let nonce = s.fp.field.random_field_elem_min(&mut s.csprng, 1_u8);
        let seed = s.fp.field.random_field_elem(&mut s.csprng);
        let message = elgamal_encrypt(2, &nonce, &s.keypair.public_key, &s.fp).unwrap();

        assert!(make_disjunctive_chaum_pedersen(
            &message,
            &nonce,
            &s.keypair.public_key,
            &s.extended_base_hash,
            &seed,
            2,
            &s.fp,
        )
        .is_none());

        // Lying with the zero-branch prover does not help: the proof fails.
        let proof = make_disjunctive_chaum_pedersen_zero(
            &message,
            &nonce,
            &s.keypair.public_key,
            &s.extended_base_hash,
            &seed,
            &s.fp,
        );
        assert!(!proof.is_valid(
            &message,
            &s.keypair.public_key,
            &s.extended_base_hash,
            &s.fp
        ));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn disjunctive_proof_wrong_branch_fails() {
        let mut s = setup(b"disjunctive wrong branch");
        let nonce = s.fp.field.random_field_elem_min(&mut s.csprng, 1_u8);
        let seed = s.fp.field.random_field_elem(&mut s.csprng);
        let message = elgamal_encrypt(0, &nonce, &s.keypair.public_key, &s.fp).unwrap();

        // Claiming the ciphertext encrypts one when it encrypts zero.
        let proof = make_disjunctive_chaum_pedersen_one(
            &message,
            &nonce,
            &s.keypair.public_key,
            &s.extended_base_hash,
            &seed,
            &s.fp,
        );
        assert!(!proof.is_valid(
            &message,
            &s.keypair.public_key,
            &s.extended_base_hash,
            &s.fp
        ));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn decryption_proof_completeness_and_binding() {
        let mut s = setup(b"decryption proof");
        let nonce = s.fp.field.random_field_elem_min(&mut s.csprng, 1_u8);
        let seed = s.fp.field.random_field_elem(&mut s.csprng);
        let message = elgamal_encrypt(1, &nonce, &s.keypair.public_key, &s.fp).unwrap();

        let m = message.partial_decrypt(&s.keypair.secret_key, &s.fp);
        let proof = make_chaum_pedersen(
            &message,
            &s.keypair.secret_key,
            &m,
            &seed,
            &s.extended_base_hash,
            &s.fp,
        );
        assert!(proof.is_valid(
            &message,
            &s.keypair.public_key,
            &m,
            &s.extended_base_hash,
            &s.fp
        ));

        // A different claimed share must not verify.
        let wrong_m = m.mul(&s.fp.group.generator(), &s.fp.group);
        assert!(!proof.is_valid(
            &message,
            &s.keypair.public_key,
            &wrong_m,
            &s.extended_base_hash,
            &s.fp
        ));

        // Nor a different election context.
        let other_hash = s.fp.field.random_field_elem(&mut s.csprng);
        assert!(!proof.is_valid(&message, &s.keypair.public_key, &m, &other_hash, &s.fp));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn constant_proof_completeness_and_binding() {
        let mut s = setup(b"constant proof");
        let n1 = s.fp.field.random_field_elem_min(&mut s.csprng, 1_u8);
        let n2 = s.fp.field.random_field_elem_min(&mut s.csprng, 1_u8);
        let seed = s.fp.field.random_field_elem(&mut s.csprng);

        let c1 = elgamal_encrypt(1, &n1, &s.keypair.public_key, &s.fp).unwrap();
        let c2 = elgamal_encrypt(0, &n2, &s.keypair.public_key, &s.fp).unwrap();
        let accumulation = elgamal_add([&c1, &c2], &s.fp);
        let aggregate_nonce = n1.add(&n2, &s.fp.field);

        let proof = make_constant_chaum_pedersen(
            &accumulation,
            1,
            &aggregate_nonce,
            &s.keypair.public_key,
            &seed,
            &s.extended_base_hash,
            &s.fp,
        );
        assert!(proof.is_valid(
            &accumulation,
            &s.keypair.public_key,
            &s.extended_base_hash,
            &s.fp
        ));

        // The same transcript with a different claimed constant fails.
        let mut forged = proof.clone();
        forged.constant = 2;
        assert!(!forged.is_valid(
            &accumulation,
            &s.keypair.public_key,
            &s.extended_base_hash,
            &s.fp
        ));
    }
}
