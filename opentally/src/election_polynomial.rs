#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! The secret sharing polynomial behind a guardian's election key.
//!
//! A guardian with quorum `k` draws a degree-`(k-1)` polynomial over `Z_q`.
//! The constant term is the guardian's secret key; `g^a_j` commitments and a
//! Schnorr proof per coefficient are published. Evaluations at other
//! guardians' sequence orders become the encrypted backups that make
//! compensated decryption possible.

use serde::{Deserialize, Serialize};
use tracing::warn;
use zeroize::Zeroize;

use util::algebra::{FieldElement, Group, GroupElement, ScalarField};
use util::csprng::Csprng;

use crate::{
    el_gamal::ElGamalKeyPair,
    fixed_parameters::FixedParameters,
    hash::HashInput,
    nonces::Nonces,
    schnorr::{make_schnorr_proof, SchnorrProof},
};

/// A secret polynomial with its public commitments and proofs.
///
/// `coefficients[0]` is the guardian's secret key and
/// `coefficient_commitments[0]` its public key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElectionPolynomial {
    /// The secret coefficients `a_j`.
    pub coefficients: Vec<FieldElement>,

    /// The published commitments `g^a_j`.
    pub coefficient_commitments: Vec<GroupElement>,

    /// A proof of knowledge for every coefficient.
    pub coefficient_proofs: Vec<SchnorrProof>,
}

impl Zeroize for ElectionPolynomial {
    fn zeroize(&mut self) {
        for coefficient in &mut self.coefficients {
            coefficient.zeroize();
        }
    }
}

/// Generates a polynomial with `number_of_coefficients` coefficients.
///
/// With a seed, both the coefficients and the proof nonces derive from
/// nonce streams over it, so the whole polynomial is reproducible; without
/// one, everything is drawn from `csprng`.
pub fn generate_polynomial(
    number_of_coefficients: u32,
    csprng: &mut Csprng,
    seed: Option<&FieldElement>,
    fixed_parameters: &FixedParameters,
) -> ElectionPolynomial {
    let field = &fixed_parameters.field;

    let seeded_streams = seed.map(|seed| {
        (
            Nonces::with_headers(seed, &[HashInput::Str("polynomial-coefficient")], field),
            Nonces::with_headers(seed, &[HashInput::Str("polynomial-proof-nonce")], field),
        )
    });

    let mut coefficients = Vec::with_capacity(number_of_coefficients as usize);
    let mut coefficient_commitments = Vec::with_capacity(number_of_coefficients as usize);
    let mut coefficient_proofs = Vec::with_capacity(number_of_coefficients as usize);

    for j in 0..number_of_coefficients as usize {
        let (coefficient, proof_nonce) = match &seeded_streams {
            Some((coefficient_nonces, proof_nonces)) => {
                (coefficient_nonces.get(j), proof_nonces.get(j))
            }
            None => (
                field.random_field_elem(csprng),
                field.random_field_elem(csprng),
            ),
        };

        let commitment = fixed_parameters.group.g_exp(&coefficient);
        let proof = make_schnorr_proof(
            &ElGamalKeyPair {
                secret_key: coefficient.clone(),
                public_key: commitment.clone(),
            },
            &proof_nonce,
            fixed_parameters,
        );

        coefficients.push(coefficient);
        coefficient_commitments.push(commitment);
        coefficient_proofs.push(proof);
    }

    ElectionPolynomial {
        coefficients,
        coefficient_commitments,
        coefficient_proofs,
    }
}

/// Evaluates the polynomial at `exponent_modifier` (a guardian sequence
/// order) using Horner's method.
pub fn compute_polynomial_coordinate(
    exponent_modifier: u32,
    polynomial: &ElectionPolynomial,
    field: &ScalarField,
) -> FieldElement {
    let x = FieldElement::from(exponent_modifier, field);
    let mut value = ScalarField::zero();
    for coefficient in polynomial.coefficients.iter().rev() {
        value = value.mul(&x, field).add(coefficient, field);
    }
    value
}

/// Checks `g^coordinate == ∏_j commitments[j]^(x^j)` for
/// `x = exponent_modifier`, i.e. that the claimed coordinate lies on the
/// committed polynomial.
pub fn verify_polynomial_coordinate(
    coordinate: &FieldElement,
    exponent_modifier: u32,
    coefficient_commitments: &[GroupElement],
    fixed_parameters: &FixedParameters,
) -> bool {
    let field = &fixed_parameters.field;
    let group = &fixed_parameters.group;

    let x = FieldElement::from(exponent_modifier, field);
    let commitment_output = coefficient_commitments
        .iter()
        .enumerate()
        .fold(Group::one(), |product, (j, commitment)| {
            let x_pow_j = x.pow(j as u32, field);
            product.mul(&commitment.exp(&x_pow_j, group), group)
        });

    fixed_parameters.group.g_exp(coordinate) == commitment_output
}

/// Computes the Lagrange coefficient at zero for `coordinate` against the
/// other guardians' coordinates: `∏ x_l / (x_l - coordinate) mod q`.
///
/// Returns `None` when any `x_l` equals `coordinate`; sequence orders must
/// be unique across guardians.
pub fn compute_lagrange_coefficient(
    coordinate: u32,
    degrees: &[u32],
    field: &ScalarField,
) -> Option<FieldElement> {
    let coordinate_elem = FieldElement::from(coordinate, field);

    let numerator = degrees
        .iter()
        .fold(ScalarField::one(), |product, &degree| {
            product.mul(&FieldElement::from(degree, field), field)
        });
    let denominator = degrees
        .iter()
        .fold(ScalarField::one(), |product, &degree| {
            let difference = FieldElement::from(degree, field).sub(&coordinate_elem, field);
            product.mul(&difference, field)
        });

    let Some(result) = numerator.div(&denominator, field) else {
        warn!(
            coordinate,
            "Lagrange coefficient undefined: duplicate sequence orders"
        );
        return None;
    };
    Some(result)
}
