#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! The fixed cryptographic parameters: the primes `p` and `q`, the cofactor
//! `r = (p - 1)/q`, and the subgroup generator `g`.
//!
//! Two parameter sets are published: [`standard_parameters`] with a 4096-bit
//! modulus for real elections, and [`test_parameters`] with small primes for
//! unit testing. A parameter set is constructed once at startup and passed by
//! reference to every operation that needs it; nothing here is process-global.
//!
//! [`standard_parameters`]: crate::standard_parameters::standard_parameters
//! [`test_parameters`]: crate::standard_parameters::test_parameters

use anyhow::{ensure, Result};
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use util::{
    algebra::{Group, ScalarField},
    csprng::Csprng,
};

/// The fixed parameters defining the field `Z_q` and the group `Z_p^r`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedParameters {
    /// Prime field `Z_q`.
    pub field: ScalarField,

    /// Group `Z_p^r` of order `q`, including the generator `g`.
    pub group: Group,

    /// Cofactor `r = (p - 1)/q`.
    #[serde(
        serialize_with = "util::serde::biguint_serialize_hex",
        deserialize_with = "util::serde::biguint_deserialize_hex"
    )]
    pub cofactor: BigUint,
}

impl FixedParameters {
    /// Verifies that the parameters meet the structural requirements:
    /// `p` and `q` prime, `g` a generator of the order-`q` subgroup, and the
    /// cofactor consistent with `p` and `q`.
    ///
    /// The checks are expensive; they are meant for startup, not per-call
    /// use.
    pub fn validate(&self, csprng: &mut Csprng) -> Result<()> {
        let field = &self.field;
        let group = &self.group;

        ensure!(field.is_valid(csprng), "The field order q is not prime");
        ensure!(group.is_valid(csprng), "The group is invalid");
        ensure!(
            group.matches_field(field),
            "The orders of group and field differ"
        );

        let p_minus_1 = group.modulus() - BigUint::one();
        let (quotient, remainder) = p_minus_1.div_rem(field.order());
        ensure!(
            remainder.is_zero() && quotient == self.cofactor,
            "The cofactor is not (p - 1)/q"
        );

        Ok(())
    }

    /// The length in bytes of the canonical encoding of an element mod `p`.
    pub fn p_len_bytes(&self) -> usize {
        self.group.p_len_bytes()
    }

    /// The length in bytes of the canonical encoding of an element mod `q`.
    pub fn q_len_bytes(&self) -> usize {
        self.field.q_len_bytes()
    }
}
