#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! Wrappers around `BigUint` that separate field elements (`Z_q`) from group
//! elements (`Z_p^r`) at the type level. Every operation takes the field or
//! group it works in as an explicit argument; no modulus is ever global.

use crate::{
    algebra_utils::{cnt_bits_repr, mod_inverse, to_be_bytes_left_pad, to_hex_even},
    csprng::Csprng,
    pow_radix::{PowRadix, PowRadixOption},
    prime::is_prime,
};
use num_bigint::BigUint;
use num_traits::{Num, One, Zero};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use zeroize::Zeroize;

/// An element of the field `Z_q` as defined by [`ScalarField`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct FieldElement(
    #[serde(
        serialize_with = "crate::serde::biguint_serialize_hex",
        deserialize_with = "crate::serde::biguint_deserialize_hex"
    )]
    BigUint,
);

/// The finite field `Z_q` of integers modulo the prime `q`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScalarField {
    /// Subgroup order.
    #[serde(
        serialize_with = "crate::serde::biguint_serialize_hex",
        deserialize_with = "crate::serde::biguint_deserialize_hex"
    )]
    q: BigUint,
}

impl FieldElement {
    /// The numeric value of the field element. Guaranteed `< q` for elements
    /// built through the checked constructors.
    pub fn value(&self) -> &BigUint {
        &self.0
    }

    /// Computes `(self + other) % q`.
    pub fn add(&self, other: &FieldElement, field: &ScalarField) -> Self {
        FieldElement((&self.0 + &other.0) % &field.q)
    }

    /// Computes `(self - other) % q`.
    pub fn sub(&self, other: &FieldElement, field: &ScalarField) -> Self {
        if self.0 >= other.0 {
            FieldElement((&self.0 - &other.0) % &field.q)
        } else {
            FieldElement((&field.q - (&other.0 - &self.0) % &field.q) % &field.q)
        }
    }

    /// Computes `(q - self) % q`, the additive inverse.
    pub fn negate(&self, field: &ScalarField) -> Self {
        if self.0.is_zero() {
            FieldElement(BigUint::zero())
        } else {
            FieldElement(&field.q - (&self.0 % &field.q))
        }
    }

    /// Computes `(self * other) % q`.
    pub fn mul(&self, other: &FieldElement, field: &ScalarField) -> Self {
        FieldElement((&self.0 * &other.0) % &field.q)
    }

    /// Computes the multiplicative inverse in `Z_q`, if it exists
    /// (i.e. iff `gcd(self, q) == 1`).
    pub fn inv(&self, field: &ScalarField) -> Option<Self> {
        mod_inverse(&self.0, &field.q).map(FieldElement)
    }

    /// Computes `self / other % q`, if `other` is invertible.
    pub fn div(&self, other: &FieldElement, field: &ScalarField) -> Option<Self> {
        other.inv(field).map(|inv| self.mul(&inv, field))
    }

    /// Modular exponentiation with an integer exponent.
    pub fn pow(&self, exponent: impl Into<BigUint>, field: &ScalarField) -> FieldElement {
        let x = exponent.into();
        FieldElement(self.0.modpow(&x, &field.q))
    }

    /// Creates a field element from an integer, reducing mod `q`.
    pub fn from<T>(x: T, field: &ScalarField) -> Self
    where
        BigUint: From<T>,
    {
        let x = BigUint::from(x);
        FieldElement(x % &field.q)
    }

    /// Creates a field element from big-endian bytes, reducing mod `q`.
    pub fn from_bytes_be(x: &[u8], field: &ScalarField) -> Self {
        let x_int = BigUint::from_bytes_be(x);
        FieldElement(x_int % &field.q)
    }

    /// Parses a hex string into a field element.
    ///
    /// Returns `None` if the string is not valid hex or the value is out of
    /// the allowed `[0, q)` range.
    pub fn from_hex(s: &str, field: &ScalarField) -> Option<Self> {
        let x = BigUint::from_str_radix(s, 16).ok()?;
        (x < field.q).then_some(FieldElement(x))
    }

    /// Creates a possibly out-of-range field element. Testing only; the
    /// checked constructors are the ones to use everywhere else.
    pub fn from_biguint_unchecked(x: BigUint) -> Self {
        FieldElement(x)
    }

    /// The canonical hex encoding: uppercase, left-trimmed of leading zero
    /// bytes, but always an even number of digits.
    pub fn to_hex(&self) -> String {
        to_hex_even(&self.0)
    }

    /// Big-endian encoding left-padded to 32 bytes.
    ///
    /// Panics if the element requires more than 32 bytes; all supported
    /// fields have `q < 2^256`.
    pub fn to_32_be_bytes(&self) -> Vec<u8> {
        to_be_bytes_left_pad(&self.0, 32)
    }

    /// Big-endian encoding left-padded to the byte length of `q`.
    pub fn to_be_bytes_left_pad(&self, field: &ScalarField) -> Vec<u8> {
        to_be_bytes_left_pad(&self.0, field.q_len_bytes())
    }

    /// Returns true if the element is zero.
    pub fn is_zero(&self) -> bool {
        BigUint::is_zero(&self.0)
    }

    /// Returns true iff `0 <= self < q`.
    pub fn is_valid(&self, field: &ScalarField) -> bool {
        // The lower bound holds because the representation is unsigned.
        self.0 < field.q
    }
}

impl Zeroize for FieldElement {
    fn zeroize(&mut self) {
        // BigUint offers no in-place scrubbing; dropping the limbs and
        // leaving zero behind is the best available.
        self.0.set_zero();
    }
}

impl ScalarField {
    /// Constructs a new scalar field from a given order.
    ///
    /// Returns `None` if the order is not prime. Primality testing is
    /// expensive, so construct a field once and reuse it.
    pub fn new(order: BigUint, csprng: &mut Csprng) -> Option<Self> {
        let f = ScalarField { q: order };
        f.is_valid(csprng).then_some(f)
    }

    /// Constructs a new scalar field *assuming* the given order is prime.
    pub fn new_unchecked(order: BigUint) -> Self {
        ScalarField { q: order }
    }

    /// Checks that the modulus is prime. Expensive.
    pub fn is_valid(&self, csprng: &mut Csprng) -> bool {
        is_prime(&self.q, csprng)
    }

    /// Returns one, the neutral element of multiplication.
    pub fn one() -> FieldElement {
        FieldElement(BigUint::one())
    }

    /// Returns zero, the neutral element of addition.
    pub fn zero() -> FieldElement {
        FieldElement(BigUint::zero())
    }

    /// Returns a uniform random element of `[0, q)`.
    pub fn random_field_elem(&self, csprng: &mut Csprng) -> FieldElement {
        FieldElement(csprng.next_biguint_lt(&self.q))
    }

    /// Returns a uniform random element of `[lo, q)`.
    ///
    /// Used for secret keys, which must be at least 2.
    pub fn random_field_elem_min(&self, csprng: &mut Csprng, lo: impl Into<BigUint>) -> FieldElement {
        FieldElement(csprng.next_biguint_range(&lo.into(), &self.q))
    }

    /// The order `q` of the field.
    pub fn order(&self) -> &BigUint {
        &self.q
    }

    /// The length in bytes of the canonical encoding of a field element.
    pub fn q_len_bytes(&self) -> usize {
        (cnt_bits_repr(&self.q) + 7) / 8
    }
}

/// An element of the multiplicative subgroup `Z_p^r` as defined by [`Group`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GroupElement(
    #[serde(
        serialize_with = "crate::serde::biguint_serialize_hex",
        deserialize_with = "crate::serde::biguint_deserialize_hex"
    )]
    BigUint,
);

/// The group `Z_p^r`, the order-`q` multiplicative subgroup of `Z_p`.
///
/// The group optionally carries a fixed-base exponentiation table for its
/// generator; when present, [`Group::g_exp`] uses it transparently.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Group {
    /// Prime modulus `p`.
    #[serde(
        serialize_with = "crate::serde::biguint_serialize_hex",
        deserialize_with = "crate::serde::biguint_deserialize_hex"
    )]
    p: BigUint,

    /// Subgroup generator `g`.
    #[serde(
        serialize_with = "crate::serde::biguint_serialize_hex",
        deserialize_with = "crate::serde::biguint_deserialize_hex"
    )]
    g: BigUint,

    /// Group order `q`.
    #[serde(
        serialize_with = "crate::serde::biguint_serialize_hex",
        deserialize_with = "crate::serde::biguint_deserialize_hex"
    )]
    q: BigUint,

    /// Acceleration table for `g`; rebuilt on demand, never serialized.
    #[serde(skip)]
    g_pow_radix: Option<Arc<PowRadix>>,
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.p == other.p && self.g == other.g && self.q == other.q
    }
}

impl Eq for Group {}

impl GroupElement {
    /// Computes `(self * other) mod p`.
    pub fn mul(&self, other: &GroupElement, group: &Group) -> GroupElement {
        GroupElement((&self.0 * &other.0) % &group.p)
    }

    /// Computes the multiplicative inverse of a group element.
    ///
    /// Always `Some` for valid group elements.
    pub fn inv(&self, group: &Group) -> Option<Self> {
        mod_inverse(&self.0, &group.p).map(GroupElement)
    }

    /// Computes `self / other mod p`, if `other` is invertible.
    pub fn div(&self, other: &GroupElement, group: &Group) -> Option<Self> {
        other.inv(group).map(|inv| self.mul(&inv, group))
    }

    /// Modular exponentiation with an integer exponent.
    pub fn pow(&self, exponent: impl Into<BigUint>, group: &Group) -> GroupElement {
        let x = exponent.into();
        GroupElement(self.0.modpow(&x, &group.p))
    }

    /// Modular exponentiation with a field element, the action of the field
    /// over the group.
    pub fn exp(&self, exponent: &FieldElement, group: &Group) -> GroupElement {
        GroupElement(self.0.modpow(&exponent.0, &group.p))
    }

    /// Returns true iff `0 <= self < p` and `self^q % p == 1`, i.e. the
    /// element is a member of the order-`q` subgroup.
    pub fn is_valid(&self, group: &Group) -> bool {
        let elem_less_than_p = self.0 < group.p;
        elem_less_than_p && self.0.modpow(&group.q, &group.p).is_one()
    }

    /// Parses a hex string into a group element.
    ///
    /// Returns `None` if the string is not valid hex or the value is out of
    /// the allowed `[0, p)` range. Subgroup membership is *not* checked;
    /// use [`GroupElement::is_valid`] where it matters.
    pub fn from_hex(s: &str, group: &Group) -> Option<Self> {
        let x = BigUint::from_str_radix(s, 16).ok()?;
        (x < group.p).then_some(GroupElement(x))
    }

    /// Creates a possibly out-of-range group element. Testing only.
    pub fn from_biguint_unchecked(x: BigUint) -> Self {
        GroupElement(x)
    }

    /// The canonical hex encoding: uppercase, left-trimmed of leading zero
    /// bytes, but always an even number of digits.
    pub fn to_hex(&self) -> String {
        to_hex_even(&self.0)
    }

    /// Big-endian encoding left-padded to the byte length of `p`.
    pub fn to_be_bytes_left_pad(&self, group: &Group) -> Vec<u8> {
        to_be_bytes_left_pad(&self.0, group.p_len_bytes())
    }

    /// The value as a `BigUint` reference.
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }
}

impl Group {
    /// Constructs a new multiplicative group `Z_p^r`, verifying it is valid
    /// per [`Group::is_valid`]. Expensive; construct once and reuse.
    pub fn new(
        modulus: BigUint,
        order: BigUint,
        generator: BigUint,
        csprng: &mut Csprng,
    ) -> Option<Self> {
        let group = Group {
            p: modulus,
            g: generator,
            q: order,
            g_pow_radix: None,
        };
        group.is_valid(csprng).then_some(group)
    }

    /// Constructs a new group without validity checking.
    pub fn new_unchecked(modulus: BigUint, order: BigUint, generator: BigUint) -> Self {
        Group {
            p: modulus,
            g: generator,
            q: order,
            g_pow_radix: None,
        }
    }

    /// Attaches a fixed-base exponentiation table for the generator.
    ///
    /// [`PowRadixOption::NoAcceleration`] leaves plain `modpow` in place.
    pub fn accelerate(mut self, option: PowRadixOption) -> Self {
        self.g_pow_radix = match option {
            PowRadixOption::NoAcceleration => None,
            _ => Some(Arc::new(PowRadix::new(
                self.g.clone(),
                option,
                &self.q,
                &self.p,
            ))),
        };
        self
    }

    /// Checks that the given group is valid. Expensive.
    ///
    /// A group is valid if the modulus and order are prime, the order
    /// divides `p - 1` but not the cofactor, and the generator has order
    /// `q`.
    pub fn is_valid(&self, csprng: &mut Csprng) -> bool {
        // The order `q` must divide `p - 1` but not `(p - 1)/q`.
        let p_minus_1 = &self.p - BigUint::one();
        let cofactor = &p_minus_1 / &self.q;
        if !(p_minus_1 % &self.q).is_zero() || (&cofactor % &self.q).is_zero() {
            return false;
        }

        // The generator must be nontrivial with order dividing `q`; `q`
        // prime then forces order exactly `q`.
        if self.g.is_one() || !self.g.modpow(&self.q, &self.p).is_one() {
            return false;
        }

        // Primality testing last.
        is_prime(&self.q, csprng) && is_prime(&self.p, csprng)
    }

    /// Returns a uniform random group element, computed as `g^x` for a
    /// uniform `x` in `[0, q)`.
    pub fn random_group_elem(&self, csprng: &mut Csprng) -> GroupElement {
        let field_elem = FieldElement(csprng.next_biguint_lt(&self.q));
        self.g_exp(&field_elem)
    }

    /// Returns `g^x mod p`, through the acceleration table when one is
    /// attached.
    pub fn g_exp(&self, x: &FieldElement) -> GroupElement {
        match &self.g_pow_radix {
            Some(pow_radix) => GroupElement(pow_radix.pow(&x.0)),
            None => GroupElement(self.g.modpow(&x.0, &self.p)),
        }
    }

    /// Returns one, the neutral element.
    pub fn one() -> GroupElement {
        GroupElement(BigUint::one())
    }

    /// The order `q` of the group.
    pub fn order(&self) -> &BigUint {
        &self.q
    }

    /// The modulus `p` of the group.
    pub fn modulus(&self) -> &BigUint {
        &self.p
    }

    /// The generator `g` as a group element.
    pub fn generator(&self) -> GroupElement {
        GroupElement(self.g.clone())
    }

    /// The length in bytes of the canonical encoding of a group element.
    pub fn p_len_bytes(&self) -> usize {
        (cnt_bits_repr(&self.p) + 7) / 8
    }

    /// Whether the group and the given field have the same order.
    pub fn matches_field(&self, field: &ScalarField) -> bool {
        self.q == *field.order()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use num_bigint::BigUint;

    fn get_toy_algebras() -> (ScalarField, Group) {
        (
            ScalarField::new_unchecked(BigUint::from(127_u8)),
            Group::new_unchecked(
                BigUint::from(59183_u32),
                BigUint::from(127_u8),
                BigUint::from(32616_u32),
            ),
        )
    }

    #[test]
    fn field_operations() {
        let (field, _) = get_toy_algebras();

        let a = FieldElement::from(115_u8, &field);
        let b = FieldElement::from(37_u8, &field);

        assert_eq!(a.add(&b, &field), FieldElement::from(25_u8, &field));
        assert_eq!(a.sub(&b, &field), FieldElement::from(78_u8, &field));
        assert_eq!(b.sub(&a, &field), FieldElement::from(49_u8, &field));
        assert_eq!(b.sub(&b, &field), ScalarField::zero());
        assert_eq!(a.mul(&b, &field), FieldElement::from(64_u8, &field));
        assert_eq!(a.pow(23_u8, &field), FieldElement::from(69_u8, &field));
        assert_eq!(a.negate(&field), FieldElement::from(12_u8, &field));
        assert_eq!(
            ScalarField::zero().negate(&field),
            ScalarField::zero(),
            "negation of zero stays in range"
        );

        let a_inv = a.inv(&field).unwrap();
        assert_eq!(a_inv, FieldElement::from(74_u8, &field));
        assert_eq!(a.mul(&a_inv, &field), ScalarField::one());
    }

    #[test]
    fn group_operations() {
        let mut csprng = Csprng::new(b"testing group operations");
        let (field, group) = get_toy_algebras();

        let a = FieldElement::from(115_u8, &field);
        let g1 = group.g_exp(&a);

        // h is not a member of the order-127 subgroup
        let h = GroupElement(BigUint::from(12345_u32));

        assert!(g1.is_valid(&group));
        assert!(!h.is_valid(&group));

        let g1_inv = g1.inv(&group).unwrap();
        assert_eq!(g1.mul(&g1_inv, &group), Group::one());

        for _ in 0..20 {
            let u = group.random_group_elem(&mut csprng);
            assert!(u.is_valid(&group));
        }
    }

    #[test]
    fn accelerated_g_exp_matches_plain() {
        let (field, group) = get_toy_algebras();
        for option in [
            PowRadixOption::LowMemory,
            PowRadixOption::HighMemory,
            PowRadixOption::ExtremeMemory,
        ] {
            let accelerated = group.clone().accelerate(option);
            for x in 0u8..127 {
                let x = FieldElement::from(x, &field);
                assert_eq!(group.g_exp(&x), accelerated.g_exp(&x));
            }
        }
    }

    #[test]
    fn random_field_elem_min_respects_bound() {
        let mut csprng = Csprng::new(b"random_field_elem_min");
        let (field, _) = get_toy_algebras();
        for _ in 0..50 {
            let x = field.random_field_elem_min(&mut csprng, 2_u8);
            assert!(*x.value() >= BigUint::from(2_u8));
            assert!(x.is_valid(&field));
        }
    }

    #[test]
    fn hex_round_trip() {
        let (field, group) = get_toy_algebras();

        let x = FieldElement::from(10_u8, &field);
        assert_eq!(x.to_hex(), "0A");
        assert_eq!(FieldElement::from_hex("0A", &field), Some(x));
        assert_eq!(
            FieldElement::from_hex("7F", &field),
            None,
            "q itself is out of range"
        );

        let y = GroupElement(BigUint::from(0x1234_u32));
        assert_eq!(y.to_hex(), "1234");
        assert_eq!(GroupElement::from_hex("1234", &group), Some(y));
        assert_eq!(GroupElement::from_hex("zz", &group), None);
    }
}
