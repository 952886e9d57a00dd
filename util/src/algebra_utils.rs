#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! Utility functions over field and group elements: encodings, modular
//! inverse, and Lagrange interpolation at zero.

use itertools::Itertools;
use std::{borrow::Borrow, iter::zip, mem};

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, Zero};

use crate::algebra::{FieldElement, Group, GroupElement, ScalarField};

/// Returns the number of bits required to encode the given number.
pub fn cnt_bits_repr<T: Borrow<BigUint>>(n: &T) -> usize {
    let n: &BigUint = n.borrow();
    if n.is_zero() {
        1
    } else {
        n.bits() as usize
    }
}

/// Encodes a [`BigUint`] in big-endian as a left-padded byte string of
/// length at least `len`.
pub fn to_be_bytes_left_pad<T: Borrow<BigUint>>(n: &T, len: usize) -> Vec<u8> {
    let n: &BigUint = n.borrow();

    let mut v = n.to_bytes_be();

    if v.len() < len {
        let left_pad = len - v.len();
        v.reserve(left_pad);
        v.extend(std::iter::repeat(0).take(left_pad));
        v.rotate_right(left_pad);
    }

    v
}

/// Encodes a [`BigUint`] as uppercase hex, left-trimmed of leading zero
/// bytes but padded to an even number of digits, so the string always
/// denotes whole bytes. Zero encodes as `"00"`.
pub fn to_hex_even<T: Borrow<BigUint>>(n: &T) -> String {
    let n: &BigUint = n.borrow();
    let mut h = n.to_str_radix(16).to_uppercase();
    if h.len() % 2 == 1 {
        h.insert(0, '0');
    }
    h
}

/// Computes the inverse of `a_u` modulo `m_u` via the extended Euclidean
/// algorithm.
///
/// Returns `Some` iff `gcd(a_u, m_u) == 1`.
pub fn mod_inverse(a_u: &BigUint, m_u: &BigUint) -> Option<BigUint> {
    if m_u.is_zero() {
        return None;
    }
    let m = BigInt::from_biguint(Sign::Plus, m_u.clone());
    let mut t = (BigInt::zero(), BigInt::one());
    let mut r = (m.clone(), BigInt::from_biguint(Sign::Plus, a_u.clone()));
    while !r.1.is_zero() {
        let q = &r.0 / &r.1;
        let f = |mut r: (BigInt, BigInt)| {
            mem::swap(&mut r.0, &mut r.1);
            r.1 -= &q * &r.0;
            r
        };
        r = f(r);
        t = f(t);
    }
    if r.0.is_one() {
        if t.0 < BigInt::zero() {
            return Some((t.0 + m).magnitude().clone());
        }
        return Some(t.0.magnitude().clone());
    }

    None
}

/// Computes the single Lagrange coefficient at zero for node `i`, that is
/// `w_i = \prod_{l != i} l / (l - i) % q`.
///
/// The output may be nonsensical if the elements of `xs` are not unique.
fn get_single_coefficient_at_zero_unchecked(
    xs: &[FieldElement],
    i: &FieldElement,
    field: &ScalarField,
) -> FieldElement {
    xs.iter()
        .filter_map(|l| {
            let l_minus_i = l.sub(i, field);
            let inv_l_minus_i = l_minus_i.inv(field)?;
            Some(l.mul(&inv_l_minus_i, field))
        })
        .fold(ScalarField::one(), |acc, s| acc.mul(&s, field))
}

/// Computes the single Lagrange coefficient at zero for node `i`.
///
/// Returns `None` if `i` is not in `xs` or the nodes are not unique.
pub fn get_single_coefficient_at_zero(
    xs: &[FieldElement],
    i: &FieldElement,
    field: &ScalarField,
) -> Option<FieldElement> {
    if !xs.contains(i) || !xs.iter().all_unique() {
        return None;
    }
    Some(get_single_coefficient_at_zero_unchecked(xs, i, field))
}

fn get_lagrange_coefficients_at_zero_unchecked(
    xs: &[FieldElement],
    field: &ScalarField,
) -> Vec<FieldElement> {
    xs.iter()
        .map(|i| get_single_coefficient_at_zero_unchecked(xs, i, field))
        .collect()
}

/// Lagrange interpolation at zero in the field `Z_q`.
///
/// Returns `None` if the nodes are not unique or the lists differ in length.
pub fn field_lagrange_at_zero(
    xs: &[FieldElement],
    ys: &[FieldElement],
    field: &ScalarField,
) -> Option<FieldElement> {
    if xs.len() != ys.len() || !xs.iter().all_unique() {
        return None;
    }
    let coeffs = get_lagrange_coefficients_at_zero_unchecked(xs, field);
    let y0 = zip(coeffs, ys)
        .map(|(c, y)| c.mul(y, field))
        .fold(ScalarField::zero(), |acc, s| acc.add(&s, field));
    Some(y0)
}

/// Lagrange interpolation at zero in the exponent of group elements.
///
/// Returns `None` if the nodes are not unique or the lists differ in length.
pub fn group_lagrange_at_zero(
    xs: &[FieldElement],
    ys: &[GroupElement],
    field: &ScalarField,
    group: &Group,
) -> Option<GroupElement> {
    if xs.len() != ys.len() || !xs.iter().all_unique() {
        return None;
    }
    let coeffs = get_lagrange_coefficients_at_zero_unchecked(xs, field);
    let y0 = zip(coeffs, ys)
        .map(|(c, y)| y.exp(&c, group))
        .fold(Group::one(), |acc, s| acc.mul(&s, group));
    Some(y0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cnt_bits_repr() {
        for (n, expected) in [1, 1, 2, 2, 3, 3, 3, 3, 4].into_iter().enumerate() {
            assert_eq!(cnt_bits_repr(&BigUint::from(n)), expected);
        }
    }

    #[test]
    fn test_to_be_bytes_left_pad() {
        let x_ff = BigUint::from(0xff_usize);
        assert_eq!(to_be_bytes_left_pad(&x_ff, 0), vec![0xff]);
        assert_eq!(to_be_bytes_left_pad(&x_ff, 1), vec![0xff]);
        assert_eq!(to_be_bytes_left_pad(&x_ff, 2), vec![0x00, 0xff]);
    }

    #[test]
    fn test_to_hex_even() {
        assert_eq!(to_hex_even(&BigUint::zero()), "00");
        assert_eq!(to_hex_even(&BigUint::from(0xA_u8)), "0A");
        assert_eq!(to_hex_even(&BigUint::from(0x123_u32)), "0123");
        assert_eq!(to_hex_even(&BigUint::from(0xABCD_u32)), "ABCD");
    }

    #[test]
    fn test_mod_inverse() {
        assert_eq!(
            mod_inverse(&BigUint::from(3_u8), &BigUint::from(11_u8)),
            Some(BigUint::from(4_u8)),
            "The inverse of 3 mod 11 should be 4."
        );
        assert_eq!(
            mod_inverse(&BigUint::from(0_u8), &BigUint::from(11_u8)),
            None,
            "The inverse of 0 mod 11 should not exist."
        );
        assert_eq!(
            mod_inverse(&BigUint::from(3_u8), &BigUint::from(12_u8)),
            None,
            "The inverse of 3 mod 12 should not exist."
        )
    }

    fn get_toy_algebras() -> (ScalarField, Group) {
        (
            ScalarField::new_unchecked(BigUint::from(127_u8)),
            Group::new_unchecked(
                BigUint::from(59183_u32),
                BigUint::from(127_u32),
                BigUint::from(32616_u32),
            ),
        )
    }

    #[test]
    fn test_lagrange_interpolation() {
        let (field, group) = get_toy_algebras();

        // Points on the polynomial x^2 - 1
        let xs = [
            FieldElement::from(1_u8, &field),
            FieldElement::from(2_u8, &field),
            FieldElement::from(3_u8, &field),
        ];
        let ys = [
            FieldElement::from(0_u8, &field),
            FieldElement::from(3_u8, &field),
            FieldElement::from(8_u8, &field),
        ];
        let group_ys: Vec<_> = ys.iter().map(|x| group.g_exp(x)).collect();
        // -1 mod q
        let x_0 = FieldElement::from(126_u8, &field);
        let g_x_0 = group.g_exp(&x_0);

        assert_eq!(field_lagrange_at_zero(&xs, &ys, &field), Some(x_0));
        assert_eq!(
            group_lagrange_at_zero(&xs, &group_ys, &field, &group),
            Some(g_x_0)
        );

        // Lists of different length
        assert_eq!(field_lagrange_at_zero(&xs[0..2], &ys, &field), None);
        assert_eq!(
            group_lagrange_at_zero(&xs, &group_ys[0..2], &field, &group),
            None
        );

        // Repeated nodes
        let xs = [
            FieldElement::from(1_u8, &field),
            FieldElement::from(2_u8, &field),
            FieldElement::from(2_u8, &field),
        ];
        assert_eq!(field_lagrange_at_zero(&xs, &ys, &field), None);
        assert_eq!(group_lagrange_at_zero(&xs, &group_ys, &field, &group), None);
    }

    #[test]
    fn test_single_lagrange_coefficient() {
        let (field, _) = get_toy_algebras();
        let xs = [
            FieldElement::from(1_u8, &field),
            FieldElement::from(2_u8, &field),
            FieldElement::from(3_u8, &field),
        ];
        let x = FieldElement::from(1_u8, &field);
        let exp_c = FieldElement::from(3_u8, &field);
        assert_eq!(
            get_single_coefficient_at_zero(&xs, &x, &field),
            Some(exp_c),
            "The coefficient at 1 should be 3."
        );

        let x = FieldElement::from(4_u8, &field);
        assert_eq!(
            get_single_coefficient_at_zero(&xs, &x, &field),
            None,
            "Coefficients outside of xs are not defined"
        );
    }
}
