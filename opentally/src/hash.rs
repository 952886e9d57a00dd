#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! The canonical hash of heterogeneous inputs into `Z_q`.
//!
//! Every proof challenge, derived nonce, and running ballot code in the
//! crate is produced by [`hash_elems`]. Inputs serialize canonically:
//! field and group elements as uppercase hex left-trimmed to whole bytes,
//! machine integers as decimal, strings as UTF-8, absent values as the
//! literal `"null"`, and sequences as the hex of their recursive hash. The
//! serialized forms are joined with `|` separators (one leading), hashed
//! with SHA-256, and reduced into `[1, q)`. The result is never zero, so it
//! is always usable as an encryption nonce.

use num_bigint::BigUint;
use num_traits::One;
use sha2::{Digest, Sha256};

use util::algebra::{FieldElement, GroupElement, ScalarField};

/// One input to [`hash_elems`], tagged with its canonical serialization.
#[derive(Clone, Debug)]
pub enum HashInput<'a> {
    /// An element of `Z_p`, serialized as trimmed uppercase hex.
    PElement(&'a GroupElement),
    /// An element of `Z_q`, serialized as trimmed uppercase hex.
    QElement(&'a FieldElement),
    /// A string, serialized as its UTF-8 bytes.
    Str(&'a str),
    /// A machine integer, serialized in decimal.
    Int(u64),
    /// An arbitrary-precision integer, serialized in decimal.
    BigInt(&'a BigUint),
    /// A sequence, serialized as the hex of its recursive hash; an empty
    /// sequence serializes as `"null"`.
    Sequence(Vec<HashInput<'a>>),
    /// An absent value, serialized as `"null"`.
    Null,
}

impl<'a> HashInput<'a> {
    /// Wraps an iterator of inputs as a single sequence input.
    pub fn sequence(inputs: impl IntoIterator<Item = HashInput<'a>>) -> Self {
        HashInput::Sequence(inputs.into_iter().collect())
    }

    fn to_hashable_string(&self, field: &ScalarField) -> String {
        match self {
            HashInput::PElement(x) => x.to_hex(),
            HashInput::QElement(x) => x.to_hex(),
            HashInput::Str(s) => (*s).to_owned(),
            HashInput::Int(i) => i.to_string(),
            HashInput::BigInt(n) => n.to_str_radix(10),
            HashInput::Sequence(inputs) => {
                if inputs.is_empty() {
                    "null".to_owned()
                } else {
                    hash_elems(field, inputs).to_hex()
                }
            }
            HashInput::Null => "null".to_owned(),
        }
    }
}

impl<'a> From<&'a GroupElement> for HashInput<'a> {
    fn from(x: &'a GroupElement) -> Self {
        HashInput::PElement(x)
    }
}

impl<'a> From<&'a FieldElement> for HashInput<'a> {
    fn from(x: &'a FieldElement) -> Self {
        HashInput::QElement(x)
    }
}

impl<'a> From<&'a str> for HashInput<'a> {
    fn from(s: &'a str) -> Self {
        HashInput::Str(s)
    }
}

impl<'a> From<&'a String> for HashInput<'a> {
    fn from(s: &'a String) -> Self {
        HashInput::Str(s)
    }
}

impl From<u64> for HashInput<'_> {
    fn from(i: u64) -> Self {
        HashInput::Int(i)
    }
}

impl From<u32> for HashInput<'_> {
    fn from(i: u32) -> Self {
        HashInput::Int(i.into())
    }
}

impl From<usize> for HashInput<'_> {
    fn from(i: usize) -> Self {
        HashInput::Int(i as u64)
    }
}

impl<'a> From<&'a BigUint> for HashInput<'a> {
    fn from(n: &'a BigUint) -> Self {
        HashInput::BigInt(n)
    }
}

impl<'a, T> From<Option<T>> for HashInput<'a>
where
    T: Into<HashInput<'a>>,
{
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(x) => x.into(),
            None => HashInput::Null,
        }
    }
}

/// Hashes the given inputs into a nonzero element of `Z_q`.
///
/// Deterministic and order-sensitive: `hash_elems(a, b) != hash_elems(b, a)`
/// except by collision. The result lies in `[1, q)`.
pub fn hash_elems(field: &ScalarField, inputs: &[HashInput]) -> FieldElement {
    let mut hasher = Sha256::new();
    hasher.update(b"|");
    for input in inputs {
        hasher.update(input.to_hashable_string(field).as_bytes());
        hasher.update(b"|");
    }
    let digest = hasher.finalize();

    let q_minus_one = field.order() - BigUint::one();
    let reduced = BigUint::from_bytes_be(digest.as_slice()) % q_minus_one + BigUint::one();
    FieldElement::from_biguint_unchecked(reduced)
}

/// Variadic sugar for [`hash_elems`]: `hash_elems!(field; a, b, c)`.
///
/// Each argument is converted through [`HashInput::from`], so elements,
/// strings, integers, options, and already-built [`HashInput`]s all work.
#[macro_export]
macro_rules! hash_elems {
    ($field:expr; $($x:expr),+ $(,)?) => {
        $crate::hash::hash_elems($field, &[$($crate::hash::HashInput::from($x)),+])
    };
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hash_elems;
    use num_bigint::BigUint;
    use util::pow_radix::PowRadixOption;

    use crate::standard_parameters::test_parameters;

    fn field() -> ScalarField {
        test_parameters(PowRadixOption::NoAcceleration).field
    }

    #[test]
    fn deterministic_and_order_sensitive() {
        let field = field();
        let a = hash_elems!(&field; "a", "b");
        let b = hash_elems!(&field; "a", "b");
        let c = hash_elems!(&field; "b", "a");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn result_is_nonzero_and_in_range() {
        let field = field();
        for i in 0u64..200 {
            let h = hash_elems!(&field; i);
            assert!(!h.is_zero());
            assert!(h.is_valid(&field));
        }
    }

    #[test]
    fn integer_hashes_like_its_decimal_string() {
        let field = field();
        assert_eq!(hash_elems!(&field; 0_u64), hash_elems!(&field; "0"));
        assert_eq!(hash_elems!(&field; 31_u64), hash_elems!(&field; "31"));
    }

    #[test]
    fn none_hashes_like_null() {
        let field = field();
        let none: Option<&str> = None;
        assert_eq!(hash_elems!(&field; none), hash_elems!(&field; "null"));
    }

    #[test]
    fn leading_zero_bytes_do_not_change_element_hashes() {
        let field = field();
        // Equal values have equal trimmed-hex serializations regardless of
        // how the caller produced them.
        let a = FieldElement::from_bytes_be(&[0, 0, 0x12, 0x34], &field);
        let b = FieldElement::from_bytes_be(&[0x12, 0x34], &field);
        assert_eq!(a, b);
        assert_eq!(hash_elems!(&field; &a), hash_elems!(&field; &b));
        assert_eq!(a.to_hex(), "1234");
    }

    #[test]
    fn empty_sequence_hashes_like_null() {
        let field = field();
        let empty = HashInput::sequence(std::iter::empty());
        assert_eq!(hash_elems!(&field; empty), hash_elems!(&field; "null"));
    }

    #[test]
    fn sequence_hashes_as_recursive_hash() {
        let field = field();
        let x = FieldElement::from(5_u8, &field);
        let y = FieldElement::from(7_u8, &field);
        let inner = hash_elems!(&field; &x, &y);
        let seq = HashInput::sequence([HashInput::from(&x), HashInput::from(&y)]);
        assert_eq!(
            hash_elems!(&field; seq),
            hash_elems!(&field; inner.to_hex().as_str())
        );
    }

    #[test]
    fn biguint_hashes_in_decimal() {
        let field = field();
        let n = BigUint::from(123456789_u64);
        assert_eq!(hash_elems!(&field; &n), hash_elems!(&field; "123456789"));
    }
}
