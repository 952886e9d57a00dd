#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! Serde helpers for big integers and byte blobs, using the canonical
//! uppercase-hex text form.

use num_bigint::BigUint;
use num_traits::Num;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::algebra_utils::to_hex_even;

/// Serializes a [`BigUint`] as uppercase hex, left-trimmed to whole bytes.
pub fn biguint_serialize_hex<S>(n: &BigUint, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    to_hex_even(n).serialize(serializer)
}

/// Deserializes a [`BigUint`] from a hex string.
pub fn biguint_deserialize_hex<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let s = String::deserialize(deserializer)?;
    BigUint::from_str_radix(&s, 16).map_err(|e| D::Error::custom(format!("invalid hex: {e}")))
}

/// Serializes bytes as a string containing an even number of uppercase hex
/// digits.
pub fn bytes_serialize_hex<S, T>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: AsRef<[u8]>,
{
    faster_hex::nopfx_uppercase::serialize(bytes, serializer)
}

/// Deserializes a `Vec<u8>` from an uppercase hex string.
pub fn bytes_deserialize_hex<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    faster_hex::nopfx_uppercase::deserialize(deserializer)
}
