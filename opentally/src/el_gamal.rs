#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! Exponential ElGamal encryption, its homomorphic addition, and a hashed
//! variant for variable-length byte payloads.
//!
//! In the exponential scheme the message `m` lives in the exponent:
//! `(pad, data) = (g^n, g^m * K^n)` for a nonce `n` and public key `K`.
//! Ciphertexts multiply componentwise and their plaintexts add, which is
//! what makes homomorphic tallying work. Decryption recovers `g^m` and then
//! takes a discrete log, which is only feasible because tallies are small.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use zeroize::Zeroize;

use util::{
    algebra::{FieldElement, Group, GroupElement},
    bitwise::xor,
    csprng::Csprng,
};

use crate::{
    discrete_log::{DiscreteLog, DiscreteLogError},
    fixed_parameters::FixedParameters,
    hash_elems,
};

type HmacSha256 = Hmac<sha2::Sha256>;

/// Byte length of one keystream block, and of a serialized `Z_q` element.
pub const BLOCK_SIZE: usize = 32;

/// An ElGamal secret/public key pair: `public_key = g^secret_key`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElGamalKeyPair {
    /// Secret key, an element of `[2, q)`.
    pub secret_key: FieldElement,

    /// Public key `g^secret_key`, a valid residue.
    pub public_key: GroupElement,
}

impl ElGamalKeyPair {
    /// Builds a key pair from a given secret key.
    ///
    /// Returns `None` if the secret is below 2; `g^0` and `g^1` are not
    /// usable keys.
    pub fn from_secret(
        secret_key: FieldElement,
        fixed_parameters: &FixedParameters,
    ) -> Option<Self> {
        if *secret_key.value() < num_bigint::BigUint::from(2_u8) {
            warn!("ElGamal secret key must be in [2, q)");
            return None;
        }
        let public_key = fixed_parameters.group.g_exp(&secret_key);
        Some(ElGamalKeyPair {
            secret_key,
            public_key,
        })
    }

    /// Generates a fresh key pair with a uniform secret in `[2, q)`.
    pub fn random(csprng: &mut Csprng, fixed_parameters: &FixedParameters) -> Self {
        let secret_key = fixed_parameters
            .field
            .random_field_elem_min(csprng, 2_u8);
        let public_key = fixed_parameters.group.g_exp(&secret_key);
        ElGamalKeyPair {
            secret_key,
            public_key,
        }
    }
}

impl Zeroize for ElGamalKeyPair {
    fn zeroize(&mut self) {
        self.secret_key.zeroize();
    }
}

/// An exponential ElGamal ciphertext `(pad, data)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElGamalCiphertext {
    /// `g^nonce`.
    pub pad: GroupElement,

    /// `g^message * K^nonce`.
    pub data: GroupElement,
}

impl ElGamalCiphertext {
    /// The hash binding both components, used in ballot hash trees.
    pub fn crypto_hash(&self, fixed_parameters: &FixedParameters) -> FieldElement {
        hash_elems!(&fixed_parameters.field; &self.pad, &self.data)
    }

    /// Decrypts with a known blinding product `K^nonce` (or `pad^secret`).
    pub fn decrypt_known_product(
        &self,
        product: &GroupElement,
        fixed_parameters: &FixedParameters,
        dlog: &DiscreteLog,
    ) -> Result<u64, DiscreteLogError> {
        let group = &fixed_parameters.group;
        let encoded = self
            .data
            .div(product, group)
            .ok_or(DiscreteLogError::NotFound)?;
        dlog.discrete_log(&encoded, group)
    }

    /// Decrypts with the secret key.
    pub fn decrypt(
        &self,
        secret_key: &FieldElement,
        fixed_parameters: &FixedParameters,
        dlog: &DiscreteLog,
    ) -> Result<u64, DiscreteLogError> {
        let product = self.pad.exp(secret_key, &fixed_parameters.group);
        self.decrypt_known_product(&product, fixed_parameters, dlog)
    }

    /// Decrypts with the public key and the nonce used at encryption time.
    pub fn decrypt_known_nonce(
        &self,
        public_key: &GroupElement,
        nonce: &FieldElement,
        fixed_parameters: &FixedParameters,
        dlog: &DiscreteLog,
    ) -> Result<u64, DiscreteLogError> {
        let product = public_key.exp(nonce, &fixed_parameters.group);
        self.decrypt_known_product(&product, fixed_parameters, dlog)
    }

    /// A guardian's partial decryption `pad^share` of this ciphertext.
    pub fn partial_decrypt(
        &self,
        secret_share: &FieldElement,
        fixed_parameters: &FixedParameters,
    ) -> GroupElement {
        self.pad.exp(secret_share, &fixed_parameters.group)
    }
}

/// The identity ciphertext `(1, 1)`, the starting point for homomorphic
/// accumulation.
pub fn elgamal_homomorphic_zero() -> ElGamalCiphertext {
    ElGamalCiphertext {
        pad: Group::one(),
        data: Group::one(),
    }
}

/// Encrypts `m` under public key `public_key` with the given nonce.
///
/// Returns `None` when the nonce is zero (the pad would be 1) or the
/// message does not fit in the exponent field.
pub fn elgamal_encrypt(
    m: u64,
    nonce: &FieldElement,
    public_key: &GroupElement,
    fixed_parameters: &FixedParameters,
) -> Option<ElGamalCiphertext> {
    if nonce.is_zero() {
        warn!("ElGamal encryption requires a non-zero nonce");
        return None;
    }
    if &num_bigint::BigUint::from(m) >= fixed_parameters.field.order() {
        warn!("ElGamal message must be in [0, q)");
        return None;
    }

    let group = &fixed_parameters.group;
    let field = &fixed_parameters.field;
    let m = FieldElement::from(m, field);

    let pad = group.g_exp(nonce);
    let data = group.g_exp(&m).mul(&public_key.exp(nonce, group), group);
    Some(ElGamalCiphertext { pad, data })
}

/// Homomorphically accumulates ciphertexts by componentwise multiplication.
/// The empty sum is the identity `(1, 1)`.
pub fn elgamal_add<'a>(
    ciphertexts: impl IntoIterator<Item = &'a ElGamalCiphertext>,
    fixed_parameters: &FixedParameters,
) -> ElGamalCiphertext {
    let group = &fixed_parameters.group;
    ciphertexts
        .into_iter()
        .fold(elgamal_homomorphic_zero(), |acc, c| ElGamalCiphertext {
            pad: acc.pad.mul(&c.pad, group),
            data: acc.data.mul(&c.data, group),
        })
}

/// Combines guardian public keys into the joint election key `K = ∏ K_i`.
pub fn elgamal_combine_public_keys<'a>(
    public_keys: impl IntoIterator<Item = &'a GroupElement>,
    fixed_parameters: &FixedParameters,
) -> GroupElement {
    let group = &fixed_parameters.group;
    public_keys
        .into_iter()
        .fold(Group::one(), |acc, k| acc.mul(k, group))
}

/// Errors from [`HashedElGamalCiphertext::decrypt`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashedElGamalError {
    /// The MAC over pad and ciphertext did not verify.
    #[error("The message authentication code does not verify.")]
    InvalidMac,
}

/// A hashed-ElGamal ciphertext for a byte-string payload.
///
/// The ElGamal pad establishes a session key; an HMAC-based KDF turns it
/// into a MAC key and a keystream that the payload is XORed with. The MAC
/// covers the pad and the ciphertext, and is verified before decryption
/// returns anything.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashedElGamalCiphertext {
    /// `g^nonce`.
    pub pad: GroupElement,

    /// The payload XORed with the derived keystream.
    #[serde(
        serialize_with = "util::serde::bytes_serialize_hex",
        deserialize_with = "util::serde::bytes_deserialize_hex"
    )]
    pub data: Vec<u8>,

    /// HMAC over `pad ‖ data` under the derived MAC key.
    #[serde(
        serialize_with = "util::serde::bytes_serialize_hex",
        deserialize_with = "util::serde::bytes_deserialize_hex"
    )]
    pub mac: Vec<u8>,
}

/// Derives keystream block `index` (block 0 is the MAC key).
///
/// Every block binds the encryption seed and the payload bit length, so a
/// keystream derived for one context never lines up with another.
fn kdf_block(
    session_key: &[u8],
    encryption_seed: &FieldElement,
    index: u32,
    payload_bit_len: u32,
) -> Vec<u8> {
    // `new_from_slice` accepts any key length for HMAC.
    #[allow(clippy::unwrap_used)]
    let mut hmac = HmacSha256::new_from_slice(session_key).unwrap();
    hmac.update(&index.to_be_bytes());
    hmac.update(b"hashed-elgamal");
    hmac.update(&[0x00]);
    hmac.update(&encryption_seed.to_32_be_bytes());
    hmac.update(&payload_bit_len.to_be_bytes());
    hmac.finalize().into_bytes().as_slice().to_vec()
}

/// The 32-byte session key for a pad and blinding factor.
///
/// The hash output can have leading zero bytes; the fixed-width encoding
/// keeps the KDF key length stable regardless.
fn session_key(
    pad: &GroupElement,
    blinding_factor: &GroupElement,
    fixed_parameters: &FixedParameters,
) -> Vec<u8> {
    hash_elems!(&fixed_parameters.field; pad, blinding_factor).to_32_be_bytes()
}

fn keystream_xor(
    message: &[u8],
    session_key: &[u8],
    encryption_seed: &FieldElement,
) -> Vec<u8> {
    let payload_bit_len = (message.len() * 8) as u32;
    let mut out = Vec::with_capacity(message.len());
    for (i, block) in message.chunks(BLOCK_SIZE).enumerate() {
        let key_block = kdf_block(session_key, encryption_seed, i as u32 + 1, payload_bit_len);
        out.extend_from_slice(&xor(block, &key_block));
    }
    out
}

fn compute_mac(
    mac_key: &[u8],
    pad: &GroupElement,
    data: &[u8],
    fixed_parameters: &FixedParameters,
) -> Vec<u8> {
    #[allow(clippy::unwrap_used)]
    let mut hmac = HmacSha256::new_from_slice(mac_key).unwrap();
    hmac.update(&pad.to_be_bytes_left_pad(&fixed_parameters.group));
    hmac.update(data);
    hmac.finalize().into_bytes().as_slice().to_vec()
}

/// Encrypts a byte payload under `public_key` with the given nonce and
/// context seed. Returns `None` when the nonce is zero.
pub fn hashed_elgamal_encrypt(
    message: &[u8],
    nonce: &FieldElement,
    public_key: &GroupElement,
    encryption_seed: &FieldElement,
    fixed_parameters: &FixedParameters,
) -> Option<HashedElGamalCiphertext> {
    if nonce.is_zero() {
        warn!("hashed ElGamal encryption requires a non-zero nonce");
        return None;
    }

    let group = &fixed_parameters.group;
    let pad = group.g_exp(nonce);
    let blinding_factor = public_key.exp(nonce, group);
    let session_key = session_key(&pad, &blinding_factor, fixed_parameters);

    let data = keystream_xor(message, &session_key, encryption_seed);
    let payload_bit_len = (message.len() * 8) as u32;
    let mac_key = kdf_block(&session_key, encryption_seed, 0, payload_bit_len);
    let mac = compute_mac(&mac_key, &pad, &data, fixed_parameters);

    Some(HashedElGamalCiphertext { pad, data, mac })
}

impl HashedElGamalCiphertext {
    /// Verifies the MAC and decrypts the payload.
    pub fn decrypt(
        &self,
        secret_key: &FieldElement,
        encryption_seed: &FieldElement,
        fixed_parameters: &FixedParameters,
    ) -> Result<Vec<u8>, HashedElGamalError> {
        let group = &fixed_parameters.group;
        let blinding_factor = self.pad.exp(secret_key, group);
        let session_key = session_key(&self.pad, &blinding_factor, fixed_parameters);

        let payload_bit_len = (self.data.len() * 8) as u32;
        let mac_key = kdf_block(&session_key, encryption_seed, 0, payload_bit_len);
        let expected_mac = compute_mac(&mac_key, &self.pad, &self.data, fixed_parameters);
        if expected_mac != self.mac {
            warn!("hashed ElGamal ciphertext failed MAC verification");
            return Err(HashedElGamalError::InvalidMac);
        }

        Ok(keystream_xor(&self.data, &session_key, encryption_seed))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use util::pow_radix::PowRadixOption;

    use crate::standard_parameters::test_parameters;

    fn setup() -> (FixedParameters, DiscreteLog, Csprng) {
        (
            test_parameters(PowRadixOption::LowMemory),
            DiscreteLog::new(),
            Csprng::new(b"el_gamal test"),
        )
    }

    #[test]
    fn keypair_from_small_secret_is_rejected() {
        let (fp, _, _) = setup();
        for bad in [0_u8, 1] {
            let secret = FieldElement::from(bad, &fp.field);
            assert!(ElGamalKeyPair::from_secret(secret, &fp).is_none());
        }
        let secret = FieldElement::from(2_u8, &fp.field);
        assert!(ElGamalKeyPair::from_secret(secret, &fp).is_some());
    }

    #[test]
    fn encrypt_requires_nonzero_nonce() {
        let (fp, _, mut csprng) = setup();
        let keypair = ElGamalKeyPair::random(&mut csprng, &fp);
        let zero = FieldElement::from(0_u8, &fp.field);
        assert!(elgamal_encrypt(5, &zero, &keypair.public_key, &fp).is_none());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn encrypt_decrypt_round_trip() {
        let (fp, dlog, mut csprng) = setup();
        let keypair = ElGamalKeyPair::random(&mut csprng, &fp);

        for m in [0u64, 1, 2, 5, 77, 1000] {
            let nonce = fp.field.random_field_elem_min(&mut csprng, 1_u8);
            let ciphertext = elgamal_encrypt(m, &nonce, &keypair.public_key, &fp).unwrap();

            assert_eq!(
                ciphertext.decrypt(&keypair.secret_key, &fp, &dlog),
                Ok(m),
                "secret-key decryption"
            );
            assert_eq!(
                ciphertext.decrypt_known_nonce(&keypair.public_key, &nonce, &fp, &dlog),
                Ok(m),
                "known-nonce decryption"
            );
        }
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn homomorphic_addition() {
        let (fp, dlog, mut csprng) = setup();
        let keypair = ElGamalKeyPair::random(&mut csprng, &fp);

        let n1 = fp.field.random_field_elem_min(&mut csprng, 1_u8);
        let n2 = fp.field.random_field_elem_min(&mut csprng, 1_u8);
        let c1 = elgamal_encrypt(3, &n1, &keypair.public_key, &fp).unwrap();
        let c2 = elgamal_encrypt(9, &n2, &keypair.public_key, &fp).unwrap();

        let sum = elgamal_add([&c1, &c2], &fp);
        assert_eq!(sum.decrypt(&keypair.secret_key, &fp, &dlog), Ok(12));

        // The empty accumulation is the identity and decrypts to zero.
        let zero = elgamal_add([], &fp);
        assert_eq!(zero, elgamal_homomorphic_zero());
        assert_eq!(zero.decrypt(&keypair.secret_key, &fp, &dlog), Ok(0));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn combined_key_decrypts_jointly() {
        let (fp, dlog, mut csprng) = setup();
        let pair_1 = ElGamalKeyPair::random(&mut csprng, &fp);
        let pair_2 = ElGamalKeyPair::random(&mut csprng, &fp);

        let joint_key =
            elgamal_combine_public_keys([&pair_1.public_key, &pair_2.public_key], &fp);
        let joint_secret = pair_1.secret_key.add(&pair_2.secret_key, &fp.field);

        let nonce = fp.field.random_field_elem_min(&mut csprng, 1_u8);
        let ciphertext = elgamal_encrypt(8, &nonce, &joint_key, &fp).unwrap();
        assert_eq!(ciphertext.decrypt(&joint_secret, &fp, &dlog), Ok(8));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn hashed_elgamal_round_trip() {
        let (fp, _, mut csprng) = setup();
        let keypair = ElGamalKeyPair::random(&mut csprng, &fp);
        let seed = fp.field.random_field_elem(&mut csprng);

        // Lengths around the block boundary, including empty.
        for len in [0usize, 1, 31, 32, 33, 64, 100] {
            let message: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let nonce = fp.field.random_field_elem_min(&mut csprng, 1_u8);
            let ciphertext =
                hashed_elgamal_encrypt(&message, &nonce, &keypair.public_key, &seed, &fp).unwrap();
            assert_eq!(ciphertext.data.len(), message.len());

            let plaintext = ciphertext.decrypt(&keypair.secret_key, &seed, &fp).unwrap();
            assert_eq!(plaintext, message, "len {len}");
        }
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn hashed_elgamal_rejects_tampering() {
        let (fp, _, mut csprng) = setup();
        let keypair = ElGamalKeyPair::random(&mut csprng, &fp);
        let seed = fp.field.random_field_elem(&mut csprng);
        let nonce = fp.field.random_field_elem_min(&mut csprng, 1_u8);

        let mut ciphertext =
            hashed_elgamal_encrypt(b"backup coordinate", &nonce, &keypair.public_key, &seed, &fp)
                .unwrap();
        ciphertext.data[0] ^= 0x01;
        assert_eq!(
            ciphertext.decrypt(&keypair.secret_key, &seed, &fp),
            Err(HashedElGamalError::InvalidMac)
        );

        // Wrong seed also fails the MAC.
        let ciphertext =
            hashed_elgamal_encrypt(b"backup coordinate", &nonce, &keypair.public_key, &seed, &fp)
                .unwrap();
        let wrong_seed = seed.add(&util::algebra::ScalarField::one(), &fp.field);
        assert_eq!(
            ciphertext.decrypt(&keypair.secret_key, &wrong_seed, &fp),
            Err(HashedElGamalError::InvalidMac)
        );
    }
}
