#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! End-to-end verifiable election cryptography.
//!
//! The crate implements the cryptographic kernel of a verifiable election:
//! exponential ElGamal over a prime-order subgroup, a threshold key ceremony
//! built on Shamir secret sharing with published commitments, non-interactive
//! zero-knowledge proofs tying every ciphertext and decryption share to a
//! public transcript, a ballot encryption pipeline with placeholder
//! selections, homomorphic tally accumulation, and quorum decryption with
//! compensation for missing guardians.
//!
//! Manifest authoring, ballot-validity policy, serialization formats, and
//! publishing are deliberately left to callers; the crate consumes stable
//! object ids, sequence orders, and a manifest hash, and produces the
//! publishable records external verifiers need.

pub mod ballot;
pub mod ballot_box;
pub mod ballot_code;
pub mod chaum_pedersen;
pub mod decrypt_with_shares;
pub mod decryption;
pub mod decryption_mediator;
pub mod decryption_share;
pub mod discrete_log;
pub mod el_gamal;
pub mod election_context;
pub mod election_parameters;
pub mod election_polynomial;
pub mod election_record;
pub mod encrypt;
pub mod fixed_parameters;
pub mod guardian;
pub mod hash;
pub mod key_ceremony;
pub mod key_ceremony_mediator;
pub mod manifest;
pub mod nonces;
pub mod schnorr;
pub mod standard_parameters;
pub mod tally;
pub mod varying_parameters;

/// Identifies a guardian across the ceremony and decryption protocols.
pub type GuardianId = String;
