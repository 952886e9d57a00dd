#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! A seedable cryptographically-secure pseudorandom number generator built on
//! a SHAKE-256 extendable-output function.
//!
//! Seeding from a caller-supplied byte string makes every draw reproducible,
//! which the tests rely on. Production callers are expected to seed from an
//! OS entropy source.

use num_bigint::BigUint;
use num_traits::Zero;
use std::num::NonZeroUsize;

pub struct Csprng(Box<dyn sha3::digest::XofReader>);

impl Csprng {
    /// Creates a new `Csprng` from the given seed bytes.
    ///
    /// The seed is length-prefixed before absorption, so distinct seeds
    /// always produce distinct streams.
    pub fn new(seed: &[u8]) -> Csprng {
        use sha3::digest::{ExtendableOutput, Update};

        let mut hasher = sha3::Shake256::default();

        let domain = b"opentally csprng";
        hasher.update(&(domain.len() as u64).to_le_bytes());
        hasher.update(&domain[..]);

        hasher.update(&(seed.len() as u64).to_le_bytes());
        hasher.update(seed);

        Csprng(Box::new(hasher.finalize_xof()))
    }

    /// Returns a uniformly random `u8`.
    pub fn next_u8(&mut self) -> u8 {
        let mut buf = [0u8];
        self.0.read(&mut buf);
        buf[0]
    }

    /// Returns a uniformly random `u32`.
    pub fn next_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.0.read(&mut buf);
        u32::from_le_bytes(buf)
    }

    /// Returns a uniformly random `u64`.
    pub fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.0.read(&mut buf);
        u64::from_le_bytes(buf)
    }

    /// Returns a uniformly random `bool`.
    pub fn next_bool(&mut self) -> bool {
        self.next_u8() & 1 != 0
    }

    /// Fills `dest` with random bytes.
    pub fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.read(dest);
    }

    /// Returns a random number chosen uniformly from `0 <= n < 2^bits`.
    pub fn next_biguint(&mut self, bits: NonZeroUsize) -> BigUint {
        let bits: usize = bits.get();

        let cnt_bytes = (bits + 7) / 8;
        let mut buf = vec![0; cnt_bytes];
        self.0.read(buf.as_mut_slice());

        // Mask off any bits in excess of the requested count.
        let cnt_extra_bits = cnt_bytes * 8 - bits;
        if 0 < cnt_extra_bits {
            debug_assert!(cnt_extra_bits < 8);
            buf[0] &= 0xffu8 >> cnt_extra_bits;
        }

        BigUint::from_bytes_be(buf.as_slice())
    }

    /// Returns a random number uniformly from `0 <= n < end`.
    /// `end` must be greater than `0`.
    pub fn next_biguint_lt(&mut self, end: &BigUint) -> BigUint {
        assert!(!end.is_zero(), "end must be greater than 0");

        // The `unwrap()` is justified here because `end` is nonzero.
        #[allow(clippy::unwrap_used)]
        let bits = NonZeroUsize::new(end.bits() as usize).unwrap();

        loop {
            let n = self.next_biguint(bits);
            if &n < end {
                break n;
            }
        }
    }

    /// Returns a random number uniformly from `start <= n < end`.
    /// `start` must be less than `end`.
    pub fn next_biguint_range(&mut self, start: &BigUint, end: &BigUint) -> BigUint {
        assert!(start < end, "start must be less than end");
        start + self.next_biguint_lt(&(end - start))
    }
}

impl rand::RngCore for Csprng {
    fn next_u32(&mut self) -> u32 {
        self.next_u32()
    }
    fn next_u64(&mut self) -> u64 {
        self.next_u64()
    }
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.read(dest);
    }
}

#[cfg(test)]
mod test_csprng {
    use super::*;
    use num_traits::One;

    #[test]
    fn reproducible_stream() {
        let mut a = Csprng::new(b"seed");
        let mut b = Csprng::new(b"seed");
        for _ in 0..10 {
            assert_eq!(a.next_u64(), b.next_u64());
        }

        let mut c = Csprng::new(b"another seed");
        assert_ne!(a.next_u64(), c.next_u64());
    }

    #[test]
    fn next_biguint() {
        let mut csprng = Csprng::new(b"next_biguint");
        for bits in 1..100 {
            #[allow(clippy::unwrap_used)]
            let j = csprng.next_biguint(NonZeroUsize::new(bits).unwrap());
            assert!(j < (BigUint::one() << bits));
        }
    }

    #[test]
    fn next_biguint_lt() {
        let mut csprng = Csprng::new(b"next_biguint_lt");
        for end in 1usize..100 {
            let end: BigUint = end.into();
            let j = csprng.next_biguint_lt(&end);
            assert!(j < end);
        }
    }

    #[test]
    fn next_biguint_range() {
        let mut csprng = Csprng::new(b"next_biguint_range");
        for start_usize in 0usize..50 {
            let start: BigUint = start_usize.into();
            for end in start_usize + 1..51 {
                let end: BigUint = end.into();
                let j = csprng.next_biguint_range(&start, &end);
                assert!(start <= j && j < end);
            }
        }
    }
}
