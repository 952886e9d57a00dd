#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! Probabilistic primality testing, used to validate election parameters.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::csprng::Csprng;

const SMALL_PRIMES: [u8; 54] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
    101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191, 193,
    197, 199, 211, 223, 227, 229, 233, 239, 241, 251,
];

/// The number of Miller-Rabin iterations performed per call.
pub const MILLER_RABIN_ITERATIONS: usize = 50;

/// Primality test.
///
/// Trial division by a small-prime table, then [`MILLER_RABIN_ITERATIONS`]
/// rounds of Miller-Rabin with bases drawn from `csprng`. Calling this on
/// very large numbers is expensive.
pub fn is_prime(n: &BigUint, csprng: &mut Csprng) -> bool {
    let two = BigUint::from(2u8);

    if *n < two {
        return false;
    }

    for small_prime in SMALL_PRIMES {
        let small_prime = BigUint::from(small_prime);
        if *n == small_prime {
            return true;
        }
        if n.is_multiple_of(&small_prime) {
            return false;
        }
    }

    // Write n - 1 as d * 2^r with d odd.
    let n_minus_1 = n - BigUint::one();
    let r = n_minus_1
        .trailing_zeros()
        .unwrap_or_default();
    let d = &n_minus_1 >> r;

    'witness: for _ in 0..MILLER_RABIN_ITERATIONS {
        let a = csprng.next_biguint_range(&two, &n_minus_1);
        let mut x = a.modpow(&d, n);
        if x.is_one() || x == n_minus_1 {
            continue;
        }
        for _ in 1..r {
            x = x.modpow(&two, n);
            if x == n_minus_1 {
                continue 'witness;
            }
        }
        return false;
    }

    true
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn small_numbers() {
        let mut csprng = Csprng::new(b"test is_prime small");
        let primes: [u32; 12] = [2, 3, 5, 7, 11, 13, 127, 251, 257, 65521, 65537, 32633];
        let composites: [u32; 10] = [0, 1, 4, 9, 15, 255, 65520, 65522, 100_000, 59183 - 1];

        for p in primes {
            assert!(is_prime(&BigUint::from(p), &mut csprng), "{p} is prime");
        }
        for c in composites {
            assert!(!is_prime(&BigUint::from(c), &mut csprng), "{c} is composite");
        }
    }

    #[test]
    fn large_prime() {
        let mut csprng = Csprng::new(b"test is_prime large");
        // 2^61 - 1, a Mersenne prime
        let p = (BigUint::one() << 61) - BigUint::one();
        assert!(is_prime(&p, &mut csprng));
        assert!(!is_prime(&(p + BigUint::one()), &mut csprng));
    }
}
