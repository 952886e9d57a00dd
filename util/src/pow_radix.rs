#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! Fixed-base modular exponentiation acceleration.
//!
//! For a fixed basis `b`, the table stores `b^(j * 2^(i*k))` for every
//! window index `i` and window value `j < 2^k`, so that `b^e mod p` becomes
//! at most `ceil(bits(q) / k)` table lookups and multiplications. Larger
//! window sizes trade memory for speed.

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive};
use serde::{Deserialize, Serialize};

/// Memory-vs-speed options for [`PowRadix`].
///
/// Approximate per-instance table sizes for a 4096-bit modulus:
/// low ~4.2 MB, high ~84 MB, extreme ~537 MB.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowRadixOption {
    NoAcceleration,
    LowMemory,
    HighMemory,
    ExtremeMemory,
}

impl PowRadixOption {
    /// The window size `k` in bits. Zero means no table is built.
    pub fn window_bits(&self) -> usize {
        match self {
            PowRadixOption::NoAcceleration => 0,
            PowRadixOption::LowMemory => 8,
            PowRadixOption::HighMemory => 13,
            PowRadixOption::ExtremeMemory => 16,
        }
    }
}

/// Precomputed radix table for one fixed basis.
pub struct PowRadix {
    basis: BigUint,
    modulus: BigUint,
    order: BigUint,
    k: usize,
    table: Vec<Vec<BigUint>>,
}

impl PowRadix {
    /// Builds the table for `basis` so that `PowRadix::pow(e)` equals
    /// `basis.modpow(e % order, modulus)`.
    ///
    /// Construction cost is proportional to the table size; build once per
    /// basis and share.
    pub fn new(basis: BigUint, option: PowRadixOption, order: &BigUint, modulus: &BigUint) -> Self {
        let basis = basis % modulus;
        let k = option.window_bits();
        if k == 0 {
            return PowRadix {
                basis,
                modulus: modulus.clone(),
                order: order.clone(),
                k,
                table: Vec::new(),
            };
        }

        // Exponents are reduced mod `order` before slicing, so the windows
        // only need to cover its bit length.
        let e_bits = order.bits() as usize;
        let table_length = (e_bits + k - 1) / k;
        let row_width = 1usize << k;

        let mut table = Vec::with_capacity(table_length);
        let mut row_basis = basis.clone();
        for _ in 0..table_length {
            let mut row = Vec::with_capacity(row_width);
            row.push(BigUint::one());
            let mut running_basis = row_basis.clone();
            for _ in 1..row_width {
                row.push(running_basis.clone());
                running_basis = running_basis * &row_basis % modulus;
            }
            table.push(row);
            // The running basis is now row_basis^(2^k), the basis of the
            // next window.
            row_basis = running_basis;
        }

        PowRadix {
            basis,
            modulus: modulus.clone(),
            order: order.clone(),
            k,
            table,
        }
    }

    /// Computes `basis^e mod modulus`, reducing `e` mod the order first.
    pub fn pow(&self, e: &BigUint) -> BigUint {
        let e = e % &self.order;

        if self.k == 0 {
            return self.basis.modpow(&e, &self.modulus);
        }

        let window_mask = BigUint::from((1u64 << self.k) - 1);
        let mut y = BigUint::one();
        for (i, row) in self.table.iter().enumerate() {
            let e_slice = (&e >> (i * self.k)) & &window_mask;
            // The mask bounds the slice below 2^k, so it fits a usize.
            #[allow(clippy::unwrap_used)]
            let e_slice = e_slice.to_usize().unwrap();
            if e_slice != 0 {
                y = y * &row[e_slice] % &self.modulus;
            }
        }
        y
    }

    /// The basis this table was built for.
    pub fn basis(&self) -> &BigUint {
        &self.basis
    }
}

impl PartialEq for PowRadix {
    fn eq(&self, other: &Self) -> bool {
        self.basis == other.basis
            && self.modulus == other.modulus
            && self.order == other.order
            && self.k == other.k
    }
}

impl Eq for PowRadix {}

impl std::fmt::Debug for PowRadix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowRadix")
            .field("basis", &self.basis)
            .field("k", &self.k)
            .field("table_rows", &self.table.len())
            .finish()
    }
}
