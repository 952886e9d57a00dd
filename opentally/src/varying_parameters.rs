#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! The per-election parameters: how many guardians share the key, and how
//! many are needed to decrypt.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// The parameters varying from election to election.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaryingParameters {
    /// Number of guardians `n`.
    pub n: u32,

    /// Decryption quorum threshold `k`.
    pub k: u32,
}

impl VaryingParameters {
    /// Verifies `1 <= k <= n`.
    pub fn verify(&self) -> Result<()> {
        if self.n < 1 {
            bail!("Varying parameters failed check: 1 <= n");
        }
        if self.k < 1 {
            bail!("Varying parameters failed check: 1 <= k");
        }
        if self.k > self.n {
            bail!("Varying parameters failed check: k <= n");
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::VaryingParameters;

    #[test]
    fn verify_bounds() {
        assert!(VaryingParameters { n: 3, k: 2 }.verify().is_ok());
        assert!(VaryingParameters { n: 1, k: 1 }.verify().is_ok());
        assert!(VaryingParameters { n: 0, k: 0 }.verify().is_err());
        assert!(VaryingParameters { n: 3, k: 0 }.verify().is_err());
        assert!(VaryingParameters { n: 2, k: 3 }.verify().is_err());
    }
}
