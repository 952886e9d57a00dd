#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! Bundles the fixed cryptographic parameters with the varying per-election
//! parameters.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use util::csprng::Csprng;

use crate::{fixed_parameters::FixedParameters, varying_parameters::VaryingParameters};

/// All parameters for an election.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionParameters {
    pub fixed_parameters: FixedParameters,
    pub varying_parameters: VaryingParameters,
}

impl ElectionParameters {
    /// Verifies both parameter sets. Expensive, startup-time only.
    pub fn validate(&self, csprng: &mut Csprng) -> Result<()> {
        self.fixed_parameters.validate(csprng)?;
        self.varying_parameters.verify()?;
        Ok(())
    }
}
