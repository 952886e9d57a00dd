#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! A deterministic stream of elements of `Z_q` derived from a seed.
//!
//! The i-th element is `hash_elems(seed, i)`, so the stream is infinite,
//! restartable, and constant-time to index. Headers mixed into the seed at
//! construction bind a stream to its purpose, keeping nonces derived for
//! one use from being confused with another.

use util::algebra::{FieldElement, ScalarField};

use crate::hash::{hash_elems, HashInput};
use crate::hash_elems;

/// A seeded, indexable sequence of `Z_q` elements.
#[derive(Clone, Debug)]
pub struct Nonces {
    seed: FieldElement,
    field: ScalarField,
}

impl Nonces {
    /// Creates a stream from a bare seed.
    pub fn new(seed: &FieldElement, field: &ScalarField) -> Self {
        Nonces {
            seed: seed.clone(),
            field: field.clone(),
        }
    }

    /// Creates a stream whose effective seed is `hash_elems(seed, headers...)`.
    pub fn with_headers(seed: &FieldElement, headers: &[HashInput], field: &ScalarField) -> Self {
        let mut inputs = Vec::with_capacity(headers.len() + 1);
        inputs.push(HashInput::from(seed));
        inputs.extend(headers.iter().cloned());
        Nonces {
            seed: hash_elems(field, &inputs),
            field: field.clone(),
        }
    }

    /// The i-th element of the stream.
    pub fn get(&self, i: usize) -> FieldElement {
        hash_elems!(&self.field; &self.seed, i)
    }

    /// The i-th element, with extra headers describing its use.
    pub fn get_with_headers(&self, i: usize, headers: &[HashInput]) -> FieldElement {
        let mut inputs = Vec::with_capacity(headers.len() + 2);
        inputs.push(HashInput::from(&self.seed));
        inputs.push(HashInput::from(i));
        inputs.extend(headers.iter().cloned());
        hash_elems(&self.field, &inputs)
    }

    /// The first `n` elements of the stream.
    pub fn take(&self, n: usize) -> Vec<FieldElement> {
        (0..n).map(|i| self.get(i)).collect()
    }
}
