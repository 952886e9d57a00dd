#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! Running ballot codes: each encryption device seeds a hash chain, and
//! every ballot's code folds in the previous code, the timestamp, and the
//! ballot hash. Tampering with any ballot requires re-hashing every ballot
//! after it on the same device.

use util::algebra::{FieldElement, ScalarField};

use crate::hash_elems;

/// The starting hash for a device's chain.
pub fn get_hash_for_device(
    device_id: u64,
    session_id: &str,
    launch_code: u64,
    location: &str,
    field: &ScalarField,
) -> FieldElement {
    hash_elems!(field; device_id, session_id, launch_code, location)
}

/// The rotated code for one ballot.
pub fn get_ballot_code(
    prev_code: &FieldElement,
    timestamp: u64,
    ballot_hash: &FieldElement,
    field: &ScalarField,
) -> FieldElement {
    hash_elems!(field; prev_code, timestamp, ballot_hash)
}

#[cfg(test)]
mod test {
    use super::*;
    use util::pow_radix::PowRadixOption;

    use crate::standard_parameters::test_parameters;

    #[test]
    fn device_hash_is_deterministic() {
        let field = test_parameters(PowRadixOption::NoAcceleration).field;
        let a = get_hash_for_device(1234, "session", 42, "polling-place-9", &field);
        let b = get_hash_for_device(1234, "session", 42, "polling-place-9", &field);
        let c = get_hash_for_device(1234, "session", 42, "polling-place-10", &field);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn codes_chain_and_depend_on_every_input() {
        let field = test_parameters(PowRadixOption::NoAcceleration).field;
        let device_hash = get_hash_for_device(1, "session", 2, "loc", &field);
        let ballot_hash = FieldElement::from(77_u8, &field);

        let code_1 = get_ballot_code(&device_hash, 1000, &ballot_hash, &field);
        let same = get_ballot_code(&device_hash, 1000, &ballot_hash, &field);
        let later = get_ballot_code(&device_hash, 1001, &ballot_hash, &field);
        assert_eq!(code_1, same, "same inputs, same code");
        assert_ne!(code_1, later, "different timestamps, different codes");

        // The second ballot chains off the first.
        let code_2 = get_ballot_code(&code_1, 1001, &ballot_hash, &field);
        assert_ne!(code_1, code_2);
    }
}
