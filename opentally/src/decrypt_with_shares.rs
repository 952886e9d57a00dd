#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! Combining decryption shares into plaintext tallies.
//!
//! For every selection ciphertext `(A, B)` the shares multiply into
//! `M = ∏ M_i`; the plaintext encoding is `B / M = g^t` and the integer
//! tally `t` comes out of the discrete-log cache. Every share is validated
//! against its guardian's public key before it contributes.

use std::collections::BTreeMap;

use tracing::warn;

use util::algebra::{FieldElement, Group};

use crate::{
    ballot::{CiphertextContest, CiphertextSelection, SubmittedBallot},
    decryption_share::{get_shares_for_selection, DecryptionShare},
    discrete_log::DiscreteLog,
    fixed_parameters::FixedParameters,
    tally::{
        CiphertextTally, PlaintextTally, PlaintextTallyContest, PlaintextTallySelection,
    },
    GuardianId,
};

/// Decrypts a ciphertext tally with the given shares.
///
/// Returns `None` when any selection lacks a share from any guardian or
/// any share fails validation.
pub fn decrypt_tally(
    tally: &CiphertextTally,
    shares: &BTreeMap<GuardianId, DecryptionShare>,
    crypto_extended_base_hash: &FieldElement,
    fixed_parameters: &FixedParameters,
    dlog: &DiscreteLog,
) -> Option<PlaintextTally> {
    let mut contests = BTreeMap::new();
    for contest in tally.contests.values() {
        let plaintext_contest = decrypt_contest_with_decryption_shares(
            &contest.to_ciphertext_contest(),
            shares,
            crypto_extended_base_hash,
            fixed_parameters,
            dlog,
        )?;
        contests.insert(contest.object_id.clone(), plaintext_contest);
    }

    Some(PlaintextTally {
        object_id: tally.object_id.clone(),
        contests,
    })
}

/// Decrypts a single (spoiled) ballot with the given shares. The result
/// shares the tally shape, keyed by the ballot id.
pub fn decrypt_ballot(
    ballot: &SubmittedBallot,
    shares: &BTreeMap<GuardianId, DecryptionShare>,
    crypto_extended_base_hash: &FieldElement,
    fixed_parameters: &FixedParameters,
    dlog: &DiscreteLog,
) -> Option<PlaintextTally> {
    let mut contests = BTreeMap::new();
    for contest in &ballot.contests {
        let plaintext_contest = decrypt_contest_with_decryption_shares(
            &contest.to_ciphertext_contest(),
            shares,
            crypto_extended_base_hash,
            fixed_parameters,
            dlog,
        )?;
        contests.insert(contest.object_id.clone(), plaintext_contest);
    }

    Some(PlaintextTally {
        object_id: ballot.object_id.clone(),
        contests,
    })
}

fn decrypt_contest_with_decryption_shares(
    contest: &CiphertextContest,
    shares: &BTreeMap<GuardianId, DecryptionShare>,
    crypto_extended_base_hash: &FieldElement,
    fixed_parameters: &FixedParameters,
    dlog: &DiscreteLog,
) -> Option<PlaintextTallyContest> {
    let mut plaintext_selections = BTreeMap::new();
    for selection in &contest.selections {
        let selection_shares = get_shares_for_selection(&selection.object_id, shares);
        let Some(plaintext_selection) = decrypt_selection_with_decryption_shares(
            selection,
            &selection_shares,
            crypto_extended_base_hash,
            false,
            fixed_parameters,
            dlog,
        ) else {
            warn!(
                contest_id = %contest.object_id,
                selection_id = %selection.object_id,
                "could not decrypt contest selection"
            );
            return None;
        };
        plaintext_selections.insert(selection.object_id.clone(), plaintext_selection);
    }

    Some(PlaintextTallyContest {
        object_id: contest.object_id.clone(),
        selections: plaintext_selections,
    })
}

/// Decrypts one selection from its collected shares.
///
/// Each share arrives paired with the public key to validate it against;
/// the validity check can be suppressed for tests.
pub fn decrypt_selection_with_decryption_shares(
    selection: &CiphertextSelection,
    shares: &BTreeMap<
        GuardianId,
        (
            util::algebra::GroupElement,
            &crate::decryption_share::CiphertextDecryptionSelection,
        ),
    >,
    crypto_extended_base_hash: &FieldElement,
    suppress_validity_check: bool,
    fixed_parameters: &FixedParameters,
    dlog: &DiscreteLog,
) -> Option<PlaintextTallySelection> {
    let group = &fixed_parameters.group;

    if !suppress_validity_check {
        for (public_key, decryption) in shares.values() {
            if !decryption.is_valid(
                &selection.ciphertext,
                public_key,
                crypto_extended_base_hash,
                fixed_parameters,
            ) {
                return None;
            }
        }
    }

    // M = ∏ M_i over every guardian's share.
    let all_shares_product_m = shares
        .values()
        .fold(Group::one(), |product, (_, decryption)| {
            product.mul(&decryption.share, group)
        });

    // B / M = g^t
    let decrypted_value = selection.ciphertext.data.div(&all_shares_product_m, group)?;
    let Ok(tally) = dlog.discrete_log(&decrypted_value, group) else {
        warn!(
            object_id = %selection.object_id,
            "selection plaintext exceeds the discrete log ceiling"
        );
        return None;
    };

    Some(PlaintextTallySelection {
        object_id: selection.object_id.clone(),
        tally,
        value: decrypted_value,
        message: selection.ciphertext.clone(),
        shares: shares
            .values()
            .map(|(_, decryption)| (*decryption).clone())
            .collect(),
    })
}
