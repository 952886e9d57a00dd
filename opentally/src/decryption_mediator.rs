#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! The decryption mediator.
//!
//! Guardians announce themselves with their tally (and ballot) shares;
//! missing guardians are announced by the others. Once a quorum is present
//! and every guardian is accounted for, compensated shares are collected,
//! missing shares reconstructed by Lagrange interpolation, and the
//! plaintext tally and spoiled ballots decrypted. The mediator holds only
//! shares and public keys.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::{
    ballot::SubmittedBallot,
    decrypt_with_shares::{decrypt_ballot, decrypt_tally},
    decryption::{
        compute_lagrange_coefficients_for_guardians, reconstruct_decryption_share,
        reconstruct_decryption_share_for_ballot,
    },
    decryption_share::{CompensatedDecryptionShare, DecryptionShare},
    discrete_log::DiscreteLog,
    election_context::CiphertextElectionContext,
    election_record::LagrangeCoefficientsRecord,
    fixed_parameters::FixedParameters,
    key_ceremony::ElectionPublicKey,
    key_ceremony_mediator::GuardianPair,
    tally::{CiphertextTally, PlaintextTally},
    GuardianId,
};

/// Collects decryption shares and produces plaintext results.
pub struct DecryptionMediator {
    /// The mediator's id.
    pub id: String,

    context: CiphertextElectionContext,

    available_guardians: BTreeMap<GuardianId, ElectionPublicKey>,
    missing_guardians: BTreeMap<GuardianId, ElectionPublicKey>,

    tally_shares: BTreeMap<GuardianId, DecryptionShare>,
    ballot_shares: BTreeMap<String, BTreeMap<GuardianId, DecryptionShare>>,

    compensated_tally_shares: BTreeMap<GuardianPair, CompensatedDecryptionShare>,
    compensated_ballot_shares: BTreeMap<String, BTreeMap<GuardianPair, CompensatedDecryptionShare>>,
}

impl DecryptionMediator {
    pub fn new(id: impl Into<String>, context: CiphertextElectionContext) -> Self {
        DecryptionMediator {
            id: id.into(),
            context,
            available_guardians: BTreeMap::new(),
            missing_guardians: BTreeMap::new(),
            tally_shares: BTreeMap::new(),
            ballot_shares: BTreeMap::new(),
            compensated_tally_shares: BTreeMap::new(),
            compensated_ballot_shares: BTreeMap::new(),
        }
    }

    /// Announces a present guardian with its tally share and, optionally,
    /// its spoiled-ballot shares. Re-announcement is a no-op.
    pub fn announce(
        &mut self,
        guardian_key: &ElectionPublicKey,
        tally_share: DecryptionShare,
        ballot_shares: Option<BTreeMap<String, DecryptionShare>>,
    ) {
        let guardian_id = guardian_key.owner_id.clone();

        if self.available_guardians.contains_key(&guardian_id) {
            info!(guardian_id = %guardian_id, "guardian already announced");
            return;
        }

        self.tally_shares.insert(guardian_id.clone(), tally_share);
        if let Some(ballot_shares) = ballot_shares {
            for (ballot_id, share) in ballot_shares {
                self.ballot_shares
                    .entry(ballot_id)
                    .or_default()
                    .insert(guardian_id.clone(), share);
            }
        }

        // A guardian that shows up late stops being missing.
        self.missing_guardians.remove(&guardian_id);
        self.available_guardians
            .insert(guardian_id, guardian_key.clone());
    }

    /// Announces a guardian as missing. Ignored when the guardian already
    /// announced as present.
    pub fn announce_missing(&mut self, missing_guardian_key: &ElectionPublicKey) {
        let missing_guardian_id = missing_guardian_key.owner_id.clone();
        if self.available_guardians.contains_key(&missing_guardian_id) {
            info!(
                guardian_id = %missing_guardian_id,
                "guardian already announced as present"
            );
            return;
        }
        self.missing_guardians
            .insert(missing_guardian_id, missing_guardian_key.clone());
    }

    /// Cross-checks one guardian's view of who is missing against what has
    /// been announced so far.
    ///
    /// The first announcement of a missing guardian's key is trusted;
    /// any later mismatch returns false and decryption must not proceed.
    pub fn validate_missing_guardians(&mut self, guardian_keys: &[ElectionPublicKey]) -> bool {
        for key in guardian_keys {
            if self.available_guardians.contains_key(&key.owner_id) {
                continue;
            }
            match self.missing_guardians.get(&key.owner_id) {
                Some(existing) if existing != key => {
                    warn!(
                        guardian_id = %key.owner_id,
                        "public key mismatch for missing guardian"
                    );
                    return false;
                }
                Some(_) => {}
                None => {
                    self.missing_guardians
                        .insert(key.owner_id.clone(), key.clone());
                }
            }
        }
        true
    }

    /// Whether a quorum announced and every guardian is accounted for.
    pub fn announcement_complete(&self) -> bool {
        if (self.available_guardians.len() as u32) < self.context.quorum {
            warn!("cannot decrypt with less than quorum available guardians");
            return false;
        }
        if (self.available_guardians.len() + self.missing_guardians.len()) as u32
            != self.context.number_of_guardians
        {
            warn!("cannot decrypt without accounting for all guardians");
            return false;
        }
        true
    }

    /// The available guardians' keys.
    pub fn get_available_guardians(&self) -> Vec<ElectionPublicKey> {
        self.available_guardians.values().cloned().collect()
    }

    /// The missing guardians' keys.
    pub fn get_missing_guardians(&self) -> Vec<ElectionPublicKey> {
        self.missing_guardians.values().cloned().collect()
    }

    /// Accepts one compensated tally share.
    pub fn receive_tally_compensation_share(
        &mut self,
        tally_compensation_share: CompensatedDecryptionShare,
    ) {
        self.compensated_tally_shares.insert(
            GuardianPair {
                owner_id: tally_compensation_share.guardian_id.clone(),
                designated_id: tally_compensation_share.missing_guardian_id.clone(),
            },
            tally_compensation_share,
        );
    }

    /// Accepts compensated ballot shares, keyed by ballot id.
    pub fn receive_ballot_compensation_shares(
        &mut self,
        ballot_compensation_shares: BTreeMap<String, CompensatedDecryptionShare>,
    ) {
        for (ballot_id, share) in ballot_compensation_shares {
            self.compensated_ballot_shares
                .entry(ballot_id)
                .or_default()
                .insert(
                    GuardianPair {
                        owner_id: share.guardian_id.clone(),
                        designated_id: share.missing_guardian_id.clone(),
                    },
                    share,
                );
        }
    }

    /// The Lagrange coefficients of the available guardians, as published
    /// for external verifiers.
    pub fn lagrange_coefficients(
        &self,
        fixed_parameters: &FixedParameters,
    ) -> Option<LagrangeCoefficientsRecord> {
        let available: Vec<ElectionPublicKey> =
            self.available_guardians.values().cloned().collect();
        compute_lagrange_coefficients_for_guardians(&available, &fixed_parameters.field)
            .map(|coefficients| LagrangeCoefficientsRecord { coefficients })
    }

    /// Reconstructs every missing guardian's tally share from the
    /// compensated shares received so far.
    pub fn reconstruct_shares_for_tally(
        &mut self,
        ciphertext_tally: &CiphertextTally,
        fixed_parameters: &FixedParameters,
    ) -> bool {
        let available: Vec<ElectionPublicKey> =
            self.available_guardians.values().cloned().collect();
        let Some(lagrange_coefficients) =
            compute_lagrange_coefficients_for_guardians(&available, &fixed_parameters.field)
        else {
            warn!("cannot compute Lagrange coefficients for the available guardians");
            return false;
        };

        for (missing_guardian_id, missing_guardian_key) in &self.missing_guardians {
            // Share already reconstructed.
            if self.tally_shares.contains_key(missing_guardian_id) {
                continue;
            }

            let compensated_shares =
                filter_by_missing_guardian(missing_guardian_id, &self.compensated_tally_shares);

            let Some(reconstructed) = reconstruct_decryption_share(
                missing_guardian_key,
                ciphertext_tally,
                &compensated_shares,
                &lagrange_coefficients,
                fixed_parameters,
            ) else {
                warn!(
                    missing_guardian_id = %missing_guardian_id,
                    "failed to reconstruct tally share"
                );
                return false;
            };
            self.tally_shares
                .insert(missing_guardian_id.clone(), reconstructed);
        }
        true
    }

    /// Reconstructs every missing guardian's share of every given ballot.
    pub fn reconstruct_shares_for_ballots(
        &mut self,
        ciphertext_ballots: &[&SubmittedBallot],
        fixed_parameters: &FixedParameters,
    ) -> bool {
        let available: Vec<ElectionPublicKey> =
            self.available_guardians.values().cloned().collect();
        let Some(lagrange_coefficients) =
            compute_lagrange_coefficients_for_guardians(&available, &fixed_parameters.field)
        else {
            warn!("cannot compute Lagrange coefficients for the available guardians");
            return false;
        };

        for ballot in ciphertext_ballots {
            let ballot_id = &ballot.object_id;
            let compensated = self
                .compensated_ballot_shares
                .get(ballot_id)
                .cloned()
                .unwrap_or_default();

            for (missing_guardian_id, missing_guardian_key) in &self.missing_guardians {
                let already = self
                    .ballot_shares
                    .get(ballot_id)
                    .is_some_and(|shares| shares.contains_key(missing_guardian_id));
                if already {
                    continue;
                }

                let compensated_shares =
                    filter_by_missing_guardian(missing_guardian_id, &compensated);

                let Some(reconstructed) = reconstruct_decryption_share_for_ballot(
                    missing_guardian_key,
                    ballot,
                    &compensated_shares,
                    &lagrange_coefficients,
                    fixed_parameters,
                ) else {
                    warn!(
                        ballot_id = %ballot_id,
                        missing_guardian_id = %missing_guardian_id,
                        "failed to reconstruct ballot share"
                    );
                    return false;
                };
                self.ballot_shares
                    .entry(ballot_id.clone())
                    .or_default()
                    .insert(missing_guardian_id.clone(), reconstructed);
            }
        }
        true
    }

    /// The plaintext tally, once every guardian (present or reconstructed)
    /// has a share for every selection.
    pub fn get_plaintext_tally(
        &self,
        ciphertext_tally: &CiphertextTally,
        fixed_parameters: &FixedParameters,
        dlog: &DiscreteLog,
    ) -> Option<PlaintextTally> {
        if !self.announcement_complete() || !self.ready_to_decrypt(&self.tally_shares) {
            return None;
        }

        decrypt_tally(
            ciphertext_tally,
            &self.tally_shares,
            &self.context.crypto_extended_base_hash,
            fixed_parameters,
            dlog,
        )
    }

    /// The decrypted spoiled ballots, keyed by ballot id. Ballots whose
    /// shares are incomplete are skipped.
    pub fn get_plaintext_ballots(
        &self,
        ciphertext_ballots: &[&SubmittedBallot],
        fixed_parameters: &FixedParameters,
        dlog: &DiscreteLog,
    ) -> Option<BTreeMap<String, PlaintextTally>> {
        if !self.announcement_complete() {
            return None;
        }

        let mut ballots = BTreeMap::new();
        for ballot in ciphertext_ballots {
            let Some(shares) = self.ballot_shares.get(&ballot.object_id) else {
                continue;
            };
            if !self.ready_to_decrypt(shares) {
                continue;
            }
            if let Some(plaintext) = decrypt_ballot(
                ballot,
                shares,
                &self.context.crypto_extended_base_hash,
                fixed_parameters,
                dlog,
            ) {
                ballots.insert(ballot.object_id.clone(), plaintext);
            }
        }
        Some(ballots)
    }

    /// Every guardian, present or reconstructed, has a share here.
    fn ready_to_decrypt(&self, shares: &BTreeMap<GuardianId, DecryptionShare>) -> bool {
        shares.len() as u32 == self.context.number_of_guardians
    }
}

fn filter_by_missing_guardian(
    missing_guardian_id: &str,
    shares: &BTreeMap<GuardianPair, CompensatedDecryptionShare>,
) -> BTreeMap<GuardianId, CompensatedDecryptionShare> {
    shares
        .iter()
        .filter(|(pair, _)| pair.designated_id == missing_guardian_id)
        .map(|(pair, share)| (pair.owner_id.clone(), share.clone()))
        .collect()
}
