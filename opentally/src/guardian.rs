#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! A guardian: one trustee of the election secret key.
//!
//! The guardian owns its election key pair and polynomial, tracks the other
//! guardians' public keys, the backups it has issued and received, and the
//! verifications of its own backups. Secret state never leaves this struct;
//! everything shared with the mediator is public or encrypted.

use std::collections::BTreeMap;

use tracing::warn;

use util::algebra::FieldElement;
use util::csprng::Csprng;

use crate::{
    ballot::SubmittedBallot,
    decryption::{
        compute_compensated_decryption_share, compute_compensated_decryption_share_for_ballot,
        compute_decryption_share, compute_decryption_share_for_ballot,
    },
    decryption_share::{CompensatedDecryptionShare, DecryptionShare},
    election_context::CiphertextElectionContext,
    fixed_parameters::FixedParameters,
    key_ceremony::{
        combine_election_public_keys, decrypt_backup, generate_election_partial_key_backup,
        generate_election_partial_key_challenge, verify_election_partial_key_backup,
        verify_election_partial_key_challenge, CeremonyDetails, ElectionJointKey,
        ElectionKeyPair, ElectionPartialKeyBackup, ElectionPartialKeyChallenge,
        ElectionPartialKeyVerification, ElectionPublicKey,
    },
    tally::CiphertextTally,
    GuardianId,
};

/// One trustee, with its secrets and its view of the ceremony.
pub struct Guardian {
    /// The guardian's id.
    pub id: GuardianId,

    /// The guardian's sequence order; its Lagrange coordinate.
    pub sequence_order: u32,

    /// The ceremony's shape.
    pub ceremony_details: CeremonyDetails,

    election_keys: ElectionKeyPair,

    /// Every announced public key, this guardian's included.
    other_guardian_election_keys: BTreeMap<GuardianId, ElectionPublicKey>,

    /// Backups this guardian issued, keyed by the designated guardian.
    backups_to_share: BTreeMap<GuardianId, ElectionPartialKeyBackup>,

    /// Backups received from other guardians, keyed by owner.
    received_backups: BTreeMap<GuardianId, ElectionPartialKeyBackup>,

    /// Verifications of this guardian's own backups, keyed by verifier.
    backup_verifications: BTreeMap<GuardianId, ElectionPartialKeyVerification>,
}

impl Guardian {
    /// Creates a guardian and generates its election key pair.
    ///
    /// With `nonce_seed` the key generation is deterministic; tests use
    /// this, ceremonies do not.
    pub fn new(
        id: impl Into<GuardianId>,
        sequence_order: u32,
        number_of_guardians: u32,
        quorum: u32,
        csprng: &mut Csprng,
        nonce_seed: Option<&FieldElement>,
        fixed_parameters: &FixedParameters,
    ) -> Self {
        let id = id.into();
        let election_keys = ElectionKeyPair::generate(
            id.clone(),
            sequence_order,
            quorum,
            csprng,
            nonce_seed,
            fixed_parameters,
        );

        let mut guardian = Guardian {
            id,
            sequence_order,
            ceremony_details: CeremonyDetails {
                number_of_guardians,
                quorum,
            },
            election_keys,
            other_guardian_election_keys: BTreeMap::new(),
            backups_to_share: BTreeMap::new(),
            received_backups: BTreeMap::new(),
            backup_verifications: BTreeMap::new(),
        };
        // A guardian trivially knows and trusts its own key.
        guardian.save_guardian_key(guardian.share_key());
        guardian
    }

    /// The public part of this guardian's election key.
    pub fn share_key(&self) -> ElectionPublicKey {
        self.election_keys.share()
    }

    /// Records another guardian's announced public key.
    pub fn save_guardian_key(&mut self, key: ElectionPublicKey) {
        self.other_guardian_election_keys
            .insert(key.owner_id.clone(), key);
    }

    /// A previously saved public key, by guardian id.
    pub fn guardian_key(&self, guardian_id: &str) -> Option<&ElectionPublicKey> {
        self.other_guardian_election_keys.get(guardian_id)
    }

    /// Whether every guardian's key has been saved.
    pub fn all_guardian_keys_received(&self) -> bool {
        self.other_guardian_election_keys.len()
            == self.ceremony_details.number_of_guardians as usize
    }

    /// Computes one encrypted backup per other guardian.
    ///
    /// Requires every guardian key first; returns false otherwise.
    pub fn generate_election_partial_key_backups(
        &mut self,
        csprng: &mut Csprng,
        fixed_parameters: &FixedParameters,
    ) -> bool {
        if !self.all_guardian_keys_received() {
            warn!(
                id = %self.id,
                "cannot generate backups before all guardian keys arrive"
            );
            return false;
        }

        for key in self.other_guardian_election_keys.values() {
            if key.owner_id == self.id {
                continue;
            }
            let Some(backup) = generate_election_partial_key_backup(
                &self.id,
                &self.election_keys.polynomial,
                key,
                csprng,
                fixed_parameters,
            ) else {
                warn!(
                    id = %self.id,
                    designated_id = %key.owner_id,
                    "failed to generate backup"
                );
                return false;
            };
            self.backups_to_share.insert(key.owner_id.clone(), backup);
        }
        true
    }

    /// The backups this guardian issued, one per other guardian.
    pub fn share_election_partial_key_backups(&self) -> Vec<ElectionPartialKeyBackup> {
        self.backups_to_share.values().cloned().collect()
    }

    /// Records a backup designated to this guardian.
    pub fn save_election_partial_key_backup(&mut self, backup: ElectionPartialKeyBackup) {
        self.received_backups.insert(backup.owner_id.clone(), backup);
    }

    /// Whether a backup has arrived from every other guardian.
    pub fn all_election_partial_key_backups_received(&self) -> bool {
        self.received_backups.len() == self.ceremony_details.number_of_guardians as usize - 1
    }

    /// Decrypts and verifies the backup received from `owner_id`.
    pub fn verify_election_partial_key_backup(
        &self,
        owner_id: &str,
        fixed_parameters: &FixedParameters,
    ) -> Option<ElectionPartialKeyVerification> {
        let backup = self.received_backups.get(owner_id)?;
        let owner_key = self.other_guardian_election_keys.get(owner_id)?;
        Some(verify_election_partial_key_backup(
            &self.id,
            backup,
            owner_key,
            &self.election_keys,
            fixed_parameters,
        ))
    }

    /// Publishes a challenge for the backup this guardian issued to
    /// `designated_id`, exposing the coordinate in the clear.
    pub fn publish_election_backup_challenge(
        &self,
        designated_id: &str,
        fixed_parameters: &FixedParameters,
    ) -> Option<ElectionPartialKeyChallenge> {
        let backup = self.backups_to_share.get(designated_id)?;
        Some(generate_election_partial_key_challenge(
            backup,
            &self.election_keys.polynomial,
            fixed_parameters,
        ))
    }

    /// Acts as the alternate verifier for another guardian's challenge.
    pub fn verify_election_partial_key_challenge(
        &self,
        challenge: &ElectionPartialKeyChallenge,
        fixed_parameters: &FixedParameters,
    ) -> ElectionPartialKeyVerification {
        verify_election_partial_key_challenge(&self.id, challenge, fixed_parameters)
    }

    /// Records a verification of one of this guardian's own backups.
    pub fn save_election_partial_key_verification(
        &mut self,
        verification: ElectionPartialKeyVerification,
    ) {
        self.backup_verifications
            .insert(verification.verifier_id.clone(), verification);
    }

    /// Whether every other guardian has verified this guardian's backups.
    pub fn all_election_partial_key_backups_verified(&self) -> bool {
        let expected = self.ceremony_details.number_of_guardians as usize - 1;
        self.backup_verifications.len() == expected
            && self.backup_verifications.values().all(|v| v.verified)
    }

    /// Combines all known public keys into the joint key, once every key is
    /// present and every one of this guardian's backups verified.
    pub fn publish_joint_key(
        &self,
        fixed_parameters: &FixedParameters,
    ) -> Option<ElectionJointKey> {
        if !self.all_guardian_keys_received() {
            return None;
        }
        if !self.all_election_partial_key_backups_verified() {
            return None;
        }
        let keys: Vec<ElectionPublicKey> = self
            .other_guardian_election_keys
            .values()
            .cloned()
            .collect();
        Some(combine_election_public_keys(&keys, fixed_parameters))
    }

    //---------------------------------------------------------------------
    // Decryption
    //---------------------------------------------------------------------

    /// This guardian's decryption share of the tally.
    pub fn compute_tally_share(
        &self,
        tally: &CiphertextTally,
        context: &CiphertextElectionContext,
        csprng: &mut Csprng,
        fixed_parameters: &FixedParameters,
    ) -> Option<DecryptionShare> {
        compute_decryption_share(&self.election_keys, tally, context, csprng, fixed_parameters)
    }

    /// This guardian's decryption shares of the given ballots, keyed by
    /// ballot id.
    pub fn compute_ballot_shares<'a>(
        &self,
        ballots: impl IntoIterator<Item = &'a SubmittedBallot>,
        context: &CiphertextElectionContext,
        csprng: &mut Csprng,
        fixed_parameters: &FixedParameters,
    ) -> Option<BTreeMap<String, DecryptionShare>> {
        let mut shares = BTreeMap::new();
        for ballot in ballots {
            let share = compute_decryption_share_for_ballot(
                &self.election_keys,
                ballot,
                context,
                csprng,
                fixed_parameters,
            )?;
            shares.insert(ballot.object_id.clone(), share);
        }
        Some(shares)
    }

    /// The decrypted backup coordinate this guardian holds for a missing
    /// guardian.
    fn missing_guardian_coordinate(
        &self,
        missing_guardian_id: &str,
        fixed_parameters: &FixedParameters,
    ) -> Option<FieldElement> {
        let backup = self.received_backups.get(missing_guardian_id)?;
        decrypt_backup(backup, &self.election_keys, fixed_parameters)
    }

    /// This guardian's compensated tally share for a missing guardian.
    pub fn compute_compensated_tally_share(
        &self,
        missing_guardian_id: &str,
        tally: &CiphertextTally,
        context: &CiphertextElectionContext,
        csprng: &mut Csprng,
        fixed_parameters: &FixedParameters,
    ) -> Option<CompensatedDecryptionShare> {
        let Some(coordinate) =
            self.missing_guardian_coordinate(missing_guardian_id, fixed_parameters)
        else {
            warn!(
                id = %self.id,
                missing_guardian_id,
                "no usable backup for missing guardian"
            );
            return None;
        };
        let missing_key = self.other_guardian_election_keys.get(missing_guardian_id)?;

        compute_compensated_decryption_share(
            &coordinate,
            &self.share_key(),
            missing_key,
            tally,
            context,
            csprng,
            fixed_parameters,
        )
    }

    /// This guardian's compensated ballot shares for a missing guardian,
    /// keyed by ballot id.
    pub fn compute_compensated_ballot_shares<'a>(
        &self,
        missing_guardian_id: &str,
        ballots: impl IntoIterator<Item = &'a SubmittedBallot>,
        context: &CiphertextElectionContext,
        csprng: &mut Csprng,
        fixed_parameters: &FixedParameters,
    ) -> Option<BTreeMap<String, CompensatedDecryptionShare>> {
        let coordinate =
            self.missing_guardian_coordinate(missing_guardian_id, fixed_parameters)?;
        let missing_key = self.other_guardian_election_keys.get(missing_guardian_id)?;

        let mut shares = BTreeMap::new();
        for ballot in ballots {
            let share = compute_compensated_decryption_share_for_ballot(
                &coordinate,
                &self.share_key(),
                missing_key,
                ballot,
                context,
                csprng,
                fixed_parameters,
            )?;
            shares.insert(ballot.object_id.clone(), share);
        }
        Some(shares)
    }
}
