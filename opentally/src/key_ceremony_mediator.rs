#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! The key ceremony mediator.
//!
//! The mediator relays announcements, backups, verifications, and
//! challenges between guardians round by round, and tracks when each
//! round is complete. It holds public keys and ciphertexts only; no secret
//! ever passes through it. When a verification fails, the owner's published
//! challenge is re-verified here (the mediator acting as the alternate
//! verifier), and an upheld challenge replaces the failed verdict. Whether
//! to disqualify the loser of a challenge is the caller's decision.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    fixed_parameters::FixedParameters,
    key_ceremony::{
        combine_election_public_keys, verify_election_partial_key_challenge, CeremonyDetails,
        ElectionJointKey, ElectionPartialKeyBackup, ElectionPartialKeyChallenge,
        ElectionPartialKeyVerification, ElectionPublicKey,
    },
    GuardianId,
};

/// An ordered (owner, designated) pair of guardians.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GuardianPair {
    pub owner_id: GuardianId,
    pub designated_id: GuardianId,
}

/// Where backup verification stands across the whole ceremony.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupVerificationState {
    /// Every expected verification has been received.
    pub all_received: bool,

    /// Every received verification succeeded.
    pub all_verified: bool,

    /// The pairs whose verification failed and was not repaired by a
    /// challenge.
    pub failed_verifications: Vec<GuardianPair>,
}

/// Coordinates the rounds of the key ceremony without holding secrets.
pub struct KeyCeremonyMediator {
    /// The mediator's id, used when it verifies challenges itself.
    pub id: String,

    /// The ceremony's shape.
    pub ceremony_details: CeremonyDetails,

    election_public_keys: BTreeMap<GuardianId, ElectionPublicKey>,
    election_partial_key_backups: BTreeMap<GuardianPair, ElectionPartialKeyBackup>,
    election_partial_key_verifications: BTreeMap<GuardianPair, ElectionPartialKeyVerification>,
    election_partial_key_challenges: BTreeMap<GuardianPair, ElectionPartialKeyChallenge>,
}

impl KeyCeremonyMediator {
    pub fn new(id: impl Into<String>, ceremony_details: CeremonyDetails) -> Self {
        KeyCeremonyMediator {
            id: id.into(),
            ceremony_details,
            election_public_keys: BTreeMap::new(),
            election_partial_key_backups: BTreeMap::new(),
            election_partial_key_verifications: BTreeMap::new(),
            election_partial_key_challenges: BTreeMap::new(),
        }
    }

    //---------------------------------------------------------------------
    // Round 1: key announcement
    //---------------------------------------------------------------------

    /// Accepts a guardian's announced public key after checking its
    /// coefficient proofs.
    pub fn announce(
        &mut self,
        key: ElectionPublicKey,
        fixed_parameters: &FixedParameters,
    ) -> bool {
        if !key.is_valid(fixed_parameters) {
            warn!(owner_id = %key.owner_id, "announced key failed proof validation");
            return false;
        }
        if self.election_public_keys.contains_key(&key.owner_id) {
            info!(owner_id = %key.owner_id, "guardian already announced");
            return true;
        }
        self.election_public_keys.insert(key.owner_id.clone(), key);
        true
    }

    /// Whether every guardian has announced.
    pub fn all_guardians_announced(&self) -> bool {
        self.election_public_keys.len() == self.ceremony_details.number_of_guardians as usize
    }

    /// The announced keys (for a requesting guardian to save).
    pub fn share_announced(&self, requesting_guardian_id: Option<&str>) -> Vec<ElectionPublicKey> {
        self.election_public_keys
            .values()
            .filter(|key| Some(key.owner_id.as_str()) != requesting_guardian_id)
            .cloned()
            .collect()
    }

    //---------------------------------------------------------------------
    // Round 2: backup distribution
    //---------------------------------------------------------------------

    /// Accepts a guardian's issued backups. Refused until every guardian
    /// has announced.
    pub fn receive_backups(&mut self, backups: Vec<ElectionPartialKeyBackup>) -> bool {
        if !self.all_guardians_announced() {
            warn!("cannot receive backups before all guardians announce");
            return false;
        }
        for backup in backups {
            self.election_partial_key_backups.insert(
                GuardianPair {
                    owner_id: backup.owner_id.clone(),
                    designated_id: backup.designated_id.clone(),
                },
                backup,
            );
        }
        true
    }

    /// Whether a backup exists for every ordered pair of distinct
    /// guardians.
    pub fn all_backups_available(&self) -> bool {
        let n = self.ceremony_details.number_of_guardians as usize;
        self.all_guardians_announced() && self.election_partial_key_backups.len() == n * (n - 1)
    }

    /// The backups designated to the requesting guardian.
    pub fn share_backups(&self, requesting_guardian_id: &str) -> Vec<ElectionPartialKeyBackup> {
        self.election_partial_key_backups
            .values()
            .filter(|backup| backup.designated_id == requesting_guardian_id)
            .cloned()
            .collect()
    }

    //---------------------------------------------------------------------
    // Round 3: backup verification
    //---------------------------------------------------------------------

    /// Accepts verification verdicts from guardians.
    pub fn receive_backup_verifications(
        &mut self,
        verifications: Vec<ElectionPartialKeyVerification>,
    ) {
        for verification in verifications {
            self.election_partial_key_verifications.insert(
                GuardianPair {
                    owner_id: verification.owner_id.clone(),
                    designated_id: verification.designated_id.clone(),
                },
                verification,
            );
        }
    }

    /// The current verification state across all pairs.
    pub fn get_verification_state(&self) -> BackupVerificationState {
        let n = self.ceremony_details.number_of_guardians as usize;
        let expected = n * (n - 1);
        let all_received = self.election_partial_key_verifications.len() == expected;
        let failed_verifications: Vec<GuardianPair> = self
            .election_partial_key_verifications
            .iter()
            .filter(|(_, v)| !v.verified)
            .map(|(pair, _)| pair.clone())
            .collect();
        BackupVerificationState {
            all_received,
            all_verified: all_received && failed_verifications.is_empty(),
            failed_verifications,
        }
    }

    /// Whether every backup of every guardian has verified.
    pub fn all_backups_verified(&self) -> bool {
        self.get_verification_state().all_verified
    }

    //---------------------------------------------------------------------
    // Round 4: challenges
    //---------------------------------------------------------------------

    /// Accepts a challenge from the owner of a disputed backup and
    /// re-verifies it with the mediator as the alternate verifier.
    ///
    /// An upheld challenge replaces the failed verification; a failed one
    /// leaves it in place, and the caller decides the owner's fate.
    pub fn verify_challenge(
        &mut self,
        challenge: ElectionPartialKeyChallenge,
        fixed_parameters: &FixedParameters,
    ) -> ElectionPartialKeyVerification {
        let verification =
            verify_election_partial_key_challenge(&self.id, &challenge, fixed_parameters);
        let pair = GuardianPair {
            owner_id: challenge.owner_id.clone(),
            designated_id: challenge.designated_id.clone(),
        };
        self.election_partial_key_challenges
            .insert(pair.clone(), challenge);
        if verification.verified {
            self.election_partial_key_verifications
                .insert(pair, verification.clone());
        } else {
            warn!(
                owner_id = %verification.owner_id,
                designated_id = %verification.designated_id,
                "challenge failed: the owner's published coordinate is not on its polynomial"
            );
        }
        verification
    }

    //---------------------------------------------------------------------
    // Round 5: joint key
    //---------------------------------------------------------------------

    /// Publishes the joint key once every guardian announced and every
    /// backup verified.
    pub fn publish_joint_key(
        &self,
        fixed_parameters: &FixedParameters,
    ) -> Option<ElectionJointKey> {
        if !self.all_guardians_announced() {
            warn!("cannot publish joint key before all guardians announce");
            return None;
        }
        if !self.all_backups_verified() {
            warn!("cannot publish joint key before all backups verify");
            return None;
        }
        let keys: Vec<ElectionPublicKey> =
            self.election_public_keys.values().cloned().collect();
        Some(combine_election_public_keys(&keys, fixed_parameters))
    }
}
