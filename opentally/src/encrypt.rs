#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! The ballot encryption pipeline.
//!
//! A single master nonce per ballot fans out deterministically: the ballot
//! nonce seed feeds a per-contest nonce stream, which feeds a per-selection
//! stream, each indexed by sequence order. Undervotes are absorbed by
//! affirmative placeholder selections so every contest's selection total
//! equals its seat count and the constant-sum proof can be built; overvotes
//! cannot be proven and are rejected outright. Unless told otherwise, the
//! pipeline re-verifies every proof it just produced before returning.

use tracing::warn;

use util::algebra::FieldElement;
use util::csprng::Csprng;

use crate::{
    ballot::{
        ballot_nonce_seed, make_ciphertext_ballot, make_ciphertext_ballot_contest,
        make_ciphertext_ballot_selection, CiphertextBallot, CiphertextBallotContest,
        CiphertextBallotSelection, PlaintextBallot, PlaintextBallotContest,
        PlaintextBallotSelection,
    },
    ballot_code::get_hash_for_device,
    el_gamal::elgamal_encrypt,
    election_context::CiphertextElectionContext,
    fixed_parameters::FixedParameters,
    manifest::{
        ContestDescription, ContestDescriptionWithPlaceholders, InternalManifest,
        SelectionDescription,
    },
    nonces::Nonces,
};

/// The device a ballot chain runs on.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EncryptionDevice {
    /// Unique identifier of the device.
    pub device_id: u64,

    /// Used to identify the session the device ran in.
    pub session_id: String,

    /// Secret per-session launch code.
    pub launch_code: u64,

    /// Arbitrary string identifying the device's location.
    pub location: String,
}

impl EncryptionDevice {
    pub fn new(
        device_id: u64,
        session_id: impl Into<String>,
        launch_code: u64,
        location: impl Into<String>,
    ) -> Self {
        EncryptionDevice {
            device_id,
            session_id: session_id.into(),
            launch_code,
            location: location.into(),
        }
    }

    /// The device hash seeding this device's ballot-code chain.
    pub fn get_hash(&self, fixed_parameters: &FixedParameters) -> FieldElement {
        get_hash_for_device(
            self.device_id,
            &self.session_id,
            self.launch_code,
            &self.location,
            &fixed_parameters.field,
        )
    }
}

/// Encrypts ballots for one device, chaining each ballot's code off the
/// previous one.
pub struct EncryptionMediator<'a> {
    internal_manifest: &'a InternalManifest,
    context: &'a CiphertextElectionContext,
    fixed_parameters: &'a FixedParameters,
    code_seed: FieldElement,
}

impl<'a> EncryptionMediator<'a> {
    pub fn new(
        internal_manifest: &'a InternalManifest,
        context: &'a CiphertextElectionContext,
        device: &EncryptionDevice,
        fixed_parameters: &'a FixedParameters,
    ) -> Self {
        let code_seed = device.get_hash(fixed_parameters);
        EncryptionMediator {
            internal_manifest,
            context,
            fixed_parameters,
            code_seed,
        }
    }

    /// Encrypts a ballot and advances the device chain to its code.
    pub fn encrypt(
        &mut self,
        ballot: &PlaintextBallot,
        timestamp: u64,
        csprng: &mut Csprng,
    ) -> Option<CiphertextBallot> {
        let encrypted = encrypt_ballot(
            ballot,
            self.internal_manifest,
            self.context,
            self.code_seed.clone(),
            None,
            timestamp,
            true,
            csprng,
            self.fixed_parameters,
        )?;
        self.code_seed = encrypted.code.clone();
        Some(encrypted)
    }
}

/// An explicit (usually zero) vote for a selection description.
pub fn selection_from(
    description: &SelectionDescription,
    is_placeholder: bool,
    is_affirmative: bool,
) -> PlaintextBallotSelection {
    PlaintextBallotSelection {
        object_id: description.object_id.clone(),
        vote: is_affirmative as u64,
        is_placeholder_selection: is_placeholder,
    }
}

/// An all-zero plaintext contest for a contest description, used when the
/// voter's ballot omits the contest entirely.
pub fn contest_from(description: &ContestDescription) -> PlaintextBallotContest {
    PlaintextBallotContest {
        object_id: description.object_id.clone(),
        ballot_selections: description
            .selections
            .iter()
            .map(|s| selection_from(s, false, false))
            .collect(),
    }
}

/// Encrypts a single selection.
///
/// The selection nonce is the stream `(description_hash, nonce_seed)`
/// indexed by the selection's sequence order; the proof seed is index 0 of
/// the same stream.
#[allow(clippy::too_many_arguments)]
pub fn encrypt_selection(
    selection: &PlaintextBallotSelection,
    description: &SelectionDescription,
    elgamal_public_key: &util::algebra::GroupElement,
    crypto_extended_base_hash: &FieldElement,
    nonce_seed: &FieldElement,
    is_placeholder: bool,
    should_verify_proofs: bool,
    fixed_parameters: &FixedParameters,
) -> Option<CiphertextBallotSelection> {
    if !selection.is_valid(&description.object_id) {
        warn!(object_id = %selection.object_id, "malformed input selection");
        return None;
    }

    let field = &fixed_parameters.field;
    let description_hash = description.crypto_hash(field);
    // The stream is unique to this (selection, contest, ballot) because the
    // contest nonce rides in as a header.
    let nonce_sequence = Nonces::with_headers(&description_hash, &[nonce_seed.into()], field);
    let selection_nonce = nonce_sequence.get(description.sequence_order as usize);
    let proof_seed = nonce_sequence.get(0);
    let selection_representation = selection.vote;

    let ciphertext = elgamal_encrypt(
        selection_representation,
        &selection_nonce,
        elgamal_public_key,
        fixed_parameters,
    )?;

    let encrypted_selection = make_ciphertext_ballot_selection(
        selection.object_id.clone(),
        description.sequence_order,
        description_hash.clone(),
        ciphertext,
        elgamal_public_key,
        crypto_extended_base_hash,
        &proof_seed,
        selection_representation,
        is_placeholder,
        selection_nonce,
        fixed_parameters,
    )?;

    if !should_verify_proofs {
        return Some(encrypted_selection);
    }

    if encrypted_selection.is_valid_encryption(
        &description_hash,
        elgamal_public_key,
        crypto_extended_base_hash,
        fixed_parameters,
    ) {
        Some(encrypted_selection)
    } else {
        warn!(
            object_id = %encrypted_selection.object_id,
            "selection encryption failed self-verification"
        );
        None
    }
}

/// Encrypts a single contest, filling undervotes with affirmative
/// placeholders and rejecting overvotes.
#[allow(clippy::too_many_arguments)]
pub fn encrypt_contest(
    contest: &PlaintextBallotContest,
    description: &ContestDescriptionWithPlaceholders,
    elgamal_public_key: &util::algebra::GroupElement,
    crypto_extended_base_hash: &FieldElement,
    nonce_seed: &FieldElement,
    should_verify_proofs: bool,
    fixed_parameters: &FixedParameters,
) -> Option<CiphertextBallotContest> {
    let contest_description = &description.contest;
    let number_elected = contest_description.number_elected as u64;

    if !contest.is_valid(
        &contest_description.object_id,
        contest_description.selections.len(),
        number_elected,
    ) {
        warn!(object_id = %contest.object_id, "malformed input contest");
        return None;
    }

    let field = &fixed_parameters.field;
    let description_hash = contest_description.crypto_hash(field);
    let nonce_sequence = Nonces::with_headers(&description_hash, &[nonce_seed.into()], field);
    let contest_nonce = nonce_sequence.get(contest_description.sequence_order as usize);
    let proof_seed = nonce_sequence.get(0);

    let mut encrypted_selections: Vec<CiphertextBallotSelection> = Vec::new();
    let mut selection_count = 0u64;

    // Encrypt every real selection in description order, defaulting the
    // ones the voter did not mention to an explicit zero.
    for selection_description in &contest_description.selections {
        let voter_selection = contest
            .ballot_selections
            .iter()
            .find(|s| s.object_id == selection_description.object_id);

        let plaintext_selection = match voter_selection {
            Some(selection) => {
                selection_count += selection.vote;
                selection.clone()
            }
            None => selection_from(selection_description, false, false),
        };

        encrypted_selections.push(encrypt_selection(
            &plaintext_selection,
            selection_description,
            elgamal_public_key,
            crypto_extended_base_hash,
            &contest_nonce,
            false,
            should_verify_proofs,
            fixed_parameters,
        )?);
    }

    if selection_count > number_elected {
        warn!(
            object_id = %contest.object_id,
            selection_count,
            number_elected,
            "overvote: no constant-sum proof exists for this contest"
        );
        return None;
    }

    // One placeholder per seat; affirmative while seats remain unfilled, so
    // real plus placeholder votes total exactly `number_elected`.
    for placeholder in &description.placeholder_selections {
        let select_placeholder = selection_count < number_elected;
        if select_placeholder {
            selection_count += 1;
        }

        encrypted_selections.push(encrypt_selection(
            &selection_from(placeholder, true, select_placeholder),
            placeholder,
            elgamal_public_key,
            crypto_extended_base_hash,
            &contest_nonce,
            true,
            should_verify_proofs,
            fixed_parameters,
        )?);
    }

    let encrypted_contest = make_ciphertext_ballot_contest(
        contest.object_id.clone(),
        contest_description.sequence_order,
        description_hash.clone(),
        encrypted_selections,
        elgamal_public_key,
        crypto_extended_base_hash,
        &proof_seed,
        number_elected,
        contest_nonce,
        fixed_parameters,
    )?;

    if !should_verify_proofs {
        return Some(encrypted_contest);
    }

    if encrypted_contest.is_valid_encryption(
        &description_hash,
        elgamal_public_key,
        crypto_extended_base_hash,
        fixed_parameters,
    ) {
        Some(encrypted_contest)
    } else {
        warn!(
            object_id = %encrypted_contest.object_id,
            "contest encryption failed self-verification"
        );
        None
    }
}

/// Encrypts a full ballot against the manifest and election context.
///
/// With `nonce` absent a fresh master nonce is drawn from `csprng`; with it
/// present the whole ballot encrypts deterministically. The timestamp is
/// taken from the caller and recorded verbatim.
#[allow(clippy::too_many_arguments)]
pub fn encrypt_ballot(
    ballot: &PlaintextBallot,
    internal_manifest: &InternalManifest,
    context: &CiphertextElectionContext,
    code_seed: FieldElement,
    nonce: Option<FieldElement>,
    timestamp: u64,
    should_verify_proofs: bool,
    csprng: &mut Csprng,
    fixed_parameters: &FixedParameters,
) -> Option<CiphertextBallot> {
    let field = &fixed_parameters.field;

    let master_nonce = match nonce {
        Some(nonce) => nonce,
        None => field.random_field_elem_min(csprng, 1_u8),
    };
    let nonce_seed = ballot_nonce_seed(
        &internal_manifest.manifest_hash,
        &ballot.object_id,
        &master_nonce,
        fixed_parameters,
    );

    let mut encrypted_contests = Vec::with_capacity(internal_manifest.contests.len());
    for description in &internal_manifest.contests {
        let voter_contest = ballot
            .contests
            .iter()
            .find(|c| c.object_id == description.contest.object_id);

        // A contest the voter skipped entirely still encrypts, as all
        // zeros plus placeholders.
        let default_contest;
        let plaintext_contest = match voter_contest {
            Some(contest) => contest,
            None => {
                default_contest = contest_from(&description.contest);
                &default_contest
            }
        };

        encrypted_contests.push(encrypt_contest(
            plaintext_contest,
            description,
            &context.elgamal_public_key,
            &context.crypto_extended_base_hash,
            &nonce_seed,
            should_verify_proofs,
            fixed_parameters,
        )?);
    }

    let encrypted_ballot = make_ciphertext_ballot(
        ballot.object_id.clone(),
        ballot.style_id.clone(),
        internal_manifest.manifest_hash.clone(),
        code_seed,
        encrypted_contests,
        Some(master_nonce),
        timestamp,
        fixed_parameters,
    );

    if !should_verify_proofs {
        return Some(encrypted_ballot);
    }

    if encrypted_ballot.is_valid_encryption(
        &internal_manifest.manifest_hash,
        &context.elgamal_public_key,
        &context.crypto_extended_base_hash,
        fixed_parameters,
    ) {
        Some(encrypted_ballot)
    } else {
        warn!(
            object_id = %encrypted_ballot.object_id,
            "ballot encryption failed self-verification"
        );
        None
    }
}
