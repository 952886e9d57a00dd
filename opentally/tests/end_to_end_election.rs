//! End-to-end election scenarios: a full key ceremony, ballot encryption
//! with chaining, homomorphic tallying, and threshold decryption with a
//! missing guardian reconstructed from backups.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;

use opentally::{
    ballot::{BallotBoxState, PlaintextBallot, PlaintextBallotContest, PlaintextBallotSelection},
    ballot_box::BallotBox,
    decryption_mediator::DecryptionMediator,
    discrete_log::DiscreteLog,
    election_context::{make_ciphertext_election_context, CiphertextElectionContext},
    election_parameters::ElectionParameters,
    encrypt::{EncryptionDevice, EncryptionMediator},
    fixed_parameters::FixedParameters,
    guardian::Guardian,
    key_ceremony::CeremonyDetails,
    key_ceremony_mediator::KeyCeremonyMediator,
    manifest::{ContestDescription, InternalManifest, SelectionDescription},
    standard_parameters::test_parameters,
    tally::CiphertextTally,
    varying_parameters::VaryingParameters,
};
use test_log::test;
use util::{algebra::FieldElement, csprng::Csprng, pow_radix::PowRadixOption};

const NUMBER_OF_GUARDIANS: u32 = 3;
const QUORUM: u32 = 2;

struct Election {
    fixed_parameters: FixedParameters,
    manifest: InternalManifest,
    guardians: Vec<Guardian>,
    context: CiphertextElectionContext,
    csprng: Csprng,
}

/// One contest, one seat, two candidate selections.
fn build_manifest(fixed_parameters: &FixedParameters) -> InternalManifest {
    let contest = ContestDescription {
        object_id: "contest-mayor".to_owned(),
        sequence_order: 0,
        number_elected: 1,
        selections: vec![
            SelectionDescription::new("selection-alice", 0),
            SelectionDescription::new("selection-bob", 1),
        ],
    };
    let manifest_hash = FieldElement::from(4919_u32, &fixed_parameters.field);
    InternalManifest::new(vec![contest], manifest_hash)
}

fn ballot_voting_for(ballot_id: &str, selection_id: &str) -> PlaintextBallot {
    PlaintextBallot {
        object_id: ballot_id.to_owned(),
        style_id: "style-1".to_owned(),
        contests: vec![PlaintextBallotContest {
            object_id: "contest-mayor".to_owned(),
            ballot_selections: vec![PlaintextBallotSelection {
                object_id: selection_id.to_owned(),
                vote: 1,
                is_placeholder_selection: false,
            }],
        }],
    }
}

/// Runs the whole key ceremony and returns the ready-to-encrypt election.
fn setup_election(seed: &[u8]) -> Election {
    let fixed_parameters = test_parameters(PowRadixOption::NoAcceleration);
    let mut csprng = Csprng::new(seed);
    let manifest = build_manifest(&fixed_parameters);

    let mut guardians: Vec<Guardian> = (1..=NUMBER_OF_GUARDIANS)
        .map(|i| {
            Guardian::new(
                format!("guardian-{i}"),
                i,
                NUMBER_OF_GUARDIANS,
                QUORUM,
                &mut csprng,
                None,
                &fixed_parameters,
            )
        })
        .collect();

    let mut mediator = KeyCeremonyMediator::new(
        "key-ceremony-mediator",
        CeremonyDetails {
            number_of_guardians: NUMBER_OF_GUARDIANS,
            quorum: QUORUM,
        },
    );

    // Round 1: every guardian announces; everyone saves everyone's key.
    for guardian in &guardians {
        assert!(mediator.announce(guardian.share_key(), &fixed_parameters));
    }
    assert!(mediator.all_guardians_announced());
    for guardian in &mut guardians {
        let guardian_id = guardian.id.clone();
        for key in mediator.share_announced(Some(guardian_id.as_str())) {
            guardian.save_guardian_key(key);
        }
        assert!(guardian.all_guardian_keys_received());
    }

    // Round 2: backups are generated and routed to their recipients.
    for guardian in &mut guardians {
        assert!(guardian.generate_election_partial_key_backups(&mut csprng, &fixed_parameters));
    }
    for guardian in &guardians {
        assert!(mediator.receive_backups(guardian.share_election_partial_key_backups()));
    }
    assert!(mediator.all_backups_available());
    for guardian in &mut guardians {
        for backup in mediator.share_backups(&guardian.id.clone()) {
            guardian.save_election_partial_key_backup(backup);
        }
        assert!(guardian.all_election_partial_key_backups_received());
    }

    // Round 3: every received backup verifies against its owner's
    // commitments.
    let mut verifications = Vec::new();
    for guardian in &guardians {
        for other in &guardians {
            if other.id != guardian.id {
                let verification = guardian
                    .verify_election_partial_key_backup(&other.id, &fixed_parameters)
                    .unwrap();
                assert!(verification.verified, "backup from {} failed", other.id);
                verifications.push(verification);
            }
        }
    }
    mediator.receive_backup_verifications(verifications);
    let state = mediator.get_verification_state();
    assert!(state.all_received);
    assert!(state.all_verified);

    // Round 5: the joint key.
    let joint_key = mediator.publish_joint_key(&fixed_parameters).unwrap();

    let varying_parameters = VaryingParameters {
        n: NUMBER_OF_GUARDIANS,
        k: QUORUM,
    };
    ElectionParameters {
        fixed_parameters: fixed_parameters.clone(),
        varying_parameters: varying_parameters.clone(),
    }
    .validate(&mut csprng)
    .unwrap();
    let context = make_ciphertext_election_context(
        &varying_parameters,
        joint_key.joint_public_key,
        joint_key.commitment_hash,
        manifest.manifest_hash.clone(),
        &fixed_parameters,
    );

    Election {
        fixed_parameters,
        manifest,
        guardians,
        context,
        csprng,
    }
}

#[test]
fn smallest_viable_election_with_compensated_decryption() {
    let mut election = setup_election(b"end to end: smallest viable election");
    let fp = &election.fixed_parameters;

    // Three voters: Alice, Alice, Bob. All cast.
    let device = EncryptionDevice::new(1, "session-1", 42, "precinct-9");
    let mut encrypter =
        EncryptionMediator::new(&election.manifest, &election.context, &device, fp);

    let mut ballot_box = BallotBox::new();
    let mut previous_code = None;
    for (i, candidate) in ["selection-alice", "selection-alice", "selection-bob"]
        .iter()
        .enumerate()
    {
        let ballot = ballot_voting_for(&format!("ballot-{i}"), candidate);
        let encrypted = encrypter
            .encrypt(&ballot, 1_660_000_000 + i as u64, &mut election.csprng)
            .expect("ballot should encrypt");

        // Codes chain: each ballot's seed is the previous ballot's code.
        if let Some(previous_code) = &previous_code {
            assert_eq!(&encrypted.code_seed, previous_code);
        }
        previous_code = Some(encrypted.code.clone());

        assert!(ballot_box.cast(&encrypted).is_some());
    }

    // Accumulate the cast ballots.
    let mut tally = CiphertextTally::new("election-tally", &election.manifest, fp);
    let cast: Vec<_> = ballot_box
        .store()
        .by_state(BallotBoxState::Cast)
        .collect();
    assert_eq!(
        tally.batch_append(cast.into_iter(), true, &election.context, fp),
        3
    );

    // Guardians 1 and 2 are present; guardian 3 is missing and gets
    // reconstructed from its backups.
    let mut mediator = DecryptionMediator::new("decryption-mediator", election.context.clone());
    let (present, missing) = election.guardians.split_at(2);
    let missing_guardian = &missing[0];

    for guardian in present {
        let tally_share = guardian
            .compute_tally_share(&tally, &election.context, &mut election.csprng, fp)
            .unwrap();
        mediator.announce(&guardian.share_key(), tally_share, None);
    }

    // Each present guardian reports the missing guardian; the keys agree.
    for guardian in present {
        let keys = vec![guardian.guardian_key(&missing_guardian.id).unwrap().clone()];
        assert!(mediator.validate_missing_guardians(&keys));
    }
    assert!(mediator.announcement_complete());

    // Not every guardian has a tally share yet.
    let dlog = DiscreteLog::new();
    assert!(mediator.get_plaintext_tally(&tally, fp, &dlog).is_none());

    // Compensation: both present guardians compute shares on the missing
    // guardian's behalf from their backups.
    for guardian in present {
        let compensated = guardian
            .compute_compensated_tally_share(
                &missing_guardian.id,
                &tally,
                &election.context,
                &mut election.csprng,
                fp,
            )
            .unwrap();
        mediator.receive_tally_compensation_share(compensated);
    }
    assert!(mediator.reconstruct_shares_for_tally(&tally, fp));

    let lagrange = mediator.lagrange_coefficients(fp).unwrap();
    assert_eq!(lagrange.coefficients.len(), 2);

    let plaintext_tally = mediator.get_plaintext_tally(&tally, fp, &dlog).unwrap();
    let contest = &plaintext_tally.contests["contest-mayor"];
    assert_eq!(contest.selections["selection-alice"].tally, 2);
    assert_eq!(contest.selections["selection-bob"].tally, 1);

    // Each selection's record carries the three shares that decrypted it.
    assert_eq!(contest.selections["selection-alice"].shares.len(), 3);
}

#[test]
fn undervote_fills_placeholder_and_tallies_zero() {
    let mut election = setup_election(b"end to end: undervote");
    let fp = &election.fixed_parameters;

    // A ballot with no selection at all for the contest.
    let empty_ballot = PlaintextBallot {
        object_id: "ballot-empty".to_owned(),
        style_id: "style-1".to_owned(),
        contests: vec![],
    };

    let device = EncryptionDevice::new(2, "session-2", 43, "precinct-9");
    let mut encrypter =
        EncryptionMediator::new(&election.manifest, &election.context, &device, fp);
    let encrypted = encrypter
        .encrypt(&empty_ballot, 1_660_000_100, &mut election.csprng)
        .expect("an undervoted ballot still encrypts");

    // The constant-sum proof verifies: the placeholder absorbed the slack.
    assert!(encrypted.is_valid_encryption(
        &election.manifest.manifest_hash,
        &election.context.elgamal_public_key,
        &election.context.crypto_extended_base_hash,
        fp,
    ));

    let mut ballot_box = BallotBox::new();
    ballot_box.cast(&encrypted).unwrap();

    let mut tally = CiphertextTally::new("election-tally", &election.manifest, fp);
    let cast: Vec<_> = ballot_box
        .store()
        .by_state(BallotBoxState::Cast)
        .collect();
    assert_eq!(
        tally.batch_append(cast.into_iter(), true, &election.context, fp),
        1
    );

    let mut mediator = DecryptionMediator::new("decryption-mediator", election.context.clone());
    for guardian in &election.guardians {
        let tally_share = guardian
            .compute_tally_share(&tally, &election.context, &mut election.csprng, fp)
            .unwrap();
        mediator.announce(&guardian.share_key(), tally_share, None);
    }

    let dlog = DiscreteLog::new();
    let plaintext_tally = mediator.get_plaintext_tally(&tally, fp, &dlog).unwrap();
    let contest = &plaintext_tally.contests["contest-mayor"];
    assert_eq!(contest.selections["selection-alice"].tally, 0);
    assert_eq!(contest.selections["selection-bob"].tally, 0);
}

#[test]
fn overvote_is_rejected() {
    let mut election = setup_election(b"end to end: overvote");
    let fp = &election.fixed_parameters;

    // Both candidates marked in a 1-of-2 contest.
    let overvoted = PlaintextBallot {
        object_id: "ballot-overvote".to_owned(),
        style_id: "style-1".to_owned(),
        contests: vec![PlaintextBallotContest {
            object_id: "contest-mayor".to_owned(),
            ballot_selections: vec![
                PlaintextBallotSelection {
                    object_id: "selection-alice".to_owned(),
                    vote: 1,
                    is_placeholder_selection: false,
                },
                PlaintextBallotSelection {
                    object_id: "selection-bob".to_owned(),
                    vote: 1,
                    is_placeholder_selection: false,
                },
            ],
        }],
    };

    let device = EncryptionDevice::new(3, "session-3", 44, "precinct-9");
    let mut encrypter =
        EncryptionMediator::new(&election.manifest, &election.context, &device, fp);
    assert!(encrypter
        .encrypt(&overvoted, 1_660_000_200, &mut election.csprng)
        .is_none());
}

#[test]
fn spoiled_ballot_is_decrypted_separately() {
    let mut election = setup_election(b"end to end: spoiled passthrough");
    let fp = &election.fixed_parameters;

    let device = EncryptionDevice::new(4, "session-4", 45, "precinct-9");
    let mut encrypter =
        EncryptionMediator::new(&election.manifest, &election.context, &device, fp);

    let mut ballot_box = BallotBox::new();
    for (ballot_id, candidate, state) in [
        ("ballot-0", "selection-alice", BallotBoxState::Cast),
        ("ballot-1", "selection-bob", BallotBoxState::Cast),
        ("ballot-2", "selection-alice", BallotBoxState::Spoiled),
    ] {
        let encrypted = encrypter
            .encrypt(
                &ballot_voting_for(ballot_id, candidate),
                1_660_000_300,
                &mut election.csprng,
            )
            .unwrap();
        assert!(ballot_box.accept(&encrypted, state).is_some());
    }

    let mut tally = CiphertextTally::new("election-tally", &election.manifest, fp);
    let all: Vec<_> = ballot_box.store().all().collect();
    tally.batch_append(all.into_iter(), true, &election.context, fp);
    assert_eq!(tally.cast_count(), 2);
    assert_eq!(tally.spoiled_ballot_ids().count(), 1);

    let spoiled: Vec<_> = ballot_box
        .store()
        .by_state(BallotBoxState::Spoiled)
        .collect();

    let mut mediator = DecryptionMediator::new("decryption-mediator", election.context.clone());
    for guardian in &election.guardians {
        let tally_share = guardian
            .compute_tally_share(&tally, &election.context, &mut election.csprng, fp)
            .unwrap();
        let ballot_shares = guardian
            .compute_ballot_shares(
                spoiled.iter().copied(),
                &election.context,
                &mut election.csprng,
                fp,
            )
            .unwrap();
        mediator.announce(&guardian.share_key(), tally_share, Some(ballot_shares));
    }

    let dlog = DiscreteLog::new();

    // The tally counts only the cast ballots: one each.
    let plaintext_tally = mediator.get_plaintext_tally(&tally, fp, &dlog).unwrap();
    let contest = &plaintext_tally.contests["contest-mayor"];
    assert_eq!(contest.selections["selection-alice"].tally, 1);
    assert_eq!(contest.selections["selection-bob"].tally, 1);

    // The spoiled ballot decrypts on its own, keyed by ballot id, showing
    // the Alice vote and the unselected placeholder.
    let plaintext_ballots = mediator.get_plaintext_ballots(&spoiled, fp, &dlog).unwrap();
    assert_eq!(plaintext_ballots.len(), 1);
    let spoiled_plaintext = &plaintext_ballots["ballot-2"];
    let spoiled_contest = &spoiled_plaintext.contests["contest-mayor"];
    assert_eq!(spoiled_contest.selections["selection-alice"].tally, 1);
    assert_eq!(spoiled_contest.selections["selection-bob"].tally, 0);
    assert_eq!(
        spoiled_contest.selections["contest-mayor-2-placeholder"].tally,
        0
    );
}

#[test]
fn reannouncement_and_recast_are_no_ops() {
    let mut election = setup_election(b"end to end: idempotence");
    let fp = &election.fixed_parameters;

    let device = EncryptionDevice::new(5, "session-5", 46, "precinct-9");
    let mut encrypter =
        EncryptionMediator::new(&election.manifest, &election.context, &device, fp);
    let encrypted = encrypter
        .encrypt(
            &ballot_voting_for("ballot-0", "selection-alice"),
            1_660_000_400,
            &mut election.csprng,
        )
        .unwrap();

    let mut ballot_box = BallotBox::new();
    assert!(ballot_box.cast(&encrypted).is_some());
    assert!(ballot_box.cast(&encrypted).is_none(), "re-cast refused");
    assert!(ballot_box.spoil(&encrypted).is_none(), "re-spoil refused");

    let mut tally = CiphertextTally::new("election-tally", &election.manifest, fp);
    let submitted = ballot_box.store().get("ballot-0").unwrap();
    assert!(tally.append(submitted, true, &election.context, fp));
    assert!(!tally.append(submitted, true, &election.context, fp));
    assert_eq!(tally.cast_count(), 1);

    let mut mediator = DecryptionMediator::new("decryption-mediator", election.context.clone());
    let mut shares: BTreeMap<String, _> = BTreeMap::new();
    for guardian in &election.guardians {
        let tally_share = guardian
            .compute_tally_share(&tally, &election.context, &mut election.csprng, fp)
            .unwrap();
        shares.insert(guardian.id.clone(), tally_share);
    }
    for guardian in &election.guardians {
        mediator.announce(
            &guardian.share_key(),
            shares[&guardian.id].clone(),
            None,
        );
        // Announcing again changes nothing.
        mediator.announce(
            &guardian.share_key(),
            shares[&guardian.id].clone(),
            None,
        );
    }
    assert_eq!(mediator.get_available_guardians().len(), 3);

    let dlog = DiscreteLog::new();
    let plaintext_tally = mediator.get_plaintext_tally(&tally, fp, &dlog).unwrap();
    assert_eq!(
        plaintext_tally.contests["contest-mayor"].selections["selection-alice"].tally,
        1
    );
}
