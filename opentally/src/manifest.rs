#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! The slice of the election manifest the cryptographic core consumes.
//!
//! An external loader owns the full manifest (ballot styles, geopolitical
//! units, candidate metadata). This module keeps only what encryption and
//! tallying need: stable object ids, sequence orders, the number of seats
//! per contest, and deterministic description hashes. It also synthesizes
//! the placeholder selections that absorb undervote slack so every contest
//! accumulation can carry a constant-sum proof.

use serde::{Deserialize, Serialize};

use util::algebra::{FieldElement, ScalarField};

use crate::hash::HashInput;
use crate::hash_elems;

/// One selectable option within a contest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionDescription {
    /// Stable identifier, unique within the contest.
    pub object_id: String,

    /// Position within the contest; unique within the contest.
    pub sequence_order: u32,
}

impl SelectionDescription {
    pub fn new(object_id: impl Into<String>, sequence_order: u32) -> Self {
        SelectionDescription {
            object_id: object_id.into(),
            sequence_order,
        }
    }

    /// The deterministic hash of this description's stable fields.
    pub fn crypto_hash(&self, field: &ScalarField) -> FieldElement {
        hash_elems!(field; &self.object_id, self.sequence_order)
    }
}

/// An n-of-m contest as the core sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestDescription {
    /// Stable identifier, unique within the manifest.
    pub object_id: String,

    /// Position within the manifest; unique within the manifest.
    pub sequence_order: u32,

    /// The number of selections a voter may (and, after placeholder fill,
    /// exactly does) make.
    pub number_elected: u32,

    /// The real selections, in sequence order.
    pub selections: Vec<SelectionDescription>,
}

impl ContestDescription {
    /// The deterministic hash of this description's stable fields.
    pub fn crypto_hash(&self, field: &ScalarField) -> FieldElement {
        let selection_hashes: Vec<FieldElement> = self
            .selections
            .iter()
            .map(|s| s.crypto_hash(field))
            .collect();
        hash_elems!(
            field;
            &self.object_id,
            self.sequence_order,
            self.number_elected,
            HashInput::sequence(selection_hashes.iter().map(HashInput::from))
        )
    }
}

/// A contest together with its synthesized placeholder selections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestDescriptionWithPlaceholders {
    pub contest: ContestDescription,

    /// One placeholder per seat, continuing the selection sequence orders.
    pub placeholder_selections: Vec<SelectionDescription>,
}

impl ContestDescriptionWithPlaceholders {
    /// All selections, real first, then placeholders, each paired with
    /// whether it is a placeholder.
    pub fn all_selections(&self) -> impl Iterator<Item = (&SelectionDescription, bool)> {
        self.contest
            .selections
            .iter()
            .map(|s| (s, false))
            .chain(self.placeholder_selections.iter().map(|s| (s, true)))
    }

    /// Whether the given selection id names one of the placeholders.
    pub fn is_placeholder(&self, selection_id: &str) -> bool {
        self.placeholder_selections
            .iter()
            .any(|s| s.object_id == selection_id)
    }
}

/// Synthesizes one placeholder selection for a contest.
///
/// The id embeds the contest id and the sequence order continues after the
/// real selections, so placeholder hashes are as stable as real ones.
pub fn generate_placeholder_selection_from(
    contest: &ContestDescription,
    use_sequence_order: u32,
) -> SelectionDescription {
    SelectionDescription {
        object_id: format!("{}-{}-placeholder", contest.object_id, use_sequence_order),
        sequence_order: use_sequence_order,
    }
}

/// Synthesizes `count` placeholder selections for a contest.
pub fn generate_placeholder_selections_from(
    contest: &ContestDescription,
    count: u32,
) -> Vec<SelectionDescription> {
    let max_sequence_order = contest
        .selections
        .iter()
        .map(|s| s.sequence_order)
        .max()
        .unwrap_or(0);
    (1..=count)
        .map(|i| generate_placeholder_selection_from(contest, max_sequence_order + i))
        .collect()
}

/// The manifest subset used throughout encryption, tallying, and
/// decryption, with placeholders attached and the external manifest hash
/// pinned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalManifest {
    /// Contests in manifest order, each with its placeholders.
    pub contests: Vec<ContestDescriptionWithPlaceholders>,

    /// The hash of the full external manifest, computed by its loader.
    pub manifest_hash: FieldElement,
}

impl InternalManifest {
    /// Builds the internal form: one placeholder per seat in every contest.
    pub fn new(contests: Vec<ContestDescription>, manifest_hash: FieldElement) -> Self {
        let contests = contests
            .into_iter()
            .map(|contest| {
                let placeholder_selections =
                    generate_placeholder_selections_from(&contest, contest.number_elected);
                ContestDescriptionWithPlaceholders {
                    contest,
                    placeholder_selections,
                }
            })
            .collect();
        InternalManifest {
            contests,
            manifest_hash,
        }
    }

    /// Looks up a contest by object id.
    pub fn contest(&self, object_id: &str) -> Option<&ContestDescriptionWithPlaceholders> {
        self.contests
            .iter()
            .find(|c| c.contest.object_id == object_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod test {
    use super::*;
    use util::pow_radix::PowRadixOption;

    use crate::standard_parameters::test_parameters;

    fn two_selection_contest() -> ContestDescription {
        ContestDescription {
            object_id: "contest-1".to_owned(),
            sequence_order: 0,
            number_elected: 1,
            selections: vec![
                SelectionDescription::new("selection-a", 0),
                SelectionDescription::new("selection-b", 1),
            ],
        }
    }

    #[test]
    fn placeholders_continue_sequence_orders() {
        let contest = two_selection_contest();
        let placeholders = generate_placeholder_selections_from(&contest, 2);
        assert_eq!(placeholders.len(), 2);
        assert_eq!(placeholders[0].sequence_order, 2);
        assert_eq!(placeholders[1].sequence_order, 3);
        assert_eq!(placeholders[0].object_id, "contest-1-2-placeholder");
    }

    #[test]
    fn internal_manifest_attaches_one_placeholder_per_seat() {
        let field = test_parameters(PowRadixOption::NoAcceleration).field;
        let manifest_hash = FieldElement::from(99_u8, &field);
        let manifest = InternalManifest::new(vec![two_selection_contest()], manifest_hash);

        let contest = manifest.contest("contest-1").expect("contest present");
        assert_eq!(contest.placeholder_selections.len(), 1);
        assert!(contest.is_placeholder("contest-1-2-placeholder"));
        assert!(!contest.is_placeholder("selection-a"));
        assert_eq!(contest.all_selections().count(), 3);
    }

    #[test]
    fn description_hashes_are_stable_and_distinct() {
        let field = test_parameters(PowRadixOption::NoAcceleration).field;
        let contest = two_selection_contest();
        assert_eq!(contest.crypto_hash(&field), contest.crypto_hash(&field));

        let a = contest.selections[0].crypto_hash(&field);
        let b = contest.selections[1].crypto_hash(&field);
        assert_ne!(a, b);
    }
}
