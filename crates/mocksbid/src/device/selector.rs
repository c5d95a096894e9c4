//! Checked/unchecked flags computed from a caller's subtype tags.

use std::collections::BTreeSet;

use super::kind::BioSubtype;

/// Set of subtypes a request names, either as wanted samples or exceptions.
///
/// Empty input, or input containing any tag that is not recognised, checks
/// the synthetic [`BioSubtype::Unknown`] entry. Recognised tags are checked
/// either way. Construction never fails.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubtypeSelector {
    checked: BTreeSet<BioSubtype>,
}

impl SubtypeSelector {
    pub fn from_tags<S: AsRef<str>>(tags: &[S]) -> Self {
        let mut checked = BTreeSet::new();
        let mut unrecognised = tags.is_empty();
        for tag in tags {
            match BioSubtype::from_tag(tag.as_ref()) {
                Some(subtype) => {
                    checked.insert(subtype);
                }
                None => unrecognised = true,
            }
        }
        if unrecognised {
            checked.insert(BioSubtype::Unknown);
        }
        Self { checked }
    }

    #[must_use]
    pub fn is_checked(&self, subtype: BioSubtype) -> bool {
        self.checked.contains(&subtype)
    }

    /// Checked anatomical subtypes, excluding [`BioSubtype::Unknown`].
    pub fn known(&self) -> impl Iterator<Item = BioSubtype> + '_ {
        self.checked
            .iter()
            .copied()
            .filter(|subtype| *subtype != BioSubtype::Unknown)
    }

    /// Number of entries of `group` that are checked.
    #[must_use]
    pub fn count_in(&self, group: &[BioSubtype]) -> usize {
        group
            .iter()
            .filter(|subtype| self.is_checked(**subtype))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::empty(&[])]
    #[case::garbage(&["Left Toe"])]
    #[case::blank(&[""])]
    fn unrecognised_input_selects_only_unknown(#[case] tags: &[&str]) {
        let selector = SubtypeSelector::from_tags(tags);
        assert!(selector.is_checked(BioSubtype::Unknown));
        assert_eq!(selector.known().count(), 0);
    }

    #[test]
    fn recognised_tags_are_checked() {
        let selector = SubtypeSelector::from_tags(&["Left IndexFinger", "Right Thumb"]);
        assert!(selector.is_checked(BioSubtype::LeftIndex));
        assert!(selector.is_checked(BioSubtype::RightThumb));
        assert!(!selector.is_checked(BioSubtype::Unknown));
        assert!(!selector.is_checked(BioSubtype::LeftRing));
    }

    #[test]
    fn mixed_input_keeps_known_tags_and_flags_unknown() {
        let selector = SubtypeSelector::from_tags(&["Left", "Nose"]);
        assert!(selector.is_checked(BioSubtype::LeftIris));
        assert!(selector.is_checked(BioSubtype::Unknown));
        assert_eq!(selector.known().collect::<Vec<_>>(), vec![BioSubtype::LeftIris]);
    }

    #[test]
    fn counts_members_of_a_group() {
        let selector = SubtypeSelector::from_tags(&["Left RingFinger", "Right Thumb"]);
        let left = [
            BioSubtype::LeftIndex,
            BioSubtype::LeftMiddle,
            BioSubtype::LeftRing,
            BioSubtype::LeftLittle,
        ];
        assert_eq!(selector.count_in(&left), 1);
    }
}
