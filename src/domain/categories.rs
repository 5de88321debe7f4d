//! Target category multi-select for outfit recommendation.

use serde::Serialize;

pub const TOP: &str = "top";
pub const BOTTOM: &str = "bottom";
pub const ONE_PIECE: &str = "one_piece";

/// Categories offered by the recommendation form.
pub const CATEGORY_OPTIONS: [&str; 7] = [
    TOP,
    BOTTOM,
    ONE_PIECE,
    "footwear",
    "bag",
    "hat",
    "accessory",
];

/// Ordered selection that is never empty and never mixes a one-piece with
/// separate top/bottom pieces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TargetCategorySet {
    selected: Vec<String>,
}

impl Default for TargetCategorySet {
    fn default() -> Self {
        Self {
            selected: vec![TOP.to_string(), BOTTOM.to_string()],
        }
    }
}

impl TargetCategorySet {
    /// Build from stored labels; `None` when they break the set's rules.
    pub fn from_labels<I, S>(labels: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selected: Vec<String> = Vec::new();
        for label in labels {
            let label = label.into();
            if !selected.contains(&label) {
                selected.push(label);
            }
        }

        let set = Self { selected };
        (!set.selected.is_empty() && !set.has_conflict()).then_some(set)
    }

    /// Flip one category. Returns whether the selection changed.
    pub fn toggle(&mut self, category: &str) -> bool {
        if self.contains(category) {
            // Floor: the last member stays
            if self.selected.len() == 1 {
                return false;
            }
            self.selected.retain(|c| c != category);
            return true;
        }

        match category {
            ONE_PIECE => {
                self.selected.retain(|c| c != TOP && c != BOTTOM);
                self.selected.insert(0, category.to_string());
            }
            TOP | BOTTOM => {
                self.selected.retain(|c| c != ONE_PIECE);
                self.selected.push(category.to_string());
            }
            _ => self.selected.push(category.to_string()),
        }
        true
    }

    pub fn contains(&self, category: &str) -> bool {
        self.selected.iter().any(|c| c == category)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.selected
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    fn has_conflict(&self) -> bool {
        self.contains(ONE_PIECE) && (self.contains(TOP) || self.contains(BOTTOM))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(set: &TargetCategorySet) -> Vec<&str> {
        set.as_slice().iter().map(String::as_str).collect()
    }

    #[test]
    fn defaults_to_top_and_bottom() {
        assert_eq!(labels(&TargetCategorySet::default()), vec!["top", "bottom"]);
    }

    #[test]
    fn one_piece_evicts_separates() {
        let mut set = TargetCategorySet::default();
        set.toggle("footwear");
        assert!(set.toggle(ONE_PIECE));
        assert_eq!(labels(&set), vec!["one_piece", "footwear"]);

        assert!(set.toggle(TOP));
        assert_eq!(labels(&set), vec!["footwear", "top"]);
    }

    #[test]
    fn last_member_cannot_be_removed() {
        let mut set = TargetCategorySet::from_labels(["bag"]).unwrap();
        assert!(!set.toggle("bag"));
        assert_eq!(labels(&set), vec!["bag"]);
    }

    #[test]
    fn deselecting_with_others_remaining() {
        let mut set = TargetCategorySet::default();
        assert!(set.toggle(BOTTOM));
        assert_eq!(labels(&set), vec!["top"]);
    }

    #[test]
    fn stored_labels_are_validated() {
        assert!(TargetCategorySet::from_labels(Vec::<String>::new()).is_none());
        assert!(TargetCategorySet::from_labels(["one_piece", "top"]).is_none());
        assert_eq!(
            TargetCategorySet::from_labels(["hat", "hat", "top"]).map(|s| s.len()),
            Some(2)
        );
    }

    #[test]
    fn invariants_hold_for_every_toggle_sequence() {
        // Exhaustive over all sequences of length 5 drawn from a small alphabet
        let alphabet = [TOP, BOTTOM, ONE_PIECE, "hat"];
        let total = alphabet.len().pow(5);

        for mut n in 0..total {
            let mut set = TargetCategorySet::default();
            for _ in 0..5 {
                set.toggle(alphabet[n % alphabet.len()]);
                n /= alphabet.len();

                assert!(!set.is_empty());
                assert!(!set.has_conflict(), "conflict in {:?}", set);
            }
        }
    }
}
