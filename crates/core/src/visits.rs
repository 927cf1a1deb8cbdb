#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Sub-areas marked visited in the current round of a territory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitSet(BTreeSet<u32>);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Toggle {
    Marked,
    Unmarked,
}

impl VisitSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, sub_area_id: u32) -> bool {
        self.0.contains(&sub_area_id)
    }

    /// Flips membership: insert when absent, remove when present.
    pub fn toggle(&mut self, sub_area_id: u32) -> Toggle {
        if self.0.remove(&sub_area_id) {
            Toggle::Unmarked
        } else {
            self.0.insert(sub_area_id);
            Toggle::Marked
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<u32> for VisitSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
