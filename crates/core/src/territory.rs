#![forbid(unsafe_code)]

use crate::ids::{MemberId, TerritoryId};
use crate::visits::VisitSet;
use serde::{Deserialize, Serialize};

pub const COORDINATE_MIN: f64 = 0.0;
pub const COORDINATE_MAX: f64 = 100.0;

/// One quadra of a territory, placed as a percentage coordinate on the map image.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubArea {
    pub sub_area_id: u32,
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutError {
    CoordinateOutOfRange,
    Empty,
    Full,
}

impl LayoutError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::CoordinateOutOfRange => "sub-area coordinates must be finite and within [0, 100]",
            Self::Empty => "layout has no sub-area to undo",
            Self::Full => "layout cannot hold more sub-areas",
        }
    }
}

/// Next entry for append-only layout authoring: ids are `len + 1`, in order.
pub fn next_sub_area(layout: &[SubArea], x: f64, y: f64) -> Result<SubArea, LayoutError> {
    check_coordinates(x, y)?;
    let sub_area_id = u32::try_from(layout.len())
        .ok()
        .and_then(|len| len.checked_add(1))
        .ok_or(LayoutError::Full)?;
    Ok(SubArea { sub_area_id, x, y })
}

/// Both coordinates finite and within `[0, 100]` percent of the map.
pub fn check_coordinates(x: f64, y: f64) -> Result<(), LayoutError> {
    if in_range(x) && in_range(y) {
        Ok(())
    } else {
        Err(LayoutError::CoordinateOutOfRange)
    }
}

fn in_range(value: f64) -> bool {
    value.is_finite() && (COORDINATE_MIN..=COORDINATE_MAX).contains(&value)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Territory {
    pub id: TerritoryId,
    pub name: String,
    pub reference: String,
    pub map_image_ref: String,
    pub layout: Vec<SubArea>,
    pub responsible_member_id: Option<MemberId>,
    pub revision: i64,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl Territory {
    pub fn has_sub_area(&self, sub_area_id: u32) -> bool {
        self.layout.iter().any(|area| area.sub_area_id == sub_area_id)
    }

    /// A territory with an empty layout is never complete, whatever the visit set says.
    pub fn is_complete(&self, visits: &VisitSet) -> bool {
        !self.layout.is_empty() && visits.len() == self.layout.len()
    }

    pub fn state(&self, visits: &VisitSet) -> TerritoryState {
        match &self.responsible_member_id {
            None => TerritoryState::Unassigned,
            Some(member) if self.is_complete(visits) => TerritoryState::Complete {
                responsible: member.clone(),
            },
            Some(member) => TerritoryState::InProgress {
                responsible: member.clone(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TerritoryState {
    Unassigned,
    InProgress { responsible: MemberId },
    Complete { responsible: MemberId },
}

impl TerritoryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unassigned => "unassigned",
            Self::InProgress { .. } => "in_progress",
            Self::Complete { .. } => "complete",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TerritoryProgress {
    pub territory_id: TerritoryId,
    pub visited: Vec<u32>,
    pub total: usize,
    pub complete: bool,
    pub state: TerritoryState,
}

impl TerritoryProgress {
    pub fn of(territory: &Territory, visits: &VisitSet) -> Self {
        Self {
            territory_id: territory.id.clone(),
            visited: visits.iter().collect(),
            total: territory.layout.len(),
            complete: territory.is_complete(visits),
            state: territory.state(visits),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub seq: i64,
    pub territory_id: TerritoryId,
    pub completed_at_ms: i64,
}
