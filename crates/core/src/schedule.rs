#![forbid(unsafe_code)]

use crate::ids::{MemberId, PartId, ScheduleId};
use serde::{Deserialize, Serialize};
use time::Date;

pub const ASSISTANT_SUFFIX: &str = " (Ajudante)";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    President,
    OpeningPrayer,
    ClosingPrayer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::President, Role::OpeningPrayer, Role::ClosingPrayer];

    pub fn code(self) -> &'static str {
        match self {
            Role::President => "president",
            Role::OpeningPrayer => "opening_prayer",
            Role::ClosingPrayer => "closing_prayer",
        }
    }

    /// Display name recorded in history descriptions.
    pub fn label(self) -> &'static str {
        match self {
            Role::President => "Presidente",
            Role::OpeningPrayer => "Oração Inicial",
            Role::ClosingPrayer => "Oração Final",
        }
    }

    pub fn from_code(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.code() == value)
    }
}

/// A role or part position of a schedule, addressed by stable identity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SlotRef {
    Role(Role),
    PartAssignee(PartId),
    PartAssistant(PartId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotRefError {
    InvalidFormat,
    UnknownRole,
    InvalidPartId,
}

impl SlotRefError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "slot must be role:<role> or part:<part_id>:<assignee|assistant>",
            Self::UnknownRole => "unknown role (expected president, opening_prayer or closing_prayer)",
            Self::InvalidPartId => "invalid part id in slot",
        }
    }
}

impl SlotRef {
    pub fn encode(&self) -> String {
        match self {
            SlotRef::Role(role) => format!("role:{}", role.code()),
            SlotRef::PartAssignee(part_id) => format!("part:{part_id}:assignee"),
            SlotRef::PartAssistant(part_id) => format!("part:{part_id}:assistant"),
        }
    }

    pub fn parse(value: &str) -> Result<Self, SlotRefError> {
        let value = value.trim();
        if let Some(code) = value.strip_prefix("role:") {
            return Role::from_code(code)
                .map(SlotRef::Role)
                .ok_or(SlotRefError::UnknownRole);
        }
        let Some(rest) = value.strip_prefix("part:") else {
            return Err(SlotRefError::InvalidFormat);
        };
        let Some((part_id, position)) = rest.rsplit_once(':') else {
            return Err(SlotRefError::InvalidFormat);
        };
        let part_id = PartId::try_new(part_id).map_err(|_| SlotRefError::InvalidPartId)?;
        match position {
            "assignee" => Ok(SlotRef::PartAssignee(part_id)),
            "assistant" => Ok(SlotRef::PartAssistant(part_id)),
            _ => Err(SlotRefError::InvalidFormat),
        }
    }
}

impl Serialize for SlotRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for SlotRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SlotRef::parse(&raw).map_err(|err| serde::de::Error::custom(err.message()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub part_id: PartId,
    pub name: String,
    pub assignee_id: Option<MemberId>,
    pub assistant_id: Option<MemberId>,
}

impl Part {
    pub fn assistant_label(&self) -> String {
        format!("{}{ASSISTANT_SUFFIX}", self.name)
    }
}

/// Weekly meeting schedule ("Programação") with denormalized assignment fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub meeting_date: Date,
    pub president_id: Option<MemberId>,
    pub opening_prayer_id: Option<MemberId>,
    pub closing_prayer_id: Option<MemberId>,
    pub parts: Vec<Part>,
    pub revision: i64,
}

impl Schedule {
    pub fn role(&self, role: Role) -> Option<&MemberId> {
        match role {
            Role::President => self.president_id.as_ref(),
            Role::OpeningPrayer => self.opening_prayer_id.as_ref(),
            Role::ClosingPrayer => self.closing_prayer_id.as_ref(),
        }
    }

    pub fn role_mut(&mut self, role: Role) -> &mut Option<MemberId> {
        match role {
            Role::President => &mut self.president_id,
            Role::OpeningPrayer => &mut self.opening_prayer_id,
            Role::ClosingPrayer => &mut self.closing_prayer_id,
        }
    }

    pub fn part(&self, part_id: &PartId) -> Option<&Part> {
        self.parts.iter().find(|part| &part.part_id == part_id)
    }

    /// Mutable handle to the denormalized field a slot points at, if the slot exists.
    pub fn slot_mut(&mut self, slot: &SlotRef) -> Option<&mut Option<MemberId>> {
        match slot {
            SlotRef::Role(role) => Some(self.role_mut(*role)),
            SlotRef::PartAssignee(part_id) => self
                .parts
                .iter_mut()
                .find(|part| &part.part_id == part_id)
                .map(|part| &mut part.assignee_id),
            SlotRef::PartAssistant(part_id) => self
                .parts
                .iter_mut()
                .find(|part| &part.part_id == part_id)
                .map(|part| &mut part.assistant_id),
        }
    }

    /// Free-text description written alongside history rows for this slot.
    pub fn slot_label(&self, slot: &SlotRef) -> Option<String> {
        match slot {
            SlotRef::Role(role) => Some(role.label().to_string()),
            SlotRef::PartAssignee(part_id) => self.part(part_id).map(|part| part.name.clone()),
            SlotRef::PartAssistant(part_id) => self.part(part_id).map(Part::assistant_label),
        }
    }
}

/// Append-only assignment history row ("Histórico de Designações").
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub seq: i64,
    pub schedule_id: ScheduleId,
    pub part_description: String,
    pub slot: Option<SlotRef>,
    pub member_id: MemberId,
    pub recorded_at_ms: i64,
}

impl HistoryEntry {
    /// Rows carrying an explicit slot match by identity; legacy rows match by exact description.
    pub fn matches(&self, slot: &SlotRef, legacy_label: &str) -> bool {
        match &self.slot {
            Some(own) => own == slot,
            None => self.part_description == legacy_label,
        }
    }
}
