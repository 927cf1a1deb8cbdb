#![forbid(unsafe_code)]

//! Fill-in-the-gaps replay of assignment history onto a schedule.
//!
//! Only absent fields are filled; a field that already holds a member is never
//! touched, which makes the replay idempotent.

use crate::ids::MemberId;
use crate::schedule::{HistoryEntry, Role, Schedule, SlotRef};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FilledSlot {
    pub slot: SlotRef,
    pub label: String,
    pub member_id: MemberId,
    pub history_seq: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Restoration {
    pub schedule: Schedule,
    pub filled: Vec<FilledSlot>,
}

impl Restoration {
    pub fn is_noop(&self) -> bool {
        self.filled.is_empty()
    }

    pub fn roles_changed(&self) -> bool {
        self.filled
            .iter()
            .any(|fill| matches!(fill.slot, SlotRef::Role(_)))
    }

    pub fn parts_changed(&self) -> bool {
        self.filled
            .iter()
            .any(|fill| !matches!(fill.slot, SlotRef::Role(_)))
    }
}

/// Most recent matching row: greatest `(recorded_at_ms, seq)`.
pub fn latest_match<'a>(
    history: &'a [HistoryEntry],
    slot: &SlotRef,
    legacy_label: &str,
) -> Option<&'a HistoryEntry> {
    history
        .iter()
        .filter(|entry| entry.matches(slot, legacy_label))
        .max_by_key(|entry| (entry.recorded_at_ms, entry.seq))
}

pub fn restore_from_history(schedule: &Schedule, history: &[HistoryEntry]) -> Restoration {
    let mut restored = schedule.clone();
    let mut filled = Vec::new();

    let mut targets: Vec<(SlotRef, String)> = Role::ALL
        .into_iter()
        .map(|role| (SlotRef::Role(role), role.label().to_string()))
        .collect();
    for part in &schedule.parts {
        targets.push((SlotRef::PartAssignee(part.part_id.clone()), part.name.clone()));
        targets.push((
            SlotRef::PartAssistant(part.part_id.clone()),
            part.assistant_label(),
        ));
    }

    for (slot, label) in targets {
        let Some(field) = restored.slot_mut(&slot) else {
            continue;
        };
        if field.is_some() {
            continue;
        }
        let Some(entry) = latest_match(history, &slot, &label) else {
            continue;
        };
        *field = Some(entry.member_id.clone());
        filled.push(FilledSlot {
            slot,
            label,
            member_id: entry.member_id.clone(),
            history_seq: entry.seq,
        });
    }

    Restoration {
        schedule: restored,
        filled,
    }
}
