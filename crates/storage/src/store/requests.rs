#![forbid(unsafe_code)]

use cm_core::{MemberId, Part, ScheduleId, SlotRef, TerritoryId};
use time::Date;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateTerritoryRequest {
    pub territory_id: TerritoryId,
    pub name: String,
    pub reference: String,
    pub map_image_ref: String,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AddSubAreaRequest {
    pub territory_id: TerritoryId,
    pub x: f64,
    pub y: f64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetResponsibleRequest {
    pub territory_id: TerritoryId,
    pub member_id: Option<MemberId>,
    /// When set, the write only applies if the stored revision still matches.
    pub expected_revision: Option<i64>,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseRoundRequest {
    pub territory_id: TerritoryId,
    pub completed_at_ms: i64,
    pub release_responsible: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListCompletionsRequest {
    pub territory_id: Option<TerritoryId>,
    pub from_ms: i64,
    pub to_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPart {
    pub part_id: Option<String>,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateScheduleRequest {
    pub schedule_id: ScheduleId,
    pub meeting_date: Date,
    pub parts: Vec<NewPart>,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssignSlotRequest {
    pub schedule_id: ScheduleId,
    pub slot: SlotRef,
    pub member_id: MemberId,
    pub recorded_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClearSlotRequest {
    pub schedule_id: ScheduleId,
    pub slot: SlotRef,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppendHistoryRequest {
    pub schedule_id: ScheduleId,
    pub part_description: String,
    pub slot: Option<SlotRef>,
    pub member_id: MemberId,
    pub recorded_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestoreAssignmentsRequest {
    pub schedule_id: ScheduleId,
    pub expected_revision: i64,
    pub president_id: Option<MemberId>,
    pub opening_prayer_id: Option<MemberId>,
    pub closing_prayer_id: Option<MemberId>,
    pub parts: Vec<Part>,
    pub updated_at_ms: i64,
}
