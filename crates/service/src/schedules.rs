#![forbid(unsafe_code)]

use crate::error::ServiceError;
use crate::ports::ScheduleStore;
use cm_core::{HistoryEntry, MemberId, Schedule, ScheduleId, SlotRef, now_ms};
use cm_storage::{
    AppendHistoryRequest, AssignSlotRequest, ClearSlotRequest, CreateScheduleRequest, NewPart,
};
use time::Date;

/// Authoring side of the weekly schedule and its assignment history.
pub struct ScheduleBook<'a, S> {
    store: &'a mut S,
}

impl<'a, S: ScheduleStore> ScheduleBook<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    pub fn create_schedule(
        &mut self,
        schedule_id: &str,
        meeting_date: Date,
        parts: Vec<NewPart>,
    ) -> Result<Schedule, ServiceError> {
        let id = parse_schedule_id(schedule_id)?;
        if parts.iter().any(|part| part.name.trim().is_empty()) {
            return Err(ServiceError::validation("part name must not be empty"));
        }
        self.store
            .create_schedule(CreateScheduleRequest {
                schedule_id: id.clone(),
                meeting_date,
                parts,
                created_at_ms: now_ms(),
            })
            .map_err(|err| ServiceError::from_store(err, "schedule", id.as_str()))
    }

    pub fn schedule(&self, schedule_id: &str) -> Result<Schedule, ServiceError> {
        let id = parse_schedule_id(schedule_id)?;
        self.store
            .schedule(&id)
            .map_err(|err| ServiceError::from_store(err, "schedule", id.as_str()))?
            .ok_or_else(|| ServiceError::not_found("schedule", id.as_str()))
    }

    pub fn schedules(&self) -> Result<Vec<Schedule>, ServiceError> {
        self.store.schedules().map_err(ServiceError::Persistence)
    }

    pub fn assign_slot(
        &mut self,
        schedule_id: &str,
        slot: &str,
        member_id: &str,
    ) -> Result<(Schedule, HistoryEntry), ServiceError> {
        let id = parse_schedule_id(schedule_id)?;
        let slot = parse_slot(slot)?;
        let member = parse_member(member_id)?;
        let (schedule, entry) = self
            .store
            .assign_slot(AssignSlotRequest {
                schedule_id: id.clone(),
                slot,
                member_id: member,
                recorded_at_ms: now_ms(),
            })
            .map_err(|err| ServiceError::from_store(err, "schedule", id.as_str()))?;
        tracing::info!(
            schedule = %schedule.id,
            slot = %entry.part_description,
            member = %entry.member_id,
            "schedule slot assigned"
        );
        Ok((schedule, entry))
    }

    pub fn clear_slot(&mut self, schedule_id: &str, slot: &str) -> Result<Schedule, ServiceError> {
        let id = parse_schedule_id(schedule_id)?;
        let slot = parse_slot(slot)?;
        self.store
            .clear_slot(ClearSlotRequest {
                schedule_id: id.clone(),
                slot,
                updated_at_ms: now_ms(),
            })
            .map_err(|err| ServiceError::from_store(err, "schedule", id.as_str()))
    }

    /// Appends a raw history row, e.g. when importing rows recorded elsewhere.
    pub fn append_history(
        &mut self,
        schedule_id: &str,
        part_description: &str,
        slot: Option<&str>,
        member_id: &str,
        recorded_at_ms: Option<i64>,
    ) -> Result<HistoryEntry, ServiceError> {
        let id = parse_schedule_id(schedule_id)?;
        if part_description.trim().is_empty() {
            return Err(ServiceError::validation("part description must not be empty"));
        }
        let slot = slot.map(parse_slot).transpose()?;
        let member = parse_member(member_id)?;
        self.store
            .append_history(AppendHistoryRequest {
                schedule_id: id.clone(),
                part_description: part_description.to_string(),
                slot,
                member_id: member,
                recorded_at_ms: recorded_at_ms.unwrap_or_else(now_ms),
            })
            .map_err(|err| ServiceError::from_store(err, "schedule", id.as_str()))
    }

    pub fn history(&self, schedule_id: &str) -> Result<Vec<HistoryEntry>, ServiceError> {
        let id = parse_schedule_id(schedule_id)?;
        self.store
            .history(&id)
            .map_err(|err| ServiceError::from_store(err, "schedule", id.as_str()))
    }
}

fn parse_schedule_id(raw: &str) -> Result<ScheduleId, ServiceError> {
    ScheduleId::try_new(raw)
        .map_err(|err| ServiceError::validation(format!("schedule id: {}", err.message())))
}

fn parse_slot(raw: &str) -> Result<SlotRef, ServiceError> {
    SlotRef::parse(raw).map_err(|err| ServiceError::validation(err.message()))
}

fn parse_member(raw: &str) -> Result<MemberId, ServiceError> {
    MemberId::try_new(raw).map_err(|_| ServiceError::validation("a member must be selected"))
}
