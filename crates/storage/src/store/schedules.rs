#![forbid(unsafe_code)]

use super::{
    AppendHistoryRequest, AssignSlotRequest, ClearSlotRequest, CreateScheduleRequest,
    RestoreAssignmentsRequest, SqliteStore, StoreError, map_insert_conflict, required_text,
};
use cm_core::{
    HistoryEntry, MemberId, Part, PartId, Schedule, ScheduleId, SlotRef, format_iso_date,
    parse_date,
};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::collections::BTreeSet;

const SCHEDULE_COLUMNS: &str =
    "id, meeting_date, president_id, opening_prayer_id, closing_prayer_id, parts_json, revision";

impl SqliteStore {
    pub fn create_schedule(
        &mut self,
        request: CreateScheduleRequest,
    ) -> Result<Schedule, StoreError> {
        let mut parts = Vec::with_capacity(request.parts.len());
        let mut seen = BTreeSet::new();
        for (index, new_part) in request.parts.into_iter().enumerate() {
            let name = required_text(&new_part.name, "part name must not be empty")?;
            let part_id = match new_part.part_id {
                Some(raw) => {
                    PartId::try_new(raw).map_err(|_| StoreError::InvalidInput("invalid part id"))?
                }
                None => PartId::for_ordinal(index + 1),
            };
            if !seen.insert(part_id.clone()) {
                return Err(StoreError::InvalidInput("part ids must be unique"));
            }
            parts.push(Part {
                part_id,
                name,
                assignee_id: None,
                assistant_id: None,
            });
        }
        let parts_json = encode_parts(&parts)?;

        let tx = self.conn.transaction()?;
        let insert = tx.execute(
            "INSERT INTO schedules(id, meeting_date, president_id, opening_prayer_id, closing_prayer_id, parts_json, revision, created_at_ms, updated_at_ms) \
             VALUES (?1, ?2, NULL, NULL, NULL, ?3, 1, ?4, ?4)",
            params![
                request.schedule_id.as_str(),
                format_iso_date(request.meeting_date),
                parts_json,
                request.created_at_ms,
            ],
        );
        if let Err(err) = insert {
            return Err(map_insert_conflict(err));
        }

        let schedule = schedule_tx(&tx, &request.schedule_id)?;
        tx.commit()?;
        Ok(schedule)
    }

    pub fn get_schedule(&self, schedule_id: &ScheduleId) -> Result<Option<Schedule>, StoreError> {
        schedule_conn(&self.conn, schedule_id)
    }

    pub fn list_schedules(&self) -> Result<Vec<Schedule>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules ORDER BY meeting_date ASC, id ASC"
        ))?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(schedule_from_row(row)??);
        }
        Ok(out)
    }

    /// Normal assignment path: writes the denormalized field and appends the matching
    /// history row in the same transaction.
    pub fn assign_slot(
        &mut self,
        request: AssignSlotRequest,
    ) -> Result<(Schedule, HistoryEntry), StoreError> {
        let tx = self.conn.transaction()?;
        let mut schedule = schedule_tx(&tx, &request.schedule_id)?;

        let label = schedule
            .slot_label(&request.slot)
            .ok_or(StoreError::InvalidInput("slot does not exist on schedule"))?;
        let Some(field) = schedule.slot_mut(&request.slot) else {
            return Err(StoreError::InvalidInput("slot does not exist on schedule"));
        };
        *field = Some(request.member_id.clone());

        write_assignments_tx(&tx, &schedule, request.recorded_at_ms)?;
        let entry = insert_history_tx(
            &tx,
            &request.schedule_id,
            &label,
            Some(&request.slot),
            &request.member_id,
            request.recorded_at_ms,
        )?;

        let schedule = schedule_tx(&tx, &request.schedule_id)?;
        tx.commit()?;
        Ok((schedule, entry))
    }

    /// Clears one denormalized field. History is left untouched.
    pub fn clear_slot(&mut self, request: ClearSlotRequest) -> Result<Schedule, StoreError> {
        let tx = self.conn.transaction()?;
        let mut schedule = schedule_tx(&tx, &request.schedule_id)?;
        let Some(field) = schedule.slot_mut(&request.slot) else {
            return Err(StoreError::InvalidInput("slot does not exist on schedule"));
        };
        *field = None;

        write_assignments_tx(&tx, &schedule, request.updated_at_ms)?;
        let schedule = schedule_tx(&tx, &request.schedule_id)?;
        tx.commit()?;
        Ok(schedule)
    }

    pub fn append_history(
        &mut self,
        request: AppendHistoryRequest,
    ) -> Result<HistoryEntry, StoreError> {
        let description = required_text(
            &request.part_description,
            "part description must not be empty",
        )?;
        let tx = self.conn.transaction()?;
        ensure_schedule_exists_tx(&tx, &request.schedule_id)?;
        let entry = insert_history_tx(
            &tx,
            &request.schedule_id,
            &description,
            request.slot.as_ref(),
            &request.member_id,
            request.recorded_at_ms,
        )?;
        tx.commit()?;
        Ok(entry)
    }

    pub fn list_history(&self, schedule_id: &ScheduleId) -> Result<Vec<HistoryEntry>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT seq, schedule_id, part_description, slot, member_id, recorded_at_ms \
             FROM assignment_history WHERE schedule_id=?1 ORDER BY seq ASC",
        )?;
        let mut rows = stmt.query(params![schedule_id.as_str()])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let schedule_id = ScheduleId::try_new(row.get::<_, String>(1)?)
                .map_err(|_| StoreError::InvalidInput("invalid history row"))?;
            let slot = row
                .get::<_, Option<String>>(3)?
                .map(|raw| SlotRef::parse(&raw))
                .transpose()
                .map_err(|_| StoreError::InvalidInput("invalid history slot"))?;
            let member_id = MemberId::try_new(row.get::<_, String>(4)?)
                .map_err(|_| StoreError::InvalidInput("invalid history member"))?;
            out.push(HistoryEntry {
                seq: row.get::<_, i64>(0)?,
                schedule_id,
                part_description: row.get::<_, String>(2)?,
                slot,
                member_id,
                recorded_at_ms: row.get::<_, i64>(5)?,
            });
        }
        Ok(out)
    }

    /// Writes restored assignment fields back to a schedule.
    ///
    /// Guarded twice: the stored revision must equal `expected_revision`, and no field that
    /// currently holds a member may be changed.
    pub fn restore_assignments(
        &mut self,
        request: RestoreAssignmentsRequest,
    ) -> Result<Schedule, StoreError> {
        let tx = self.conn.transaction()?;
        let current = schedule_tx(&tx, &request.schedule_id)?;
        if current.revision != request.expected_revision {
            return Err(StoreError::RevisionMismatch {
                expected: request.expected_revision,
                actual: current.revision,
            });
        }

        let candidate = Schedule {
            id: current.id.clone(),
            meeting_date: current.meeting_date,
            president_id: request.president_id,
            opening_prayer_id: request.opening_prayer_id,
            closing_prayer_id: request.closing_prayer_id,
            parts: request.parts,
            revision: current.revision,
        };
        ensure_fill_only(&current, &candidate)?;

        write_assignments_tx(&tx, &candidate, request.updated_at_ms)?;
        let schedule = schedule_tx(&tx, &request.schedule_id)?;
        tx.commit()?;
        Ok(schedule)
    }
}

fn ensure_fill_only(current: &Schedule, candidate: &Schedule) -> Result<(), StoreError> {
    fn keeps(current: &Option<MemberId>, candidate: &Option<MemberId>) -> bool {
        current.is_none() || current == candidate
    }

    if current.parts.len() != candidate.parts.len()
        || current
            .parts
            .iter()
            .zip(&candidate.parts)
            .any(|(a, b)| a.part_id != b.part_id || a.name != b.name)
    {
        return Err(StoreError::InvalidInput(
            "restore must keep the schedule part list unchanged",
        ));
    }

    let roles_kept = keeps(&current.president_id, &candidate.president_id)
        && keeps(&current.opening_prayer_id, &candidate.opening_prayer_id)
        && keeps(&current.closing_prayer_id, &candidate.closing_prayer_id);
    let parts_kept = current.parts.iter().zip(&candidate.parts).all(|(a, b)| {
        keeps(&a.assignee_id, &b.assignee_id) && keeps(&a.assistant_id, &b.assistant_id)
    });

    if roles_kept && parts_kept {
        Ok(())
    } else {
        Err(StoreError::InvalidInput(
            "restore must not overwrite assigned fields",
        ))
    }
}

fn schedule_conn(
    conn: &Connection,
    schedule_id: &ScheduleId,
) -> Result<Option<Schedule>, StoreError> {
    let row = conn
        .query_row(
            &format!("SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id=?1"),
            params![schedule_id.as_str()],
            schedule_from_row,
        )
        .optional()?;
    row.transpose()
}

fn schedule_tx(tx: &Transaction<'_>, schedule_id: &ScheduleId) -> Result<Schedule, StoreError> {
    schedule_conn(tx, schedule_id)?.ok_or(StoreError::UnknownId)
}

fn schedule_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Schedule, StoreError>> {
    let id = row.get::<_, String>(0)?;
    let meeting_date = row.get::<_, String>(1)?;
    let president_id = row.get::<_, Option<String>>(2)?;
    let opening_prayer_id = row.get::<_, Option<String>>(3)?;
    let closing_prayer_id = row.get::<_, Option<String>>(4)?;
    let parts_json = row.get::<_, String>(5)?;
    let revision = row.get::<_, i64>(6)?;

    Ok(decode_schedule(
        id,
        &meeting_date,
        [president_id, opening_prayer_id, closing_prayer_id],
        &parts_json,
        revision,
    ))
}

fn decode_schedule(
    id: String,
    meeting_date: &str,
    roles: [Option<String>; 3],
    parts_json: &str,
    revision: i64,
) -> Result<Schedule, StoreError> {
    let id = ScheduleId::try_new(id).map_err(|_| StoreError::InvalidInput("invalid schedule row"))?;
    let meeting_date = parse_date(meeting_date)
        .map_err(|_| StoreError::InvalidInput("invalid schedule meeting date"))?;
    let [president_id, opening_prayer_id, closing_prayer_id] = roles.map(|role| {
        role.map(MemberId::try_new)
            .transpose()
            .map_err(|_| StoreError::InvalidInput("invalid schedule role member"))
    });
    let parts: Vec<Part> = serde_json::from_str(parts_json)
        .map_err(|_| StoreError::InvalidInput("invalid schedule parts row"))?;

    Ok(Schedule {
        id,
        meeting_date,
        president_id: president_id?,
        opening_prayer_id: opening_prayer_id?,
        closing_prayer_id: closing_prayer_id?,
        parts,
        revision,
    })
}

fn encode_parts(parts: &[Part]) -> Result<String, StoreError> {
    serde_json::to_string(parts).map_err(|_| StoreError::InvalidInput("parts are not serializable"))
}

fn ensure_schedule_exists_tx(tx: &Transaction<'_>, schedule_id: &ScheduleId) -> Result<(), StoreError> {
    let exists = tx
        .query_row(
            "SELECT 1 FROM schedules WHERE id=?1",
            params![schedule_id.as_str()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some();

    if exists {
        Ok(())
    } else {
        Err(StoreError::UnknownId)
    }
}

fn write_assignments_tx(
    tx: &Transaction<'_>,
    schedule: &Schedule,
    updated_at_ms: i64,
) -> Result<(), StoreError> {
    let parts_json = encode_parts(&schedule.parts)?;
    tx.execute(
        "UPDATE schedules SET president_id=?2, opening_prayer_id=?3, closing_prayer_id=?4, parts_json=?5, \
         revision=revision+1, updated_at_ms=MAX(updated_at_ms, ?6) WHERE id=?1",
        params![
            schedule.id.as_str(),
            schedule.president_id.as_ref().map(|m| m.as_str()),
            schedule.opening_prayer_id.as_ref().map(|m| m.as_str()),
            schedule.closing_prayer_id.as_ref().map(|m| m.as_str()),
            parts_json,
            updated_at_ms,
        ],
    )?;
    Ok(())
}

fn insert_history_tx(
    tx: &Transaction<'_>,
    schedule_id: &ScheduleId,
    description: &str,
    slot: Option<&SlotRef>,
    member_id: &MemberId,
    recorded_at_ms: i64,
) -> Result<HistoryEntry, StoreError> {
    tx.execute(
        "INSERT INTO assignment_history(schedule_id, part_description, slot, member_id, recorded_at_ms) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            schedule_id.as_str(),
            description,
            slot.map(SlotRef::encode),
            member_id.as_str(),
            recorded_at_ms,
        ],
    )?;
    Ok(HistoryEntry {
        seq: tx.last_insert_rowid(),
        schedule_id: schedule_id.clone(),
        part_description: description.to_string(),
        slot: slot.cloned(),
        member_id: member_id.clone(),
        recorded_at_ms,
    })
}
