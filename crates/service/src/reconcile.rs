#![forbid(unsafe_code)]

//! Restores denormalized schedule fields from the assignment history.

use crate::error::ServiceError;
use crate::ports::ScheduleStore;
use cm_core::{FilledSlot, Schedule, ScheduleId, format_local_date, now_ms, restore_from_history};
use cm_storage::RestoreAssignmentsRequest;
use serde::Serialize;
use time::Date;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScheduleOutcome {
    Restored { filled: Vec<FilledSlot> },
    Unchanged,
    NoHistory,
    HistoryUnavailable { code: String, message: String },
    Failed { code: String, message: String },
}

impl ScheduleOutcome {
    fn from_error(err: &ServiceError) -> (String, String) {
        (err.code().to_string(), err.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScheduleRestore {
    pub schedule_id: ScheduleId,
    pub meeting_date: Date,
    pub outcome: ScheduleOutcome,
}

impl ScheduleRestore {
    /// One human-readable line, naming the schedule by its meeting date.
    pub fn line(&self) -> String {
        let date = format_local_date(self.meeting_date);
        match &self.outcome {
            ScheduleOutcome::Restored { filled } => {
                let slots = filled
                    .iter()
                    .map(|fill| format!("{} = {}", fill.label, fill.member_id))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("Programação de {date}: restaurado ({slots})")
            }
            ScheduleOutcome::Unchanged => format!("Programação de {date}: nada a restaurar"),
            ScheduleOutcome::NoHistory => format!("Programação de {date}: sem histórico"),
            ScheduleOutcome::HistoryUnavailable { message, .. } => {
                format!("Programação de {date}: histórico indisponível ({message})")
            }
            ScheduleOutcome::Failed { message, .. } => {
                format!("Programação de {date}: falha ao restaurar ({message})")
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub schedules: Vec<ScheduleRestore>,
}

impl RestoreReport {
    pub fn restored(&self) -> usize {
        self.count(|outcome| matches!(outcome, ScheduleOutcome::Restored { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|outcome| {
            matches!(outcome, ScheduleOutcome::Unchanged | ScheduleOutcome::NoHistory)
        })
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| {
            matches!(
                outcome,
                ScheduleOutcome::Failed { .. } | ScheduleOutcome::HistoryUnavailable { .. }
            )
        })
    }

    pub fn filled_slots(&self) -> usize {
        self.schedules
            .iter()
            .map(|entry| match &entry.outcome {
                ScheduleOutcome::Restored { filled } => filled.len(),
                _ => 0,
            })
            .sum()
    }

    pub fn lines(&self) -> Vec<String> {
        self.schedules.iter().map(ScheduleRestore::line).collect()
    }

    fn count(&self, predicate: impl Fn(&ScheduleOutcome) -> bool) -> usize {
        self.schedules
            .iter()
            .filter(|entry| predicate(&entry.outcome))
            .count()
    }
}

/// Replays assignment history onto every schedule, filling only empty fields.
///
/// Each schedule is its own failure boundary; only failing to list the schedules
/// aborts the run.
pub struct AssignmentReconciler<'a, S> {
    store: &'a mut S,
}

impl<'a, S: ScheduleStore> AssignmentReconciler<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    pub fn restore(&mut self) -> Result<RestoreReport, ServiceError> {
        let schedules = self.store.schedules().map_err(ServiceError::Persistence)?;
        let mut report = RestoreReport::default();
        for schedule in schedules {
            let outcome = self.restore_one(&schedule);
            report.schedules.push(ScheduleRestore {
                schedule_id: schedule.id,
                meeting_date: schedule.meeting_date,
                outcome,
            });
        }
        tracing::info!(
            schedules = report.schedules.len(),
            restored = report.restored(),
            failed = report.failed(),
            slots = report.filled_slots(),
            "assignment restore finished"
        );
        Ok(report)
    }

    fn restore_one(&mut self, schedule: &Schedule) -> ScheduleOutcome {
        let history = match self.store.history(&schedule.id) {
            Ok(rows) => rows,
            Err(err) => {
                let err = ServiceError::from_store(err, "schedule", schedule.id.as_str());
                tracing::warn!(schedule = %schedule.id, error = %err, "assignment history unavailable");
                let (code, message) = ScheduleOutcome::from_error(&err);
                return ScheduleOutcome::HistoryUnavailable { code, message };
            }
        };
        if history.is_empty() {
            return ScheduleOutcome::NoHistory;
        }

        let restoration = restore_from_history(schedule, &history);
        if restoration.is_noop() {
            return ScheduleOutcome::Unchanged;
        }

        let restored = restoration.schedule;
        let write = self.store.restore_assignments(RestoreAssignmentsRequest {
            schedule_id: schedule.id.clone(),
            expected_revision: schedule.revision,
            president_id: restored.president_id,
            opening_prayer_id: restored.opening_prayer_id,
            closing_prayer_id: restored.closing_prayer_id,
            parts: restored.parts,
            updated_at_ms: now_ms(),
        });
        match write {
            Ok(_) => {
                for fill in &restoration.filled {
                    tracing::debug!(
                        schedule = %schedule.id,
                        slot = %fill.slot.encode(),
                        member = %fill.member_id,
                        history_seq = fill.history_seq,
                        "slot restored"
                    );
                }
                ScheduleOutcome::Restored {
                    filled: restoration.filled,
                }
            }
            Err(err) => {
                let err = ServiceError::from_store(err, "schedule", schedule.id.as_str());
                tracing::warn!(schedule = %schedule.id, error = %err, "schedule restore failed");
                let (code, message) = ScheduleOutcome::from_error(&err);
                ScheduleOutcome::Failed { code, message }
            }
        }
    }
}
