#![forbid(unsafe_code)]

use crate::args::{Command, LayoutCommand, ScheduleCommand, TerritoryCommand, VisitCommand};
use anyhow::Context;
use cm_core::format_iso_date;
use cm_service::{
    AssignmentReconciler, LifecycleController, ScheduleBook, ServiceConfig, VisitTracker,
};
use cm_storage::{NewPart, SqliteStore};
use serde_json::{Value, json};

pub(crate) fn dispatch(
    command: Command,
    store: &mut SqliteStore,
    config: ServiceConfig,
) -> anyhow::Result<Value> {
    match command {
        Command::Territory(command) => territory(command, store, config),
        Command::Layout(command) => layout(command, store, config),
        Command::Visit(command) => visit(command, store),
        Command::Assign {
            territory_id,
            member_id,
        } => to_value(LifecycleController::new(store, config).assign(&territory_id, &member_id)?),
        Command::Release { territory_id } => {
            to_value(LifecycleController::new(store, config).release(&territory_id)?)
        }
        Command::Close { territory_id } => {
            to_value(LifecycleController::new(store, config).close(&territory_id)?)
        }
        Command::Progress { territory_id } => {
            to_value(LifecycleController::new(store, config).progress(&territory_id)?)
        }
        Command::Report { from, to } => {
            let rows = LifecycleController::new(store, config).report(from, to)?;
            Ok(json!({
                "from": format_iso_date(from),
                "to": format_iso_date(to),
                "territories": to_value(rows)?,
            }))
        }
        Command::Schedule(command) => schedule(command, store),
        Command::Restore => {
            let report = AssignmentReconciler::new(store).restore()?;
            Ok(json!({
                "restored": report.restored(),
                "unchanged": report.unchanged(),
                "failed": report.failed(),
                "filled_slots": report.filled_slots(),
                "lines": report.lines(),
                "schedules": to_value(&report.schedules)?,
            }))
        }
    }
}

fn territory(
    command: TerritoryCommand,
    store: &mut SqliteStore,
    config: ServiceConfig,
) -> anyhow::Result<Value> {
    let mut controller = LifecycleController::new(store, config);
    match command {
        TerritoryCommand::Create {
            territory_id,
            name,
            reference,
            map,
        } => to_value(controller.create_territory(&territory_id, &name, &reference, &map)?),
        TerritoryCommand::List => to_value(controller.territories()?),
        TerritoryCommand::Show { territory_id } => {
            let territory = controller.territory(&territory_id)?;
            let progress = controller.progress(&territory_id)?;
            Ok(json!({
                "territory": to_value(territory)?,
                "progress": to_value(progress)?,
            }))
        }
    }
}

fn layout(
    command: LayoutCommand,
    store: &mut SqliteStore,
    config: ServiceConfig,
) -> anyhow::Result<Value> {
    let mut controller = LifecycleController::new(store, config);
    match command {
        LayoutCommand::Add { territory_id, x, y } => {
            to_value(controller.add_sub_area(&territory_id, x, y)?)
        }
        LayoutCommand::Undo { territory_id } => to_value(controller.undo_sub_area(&territory_id)?),
    }
}

fn visit(command: VisitCommand, store: &mut SqliteStore) -> anyhow::Result<Value> {
    let mut tracker = VisitTracker::new(store);
    match command {
        VisitCommand::Toggle {
            territory_id,
            sub_area_id,
        } => to_value(tracker.toggle_visit(&territory_id, sub_area_id)?),
        VisitCommand::List { territory_id } => to_value(tracker.visits(&territory_id)?),
    }
}

fn schedule(command: ScheduleCommand, store: &mut SqliteStore) -> anyhow::Result<Value> {
    let mut book = ScheduleBook::new(store);
    match command {
        ScheduleCommand::Create {
            schedule_id,
            date,
            parts,
        } => {
            let parts = parts
                .into_iter()
                .map(|name| NewPart {
                    part_id: None,
                    name,
                })
                .collect();
            to_value(book.create_schedule(&schedule_id, date, parts)?)
        }
        ScheduleCommand::List => to_value(book.schedules()?),
        ScheduleCommand::Show { schedule_id } => to_value(book.schedule(&schedule_id)?),
        ScheduleCommand::Assign {
            schedule_id,
            slot,
            member_id,
        } => {
            let (schedule, entry) = book.assign_slot(&schedule_id, &slot, &member_id)?;
            Ok(json!({
                "schedule": to_value(schedule)?,
                "history": to_value(entry)?,
            }))
        }
        ScheduleCommand::Clear { schedule_id, slot } => {
            to_value(book.clear_slot(&schedule_id, &slot)?)
        }
        ScheduleCommand::History { schedule_id } => to_value(book.history(&schedule_id)?),
        ScheduleCommand::AppendHistory {
            schedule_id,
            description,
            member,
            slot,
            at_ms,
        } => to_value(book.append_history(
            &schedule_id,
            &description,
            slot.as_deref(),
            &member,
            at_ms,
        )?),
    }
}

fn to_value(value: impl serde::Serialize) -> anyhow::Result<Value> {
    serde_json::to_value(value).context("serialize command result")
}
