#![forbid(unsafe_code)]

use cm_core::{TerritoryId, TerritoryState, date_time_ms};
use cm_service::{ClosePolicy, LifecycleController, ServiceConfig, ServiceError, VisitTracker};
use cm_storage::{CloseRoundRequest, ListCompletionsRequest, SqliteStore};
use time::macros::{date, offset, time};

fn open_store() -> (tempfile::TempDir, SqliteStore) {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = SqliteStore::open(dir.path()).expect("open store");
    (dir, store)
}

fn territory_id(raw: &str) -> TerritoryId {
    TerritoryId::try_new(raw).expect("territory id")
}

fn seed_territory(store: &mut SqliteStore, raw: &str, name: &str, sub_areas: usize) {
    let mut controller = LifecycleController::new(store, ServiceConfig::default());
    controller
        .create_territory(raw, name, "Centro", "maps/t.png")
        .expect("create territory");
    for n in 0..sub_areas {
        controller
            .add_sub_area(raw, 0.1 * (n as f64 + 1.0), 0.5)
            .expect("add sub-area");
    }
}

#[test]
fn assign_requires_a_member_and_an_unassigned_territory() {
    let (_dir, mut store) = open_store();
    seed_territory(&mut store, "T1", "Vila Nova", 2);
    let mut controller = LifecycleController::new(&mut store, ServiceConfig::default());

    let missing = controller.assign("T1", "  ").unwrap_err();
    assert!(matches!(missing, ServiceError::Validation(_)));
    assert_eq!(missing.code(), "VALIDATION");
    let unchanged = controller.territory("T1").unwrap();
    assert_eq!(unchanged.responsible_member_id, None);

    let assigned = controller.assign("T1", "M1").expect("assign");
    assert_eq!(assigned.responsible_member_id.as_ref().unwrap().as_str(), "M1");

    let again = controller.assign("T1", "M2").unwrap_err();
    assert!(matches!(again, ServiceError::Validation(_)));

    let unknown = controller.assign("T9", "M1").unwrap_err();
    assert!(matches!(unknown, ServiceError::NotFound { kind: "territory", .. }));
}

#[test]
fn close_appends_one_completion_and_clears_visits() {
    let (_dir, mut store) = open_store();
    seed_territory(&mut store, "T1", "Vila Nova", 2);
    {
        let mut controller = LifecycleController::new(&mut store, ServiceConfig::default());
        controller.assign("T1", "M1").expect("assign");
    }
    {
        let mut tracker = VisitTracker::new(&mut store);
        tracker.toggle_visit("T1", 1).expect("toggle 1");
        let outcome = tracker.toggle_visit("T1", 2).expect("toggle 2");
        assert!(outcome.complete);
    }

    let mut controller = LifecycleController::new(&mut store, ServiceConfig::default());
    let progress = controller.progress("T1").unwrap();
    assert!(matches!(progress.state, TerritoryState::Complete { .. }));

    let record = controller.close("T1").expect("close");
    assert_eq!(record.territory_id.as_str(), "T1");

    let after = controller.progress("T1").unwrap();
    assert!(after.visited.is_empty());
    assert_eq!(after.state, TerritoryState::Unassigned);
    drop(controller);

    let rows = store
        .list_completions(ListCompletionsRequest {
            territory_id: Some(territory_id("T1")),
            from_ms: 0,
            to_ms: i64::MAX,
        })
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].seq, record.seq);
}

#[test]
fn keep_policy_leaves_the_responsible_member() {
    let (_dir, mut store) = open_store();
    seed_territory(&mut store, "T1", "Vila Nova", 1);
    let config = ServiceConfig {
        close_policy: ClosePolicy::Keep,
        ..ServiceConfig::default()
    };
    let mut controller = LifecycleController::new(&mut store, config);
    controller.assign("T1", "M1").expect("assign");
    controller.close("T1").expect("close");

    let territory = controller.territory("T1").unwrap();
    assert_eq!(territory.responsible_member_id.as_ref().unwrap().as_str(), "M1");

    let released = controller.release("T1").expect("release");
    assert_eq!(released.responsible_member_id, None);
    controller.assign("T1", "M2").expect("reassign after release");
}

#[test]
fn close_of_an_incomplete_round_still_archives_it() {
    let (_dir, mut store) = open_store();
    seed_territory(&mut store, "T1", "Vila Nova", 3);
    VisitTracker::new(&mut store)
        .toggle_visit("T1", 2)
        .expect("toggle");

    let mut controller = LifecycleController::new(&mut store, ServiceConfig::default());
    controller.close("T1").expect("close");
    assert!(controller.progress("T1").unwrap().visited.is_empty());
}

#[test]
fn report_lists_recent_completions_per_territory() {
    let (_dir, mut store) = open_store();
    seed_territory(&mut store, "T1", "Alfa", 1);
    seed_territory(&mut store, "T2", "Beta", 1);

    for completed in [date!(2023 - 06 - 01), date!(2024 - 01 - 05)] {
        store
            .close_round(CloseRoundRequest {
                territory_id: territory_id("T1"),
                completed_at_ms: date_time_ms(completed, time!(10:30), offset!(UTC)),
                release_responsible: true,
            })
            .expect("close round");
    }

    let controller = LifecycleController::new(&mut store, ServiceConfig::default());
    let rows = controller
        .report(date!(2023 - 01 - 01), date!(2024 - 12 - 31))
        .expect("report");

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].territory_id.as_str(), "T1");
    assert_eq!(rows[0].conclusoes, vec!["05/01/2024", "01/06/2023"]);
    assert_eq!(rows[1].territory_id.as_str(), "T2");
    assert!(rows[1].conclusoes.is_empty());
}

#[test]
fn report_includes_the_whole_end_day_and_caps_at_three() {
    let (_dir, mut store) = open_store();
    seed_territory(&mut store, "T1", "Alfa", 1);
    let stamps = [
        date_time_ms(date!(2024 - 01 - 01), time!(08:00), offset!(UTC)),
        date_time_ms(date!(2024 - 02 - 01), time!(08:00), offset!(UTC)),
        date_time_ms(date!(2024 - 03 - 01), time!(08:00), offset!(UTC)),
        date_time_ms(date!(2024 - 03 - 31), time!(23:59:59.999), offset!(UTC)),
        date_time_ms(date!(2024 - 04 - 01), time!(00:00), offset!(UTC)),
    ];
    for completed_at_ms in stamps {
        store
            .close_round(CloseRoundRequest {
                territory_id: territory_id("T1"),
                completed_at_ms,
                release_responsible: true,
            })
            .expect("close round");
    }

    let controller = LifecycleController::new(&mut store, ServiceConfig::default());
    let rows = controller
        .report(date!(2024 - 01 - 01), date!(2024 - 03 - 31))
        .expect("report");
    assert_eq!(rows[0].conclusoes, vec!["31/03/2024", "01/03/2024", "01/02/2024"]);

    let inverted = controller
        .report(date!(2024 - 03 - 31), date!(2024 - 01 - 01))
        .unwrap_err();
    assert!(matches!(inverted, ServiceError::Validation(_)));
}

#[test]
fn undo_sub_area_drops_its_visit_mark() {
    let (_dir, mut store) = open_store();
    seed_territory(&mut store, "T1", "Alfa", 2);
    VisitTracker::new(&mut store)
        .toggle_visit("T1", 2)
        .expect("toggle");

    let mut controller = LifecycleController::new(&mut store, ServiceConfig::default());
    let removed = controller.undo_sub_area("T1").expect("undo");
    assert_eq!(removed.sub_area_id, 2);
    let progress = controller.progress("T1").unwrap();
    assert!(progress.visited.is_empty());
    assert_eq!(progress.total, 1);

    let added = controller.add_sub_area("T1", 0.9, 0.9).expect("add");
    assert_eq!(added.sub_area_id, 2);
}

#[test]
fn out_of_range_coordinates_fail_validation_before_the_store() {
    let (_dir, mut store) = open_store();
    seed_territory(&mut store, "T1", "Alfa", 1);
    let mut controller = LifecycleController::new(&mut store, ServiceConfig::default());

    let err = controller.add_sub_area("T1", 100.5, 10.0).unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert_eq!(controller.territory("T1").unwrap().layout.len(), 1);

    // Coordinates are checked before the territory lookup.
    let unknown = controller.add_sub_area("T9", f64::NAN, 10.0).unwrap_err();
    assert!(matches!(unknown, ServiceError::Validation(_)));
}
