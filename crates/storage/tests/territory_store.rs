#![forbid(unsafe_code)]

use cm_core::{MemberId, TerritoryId, Toggle};
use cm_storage::{
    AddSubAreaRequest, CloseRoundRequest, CreateTerritoryRequest, ListCompletionsRequest,
    SetResponsibleRequest, SqliteStore, StoreError,
};

fn open_store() -> (tempfile::TempDir, SqliteStore) {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = SqliteStore::open(dir.path()).expect("open store");
    (dir, store)
}

fn territory_id(raw: &str) -> TerritoryId {
    TerritoryId::try_new(raw).expect("territory id")
}

fn seed_territory(store: &mut SqliteStore, raw_id: &str, name: &str, areas: usize) -> TerritoryId {
    let id = territory_id(raw_id);
    store
        .create_territory(CreateTerritoryRequest {
            territory_id: id.clone(),
            name: name.to_string(),
            reference: "Rua das Flores".to_string(),
            map_image_ref: format!("maps/{raw_id}.png"),
            created_at_ms: 1_000,
        })
        .expect("create territory");
    for index in 0..areas {
        store
            .add_sub_area(AddSubAreaRequest {
                territory_id: id.clone(),
                x: 10.0 * index as f64,
                y: 5.0,
                updated_at_ms: 1_001,
            })
            .expect("add sub-area");
    }
    id
}

#[test]
fn create_territory_rejects_duplicates_and_blank_names() {
    let (_dir, mut store) = open_store();
    seed_territory(&mut store, "T1", "Centro", 0);

    let duplicate = store
        .create_territory(CreateTerritoryRequest {
            territory_id: territory_id("T1"),
            name: "Outro".to_string(),
            reference: String::new(),
            map_image_ref: String::new(),
            created_at_ms: 2_000,
        })
        .expect_err("duplicate id must fail");
    assert!(matches!(duplicate, StoreError::AlreadyExists));

    let blank = store
        .create_territory(CreateTerritoryRequest {
            territory_id: territory_id("T2"),
            name: "   ".to_string(),
            reference: String::new(),
            map_image_ref: String::new(),
            created_at_ms: 2_000,
        })
        .expect_err("blank name must fail");
    assert_eq!(blank.code(), "INVALID_INPUT");
}

#[test]
fn layout_authoring_is_append_and_undo_only() {
    let (_dir, mut store) = open_store();
    let id = seed_territory(&mut store, "T1", "Centro", 3);

    let territory = store.get_territory(&id).unwrap().expect("territory");
    let ids: Vec<u32> = territory.layout.iter().map(|a| a.sub_area_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    store.toggle_visit(&id, 3).expect("toggle last");
    let removed = store.undo_sub_area(&id, 2_000).expect("undo");
    assert_eq!(removed.sub_area_id, 3);
    assert!(store.list_visits(&id).unwrap().is_empty());

    let next = store
        .add_sub_area(AddSubAreaRequest {
            territory_id: id.clone(),
            x: 99.0,
            y: 99.0,
            updated_at_ms: 2_001,
        })
        .expect("add after undo");
    assert_eq!(next.sub_area_id, 3);

    let out_of_range = store
        .add_sub_area(AddSubAreaRequest {
            territory_id: id.clone(),
            x: 101.0,
            y: 0.0,
            updated_at_ms: 2_002,
        })
        .expect_err("coordinates outside the map must fail");
    assert_eq!(out_of_range.code(), "INVALID_INPUT");

    let (_dir2, mut empty_store) = open_store();
    let empty = seed_territory(&mut empty_store, "T9", "Vazio", 0);
    assert!(matches!(
        empty_store.undo_sub_area(&empty, 1),
        Err(StoreError::InvalidInput(_))
    ));
}

#[test]
fn toggle_visit_flips_membership_and_validates_layout() {
    let (_dir, mut store) = open_store();
    let id = seed_territory(&mut store, "T1", "Centro", 2);

    let (toggle, visits) = store.toggle_visit(&id, 2).expect("mark");
    assert_eq!(toggle, Toggle::Marked);
    assert!(visits.contains(2));

    let (toggle, visits) = store.toggle_visit(&id, 2).expect("unmark");
    assert_eq!(toggle, Toggle::Unmarked);
    assert!(visits.is_empty());

    assert!(matches!(
        store.toggle_visit(&id, 7),
        Err(StoreError::InvalidInput(_))
    ));
    assert!(matches!(
        store.toggle_visit(&territory_id("missing"), 1),
        Err(StoreError::UnknownId)
    ));
}

#[test]
fn close_round_archives_and_clears_visits_atomically() {
    let (_dir, mut store) = open_store();
    let id = seed_territory(&mut store, "T1", "Centro", 2);
    let other = seed_territory(&mut store, "T2", "Norte", 1);
    store
        .set_responsible(SetResponsibleRequest {
            territory_id: id.clone(),
            member_id: Some(MemberId::try_new("M1").unwrap()),
            expected_revision: None,
            updated_at_ms: 1_500,
        })
        .expect("assign");
    store.toggle_visit(&id, 1).unwrap();
    store.toggle_visit(&id, 2).unwrap();
    store.toggle_visit(&other, 1).unwrap();

    let record = store
        .close_round(CloseRoundRequest {
            territory_id: id.clone(),
            completed_at_ms: 5_000,
            release_responsible: true,
        })
        .expect("close");
    assert_eq!(record.completed_at_ms, 5_000);

    assert!(store.list_visits(&id).unwrap().is_empty());
    assert_eq!(store.list_visits(&other).unwrap().len(), 1);
    let territory = store.get_territory(&id).unwrap().unwrap();
    assert_eq!(territory.responsible_member_id, None);

    let completions = store
        .list_completions(ListCompletionsRequest {
            territory_id: Some(id.clone()),
            from_ms: 0,
            to_ms: i64::MAX,
        })
        .unwrap();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].seq, record.seq);

    let missing = store.close_round(CloseRoundRequest {
        territory_id: territory_id("missing"),
        completed_at_ms: 6_000,
        release_responsible: true,
    });
    assert!(matches!(missing, Err(StoreError::UnknownId)));
    let all = store
        .list_completions(ListCompletionsRequest {
            territory_id: None,
            from_ms: 0,
            to_ms: i64::MAX,
        })
        .unwrap();
    assert_eq!(all.len(), 1);
}

fn install_trigger(store: &SqliteStore, sql: &str) {
    let side = rusqlite::Connection::open(store.db_path()).expect("second connection");
    side.execute_batch(sql).expect("install trigger");
}

fn completion_count(store: &SqliteStore, id: &TerritoryId) -> usize {
    store
        .list_completions(ListCompletionsRequest {
            territory_id: Some(id.clone()),
            from_ms: 0,
            to_ms: i64::MAX,
        })
        .unwrap()
        .len()
}

#[test]
fn close_round_rolls_back_when_clearing_visits_fails() {
    let (_dir, mut store) = open_store();
    let id = seed_territory(&mut store, "T1", "Centro", 2);
    store.toggle_visit(&id, 1).unwrap();
    let before = store.get_territory(&id).unwrap().unwrap();
    install_trigger(
        &store,
        "CREATE TRIGGER block_visit_wipe BEFORE DELETE ON active_visits \
         BEGIN SELECT RAISE(ABORT, 'visit wipe blocked'); END;",
    );

    let result = store.close_round(CloseRoundRequest {
        territory_id: id.clone(),
        completed_at_ms: 5_000,
        release_responsible: true,
    });
    assert!(matches!(result, Err(StoreError::Sql(_))));

    assert_eq!(completion_count(&store, &id), 0);
    assert_eq!(store.list_visits(&id).unwrap().iter().collect::<Vec<_>>(), vec![1]);
    assert_eq!(store.get_territory(&id).unwrap().unwrap().revision, before.revision);
}

#[test]
fn close_round_rolls_back_when_release_fails() {
    let (_dir, mut store) = open_store();
    let id = seed_territory(&mut store, "T1", "Centro", 2);
    store
        .set_responsible(SetResponsibleRequest {
            territory_id: id.clone(),
            member_id: Some(MemberId::try_new("M1").unwrap()),
            expected_revision: None,
            updated_at_ms: 1_500,
        })
        .expect("assign");
    store.toggle_visit(&id, 1).unwrap();
    store.toggle_visit(&id, 2).unwrap();
    let before = store.get_territory(&id).unwrap().unwrap();
    install_trigger(
        &store,
        "CREATE TRIGGER block_release BEFORE UPDATE OF responsible_member_id ON territories \
         WHEN NEW.responsible_member_id IS NULL \
         BEGIN SELECT RAISE(ABORT, 'release blocked'); END;",
    );

    let result = store.close_round(CloseRoundRequest {
        territory_id: id.clone(),
        completed_at_ms: 5_000,
        release_responsible: true,
    });
    assert!(matches!(result, Err(StoreError::Sql(_))));

    assert_eq!(completion_count(&store, &id), 0);
    assert_eq!(store.list_visits(&id).unwrap().len(), 2);
    let after = store.get_territory(&id).unwrap().unwrap();
    assert_eq!(after.responsible_member_id.as_ref().map(|m| m.as_str()), Some("M1"));
    assert_eq!(after.revision, before.revision);
}

#[test]
fn close_round_can_keep_the_responsible_member() {
    let (_dir, mut store) = open_store();
    let id = seed_territory(&mut store, "T1", "Centro", 1);
    store
        .set_responsible(SetResponsibleRequest {
            territory_id: id.clone(),
            member_id: Some(MemberId::try_new("M1").unwrap()),
            expected_revision: None,
            updated_at_ms: 1_500,
        })
        .unwrap();

    store
        .close_round(CloseRoundRequest {
            territory_id: id.clone(),
            completed_at_ms: 5_000,
            release_responsible: false,
        })
        .unwrap();
    let territory = store.get_territory(&id).unwrap().unwrap();
    assert_eq!(
        territory.responsible_member_id.as_ref().map(|m| m.as_str()),
        Some("M1")
    );
}

#[test]
fn completions_are_filtered_by_range_and_newest_first() {
    let (_dir, mut store) = open_store();
    let id = seed_territory(&mut store, "T1", "Centro", 1);
    for at in [100, 300, 200, 900] {
        store
            .close_round(CloseRoundRequest {
                territory_id: id.clone(),
                completed_at_ms: at,
                release_responsible: true,
            })
            .unwrap();
    }

    let completions = store
        .list_completions(ListCompletionsRequest {
            territory_id: Some(id.clone()),
            from_ms: 150,
            to_ms: 300,
        })
        .unwrap();
    let stamps: Vec<i64> = completions.iter().map(|c| c.completed_at_ms).collect();
    assert_eq!(stamps, vec![300, 200]);

    assert!(matches!(
        store.list_completions(ListCompletionsRequest {
            territory_id: None,
            from_ms: 10,
            to_ms: 1,
        }),
        Err(StoreError::InvalidInput(_))
    ));
}

#[test]
fn set_responsible_honours_expected_revision() {
    let (_dir, mut store) = open_store();
    let id = seed_territory(&mut store, "T1", "Centro", 0);
    let territory = store.get_territory(&id).unwrap().unwrap();

    let updated = store
        .set_responsible(SetResponsibleRequest {
            territory_id: id.clone(),
            member_id: Some(MemberId::try_new("M1").unwrap()),
            expected_revision: Some(territory.revision),
            updated_at_ms: 2_000,
        })
        .expect("matching revision");
    assert_eq!(updated.revision, territory.revision + 1);

    let stale = store
        .set_responsible(SetResponsibleRequest {
            territory_id: id.clone(),
            member_id: Some(MemberId::try_new("M2").unwrap()),
            expected_revision: Some(territory.revision),
            updated_at_ms: 2_001,
        })
        .expect_err("stale revision must fail");
    assert!(matches!(
        stale,
        StoreError::RevisionMismatch { expected, actual } if expected == territory.revision && actual == updated.revision
    ));
}

#[test]
fn list_territories_orders_by_name_and_loads_layouts() {
    let (_dir, mut store) = open_store();
    seed_territory(&mut store, "T2", "Norte", 2);
    seed_territory(&mut store, "T1", "Centro", 1);
    seed_territory(&mut store, "T3", "Alto", 0);

    let territories = store.list_territories().unwrap();
    let names: Vec<&str> = territories.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Alto", "Centro", "Norte"]);
    let sizes: Vec<usize> = territories.iter().map(|t| t.layout.len()).collect();
    assert_eq!(sizes, vec![0, 1, 2]);
}
