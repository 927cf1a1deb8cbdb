use super::*;
use time::macros::{date, offset, time};

fn member(id: &str) -> MemberId {
    MemberId::try_new(id).expect("member id")
}

fn territory_with(count: usize) -> Territory {
    let mut layout = Vec::new();
    for _ in 0..count {
        let area = next_sub_area(&layout, 10.0, 20.0).expect("sub-area");
        layout.push(area);
    }
    Territory {
        id: TerritoryId::try_new("T1").expect("territory id"),
        name: "Centro".to_string(),
        reference: String::new(),
        map_image_ref: "maps/t1.png".to_string(),
        layout,
        responsible_member_id: None,
        revision: 1,
        created_at_ms: 0,
        updated_at_ms: 0,
    }
}

fn schedule_with_parts(parts: Vec<Part>) -> Schedule {
    Schedule {
        id: ScheduleId::try_new("S1").expect("schedule id"),
        meeting_date: date!(2024 - 01 - 05),
        president_id: None,
        opening_prayer_id: None,
        closing_prayer_id: None,
        parts,
        revision: 1,
    }
}

fn reading_part() -> Part {
    Part {
        part_id: PartId::for_ordinal(1),
        name: "Leitura da Bíblia".to_string(),
        assignee_id: None,
        assistant_id: None,
    }
}

fn legacy_row(seq: i64, description: &str, member_id: &str, recorded_at_ms: i64) -> HistoryEntry {
    HistoryEntry {
        seq,
        schedule_id: ScheduleId::try_new("S1").expect("schedule id"),
        part_description: description.to_string(),
        slot: None,
        member_id: member(member_id),
        recorded_at_ms,
    }
}

#[test]
fn identifier_validation() {
    assert_eq!(MemberId::try_new("").unwrap_err(), IdError::Empty);
    assert_eq!(MemberId::try_new("   ").unwrap_err(), IdError::Empty);
    assert_eq!(
        TerritoryId::try_new("bad\u{0007}id").unwrap_err(),
        IdError::ContainsControl
    );
    assert_eq!(
        PartId::try_new("a:b").unwrap_err(),
        IdError::ContainsSeparator
    );
    assert_eq!(TerritoryId::try_new(" T-12 ").unwrap().as_str(), "T-12");
}

#[test]
fn layout_authoring_assigns_sequential_ids() {
    let territory = territory_with(3);
    let ids: Vec<u32> = territory.layout.iter().map(|a| a.sub_area_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let mut layout = territory.layout.clone();
    layout.pop();
    let next = next_sub_area(&layout, 50.0, 50.0).unwrap();
    assert_eq!(next.sub_area_id, 3);
}

#[test]
fn layout_rejects_out_of_range_coordinates() {
    assert_eq!(
        next_sub_area(&[], 100.5, 1.0).unwrap_err(),
        LayoutError::CoordinateOutOfRange
    );
    assert_eq!(
        next_sub_area(&[], f64::NAN, 1.0).unwrap_err(),
        LayoutError::CoordinateOutOfRange
    );
    assert!(next_sub_area(&[], 0.0, 100.0).is_ok());
}

#[test]
fn toggle_twice_restores_original_set() {
    let mut visits: VisitSet = [2u32, 5].into_iter().collect();
    let original = visits.clone();
    assert_eq!(visits.toggle(3), Toggle::Marked);
    assert_eq!(visits.toggle(3), Toggle::Unmarked);
    assert_eq!(visits, original);
    assert_eq!(visits.toggle(2), Toggle::Unmarked);
    assert_eq!(visits.toggle(2), Toggle::Marked);
    assert_eq!(visits, original);
}

#[test]
fn completion_requires_every_sub_area_and_a_non_empty_layout() {
    let territory = territory_with(2);
    let mut visits = VisitSet::new();
    assert!(!territory.is_complete(&visits));
    visits.toggle(1);
    assert!(!territory.is_complete(&visits));
    visits.toggle(2);
    assert!(territory.is_complete(&visits));

    let empty = territory_with(0);
    assert!(!empty.is_complete(&VisitSet::new()));
    assert!(!empty.is_complete(&visits));
}

#[test]
fn territory_state_follows_assignment_and_completion() {
    let mut territory = territory_with(1);
    let mut visits = VisitSet::new();
    assert_eq!(territory.state(&visits), TerritoryState::Unassigned);

    territory.responsible_member_id = Some(member("M1"));
    assert_eq!(
        territory.state(&visits),
        TerritoryState::InProgress {
            responsible: member("M1")
        }
    );

    visits.toggle(1);
    assert_eq!(territory.state(&visits).as_str(), "complete");
    let progress = TerritoryProgress::of(&territory, &visits);
    assert_eq!(progress.visited, vec![1]);
    assert_eq!(progress.total, 1);
    assert!(progress.complete);
}

#[test]
fn slot_ref_encoding() {
    let slot = SlotRef::PartAssistant(PartId::try_new("p3").unwrap());
    assert_eq!(slot.encode(), "part:p3:assistant");
    assert_eq!(SlotRef::parse("part:p3:assistant").unwrap(), slot);
    assert_eq!(
        SlotRef::parse("role:opening_prayer").unwrap(),
        SlotRef::Role(Role::OpeningPrayer)
    );
    assert_eq!(
        SlotRef::parse("role:host").unwrap_err(),
        SlotRefError::UnknownRole
    );
    assert_eq!(
        SlotRef::parse("part:p3:reader").unwrap_err(),
        SlotRefError::InvalidFormat
    );
    assert_eq!(
        serde_json::to_string(&SlotRef::Role(Role::President)).unwrap(),
        "\"role:president\""
    );
}

#[test]
fn restore_fills_part_assignee_from_description() {
    let schedule = schedule_with_parts(vec![reading_part()]);
    let history = vec![legacy_row(1, "Leitura da Bíblia", "M1", 10)];

    let first = restore_from_history(&schedule, &history);
    assert_eq!(first.filled.len(), 1);
    assert_eq!(first.schedule.parts[0].assignee_id, Some(member("M1")));
    assert!(first.parts_changed());
    assert!(!first.roles_changed());

    let second = restore_from_history(&first.schedule, &history);
    assert!(second.is_noop());
    assert_eq!(second.schedule.parts[0].assignee_id, Some(member("M1")));
}

#[test]
fn restore_fills_assistant_without_touching_assignee() {
    let schedule = schedule_with_parts(vec![reading_part()]);
    let history = vec![legacy_row(1, "Leitura da Bíblia (Ajudante)", "M2", 10)];

    let restoration = restore_from_history(&schedule, &history);
    let part = &restoration.schedule.parts[0];
    assert_eq!(part.assistant_id, Some(member("M2")));
    assert_eq!(part.assignee_id, None);
}

#[test]
fn restore_never_overwrites_present_fields() {
    let mut schedule = schedule_with_parts(vec![]);
    schedule.president_id = Some(member("M9"));
    let history = vec![
        legacy_row(1, "Presidente", "M1", 10),
        legacy_row(2, "Oração Final", "M3", 10),
    ];

    let restoration = restore_from_history(&schedule, &history);
    assert_eq!(restoration.schedule.president_id, Some(member("M9")));
    assert_eq!(restoration.schedule.closing_prayer_id, Some(member("M3")));
    assert_eq!(restoration.schedule.opening_prayer_id, None);
    assert_eq!(restoration.filled.len(), 1);
}

#[test]
fn restore_picks_most_recent_matching_row() {
    let schedule = schedule_with_parts(vec![]);
    let history = vec![
        legacy_row(7, "Presidente", "late-seq", 100),
        legacy_row(3, "Presidente", "latest", 200),
        legacy_row(9, "Presidente", "same-ts-higher-seq", 100),
    ];
    let restoration = restore_from_history(&schedule, &history);
    assert_eq!(restoration.schedule.president_id, Some(member("latest")));

    let tied = vec![
        legacy_row(4, "Presidente", "first", 100),
        legacy_row(5, "Presidente", "second", 100),
    ];
    let restoration = restore_from_history(&schedule, &tied);
    assert_eq!(restoration.schedule.president_id, Some(member("second")));
}

#[test]
fn explicit_slot_rows_match_by_identity_not_name() {
    let mut part = reading_part();
    part.name = "Leitura (renomeada)".to_string();
    let schedule = schedule_with_parts(vec![part]);
    let mut row = legacy_row(1, "Leitura da Bíblia", "M1", 10);
    row.slot = Some(SlotRef::PartAssignee(PartId::for_ordinal(1)));
    let mut stale = legacy_row(2, "Leitura (renomeada)", "M5", 20);
    stale.slot = Some(SlotRef::PartAssistant(PartId::for_ordinal(1)));

    let restoration = restore_from_history(&schedule, &[row, stale]);
    let part = &restoration.schedule.parts[0];
    assert_eq!(part.assignee_id, Some(member("M1")));
    assert_eq!(part.assistant_id, Some(member("M5")));
}

#[test]
fn report_range_is_inclusive_through_end_of_day() {
    let range = ReportRange::new(date!(2023 - 01 - 01), date!(2024 - 12 - 31), offset!(UTC)).unwrap();
    let last_instant = report::date_time_ms(
        date!(2024 - 12 - 31),
        time!(23:59:59.999),
        offset!(UTC),
    );
    assert!(range.contains(last_instant));
    assert!(!range.contains(last_instant + 1));
    assert!(range.contains(range.start_ms));
    assert!(!range.contains(range.start_ms - 1));

    assert_eq!(
        ReportRange::new(date!(2024 - 02 - 01), date!(2024 - 01 - 01), offset!(UTC)).unwrap_err(),
        DateError::EmptyRange
    );
}

#[test]
fn recent_completion_dates_are_capped_and_newest_first() {
    let range = ReportRange::new(date!(2023 - 01 - 01), date!(2024 - 12 - 31), offset!(UTC)).unwrap();
    let at = |d| report::date_time_ms(d, time!(12:00), offset!(UTC));
    let completions = vec![
        at(date!(2023 - 06 - 01)),
        at(date!(2024 - 01 - 05)),
        at(date!(2022 - 12 - 31)),
        at(date!(2023 - 09 - 10)),
        at(date!(2024 - 03 - 02)),
    ];
    assert_eq!(
        recent_completion_dates(&range, &completions),
        vec!["02/03/2024", "05/01/2024", "10/09/2023"]
    );
    assert!(recent_completion_dates(&range, &[]).is_empty());
}

#[test]
fn local_dates_follow_the_report_offset() {
    let brt = parse_offset("-03:00").unwrap();
    let range = ReportRange::new(date!(2024 - 01 - 05), date!(2024 - 01 - 05), brt).unwrap();
    let just_after_midnight_utc = report::date_time_ms(date!(2024 - 01 - 06), time!(01:00), offset!(UTC));
    assert!(range.contains(just_after_midnight_utc));
    assert_eq!(
        recent_completion_dates(&range, &[just_after_midnight_utc]),
        vec!["05/01/2024"]
    );
}

#[test]
fn date_parsing() {
    assert_eq!(parse_date("2024-01-05").unwrap(), date!(2024 - 01 - 05));
    assert_eq!(parse_date("05/01/2024").unwrap_err(), DateError::InvalidDate);
    assert_eq!(parse_offset("utc").unwrap(), offset!(UTC));
    assert_eq!(parse_offset("+02:30").unwrap(), offset!(+02:30));
    assert_eq!(parse_offset("3").unwrap_err(), DateError::InvalidOffset);
    assert_eq!(format_local_date(date!(2023 - 06 - 01)), "01/06/2023");
}

#[test]
fn date_formatting_matches_parsing() {
    let day = date!(2024 - 01 - 05);
    assert_eq!(format_iso_date(day), "2024-01-05");
    assert_eq!(parse_date(&format_iso_date(day)).unwrap(), day);
    assert_eq!(format_local_date(day), "05/01/2024");
    assert_eq!(format_iso_date(date!(0987 - 12 - 31)), "0987-12-31");
    assert_eq!(format_local_date(date!(0987 - 12 - 31)), "31/12/0987");
}

#[test]
fn coordinate_check_is_shared_with_layout_authoring() {
    assert!(check_coordinates(0.0, 100.0).is_ok());
    assert_eq!(
        check_coordinates(-0.1, 50.0).unwrap_err(),
        LayoutError::CoordinateOutOfRange
    );
    assert_eq!(
        check_coordinates(50.0, f64::INFINITY).unwrap_err(),
        LayoutError::CoordinateOutOfRange
    );
}
