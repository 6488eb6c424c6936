use std::fs;

use agenda_core::bucket::CellKey;
use agenda_core::grid::{GridOptions, GridView, build_grid};
use agenda_core::layout::{LayoutConfig, compute_layout};
use agenda_core::navigation::{ViewMode, ViewState, next, previous};
use agenda_core::source::load_appointments;
use agenda_core::stack::MaxVisible;
use chrono::{NaiveDate, TimeZone, Utc};
use tempfile::tempdir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn record(id: u32, start: &str, end: &str, status: &str, name: &str) -> String {
    format!(
        r#"{{"id":"00000000-0000-0000-0000-{id:012}","startAt":"{start}","endAt":"{end}","status":"{status}","type":"in_person","patient":{{"name":"{name}"}}}}"#
    )
}

#[test]
fn loaded_appointments_stack_in_one_hour_cell() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("appointments.jsonl");
    let lines = [
        record(1, "2024-03-14T09:00:00Z", "2024-03-14T09:30:00Z", "confirmed", "Ana"),
        record(2, "2024-03-14T09:15:00Z", "2024-03-14T09:45:00Z", "pending", "Luis"),
        record(3, "2024-03-14T09:45:00Z", "2024-03-14T10:15:00Z", "confirmed", "Marta"),
        record(4, "2024-03-14T21:00:00Z", "2024-03-14T21:30:00Z", "confirmed", "Late"),
        record(5, "2024-03-14T11:00:00Z", "2024-03-14T10:00:00Z", "confirmed", "Broken"),
    ];
    fs::write(&path, lines.join("\n")).expect("write appointments");

    let appointments = load_appointments(&path).expect("load appointments");
    assert_eq!(appointments.len(), 5);

    let config = LayoutConfig {
        grid: GridOptions::with_timezone(chrono_tz::UTC),
        max_visible: MaxVisible {
            day: 2,
            week: 2,
            month: 2,
        },
    };
    let now = Utc
        .with_ymd_and_hms(2024, 3, 14, 8, 15, 0)
        .single()
        .expect("valid now");

    let state = ViewState::new(date(2024, 3, 14), ViewMode::Week);
    let layout = compute_layout(&appointments, &state, &config, now).expect("week layout");

    let key = CellKey::hourly(date(2024, 3, 14), 9);
    let cell = layout.cell(&key).expect("nine o'clock cell");
    let names: Vec<&str> = cell.visible.iter().map(|apt| apt.patient_name()).collect();
    assert_eq!(names, vec!["Ana", "Luis"]);
    assert_eq!(cell.hidden_count, 1);
    assert_eq!(layout.cells.len(), 1, "late and malformed records are not placed");

    let indicator = layout.indicator.expect("indicator in the current week");
    assert_eq!(indicator.column, 3);
    assert_eq!(indicator.offset, 1.25);

    let mut expanded = state.clone();
    expanded.expanded.expand(key);
    let layout = compute_layout(&appointments, &expanded, &config, now).expect("expanded layout");
    let cell = layout.cell(&key).expect("cell");
    assert_eq!(cell.visible.len(), 3);
    assert_eq!(cell.hidden_count, 0);

    let moved = expanded.with_next();
    assert_eq!(moved.reference_date, date(2024, 3, 21));
    assert!(moved.expanded.is_empty());
    let layout = compute_layout(&appointments, &moved, &config, now).expect("next week");
    assert!(layout.cells.is_empty());
    assert!(layout.indicator.is_none());
}

#[test]
fn navigation_and_month_bounds() {
    let reference = date(2024, 3, 14);
    assert_eq!(next(ViewMode::Week, reference), date(2024, 3, 21));
    assert_eq!(previous(ViewMode::Day, reference), date(2024, 3, 13));
    assert_eq!(next(ViewMode::Month, date(2024, 1, 31)), date(2024, 2, 29));
    assert_eq!(next(ViewMode::List, reference), reference);

    let grid = build_grid(
        GridView::Month,
        date(2024, 2, 15),
        &GridOptions::with_timezone(chrono_tz::UTC),
    )
    .expect("month grid");
    assert_eq!(grid.first_day(), Some(date(2024, 1, 29)));
    assert_eq!(grid.last_day(), Some(date(2024, 3, 3)));
    assert_eq!(grid.weeks.len(), 5);
    assert!(grid.weeks.iter().all(|week| week.len() == 7));
}
