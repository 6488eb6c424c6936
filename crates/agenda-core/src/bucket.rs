use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use tracing::{debug, trace};

use crate::appointment::Appointment;
use crate::grid::GridSkeleton;

/// Identity of one grid cell: a day, or a day plus an hour slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    pub date: NaiveDate,
    pub hour: Option<u32>,
}

impl CellKey {
    pub fn day(date: NaiveDate) -> Self {
        Self { date, hour: None }
    }

    pub fn hourly(date: NaiveDate, hour: u32) -> Self {
        Self {
            date,
            hour: Some(hour),
        }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.hour {
            Some(hour) => write!(f, "{}T{hour:02}", self.date.format("%Y-%m-%d")),
            None => write!(f, "{}", self.date.format("%Y-%m-%d")),
        }
    }
}

impl FromStr for CellKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let (date_part, hour_part) = match raw.split_once('T') {
            Some((date, hour)) => (date, Some(hour)),
            None => (raw, None),
        };

        let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .with_context(|| format!("invalid cell date in {raw}"))?;
        let hour = match hour_part {
            Some(hour) => {
                let hour: u32 = hour
                    .parse()
                    .with_context(|| format!("invalid cell hour in {raw}"))?;
                if hour > 23 {
                    return Err(anyhow!("cell hour out of range in {raw}"));
                }
                Some(hour)
            }
            None => None,
        };

        Ok(Self { date, hour })
    }
}

/// Appointments grouped by grid cell, each bucket in chronological order.
#[derive(Debug, Clone, Default)]
pub struct Buckets<'a> {
    cells: BTreeMap<CellKey, Vec<&'a Appointment>>,
}

impl<'a> Buckets<'a> {
    pub fn get(&self, key: &CellKey) -> &[&'a Appointment] {
        self.cells.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellKey, &[&'a Appointment])> {
        self.cells.iter().map(|(key, bucket)| (key, bucket.as_slice()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &CellKey> {
        self.cells.keys()
    }

    /// Number of non-empty cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of appointments placed across every cell.
    pub fn total(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }
}

/// Local date and hour of an appointment's start, or `None` for malformed records.
pub fn local_start(appointment: &Appointment, timezone: Tz) -> Option<(NaiveDate, u32)> {
    let (start, _) = appointment.interval()?;
    let local = start.with_timezone(&timezone);
    Some((local.date_naive(), local.hour()))
}

/// Assigns each appointment to the grid cell of its local start, in one pass.
#[tracing::instrument(skip_all, fields(view = ?grid.view))]
pub fn bucketize<'a, I>(appointments: I, grid: &GridSkeleton) -> Buckets<'a>
where
    I: IntoIterator<Item = &'a Appointment>,
{
    let columns: HashSet<NaiveDate> = grid.columns.iter().copied().collect();
    let hours = grid.hour_range();
    let mut cells: BTreeMap<CellKey, Vec<&'a Appointment>> = BTreeMap::new();
    let mut skipped = 0_usize;

    for appointment in appointments {
        let Some((date, hour)) = local_start(appointment, grid.timezone) else {
            trace!(id = %appointment.id, "skipping appointment without a valid interval");
            skipped += 1;
            continue;
        };

        if !columns.contains(&date) {
            skipped += 1;
            continue;
        }

        let key = if grid.is_hourly() {
            if !hours.contains(&hour) {
                trace!(id = %appointment.id, hour, "appointment starts outside visible hours");
                skipped += 1;
                continue;
            }
            CellKey::hourly(date, hour)
        } else {
            CellKey::day(date)
        };

        cells.entry(key).or_default().push(appointment);
    }

    for bucket in cells.values_mut() {
        bucket.sort_by_key(|appointment| chronological_key(appointment));
    }

    debug!(cells = cells.len(), skipped, "bucketized appointments");
    Buckets { cells }
}

/// Valid appointments per grid column, counted over the whole local day.
///
/// Unlike [`bucketize`] this ignores the visible hour range, so an
/// appointment that starts after the last hour row still shows up in its
/// column's total.
pub fn count_per_column<'a, I>(appointments: I, grid: &GridSkeleton) -> Vec<usize>
where
    I: IntoIterator<Item = &'a Appointment>,
{
    let index: HashMap<NaiveDate, usize> = grid
        .columns
        .iter()
        .enumerate()
        .map(|(idx, &date)| (date, idx))
        .collect();
    let mut counts = vec![0; grid.columns.len()];

    for appointment in appointments {
        if let Some((date, _)) = local_start(appointment, grid.timezone)
            && let Some(&idx) = index.get(&date)
        {
            counts[idx] += 1;
        }
    }

    counts
}

/// Every valid appointment ordered by start time, then id.
pub fn chronological<'a, I>(appointments: I) -> Vec<&'a Appointment>
where
    I: IntoIterator<Item = &'a Appointment>,
{
    let mut ordered: Vec<&'a Appointment> = appointments
        .into_iter()
        .filter(|appointment| appointment.interval().is_some())
        .collect();
    ordered.sort_by_key(|appointment| chronological_key(appointment));
    ordered
}

fn chronological_key(appointment: &Appointment) -> (Option<DateTime<Utc>>, uuid::Uuid) {
    (appointment.start_at, appointment.id)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    use super::{CellKey, bucketize, chronological, count_per_column};
    use crate::appointment::{Appointment, AppointmentStatus, AppointmentType};
    use crate::grid::{GridOptions, GridView, build_grid};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn at(id: u128, y: i32, m: u32, d: u32, h: u32, min: u32) -> Appointment {
        let start = Utc
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .single()
            .expect("valid start");
        Appointment::new(
            Uuid::from_u128(id),
            start,
            start + Duration::minutes(30),
            AppointmentStatus::Confirmed,
            AppointmentType::InPerson,
        )
    }

    fn options() -> GridOptions {
        GridOptions::with_timezone(chrono_tz::UTC)
    }

    #[test]
    fn week_buckets_key_by_date_and_start_hour() {
        let appointments = vec![
            at(1, 2024, 3, 14, 9, 45),
            at(2, 2024, 3, 14, 9, 0),
            at(3, 2024, 3, 14, 9, 15),
            at(4, 2024, 3, 12, 14, 0),
        ];
        let grid = build_grid(GridView::Week, date(2024, 3, 14), &options()).expect("grid");
        let buckets = bucketize(&appointments, &grid);

        assert_eq!(buckets.len(), 2);
        let nine = buckets.get(&CellKey::hourly(date(2024, 3, 14), 9));
        let ids: Vec<u128> = nine.iter().map(|apt| apt.id.as_u128()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(buckets.get(&CellKey::hourly(date(2024, 3, 12), 14)).len(), 1);
    }

    #[test]
    fn out_of_range_hours_are_dropped_from_hourly_grids_only() {
        let appointments = vec![
            at(1, 2024, 3, 14, 6, 30),
            at(2, 2024, 3, 14, 21, 0),
            at(3, 2024, 3, 14, 20, 59),
            at(4, 2024, 3, 14, 7, 0),
        ];

        let day = build_grid(GridView::Day, date(2024, 3, 14), &options()).expect("grid");
        let buckets = bucketize(&appointments, &day);
        assert_eq!(buckets.total(), 2);
        assert!(buckets.get(&CellKey::hourly(date(2024, 3, 14), 6)).is_empty());

        assert_eq!(count_per_column(&appointments, &day), vec![4]);

        let month = build_grid(GridView::Month, date(2024, 3, 14), &options()).expect("grid");
        let buckets = bucketize(&appointments, &month);
        assert_eq!(buckets.total(), 4);
        let ids: Vec<u128> = buckets
            .get(&CellKey::day(date(2024, 3, 14)))
            .iter()
            .map(|apt| apt.id.as_u128())
            .collect();
        assert_eq!(ids, vec![1, 4, 3, 2]);
    }

    #[test]
    fn ties_break_by_id() {
        let appointments = vec![
            at(9, 2024, 3, 14, 10, 0),
            at(3, 2024, 3, 14, 10, 0),
            at(5, 2024, 3, 14, 10, 0),
        ];
        let grid = build_grid(GridView::Day, date(2024, 3, 14), &options()).expect("grid");
        let buckets = bucketize(&appointments, &grid);
        let ids: Vec<u128> = buckets
            .get(&CellKey::hourly(date(2024, 3, 14), 10))
            .iter()
            .map(|apt| apt.id.as_u128())
            .collect();
        assert_eq!(ids, vec![3, 5, 9]);
    }

    #[test]
    fn every_in_range_appointment_lands_in_exactly_one_bucket() {
        let appointments: Vec<Appointment> = (0..40_u32)
            .map(|i| at(u128::from(i), 2024, 3, 11 + i % 7, 5 + i % 18, (i * 7) % 60))
            .collect();
        let grid = build_grid(GridView::Week, date(2024, 3, 14), &options()).expect("grid");
        let buckets = bucketize(&appointments, &grid);

        let expected = appointments
            .iter()
            .filter(|apt| {
                let hour = apt.start_at.map(|start| start.format("%H").to_string());
                hour.and_then(|h| h.parse::<u32>().ok())
                    .is_some_and(|h| (7..=20).contains(&h))
            })
            .count();
        assert_eq!(buckets.total(), expected);

        let mut seen: Vec<Uuid> = buckets
            .iter()
            .flat_map(|(_, bucket)| bucket.iter().map(|apt| apt.id))
            .collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), expected);
    }

    #[test]
    fn malformed_and_out_of_grid_records_are_skipped() {
        let mut inverted = at(1, 2024, 3, 14, 9, 0);
        inverted.end_at = inverted.start_at.map(|start| start - Duration::minutes(5));
        let mut missing = at(2, 2024, 3, 14, 9, 0);
        missing.start_at = None;
        let next_week = at(3, 2024, 3, 19, 9, 0);

        let appointments = vec![inverted, missing, next_week];
        let grid = build_grid(GridView::Week, date(2024, 3, 14), &options()).expect("grid");
        assert!(bucketize(&appointments, &grid).is_empty());
    }

    #[test]
    fn buckets_use_grid_timezone() {
        // 02:30 UTC on the 15th is 22:30 on the 14th in Caracas (UTC-4).
        let appointments = vec![at(1, 2024, 3, 15, 2, 30)];
        let caracas = GridOptions {
            end_hour: 23,
            ..GridOptions::with_timezone(chrono_tz::America::Caracas)
        };
        let grid = build_grid(GridView::Day, date(2024, 3, 14), &caracas).expect("grid");
        let buckets = bucketize(&appointments, &grid);
        assert_eq!(buckets.get(&CellKey::hourly(date(2024, 3, 14), 22)).len(), 1);
    }

    #[test]
    fn chronological_lists_all_valid_appointments() {
        let mut broken = at(7, 2024, 3, 1, 9, 0);
        broken.end_at = None;
        let appointments = vec![
            at(2, 2024, 3, 20, 22, 0),
            broken,
            at(1, 2024, 3, 1, 5, 0),
        ];
        let ids: Vec<u128> = chronological(&appointments)
            .iter()
            .map(|apt| apt.id.as_u128())
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn cell_key_round_trips_through_display() {
        let hourly = CellKey::hourly(date(2024, 3, 14), 9);
        assert_eq!(hourly.to_string(), "2024-03-14T09");
        assert_eq!("2024-03-14T09".parse::<CellKey>().expect("parse"), hourly);
        assert_eq!(
            "2024-03-14".parse::<CellKey>().expect("parse"),
            CellKey::day(date(2024, 3, 14))
        );
        assert!("2024-03-14T25".parse::<CellKey>().is_err());
    }
}
