//! Grid skeletons for the day, week and month calendar views.
//!
//! A skeleton is the empty structure a view renders before any appointment
//! is placed in it: the ordered day columns, the hour rows for time-based
//! views, and the padded week rows for the month view.

use std::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate, Weekday};
use chrono_tz::Tz;
use tracing::debug;

use crate::bucket::CellKey;
use crate::datetime::{
    add_days, end_of_week, first_day_of_month, last_day_of_month, start_of_week,
    viewer_timezone,
};
use crate::error::{LayoutError, check_hour_range};

pub const DEFAULT_START_HOUR: u32 = 7;
pub const DEFAULT_END_HOUR: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridView {
    Day,
    Week,
    Month,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridOptions {
    pub start_hour: u32,
    pub end_hour: u32,
    pub week_start: Weekday,
    pub timezone: Tz,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            start_hour: DEFAULT_START_HOUR,
            end_hour: DEFAULT_END_HOUR,
            week_start: Weekday::Mon,
            timezone: viewer_timezone(),
        }
    }
}

impl GridOptions {
    pub fn with_timezone(timezone: Tz) -> Self {
        Self {
            timezone,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthCell {
    pub date: NaiveDate,
    pub is_current_month: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSkeleton {
    pub view: GridView,
    pub timezone: Tz,
    pub start_hour: u32,
    pub end_hour: u32,
    /// Day columns in ascending order. For month grids this is every padded day.
    pub columns: Vec<NaiveDate>,
    /// Hour rows; empty for month grids.
    pub hours: Vec<u32>,
    /// Week rows of seven cells; empty for day and week grids.
    pub weeks: Vec<Vec<MonthCell>>,
}

impl GridSkeleton {
    pub fn first_day(&self) -> Option<NaiveDate> {
        self.columns.first().copied()
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.columns.last().copied()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        match (self.first_day(), self.last_day()) {
            (Some(first), Some(last)) => first <= date && date <= last,
            _ => false,
        }
    }

    pub fn hour_range(&self) -> RangeInclusive<u32> {
        self.start_hour..=self.end_hour
    }

    pub fn is_hourly(&self) -> bool {
        self.view != GridView::Month
    }

    /// Every cell of the grid in render order: row by row for hourly grids,
    /// day by day for month grids.
    pub fn cell_keys(&self) -> Vec<CellKey> {
        if !self.is_hourly() {
            return self.columns.iter().map(|&date| CellKey::day(date)).collect();
        }

        let mut keys = Vec::with_capacity(self.columns.len() * self.hours.len());
        for &hour in &self.hours {
            for &date in &self.columns {
                keys.push(CellKey::hourly(date, hour));
            }
        }
        keys
    }
}

#[tracing::instrument(
    skip(options),
    fields(start_hour = options.start_hour, end_hour = options.end_hour)
)]
pub fn build_grid(
    view: GridView,
    reference_date: NaiveDate,
    options: &GridOptions,
) -> Result<GridSkeleton, LayoutError> {
    check_hour_range(options.start_hour, options.end_hour)?;

    let hours: Vec<u32> = (options.start_hour..=options.end_hour).collect();

    let skeleton = match view {
        GridView::Day => GridSkeleton {
            view,
            timezone: options.timezone,
            start_hour: options.start_hour,
            end_hour: options.end_hour,
            columns: vec![reference_date],
            hours,
            weeks: vec![],
        },
        GridView::Week => {
            let week_start = start_of_week(reference_date, options.week_start);
            GridSkeleton {
                view,
                timezone: options.timezone,
                start_hour: options.start_hour,
                end_hour: options.end_hour,
                columns: (0..7).map(|offset| add_days(week_start, offset)).collect(),
                hours,
                weeks: vec![],
            }
        }
        GridView::Month => {
            let (columns, weeks) = month_weeks(reference_date, options.week_start);
            GridSkeleton {
                view,
                timezone: options.timezone,
                start_hour: options.start_hour,
                end_hour: options.end_hour,
                columns,
                hours: vec![],
                weeks,
            }
        }
    };

    debug!(
        ?view,
        %reference_date,
        columns = skeleton.columns.len(),
        rows = skeleton.hours.len().max(skeleton.weeks.len()),
        "built grid skeleton"
    );
    Ok(skeleton)
}

fn month_weeks(
    reference_date: NaiveDate,
    week_start: Weekday,
) -> (Vec<NaiveDate>, Vec<Vec<MonthCell>>) {
    let first = first_day_of_month(reference_date.year(), reference_date.month());
    let last = last_day_of_month(reference_date.year(), reference_date.month());
    let grid_start = start_of_week(first, week_start);
    let grid_end = end_of_week(last, week_start);

    let mut columns = Vec::new();
    let mut day = grid_start;
    while day <= grid_end {
        columns.push(day);
        day = add_days(day, 1);
    }

    let weeks = columns
        .chunks(7)
        .map(|week| {
            week.iter()
                .map(|&date| MonthCell {
                    date,
                    is_current_month: date.month() == reference_date.month()
                        && date.year() == reference_date.year(),
                })
                .collect()
        })
        .collect();

    (columns, weeks)
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Duration, NaiveDate, Weekday};

    use super::{GridOptions, GridView, build_grid};
    use crate::error::LayoutError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn options() -> GridOptions {
        GridOptions::with_timezone(chrono_tz::UTC)
    }

    #[test]
    fn day_grid_has_single_column_and_inclusive_hours() {
        let grid = build_grid(GridView::Day, date(2024, 3, 14), &options()).expect("day grid");
        assert_eq!(grid.columns, vec![date(2024, 3, 14)]);
        assert_eq!(grid.hours.first(), Some(&7));
        assert_eq!(grid.hours.last(), Some(&20));
        assert_eq!(grid.hours.len(), 14);
        assert!(grid.weeks.is_empty());
    }

    #[test]
    fn week_grid_always_has_seven_ascending_days_from_monday() {
        let monday = date(2024, 3, 11);
        for offset in 0..7 {
            let reference = monday + Duration::days(offset);
            let grid = build_grid(GridView::Week, reference, &options()).expect("week grid");
            assert_eq!(grid.columns.len(), 7);
            assert_eq!(grid.columns[0], monday);
            assert_eq!(grid.columns[0].weekday(), Weekday::Mon);
            assert!(grid.columns.windows(2).all(|pair| pair[0] < pair[1]));
        }
    }

    #[test]
    fn month_grid_pads_to_whole_weeks() {
        let grid = build_grid(GridView::Month, date(2024, 2, 15), &options()).expect("month grid");
        assert_eq!(grid.first_day(), Some(date(2024, 1, 29)));
        assert_eq!(grid.last_day(), Some(date(2024, 3, 3)));
        assert_eq!(grid.columns.len() % 7, 0);
        assert_eq!(grid.weeks.len(), 5);
        assert!(grid.weeks.iter().all(|week| week.len() == 7));
        assert!(grid.hours.is_empty());

        let current: Vec<_> = grid
            .weeks
            .iter()
            .flatten()
            .filter(|cell| cell.is_current_month)
            .map(|cell| cell.date)
            .collect();
        assert_eq!(current.len(), 29);
        assert_eq!(current.first(), Some(&date(2024, 2, 1)));
        assert_eq!(current.last(), Some(&date(2024, 2, 29)));
    }

    #[test]
    fn month_grid_columns_are_unique_and_ascending_across_a_year() {
        for month in 1..=12 {
            let grid =
                build_grid(GridView::Month, date(2025, month, 10), &options()).expect("grid");
            assert!(grid.columns.windows(2).all(|pair| pair[0] < pair[1]));
            assert_eq!(grid.columns.len() % 7, 0);
            assert_eq!(grid.columns[0].weekday(), Weekday::Mon);
        }
    }

    #[test]
    fn month_starting_on_monday_has_no_leading_padding() {
        let grid = build_grid(GridView::Month, date(2024, 4, 20), &options()).expect("grid");
        assert_eq!(grid.first_day(), Some(date(2024, 4, 1)));
        assert_eq!(grid.last_day(), Some(date(2024, 5, 5)));
    }

    #[test]
    fn inverted_hour_range_is_rejected() {
        let opts = GridOptions {
            start_hour: 18,
            end_hour: 9,
            ..options()
        };
        let err = build_grid(GridView::Week, date(2024, 3, 14), &opts).expect_err("must fail");
        assert_eq!(
            err,
            LayoutError::InvalidRange {
                start_hour: 18,
                end_hour: 9
            }
        );
    }

    #[test]
    fn single_hour_range_is_valid() {
        let opts = GridOptions {
            start_hour: 9,
            end_hour: 9,
            ..options()
        };
        let grid = build_grid(GridView::Day, date(2024, 3, 14), &opts).expect("grid");
        assert_eq!(grid.hours, vec![9]);
    }

    #[test]
    fn cell_keys_cover_every_hour_and_day() {
        let grid = build_grid(GridView::Week, date(2024, 3, 14), &options()).expect("grid");
        let keys = grid.cell_keys();
        assert_eq!(keys.len(), 7 * 14);
        assert_eq!(keys[0].hour, Some(7));
        assert_eq!(keys[0].date, date(2024, 3, 11));
    }
}
