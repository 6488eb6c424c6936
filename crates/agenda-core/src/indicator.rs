use chrono::{NaiveDate, Timelike};

use crate::grid::GridSkeleton;

/// Fractional hour position of `now` inside `[start_hour, end_hour]`.
///
/// Multiply by the per-hour row height to get a pixel offset. Returns `None`
/// when the current hour is not rendered. Nothing is cached; call again on
/// every tick.
pub fn current_time_offset<T: Timelike>(
    now: &T,
    start_hour: u32,
    end_hour: u32,
) -> Option<f64> {
    let hour = now.hour();
    if hour < start_hour || hour > end_hour {
        return None;
    }
    Some(f64::from(hour - start_hour) + f64::from(now.minute()) / 60.0)
}

/// Index of the day column the indicator is drawn in.
pub fn indicator_column(today: NaiveDate, grid: &GridSkeleton) -> Option<usize> {
    if !grid.is_hourly() {
        return None;
    }
    grid.columns.iter().position(|&date| date == today)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::{current_time_offset, indicator_column};
    use crate::grid::{GridOptions, GridView, build_grid};

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    #[test]
    fn outside_range_has_no_indicator() {
        assert_eq!(current_time_offset(&time(6, 59), 7, 20), None);
        assert_eq!(current_time_offset(&time(21, 0), 7, 20), None);
    }

    #[test]
    fn offset_is_fractional_hours_since_start() {
        assert_eq!(current_time_offset(&time(7, 0), 7, 20), Some(0.0));
        assert_eq!(current_time_offset(&time(9, 30), 7, 20), Some(2.5));
        assert_eq!(current_time_offset(&time(20, 0), 7, 20), Some(13.0));
    }

    #[test]
    fn offset_stays_within_visible_rows() {
        for hour in 7..=20 {
            for minute in [0, 15, 59] {
                let offset = current_time_offset(&time(hour, minute), 7, 20)
                    .expect("in range");
                assert!(offset >= 0.0);
                assert!(offset < 14.0);
                assert_eq!(offset.floor() as u32, hour - 7);
            }
        }
    }

    #[test]
    fn column_only_for_hourly_grids_showing_today() {
        let options = GridOptions::with_timezone(chrono_tz::UTC);
        let thursday = NaiveDate::from_ymd_opt(2024, 3, 14).expect("date");
        let week = build_grid(GridView::Week, thursday, &options).expect("grid");
        assert_eq!(indicator_column(thursday, &week), Some(3));

        let next_week = NaiveDate::from_ymd_opt(2024, 3, 21).expect("date");
        assert_eq!(indicator_column(next_week, &week), None);

        let month = build_grid(GridView::Month, thursday, &options).expect("grid");
        assert_eq!(indicator_column(thursday, &month), None);
    }
}
