//! One render pass over the calendar: filter, build the grid, bucket,
//! resolve overlap stacks and place the current-time indicator.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::appointment::Appointment;
use crate::bucket::{CellKey, bucketize, chronological, count_per_column};
use crate::error::LayoutError;
use crate::grid::{GridOptions, GridSkeleton, build_grid};
use crate::indicator::{current_time_offset, indicator_column};
use crate::navigation::{ViewMode, ViewState, apply_filters, period_title, period_window};
use crate::stack::{MaxVisible, resolve_stack};
use crate::stats::{PeriodStats, summarize};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LayoutConfig {
    pub grid: GridOptions,
    pub max_visible: MaxVisible,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellLayout<'a> {
    pub key: CellKey,
    pub visible: Vec<&'a Appointment>,
    pub hidden_count: usize,
    pub expanded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Indicator {
    pub column: usize,
    /// Fractional hours below the first hour row.
    pub offset: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarLayout<'a> {
    pub view: ViewMode,
    pub title: String,
    pub timezone: Tz,
    pub grid: Option<GridSkeleton>,
    /// Whole-day appointment count per grid column, including appointments
    /// outside the visible hours. Empty for the list view.
    pub day_counts: Vec<usize>,
    pub cells: Vec<CellLayout<'a>>,
    pub list: Vec<&'a Appointment>,
    pub indicator: Option<Indicator>,
    pub stats: PeriodStats,
}

impl<'a> CalendarLayout<'a> {
    pub fn cell(&self, key: &CellKey) -> Option<&CellLayout<'a>> {
        self.cells.iter().find(|cell| &cell.key == key)
    }

    pub fn hidden_total(&self) -> usize {
        self.cells.iter().map(|cell| cell.hidden_count).sum()
    }
}

#[tracing::instrument(
    skip_all,
    fields(view = ?state.active_view, reference = %state.reference_date)
)]
pub fn compute_layout<'a>(
    appointments: &'a [Appointment],
    state: &ViewState,
    config: &LayoutConfig,
    now: DateTime<Utc>,
) -> Result<CalendarLayout<'a>, LayoutError> {
    let options = &config.grid;
    let view = state.active_view;
    let title = period_title(view, state.reference_date, options.week_start);

    let filtered = apply_filters(appointments, &state.filters);
    let window = period_window(view, state.reference_date, options.week_start);
    let stats = summarize(filtered.iter().copied(), window, options.timezone);

    let Some(grid_view) = view.grid_view() else {
        let list = chronological(filtered);
        debug!(entries = list.len(), "computed list layout");
        return Ok(CalendarLayout {
            view,
            title,
            timezone: options.timezone,
            grid: None,
            day_counts: vec![],
            cells: vec![],
            list,
            indicator: None,
            stats,
        });
    };

    let grid = build_grid(grid_view, state.reference_date, options)?;
    let day_counts = count_per_column(filtered.iter().copied(), &grid);
    let buckets = bucketize(filtered, &grid);
    let max_visible = config.max_visible.for_view(grid_view);

    let cells = buckets
        .iter()
        .map(|(key, bucket)| {
            let expanded = state.expanded.contains(key);
            let resolved = resolve_stack(bucket, max_visible, expanded);
            CellLayout {
                key: *key,
                visible: resolved.visible.to_vec(),
                hidden_count: resolved.hidden_count,
                expanded,
            }
        })
        .collect::<Vec<_>>();

    let local_now = now.with_timezone(&options.timezone);
    let indicator = indicator_column(local_now.date_naive(), &grid).and_then(|column| {
        current_time_offset(&local_now, grid.start_hour, grid.end_hour)
            .map(|offset| Indicator { column, offset })
    });

    debug!(
        cells = cells.len(),
        hidden = cells.iter().map(|cell| cell.hidden_count).sum::<usize>(),
        indicator = indicator.is_some(),
        "computed grid layout"
    );

    Ok(CalendarLayout {
        view,
        title,
        timezone: options.timezone,
        grid: Some(grid),
        day_counts,
        cells,
        list: vec![],
        indicator,
        stats,
    })
}
