use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};
use tracing::debug;

use crate::appointment::{Appointment, AppointmentStatus, AppointmentType};
use crate::datetime::{
    add_days, end_of_week, first_day_of_month, last_day_of_month, shift_months, start_of_week,
};
use crate::grid::GridView;
use crate::stack::ExpandedCells;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ViewMode {
    Day,
    #[default]
    Week,
    Month,
    List,
}

impl ViewMode {
    pub fn as_key(self) -> &'static str {
        match self {
            ViewMode::Day => "day",
            ViewMode::Week => "week",
            ViewMode::Month => "month",
            ViewMode::List => "list",
        }
    }

    pub fn from_key(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "day" => Some(ViewMode::Day),
            "week" => Some(ViewMode::Week),
            "month" => Some(ViewMode::Month),
            "list" => Some(ViewMode::List),
            _ => None,
        }
    }

    pub fn grid_view(self) -> Option<GridView> {
        match self {
            ViewMode::Day => Some(GridView::Day),
            ViewMode::Week => Some(GridView::Week),
            ViewMode::Month => Some(GridView::Month),
            ViewMode::List => None,
        }
    }
}

pub fn next(view: ViewMode, reference_date: NaiveDate) -> NaiveDate {
    step(view, reference_date, 1)
}

pub fn previous(view: ViewMode, reference_date: NaiveDate) -> NaiveDate {
    step(view, reference_date, -1)
}

fn step(view: ViewMode, reference_date: NaiveDate, direction: i32) -> NaiveDate {
    match view {
        ViewMode::Day => add_days(reference_date, i64::from(direction)),
        ViewMode::Week => add_days(reference_date, i64::from(direction) * 7),
        ViewMode::Month => shift_months(reference_date, direction),
        ViewMode::List => reference_date,
    }
}

/// Allow-lists applied before bucketizing. An empty set does not restrict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    pub statuses: BTreeSet<AppointmentStatus>,
    pub types: BTreeSet<AppointmentType>,
}

impl FilterSet {
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty() && self.types.is_empty()
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&appointment.status))
            && (self.types.is_empty() || self.types.contains(&appointment.kind))
    }
}

#[tracing::instrument(skip_all, fields(appointments = appointments.len()))]
pub fn apply_filters<'a>(
    appointments: &'a [Appointment],
    filters: &FilterSet,
) -> Vec<&'a Appointment> {
    let kept: Vec<&Appointment> = appointments
        .iter()
        .filter(|appointment| filters.matches(appointment))
        .collect();
    debug!(
        kept = kept.len(),
        statuses = filters.statuses.len(),
        types = filters.types.len(),
        "applied appointment filters"
    );
    kept
}

/// Inclusive date window a view displays. `None` for the list view.
pub fn period_window(
    view: ViewMode,
    reference_date: NaiveDate,
    week_start: Weekday,
) -> Option<(NaiveDate, NaiveDate)> {
    match view {
        ViewMode::Day => Some((reference_date, reference_date)),
        ViewMode::Week => Some((
            start_of_week(reference_date, week_start),
            end_of_week(reference_date, week_start),
        )),
        ViewMode::Month => Some((
            first_day_of_month(reference_date.year(), reference_date.month()),
            last_day_of_month(reference_date.year(), reference_date.month()),
        )),
        ViewMode::List => None,
    }
}

pub fn period_title(view: ViewMode, reference_date: NaiveDate, week_start: Weekday) -> String {
    match view {
        ViewMode::Day => format!("Day View {}", reference_date.format("%A, %Y-%m-%d")),
        ViewMode::Week => {
            let start = start_of_week(reference_date, week_start);
            let end = end_of_week(reference_date, week_start);
            format!(
                "Week View {} - {}",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            )
        }
        ViewMode::Month => format!("Month View {}", reference_date.format("%B %Y")),
        ViewMode::List => "All appointments".to_string(),
    }
}

/// Session-local calendar state. The owning UI keeps it and feeds it back in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub reference_date: NaiveDate,
    pub active_view: ViewMode,
    pub filters: FilterSet,
    pub expanded: ExpandedCells,
}

impl ViewState {
    pub fn new(reference_date: NaiveDate, active_view: ViewMode) -> Self {
        Self {
            reference_date,
            active_view,
            filters: FilterSet::default(),
            expanded: ExpandedCells::default(),
        }
    }

    #[must_use]
    pub fn with_next(&self) -> Self {
        self.moved_to(next(self.active_view, self.reference_date))
    }

    #[must_use]
    pub fn with_previous(&self) -> Self {
        self.moved_to(previous(self.active_view, self.reference_date))
    }

    #[must_use]
    pub fn with_today(&self, today: NaiveDate) -> Self {
        self.moved_to(today)
    }

    #[must_use]
    pub fn with_view(&self, view: ViewMode) -> Self {
        Self {
            active_view: view,
            expanded: ExpandedCells::default(),
            ..self.clone()
        }
    }

    /// Opens the day view for a clicked month cell.
    #[must_use]
    pub fn drill_into_day(&self, date: NaiveDate) -> Self {
        Self {
            reference_date: date,
            active_view: ViewMode::Day,
            expanded: ExpandedCells::default(),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_filters(&self, filters: FilterSet) -> Self {
        Self {
            filters,
            ..self.clone()
        }
    }

    fn moved_to(&self, reference_date: NaiveDate) -> Self {
        if reference_date == self.reference_date {
            return self.clone();
        }
        Self {
            reference_date,
            expanded: ExpandedCells::default(),
            ..self.clone()
        }
    }
}
