use std::collections::BTreeMap;

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::appointment::{Appointment, AppointmentStatus};
use crate::bucket::local_start;

/// Toolbar counters for the displayed period.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodStats {
    pub total: usize,
    pub by_status: BTreeMap<AppointmentStatus, usize>,
}

impl PeriodStats {
    fn push(&mut self, status: AppointmentStatus) {
        self.total += 1;
        *self.by_status.entry(status).or_insert(0) += 1;
    }

    pub fn count(&self, status: AppointmentStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Counts valid appointments whose local start date falls in `window`
/// (inclusive). With no window every valid appointment is counted.
pub fn summarize<'a, I>(
    appointments: I,
    window: Option<(NaiveDate, NaiveDate)>,
    timezone: Tz,
) -> PeriodStats
where
    I: IntoIterator<Item = &'a Appointment>,
{
    let mut stats = PeriodStats::default();

    for appointment in appointments {
        let Some((day, _)) = local_start(appointment, timezone) else {
            continue;
        };
        if let Some((start, end)) = window
            && (day < start || day > end)
        {
            continue;
        }
        stats.push(appointment.status);
    }

    stats
}
