use thiserror::Error;

/// Configuration defects detected while laying out a calendar.
///
/// These are never corrected silently; callers propagate them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error(
        "invalid hour range: start hour {start_hour} is after end hour {end_hour}"
    )]
    InvalidRange { start_hour: u32, end_hour: u32 },

    #[error("hour {hour} is outside 0..=23")]
    HourOutOfBounds { hour: u32 },
}

pub fn check_hour_range(
    start_hour: u32,
    end_hour: u32,
) -> Result<(), LayoutError> {
    for hour in [start_hour, end_hour] {
        if hour > 23 {
            return Err(LayoutError::HourOutOfBounds { hour });
        }
    }
    if start_hour > end_hour {
        return Err(LayoutError::InvalidRange {
            start_hour,
            end_hour,
        });
    }
    Ok(())
}
