use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, info};

use crate::appointment::Appointment;

/// Reads appointments exported by the data layer.
///
/// Accepts either a JSON array or one JSON object per line.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_appointments(path: &Path) -> anyhow::Result<Vec<Appointment>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let appointments = if text.trim_start().starts_with('[') {
        serde_json::from_str::<Vec<Appointment>>(&text)
            .with_context(|| format!("invalid appointment array in {}", path.display()))?
    } else {
        parse_jsonl(&text, path)?
    };

    let malformed = appointments
        .iter()
        .filter(|appointment| appointment.interval().is_none())
        .count();
    info!(
        count = appointments.len(),
        malformed,
        "loaded appointments"
    );
    Ok(appointments)
}

fn parse_jsonl(text: &str, path: &Path) -> anyhow::Result<Vec<Appointment>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let appointment: Appointment = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid JSON at {}:{}", path.display(), idx + 1))?;
        out.push(appointment);
    }

    debug!(count = out.len(), "parsed json lines");
    Ok(out)
}
