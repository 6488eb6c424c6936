use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::Datelike;
use chrono_tz::Tz;
use unicode_width::UnicodeWidthStr;

use crate::appointment::{Appointment, AppointmentStatus};
use crate::bucket::CellKey;
use crate::config::Config;
use crate::grid::GridSkeleton;
use crate::layout::{CalendarLayout, CellLayout};
use crate::stats::PeriodStats;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all, fields(view = ?layout.view))]
    pub fn print_layout(&self, layout: &CalendarLayout<'_>) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        self.write_layout(out, layout)
    }

    pub fn write_layout<W: Write>(
        &self,
        mut out: W,
        layout: &CalendarLayout<'_>,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", layout.title)?;

        match &layout.grid {
            None => self.write_list(&mut out, &layout.list, layout.timezone)?,
            Some(grid) if grid.is_hourly() => self.write_hourly(&mut out, grid, layout)?,
            Some(grid) => self.write_month(&mut out, grid, layout)?,
        }

        if let (Some(grid), Some(indicator)) = (&layout.grid, layout.indicator) {
            let hour = grid.start_hour + indicator.offset.floor() as u32;
            let minute = ((indicator.offset.fract() * 60.0).round() as u32).min(59);
            writeln!(
                out,
                "now: {hour:02}:{minute:02} in column {} ({:.2} rows below {:02}:00)",
                indicator.column + 1,
                indicator.offset,
                grid.start_hour
            )?;
        }

        writeln!(out)?;
        write_stats(&mut out, &layout.stats)?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn print_grid(&self, grid: &GridSkeleton) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        if grid.is_hourly() {
            let days = grid
                .columns
                .iter()
                .map(|date| date.format("%a %Y-%m-%d").to_string())
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(out, "columns: {days}")?;
            writeln!(
                out,
                "hours:   {:02}:00 - {:02}:00 ({} rows)",
                grid.start_hour,
                grid.end_hour,
                grid.hours.len()
            )?;
            return Ok(());
        }

        let headers = weekday_headers(grid);
        let rows = grid
            .weeks
            .iter()
            .map(|week| {
                week.iter()
                    .map(|cell| {
                        let label = format!("{:>2}", cell.date.day());
                        if cell.is_current_month {
                            label
                        } else {
                            self.paint(&label, "2")
                        }
                    })
                    .collect()
            })
            .collect();
        write_table(&mut out, headers, rows)
    }

    #[tracing::instrument(skip_all)]
    pub fn print_stats(&self, title: &str, stats: &PeriodStats) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{title}")?;
        write_stats(&mut out, stats)
    }

    fn write_hourly<W: Write>(
        &self,
        out: &mut W,
        grid: &GridSkeleton,
        layout: &CalendarLayout<'_>,
    ) -> anyhow::Result<()> {
        let mut headers = vec!["Hour".to_string()];
        headers.extend(grid.columns.iter().enumerate().map(|(idx, date)| {
            let count = layout.day_counts.get(idx).copied().unwrap_or(0);
            format!("{} ({count})", date.format("%a %d"))
        }));

        let mut rows = Vec::with_capacity(grid.hours.len());
        for &hour in &grid.hours {
            let mut row = vec![format!("{hour:02}:00")];
            for &date in &grid.columns {
                let cell = layout.cell(&CellKey::hourly(date, hour));
                row.push(self.cell_text(cell, grid.timezone));
            }
            rows.push(row);
        }

        write_table(out, headers, rows)
    }

    fn write_month<W: Write>(
        &self,
        out: &mut W,
        grid: &GridSkeleton,
        layout: &CalendarLayout<'_>,
    ) -> anyhow::Result<()> {
        let headers = weekday_headers(grid);
        let mut rows = Vec::with_capacity(grid.weeks.len());
        for week in &grid.weeks {
            let row = week
                .iter()
                .map(|month_cell| {
                    let cell = layout.cell(&CellKey::day(month_cell.date));
                    let day = format!("{:>2}", month_cell.date.day());
                    let day = if month_cell.is_current_month {
                        day
                    } else {
                        self.paint(&day, "2")
                    };
                    let content = self.cell_text(cell, grid.timezone);
                    if content.is_empty() {
                        day
                    } else {
                        format!("{day} {content}")
                    }
                })
                .collect();
            rows.push(row);
        }
        write_table(out, headers, rows)
    }

    fn write_list<W: Write>(
        &self,
        out: &mut W,
        list: &[&Appointment],
        timezone: Tz,
    ) -> anyhow::Result<()> {
        if list.is_empty() {
            writeln!(out, "No appointments scheduled.")?;
            return Ok(());
        }

        let headers = ["Date", "Time", "Min", "Patient", "Type", "Status"]
            .into_iter()
            .map(str::to_string)
            .collect();
        let rows = list
            .iter()
            .map(|appointment| {
                let local = appointment.start_at.map(|start| start.with_timezone(&timezone));
                vec![
                    local
                        .map(|dt| dt.format("%Y-%m-%d").to_string())
                        .unwrap_or_default(),
                    local
                        .map(|dt| dt.format("%H:%M").to_string())
                        .unwrap_or_default(),
                    appointment
                        .display_duration()
                        .map(|minutes| minutes.to_string())
                        .unwrap_or_default(),
                    self.paint_hex(appointment.patient_name(), appointment.display_color()),
                    appointment.kind.as_key().to_string(),
                    self.status_badge(appointment.status),
                ]
            })
            .collect();
        write_table(out, headers, rows)
    }

    fn cell_text(&self, cell: Option<&CellLayout<'_>>, timezone: Tz) -> String {
        let Some(cell) = cell else {
            return String::new();
        };

        let mut parts = cell
            .visible
            .iter()
            .map(|appointment| {
                let time = appointment
                    .start_at
                    .map(|start| start.with_timezone(&timezone).format("%H:%M").to_string())
                    .unwrap_or_default();
                let label = format!("{time} {}", appointment.patient_name());
                self.paint_hex(&label, appointment.display_color())
            })
            .collect::<Vec<_>>();
        if cell.hidden_count > 0 {
            parts.push(format!("+{} more", cell.hidden_count));
        }
        parts.join("; ")
    }

    fn status_badge(&self, status: AppointmentStatus) -> String {
        self.paint_hex(status.label(), status.color())
    }

    fn paint_hex(&self, text: &str, hex: &str) -> String {
        match parse_hex_color(hex) {
            Some((r, g, b)) => self.paint(text, &format!("38;2;{r};{g};{b}")),
            None => text.to_string(),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn weekday_headers(grid: &GridSkeleton) -> Vec<String> {
    grid.columns
        .iter()
        .take(7)
        .map(|date| date.format("%a").to_string())
        .collect()
}

fn write_stats<W: Write>(out: &mut W, stats: &PeriodStats) -> anyhow::Result<()> {
    write!(out, "total {}", stats.total)?;
    for (status, count) in &stats.by_status {
        write!(out, "  {} {count}", status.as_key())?;
    }
    writeln!(out)?;
    Ok(())
}

fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.trim().strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
    let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
    let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
    Some((r, g, b))
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (idx, header) in headers.iter().enumerate() {
        write!(writer, "{:width$} ", header, width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
