use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, instrument};

use crate::appointment::Appointment;
use crate::cli::{Command, PeriodArgs, ShowArgs, StatsArgs, parse_view};
use crate::config::Config;
use crate::datetime::parse_reference_date;
use crate::grid::build_grid;
use crate::layout::{CalendarLayout, LayoutConfig, compute_layout};
use crate::navigation::{self, ViewMode, ViewState, period_title, period_window};
use crate::render::Renderer;
use crate::source::load_appointments;
use crate::stats::summarize;

#[instrument(skip(cfg, renderer, command))]
pub fn dispatch(cfg: &Config, renderer: &Renderer, command: Command) -> anyhow::Result<()> {
    let layout_cfg = cfg.layout_config()?;
    let now = Utc::now();
    let today = viewer_today(now, &layout_cfg);
    debug!(%today, timezone = %layout_cfg.grid.timezone, "resolved viewer clock");

    match command {
        Command::Show(args) => cmd_show(cfg, renderer, &layout_cfg, now, args),
        Command::Grid(args) => cmd_grid(cfg, renderer, &layout_cfg, today, &args),
        Command::Next(args) => cmd_step(cfg, today, &args, navigation::next),
        Command::Prev(args) => cmd_step(cfg, today, &args, navigation::previous),
        Command::Stats(args) => cmd_stats(cfg, renderer, &layout_cfg, today, args),
    }
}

fn viewer_today(now: DateTime<Utc>, layout_cfg: &LayoutConfig) -> NaiveDate {
    now.with_timezone(&layout_cfg.grid.timezone).date_naive()
}

fn resolve_period(
    cfg: &Config,
    today: NaiveDate,
    period: &PeriodArgs,
) -> anyhow::Result<(ViewMode, NaiveDate)> {
    let view = match period.view.as_deref() {
        Some(raw) => parse_view(raw)?,
        None => cfg.default_view()?,
    };
    let date = parse_reference_date(&period.date, today)
        .with_context(|| format!("invalid --date: {}", period.date))?;
    Ok((view, date))
}

#[instrument(skip(cfg, renderer, layout_cfg, args), fields(input = %args.input.display()))]
fn cmd_show(
    cfg: &Config,
    renderer: &Renderer,
    layout_cfg: &LayoutConfig,
    now: DateTime<Utc>,
    args: ShowArgs,
) -> anyhow::Result<()> {
    let appointments = load_appointments(&args.input)?;
    let layout = show_layout(cfg, &appointments, &args, layout_cfg, now)?;
    info!(
        cells = layout.cells.len(),
        hidden = layout.hidden_total(),
        total = layout.stats.total,
        "rendering layout"
    );
    renderer.print_layout(&layout)
}

/// The reference date and the indicator both come from the one `now`.
fn show_layout<'a>(
    cfg: &Config,
    appointments: &'a [Appointment],
    args: &ShowArgs,
    layout_cfg: &LayoutConfig,
    now: DateTime<Utc>,
) -> anyhow::Result<CalendarLayout<'a>> {
    let today = viewer_today(now, layout_cfg);
    let (view, date) = resolve_period(cfg, today, &args.period)?;

    let mut state = ViewState::new(date, view).with_filters(args.filters.to_filter_set()?);
    if args.all
        && let Some(grid_view) = view.grid_view()
    {
        let grid = build_grid(grid_view, date, &layout_cfg.grid)?;
        for key in grid.cell_keys() {
            state.expanded.expand(key);
        }
    }
    for key in &args.expand {
        state.expanded.expand(*key);
    }

    Ok(compute_layout(appointments, &state, layout_cfg, now)?)
}

fn cmd_grid(
    cfg: &Config,
    renderer: &Renderer,
    layout_cfg: &LayoutConfig,
    today: NaiveDate,
    args: &PeriodArgs,
) -> anyhow::Result<()> {
    let (view, date) = resolve_period(cfg, today, args)?;
    let grid_view = view
        .grid_view()
        .ok_or_else(|| anyhow!("the list view has no grid"))?;
    let grid = build_grid(grid_view, date, &layout_cfg.grid)?;

    println!("{}", period_title(view, date, layout_cfg.grid.week_start));
    renderer.print_grid(&grid)
}

fn cmd_step(
    cfg: &Config,
    today: NaiveDate,
    args: &PeriodArgs,
    step: fn(ViewMode, NaiveDate) -> NaiveDate,
) -> anyhow::Result<()> {
    let (view, date) = resolve_period(cfg, today, args)?;
    let target = step(view, date);
    debug!(view = view.as_key(), from = %date, to = %target, "stepped reference date");
    println!("{}", target.format("%Y-%m-%d"));
    Ok(())
}

#[instrument(skip(cfg, renderer, layout_cfg, args), fields(input = %args.input.display()))]
fn cmd_stats(
    cfg: &Config,
    renderer: &Renderer,
    layout_cfg: &LayoutConfig,
    today: NaiveDate,
    args: StatsArgs,
) -> anyhow::Result<()> {
    let (view, date) = resolve_period(cfg, today, &args.period)?;
    let appointments = load_appointments(&args.input)?;
    let filters = args.filters.to_filter_set()?;

    let week_start = layout_cfg.grid.week_start;
    let window = period_window(view, date, week_start);
    let stats = summarize(
        navigation::apply_filters(&appointments, &filters),
        window,
        layout_cfg.grid.timezone,
    );
    renderer.print_stats(&period_title(view, date, week_start), &stats)
}
