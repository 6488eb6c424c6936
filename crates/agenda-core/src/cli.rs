use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::appointment::{AppointmentStatus, AppointmentType};
use crate::bucket::CellKey;
use crate::navigation::{FilterSet, ViewMode};

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "agenda",
    version,
    about = "Agenda: appointment calendar layout engine",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "agendarc", global = true)]
    pub agendarc: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Lay out appointments for a view and print it.
    Show(ShowArgs),
    /// Print the skeleton of a view without appointments.
    Grid(PeriodArgs),
    /// Print the reference date one period later.
    Next(PeriodArgs),
    /// Print the reference date one period earlier.
    Prev(PeriodArgs),
    /// Count appointments per status for the displayed period.
    Stats(StatsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PeriodArgs {
    /// day, week, month or list; defaults to `default.view`.
    #[arg(long)]
    pub view: Option<String>,

    /// Reference date (today, tomorrow, monday, +1w, 2024-03-14, ...).
    #[arg(long, default_value = "today")]
    pub date: String,
}

#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    #[arg(long = "status", action = ArgAction::Append)]
    pub statuses: Vec<String>,

    #[arg(long = "type", action = ArgAction::Append)]
    pub types: Vec<String>,
}

impl FilterArgs {
    pub fn to_filter_set(&self) -> anyhow::Result<FilterSet> {
        let mut filters = FilterSet::default();
        for raw in &self.statuses {
            let status = AppointmentStatus::from_key(raw)
                .ok_or_else(|| anyhow!("unknown appointment status: {raw}"))?;
            filters.statuses.insert(status);
        }
        for raw in &self.types {
            let kind = AppointmentType::from_key(raw)
                .ok_or_else(|| anyhow!("unknown appointment type: {raw}"))?;
            filters.types.insert(kind);
        }
        Ok(filters)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// JSON array or JSON-lines file of appointments.
    #[arg(long, short = 'i')]
    pub input: PathBuf,

    #[command(flatten)]
    pub period: PeriodArgs,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Expand the overlap stack of a cell (YYYY-MM-DD or YYYY-MM-DDTHH).
    #[arg(long = "expand", action = ArgAction::Append)]
    pub expand: Vec<CellKey>,

    /// Expand every cell.
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    #[arg(long, short = 'i')]
    pub input: PathBuf,

    #[command(flatten)]
    pub period: PeriodArgs,

    #[command(flatten)]
    pub filters: FilterArgs,
}

pub fn parse_view(raw: &str) -> anyhow::Result<ViewMode> {
    ViewMode::from_key(raw)
        .ok_or_else(|| anyhow!("unknown view: {raw} (expected day, week, month or list)"))
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` / `rc.key:value` overrides out of argv.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                rest.split_once(':')
                    .map(|(k, v)| (format!("rc.{k}"), v.to_string()))
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}
