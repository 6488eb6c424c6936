pub mod appointment;
pub mod bucket;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod error;
pub mod grid;
pub mod indicator;
pub mod layout;
pub mod navigation;
pub mod render;
pub mod source;
pub mod stack;
pub mod stats;

use std::ffi::OsString;

use clap::Parser;
use tracing::{debug, info};

pub use error::LayoutError;
pub use layout::{CalendarLayout, LayoutConfig, compute_layout};

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let pre = cli::preprocess_args(&raw_args)?;
    let cli = cli::GlobalCli::parse_from(pre.cleaned_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        "starting agenda CLI"
    );
    debug!(?pre.rc_overrides, "preprocessed rc overrides");

    let mut cfg = config::Config::load(cli.agendarc.as_deref())?;
    debug!(files = ?cfg.loaded_files, "agendarc files in load order");
    cfg.apply_overrides(
        pre.rc_overrides
            .into_iter()
            .chain(cli.rc_overrides.into_iter().map(|kv| (kv.key, kv.value))),
    );

    let renderer = render::Renderer::new(&cfg)?;

    commands::dispatch(&cfg, &renderer, cli.command)?;

    info!("done");
    Ok(())
}
