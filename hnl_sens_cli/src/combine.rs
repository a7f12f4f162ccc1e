use super::{GlobalConfiguration, Subcommand};
use anyhow::{Context, Result};
use clap::{Parser, ValueHint};
use hnl_sens::combine::{self, CombineOptions};
use hnl_sens::Flavour;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

/// Combines the production-regime sample CSVs for one (mass, flavour)
/// point into a single unified event table.
#[derive(Parser)]
pub struct Opts {
    /// Directory holding the `HNL_<mass>GeV_<flavour>_<regime>...csv`
    /// sample files.
    #[arg(value_hint = ValueHint::DirPath)]
    dir: PathBuf,
    /// Mass point, GeV.
    #[arg(long)]
    mass_gev: f64,
    /// Lepton-coupling flavour.
    #[arg(long)]
    flavour: Flavour,
    /// Path of the combined event table.
    #[arg(long, value_hint = ValueHint::FilePath)]
    output: PathBuf,
    /// Exclude fromTau cascade samples from the combined table.
    #[arg(long)]
    no_from_tau: bool,
}

impl Subcommand for Opts {
    fn run(&self, _: &GlobalConfiguration) -> Result<ExitCode> {
        let opts = CombineOptions {
            include_from_tau: !self.no_from_tau,
            ..CombineOptions::default()
        };
        let (table, diag) = combine::combine(&self.dir, self.mass_gev, self.flavour, &opts)
            .with_context(|| format!("combining samples in {}", self.dir.display()))?;

        info!(
            files_used = diag.files_used.len(),
            files_superseded = diag.files_superseded.len(),
            total_rows = diag.total_rows,
            from_tau_rows = diag.from_tau_rows,
            "combined sample"
        );

        table
            .write_csv(&self.output)
            .with_context(|| format!("writing {}", self.output.display()))?;

        let mut report = super::helpers::create_table();
        report.set_titles(prettytable::row!["files used", "superseded", "rows", "fromTau rows"]);
        report.add_row(prettytable::row![
            diag.files_used.len(),
            diag.files_superseded.len(),
            diag.total_rows,
            diag.from_tau_rows,
        ]);
        report.printstd();

        Ok(ExitCode::SUCCESS)
    }
}
