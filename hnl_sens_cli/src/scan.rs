use super::{GlobalConfiguration, Subcommand};
use anyhow::{Context, Result};
use clap::{Parser, ValueHint};
use hnl_sens::geometry::GeometryTable;
use hnl_sens::kernel::KernelConfig;
use hnl_sens::solver::{self, SummaryRow};
use hnl_sens::theory::{AnalyticTheoryModel, TableTheoryModel, TheoryModel};
use hnl_sens::xsec::XsecRegistry;
use hnl_sens::Flavour;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

/// Which theory adapter backs a scan, `spec.md §4.4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TheorySource {
    /// Read precomputed anchors from `--theory-table`.
    Table,
    /// Use the closed-form stand-in, no input file required.
    Analytic,
}

/// Scans a `|U|^2` grid for one (mass, flavour) point and inverts the
/// result into an exclusion interval.
#[derive(Parser)]
pub struct Opts {
    /// Path to a geometry-augmented event table (see the `geometry`
    /// subcommand).
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,
    /// Mass point, GeV.
    #[arg(long)]
    mass_gev: f64,
    /// Lepton-coupling flavour.
    #[arg(long)]
    flavour: Flavour,
    /// Integrated luminosity, fb^-1.
    #[arg(long, default_value_t = 3000.0)]
    luminosity_fb_inv: f64,
    /// Theory adapter to use.
    #[arg(long, value_enum, default_value_t = TheorySource::Analytic)]
    theory: TheorySource,
    /// Path to the precomputed anchor table (`--theory table`).
    #[arg(long, value_hint = ValueHint::FilePath)]
    theory_table: Option<PathBuf>,
    /// Lower edge of the `|U|^2` scan grid.
    #[arg(long)]
    u2_min: Option<f64>,
    /// Upper edge of the `|U|^2` scan grid.
    #[arg(long)]
    u2_max: Option<f64>,
    /// Number of log-spaced grid points.
    #[arg(long)]
    grid_points: Option<usize>,
    /// Signal-count threshold defining exclusion.
    #[arg(long, default_value_t = hnl_sens::config::DEFAULT_N_THRESHOLD)]
    threshold: f64,
    /// Appends the resulting summary row to this CSV instead of only
    /// printing it (header written if the file does not yet exist).
    #[arg(long, value_hint = ValueHint::FilePath)]
    summary_output: Option<PathBuf>,
}

impl Subcommand for Opts {
    fn run(&self, _: &GlobalConfiguration) -> Result<ExitCode> {
        let geometry = GeometryTable::read_csv(&self.input)
            .with_context(|| format!("reading {}", self.input.display()))?;

        let u_ref = self.flavour.unit_vector();
        let anchor = match self.theory {
            TheorySource::Analytic => AnalyticTheoryModel::default().anchor(self.mass_gev, u_ref)?,
            TheorySource::Table => {
                let path = self
                    .theory_table
                    .as_ref()
                    .context("--theory-table is required when --theory table is selected")?;
                TableTheoryModel::load(path)
                    .with_context(|| format!("loading {}", path.display()))?
                    .anchor(self.mass_gev, u_ref)?
            }
        };

        let xsec = XsecRegistry::global();
        let cfg = KernelConfig { luminosity_fb_inv: self.luminosity_fb_inv, u_ref, xsec, anchor: &anchor };

        let grid = match (self.u2_min, self.u2_max, self.grid_points) {
            (Some(min), Some(max), Some(n)) => solver::log_spaced_grid(min, max, n),
            _ => solver::default_grid(),
        };

        let (_results, exclusion) = solver::solve_exclusion(&cfg, &geometry, &grid, self.threshold);
        let row = solver::summarize(self.mass_gev, self.flavour, &geometry, &exclusion);

        info!(
            mass_gev = self.mass_gev,
            flavour = %self.flavour,
            peak_n_sig = row.peak_n_sig,
            "scan complete"
        );

        let mut table = super::helpers::create_table();
        table.set_titles(prettytable::row![
            "mass [GeV]",
            "flavour",
            "U2 min",
            "U2 max",
            "peak Nsig",
            "island [dec]",
            "geom acc."
        ]);
        table.add_row(prettytable::row![
            format!("{:.3}", row.mass_gev),
            row.flavour,
            format!("{:.3e}", row.u2_min),
            format!("{:.3e}", row.u2_max),
            format!("{:.3e}", row.peak_n_sig),
            format!("{:.2}", row.island_decades),
            format!("{:.4}", row.geom_acceptance),
        ]);
        table.printstd();

        if let Some(path) = &self.summary_output {
            append_summary_row(path, &row)?;
        }

        Ok(ExitCode::SUCCESS)
    }
}

fn append_summary_row(path: &PathBuf, row: &SummaryRow) -> Result<()> {
    let write_header = !path.exists();
    let mut writer = csv::WriterBuilder::new()
        .has_headers(write_header)
        .from_writer(
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening {}", path.display()))?,
        );
    writer.serialize(row)?;
    writer.flush()?;
    Ok(())
}
