use super::scan::TheorySource;
use super::{GlobalConfiguration, Subcommand};
use anyhow::{Context, Result};
use clap::{Parser, ValueHint};
use hnl_sens::cache::{self, CacheKey};
use hnl_sens::combine::{self, CombineOptions};
use hnl_sens::geometry;
use hnl_sens::kernel::KernelConfig;
use hnl_sens::mesh::DetectorMesh;
use hnl_sens::solver::{self, SummaryRow};
use hnl_sens::theory::{AnalyticTheoryModel, TableTheoryModel, TheoryModel};
use hnl_sens::xsec::XsecRegistry;
use hnl_sens::Flavour;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use tracing::{error, info, warn};

/// Drives the full combine -> geometry -> scan pipeline for a grid of
/// (mass, flavour) points, one `rayon` task per point (`spec.md §5`).
#[derive(Parser)]
pub struct Opts {
    /// Directory holding the production-regime sample CSVs.
    #[arg(value_hint = ValueHint::DirPath)]
    sample_dir: PathBuf,
    /// Mass points to scan, GeV.
    #[arg(long, value_delimiter = ',', required = true)]
    masses_gev: Vec<f64>,
    /// Lepton-coupling flavours to scan; defaults to all three.
    #[arg(long, value_delimiter = ',')]
    flavours: Vec<Flavour>,
    /// Integrated luminosity, fb^-1.
    #[arg(long, default_value_t = 3000.0)]
    luminosity_fb_inv: f64,
    /// Theory adapter to use.
    #[arg(long, value_enum, default_value_t = TheorySource::Analytic)]
    theory: TheorySource,
    /// Path to the precomputed anchor table (`--theory table`).
    #[arg(long, value_hint = ValueHint::FilePath)]
    theory_table: Option<PathBuf>,
    /// Path to a Wavefront-OBJ-like detector mesh; the default detector of
    /// `spec.md §6` is used if omitted.
    #[arg(long, value_hint = ValueHint::FilePath)]
    mesh: Option<PathBuf>,
    /// Path of the combined summary CSV (one row per scanned point).
    #[arg(long, value_hint = ValueHint::FilePath)]
    output: PathBuf,
    /// Number of worker threads; defaults to the number of available cores.
    #[arg(default_value_t = thread::available_parallelism().map_or(1, NonZeroUsize::get), long)]
    threads: usize,
}

fn process_unit(
    sample_dir: &Path,
    mass_gev: f64,
    flavour: Flavour,
    mesh: &DetectorMesh,
    cache_dir: Option<&Path>,
    luminosity_fb_inv: f64,
    theory: TheorySource,
    theory_table: Option<&Path>,
) -> hnl_sens::Result<SummaryRow> {
    let span = tracing::info_span!("unit", mass_gev, flavour = %flavour);
    let _enter = span.enter();

    let (events, diag) = combine::combine(sample_dir, mass_gev, flavour, &CombineOptions::default())?;
    if events.is_empty() {
        warn!("no sample rows for this (mass, flavour) point");
    }

    let build = || Ok(geometry::compute_geometry(&events, mesh));
    let geom = if let Some(cache_dir) = cache_dir {
        let sample_hash = cache::hash_sample_files(&diag.files_used)?;
        let key = CacheKey { mass_gev, flavour, sample_hash, detector_hash: mesh.content_hash() };
        cache::load_or_compute(cache_dir, &key, build)?
    } else {
        build()?
    };

    let u_ref = flavour.unit_vector();
    let anchor = match theory {
        TheorySource::Analytic => AnalyticTheoryModel::default().anchor(mass_gev, u_ref)?,
        TheorySource::Table => {
            let path = theory_table.ok_or_else(|| {
                hnl_sens::Error::Configuration("--theory-table is required when --theory table is selected".into())
            })?;
            TableTheoryModel::load(path)?.anchor(mass_gev, u_ref)?
        }
    };

    let xsec = XsecRegistry::global();
    let cfg = KernelConfig { luminosity_fb_inv, u_ref, xsec, anchor: &anchor };
    let (_results, exclusion) = solver::solve_exclusion_default(&cfg, &geom);
    let row = solver::summarize(mass_gev, flavour, &geom, &exclusion);

    info!(peak_n_sig = row.peak_n_sig, "unit complete");
    Ok(row)
}

impl Subcommand for Opts {
    fn run(&self, cfg: &GlobalConfiguration) -> Result<ExitCode> {
        let flavours = if self.flavours.is_empty() {
            vec![Flavour::Electron, Flavour::Muon, Flavour::Tau]
        } else {
            self.flavours.clone()
        };

        let mesh = match &self.mesh {
            Some(path) => DetectorMesh::load_obj(path).with_context(|| format!("loading mesh {}", path.display()))?,
            None => DetectorMesh::default_detector(64),
        };

        ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build_global()
            .context("building rayon thread pool")?;

        let units: Vec<(f64, Flavour)> =
            self.masses_gev.iter().flat_map(|&m| flavours.iter().map(move |&f| (m, f))).collect();

        let rows: Vec<SummaryRow> = units
            .par_iter()
            .filter_map(|&(mass_gev, flavour)| {
                match process_unit(
                    &self.sample_dir,
                    mass_gev,
                    flavour,
                    &mesh,
                    cfg.cache_dir.as_deref(),
                    self.luminosity_fb_inv,
                    self.theory,
                    self.theory_table.as_deref(),
                ) {
                    Ok(row) => Some(row),
                    Err(e) => {
                        error!(mass_gev, flavour = %flavour, error = %e, "unit failed, excluded from summary");
                        None
                    }
                }
            })
            .collect();

        let mut writer = csv::Writer::from_path(&self.output)
            .with_context(|| format!("writing {}", self.output.display()))?;
        for row in &rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        let mut table = super::helpers::create_table();
        table.set_titles(prettytable::row!["mass [GeV]", "flavour", "peak Nsig", "island [dec]", "geom acc."]);
        for row in &rows {
            table.add_row(prettytable::row![
                format!("{:.3}", row.mass_gev),
                row.flavour,
                format!("{:.3e}", row.peak_n_sig),
                format!("{:.2}", row.island_decades),
                format!("{:.4}", row.geom_acceptance),
            ]);
        }
        table.printstd();

        if rows.len() < units.len() {
            warn!(failed = units.len() - rows.len(), "some (mass, flavour) units failed and were excluded");
        }

        Ok(ExitCode::SUCCESS)
    }
}
