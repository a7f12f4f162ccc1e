use super::{GlobalConfiguration, Subcommand};
use anyhow::{Context, Result};
use clap::{Parser, ValueHint};
use hnl_sens::cache::{self, CacheKey};
use hnl_sens::event::EventTable;
use hnl_sens::mesh::DetectorMesh;
use hnl_sens::{geometry, Flavour};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

/// Ray-traces a combined event table through the detector mesh and writes
/// the geometry-augmented table.
#[derive(Parser)]
pub struct Opts {
    /// Path to a combined event-table CSV (see the `combine` subcommand).
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,
    /// Path of the geometry-augmented output CSV.
    #[arg(long, value_hint = ValueHint::FilePath)]
    output: PathBuf,
    /// Mass point, GeV (used only to key the geometry cache).
    #[arg(long)]
    mass_gev: f64,
    /// Lepton-coupling flavour (used only to key the geometry cache).
    #[arg(long)]
    flavour: Flavour,
    /// Path to a Wavefront-OBJ-like detector mesh; the default capped-tube
    /// detector of `spec.md §6` is used if omitted.
    #[arg(long, value_hint = ValueHint::FilePath)]
    mesh: Option<PathBuf>,
    /// Triangulation density of the default detector's curved faces.
    #[arg(long, default_value_t = 64)]
    mesh_segments: usize,
}

impl Subcommand for Opts {
    fn run(&self, cfg: &GlobalConfiguration) -> Result<ExitCode> {
        let mesh = match &self.mesh {
            Some(path) => DetectorMesh::load_obj(path).with_context(|| format!("loading mesh {}", path.display()))?,
            None => DetectorMesh::default_detector(self.mesh_segments),
        };

        let build = |events: &EventTable| -> hnl_sens::Result<_> { Ok(geometry::compute_geometry(events, &mesh)) };

        let table = if let Some(cache_dir) = &cfg.cache_dir {
            let (events, _diag) = EventTable::load_csv(&self.input)?;
            let sample_hash = cache::hash_sample_files(std::slice::from_ref(&self.input))?;
            let key = CacheKey {
                mass_gev: self.mass_gev,
                flavour: self.flavour,
                sample_hash,
                detector_hash: mesh.content_hash(),
            };
            cache::load_or_compute(cache_dir, &key, || build(&events))?
        } else {
            let (events, _diag) = EventTable::load_csv(&self.input)?;
            build(&events)?
        };

        let n_hit = table.hits_tube.iter().filter(|&&h| h).count();
        info!(rows = table.len(), hits = n_hit, "geometry pass complete");

        table
            .write_csv(&self.output)
            .with_context(|| format!("writing {}", self.output.display()))?;

        let mut report = super::helpers::create_table();
        report.set_titles(prettytable::row!["rows", "hits", "faces"]);
        report.add_row(prettytable::row![table.len(), n_hit, mesh.face_count()]);
        report.printstd();

        Ok(ExitCode::SUCCESS)
    }
}
